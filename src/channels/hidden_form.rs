//! 隐藏表单通道
//!
//! 在页面上构造一个只含 hidden input 的 HTML 表单，target 指向新的 iframe，
//! 调用 `form.submit()`。远端结果不可见，只要 submit 没有抛错就算成功。

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use serde_json::json;
use tracing::debug;

use crate::channels::{ChannelKind, DeliveryChannel};
use crate::clients::HubSpotTarget;
use crate::error::{DeliveryError, DeliveryResult};
use crate::infrastructure::{JsExecutor, JsReport};
use crate::models::{AssessmentSubmission, FormField};

/// 隐藏表单通道
pub struct HiddenFormChannel {
    executor: Option<Arc<JsExecutor>>,
    target: HubSpotTarget,
    page_uri: String,
    page_name: String,
}

impl HiddenFormChannel {
    pub fn new(
        executor: Option<Arc<JsExecutor>>,
        target: HubSpotTarget,
        page_uri: impl Into<String>,
        page_name: impl Into<String>,
    ) -> Self {
        Self {
            executor,
            target,
            page_uri: page_uri.into(),
            page_name: page_name.into(),
        }
    }

    async fn post(&self, submission: &AssessmentSubmission) -> DeliveryResult {
        let executor = self.executor.as_ref().ok_or(DeliveryError::BrowserUnavailable)?;

        let hs_context = json!({
            "hutk": submission.hutk,
            "pageUrl": self.page_uri,
            "pageName": self.page_name,
        })
        .to_string();

        let html = render_hidden_form(&self.target.multipart_url(), &submission.fields, &hs_context);
        let script = build_submit_script(&html).map_err(|e| DeliveryError::Script(e.to_string()))?;

        debug!("隐藏表单 POST 到 {}", self.target.multipart_url());

        let report: JsReport = executor
            .eval_as(script)
            .await
            .map_err(|e| DeliveryError::Script(e.to_string()))?;

        if report.ok {
            Ok(())
        } else {
            Err(DeliveryError::Script(
                report.error.unwrap_or_else(|| "form.submit() 失败".to_string()),
            ))
        }
    }
}

impl DeliveryChannel for HiddenFormChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::HiddenForm
    }

    fn deliver<'a>(&'a self, submission: &'a AssessmentSubmission) -> BoxFuture<'a, DeliveryResult> {
        self.post(submission).boxed()
    }
}

/// 渲染隐藏表单 HTML，字段与 HubSpot 字段名一一对应
pub fn render_hidden_form(action: &str, fields: &[FormField], hs_context: &str) -> String {
    let mut html = format!(
        r#"<form method="POST" action="{}" enctype="multipart/form-data" accept-charset="UTF-8">"#,
        escape_html(action)
    );
    for field in fields {
        html.push_str(&format!(
            r#"<input type="hidden" name="{}" value="{}">"#,
            escape_html(&field.name),
            escape_html(&field.value)
        ));
    }
    html.push_str(&format!(
        r#"<input type="hidden" name="hs_context" value="{}">"#,
        escape_html(hs_context)
    ));
    html.push_str("</form>");
    html
}

fn build_submit_script(html: &str) -> serde_json::Result<String> {
    let html_literal = serde_json::to_string(html)?;
    Ok(format!(
        r#"
        (() => {{
            try {{
                const name = "hs-hidden-" + Date.now() + "-" + Math.random().toString(36).slice(2);
                const frame = document.createElement("iframe");
                frame.name = name;
                frame.style.display = "none";
                document.body.appendChild(frame);
                const holder = document.createElement("div");
                holder.style.display = "none";
                holder.innerHTML = {html};
                document.body.appendChild(holder);
                const form = holder.querySelector("form");
                form.target = name;
                form.submit();
                setTimeout(() => {{ holder.remove(); frame.remove(); }}, 5000);
                return {{ ok: true }};
            }} catch (err) {{
                return {{ ok: false, error: String(err && err.message || err) }};
            }}
        }})()
        "#,
        html = html_literal
    ))
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
