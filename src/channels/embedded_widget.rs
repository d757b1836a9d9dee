//! 嵌入式表单通道
//!
//! 在页面上用 `hbspt.forms.create` 创建一个隐藏容器内的表单，
//! 等 `onFormReady` 回调后填写字段并提交，`onFormSubmit` 回调视为成功。

use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use serde_json::json;
use tracing::debug;

use crate::channels::{ChannelKind, DeliveryChannel};
use crate::clients::HubSpotTarget;
use crate::error::{DeliveryError, DeliveryResult};
use crate::infrastructure::{JsReport, ScriptLoader};
use crate::models::AssessmentSubmission;

/// 嵌入式表单通道
pub struct EmbeddedWidgetChannel {
    loader: Option<Arc<ScriptLoader>>,
    target: HubSpotTarget,
    submit_timeout: Duration,
}

impl EmbeddedWidgetChannel {
    /// `loader` 为 None 表示没有可用的浏览器，此通道会直接失败
    pub fn new(loader: Option<Arc<ScriptLoader>>, target: HubSpotTarget, submit_timeout: Duration) -> Self {
        Self {
            loader,
            target,
            submit_timeout,
        }
    }

    async fn submit(&self, submission: &AssessmentSubmission) -> DeliveryResult {
        let loader = self.loader.as_ref().ok_or(DeliveryError::BrowserUnavailable)?;
        loader.ensure_loaded().await?;

        let script = build_widget_script(&self.target, submission, self.submit_timeout)
            .map_err(|e| DeliveryError::Script(e.to_string()))?;

        let report: JsReport = loader
            .executor()
            .eval_as(script)
            .await
            .map_err(|e| DeliveryError::Script(e.to_string()))?;

        debug!("嵌入式表单回报: {:?}", report);

        if report.ok {
            Ok(())
        } else {
            Err(DeliveryError::Script(
                report.error.unwrap_or_else(|| "表单未触发 onFormSubmit".to_string()),
            ))
        }
    }
}

impl DeliveryChannel for EmbeddedWidgetChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::EmbeddedWidget
    }

    fn deliver<'a>(&'a self, submission: &'a AssessmentSubmission) -> BoxFuture<'a, DeliveryResult> {
        self.submit(submission).boxed()
    }
}

/// 构建表单组件脚本
pub fn build_widget_script(
    target: &HubSpotTarget,
    submission: &AssessmentSubmission,
    submit_timeout: Duration,
) -> serde_json::Result<String> {
    let options = serde_json::to_string(&json!({
        "portalId": target.portal_id,
        "formId": target.form_id,
        "region": target.region,
    }))?;
    let fields = serde_json::to_string(&submission.fields)?;

    Ok(format!(
        r##"
        (async () => {{
            if (!(window.hbspt && window.hbspt.forms)) {{
                return {{ ok: false, error: "hbspt.forms 不存在" }};
            }}
            const fields = {fields};
            const container = document.createElement("div");
            container.id = "hs-assessment-" + Date.now() + "-" + Math.random().toString(36).slice(2);
            container.style.display = "none";
            document.body.appendChild(container);
            try {{
                const ok = await new Promise((resolve, reject) => {{
                    const timer = setTimeout(() => reject(new Error("表单提交超时")), {timeout_ms});
                    window.hbspt.forms.create(Object.assign({options}, {{
                        target: "#" + container.id,
                        onFormReady: ($form) => {{
                            try {{
                                const form = ($form && $form.jquery ? $form[0] : $form) || container.querySelector("form");
                                for (const field of fields) {{
                                    const input = form.querySelector('[name="' + CSS.escape(field.name) + '"]');
                                    if (!input) continue;
                                    input.value = field.value;
                                    input.dispatchEvent(new Event("input", {{ bubbles: true }}));
                                    input.dispatchEvent(new Event("change", {{ bubbles: true }}));
                                }}
                                const button = form.querySelector('input[type="submit"], button[type="submit"]');
                                if (button) button.click(); else form.requestSubmit();
                            }} catch (err) {{
                                clearTimeout(timer);
                                reject(err);
                            }}
                        }},
                        onFormSubmit: () => {{
                            clearTimeout(timer);
                            resolve(true);
                        }},
                    }}));
                }});
                return {{ ok }};
            }} catch (err) {{
                return {{ ok: false, error: String(err && err.message || err) }};
            }} finally {{
                setTimeout(() => container.remove(), 1000);
            }}
        }})()
        "##,
        fields = fields,
        options = options,
        timeout_ms = submit_timeout.as_millis()
    ))
}
