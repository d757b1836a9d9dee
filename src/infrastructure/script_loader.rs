//! 外部脚本加载器 - 基础设施层
//!
//! 负责把 HubSpot 嵌入脚本注入页面。`ensure_loaded()` 是幂等的：
//! 成功一次之后不再注入；失败不会被缓存，下次调用会重新尝试。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::error::DeliveryError;
use crate::infrastructure::js_executor::{JsExecutor, JsReport};

/// 外部脚本加载器
pub struct ScriptLoader {
    executor: Arc<JsExecutor>,
    script_url: String,
    load_timeout: Duration,
    loaded: OnceCell<()>,
}

impl ScriptLoader {
    pub fn new(executor: Arc<JsExecutor>, script_url: impl Into<String>, load_timeout: Duration) -> Self {
        Self {
            executor,
            script_url: script_url.into(),
            load_timeout,
            loaded: OnceCell::new(),
        }
    }

    pub fn executor(&self) -> &Arc<JsExecutor> {
        &self.executor
    }

    /// 确保脚本已加载，且全局对象 `hbspt.forms` 可用
    pub async fn ensure_loaded(&self) -> Result<(), DeliveryError> {
        self.loaded
            .get_or_try_init(|| self.inject())
            .await
            .map(|_| ())
    }

    async fn inject(&self) -> Result<(), DeliveryError> {
        info!("📜 正在注入 HubSpot 嵌入脚本: {}", self.script_url);

        let script = build_loader_script(&self.script_url, self.load_timeout)
            .map_err(|e| DeliveryError::Script(e.to_string()))?;

        let report: JsReport = self
            .executor
            .eval_as(script)
            .await
            .map_err(|e| DeliveryError::Script(e.to_string()))?;

        if report.ok {
            debug!("HubSpot 嵌入脚本已就绪");
            Ok(())
        } else {
            let reason = report.error.unwrap_or_else(|| "hbspt.forms 不存在".to_string());
            warn!("⚠️ HubSpot 嵌入脚本不可用: {}", reason);
            Err(DeliveryError::ScriptUnavailable(reason))
        }
    }
}

/// 构建注入脚本：已存在全局对象时直接返回，否则插入 script 标签并等待 load
pub fn build_loader_script(script_url: &str, load_timeout: Duration) -> serde_json::Result<String> {
    let src = serde_json::to_string(script_url)?;
    Ok(format!(
        r#"
        (async () => {{
            const ready = () => !!(window.hbspt && window.hbspt.forms);
            if (ready()) return {{ ok: true }};
            try {{
                const src = {src};
                let tag = Array.from(document.scripts).find((s) => s.src === src);
                if (!tag) {{
                    tag = document.createElement("script");
                    tag.src = src;
                    tag.async = true;
                    document.head.appendChild(tag);
                }}
                const ok = await new Promise((resolve) => {{
                    const timer = setTimeout(() => resolve(ready()), {timeout_ms});
                    tag.addEventListener("load", () => {{ clearTimeout(timer); resolve(ready()); }});
                    tag.addEventListener("error", () => {{ clearTimeout(timer); resolve(false); }});
                }});
                return ok ? {{ ok: true }} : {{ ok: false, error: "hbspt.forms 不存在" }};
            }} catch (err) {{
                return {{ ok: false, error: String(err && err.message || err) }};
            }}
        }})()
        "#,
        src = src,
        timeout_ms = load_timeout.as_millis()
    ))
}
