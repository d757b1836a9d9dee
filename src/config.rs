use std::time::Duration;

use crate::clients::HubSpotTarget;
use crate::workflow::RetryPolicy;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 同时处理的会话数量
    pub max_concurrent_submissions: usize,
    /// 浏览器调试端口
    pub browser_debug_port: u16,
    /// 无头模式使用的浏览器可执行文件（为空时自动查找）
    pub chrome_executable: Option<String>,
    /// 会话 TOML 文件存放目录
    pub sessions_folder: String,
    /// 自定义题库文件（为空时使用内置题库）
    pub question_bank_file: Option<String>,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    /// 提交失败记录文件
    pub failed_submissions_file: String,
    // --- HubSpot 配置 ---
    pub hubspot_portal_id: String,
    pub hubspot_form_id: String,
    pub hubspot_api_key: String,
    pub hubspot_region: String,
    pub hubspot_api_base_url: String,
    pub hubspot_forms_base_url: String,
    pub hubspot_embed_script_url: String,
    // --- 页面上下文 ---
    pub page_uri: String,
    pub page_name: String,
    // --- 提交节奏 ---
    /// 首次尝试前的等待（毫秒）
    pub submission_delay_ms: u64,
    /// 每次重试额外增加的等待（毫秒）
    pub backoff_step_ms: u64,
    /// 单个通道的超时（秒）
    pub channel_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_submissions: 4,
            browser_debug_port: 9222,
            chrome_executable: None,
            sessions_folder: "sessions".to_string(),
            question_bank_file: None,
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
            failed_submissions_file: "failed_submissions.txt".to_string(),
            hubspot_portal_id: String::new(),
            hubspot_form_id: String::new(),
            hubspot_api_key: String::new(),
            hubspot_region: "na1".to_string(),
            hubspot_api_base_url: "https://api.hsforms.com".to_string(),
            hubspot_forms_base_url: "https://forms.hsforms.com".to_string(),
            hubspot_embed_script_url: "https://js.hsforms.net/forms/embed/v2.js".to_string(),
            page_uri: "https://prometheusagency.co/ai-readiness-assessment".to_string(),
            page_name: "AI Readiness Assessment".to_string(),
            submission_delay_ms: 3000,
            backoff_step_ms: 2000,
            channel_timeout_secs: 15,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            max_concurrent_submissions: env_parse("MAX_CONCURRENT_SUBMISSIONS").unwrap_or(default.max_concurrent_submissions),
            browser_debug_port: env_parse("BROWSER_DEBUG_PORT").unwrap_or(default.browser_debug_port),
            chrome_executable: std::env::var("CHROME_EXECUTABLE").ok().filter(|v| !v.trim().is_empty()),
            sessions_folder: std::env::var("SESSIONS_FOLDER").unwrap_or(default.sessions_folder),
            question_bank_file: std::env::var("QUESTION_BANK_FILE").ok().filter(|v| !v.trim().is_empty()),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            failed_submissions_file: std::env::var("FAILED_SUBMISSIONS_FILE").unwrap_or(default.failed_submissions_file),
            hubspot_portal_id: std::env::var("HUBSPOT_PORTAL_ID").unwrap_or(default.hubspot_portal_id),
            hubspot_form_id: std::env::var("HUBSPOT_FORM_ID").unwrap_or(default.hubspot_form_id),
            hubspot_api_key: std::env::var("HUBSPOT_API_KEY").unwrap_or(default.hubspot_api_key),
            hubspot_region: std::env::var("HUBSPOT_REGION").unwrap_or(default.hubspot_region),
            hubspot_api_base_url: std::env::var("HUBSPOT_API_BASE_URL").unwrap_or(default.hubspot_api_base_url),
            hubspot_forms_base_url: std::env::var("HUBSPOT_FORMS_BASE_URL").unwrap_or(default.hubspot_forms_base_url),
            hubspot_embed_script_url: std::env::var("HUBSPOT_EMBED_SCRIPT_URL").unwrap_or(default.hubspot_embed_script_url),
            page_uri: std::env::var("PAGE_URI").unwrap_or(default.page_uri),
            page_name: std::env::var("PAGE_NAME").unwrap_or(default.page_name),
            submission_delay_ms: env_parse("SUBMISSION_DELAY_MS").unwrap_or(default.submission_delay_ms),
            backoff_step_ms: env_parse("BACKOFF_STEP_MS").unwrap_or(default.backoff_step_ms),
            channel_timeout_secs: env_parse("CHANNEL_TIMEOUT_SECS").unwrap_or(default.channel_timeout_secs),
        }
    }

    /// HubSpot 表单目标（portal / form / region 及各端点）
    pub fn hubspot_target(&self) -> HubSpotTarget {
        HubSpotTarget {
            portal_id: self.hubspot_portal_id.clone(),
            form_id: self.hubspot_form_id.clone(),
            region: self.hubspot_region.clone(),
            api_key: Some(self.hubspot_api_key.clone()).filter(|k| !k.is_empty()),
            api_base_url: self.hubspot_api_base_url.clone(),
            forms_base_url: self.hubspot_forms_base_url.clone(),
            embed_script_url: self.hubspot_embed_script_url.clone(),
        }
    }

    /// 提交重试策略
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            initial_delay: Duration::from_millis(self.submission_delay_ms),
            backoff_step: Duration::from_millis(self.backoff_step_ms),
            channel_timeout: Duration::from_secs(self.channel_timeout_secs),
        }
    }

    pub fn channel_timeout(&self) -> Duration {
        Duration::from_secs(self.channel_timeout_secs)
    }

    /// 嵌入式表单通道内部的时间预算：(脚本加载, 表单提交)
    ///
    /// 两者之和必须小于 `channel_timeout`，页面内的计时器先于外层超时触发，
    /// 失败能以脚本回报的形式交回编排器
    pub fn widget_timeouts(&self) -> (Duration, Duration) {
        let budget = self.channel_timeout();
        (budget / 3, budget / 2)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
