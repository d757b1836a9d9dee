/// HubSpot 表单客户端
///
/// 封装端点拼接、请求体构建和响应判定，三个投递通道共用
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{DeliveryError, DeliveryResult};
use crate::models::{AssessmentSubmission, FormField};

/// HubSpot 表单目标
#[derive(Debug, Clone)]
pub struct HubSpotTarget {
    pub portal_id: String,
    pub form_id: String,
    pub region: String,
    pub api_key: Option<String>,
    pub api_base_url: String,
    pub forms_base_url: String,
    pub embed_script_url: String,
}

impl HubSpotTarget {
    /// 直接提交接口
    pub fn submit_url(&self) -> String {
        format!(
            "{}/submissions/v3/integration/submit/{}/{}",
            self.api_base_url.trim_end_matches('/'),
            self.portal_id,
            self.form_id
        )
    }

    /// 隐藏表单（multipart）提交接口
    pub fn multipart_url(&self) -> String {
        format!(
            "{}/submissions/v3/public/submit/formsnext/multipart/{}/{}",
            self.forms_base_url.trim_end_matches('/'),
            self.portal_id,
            self.form_id
        )
    }
}

/// 页面上下文
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContext {
    pub page_uri: String,
    pub page_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hutk: Option<String>,
}

/// 直接提交请求体
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionPayload<'a> {
    pub fields: &'a [FormField],
    pub context: PageContext,
}

/// 构建直接提交请求体
pub fn build_payload<'a>(
    submission: &'a AssessmentSubmission,
    page_uri: &str,
    page_name: &str,
) -> SubmissionPayload<'a> {
    SubmissionPayload {
        fields: &submission.fields,
        context: PageContext {
            page_uri: page_uri.to_string(),
            page_name: page_name.to_string(),
            hutk: submission.hutk.clone(),
        },
    }
}

/// 判定 HubSpot 响应
///
/// 2xx 且响应体可解析为 JSON 才算成功；失败时尽量取出 `message`
pub fn interpret_response(status: u16, body: &str) -> DeliveryResult {
    debug!("HubSpot 响应: status={}, body={}", status, body);

    if (200..300).contains(&status) {
        serde_json::from_str::<Value>(body).map_err(|source| DeliveryError::InvalidBody { source })?;
        return Ok(());
    }

    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string));

    Err(DeliveryError::BadStatus { status, message })
}
