//! 直接 API 通道
//!
//! 把字段序列化为 `[{name, value}]` 后 POST 一次到表单提交接口

use std::time::Duration;

use anyhow::{Context, Result};
use futures::future::{BoxFuture, FutureExt};
use reqwest::Client;
use tracing::debug;

use crate::channels::{ChannelKind, DeliveryChannel};
use crate::clients::{build_payload, interpret_response, HubSpotTarget};
use crate::error::{DeliveryError, DeliveryResult};
use crate::models::AssessmentSubmission;

/// 直接 API 通道
pub struct DirectApiChannel {
    client: Client,
    target: HubSpotTarget,
    page_uri: String,
    page_name: String,
}

impl DirectApiChannel {
    pub fn new(
        target: HubSpotTarget,
        page_uri: impl Into<String>,
        page_name: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("无法创建 HTTP 客户端")?;

        Ok(Self {
            client,
            target,
            page_uri: page_uri.into(),
            page_name: page_name.into(),
        })
    }

    async fn send(&self, submission: &AssessmentSubmission) -> DeliveryResult {
        let endpoint = self.target.submit_url();
        let payload = build_payload(submission, &self.page_uri, &self.page_name);

        debug!("直接提交到 {}，字段数: {}", endpoint, payload.fields.len());

        let mut request = self.client.post(&endpoint).json(&payload);
        if let Some(api_key) = &self.target.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|source| DeliveryError::Transport {
                endpoint: endpoint.clone(),
                source,
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|source| DeliveryError::Transport { endpoint, source })?;

        interpret_response(status, &body)
    }
}

impl DeliveryChannel for DirectApiChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::DirectApi
    }

    fn deliver<'a>(&'a self, submission: &'a AssessmentSubmission) -> BoxFuture<'a, DeliveryResult> {
        self.send(submission).boxed()
    }
}
