//! 投递通道（Delivery Channels）
//!
//! 三个互相独立的通道，把测评结果送到 HubSpot：
//!
//! 1. `EmbeddedWidgetChannel` - 嵌入式表单组件（hbspt.forms.create）
//! 2. `DirectApiChannel` - 直接调用表单提交 API
//! 3. `HiddenFormChannel` - 隐藏表单 POST 到新的浏览上下文
//!
//! 通道只负责"投递一次并返回结果"，不修改任何共享状态，
//! 也不会把错误抛给调用方；是否已提交由编排器决定。

pub mod direct_api;
pub mod embedded_widget;
pub mod hidden_form;

use std::fmt;

use futures::future::BoxFuture;

use crate::error::DeliveryResult;
use crate::models::AssessmentSubmission;

pub use direct_api::DirectApiChannel;
pub use embedded_widget::EmbeddedWidgetChannel;
pub use hidden_form::HiddenFormChannel;

/// 通道类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    EmbeddedWidget,
    DirectApi,
    HiddenForm,
}

impl ChannelKind {
    pub fn name(self) -> &'static str {
        match self {
            ChannelKind::EmbeddedWidget => "嵌入式表单",
            ChannelKind::DirectApi => "直接 API",
            ChannelKind::HiddenForm => "隐藏表单",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 投递通道
pub trait DeliveryChannel: Send + Sync {
    fn kind(&self) -> ChannelKind;

    /// 投递一次
    fn deliver<'a>(&'a self, submission: &'a AssessmentSubmission) -> BoxFuture<'a, DeliveryResult>;
}
