//! 提交上下文
//!
//! 封装"我正在提交第几个会话、是谁的结果"这一信息

use std::fmt::Display;

/// 提交上下文
#[derive(Debug, Clone)]
pub struct SubmissionCtx {
    /// 会话索引（仅用于日志显示）
    pub session_index: usize,

    /// 联系人邮箱
    pub email: String,
}

impl SubmissionCtx {
    pub fn new(session_index: usize, email: impl Into<String>) -> Self {
        Self {
            session_index,
            email: email.into(),
        }
    }
}

impl Display for SubmissionCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[会话 {}]", self.session_index)
    }
}
