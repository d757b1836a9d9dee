//! 单个会话处理器 - 编排层
//!
//! 校验会话 → 计分并输出结果 → 交给提交编排器 → 耗尽时写入失败记录。
//! 计分结果总会输出，与提交是否成功无关。

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info, warn};

use crate::channels::DeliveryChannel;
use crate::config::Config;
use crate::models::{AssessmentSession, AssessmentSubmission, QuestionBank, SessionFile};
use crate::services::FailureWriter;
use crate::utils::logging::{log_score_card, truncate_text};
use crate::workflow::{SubmissionCtx, SubmissionOrchestrator, SubmissionState, MAX_ATTEMPTS};

/// 单个会话的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// 已提交到 HubSpot
    Submitted,
    /// 所有自动尝试均失败，已记录待人工重试
    Exhausted,
    /// 会话数据无效或未完成，未提交
    Invalid,
}

/// 处理单个会话
pub async fn process_session(
    channels: Vec<Arc<dyn DeliveryChannel>>,
    bank: &QuestionBank,
    file: SessionFile,
    session_index: usize,
    config: &Config,
    failure_writer: &FailureWriter,
) -> Result<SessionOutcome> {
    let source = file.file_path.clone();

    let session = match AssessmentSession::from_file(file, bank) {
        Ok(session) => session,
        Err(e) => {
            error!(
                "[会话 {}] ❌ 会话数据无效 ({}): {}",
                session_index,
                source.as_deref().unwrap_or("-"),
                e
            );
            return Ok(SessionOutcome::Invalid);
        }
    };

    let user = session.user_info();
    info!(
        "[会话 {}] 👤 {} {} <{}> @ {}",
        session_index,
        user.first_name(),
        user.last_name(),
        user.email(),
        truncate_text(user.company(), 40)
    );

    if !session.is_complete(bank) {
        warn!(
            "[会话 {}] ⚠️ 测评未完成 ({}/{} 题)，跳过提交",
            session_index,
            session.answers().len(),
            bank.len()
        );
        return Ok(SessionOutcome::Invalid);
    }

    let card = session.score(bank)?;
    log_score_card(session_index, &card);

    let submission = AssessmentSubmission::new(&session, &card);
    let ctx = SubmissionCtx::new(session_index, user.email());
    let handle = SubmissionOrchestrator::new(channels, config.retry_policy(), ctx).spawn(submission);
    let orchestrator = handle.wait().await?;

    match orchestrator.state() {
        SubmissionState::Submitted { .. } => Ok(SessionOutcome::Submitted),
        state => {
            let reason = format!("{} 次尝试均失败 (状态: {:?})", MAX_ATTEMPTS, state);
            failure_writer.write(session_index, user.email(), source.as_deref(), &reason)?;
            warn!(
                "[会话 {}] ⚠️ 已写入 {}，可稍后手动重试",
                session_index,
                failure_writer.path()
            );
            Ok(SessionOutcome::Exhausted)
        }
    }
}
