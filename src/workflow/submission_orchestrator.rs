//! 提交编排器 - 流程层
//!
//! 核心职责：按固定顺序（嵌入式表单 → 直接 API → 隐藏表单）尝试投递，
//! 保证最多只有一次成功被记录。
//!
//! 状态流转：
//!
//! ```text
//! Idle ──(进入结果页)──▶ AttemptScheduled ──(延迟)──▶ Attempting
//!                                 ▲                      │ 成功 ──▶ Submitted
//!                                 │                      │ 失败且 < 3 次 ──▶ 退避后 Attempting（下一个通道）
//!                                 └──(手动重试)── Exhausted ◀──(3 次均失败)
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{info, warn};

use crate::channels::{ChannelKind, DeliveryChannel};
use crate::error::DeliveryError;
use crate::models::AssessmentSubmission;
use crate::workflow::submission_ctx::SubmissionCtx;

/// 自动尝试的最大次数
pub const MAX_ATTEMPTS: u8 = 3;

/// 提交状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    AttemptScheduled,
    Attempting { attempt: u8, channel: ChannelKind },
    Submitted { attempt: u8, channel: ChannelKind },
    Exhausted,
}

impl SubmissionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SubmissionState::Submitted { .. } | SubmissionState::Exhausted)
    }
}

/// 重试节奏
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 首次尝试前的等待
    pub initial_delay: Duration,
    /// 之后每次额外增加的等待
    pub backoff_step: Duration,
    /// 单个通道的超时
    pub channel_timeout: Duration,
}

impl RetryPolicy {
    /// 第 `attempt` 次尝试（从 1 开始）之前的等待
    pub fn delay_for(&self, attempt: u8) -> Duration {
        self.initial_delay + self.backoff_step * u32::from(attempt.saturating_sub(1))
    }
}

/// 已提交标记：先到先得
#[derive(Debug, Default)]
pub struct SubmittedFlag(AtomicBool);

impl SubmittedFlag {
    /// 尝试置位，只有第一次调用返回 true
    pub fn mark(&self) -> bool {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// 提交编排器
///
/// - 唯一持有 `submitted` 和尝试计数
/// - 通道只返回结果，不改状态
/// - 每次状态变化都通过 watch 通道广播，供"提交中"提示使用
pub struct SubmissionOrchestrator {
    channels: Vec<Arc<dyn DeliveryChannel>>,
    policy: RetryPolicy,
    ctx: SubmissionCtx,
    attempt_count: u8,
    submitted: SubmittedFlag,
    state_tx: watch::Sender<SubmissionState>,
}

impl SubmissionOrchestrator {
    pub fn new(channels: Vec<Arc<dyn DeliveryChannel>>, policy: RetryPolicy, ctx: SubmissionCtx) -> Self {
        let (state_tx, _) = watch::channel(SubmissionState::Idle);
        Self {
            channels,
            policy,
            ctx,
            attempt_count: 0,
            submitted: SubmittedFlag::default(),
            state_tx,
        }
    }

    pub fn state(&self) -> SubmissionState {
        *self.state_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SubmissionState> {
        self.state_tx.subscribe()
    }

    pub fn attempt_count(&self) -> u8 {
        self.attempt_count
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted.is_set()
    }

    /// 进入结果页：Idle → AttemptScheduled
    pub fn schedule(&mut self) -> bool {
        if self.state() != SubmissionState::Idle {
            return false;
        }
        self.transition(SubmissionState::AttemptScheduled);
        true
    }

    /// 手动重试：Exhausted → AttemptScheduled，计数归零
    pub fn retry(&mut self) -> bool {
        if self.state() != SubmissionState::Exhausted {
            return false;
        }
        info!("{} 🔁 手动重试提交", self.ctx);
        self.attempt_count = 0;
        self.transition(SubmissionState::AttemptScheduled);
        true
    }

    /// 驱动状态机直到终态
    ///
    /// Idle 会先被调度；已处于终态时直接返回，不会发起新的尝试
    pub async fn run(&mut self, submission: &AssessmentSubmission) -> SubmissionState {
        self.schedule();
        if self.state().is_terminal() {
            return self.state();
        }

        if self.channels.is_empty() {
            warn!("{} ⚠️ 没有可用的投递通道", self.ctx);
            self.transition(SubmissionState::Exhausted);
            return self.state();
        }

        while !self.submitted.is_set() {
            if self.attempt_count >= MAX_ATTEMPTS {
                warn!(
                    "{} ❌ 已尝试 {} 次，全部失败，等待手动重试",
                    self.ctx, self.attempt_count
                );
                self.transition(SubmissionState::Exhausted);
                break;
            }

            // 退避期间对外显示为"已安排下一次尝试"
            if self.state() != SubmissionState::AttemptScheduled {
                self.transition(SubmissionState::AttemptScheduled);
            }

            let attempt = self.attempt_count + 1;
            sleep(self.policy.delay_for(attempt)).await;

            self.attempt_count = attempt;
            let channel = Arc::clone(&self.channels[usize::from(attempt - 1) % self.channels.len()]);
            let kind = channel.kind();
            self.transition(SubmissionState::Attempting { attempt, channel: kind });

            info!(
                "{} 📤 第 {}/{} 次尝试，通道: {}",
                self.ctx, attempt, MAX_ATTEMPTS, kind
            );

            let outcome = match timeout(self.policy.channel_timeout, channel.deliver(submission)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(DeliveryError::Timeout(self.policy.channel_timeout)),
            };

            match outcome {
                Ok(()) => {
                    if self.submitted.mark() {
                        info!("{} ✅ 提交成功 ({}): {}", self.ctx, kind, self.ctx.email);
                        self.transition(SubmissionState::Submitted { attempt, channel: kind });
                    }
                }
                Err(e) => {
                    warn!("{} ⚠️ 通道 {} 投递失败: {}", self.ctx, kind, e);
                }
            }
        }

        self.state()
    }

    /// 在后台运行，返回作用域句柄；句柄被丢弃时取消所有未触发的计时和进行中的尝试
    pub fn spawn(mut self, submission: AssessmentSubmission) -> SubmissionHandle {
        self.schedule();
        let state = self.subscribe();
        let task = tokio::spawn(async move {
            self.run(&submission).await;
            self
        });

        SubmissionHandle {
            task: Some(task),
            state,
        }
    }

    fn transition(&mut self, next: SubmissionState) {
        self.state_tx.send_replace(next);
    }
}

/// 后台提交句柄
///
/// 丢弃句柄即取消：尚未触发的等待和进行中的尝试都会被中止
pub struct SubmissionHandle {
    task: Option<JoinHandle<SubmissionOrchestrator>>,
    state: watch::Receiver<SubmissionState>,
}

impl SubmissionHandle {
    /// 当前状态
    pub fn state(&self) -> SubmissionState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SubmissionState> {
        self.state.clone()
    }

    /// 等待编排器结束并取回（可用于手动重试）
    pub async fn wait(mut self) -> anyhow::Result<SubmissionOrchestrator> {
        let task = self
            .task
            .take()
            .ok_or_else(|| anyhow::anyhow!("提交任务已被取消"))?;
        Ok(task.await?)
    }
}

impl Drop for SubmissionHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
