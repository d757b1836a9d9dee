//! # Assessment Submit
//!
//! AI 成熟度测评的计分与 HubSpot 多通道提交
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure）
//! - `browser/` - 连接调试端口浏览器或启动无头浏览器
//! - `infrastructure/` - `JsExecutor` 唯一持有 page；`ScriptLoader` 幂等加载 HubSpot 嵌入脚本
//!
//! ### ② 业务能力层（Services / Clients / Channels）
//! - `services::scoring` - 从答案表推导总分、维度小计、百分比与等级
//! - `services::FailureWriter` - 写失败记录
//! - `clients::hubspot_client` - 端点、请求体、响应判定
//! - `channels/` - 嵌入式表单 / 直接 API / 隐藏表单三个投递通道
//!
//! ### ③ 流程层（Workflow）
//! - `SubmissionOrchestrator` - 通道顺序、退避、超时、先到先得、手动重试
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量会话处理器，管理资源和并发
//! - `orchestrator/session_processor` - 单个会话：校验 → 计分 → 提交

pub mod browser;
pub mod channels;
pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use channels::{ChannelKind, DeliveryChannel};
pub use config::Config;
pub use error::{AppError, AppResult, DeliveryError, DeliveryResult, ScoringError, SessionError};
pub use models::{AssessmentSession, AssessmentSubmission, Pillar, QuestionBank, UserInfo};
pub use orchestrator::{process_session, App, SessionOutcome};
pub use services::{ReadinessTier, ScoreCard};
pub use workflow::{SubmissionHandle, SubmissionOrchestrator, SubmissionState};
