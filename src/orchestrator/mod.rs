//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量会话处理器
//! - 管理应用生命周期（初始化、运行）
//! - 批量加载会话（Vec<SessionFile>）
//! - 控制并发数量（Semaphore）
//! - 持有浏览器和三个投递通道
//! - 输出全局统计信息
//!
//! ### `session_processor` - 单个会话处理器
//! - 校验并计分
//! - 交给提交编排器，等待终态
//! - 耗尽时写入失败记录
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<SessionFile>)
//!     ↓
//! session_processor (处理单个会话)
//!     ↓
//! workflow::SubmissionOrchestrator (通道调度与去重)
//!     ↓
//! channels (嵌入式表单 / 直接 API / 隐藏表单)
//!     ↓
//! infrastructure (JsExecutor / ScriptLoader)
//! ```

pub mod batch_processor;
pub mod session_processor;

pub use batch_processor::{build_channels, App};
pub use session_processor::{process_session, SessionOutcome};
