pub mod submission_ctx;
pub mod submission_orchestrator;

pub use submission_ctx::SubmissionCtx;
pub use submission_orchestrator::{
    RetryPolicy, SubmissionHandle, SubmissionOrchestrator, SubmissionState, SubmittedFlag, MAX_ATTEMPTS,
};
