pub mod failure_writer;
pub mod scoring;

pub use failure_writer::FailureWriter;
pub use scoring::{ReadinessTier, ScoreCard};
