pub mod loaders;
pub mod question;
pub mod session;
pub mod submission;

pub use loaders::{load_all_session_files, load_question_bank, load_session_file};
pub use question::{AnswerOption, Pillar, Question, QuestionBank};
pub use session::{AnswerRecord, AssessmentSession, RawUserInfo, SessionFile, UserInfo};
pub use submission::{AssessmentSubmission, FormField};
