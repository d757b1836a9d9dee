pub mod toml_loader;

pub use toml_loader::{load_all_session_files, load_question_bank, load_session_file};
