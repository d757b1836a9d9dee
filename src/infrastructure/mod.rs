pub mod js_executor;
pub mod script_loader;

pub use js_executor::{JsExecutor, JsReport};
pub use script_loader::ScriptLoader;
