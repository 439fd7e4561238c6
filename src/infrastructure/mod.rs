pub mod chrome_viewer;
pub mod js_executor;
pub mod viewer;

pub use chrome_viewer::{ChromeLauncher, ChromeViewer, ViewerTimeouts};
pub use js_executor::JsExecutor;
pub use viewer::{ViewerLauncher, ViewerSession};
