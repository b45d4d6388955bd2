pub mod cdp_driver;
pub mod js_executor;
pub mod pacing;
pub mod page_driver;
pub mod screenshots;

pub use cdp_driver::CdpDriver;
pub use js_executor::JsExecutor;
pub use pacing::{NoPacing, Pacing, Pause, RandomPacing};
pub use page_driver::{NodeSnapshot, PageDriver, WaitState};
pub use screenshots::Screenshotter;
