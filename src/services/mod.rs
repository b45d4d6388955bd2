pub mod case_matcher;
pub mod portal_login;
pub mod report_writer;
pub mod search_service;
pub mod status_classifier;
pub mod transmit_service;
pub mod upload_service;

pub use portal_login::PortalLogin;
pub use report_writer::ReportWriter;
pub use search_service::SearchService;
pub use status_classifier::{Classification, StatusClassifier};
pub use transmit_service::TransmitService;
pub use upload_service::{StepResult, UploadService};
