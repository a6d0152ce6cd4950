pub mod catalog_service;
pub mod quiz_attempt_service;
pub mod quiz_service;
pub mod report_service;
pub mod retake_service;
pub mod user_service;
