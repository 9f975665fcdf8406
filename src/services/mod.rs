pub mod access_policy;
pub mod application_service;
pub mod notification_service;
pub mod review_service;
