pub mod config;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod storage;
pub mod utils;

use std::sync::Arc;
use std::time::Duration;

use crate::services::application_service::ApplicationService;
use crate::services::notification_service::{MailTransport, NotificationService};
use crate::services::review_service::ReviewService;
use crate::storage::{AdminStore, ApplicationStore};

/// Process-wide handles, built once at startup and injected everywhere.
/// Storage and mail transport are trait objects so tests can swap in the
/// in-memory store and a fake transport.
#[derive(Clone)]
pub struct AppState {
    pub admins: Arc<dyn AdminStore>,
    pub application_service: ApplicationService,
    pub review_service: ReviewService,
    pub notification_service: NotificationService,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ApplicationStore>,
        admins: Arc<dyn AdminStore>,
        mail_transport: Arc<dyn MailTransport>,
        mail_from: String,
        email_retry_delay: Duration,
    ) -> Self {
        let notification_service =
            NotificationService::new(mail_transport, mail_from, email_retry_delay);
        let application_service = ApplicationService::new(store.clone());
        let review_service = ReviewService::new(store, notification_service.clone());

        Self {
            admins,
            application_service,
            review_service,
            notification_service,
        }
    }
}
