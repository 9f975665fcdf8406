use chrono::Utc;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::dto::admin_dto::{ReviewedApplication, StatusOutcome};
use crate::error::{Error, Result};
use crate::models::admin::Admin;
use crate::models::application::{looks_like_email, ApplicationStatus, ALLOWED_STATUSES};
use crate::services::access_policy;
use crate::services::notification_service::NotificationService;
use crate::storage::ApplicationStore;

/// The application review state machine: validate the target status, load
/// and authorize, persist the transition, then notify best-effort.
///
/// Transitions are a flat setter on purpose. Re-reviewing, repeating the
/// current status, and moving "backwards" (rejected back to pending) are
/// all allowed; only set membership is validated.
#[derive(Clone)]
pub struct ReviewService {
    store: Arc<dyn ApplicationStore>,
    notifications: NotificationService,
}

impl ReviewService {
    pub fn new(store: Arc<dyn ApplicationStore>, notifications: NotificationService) -> Self {
        Self {
            store,
            notifications,
        }
    }

    pub async fn set_status(
        &self,
        principal: &Admin,
        application_id: Uuid,
        status_raw: &str,
        message: Option<&str>,
    ) -> Result<StatusOutcome> {
        // Validation short-circuits before any lookup or write.
        let status = ApplicationStatus::from_str(status_raw).map_err(|_| {
            let allowed: Vec<&str> = ALLOWED_STATUSES.iter().map(|s| s.as_str()).collect();
            Error::BadRequest(format!("status must be one of: {}", allowed.join(", ")))
        })?;

        let view = self
            .store
            .find(application_id)
            .await?
            .ok_or_else(|| Error::NotFound("Application not found".to_string()))?;
        access_policy::authorize_access(principal, &view.application)?;

        // The transition commits regardless of what delivery does next.
        let updated = self
            .store
            .set_status(application_id, status, Utc::now(), principal.id)
            .await?;

        let applicant_email = updated.application.applicant_email();
        let should_send = status.triggers_email()
            && applicant_email
                .as_deref()
                .map_or(false, looks_like_email);

        let (email_sent, email_error) = if should_send {
            let email = applicant_email.unwrap_or_default();
            let applicant_name = updated.application.applicant_name();
            let tenant_name = updated.tenant_name.clone().unwrap_or_else(|| "Company".to_string());
            let role_title = updated.role_title.clone().unwrap_or_else(|| "the role".to_string());
            let outcome = self
                .notifications
                .send_status_email(
                    &email,
                    &applicant_name,
                    &tenant_name,
                    &role_title,
                    status,
                    message,
                )
                .await;
            tracing::info!(
                application_id = %application_id,
                status = %status,
                sent = outcome.sent,
                "Application status email dispatched"
            );
            (outcome.sent, if outcome.sent { None } else { outcome.error })
        } else {
            (
                false,
                Some("No applicant email in application data".to_string()),
            )
        };

        Ok(StatusOutcome {
            application: ReviewedApplication {
                id: updated.application.id,
                status: updated.application.status,
                reviewed_at: updated.application.reviewed_at,
            },
            email_sent,
            email_error,
        })
    }
}
