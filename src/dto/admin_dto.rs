use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::admin::{Admin, AdminRole};
use crate::models::application::ApplicationStatus;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminProfile {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: AdminRole,
    pub tenant_id: Option<Uuid>,
}

impl From<&Admin> for AdminProfile {
    fn from(admin: &Admin) -> Self {
        Self {
            id: admin.id,
            email: admin.email.clone(),
            name: admin.name.clone(),
            role: admin.role,
            tenant_id: admin.tenant_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub admin: AdminProfile,
    pub token: String,
}

/// Body of the status-change endpoint. `status` stays a raw string so
/// unknown values surface as a 400 listing the allowed set instead of a
/// deserialization rejection.
#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: String,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ApplicationListParams {
    #[serde(rename = "tenantId")]
    pub tenant_id: Option<Uuid>,
    pub status: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct TenantFilterParams {
    #[serde(rename = "tenantId")]
    pub tenant_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewedApplication {
    pub id: Uuid,
    pub status: ApplicationStatus,
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// Result of a status change: the committed transition plus the delivery
/// outcome. `email_error` never turns into an HTTP failure.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusOutcome {
    pub application: ReviewedApplication,
    pub email_sent: bool,
    pub email_error: Option<String>,
}
