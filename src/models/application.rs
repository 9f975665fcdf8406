use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::str::FromStr;
use uuid::Uuid;

/// Review status of a submitted application.
///
/// Flat state machine: any status can move to any other, including back to
/// `pending` from `hired` or `rejected`. There is deliberately no transition
/// table; the review endpoint is a plain setter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Reviewed,
    Interviewing,
    Hired,
    Approved,
    Rejected,
}

pub const ALLOWED_STATUSES: [ApplicationStatus; 6] = [
    ApplicationStatus::Pending,
    ApplicationStatus::Reviewed,
    ApplicationStatus::Interviewing,
    ApplicationStatus::Hired,
    ApplicationStatus::Approved,
    ApplicationStatus::Rejected,
];

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Reviewed => "reviewed",
            ApplicationStatus::Interviewing => "interviewing",
            ApplicationStatus::Hired => "hired",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    /// `hired` and `approved` are treated as the same positive outcome
    /// ("Accepted" in the dashboard UI).
    pub fn is_approved_like(&self) -> bool {
        matches!(self, ApplicationStatus::Approved | ApplicationStatus::Hired)
    }

    /// Only approval and rejection transitions notify the applicant. The
    /// composer has copy for the remaining statuses but this guard keeps
    /// those branches unreached.
    pub fn triggers_email(&self) -> bool {
        self.is_approved_like() || matches!(self, ApplicationStatus::Rejected)
    }
}

impl FromStr for ApplicationStatus {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ApplicationStatus::Pending),
            "reviewed" => Ok(ApplicationStatus::Reviewed),
            "interviewing" => Ok(ApplicationStatus::Interviewing),
            "hired" => Ok(ApplicationStatus::Hired),
            "approved" => Ok(ApplicationStatus::Approved),
            "rejected" => Ok(ApplicationStatus::Rejected),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One applicant's submission for one role at one tenant.
///
/// `fields` is schemaless by design: tenants attach arbitrary form fields
/// per role, so it stays a JSON object and specific keys (`email`,
/// `fullName`) are read through safe coercing lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub role_id: Uuid,
    pub applicant_id: Option<Uuid>,
    pub fields: JsonValue,
    pub status: ApplicationStatus,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Application {
    /// Applicant email from the field bag, trimmed. `None` when absent or
    /// not coercible to a string.
    pub fn applicant_email(&self) -> Option<String> {
        field_string(&self.fields, "email").filter(|s| !s.is_empty())
    }

    /// Display name: `fullName`, then `name`, then a generic fallback.
    pub fn applicant_name(&self) -> String {
        field_string(&self.fields, "fullName")
            .or_else(|| field_string(&self.fields, "name"))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "Applicant".to_string())
    }
}

/// Coercing lookup into a schemaless field bag: strings pass through,
/// numbers and booleans are stringified, everything else is `None`.
pub fn field_string(fields: &JsonValue, key: &str) -> Option<String> {
    match fields.get(key)? {
        JsonValue::String(s) => Some(s.trim().to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Minimal check used by the notification guard: non-empty and contains '@'.
pub fn looks_like_email(addr: &str) -> bool {
    !addr.trim().is_empty() && addr.contains('@')
}

/// Application joined with tenant name and role title for admin listings
/// and the CSV export.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationView {
    #[serde(flatten)]
    pub application: Application,
    pub tenant_name: Option<String>,
    pub role_title: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationSummary {
    pub total: i64,
    pub pending: i64,
    pub interviewing: i64,
    /// Counts both `hired` and `approved` (legacy alias kept for the
    /// dashboard KPIs).
    pub hired: i64,
}
