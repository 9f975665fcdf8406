pub mod memory;
pub mod pg;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::Result;
use crate::models::admin::Admin;
use crate::models::application::{
    ApplicationStatus, ApplicationSummary, ApplicationView,
};

pub use memory::MemoryStore;
pub use pg::PgStore;

/// Fields of a new application, before the store assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewApplication {
    pub tenant_id: Uuid,
    pub role_id: Uuid,
    pub applicant_id: Option<Uuid>,
    pub fields: JsonValue,
}

/// Tenant/status filter for listings and aggregates. The tenant component
/// comes from the access policy, never straight from the client.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub tenant_id: Option<Uuid>,
    pub status: Option<ApplicationStatus>,
}

/// Persistence for applications, joined with tenant and role names.
///
/// One call = one read or one write of one document; there is no
/// compare-and-swap on `set_status`, so concurrent reviews of the same
/// application resolve last-writer-wins.
#[async_trait]
pub trait ApplicationStore: Send + Sync {
    async fn insert(&self, new: NewApplication) -> Result<ApplicationView>;

    async fn find(&self, id: Uuid) -> Result<Option<ApplicationView>>;

    /// Filtered list, newest first.
    async fn list(&self, filter: &ListFilter) -> Result<Vec<ApplicationView>>;

    async fn summary(&self, tenant_id: Option<Uuid>) -> Result<ApplicationSummary>;

    /// Unconditionally set status and review metadata. Errors with
    /// `NotFound` if the application vanished between load and write.
    async fn set_status(
        &self,
        id: Uuid,
        status: ApplicationStatus,
        reviewed_at: DateTime<Utc>,
        reviewed_by: Uuid,
    ) -> Result<ApplicationView>;

    /// Merge the given entries into the field bag. Never touches status or
    /// review metadata.
    async fn patch_fields(
        &self,
        id: Uuid,
        patch: serde_json::Map<String, JsonValue>,
    ) -> Result<ApplicationView>;

    /// Hard delete. Returns `false` if nothing matched.
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

/// Lookup of admin principals for authentication.
#[async_trait]
pub trait AdminStore: Send + Sync {
    /// Admin by id, only if still active.
    async fn find_active(&self, id: Uuid) -> Result<Option<Admin>>;

    /// Active admin by (lowercased) email, for login.
    async fn find_by_email(&self, email: &str) -> Result<Option<Admin>>;
}
