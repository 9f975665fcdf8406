use serde_json::{Map, Value as JsonValue};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::dto::admin_dto::ApplicationListParams;
use crate::error::{Error, Result};
use crate::models::admin::Admin;
use crate::models::application::{ApplicationStatus, ApplicationSummary, ApplicationView};
use crate::services::access_policy;
use crate::storage::{ApplicationStore, ListFilter, NewApplication};

/// Keys a field patch may never touch: review metadata belongs to the
/// status endpoint, tenant/role bindings are immutable after creation.
const PROTECTED_PATCH_KEYS: [&str; 5] =
    ["status", "reviewedAt", "reviewedBy", "tenantId", "roleId"];

/// Query/projection surface over the application collection, plus the
/// creation, field-patch and delete passthroughs. Every operation resolves
/// the principal's scope through the access policy first.
#[derive(Clone)]
pub struct ApplicationService {
    store: Arc<dyn ApplicationStore>,
}

impl ApplicationService {
    pub fn new(store: Arc<dyn ApplicationStore>) -> Self {
        Self { store }
    }

    pub async fn submit(
        &self,
        tenant_id: Uuid,
        role_id: Uuid,
        applicant_id: Option<Uuid>,
        fields: Map<String, JsonValue>,
    ) -> Result<ApplicationView> {
        // Empty-string form values are dropped, matching the intake form.
        let fields: Map<String, JsonValue> = fields
            .into_iter()
            .filter(|(_, v)| !matches!(v, JsonValue::String(s) if s.is_empty()))
            .collect();
        self.store
            .insert(NewApplication {
                tenant_id,
                role_id,
                applicant_id,
                fields: JsonValue::Object(fields),
            })
            .await
    }

    pub async fn list(
        &self,
        principal: &Admin,
        params: &ApplicationListParams,
    ) -> Result<Vec<ApplicationView>> {
        let scope = access_policy::resolve_scope(principal, params.tenant_id);
        let filter = ListFilter {
            tenant_id: scope.tenant_filter(),
            // Unknown status values in the query are ignored, not rejected.
            status: params
                .status
                .as_deref()
                .and_then(|s| ApplicationStatus::from_str(s).ok()),
        };
        let mut list = self.store.list(&filter).await?;

        if let Some(term) = params.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let needle = term.to_lowercase();
            list.retain(|view| matches_search(view, &needle));
        }
        Ok(list)
    }

    pub async fn get(&self, principal: &Admin, id: Uuid) -> Result<ApplicationView> {
        let view = self
            .store
            .find(id)
            .await?
            .ok_or_else(|| Error::NotFound("Application not found".to_string()))?;
        access_policy::authorize_access(principal, &view.application)?;
        Ok(view)
    }

    pub async fn summary(
        &self,
        principal: &Admin,
        tenant_id: Option<Uuid>,
    ) -> Result<ApplicationSummary> {
        let scope = access_policy::resolve_scope(principal, tenant_id);
        self.store.summary(scope.tenant_filter()).await
    }

    /// CSV export of the scoped application list. Fixed column order;
    /// escaping is the writer's RFC behavior (quote on comma, quote or
    /// newline, with inner quotes doubled).
    pub async fn export_csv(&self, principal: &Admin, tenant_id: Option<Uuid>) -> Result<Vec<u8>> {
        let scope = access_policy::resolve_scope(principal, tenant_id);
        let list = self
            .store
            .list(&ListFilter {
                tenant_id: scope.tenant_filter(),
                status: None,
            })
            .await?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record([
            "Application ID",
            "Company",
            "Role",
            "Applicant Name",
            "Email",
            "Status",
            "Applied At",
            "Reviewed At",
        ])?;
        for view in &list {
            let app = &view.application;
            writer.write_record([
                app.id.to_string(),
                view.tenant_name.clone().unwrap_or_default(),
                view.role_title.clone().unwrap_or_default(),
                app.applicant_name(),
                app.applicant_email().unwrap_or_default(),
                app.status.as_str().to_string(),
                app.created_at.to_rfc3339(),
                app.reviewed_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
            ])?;
        }
        writer
            .into_inner()
            .map_err(|e| Error::Internal(format!("CSV buffer error: {}", e)))
    }

    /// Generic field patch. Review metadata and ownership keys are
    /// stripped, not rejected, so clients can resubmit whole documents.
    pub async fn patch(
        &self,
        principal: &Admin,
        id: Uuid,
        mut patch: Map<String, JsonValue>,
    ) -> Result<ApplicationView> {
        let view = self
            .store
            .find(id)
            .await?
            .ok_or_else(|| Error::NotFound("Application not found".to_string()))?;
        access_policy::authorize_access(principal, &view.application)?;

        for key in PROTECTED_PATCH_KEYS {
            patch.remove(key);
        }
        self.store.patch_fields(id, patch).await
    }

    pub async fn delete(&self, principal: &Admin, id: Uuid) -> Result<()> {
        let view = self
            .store
            .find(id)
            .await?
            .ok_or_else(|| Error::NotFound("Application not found".to_string()))?;
        access_policy::authorize_access(principal, &view.application)?;
        self.store.delete(id).await?;
        Ok(())
    }
}

/// Case-insensitive substring match over applicant name, applicant email,
/// tenant name and role title. Applied in-process after the store filter.
fn matches_search(view: &ApplicationView, needle: &str) -> bool {
    let app = &view.application;
    let haystacks = [
        Some(app.applicant_name()),
        app.applicant_email(),
        view.tenant_name.clone(),
        view.role_title.clone(),
    ];
    haystacks
        .into_iter()
        .flatten()
        .any(|h| h.to_lowercase().contains(needle))
}
