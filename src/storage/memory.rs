use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::admin::Admin;
use crate::models::application::{
    Application, ApplicationStatus, ApplicationSummary, ApplicationView,
};
use crate::storage::{AdminStore, ApplicationStore, ListFilter, NewApplication};

#[derive(Default)]
struct Inner {
    tenants: HashMap<Uuid, String>,
    roles: HashMap<Uuid, String>,
    admins: HashMap<Uuid, Admin>,
    applications: HashMap<Uuid, Application>,
}

/// In-memory store for tests and local experiments. Same last-writer-wins
/// semantics as the Postgres store: every operation takes the lock once,
/// reads or writes, and releases it.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_tenant(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.lock().tenants.insert(id, name.to_string());
        id
    }

    pub fn add_role(&self, title: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.lock().roles.insert(id, title.to_string());
        id
    }

    pub fn add_admin(&self, admin: Admin) {
        self.lock().admins.insert(admin.id, admin);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("memory store mutex poisoned")
    }

    fn view(inner: &Inner, app: &Application) -> ApplicationView {
        ApplicationView {
            application: app.clone(),
            tenant_name: inner.tenants.get(&app.tenant_id).cloned(),
            role_title: inner.roles.get(&app.role_id).cloned(),
        }
    }
}

#[async_trait]
impl ApplicationStore for MemoryStore {
    async fn insert(&self, new: NewApplication) -> Result<ApplicationView> {
        let mut inner = self.lock();
        let now = Utc::now();
        let app = Application {
            id: Uuid::new_v4(),
            tenant_id: new.tenant_id,
            role_id: new.role_id,
            applicant_id: new.applicant_id,
            fields: new.fields,
            status: ApplicationStatus::Pending,
            reviewed_at: None,
            reviewed_by: None,
            created_at: now,
            updated_at: now,
        };
        let view = Self::view(&inner, &app);
        inner.applications.insert(app.id, app);
        Ok(view)
    }

    async fn find(&self, id: Uuid) -> Result<Option<ApplicationView>> {
        let inner = self.lock();
        Ok(inner.applications.get(&id).map(|a| Self::view(&inner, a)))
    }

    async fn list(&self, filter: &ListFilter) -> Result<Vec<ApplicationView>> {
        let inner = self.lock();
        let mut views: Vec<ApplicationView> = inner
            .applications
            .values()
            .filter(|a| filter.tenant_id.map_or(true, |t| a.tenant_id == t))
            .filter(|a| filter.status.map_or(true, |s| a.status == s))
            .map(|a| Self::view(&inner, a))
            .collect();
        views.sort_by(|a, b| b.application.created_at.cmp(&a.application.created_at));
        Ok(views)
    }

    async fn summary(&self, tenant_id: Option<Uuid>) -> Result<ApplicationSummary> {
        let inner = self.lock();
        let mut summary = ApplicationSummary {
            total: 0,
            pending: 0,
            interviewing: 0,
            hired: 0,
        };
        for app in inner.applications.values() {
            if tenant_id.map_or(false, |t| app.tenant_id != t) {
                continue;
            }
            summary.total += 1;
            match app.status {
                ApplicationStatus::Pending => summary.pending += 1,
                ApplicationStatus::Interviewing => summary.interviewing += 1,
                s if s.is_approved_like() => summary.hired += 1,
                _ => {}
            }
        }
        Ok(summary)
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: ApplicationStatus,
        reviewed_at: DateTime<Utc>,
        reviewed_by: Uuid,
    ) -> Result<ApplicationView> {
        let mut inner = self.lock();
        let app = inner
            .applications
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound("Application not found".to_string()))?;
        app.status = status;
        app.reviewed_at = Some(reviewed_at);
        app.reviewed_by = Some(reviewed_by);
        app.updated_at = Utc::now();
        let app = app.clone();
        Ok(Self::view(&inner, &app))
    }

    async fn patch_fields(
        &self,
        id: Uuid,
        patch: serde_json::Map<String, JsonValue>,
    ) -> Result<ApplicationView> {
        let mut inner = self.lock();
        let app = inner
            .applications
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound("Application not found".to_string()))?;
        if !app.fields.is_object() {
            app.fields = JsonValue::Object(serde_json::Map::new());
        }
        if let Some(bag) = app.fields.as_object_mut() {
            for (key, value) in patch {
                bag.insert(key, value);
            }
        }
        app.updated_at = Utc::now();
        let app = app.clone();
        Ok(Self::view(&inner, &app))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.lock().applications.remove(&id).is_some())
    }
}

#[async_trait]
impl AdminStore for MemoryStore {
    async fn find_active(&self, id: Uuid) -> Result<Option<Admin>> {
        Ok(self
            .lock()
            .admins
            .get(&id)
            .filter(|a| a.is_active)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Admin>> {
        let needle = email.trim().to_lowercase();
        Ok(self
            .lock()
            .admins
            .values()
            .find(|a| a.email == needle && a.is_active)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn seed(store: &MemoryStore) -> (Uuid, Uuid) {
        (store.add_tenant("Acme Corp"), store.add_role("Engineer"))
    }

    #[test]
    fn patch_merges_into_the_field_bag() {
        let store = MemoryStore::new();
        let (tenant_id, role_id) = seed(&store);
        tokio_test::block_on(async {
            let view = store
                .insert(NewApplication {
                    tenant_id,
                    role_id,
                    applicant_id: None,
                    fields: json!({"fullName": "Jane", "phone": "111"}),
                })
                .await
                .unwrap();

            let mut patch = serde_json::Map::new();
            patch.insert("phone".to_string(), json!("222"));
            patch.insert("city".to_string(), json!("Berlin"));
            let updated = store.patch_fields(view.application.id, patch).await.unwrap();

            let fields = &updated.application.fields;
            assert_eq!(fields["fullName"], "Jane");
            assert_eq!(fields["phone"], "222");
            assert_eq!(fields["city"], "Berlin");
        });
    }

    #[test]
    fn list_is_newest_first() {
        let store = MemoryStore::new();
        let (tenant_id, role_id) = seed(&store);
        tokio_test::block_on(async {
            let mut ids = Vec::new();
            for _ in 0..3 {
                let view = store
                    .insert(NewApplication {
                        tenant_id,
                        role_id,
                        applicant_id: None,
                        fields: json!({}),
                    })
                    .await
                    .unwrap();
                ids.push(view.application.id);
                // created_at must strictly increase for the ordering check
                tokio::time::sleep(std::time::Duration::from_millis(2)).await;
            }
            let listed: Vec<Uuid> = store
                .list(&ListFilter::default())
                .await
                .unwrap()
                .into_iter()
                .map(|v| v.application.id)
                .collect();
            ids.reverse();
            assert_eq!(listed, ids);
        });
    }
}
