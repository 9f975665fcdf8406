use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::str::FromStr;
use uuid::Uuid;

use crate::config::get_config;
use crate::error::{Error, Result};
use crate::models::admin::{Admin, AdminRole};
use crate::models::application::{
    Application, ApplicationStatus, ApplicationSummary, ApplicationView,
};
use crate::storage::{AdminStore, ApplicationStore, ListFilter, NewApplication};

const VIEW_COLUMNS: &str = r#"
    a.id, a.tenant_id, a.role_id, a.applicant_id, a.fields, a.status,
    a.reviewed_at, a.reviewed_by, a.created_at, a.updated_at,
    t.name AS tenant_name, r.title AS role_title
"#;

/// PostgreSQL-backed store. `fields` lives in a JSONB column so the
/// schemaless bag survives round trips untouched.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect using the process config and run pending migrations.
    pub async fn connect() -> Result<Self> {
        let config = get_config();
        let pool = PgPoolOptions::new()
            .max_connections(50)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect(&config.database_url)
            .await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| Error::Internal(format!("Migration failed: {}", e)))?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn row_to_view(row: &PgRow) -> Result<ApplicationView> {
    let status_raw: String = row.try_get("status")?;
    let status = ApplicationStatus::from_str(&status_raw)
        .map_err(|_| Error::Internal(format!("Unknown status in storage: {}", status_raw)))?;
    Ok(ApplicationView {
        application: Application {
            id: row.try_get("id")?,
            tenant_id: row.try_get("tenant_id")?,
            role_id: row.try_get("role_id")?,
            applicant_id: row.try_get("applicant_id")?,
            fields: row.try_get("fields")?,
            status,
            reviewed_at: row.try_get("reviewed_at")?,
            reviewed_by: row.try_get("reviewed_by")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        },
        tenant_name: row.try_get("tenant_name")?,
        role_title: row.try_get("role_title")?,
    })
}

fn row_to_admin(row: &PgRow) -> Result<Admin> {
    let role_raw: String = row.try_get("role")?;
    let role = AdminRole::from_str(&role_raw)
        .map_err(|_| Error::Internal(format!("Unknown admin role in storage: {}", role_raw)))?;
    Ok(Admin {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        role,
        tenant_id: row.try_get("tenant_id")?,
        name: row.try_get("name")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl ApplicationStore for PgStore {
    async fn insert(&self, new: NewApplication) -> Result<ApplicationView> {
        let row = sqlx::query(&format!(
            r#"
            WITH inserted AS (
                INSERT INTO applications (tenant_id, role_id, applicant_id, fields)
                VALUES ($1, $2, $3, $4)
                RETURNING *
            )
            SELECT {VIEW_COLUMNS}
            FROM inserted a
            LEFT JOIN tenants t ON t.id = a.tenant_id
            LEFT JOIN roles r ON r.id = a.role_id
            "#
        ))
        .bind(new.tenant_id)
        .bind(new.role_id)
        .bind(new.applicant_id)
        .bind(new.fields)
        .fetch_one(&self.pool)
        .await?;
        row_to_view(&row)
    }

    async fn find(&self, id: Uuid) -> Result<Option<ApplicationView>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {VIEW_COLUMNS}
            FROM applications a
            LEFT JOIN tenants t ON t.id = a.tenant_id
            LEFT JOIN roles r ON r.id = a.role_id
            WHERE a.id = $1
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_view).transpose()
    }

    async fn list(&self, filter: &ListFilter) -> Result<Vec<ApplicationView>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {VIEW_COLUMNS}
            FROM applications a
            LEFT JOIN tenants t ON t.id = a.tenant_id
            LEFT JOIN roles r ON r.id = a.role_id
            WHERE ($1::uuid IS NULL OR a.tenant_id = $1)
              AND ($2::text IS NULL OR a.status = $2)
            ORDER BY a.created_at DESC
            "#
        ))
        .bind(filter.tenant_id)
        .bind(filter.status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_view).collect()
    }

    async fn summary(&self, tenant_id: Option<Uuid>) -> Result<ApplicationSummary> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                COUNT(*) FILTER (WHERE status = 'interviewing') AS interviewing,
                COUNT(*) FILTER (WHERE status IN ('hired', 'approved')) AS hired
            FROM applications
            WHERE ($1::uuid IS NULL OR tenant_id = $1)
            "#,
        )
        .bind(tenant_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(ApplicationSummary {
            total: row.try_get("total")?,
            pending: row.try_get("pending")?,
            interviewing: row.try_get("interviewing")?,
            hired: row.try_get("hired")?,
        })
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: ApplicationStatus,
        reviewed_at: DateTime<Utc>,
        reviewed_by: Uuid,
    ) -> Result<ApplicationView> {
        let row = sqlx::query(&format!(
            r#"
            WITH updated AS (
                UPDATE applications
                SET status = $2, reviewed_at = $3, reviewed_by = $4, updated_at = NOW()
                WHERE id = $1
                RETURNING *
            )
            SELECT {VIEW_COLUMNS}
            FROM updated a
            LEFT JOIN tenants t ON t.id = a.tenant_id
            LEFT JOIN roles r ON r.id = a.role_id
            "#
        ))
        .bind(id)
        .bind(status.as_str())
        .bind(reviewed_at)
        .bind(reviewed_by)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => row_to_view(&row),
            None => Err(Error::NotFound("Application not found".to_string())),
        }
    }

    async fn patch_fields(
        &self,
        id: Uuid,
        patch: serde_json::Map<String, JsonValue>,
    ) -> Result<ApplicationView> {
        let row = sqlx::query(&format!(
            r#"
            WITH updated AS (
                UPDATE applications
                SET fields = fields || $2::jsonb, updated_at = NOW()
                WHERE id = $1
                RETURNING *
            )
            SELECT {VIEW_COLUMNS}
            FROM updated a
            LEFT JOIN tenants t ON t.id = a.tenant_id
            LEFT JOIN roles r ON r.id = a.role_id
            "#
        ))
        .bind(id)
        .bind(JsonValue::Object(patch))
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => row_to_view(&row),
            None => Err(Error::NotFound("Application not found".to_string())),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM applications WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl AdminStore for PgStore {
    async fn find_active(&self, id: Uuid) -> Result<Option<Admin>> {
        let row = sqlx::query(
            r#"
            SELECT id, email, password_hash, role, tenant_id, name, is_active,
                   created_at, updated_at
            FROM admins
            WHERE id = $1 AND is_active
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_admin).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Admin>> {
        let row = sqlx::query(
            r#"
            SELECT id, email, password_hash, role, tenant_id, name, is_active,
                   created_at, updated_at
            FROM admins
            WHERE email = $1 AND is_active
            "#,
        )
        .bind(email.trim().to_lowercase())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_admin).transpose()
    }
}
