use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::admin::Admin;
use crate::models::application::Application;

/// Tenant visibility of a principal for list-style operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantScope {
    /// Super admin with no explicit filter: every tenant.
    All,
    /// Restricted to one tenant, either by the principal's own binding or
    /// by an explicit super-admin filter.
    Tenant(Uuid),
}

impl TenantScope {
    pub fn tenant_filter(&self) -> Option<Uuid> {
        match self {
            TenantScope::All => None,
            TenantScope::Tenant(id) => Some(*id),
        }
    }
}

/// Resolve what the principal may see. A tenant admin is always pinned to
/// their own tenant; a client-supplied filter cannot widen (or even shift)
/// their scope. A super admin sees everything unless they narrow
/// themselves with an explicit filter.
pub fn resolve_scope(principal: &Admin, requested_tenant: Option<Uuid>) -> TenantScope {
    if let Some(own_tenant) = principal.tenant_id.filter(|_| !principal.is_super()) {
        return TenantScope::Tenant(own_tenant);
    }
    match requested_tenant {
        Some(id) => TenantScope::Tenant(id),
        None => TenantScope::All,
    }
}

/// May the principal read or mutate this specific application?
/// Pure decision: `Ok` or `Forbidden`, never a generic error.
pub fn authorize_access(principal: &Admin, application: &Application) -> Result<()> {
    if principal.is_super() {
        return Ok(());
    }
    match principal.tenant_id {
        Some(own_tenant) if own_tenant == application.tenant_id => Ok(()),
        _ => Err(Error::Forbidden(
            "You can only access applications for your own company".to_string(),
        )),
    }
}
