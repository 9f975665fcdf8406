use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::admin::{Admin, AdminRole};
use crate::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Admin id.
    pub sub: String,
    pub role: AdminRole,
    pub tenant_id: Option<Uuid>,
    pub exp: usize,
}

pub fn create_token(admin: &Admin) -> Result<String> {
    let config = crate::config::get_config();
    let claims = Claims {
        sub: admin.id.to_string(),
        role: admin.role,
        tenant_id: admin.tenant_id,
        exp: (Utc::now() + Duration::hours(24)).timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| Error::Internal(format!("Failed to sign token: {}", e)))
}

fn unauthorized(code: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": code }))).into_response()
}

/// Verify the bearer token and resolve it to a live admin row, which is
/// attached as a request extension. The token alone is not trusted for
/// role or tenant: a deactivated admin is rejected even with a valid,
/// unexpired token.
pub async fn require_admin_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return unauthorized("missing_authorization");
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return unauthorized("bad_authorization");
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return unauthorized("unsupported_scheme");
    };

    let config = crate::config::get_config();
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let claims = match decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    ) {
        Ok(data) => data.claims,
        Err(_) => return unauthorized("invalid_token"),
    };

    let Ok(admin_id) = claims.sub.parse::<Uuid>() else {
        return unauthorized("invalid_token");
    };
    let admin = match state.admins.find_active(admin_id).await {
        Ok(Some(admin)) => admin,
        Ok(None) => return unauthorized("inactive_admin"),
        Err(err) => {
            tracing::error!(error = ?err, "Admin lookup failed during auth");
            return err.into_response();
        }
    };

    req.extensions_mut().insert(admin);
    next.run(req).await
}
