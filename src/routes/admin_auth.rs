use axum::{extract::State, response::IntoResponse, Json};
use validator::Validate;

use crate::dto::admin_dto::{AdminProfile, LoginRequest, LoginResponse};
use crate::error::{Error, Result};
use crate::middleware::auth::create_token;
use crate::utils::crypto::verify_password;
use crate::AppState;

/// POST /api/admin/login
///
/// Invalid email and wrong password collapse into the same 401 so the
/// endpoint does not confirm which admin accounts exist.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let admin = state
        .admins
        .find_by_email(&payload.email)
        .await?
        .ok_or_else(|| Error::Unauthorized("Invalid email or password".to_string()))?;
    if !verify_password(&payload.password, &admin.password_hash)? {
        return Err(Error::Unauthorized("Invalid email or password".to_string()));
    }

    let token = create_token(&admin)?;
    tracing::info!(admin_id = %admin.id, role = ?admin.role, "Admin logged in");
    Ok(Json(LoginResponse {
        admin: AdminProfile::from(&admin),
        token,
    }))
}
