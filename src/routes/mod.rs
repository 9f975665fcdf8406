pub mod admin_applications;
pub mod admin_auth;
pub mod health;
pub mod public;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::AppState;

/// Full route table. Shared by `main` and the integration tests so both
/// exercise the same middleware stack.
pub fn app_router(state: AppState) -> Router {
    let admin_api = Router::new()
        .route(
            "/api/admin/applications",
            get(admin_applications::list_applications),
        )
        .route(
            "/api/admin/applications/summary",
            get(admin_applications::application_summary),
        )
        .route(
            "/api/admin/applications/export-csv",
            get(admin_applications::export_applications_csv),
        )
        .route(
            "/api/admin/applications/:id",
            get(admin_applications::get_application)
                .patch(admin_applications::update_application)
                .delete(admin_applications::delete_application),
        )
        .route(
            "/api/admin/applications/:id/status",
            patch(admin_applications::set_application_status),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::auth::require_admin_auth,
        ));

    Router::new()
        .route("/health", get(health::health))
        .route("/api/admin/login", post(admin_auth::login))
        .route("/api/public/applications", post(public::submit_application))
        .merge(admin_api)
        .with_state(state)
}
