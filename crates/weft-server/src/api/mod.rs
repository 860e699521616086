pub mod discovery;
pub mod workflows;

use axum::Router;

use weft_core::state::AppState;

/// Build the complete API router with all sub-routes.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .nest("/api/workflows", workflows::router())
        .nest("/api/discovery", discovery::router())
}
