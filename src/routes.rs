use crate::handlers::auth::*;
use crate::handlers::health::health_check;
use crate::handlers::users::get_user;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Build the application router
///
/// Anything that is not an API route falls through to the demo page in
/// `static/`.
pub fn build_router(state: AppState) -> Router {
    // Permissive CORS; restrict origins for anything beyond local testing
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/register", post(register_user))
        // Registration ceremony
        .route("/webauthn/register/begin", post(begin_registration))
        .route("/webauthn/register/finish", post(finish_registration))
        // Authentication ceremony
        .route("/webauthn/login/begin", post(begin_authentication))
        .route("/webauthn/login/finish", post(finish_authentication))
        .route("/user/{username}", get(get_user));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .fallback_service(ServeDir::new("static"))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
