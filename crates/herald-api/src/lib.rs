pub mod applications;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod state;
pub mod stream;


use axum::{
    Json, Router, middleware as axum_middleware,
    routing::{delete, get, post},
};
use serde_json::{Value, json};

pub use error::ApiError;
pub use state::{AppState, AppStateInner};

/// Every HTTP route of the server, without transport layers (CORS, tracing).
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        // Authenticated by application token, not by user JWT
        .route("/message", post(messages::create_message))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/message", get(messages::get_messages).delete(messages::delete_messages))
        .route("/message/{id}", delete(messages::delete_message))
        .route(
            "/application/{id}/message",
            get(messages::get_application_messages).delete(messages::delete_application_messages),
        )
        .route("/application", post(applications::create_application))
        .route("/stream", get(stream::stream))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
