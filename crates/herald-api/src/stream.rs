use axum::{
    Extension,
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
};

use herald_gateway::connection;

use crate::middleware::Claims;
use crate::state::AppState;

/// GET /stream, upgraded to a push-only WebSocket for the authenticated user.
pub async fn stream(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let dispatcher = state.dispatcher.clone();
    ws.on_upgrade(move |socket| connection::handle_connection(socket, dispatcher, claims.user_id()))
}
