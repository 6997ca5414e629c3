mod session;

use axum::{
    extract::{ws::WebSocketUpgrade, State},
    response::IntoResponse,
};
use std::sync::Arc;

use crate::state::AppState;

pub use session::read_loop;

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    tracing::debug!("WebSocket connection request");
    ws.on_upgrade(move |socket| session::handle_socket(socket, state))
}
