//! WebSocket Module - Canale push verso i client autenticati
//!
//! Il server non accetta comandi sul socket: lo usa solo per consegnare
//! notifiche, contatori di non lette e nuovi messaggi.
//! - Upgrade HTTP -> WebSocket dopo l'autenticazione JWT
//! - Task di scrittura e di ascolto separati per connessione
//! - UserMap con al più una connessione per utente

pub mod connection;
pub mod usermap;

pub use connection::handle_socket;
pub use usermap::{InternalSignal, UserMap};

use crate::{AppState, entities::User};
use axum::{
    Extension,
    extract::{State, ws::WebSocketUpgrade},
    response::Response,
};
use std::sync::Arc;

/// Secondi di silenzio del client dopo i quali la connessione viene chiusa
pub const TIMEOUT_DURATION_SECONDS: u64 = 300;

/// Entry point per gestire richieste di upgrade WebSocket
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>, // ottenuto dall'autenticazione JWT
) -> Response {
    let user_id = current_user.id;
    ws.on_upgrade(move |socket| handle_socket(socket, state, user_id))
}
