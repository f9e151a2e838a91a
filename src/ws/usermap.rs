use dashmap::DashMap;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, instrument, warn};

use crate::dtos::WsEventDTO;

pub enum InternalSignal {
    Shutdown,
    Event(WsEventDTO),
    Pong(axum::body::Bytes),
}

/// Connessioni WebSocket attive, al più una per utente
pub struct UserMap {
    users_online: DashMap<i32, UnboundedSender<InternalSignal>>,
}

impl Default for UserMap {
    fn default() -> Self {
        Self::new()
    }
}

impl UserMap {
    pub fn new() -> Self {
        UserMap {
            users_online: DashMap::new(),
        }
    }

    /// Una seconda connessione dello stesso utente sostituisce la prima, che viene chiusa
    #[instrument(skip(self, tx))]
    pub fn register_online(&self, user_id: i32, tx: UnboundedSender<InternalSignal>) {
        info!("Registering user {} as online", user_id);
        if let Some(previous) = self.users_online.insert(user_id, tx) {
            info!("Replacing previous connection of user {}", user_id);
            let _ = previous.send(InternalSignal::Shutdown);
        }
        info!("Total online users: {}", self.users_online.len());
    }

    /// Rimuove l'utente solo se la voce appartiene ancora a questa connessione
    #[instrument(skip(self, tx))]
    pub fn remove_from_online(&self, user_id: i32, tx: &UnboundedSender<InternalSignal>) {
        let removed = self
            .users_online
            .remove_if(&user_id, |_, current| current.same_channel(tx));
        if removed.is_some() {
            info!("User {} removed from online", user_id);
        } else {
            debug!("Connection of user {} already replaced", user_id);
        }
    }

    /// Ritorna true se l'evento è stato accodato
    #[instrument(skip(self, event))]
    pub fn send_event_if_online(&self, user_id: i32, event: WsEventDTO) -> bool {
        let Some(entry) = self.users_online.get(&user_id) else {
            debug!("User {} not online, event not sent", user_id);
            return false;
        };
        match entry.value().send(InternalSignal::Event(event)) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to queue event for user {}: {:?}", user_id, e.0.kind());
                false
            }
        }
    }

    pub fn online_count(&self) -> usize {
        self.users_online.len()
    }

    pub fn is_user_online(&self, user_id: i32) -> bool {
        self.users_online.contains_key(&user_id)
    }
}

impl InternalSignal {
    fn kind(&self) -> &'static str {
        match self {
            InternalSignal::Shutdown => "Shutdown",
            InternalSignal::Event(_) => "Event",
            InternalSignal::Pong(_) => "Pong",
        }
    }
}
