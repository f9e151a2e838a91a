//! Notifier - Creazione delle notifiche e consegna push ai client online
//!
//! Le notifiche sono effetti collaterali successivi al commit: un errore qui
//! viene loggato e la richiesta originale prosegue comunque.

use crate::core::AppState;
use crate::dtos::{NewAdminNotification, NewNotification, WsEventDTO};
use crate::entities::{Notification, NotificationType, Priority, User};
use serde_json::json;
use tracing::{debug, error, instrument};

/// Lunghezza massima dell'anteprima di un messaggio dentro una notifica
const PREVIEW_CHARS: usize = 100;

pub(crate) fn preview(content: &str) -> String {
    let trimmed = content.trim();
    if trimmed.chars().count() <= PREVIEW_CHARS {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(PREVIEW_CHARS).collect();
    format!("{}...", cut)
}

/// Salva la notifica e, se il destinatario è connesso, gli spinge
/// la notifica e il nuovo contatore di non lette
#[instrument(skip(state, notification), fields(user_id = %notification.utilisateur_id))]
pub async fn send_custom(state: &AppState, notification: NewNotification) -> Option<Notification> {
    let user_id = notification.utilisateur_id;
    let created = match state.notification.insert(&notification).await {
        Ok(created) => created,
        Err(e) => {
            error!("Failed to create notification: {:?}", e);
            return None;
        }
    };

    push_with_unread_count(state, user_id, Some(created.clone())).await;
    Some(created)
}

/// Invia al client il contatore aggiornato (ed eventualmente la notifica appena creata)
pub async fn push_with_unread_count(state: &AppState, user_id: i32, notification: Option<Notification>) {
    if !state.users_online.is_user_online(user_id) {
        debug!("User {} offline, push skipped", user_id);
        return;
    }
    if let Some(notification) = notification {
        state
            .users_online
            .send_event_if_online(user_id, WsEventDTO::Notification(notification));
    }
    match state.notification.count_unread(user_id).await {
        Ok(count) => {
            state
                .users_online
                .send_event_if_online(user_id, WsEventDTO::UnreadCount { count });
        }
        Err(e) => error!("Failed to count unread notifications: {:?}", e),
    }
}

pub async fn notify_new_message(
    state: &AppState,
    sender: &User,
    recipient_id: i32,
    conversation_id: i32,
    message_id: i32,
    content: &str,
) -> Option<Notification> {
    let notification = NewNotification::new(
        recipient_id,
        NotificationType::Message,
        "new_message",
        format!("New message from {}", sender.display_name()),
        preview(content),
    )
    .related_user(sender.id)
    .related_conversation(conversation_id)
    .data(json!({
        "conversationId": conversation_id,
        "messageId": message_id,
        "senderId": sender.id,
    }));
    send_custom(state, notification).await
}

pub async fn notify_new_conversation(
    state: &AppState,
    initiator: &User,
    recipient_id: i32,
    conversation_id: i32,
    subject: &str,
) -> Option<Notification> {
    let notification = NewNotification::new(
        recipient_id,
        NotificationType::Message,
        "conversation_created",
        format!("{} started a conversation", initiator.display_name()),
        subject.to_string(),
    )
    .priority(Priority::High)
    .related_user(initiator.id)
    .related_conversation(conversation_id)
    .data(json!({ "conversationId": conversation_id, "subject": subject }));
    send_custom(state, notification).await
}

/// Notifica per il pannello amministrativo; gli errori vengono solo loggati
#[instrument(skip(state, notification), fields(category = %notification.category))]
pub async fn notify_admins(state: &AppState, notification: NewAdminNotification) {
    if let Err(e) = state.admin_notification.insert(&notification).await {
        error!("Failed to create admin notification: {:?}", e);
    }
}
