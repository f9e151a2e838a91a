//! Message DTOs - Conversazioni, messaggi, allegati e ricerca

use crate::entities::{Attachment, Conversation, ConversationType, MessageType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ********************* CONVERSAZIONI **********************//

#[derive(Deserialize, Debug, Default)]
pub struct ConversationListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
}

/// Riga della lista conversazioni con ultimo messaggio e non letti
#[derive(Serialize, Debug, Clone, FromRow)]
pub struct ConversationSummaryDTO {
    pub id: i32,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub conversation_type: ConversationType,
    pub subject: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_read_at: Option<DateTime<Utc>>,
    pub is_muted: bool,
    pub last_message_content: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub last_message_type: Option<MessageType>,
    pub last_sender_name: Option<String>,
    pub unread_count: i64,
    /// Nomi degli altri partecipanti separati da virgola
    pub participants: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct CreateConversationDTO {
    #[serde(default)]
    pub participants: Vec<i32>,
    pub subject: Option<String>,
    #[serde(rename = "initialMessage", default)]
    pub initial_message: String,
}

impl CreateConversationDTO {
    /// Membri finali: creatore in testa, poi gli altri senza duplicati
    pub fn members(&self, creator_id: i32) -> Vec<i32> {
        let mut members = vec![creator_id];
        for id in &self.participants {
            if !members.contains(id) {
                members.push(*id);
            }
        }
        members
    }

    pub fn subject_or_default(&self) -> &str {
        self.subject
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("New conversation")
    }
}

#[derive(Serialize, Debug, Clone, FromRow)]
pub struct ConversationWithCreatorDTO {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub conversation: Conversation,
    pub created_by_name: Option<String>,
}

#[derive(Serialize, Debug, Clone, FromRow)]
pub struct ParticipantDTO {
    pub id: i32,
    pub nom: String,
    pub prenom: Option<String>,
    pub email: String,
    pub role_nom: Option<String>,
    pub joined_at: DateTime<Utc>,
    pub last_read_at: Option<DateTime<Utc>>,
    pub is_muted: bool,
}

#[derive(Serialize, Debug)]
pub struct ConversationDetailDTO {
    pub conversation: ConversationWithCreatorDTO,
    pub participants: Vec<ParticipantDTO>,
}

#[derive(Deserialize, Debug)]
pub struct MuteDTO {
    pub muted: bool,
}

// ********************* MESSAGGI **********************//

#[derive(Serialize, Debug, Clone, FromRow)]
pub struct MessageRowDTO {
    pub id: i32,
    pub conversation_id: i32,
    pub content: String,
    pub message_type: MessageType,
    pub created_at: DateTime<Utc>,
    pub is_edited: bool,
    pub edited_at: Option<DateTime<Utc>>,
    pub parent_message_id: Option<i32>,
    pub sender_id: i32,
    pub sender_name: String,
    pub sender_role_id: i32,
    pub parent_content: Option<String>,
    pub parent_sender_name: Option<String>,
    pub is_read_by_user: bool,
}

/// Messaggio completo di allegati, come restituito al client
#[derive(Serialize, Debug, Clone)]
pub struct MessageDTO {
    #[serde(flatten)]
    pub message: MessageRowDTO,
    pub attachments: Vec<Attachment>,
}

/// File già validato e salvato su disco, in attesa della riga in message_attachments
#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub filename: String,
    pub original_filename: String,
    pub file_path: String,
    pub file_size: i64,
    pub mime_type: String,
}

/// Contenuto del form multipart di invio messaggio
#[derive(Debug, Default)]
pub struct SendMessageForm {
    pub content: Option<String>,
    pub parent_message_id: Option<i32>,
    pub attachments: Vec<NewAttachment>,
}

impl SendMessageForm {
    pub fn message_type(&self) -> MessageType {
        if self.attachments.is_empty() {
            MessageType::Text
        } else {
            MessageType::File
        }
    }
}

// ********************* NOTIFICHE E RICERCA **********************//

#[derive(Deserialize, Debug, Default)]
pub struct LimitQuery {
    pub limit: Option<u32>,
}

#[derive(Serialize, Debug, Clone, FromRow)]
pub struct MessageNotificationDTO {
    pub id: i32,
    pub conversation_id: i32,
    pub message_id: i32,
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub conversation_subject: String,
    pub message_content: String,
    pub sender_name: String,
}

#[derive(Deserialize, Debug, Default)]
pub struct MessageSearchQuery {
    pub q: Option<String>,
    #[serde(rename = "conversationId")]
    pub conversation_id: Option<i32>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl MessageSearchQuery {
    /// Termine ripulito, None se più corto di due caratteri
    pub fn term(&self) -> Option<&str> {
        self.q
            .as_deref()
            .map(str::trim)
            .filter(|q| q.chars().count() >= 2)
    }
}

#[derive(Serialize, Debug, Clone, FromRow)]
pub struct SearchResultDTO {
    pub id: i32,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub conversation_id: i32,
    pub conversation_subject: String,
    pub sender_name: String,
}
