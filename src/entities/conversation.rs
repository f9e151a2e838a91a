//! Conversation entities - Conversazioni e partecipanti

use super::enums::ConversationType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct Conversation {
    pub id: i32,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub conversation_type: ConversationType,
    pub subject: String,
    pub created_by: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct Participant {
    pub conversation_id: i32,
    pub user_id: i32,
    pub joined_at: DateTime<Utc>,
    pub last_read_at: Option<DateTime<Utc>>,
    pub is_muted: bool,
}
