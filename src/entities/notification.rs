//! Notification entities - Notifiche utente e notifiche amministrative

use super::enums::{AdminNotificationType, NotificationType, Priority};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct Notification {
    pub id: i32,
    pub utilisateur_id: i32,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub category: String,
    pub titre: String,
    pub message: String,
    pub priority: Priority,
    // JSON salvato come testo
    pub data: Option<String>,
    pub lu: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub related_user_id: Option<i32>,
    pub related_product_id: Option<i32>,
    pub related_conversation_id: Option<i32>,
    pub related_order_id: Option<i32>,
    pub date_creation: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct AdminNotification {
    pub id: i32,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub notification_type: AdminNotificationType,
    pub category: String,
    pub title: String,
    pub message: String,
    pub priority: Priority,
    pub data: Option<String>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub user_id: Option<i32>,
    pub product_id: Option<i32>,
    pub order_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}
