//! Notification DTOs - Filtri, contatori e nuove notifiche utente/admin

use crate::entities::{AdminNotificationType, NotificationType, Priority};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Deserialize, Debug, Default)]
pub struct NotificationQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub unread_only: Option<bool>,
    pub category: Option<String>,
    #[serde(rename = "type")]
    pub notification_type: Option<NotificationType>,
}

#[derive(Serialize, Debug, Default, PartialEq)]
pub struct NotificationCountsDTO {
    pub total: i64,
    pub unread: i64,
    pub by_category: BTreeMap<String, i64>,
    pub by_priority: BTreeMap<String, i64>,
}

#[derive(Deserialize, Debug, Default)]
pub struct AdminNotificationQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    #[serde(rename = "type")]
    pub notification_type: Option<AdminNotificationType>,
    pub priority: Option<Priority>,
    pub unread_only: Option<bool>,
}

#[derive(Serialize, Debug, Default, PartialEq)]
pub struct AdminNotificationCountsDTO {
    pub total: i64,
    pub unread: i64,
    pub by_type: BTreeMap<String, i64>,
    pub urgent: i64,
}

/// Raggruppa coppie (chiave, conteggio) in una mappa ordinata per la risposta JSON
pub fn counts_map(rows: Vec<(String, i64)>) -> BTreeMap<String, i64> {
    let mut map = BTreeMap::new();
    for (key, count) in rows {
        *map.entry(key).or_insert(0) += count;
    }
    map
}

/// Notifica utente da inserire
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub utilisateur_id: i32,
    pub notification_type: NotificationType,
    pub category: String,
    pub titre: String,
    pub message: String,
    pub priority: Priority,
    pub data: Option<serde_json::Value>,
    pub related_user_id: Option<i32>,
    pub related_product_id: Option<i32>,
    pub related_conversation_id: Option<i32>,
}

impl NewNotification {
    pub fn new(
        utilisateur_id: i32,
        notification_type: NotificationType,
        category: &str,
        titre: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            utilisateur_id,
            notification_type,
            category: category.to_string(),
            titre: titre.into(),
            message: message.into(),
            priority: Priority::Medium,
            data: None,
            related_user_id: None,
            related_product_id: None,
            related_conversation_id: None,
        }
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn related_user(mut self, id: i32) -> Self {
        self.related_user_id = Some(id);
        self
    }

    pub fn related_product(mut self, id: i32) -> Self {
        self.related_product_id = Some(id);
        self
    }

    pub fn related_conversation(mut self, id: i32) -> Self {
        self.related_conversation_id = Some(id);
        self
    }
}

/// Notifica amministrativa da inserire
#[derive(Debug, Clone)]
pub struct NewAdminNotification {
    pub notification_type: AdminNotificationType,
    pub category: String,
    pub title: String,
    pub message: String,
    pub priority: Priority,
    pub data: Option<serde_json::Value>,
    pub user_id: Option<i32>,
    pub product_id: Option<i32>,
}

impl NewAdminNotification {
    pub fn new(
        notification_type: AdminNotificationType,
        category: &str,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            notification_type,
            category: category.to_string(),
            title: title.into(),
            message: message.into(),
            priority: Priority::Medium,
            data: None,
            user_id: None,
            product_id: None,
        }
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn user(mut self, id: i32) -> Self {
        self.user_id = Some(id);
        self
    }

    pub fn product(mut self, id: i32) -> Self {
        self.product_id = Some(id);
        self
    }
}
