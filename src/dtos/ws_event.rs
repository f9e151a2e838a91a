//! WebSocket Event DTOs - Eventi spinti ai client connessi

use crate::dtos::MessageDTO;
use crate::entities::Notification;
use serde::Serialize;

/// Tagged union per eventi WebSocket
/// Serde serializza questo come:
/// { "type": "Notification", "data": { ... } }
/// oppure
/// { "type": "UnreadCount", "data": { "count": 3 } }
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", content = "data")]
pub enum WsEventDTO {
    Notification(Notification),
    UnreadCount { count: i64 },
    NewMessage(MessageDTO),
    Error { code: u16, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_envelope() {
        let json = serde_json::to_value(WsEventDTO::UnreadCount { count: 3 }).unwrap();
        assert_eq!(json["type"], "UnreadCount");
        assert_eq!(json["data"]["count"], 3);

        let json = serde_json::to_value(WsEventDTO::Error {
            code: 400,
            message: "bad".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "Error");
        assert_eq!(json["data"]["code"], 400);
    }
}
