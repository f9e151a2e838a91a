//! Services module - Coordinatore per tutti i service handler HTTP
//!
//! Questo modulo organizza i service handlers in sotto-moduli separati per una migliore manutenibilità.
//! Ogni modulo gestisce gli endpoint HTTP per una specifica funzionalità.

pub mod admin;
pub mod analytics;
pub mod auth;
pub mod blog;
pub mod catalog;
pub mod enterprise;
pub mod health;
pub mod messaging;
pub mod notification;
pub mod notifier;
pub mod review;
pub mod user;

// Re-exports per facilitare l'import
pub use admin::{
    admin_notification_counts, dashboard, delete_admin_notification, list_admin_notifications,
    list_review_reports, list_users, mark_admin_notification_read,
    mark_all_admin_notifications_read, moderate_review, update_user_status, verify_entreprise,
};
pub use analytics::{global_stats, product_stats, track_click, track_view};
pub use auth::{login_user, logout, me, register_user};
pub use blog::{
    blog_categories, create_article, featured_articles, get_article, like_article,
    recent_articles, share_article,
};
pub use catalog::{
    create_product, delete_product, get_product, list_categories, list_products,
    list_supplier_products, popular_products, special_offers, update_product,
};
pub use enterprise::{get_entreprise, list_cities, list_entreprises, list_sectors};
pub use health::{health, root};
pub use messaging::{
    create_conversation, delete_message, download_attachment, get_conversation, get_messages,
    list_conversations, list_message_notifications, mark_conversation_read,
    mark_message_notification_read, mute_conversation, search_messages, send_message,
};
pub use notification::{
    delete_notification, list_notifications, mark_all_notifications_read,
    mark_notification_read, notification_counts,
};
pub use review::{create_review, list_product_reviews, reply_to_review, report_review};
pub use user::{
    add_favorite, change_password, favorite_stats, get_profile, list_favorites, remove_favorite,
    update_profile,
};

use crate::core::AppError;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, HeaderName};

/// Corpo JSON facoltativo: senza corpo (nessun Content-Type JSON) vale il default,
/// un corpo presente ma non valido è un 400
pub(crate) fn optional_json<T: Default>(
    body: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(JsonRejection::MissingJsonContentType(_)) => Ok(T::default()),
        Err(rejection) => Err(rejection.into()),
    }
}

/// Valore testuale di un header, se presente e non vuoto
pub(crate) fn header_value(headers: &HeaderMap, name: HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// IP del client dal primo elemento di `X-Forwarded-For`, altrimenti `X-Real-IP`
pub(crate) fn client_ip(headers: &HeaderMap) -> Option<String> {
    header_value(headers, HeaderName::from_static("x-forwarded-for"))
        .and_then(|list| list.split(',').next().map(|ip| ip.trim().to_string()))
        .filter(|ip| !ip.is_empty())
        .or_else(|| header_value(headers, HeaderName::from_static("x-real-ip")))
}
