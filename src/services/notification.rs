//! Notification services - Notifiche dell'utente autenticato

use crate::core::{AppError, AppState};
use crate::dtos::{NotificationCountsDTO, NotificationQuery, PageRequest, counts_map};
use crate::entities::User;
use crate::services::notifier;
use axum::{
    Extension,
    extract::{Json, Path, Query, State},
    response::IntoResponse,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument};

#[instrument(skip(state, current_user, params), fields(user_id = %current_user.id))]
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Query(params): Query<NotificationQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = PageRequest::new(params.page, params.limit, 20, 100);
    let (notifications, total) = state
        .notification
        .list(current_user.id, &params, page)
        .await?;
    let unread_count = state.notification.count_unread(current_user.id).await?;

    Ok(Json(json!({
        "notifications": notifications,
        "pagination": page.pagination(total),
        "unreadCount": unread_count,
    })))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.id))]
pub async fn notification_counts(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> Result<Json<NotificationCountsDTO>, AppError> {
    let user_id = current_user.id;
    Ok(Json(NotificationCountsDTO {
        total: state.notification.count_total(user_id).await?,
        unread: state.notification.count_unread(user_id).await?,
        by_category: counts_map(state.notification.unread_by_category(user_id).await?),
        by_priority: counts_map(state.notification.unread_by_priority(user_id).await?),
    }))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.id))]
pub async fn mark_notification_read(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    // 0 righe: notifica inesistente o di un altro utente
    if state.notification.mark_read(id, current_user.id).await? == 0 {
        return Err(AppError::not_found("Notification not found"));
    }
    notifier::push_with_unread_count(&state, current_user.id, None).await;
    Ok(Json(json!({ "message": "Notification marked as read" })))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.id))]
pub async fn mark_all_notifications_read(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> Result<impl IntoResponse, AppError> {
    let updated = state.notification.mark_all_read(current_user.id).await?;
    info!("{} notifications marked as read", updated);
    notifier::push_with_unread_count(&state, current_user.id, None).await;
    Ok(Json(json!({ "message": "All notifications marked as read", "updated": updated })))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.id))]
pub async fn delete_notification(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    if state.notification.delete_owned(id, current_user.id).await? == 0 {
        return Err(AppError::not_found("Notification not found"));
    }
    notifier::push_with_unread_count(&state, current_user.id, None).await;
    Ok(Json(json!({ "message": "Notification deleted" })))
}
