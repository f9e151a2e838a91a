//! Admin services - Notifiche amministrative, utenti, verifiche e moderazione
//!
//! Il ruolo amministratore è garantito da `admin_middleware` sul router.

use crate::core::{AppError, AppState};
use crate::dtos::{
    AdminNotificationCountsDTO, AdminNotificationQuery, AdminUserQuery, ModerateReviewDTO,
    NewNotification, PageRequest, ReportQuery, UpdateUserStatusDTO, VerifyEntrepriseDTO,
    counts_map,
};
use crate::entities::{
    NotificationType, Priority, ProductStatus, ReportStatus, Role, User, UserStatus,
    VerificationStatus,
};
use crate::repositories::{Delete, Read};
use crate::services::notifier;
use axum::{
    Extension,
    extract::{Json, Path, Query, State},
    response::IntoResponse,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

// ************************* NOTIFICHE ADMIN ************************* //

#[instrument(skip(state, params))]
pub async fn list_admin_notifications(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AdminNotificationQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = PageRequest::new(params.page, params.limit, 20, 100);
    let (notifications, total) = state.admin_notification.list(&params, page).await?;
    Ok(Json(json!({
        "notifications": notifications,
        "pagination": page.pagination(total),
    })))
}

pub async fn admin_notification_counts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AdminNotificationCountsDTO>, AppError> {
    let (total, unread, urgent) = state.admin_notification.totals().await?;
    let by_type = counts_map(state.admin_notification.unread_by_type().await?);
    Ok(Json(AdminNotificationCountsDTO {
        total,
        unread,
        by_type,
        urgent,
    }))
}

#[instrument(skip(state))]
pub async fn mark_admin_notification_read(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    if state.admin_notification.mark_read(id).await? == 0 {
        return Err(AppError::not_found("Notification not found"));
    }
    Ok(Json(json!({ "message": "Notification marked as read" })))
}

pub async fn mark_all_admin_notifications_read(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let updated = state.admin_notification.mark_all_read().await?;
    Ok(Json(json!({ "message": "All notifications marked as read", "updated": updated })))
}

#[instrument(skip(state))]
pub async fn delete_admin_notification(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    state.admin_notification.delete(&id).await.map_err(|e| match e {
        sqlx::Error::RowNotFound => AppError::not_found("Notification not found"),
        other => AppError::from(other),
    })?;
    Ok(Json(json!({ "message": "Notification deleted" })))
}

// ************************* UTENTI ************************* //

#[instrument(skip(state, params))]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AdminUserQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = PageRequest::new(params.page, params.limit, 20, 100);
    let (users, total) = state.user.list_for_admin(&params, page).await?;
    Ok(Json(json!({
        "users": users,
        "pagination": page.pagination(total),
    })))
}

#[instrument(skip(state, current_user, body), fields(admin_id = %current_user.id))]
pub async fn update_user_status(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(user_id): Path<i32>,
    Json(body): Json<UpdateUserStatusDTO>,
) -> Result<impl IntoResponse, AppError> {
    // 1. Validare il body
    // 2. Un admin non può sospendere o disattivare sé stesso
    // 3. Aggiornare stato e motivazione
    // 4. Avvisare l'utente interessato
    body.validate()?;
    if user_id == current_user.id && body.statut != UserStatus::Actif {
        warn!("Admin tried to change own status to {:?}", body.statut);
        return Err(AppError::bad_request("You cannot change your own account status"));
    }

    let reason = body
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());
    if state.user.set_status(user_id, body.statut, reason).await? == 0 {
        return Err(AppError::not_found("User not found"));
    }
    info!("User {} status set to {:?}", user_id, body.statut);

    let (title, message, priority) = match body.statut {
        UserStatus::Actif => (
            "Account reactivated",
            "Your account is active again".to_string(),
            Priority::Medium,
        ),
        UserStatus::Suspendu => (
            "Account suspended",
            format!("Your account was suspended. Reason: {}", reason.unwrap_or("not specified")),
            Priority::Urgent,
        ),
        UserStatus::Inactif => (
            "Account deactivated",
            "Your account was deactivated by an administrator".to_string(),
            Priority::High,
        ),
    };
    notifier::send_custom(
        &state,
        NewNotification::new(user_id, NotificationType::Systeme, "account_status", title, message)
            .priority(priority)
            .related_user(current_user.id)
            .data(json!({ "statut": body.statut, "reason": reason })),
    )
    .await;

    Ok(Json(json!({ "message": "User status updated", "statut": body.statut })))
}

// ************************* VERIFICA ENTREPRISES ************************* //

#[instrument(skip(state, body))]
pub async fn verify_entreprise(
    State(state): State<Arc<AppState>>,
    Path(entreprise_id): Path<i32>,
    Json(body): Json<VerifyEntrepriseDTO>,
) -> Result<impl IntoResponse, AppError> {
    body.validate()?;
    if body.statut == VerificationStatus::EnAttente {
        return Err(AppError::bad_request("Status must be verifie or rejete"));
    }

    let entreprise = state
        .enterprise
        .read(&entreprise_id)
        .await?
        .ok_or_else(|| AppError::not_found("Enterprise not found"))?;

    let commentaire = body.commentaire.as_deref().map(str::trim).filter(|c| !c.is_empty());
    state
        .enterprise
        .set_verification(entreprise_id, body.statut, commentaire)
        .await?;

    let (title, message) = if body.statut == VerificationStatus::Verifie {
        (
            "Enterprise verified",
            format!("{} is now verified and visible to buyers", entreprise.nom_entreprise),
        )
    } else {
        (
            "Enterprise verification rejected",
            format!(
                "The verification of {} was rejected{}",
                entreprise.nom_entreprise,
                commentaire.map(|c| format!(": {}", c)).unwrap_or_default()
            ),
        )
    };
    notifier::send_custom(
        &state,
        NewNotification::new(
            entreprise.utilisateur_id,
            NotificationType::Systeme,
            "verification_result",
            title,
            message,
        )
        .priority(Priority::High)
        .data(json!({ "entrepriseId": entreprise_id, "statut": body.statut })),
    )
    .await;

    Ok(Json(json!({ "message": "Verification status updated", "statut": body.statut })))
}

// ************************* MODERAZIONE AVIS ************************* //

#[instrument(skip(state, current_user, body), fields(admin_id = %current_user.id))]
pub async fn moderate_review(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(avis_id): Path<i32>,
    Json(body): Json<ModerateReviewDTO>,
) -> Result<impl IntoResponse, AppError> {
    body.validate()?;
    let review = state
        .review
        .read(&avis_id)
        .await?
        .ok_or_else(|| AppError::not_found("Review not found"))?;

    let mut tx = state.pool.begin().await?;
    state
        .review
        .moderate(
            &mut tx,
            avis_id,
            current_user.id,
            body.statut,
            body.raison_rejet.as_deref(),
        )
        .await?;
    // la media considera solo gli avis approvati
    state.product.refresh_rating(&mut tx, review.produit_id).await?;
    tx.commit().await?;

    Ok(Json(json!({ "message": "Review moderated", "statut": body.statut })))
}

pub async fn list_review_reports(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReportQuery>,
) -> Result<impl IntoResponse, AppError> {
    let statut = params.statut.unwrap_or(ReportStatus::EnAttente);
    let reports = state.review.list_reports(statut).await?;
    Ok(Json(json!({ "total": reports.len(), "reports": reports })))
}

// ************************* DASHBOARD ************************* //

fn role_key(role_id: i32) -> String {
    match Role::from_id(role_id) {
        Some(Role::Acheteur) => "acheteur".to_string(),
        Some(Role::Fournisseur) => "fournisseur".to_string(),
        Some(Role::Administrateur) => "administrateur".to_string(),
        None => format!("role_{}", role_id),
    }
}

fn product_status_key(statut: ProductStatus) -> &'static str {
    match statut {
        ProductStatus::Actif => "actif",
        ProductStatus::Inactif => "inactif",
        ProductStatus::Brouillon => "brouillon",
    }
}

#[instrument(skip(state))]
pub async fn dashboard(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let users_by_role: BTreeMap<String, i64> = state
        .user
        .count_by_role()
        .await?
        .into_iter()
        .map(|(role_id, count)| (role_key(role_id), count))
        .collect();
    let products_by_status: BTreeMap<&'static str, i64> = state
        .product
        .count_by_status()
        .await?
        .into_iter()
        .map(|(statut, count)| (product_status_key(statut), count))
        .collect();
    let pending_entreprises = state.enterprise.count_pending().await?;
    let pending_reviews = state.review.count_pending().await?;
    let (_, unread_notifications, urgent_notifications) = state.admin_notification.totals().await?;

    Ok(Json(json!({
        "users": {
            "total": users_by_role.values().sum::<i64>(),
            "byRole": users_by_role,
        },
        "products": {
            "total": products_by_status.values().sum::<i64>(),
            "byStatus": products_by_status,
        },
        "pendingVerifications": pending_entreprises,
        "pendingReviews": pending_reviews,
        "notifications": {
            "unread": unread_notifications,
            "urgent": urgent_notifications,
        },
        "onlineUsers": state.users_online.online_count(),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_keys() {
        assert_eq!(role_key(1), "acheteur");
        assert_eq!(role_key(3), "administrateur");
        assert_eq!(role_key(9), "role_9");
    }

    #[test]
    fn test_product_status_keys_match_column_values() {
        for statut in [ProductStatus::Actif, ProductStatus::Inactif, ProductStatus::Brouillon] {
            let serialized = serde_json::to_value(statut).unwrap();
            assert_eq!(serialized, product_status_key(statut));
        }
    }
}
