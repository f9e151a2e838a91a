//! Review services - Avis dei prodotti, risposte dei fornitori e segnalazioni

use crate::core::{AppError, AppState, require_role};
use crate::dtos::{
    CreateReviewDTO, NewAdminNotification, NewNotification, PageRequest, RatingStats,
    ReportReviewDTO, ReviewQuery, ReviewReplyDTO,
};
use crate::entities::{AdminNotificationType, NotificationType, Priority, Role, User};
use crate::services::{client_ip, header_value, notifier};
use axum::{
    Extension,
    extract::{Json, Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

#[instrument(skip(state, params))]
pub async fn list_product_reviews(
    State(state): State<Arc<AppState>>,
    Path(produit_id): Path<i32>,
    Query(params): Query<ReviewQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = PageRequest::new(params.page, params.limit, 10, 50);
    let (reviews, total) = state.review.list_approved(produit_id, &params, page).await?;
    let counts = state.review.rating_counts(produit_id).await?;

    Ok(Json(json!({
        "reviews": reviews,
        "pagination": page.pagination(total),
        "ratingStats": RatingStats::from_counts(&counts),
    })))
}

#[instrument(skip(state, current_user, headers, body), fields(user_id = %current_user.id))]
pub async fn create_review(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    headers: HeaderMap,
    Json(body): Json<CreateReviewDTO>,
) -> Result<impl IntoResponse, AppError> {
    // 1. Validare la nota (1..=5)
    // 2. Il prodotto deve essere attivo
    // 3. Un solo avis per utente e prodotto
    // 4. Inserire e ricalcolare note_moyenne, nombre_avis e score nella stessa transazione
    body.validate()?;

    if !state.product.is_active(body.produit_id).await? {
        return Err(AppError::not_found("Product not found"));
    }
    if state
        .review
        .exists_for_user(body.produit_id, current_user.id)
        .await?
    {
        warn!("Duplicate review for product {}", body.produit_id);
        return Err(AppError::conflict("You have already reviewed this product"));
    }

    let ip = client_ip(&headers);
    let user_agent = header_value(&headers, header::USER_AGENT);

    let mut tx = state.pool.begin().await?;
    // senza tabella ordini l'acquisto non è verificabile
    let avis_id = state
        .review
        .insert(
            &mut tx,
            current_user.id,
            &body,
            false,
            ip.as_deref(),
            user_agent.as_deref(),
        )
        .await?;
    state.product.refresh_rating(&mut tx, body.produit_id).await?;
    tx.commit().await?;

    info!("Review {} created", avis_id);
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Review created successfully", "reviewId": avis_id })),
    ))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.id))]
pub async fn reply_to_review(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(avis_id): Path<i32>,
    Json(body): Json<ReviewReplyDTO>,
) -> Result<impl IntoResponse, AppError> {
    require_role(&current_user, &[Role::Fournisseur])?;
    body.validate()?;

    let fournisseur_id = state
        .enterprise
        .id_for_user(current_user.id)
        .await?
        .ok_or_else(|| AppError::forbidden("Supplier enterprise required"))?;

    let (owner_id, reviewer_id, produit_nom) = state
        .review
        .owner_enterprise(avis_id)
        .await?
        .ok_or_else(|| AppError::not_found("Review not found"))?;

    if owner_id != fournisseur_id {
        warn!("Supplier {} tried to answer a review on another supplier's product", fournisseur_id);
        return Err(AppError::forbidden("You can only respond to reviews of your own products"));
    }
    if state.review.has_response(avis_id).await? {
        return Err(AppError::conflict("This review already has a response"));
    }

    let response_id = state
        .review
        .insert_response(avis_id, fournisseur_id, &body.reponse)
        .await?;

    notifier::send_custom(
        &state,
        NewNotification::new(
            reviewer_id,
            NotificationType::Produit,
            "review_response",
            "The supplier answered your review",
            format!("New response to your review of \"{}\"", produit_nom),
        )
        .related_user(current_user.id)
        .data(json!({ "avisId": avis_id, "responseId": response_id })),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Response added successfully", "responseId": response_id })),
    ))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.id))]
pub async fn report_review(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(avis_id): Path<i32>,
    Json(body): Json<ReportReviewDTO>,
) -> Result<impl IntoResponse, AppError> {
    body.validate()?;

    let (_, _, produit_nom) = state
        .review
        .owner_enterprise(avis_id)
        .await?
        .ok_or_else(|| AppError::not_found("Review not found"))?;

    if state.review.has_report(avis_id, current_user.id).await? {
        return Err(AppError::conflict("You have already reported this review"));
    }

    let report_id = state
        .review
        .insert_report(avis_id, current_user.id, body.raison, body.description.as_deref())
        .await?;

    notifier::notify_admins(
        &state,
        NewAdminNotification::new(
            AdminNotificationType::ProductManagement,
            "review_report",
            "Review reported",
            format!("A review of \"{}\" was reported", produit_nom),
        )
        .priority(Priority::High)
        .user(current_user.id)
        .data(json!({ "avisId": avis_id, "reportId": report_id, "raison": body.raison })),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Review reported successfully", "reportId": report_id })),
    ))
}
