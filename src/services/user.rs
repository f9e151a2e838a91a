//! User services - Profilo, password e preferiti dell'utente autenticato

use crate::core::{AppError, AppState};
use crate::dtos::{
    AddFavoriteDTO, ChangePasswordDTO, Counter, FavoriteStatsDTO, Period, PeriodQuery,
    ProfileDTO, UpdateProfileDTO,
};
use crate::entities::User;
use crate::repositories::Update;
use crate::services::auth::load_profile;
use axum::{
    Extension,
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

#[instrument(skip(state, current_user), fields(user_id = %current_user.id))]
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> Result<Json<ProfileDTO>, AppError> {
    Ok(Json(load_profile(&state, current_user).await?))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.id))]
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Json(body): Json<UpdateProfileDTO>,
) -> Result<Json<ProfileDTO>, AppError> {
    body.validate()?;
    let updated = state.user.update(&current_user.id, &body).await?;
    info!("Profile updated");
    Ok(Json(load_profile(&state, updated).await?))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.id))]
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Json(body): Json<ChangePasswordDTO>,
) -> Result<impl IntoResponse, AppError> {
    body.validate()?;

    if !current_user.verify_password(&body.current_password) {
        warn!("Wrong current password on password change");
        return Err(AppError::bad_request("Current password is incorrect"));
    }

    let password_hash = User::hash_password(&body.new_password)
        .map_err(|_| AppError::internal_server_error("Failed to hash password"))?;
    state
        .user
        .update_password(current_user.id, &password_hash)
        .await?;

    Ok(Json(json!({ "message": "Password updated successfully" })))
}

// ************************* PREFERITI ************************* //

#[instrument(skip(state, current_user), fields(user_id = %current_user.id))]
pub async fn list_favorites(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> Result<impl IntoResponse, AppError> {
    let favorites = state.favorite.list(current_user.id).await?;
    Ok(Json(json!({ "total": favorites.len(), "favorites": favorites })))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.id, produit_id = %body.produit_id))]
pub async fn add_favorite(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Json(body): Json<AddFavoriteDTO>,
) -> Result<impl IntoResponse, AppError> {
    if !state.product.is_active(body.produit_id).await? {
        return Err(AppError::not_found("Product not found"));
    }

    // un secondo inserimento non conta come nuovo preferito
    if state.favorite.add(current_user.id, body.produit_id).await? {
        state
            .analytics
            .bump_now(body.produit_id, Counter::AjoutsFavoris)
            .await?;
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Product added to favorites", "produit_id": body.produit_id })),
    ))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.id))]
pub async fn remove_favorite(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(produit_id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    if state.favorite.remove(current_user.id, produit_id).await? == 0 {
        return Err(AppError::not_found("Favorite not found"));
    }
    Ok(Json(json!({ "message": "Product removed from favorites" })))
}

#[instrument(skip(state, params))]
pub async fn favorite_stats(
    State(state): State<Arc<AppState>>,
    Path(produit_id): Path<i32>,
    Query(params): Query<PeriodQuery>,
) -> Result<Json<FavoriteStatsDTO>, AppError> {
    let period = Period::parse(params.period.as_deref());
    let total_favoris = state.favorite.count_for_product(produit_id).await?;
    let ajouts_periode = state
        .analytics
        .favorites_added(produit_id, period.days())
        .await?;

    Ok(Json(FavoriteStatsDTO {
        produit_id,
        total_favoris,
        ajouts_periode,
        period: period.as_str().to_string(),
    }))
}
