//! Enterprise services - Elenco pubblico dei fornitori, settori e città

use crate::core::{AppError, AppState};
use crate::dtos::{EntrepriseQuery, PageRequest};
use crate::entities::{EntrepriseDetail, VerificationStatus};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
};
use serde_json::json;
use std::sync::Arc;
use tracing::instrument;

#[instrument(skip(state, params))]
pub async fn list_entreprises(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EntrepriseQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = PageRequest::new(params.page, params.limit, 12, 100);
    let (entreprises, total) = state.enterprise.list_verified(&params, page).await?;
    Ok(Json(json!({
        "entreprises": entreprises,
        "pagination": page.pagination(total),
    })))
}

/// Solo le entreprises verificate sono pubbliche
#[instrument(skip(state))]
pub async fn get_entreprise(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<EntrepriseDetail>, AppError> {
    let entreprise = state
        .enterprise
        .detail(id)
        .await?
        .filter(|e| e.entreprise.statut_verification == VerificationStatus::Verifie)
        .ok_or_else(|| AppError::not_found("Enterprise not found"))?;
    Ok(Json(entreprise))
}

pub async fn list_sectors(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let sectors = state.enterprise.sectors().await?;
    Ok(Json(json!({ "sectors": sectors })))
}

pub async fn list_cities(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let cities = state.enterprise.cities().await?;
    Ok(Json(json!({ "cities": cities })))
}
