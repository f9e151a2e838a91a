//! Analytics services - Tracciamento di viste e interazioni, statistiche per prodotto e globali

use crate::core::{AppError, AppState, optional_user};
use crate::dtos::{ClickDTO, Counter, GlobalStatsDTO, Period, PeriodQuery, ProductStatsDTO};
use crate::services::{client_ip, header_value, optional_json};
use axum::{
    extract::{Json, Path, Query, State, rejection::JsonRejection},
    http::{HeaderMap, header},
    response::IntoResponse,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, instrument};

const TOP_PRODUCTS_LIMIT: i64 = 10;

#[instrument(skip(state, headers))]
pub async fn track_view(
    State(state): State<Arc<AppState>>,
    Path(produit_id): Path<i32>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    if !state.product.is_active(produit_id).await? {
        return Err(AppError::not_found("Product not found"));
    }

    // il token è facoltativo: serve solo ad attribuire la vista
    let viewer = optional_user(&state, &headers).await.map(|u| u.id);
    let ip = client_ip(&headers);
    let user_agent = header_value(&headers, header::USER_AGENT);
    let referrer = header_value(&headers, header::REFERER);

    let mut tx = state.pool.begin().await?;
    state.analytics.bump(&mut tx, produit_id, Counter::Vues).await?;
    state
        .analytics
        .record_view(
            &mut tx,
            produit_id,
            viewer,
            ip.as_deref(),
            user_agent.as_deref(),
            referrer.as_deref(),
        )
        .await?;
    state.product.refresh_activity(&mut tx, produit_id).await?;
    tx.commit().await?;

    debug!("View tracked");
    Ok(Json(json!({ "message": "View tracked" })))
}

#[instrument(skip(state, body))]
pub async fn track_click(
    State(state): State<Arc<AppState>>,
    Path(produit_id): Path<i32>,
    body: Result<Json<ClickDTO>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    // senza corpo si conta un click semplice; un'azione sconosciuta è un 400
    let action = optional_json(body)?.action;
    if !state.product.is_active(produit_id).await? {
        return Err(AppError::not_found("Product not found"));
    }

    state.analytics.bump_now(produit_id, action.counter()).await?;
    Ok(Json(json!({ "message": "Interaction tracked", "action": action })))
}

#[instrument(skip(state, params))]
pub async fn product_stats(
    State(state): State<Arc<AppState>>,
    Path(produit_id): Path<i32>,
    Query(params): Query<PeriodQuery>,
) -> Result<Json<ProductStatsDTO>, AppError> {
    let period = Period::parse(params.period.as_deref());
    let product = state
        .analytics
        .product_summary(produit_id)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found"))?;

    let stats = state.analytics.totals(produit_id, period.days()).await?;
    let daily = state.analytics.daily(produit_id, period.days()).await?;

    Ok(Json(ProductStatsDTO {
        product,
        period: period.as_str().to_string(),
        stats,
        daily,
    }))
}

/// Solo admin: il controllo del ruolo è fatto dal middleware della rotta
#[instrument(skip(state, params))]
pub async fn global_stats(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PeriodQuery>,
) -> Result<Json<GlobalStatsDTO>, AppError> {
    let period = Period::parse(params.period.as_deref());
    let days = period.days();

    let global = state.analytics.global_totals(days).await?;
    let top_products = state.analytics.top_products(days, TOP_PRODUCTS_LIMIT).await?;
    let category_stats = state.analytics.category_stats(days).await?;

    Ok(Json(GlobalStatsDTO {
        period: period.as_str().to_string(),
        global,
        top_products,
        category_stats,
    }))
}
