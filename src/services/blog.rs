//! Blog services - Articoli pubblicati, interazioni e pubblicazione da parte degli admin

use crate::core::{AppError, AppState};
use crate::dtos::{ArticleDTO, CreateArticleDTO, FeaturedQuery, RecentQuery, ShareDTO};
use crate::repositories::Create;
use crate::services::optional_json;
use axum::{
    extract::{Json, Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{SubsecRound, Utc};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

#[instrument(skip(state, params))]
pub async fn featured_articles(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FeaturedQuery>,
) -> Result<impl IntoResponse, AppError> {
    let limit = i64::from(params.limit.unwrap_or(2).clamp(1, 20));
    let articles: Vec<ArticleDTO> = state
        .blog
        .featured(limit)
        .await?
        .into_iter()
        .map(ArticleDTO::from)
        .collect();
    Ok(Json(json!({ "success": true, "total": articles.len(), "articles": articles })))
}

#[instrument(skip(state, params))]
pub async fn recent_articles(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecentQuery>,
) -> Result<impl IntoResponse, AppError> {
    let limit = i64::from(params.limit.unwrap_or(6).clamp(1, 50));
    let articles: Vec<ArticleDTO> = state
        .blog
        .recent(&params, limit)
        .await?
        .into_iter()
        .map(ArticleDTO::from)
        .collect();
    Ok(Json(json!({ "success": true, "total": articles.len(), "articles": articles })))
}

pub async fn blog_categories(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let categories = state.blog.categories().await?;
    Ok(Json(json!({ "success": true, "total": categories.len(), "categories": categories })))
}

#[instrument(skip(state))]
pub async fn get_article(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let mut article = state
        .blog
        .find_published_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::not_found("Article not found"))?;

    state.blog.increment_views(article.id).await?;
    article.nombre_vues += 1;

    Ok(Json(json!({ "success": true, "article": ArticleDTO::from(article) })))
}

#[instrument(skip(state))]
pub async fn like_article(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    if state.blog.like(id).await? == 0 {
        return Err(AppError::not_found("Article not found"));
    }
    Ok(Json(json!({ "success": true, "message": "Article liked" })))
}

#[instrument(skip(state, body))]
pub async fn share_article(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    body: Result<Json<ShareDTO>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let platform = optional_json(body)?.platform;
    if state.blog.share(id).await? == 0 {
        return Err(AppError::not_found("Article not found"));
    }
    info!("Article {} shared on {:?}", id, platform);
    Ok(Json(json!({ "success": true, "message": "Article shared", "platform": platform })))
}

/// Solo admin. Uno slug già esistente produce 409 tramite il vincolo UNIQUE
#[instrument(skip(state, body), fields(slug = %body.slug))]
pub async fn create_article(
    State(state): State<Arc<AppState>>,
    Json(mut body): Json<CreateArticleDTO>,
) -> Result<impl IntoResponse, AppError> {
    body.validate()?;
    // un articolo pubblicato senza data diventa visibile subito;
    // DATETIME arrotonda i decimali, quindi si tronca al secondo
    if body.est_publie && body.date_publication.is_none() {
        body.date_publication = Some(Utc::now().trunc_subsecs(0));
    }

    let article = state.blog.create(&body).await.map_err(|e| {
        warn!("Article creation failed: {:?}", e);
        AppError::from(e)
    })?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "article": ArticleDTO::from(article) })),
    ))
}
