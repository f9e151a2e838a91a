//! Catalog services - Categorie, prodotti, offerte e gestione prodotti del fornitore

use crate::core::{AppError, AppState, require_role};
use crate::dtos::{
    CreateProductDTO, NewAdminNotification, OfferPricing, PageRequest, PopularQuery,
    ProductDetailDTO, ProductQuery, SpecialOfferDTO, SpecialOfferQuery, UpdateProductDTO,
};
use crate::entities::{AdminNotificationType, Role, User};
use crate::repositories::{Read, Update};
use crate::services::notifier;
use axum::{
    Extension,
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;

#[instrument(skip(state))]
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let categories = state.category.list_with_counts().await?;
    Ok(Json(json!({ "categories": categories })))
}

#[instrument(skip(state, params))]
pub async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ProductQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = PageRequest::new(params.page, params.limit, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE);
    let (products, total) = state.product.list(&params, page).await?;
    info!("Listing {} of {} products", products.len(), total);
    Ok(Json(json!({
        "products": products,
        "pagination": page.pagination(total),
    })))
}

#[instrument(skip(state, params))]
pub async fn popular_products(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PopularQuery>,
) -> Result<impl IntoResponse, AppError> {
    let limit = i64::from(params.limit.unwrap_or(10).clamp(1, 50));
    let products = state.product.popular(&params, limit).await?;
    Ok(Json(json!({ "total": products.len(), "products": products })))
}

#[instrument(skip(state, params))]
pub async fn special_offers(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SpecialOfferQuery>,
) -> Result<impl IntoResponse, AppError> {
    let limit = i64::from(params.limit.unwrap_or(12).clamp(1, 50));
    let now = Utc::now();
    let offers: Vec<SpecialOfferDTO> = state
        .product
        .special_offers(&params, limit)
        .await?
        .into_iter()
        .map(|item| {
            let pricing = OfferPricing::compute(&item.product, now);
            SpecialOfferDTO { item, pricing }
        })
        .collect();
    Ok(Json(json!({ "total": offers.len(), "offers": offers })))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ProductDetailDTO>, AppError> {
    let item = state
        .product
        .find_active(id)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found"))?;
    let images = state.product.images(id).await?;
    Ok(Json(ProductDetailDTO { item, images }))
}

// ************************* PRODOTTI DEL FORNITORE ************************* //

/// Id dell'entreprise del fornitore corrente; serve sia il ruolo sia l'entreprise
async fn supplier_enterprise_id(state: &AppState, user: &User) -> Result<i32, AppError> {
    require_role(user, &[Role::Fournisseur])?;
    state.enterprise.id_for_user(user.id).await?.ok_or_else(|| {
        warn!("Supplier {} has no enterprise", user.id);
        AppError::forbidden("Supplier enterprise required")
    })
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.id))]
pub async fn list_supplier_products(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> Result<impl IntoResponse, AppError> {
    let fournisseur_id = supplier_enterprise_id(&state, &current_user).await?;
    let products = state.product.list_for_supplier(fournisseur_id).await?;
    Ok(Json(json!({ "total": products.len(), "products": products })))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.id))]
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Json(body): Json<CreateProductDTO>,
) -> Result<impl IntoResponse, AppError> {
    // 1. Verificare ruolo fornisseur ed entreprise
    // 2. Validare il DTO (prezzo positivo, finestra promo coerente)
    // 3. Inserire prodotto e immagini in una transazione
    // 4. Segnalare il nuovo prodotto agli admin per la moderazione
    let fournisseur_id = supplier_enterprise_id(&state, &current_user).await?;
    body.validate()?;

    let mut tx = state.pool.begin().await?;
    let produit_id = state.product.insert(&mut tx, fournisseur_id, &body).await?;
    tx.commit().await?;

    let product = state
        .product
        .read(&produit_id)
        .await?
        .ok_or_else(|| AppError::internal_server_error("Product not found after creation"))?;

    notifier::notify_admins(
        &state,
        NewAdminNotification::new(
            AdminNotificationType::ProductManagement,
            "product_moderation",
            "New product to review",
            format!("Product \"{}\" was published", product.nom),
        )
        .user(current_user.id)
        .product(produit_id)
        .data(json!({ "fournisseur_id": fournisseur_id })),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Product created successfully",
            "productId": produit_id,
            "product": product,
        })),
    ))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.id))]
pub async fn update_product(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(id): Path<i32>,
    Json(body): Json<UpdateProductDTO>,
) -> Result<impl IntoResponse, AppError> {
    let fournisseur_id = supplier_enterprise_id(&state, &current_user).await?;
    // il prodotto di un altro fornitore è indistinguibile da uno inesistente
    if state.product.find_owned(id, fournisseur_id).await?.is_none() {
        return Err(AppError::not_found("Product not found"));
    }
    body.validate()?;

    let product = state.product.update(&id, &body).await?;
    Ok(Json(json!({ "message": "Product updated successfully", "product": product })))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.id))]
pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let fournisseur_id = supplier_enterprise_id(&state, &current_user).await?;
    if state.product.delete_owned(id, fournisseur_id).await? == 0 {
        return Err(AppError::not_found("Product not found"));
    }
    Ok(Json(json!({ "message": "Product deleted successfully" })))
}
