//! Server library - espone i moduli principali per i test

pub mod core;
pub mod dtos;
pub mod entities;
pub mod repositories;
pub mod services;
pub mod ws;

// Re-export dei tipi principali per facilitare l'import
pub use core::{AppError, AppState, auth, config};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderName, HeaderValue, Method, header},
    middleware,
    routing::{any, delete, get, patch, post, put},
};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer, services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::warn;

/// Limite del corpo per l'invio di messaggi: cinque allegati da 10 MB più i campi testuali
const MESSAGE_BODY_LIMIT: usize = services::messaging::MAX_ATTACHMENTS
    * services::messaging::MAX_ATTACHMENT_BYTES
    + 1024 * 1024;

/// Crea il router principale dell'applicazione
pub fn create_router(state: Arc<AppState>) -> Router {
    use core::{global_rate_limit, ws_authentication_middleware};
    use services::*;
    use ws::ws_handler;

    let api = Router::new()
        .route("/health", get(health))
        .nest("/auth", configure_auth_routes(state.clone()))
        .nest("/users", configure_user_routes(state.clone()))
        .nest("/products", configure_product_routes())
        .nest("/supplier", configure_supplier_routes(state.clone()))
        .nest("/entreprises", configure_entreprise_routes())
        .nest("/suppliers", configure_entreprise_routes())
        .route("/categories", get(list_categories))
        .route("/sectors", get(list_sectors))
        .route("/cities", get(list_cities))
        .nest("/reviews", configure_review_routes(state.clone()))
        .nest("/analytics", configure_analytics_routes(state.clone()))
        .nest("/blog", configure_blog_routes(state.clone()))
        .nest("/messages", configure_messaging_routes(state.clone()))
        .nest("/notifications", configure_notification_routes(state.clone()))
        .nest("/admin", configure_admin_routes(state.clone()))
        .layer(middleware::from_fn_with_state(state.clone(), global_rate_limit));

    let router = Router::new()
        .route("/", get(root))
        .nest("/api", api)
        .route(
            "/ws",
            any(ws_handler).layer(middleware::from_fn_with_state(
                state.clone(),
                ws_authentication_middleware,
            )),
        )
        .nest_service("/uploads", ServeDir::new(&state.upload_dir))
        .fallback(route_not_found)
        .layer(cors_layer(&state.cors_origins));

    with_security_headers(router)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Header di sicurezza su ogni risposta, compresi file statici ed errori
fn with_security_headers(router: Router<Arc<AppState>>) -> Router<Arc<AppState>> {
    const HEADERS: [(&str, &str); 5] = [
        ("x-content-type-options", "nosniff"),
        ("x-frame-options", "DENY"),
        ("referrer-policy", "no-referrer"),
        ("cross-origin-resource-policy", "same-site"),
        ("x-dns-prefetch-control", "off"),
    ];

    HEADERS.into_iter().fold(router, |router, (name, value)| {
        router.layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        ))
    })
}

async fn route_not_found() -> AppError {
    AppError::not_found("Route not found")
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}

/// Configura le routes di autenticazione (register e login pubbliche, me e logout protette).
/// Tutto il gruppo ha un limite di richieste più stretto di quello globale.
fn configure_auth_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use core::{auth_rate_limit, authentication_middleware};
    use services::*;

    let protected = Router::new()
        .route("/me", get(me))
        .route("/logout", post(logout))
        .layer(middleware::from_fn_with_state(state.clone(), authentication_middleware));

    Router::new()
        .route("/register", post(register_user))
        .route("/login", post(login_user))
        .merge(protected)
        .layer(middleware::from_fn_with_state(state, auth_rate_limit))
}

/// Configura le routes per profilo e preferiti dell'utente
fn configure_user_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use core::authentication_middleware;
    use services::*;

    Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route("/password", put(change_password))
        .route("/favorites", get(list_favorites).post(add_favorite))
        .route("/favorites/{produit_id}", delete(remove_favorite))
        .route("/favorites/stats/{produit_id}", get(favorite_stats))
        .layer(middleware::from_fn_with_state(state, authentication_middleware))
}

/// Catalogo pubblico
fn configure_product_routes() -> Router<Arc<AppState>> {
    use services::*;

    Router::new()
        .route("/", get(list_products))
        .route("/popular", get(popular_products))
        .route("/special-offers", get(special_offers))
        .route("/{id}", get(get_product))
}

/// Gestione dei prodotti da parte del fornitore proprietario
fn configure_supplier_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use core::authentication_middleware;
    use services::*;

    Router::new()
        .route("/products", get(list_supplier_products).post(create_product))
        .route("/products/{id}", put(update_product).delete(delete_product))
        .layer(middleware::from_fn_with_state(state, authentication_middleware))
}

fn configure_entreprise_routes() -> Router<Arc<AppState>> {
    use services::*;

    Router::new()
        .route("/", get(list_entreprises))
        .route("/{id}", get(get_entreprise))
}

fn configure_review_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use core::authentication_middleware;
    use services::*;

    let protected = Router::new()
        .route("/", post(create_review))
        .route("/{id}/response", post(reply_to_review))
        .route("/{id}/report", post(report_review))
        .layer(middleware::from_fn_with_state(state, authentication_middleware));

    Router::new()
        .route("/product/{id}", get(list_product_reviews))
        .merge(protected)
}

/// Il tracciamento è pubblico; le statistiche globali sono solo per admin
fn configure_analytics_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use core::{admin_middleware, authentication_middleware};
    use services::*;

    let admin = Router::new()
        .route("/stats/global", get(global_stats))
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(state, authentication_middleware));

    Router::new()
        .route("/products/{id}/view", post(track_view))
        .route("/products/{id}/click", post(track_click))
        .route("/products/{id}/stats", get(product_stats))
        .merge(admin)
}

/// `/{id}` è lo slug in lettura e l'id numerico per like e share
fn configure_blog_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use core::{admin_middleware, authentication_middleware};
    use services::*;

    let admin = Router::new()
        .route("/", post(create_article))
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(state, authentication_middleware));

    Router::new()
        .route("/featured", get(featured_articles))
        .route("/recent", get(recent_articles))
        .route("/categories", get(blog_categories))
        .route("/{id}", get(get_article))
        .route("/{id}/like", post(like_article))
        .route("/{id}/share", post(share_article))
        .merge(admin)
}

fn configure_messaging_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use core::authentication_middleware;
    use services::*;

    Router::new()
        .route("/conversations", get(list_conversations).post(create_conversation))
        .route("/conversations/{id}", get(get_conversation))
        .route(
            "/conversations/{id}/messages",
            get(get_messages)
                .post(send_message)
                .layer(DefaultBodyLimit::max(MESSAGE_BODY_LIMIT)),
        )
        .route("/conversations/{id}/read", patch(mark_conversation_read))
        .route("/conversations/{id}/mute", patch(mute_conversation))
        .route("/messages/{id}", delete(delete_message))
        .route("/notifications", get(list_message_notifications))
        .route("/notifications/{id}/read", patch(mark_message_notification_read))
        .route("/search", get(search_messages))
        .route("/attachments/{id}", get(download_attachment))
        .layer(middleware::from_fn_with_state(state, authentication_middleware))
}

fn configure_notification_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use core::authentication_middleware;
    use services::*;

    Router::new()
        .route("/", get(list_notifications))
        .route("/counts", get(notification_counts))
        .route("/read-all", patch(mark_all_notifications_read))
        .route("/{id}/read", patch(mark_notification_read))
        .route("/{id}", delete(delete_notification))
        .layer(middleware::from_fn_with_state(state, authentication_middleware))
}

/// Tutte le rotte admin: autenticazione e poi controllo del ruolo
fn configure_admin_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use core::{admin_middleware, authentication_middleware};
    use services::*;

    Router::new()
        .route("/notifications", get(list_admin_notifications))
        .route("/notifications/counts", get(admin_notification_counts))
        .route("/notifications/read-all", patch(mark_all_admin_notifications_read))
        .route("/notifications/{id}/read", patch(mark_admin_notification_read))
        .route("/notifications/{id}", delete(delete_admin_notification))
        .route("/users", get(list_users))
        .route("/users/{id}/status", patch(update_user_status))
        .route("/entreprises/{id}/verification", patch(verify_entreprise))
        .route("/reviews/reports", get(list_review_reports))
        .route("/reviews/{id}/moderate", patch(moderate_review))
        .route("/dashboard", get(dashboard))
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(state, authentication_middleware))
}
