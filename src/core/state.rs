//! Application State - Stato globale dell'applicazione
//!
//! Contiene tutti i repository, configurazioni e stato condiviso
//! necessario per gestire l'applicazione.

use crate::core::Config;
use crate::core::rate_limit::{
    AUTH_MAX_REQUESTS, GLOBAL_MAX_REQUESTS, RATE_LIMIT_WINDOW, RateLimiter,
};
use crate::repositories::{
    AdminNotificationRepository, AnalyticsRepository, BlogRepository, CategoryRepository,
    ConversationRepository, EnterpriseRepository, FavoriteRepository, MessageRepository,
    NotificationRepository, ProductRepository, ReviewRepository, UserRepository,
};
use crate::ws::UserMap;
use sqlx::MySqlPool;
use std::time::{Duration, Instant};

/// Stato globale dell'applicazione condiviso tra tutte le route e middleware
pub struct AppState {
    pub user: UserRepository,
    pub enterprise: EnterpriseRepository,
    pub product: ProductRepository,
    pub category: CategoryRepository,
    pub favorite: FavoriteRepository,
    pub review: ReviewRepository,
    pub analytics: AnalyticsRepository,
    pub blog: BlogRepository,
    pub conversation: ConversationRepository,
    pub message: MessageRepository,
    pub notification: NotificationRepository,
    pub admin_notification: AdminNotificationRepository,

    /// Pool condiviso, usato direttamente dai service per aprire le transazioni
    pub pool: MySqlPool,

    /// Secret key per JWT token
    pub jwt_secret: String,
    pub jwt_expires_in: Duration,

    /// Directory radice degli upload (allegati in `<upload_dir>/messages`)
    pub upload_dir: String,
    pub app_env: String,
    /// Origini ammesse dal CorsLayer
    pub cors_origins: Vec<String>,
    pub started_at: Instant,

    /// Mappa concorrente degli utenti online con i loro canali WebSocket
    /// Key: user_id, Value: Sender per inviare eventi al WebSocket dell'utente
    pub users_online: UserMap,

    /// Contatori per IP: tutte le rotte `/api` e, più stretto, `/api/auth`
    pub global_limiter: RateLimiter,
    pub auth_limiter: RateLimiter,
}

impl AppState {
    /// Crea una nuova istanza di AppState con i valori di default per tutto
    /// ciò che non è pool o secret (usato dai test)
    pub fn new(pool: MySqlPool, jwt_secret: String) -> Self {
        Self::build(
            pool,
            jwt_secret,
            Duration::from_secs(24 * 60 * 60),
            "uploads".to_string(),
            "development".to_string(),
            vec!["http://localhost:5173".to_string()],
        )
    }

    pub fn from_config(pool: MySqlPool, config: &Config) -> Self {
        Self::build(
            pool,
            config.jwt_secret.clone(),
            config.jwt_expires_in,
            config.upload_dir.clone(),
            config.app_env.clone(),
            config.cors_origins.clone(),
        )
    }

    fn build(
        pool: MySqlPool,
        jwt_secret: String,
        jwt_expires_in: Duration,
        upload_dir: String,
        app_env: String,
        cors_origins: Vec<String>,
    ) -> Self {
        Self {
            user: UserRepository::new(pool.clone()),
            enterprise: EnterpriseRepository::new(pool.clone()),
            product: ProductRepository::new(pool.clone()),
            category: CategoryRepository::new(pool.clone()),
            favorite: FavoriteRepository::new(pool.clone()),
            review: ReviewRepository::new(pool.clone()),
            analytics: AnalyticsRepository::new(pool.clone()),
            blog: BlogRepository::new(pool.clone()),
            conversation: ConversationRepository::new(pool.clone()),
            message: MessageRepository::new(pool.clone()),
            notification: NotificationRepository::new(pool.clone()),
            admin_notification: AdminNotificationRepository::new(pool.clone()),
            pool,
            jwt_secret,
            jwt_expires_in,
            upload_dir,
            app_env,
            cors_origins,
            started_at: Instant::now(),
            users_online: UserMap::new(),
            global_limiter: RateLimiter::new(GLOBAL_MAX_REQUESTS, RATE_LIMIT_WINDOW),
            auth_limiter: RateLimiter::new(AUTH_MAX_REQUESTS, RATE_LIMIT_WINDOW),
        }
    }
}
