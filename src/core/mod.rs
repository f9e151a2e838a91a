//! Core Module - Componenti infrastrutturali dell'applicazione
//!
//! Questo modulo contiene tutti i componenti "core" dell'applicazione:
//! - Autenticazione, JWT e controllo dei ruoli
//! - Configurazione
//! - Gestione errori
//! - Rate limiting per IP
//! - Stato applicazione

pub mod auth;
pub mod config;
pub mod error;
pub mod rate_limit;
pub mod state;

// Re-exports per facilitare l'import
pub use auth::{
    Claims, admin_middleware, authentication_middleware, decode_jwt, encode_jwt, optional_user,
    require_role, ws_authentication_middleware,
};
pub use config::Config;
pub use error::AppError;
pub use rate_limit::{RateLimiter, auth_rate_limit, global_rate_limit};
pub use state::AppState;
