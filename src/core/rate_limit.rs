//! Rate limiting per IP a finestra fissa
//!
//! Due istanze vivono in `AppState`: una globale su tutte le rotte `/api` e una
//! più stretta su `/api/auth`. I contatori stanno in una `DashMap` come gli
//! utenti online.

use crate::core::AppState;
use crate::core::error::AppError;
use crate::services::client_ip;
use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{HeaderValue, Response, header},
    middleware::Next,
    response::IntoResponse,
};
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(15 * 60);
pub const GLOBAL_MAX_REQUESTS: u32 = 1000;
pub const AUTH_MAX_REQUESTS: u32 = 20;

/// Oltre questa soglia di chiavi le finestre scadute vengono ripulite
const PURGE_THRESHOLD: usize = 10_000;

struct Window {
    started: Instant,
    count: u32,
}

pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    hits: DashMap<String, Window>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            hits: DashMap::new(),
        }
    }

    /// `Err` con il tempo mancante alla riapertura della finestra
    pub fn check(&self, key: &str) -> Result<(), Duration> {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> Result<(), Duration> {
        if self.hits.len() > PURGE_THRESHOLD {
            self.purge_expired(now);
        }

        let mut entry = self.hits.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        let elapsed = now.saturating_duration_since(entry.started);
        if elapsed >= self.window {
            entry.started = now;
            entry.count = 0;
        }
        if entry.count >= self.max_requests {
            return Err(self.window.saturating_sub(elapsed));
        }
        entry.count += 1;
        Ok(())
    }

    fn purge_expired(&self, now: Instant) {
        self.hits
            .retain(|_, w| now.saturating_duration_since(w.started) < self.window);
    }
}

/// Chiave del client: header del proxy, poi indirizzo del peer
fn client_key(req: &Request) -> String {
    client_ip(req.headers())
        .or_else(|| {
            req.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

async fn enforce(limiter: &RateLimiter, req: Request, next: Next) -> Response<Body> {
    let key = client_key(&req);
    match limiter.check(&key) {
        Ok(()) => next.run(req).await,
        Err(retry_after) => {
            warn!("Rate limit exceeded for {} on {}", key, req.uri().path());
            let secs = retry_after.as_secs().max(1);
            let mut response = AppError::too_many_requests("Too many requests")
                .with_details(format!("Retry in {} seconds", secs))
                .into_response();
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
            response
        }
    }
}

pub async fn global_rate_limit(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response<Body> {
    enforce(&state.global_limiter, req, next).await
}

pub async fn auth_rate_limit(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response<Body> {
    enforce(&state.auth_limiter, req, next).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocks_after_max_requests() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let now = Instant::now();
        assert!(limiter.check_at("10.0.0.1", now).is_ok());
        assert!(limiter.check_at("10.0.0.1", now).is_ok());
        let retry = limiter.check_at("10.0.0.1", now + Duration::from_secs(20)).unwrap_err();
        assert_eq!(retry, Duration::from_secs(40));
        // gli altri client hanno il loro contatore
        assert!(limiter.check_at("10.0.0.2", now).is_ok());
    }

    #[test]
    fn test_window_reopens() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();
        assert!(limiter.check_at("ip", now).is_ok());
        assert!(limiter.check_at("ip", now + Duration::from_secs(59)).is_err());
        assert!(limiter.check_at("ip", now + Duration::from_secs(60)).is_ok());
    }

    #[test]
    fn test_purge_drops_expired_windows() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));
        let now = Instant::now();
        limiter.check_at("old", now).unwrap();
        limiter.check_at("fresh", now + Duration::from_secs(50)).unwrap();
        limiter.purge_expired(now + Duration::from_secs(70));
        assert_eq!(limiter.hits.len(), 1);
        assert!(limiter.hits.contains_key("fresh"));
    }
}
