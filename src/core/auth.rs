use crate::core::{AppError, AppState};
use crate::entities::{Role, User, UserStatus};
use crate::repositories::Read;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::{Error, body::Body, extract::Request, http, http::Response, middleware::Next};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

// struct che codifica il contenuto del token jwt
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub exp: usize, // Expiry time of the token
    pub iat: usize, // Issued at time of the token
    pub id: i32,
    pub email: String,
    pub role_id: i32,
}

#[instrument(skip(user, secret), fields(user_id = %user.id))]
pub fn encode_jwt(user: &User, secret: &str, ttl: Duration) -> Result<String, Error> {
    debug!("Encoding JWT token for user");
    let now = Utc::now().timestamp() as usize;
    let exp = usize::try_from(ttl.as_secs())
        .ok()
        .and_then(|ttl| now.checked_add(ttl))
        .ok_or_else(|| {
            error!("JWT expiry overflows: {:?}", ttl);
            Error::new("JWT expiry out of range")
        })?;
    let claim = Claims {
        iat: now,
        exp,
        id: user.id,
        email: user.email.clone(),
        role_id: user.role_id,
    };

    encode(
        &Header::default(),
        &claim,
        &EncodingKey::from_secret(secret.as_ref()),
    )
    .map(|token| {
        info!("JWT token encoded successfully");
        token
    })
    .map_err(|e| {
        error!("Failed to encode JWT token: {:?}", e);
        Error::new("Error in encoding jwt token")
    })
}

#[instrument(skip(jwt_token, secret))]
pub fn decode_jwt(jwt_token: &str, secret: &str) -> Result<TokenData<Claims>, Error> {
    debug!("Decoding JWT token");
    decode::<Claims>(
        jwt_token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map(|data| {
        debug!("JWT token decoded successfully for user: {}", data.claims.id);
        data
    })
    .map_err(|e| {
        warn!("Failed to decode JWT token: {:?}", e);
        Error::new("Error in decoding jwt token")
    })
}

/// Estrae il token dall'header `Authorization: Bearer <t>`
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|value| {
            let mut parts = value.split_whitespace();
            match (parts.next(), parts.next()) {
                (Some(scheme), Some(token)) if scheme.eq_ignore_ascii_case("bearer") => {
                    Some(token.to_string())
                }
                _ => None,
            }
        })
}

/// Parametro `token` della query string. I browser non possono impostare header
/// sull'handshake WebSocket, quindi è accettato solo su `/ws`.
fn query_token(query: Option<&str>) -> Option<String> {
    query?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, value)| *key == "token" && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Risolve il token in un utente attivo, applicando le regole sullo stato dell'account
async fn resolve_user(state: &AppState, token: &str) -> Result<User, AppError> {
    let token_data = decode_jwt(token, &state.jwt_secret)
        .map_err(|_| AppError::forbidden("Invalid or expired token"))?;

    let user = state
        .user
        .read(&token_data.claims.id)
        .await?
        .ok_or_else(|| {
            warn!("User not found in database: {}", token_data.claims.id);
            AppError::unauthorized("User not found")
        })?;

    match user.statut {
        UserStatus::Actif => Ok(user),
        UserStatus::Suspendu => {
            warn!("Suspended user {} attempted access", user.id);
            let reason = user
                .suspension_reason
                .clone()
                .unwrap_or_else(|| "No reason provided".to_string());
            Err(AppError::forbidden("Account suspended")
                .with_details(format!("Reason: {}", reason))
                .suspended())
        }
        UserStatus::Inactif => {
            warn!("Inactive user {} attempted access", user.id);
            Err(AppError::unauthorized("Account inactive"))
        }
    }
}

#[instrument(skip(state, req, next))]
pub async fn authentication_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response<Body>, AppError> {
    debug!("Running authentication middleware");
    let token = bearer_token(req.headers());
    authenticate(&state, token, req, next).await
}

/// Variante per l'handshake WebSocket: header oppure `?token=`
#[instrument(skip(state, req, next))]
pub async fn ws_authentication_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response<Body>, AppError> {
    let token = bearer_token(req.headers()).or_else(|| query_token(req.uri().query()));
    authenticate(&state, token, req, next).await
}

async fn authenticate(
    state: &AppState,
    token: Option<String>,
    mut req: Request,
    next: Next,
) -> Result<Response<Body>, AppError> {
    let token = token.ok_or_else(|| {
        warn!("Missing access token");
        AppError::unauthorized("Access token required")
    })?;

    let current_user = resolve_user(state, &token).await?;
    debug!("User authenticated: {}", current_user.id);

    req.extensions_mut().insert(current_user);
    // l'utente si recupera poi con Extension<User>
    Ok(next.run(req).await)
}

/// Middleware da applicare dopo `authentication_middleware` sulle rotte riservate agli admin
#[instrument(skip(req, next))]
pub async fn admin_middleware(req: Request, next: Next) -> Result<Response<Body>, AppError> {
    let current_user = req.extensions().get::<User>().ok_or_else(|| {
        warn!("User not found in request extensions");
        AppError::unauthorized("User not authenticated")
    })?;

    require_role(current_user, &[Role::Administrateur])?;
    Ok(next.run(req).await)
}

/// Utente corrente se la richiesta porta un token valido, altrimenti None.
/// Usato dalle rotte pubbliche che registrano chi le chiama.
pub async fn optional_user(state: &AppState, headers: &HeaderMap) -> Option<User> {
    let token = bearer_token(headers)?;
    resolve_user(state, &token).await.ok()
}

/// Helper function per verificare che un utente abbia uno dei ruoli richiesti
///
/// # Returns
/// * `Ok(())` se il ruolo è permesso
/// * `Err(AppError)` se il ruolo non è tra quelli permessi
#[instrument(skip(user), fields(user_id = %user.id))]
pub fn require_role(user: &User, allowed_roles: &[Role]) -> Result<(), AppError> {
    let allowed = user
        .role()
        .map(|role| allowed_roles.contains(&role))
        .unwrap_or(false);

    if !allowed {
        warn!(
            "User {} has insufficient role {}, required one of: {:?}",
            user.id, user.role_id, allowed_roles
        );
        return Err(AppError::forbidden("Insufficient role").with_details(format!(
            "This action requires one of the following roles: {:?}",
            allowed_roles
        )));
    }

    Ok(())
}
