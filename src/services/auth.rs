//! Auth services - Registrazione, login e profilo dell'utente autenticato

use crate::core::{AppError, AppState, encode_jwt};
use crate::dtos::{
    AuthResponseDTO, CreateUserDTO, LoginDTO, NewAdminNotification, ProfileDTO, RegisterDTO,
    UserDTO,
};
use crate::entities::{AdminNotificationType, Priority, Role, User, UserStatus};
use crate::repositories::Read;
use crate::services::notifier;
use axum::{
    Extension,
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

#[instrument(skip(state, body), fields(email = %body.email))]
pub async fn register_user(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterDTO>,
) -> Result<impl IntoResponse, AppError> {
    // 1. Validare il DTO (email, password >= 6, nom, role_id in 1..=3)
    // 2. Rifiutare email già registrate
    // 3. Hashare la password e inserire utente (ed entreprise per i fournisseurs) in una transazione
    // 4. Notificare gli admin e restituire token + utente
    body.validate()?;

    if state.user.find_by_email(&body.email).await?.is_some() {
        warn!("Registration with an email already in use");
        return Err(AppError::bad_request("Email already in use"));
    }

    let password_hash = User::hash_password(&body.mot_de_passe)
        .map_err(|_| AppError::internal_server_error("Failed to hash password"))?;

    let new_user = CreateUserDTO {
        email: body.email.trim().to_string(),
        mot_de_passe: password_hash,
        nom: body.nom.trim().to_string(),
        prenom: body.prenom.clone(),
        telephone: body.telephone.clone(),
        role_id: body.role_id,
    };

    let mut tx = state.pool.begin().await?;
    let user_id = state.user.insert(&mut tx, &new_user).await?;
    let entreprise_id = match (&body.entreprise, body.role_id == Role::Fournisseur.id()) {
        (Some(entreprise), true) => Some(
            state
                .enterprise
                .insert_with_steps(&mut tx, user_id, entreprise)
                .await?,
        ),
        _ => None,
    };
    tx.commit().await?;
    info!("User {} registered", user_id);

    let user = state
        .user
        .read(&user_id)
        .await?
        .ok_or_else(|| AppError::internal_server_error("User not found after creation"))?;

    notifier::notify_admins(
        &state,
        NewAdminNotification::new(
            AdminNotificationType::UserManagement,
            "new_user",
            "New user registered",
            format!("{} ({}) created an account", user.display_name(), user.email),
        )
        .user(user.id)
        .data(json!({ "role_id": user.role_id })),
    )
    .await;

    if let Some(entreprise_id) = entreprise_id {
        let nom_entreprise = body
            .entreprise
            .as_ref()
            .map(|e| e.nom_entreprise.as_str())
            .unwrap_or_default();
        notifier::notify_admins(
            &state,
            NewAdminNotification::new(
                AdminNotificationType::UserManagement,
                "verification_request",
                "Supplier verification request",
                format!("{} is waiting for verification", nom_entreprise),
            )
            .priority(Priority::High)
            .user(user.id)
            .data(json!({ "entreprise_id": entreprise_id })),
        )
        .await;
    }

    let token = encode_jwt(&user, &state.jwt_secret, state.jwt_expires_in)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponseDTO {
            message: "User registered successfully",
            token,
            user: UserDTO::from_user(&user, entreprise_id),
        }),
    ))
}

#[instrument(skip(state, body), fields(email = %body.email))]
pub async fn login_user(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginDTO>,
) -> Result<Json<AuthResponseDTO>, AppError> {
    body.validate()?;

    let user = state
        .user
        .find_by_email(body.email.trim())
        .await?
        .ok_or_else(|| {
            warn!("Login with unknown email");
            AppError::unauthorized("Invalid credentials")
        })?;

    if !user.verify_password(&body.mot_de_passe) {
        warn!("Login with wrong password for user {}", user.id);
        return Err(AppError::unauthorized("Invalid credentials"));
    }

    match user.statut {
        UserStatus::Actif => {}
        UserStatus::Suspendu => {
            warn!("Suspended user {} tried to log in", user.id);
            let reason = user
                .suspension_reason
                .clone()
                .unwrap_or_else(|| "No reason provided".to_string());
            return Err(AppError::forbidden("Account suspended")
                .with_details(format!("Reason: {}", reason))
                .suspended());
        }
        UserStatus::Inactif => {
            warn!("Inactive user {} tried to log in", user.id);
            return Err(AppError::unauthorized("Account inactive"));
        }
    }

    state.user.touch_last_login(user.id).await?;
    let entreprise_id = if user.has_role(Role::Fournisseur) {
        state.enterprise.id_for_user(user.id).await?
    } else {
        None
    };

    let token = encode_jwt(&user, &state.jwt_secret, state.jwt_expires_in)?;
    info!("User {} logged in", user.id);

    Ok(Json(AuthResponseDTO {
        message: "Login successful",
        token,
        user: UserDTO::from_user(&user, entreprise_id),
    }))
}

/// Profilo completo: ruolo, entreprise (solo fournisseurs) e indirizzi
pub(crate) async fn load_profile(state: &AppState, user: User) -> Result<ProfileDTO, AppError> {
    let role = state.user.role_name(user.role_id).await?;
    let entreprise = if user.has_role(Role::Fournisseur) {
        state.enterprise.find_by_user(user.id).await?
    } else {
        None
    };
    let adresses = state.user.addresses(user.id).await?;
    debug!("Profile loaded with {} addresses", adresses.len());
    Ok(ProfileDTO {
        user,
        role,
        entreprise,
        adresses,
    })
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.id))]
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> Result<Json<ProfileDTO>, AppError> {
    Ok(Json(load_profile(&state, current_user).await?))
}

/// Il token è stateless: il client lo scarta
pub async fn logout(Extension(current_user): Extension<User>) -> impl IntoResponse {
    info!("User {} logged out", current_user.id);
    Json(json!({ "message": "Logout successful" }))
}
