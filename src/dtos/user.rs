//! User DTOs - Data Transfer Objects per utenti e autenticazione

use crate::entities::{Adresse, EntrepriseDetail, User, UserStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Dati dell'entreprise inviati durante la registrazione di un fornisseur
#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct RegisterEntrepriseDTO {
    #[validate(custom(function = "not_blank"))]
    pub nom_entreprise: String,
    pub telephone_professionnel: Option<String>,
    #[validate(url)]
    pub site_web: Option<String>,
    pub description: Option<String>,
    pub secteur_activite_id: Option<i32>,
    pub type_entreprise_id: Option<i32>,
    #[validate(range(min = 1800, max = 2100))]
    pub annee_creation: Option<i32>,
    pub nombre_employes: Option<String>,
    pub adresse_ligne1: Option<String>,
    pub adresse_ligne2: Option<String>,
    pub ville: Option<String>,
    pub code_postal: Option<String>,
    pub pays: Option<String>,
    pub numero_siret: Option<String>,
    pub numero_registre_commerce: Option<String>,
    pub numero_tva: Option<String>,
    pub capacite_production: Option<String>,
    pub certifications: Option<String>,
    pub nom_banque: Option<String>,
    pub iban: Option<String>,
    pub nom_titulaire_compte: Option<String>,
    pub bic_swift: Option<String>,
}

fn default_role_id() -> i32 {
    1
}

#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct RegisterDTO {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub mot_de_passe: String,
    #[validate(custom(function = "not_blank", message = "Name is required"))]
    pub nom: String,
    pub prenom: Option<String>,
    pub telephone: Option<String>,
    #[serde(default = "default_role_id")]
    #[validate(range(min = 1, max = 3, message = "role_id must be 1, 2 or 3"))]
    pub role_id: i32,
    #[validate(nested)]
    pub entreprise: Option<RegisterEntrepriseDTO>,
}

/// DTO per creare un nuovo utente (password già hashata)
#[derive(Debug, Clone)]
pub struct CreateUserDTO {
    pub email: String,
    pub mot_de_passe: String,
    pub nom: String,
    pub prenom: Option<String>,
    pub telephone: Option<String>,
    pub role_id: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct LoginDTO {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub mot_de_passe: String,
}

/// Rappresentazione pubblica dell'utente restituita da register/login
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UserDTO {
    pub id: i32,
    pub email: String,
    pub nom: String,
    pub prenom: Option<String>,
    pub role_id: i32,
    pub entreprise_id: Option<i32>,
}

impl UserDTO {
    pub fn from_user(user: &User, entreprise_id: Option<i32>) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            nom: user.nom.clone(),
            prenom: user.prenom.clone(),
            role_id: user.role_id,
            entreprise_id,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct AuthResponseDTO {
    pub message: &'static str,
    pub token: String,
    pub user: UserDTO,
}

/// Profilo completo restituito da /auth/me e /users/profile
#[derive(Serialize, Debug)]
pub struct ProfileDTO {
    #[serde(flatten)]
    pub user: User,
    pub role: Option<String>,
    pub entreprise: Option<EntrepriseDetail>,
    pub adresses: Vec<Adresse>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, Validate)]
pub struct UpdateProfileDTO {
    #[validate(custom(function = "not_blank", message = "Name cannot be empty"))]
    pub nom: Option<String>,
    pub prenom: Option<String>,
    #[validate(length(max = 30))]
    pub telephone: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct ChangePasswordDTO {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub new_password: String,
}

/// Riga della lista utenti del pannello admin
#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct AdminUserRowDTO {
    pub id: i32,
    pub email: String,
    pub nom: String,
    pub prenom: Option<String>,
    pub telephone: Option<String>,
    pub role_id: i32,
    pub role: Option<String>,
    pub statut: UserStatus,
    pub suspension_reason: Option<String>,
    pub suspended_at: Option<DateTime<Utc>>,
    pub derniere_connexion: Option<DateTime<Utc>>,
    pub date_inscription: DateTime<Utc>,
    pub nom_entreprise: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct AdminUserQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub role_id: Option<i32>,
    pub statut: Option<UserStatus>,
    pub search: Option<String>,
}

#[derive(Deserialize, Debug, Validate)]
pub struct UpdateUserStatusDTO {
    pub statut: UserStatus,
    #[validate(length(max = 1000))]
    pub reason: Option<String>,
}
