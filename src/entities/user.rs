//! User entity - Entità utente con metodi per gestione password

use super::enums::{Role, UserStatus};
use bcrypt::{hash, verify};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Costo bcrypt usato per tutte le password
pub const BCRYPT_COST: u32 = 12;

#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct User {
    pub id: i32,
    pub email: String,
    // l'hash non lascia mai il server
    #[serde(skip_serializing, default)]
    pub mot_de_passe: String,
    pub nom: String,
    pub prenom: Option<String>,
    pub telephone: Option<String>,
    pub photo_profil: Option<String>,
    pub role_id: i32,
    pub statut: UserStatus,
    pub suspension_reason: Option<String>,
    pub suspended_at: Option<DateTime<Utc>>,
    pub email_verified: bool,
    pub derniere_connexion: Option<DateTime<Utc>>,
    pub date_inscription: DateTime<Utc>,
}

impl User {
    /// Verify if target_password matches the stored hashed password
    pub fn verify_password(&self, target_password: &str) -> bool {
        verify(target_password, &self.mot_de_passe).unwrap_or(false)
    }

    /// Hash a password using bcrypt
    pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
        hash(password, BCRYPT_COST)
    }

    pub fn role(&self) -> Option<Role> {
        Role::from_id(self.role_id)
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role_id == role.id()
    }

    /// Nome visualizzato: "prenom nom" oppure solo nom
    pub fn display_name(&self) -> String {
        match &self.prenom {
            Some(prenom) if !prenom.trim().is_empty() => format!("{} {}", prenom, self.nom),
            _ => self.nom.clone(),
        }
    }
}
