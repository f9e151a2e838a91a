//! Entreprise DTOs - Elenco fornitori e verifica amministrativa

use crate::entities::VerificationStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Deserialize, Debug, Default)]
pub struct EntrepriseQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    /// Nome del settore di attività
    pub secteur: Option<String>,
    pub ville: Option<String>,
    pub search: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct EntrepriseListItemDTO {
    pub id: i32,
    pub nom_entreprise: String,
    pub description: Option<String>,
    pub site_web: Option<String>,
    pub telephone_professionnel: Option<String>,
    pub ville: Option<String>,
    pub pays: String,
    pub annee_creation: Option<i32>,
    pub nombre_employes: Option<String>,
    pub certifications: Option<String>,
    pub statut_verification: VerificationStatus,
    pub date_creation: DateTime<Utc>,
    pub secteur_activite: Option<String>,
    pub type_entreprise: Option<String>,
    pub nombre_produits: i64,
    pub note_moyenne: f64,
}

#[derive(Deserialize, Debug, Validate)]
pub struct VerifyEntrepriseDTO {
    pub statut: VerificationStatus,
    #[validate(length(max = 2000))]
    pub commentaire: Option<String>,
}
