//! Entreprise entity - Profilo aziendale dei fornisseur

use super::enums::VerificationStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct Entreprise {
    pub id: i32,
    pub utilisateur_id: i32,
    pub nom_entreprise: String,
    pub telephone_professionnel: Option<String>,
    pub site_web: Option<String>,
    pub description: Option<String>,
    pub secteur_activite_id: Option<i32>,
    pub type_entreprise_id: Option<i32>,
    pub annee_creation: Option<i32>,
    pub nombre_employes: Option<String>,
    pub adresse_ligne1: Option<String>,
    pub adresse_ligne2: Option<String>,
    pub ville: Option<String>,
    pub code_postal: Option<String>,
    pub pays: String,
    pub numero_siret: Option<String>,
    pub numero_registre_commerce: Option<String>,
    pub numero_tva: Option<String>,
    pub capacite_production: Option<String>,
    pub certifications: Option<String>,
    pub statut_verification: VerificationStatus,
    pub commentaire_verification: Option<String>,
    pub date_verification: Option<DateTime<Utc>>,
    pub date_creation: DateTime<Utc>,
}

/// Entreprise con i nomi di settore e tipo risolti
#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct EntrepriseDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub entreprise: Entreprise,
    pub secteur_activite: Option<String>,
    pub type_entreprise: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct Adresse {
    pub id: i32,
    pub utilisateur_id: i32,
    pub libelle: Option<String>,
    pub adresse_ligne1: String,
    pub adresse_ligne2: Option<String>,
    pub ville: String,
    pub code_postal: Option<String>,
    pub pays: String,
    pub par_defaut: bool,
}
