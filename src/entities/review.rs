//! Review entities - Avis, risposte dei fornitori e segnalazioni

use super::enums::{ReportReason, ReportStatus, ReviewStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct Review {
    pub id: i32,
    pub produit_id: i32,
    pub utilisateur_id: i32,
    pub note: i8,
    pub commentaire: Option<String>,
    pub achat_verifie: bool,
    pub statut: ReviewStatus,
    pub date_moderation: Option<DateTime<Utc>>,
    pub moderateur_id: Option<i32>,
    pub raison_rejet: Option<String>,
    pub date_creation: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct ReviewResponse {
    pub id: i32,
    pub avis_id: i32,
    pub fournisseur_id: i32,
    pub reponse: String,
    pub date_reponse: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct ReviewReport {
    pub id: i32,
    pub avis_id: i32,
    pub utilisateur_id: i32,
    pub raison: ReportReason,
    pub description: Option<String>,
    pub date_signalement: DateTime<Utc>,
    pub statut: ReportStatus,
}
