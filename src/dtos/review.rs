//! Review DTOs - Avis, statistiche di valutazione e moderazione

use crate::entities::{ReportReason, ReportStatus, ReviewStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

use super::user::not_blank;

#[derive(Deserialize, Debug, Default)]
pub struct ReviewQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort: Option<String>,
}

impl ReviewQuery {
    pub fn order_clause(&self) -> &'static str {
        match self.sort.as_deref() {
            Some("rating_high") => "a.note DESC, a.date_creation DESC",
            Some("rating_low") => "a.note ASC, a.date_creation DESC",
            _ => "a.date_creation DESC",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct ReviewListItemDTO {
    pub id: i32,
    pub produit_id: i32,
    pub utilisateur_id: i32,
    pub note: i8,
    pub commentaire: Option<String>,
    pub achat_verifie: bool,
    pub date_creation: DateTime<Utc>,
    pub utilisateur_nom: String,
    pub utilisateur_prenom: Option<String>,
    pub reponse: Option<String>,
    pub date_reponse: Option<DateTime<Utc>>,
    pub nom_entreprise: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RatingStats {
    pub average: f64,
    pub total: i64,
    pub distribution: BTreeMap<String, i64>,
}

impl RatingStats {
    /// Costruisce le statistiche dai conteggi per nota; le note fuori da 1..=5 sono ignorate
    pub fn from_counts(counts: &[(i8, i64)]) -> Self {
        let mut distribution: BTreeMap<String, i64> =
            (1..=5).map(|n: i8| (n.to_string(), 0)).collect();
        let mut total = 0;
        let mut sum = 0;
        for &(note, count) in counts {
            if !(1..=5).contains(&note) {
                continue;
            }
            distribution.insert(note.to_string(), count);
            total += count;
            sum += i64::from(note) * count;
        }
        let average = if total > 0 {
            ((sum as f64 / total as f64) * 10.0).round() / 10.0
        } else {
            0.0
        };
        Self {
            average,
            total,
            distribution,
        }
    }
}

#[derive(Deserialize, Debug, Validate)]
pub struct CreateReviewDTO {
    pub produit_id: i32,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub note: i8,
    #[validate(length(max = 2000))]
    pub commentaire: Option<String>,
}

#[derive(Deserialize, Debug, Validate)]
pub struct ReviewReplyDTO {
    #[validate(
        custom(function = "not_blank", message = "Response cannot be empty"),
        length(max = 2000)
    )]
    pub reponse: String,
}

#[derive(Deserialize, Debug, Validate)]
pub struct ReportReviewDTO {
    pub raison: ReportReason,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
}

#[derive(Deserialize, Debug, Validate)]
pub struct ModerateReviewDTO {
    pub statut: ReviewStatus,
    #[validate(length(max = 1000))]
    pub raison_rejet: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct ReportQuery {
    pub statut: Option<ReportStatus>,
}

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct ReviewReportItemDTO {
    pub id: i32,
    pub avis_id: i32,
    pub utilisateur_id: i32,
    pub raison: ReportReason,
    pub description: Option<String>,
    pub date_signalement: DateTime<Utc>,
    pub statut: ReportStatus,
    pub note: i8,
    pub commentaire: Option<String>,
    pub produit_id: i32,
    pub produit_nom: String,
    pub signale_par: String,
}
