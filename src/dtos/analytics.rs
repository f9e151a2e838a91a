//! Analytics DTOs - Contatori giornalieri e statistiche aggregate

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Contatore giornaliero di `statistiques_produits`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    Vues,
    Clics,
    AjoutsFavoris,
    Partages,
}

impl Counter {
    pub fn column(self) -> &'static str {
        match self {
            Counter::Vues => "vues",
            Counter::Clics => "clics",
            Counter::AjoutsFavoris => "ajouts_favoris",
            Counter::Partages => "partages",
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClickAction {
    #[default]
    Click,
    Favorite,
    Share,
}

impl ClickAction {
    pub fn counter(self) -> Counter {
        match self {
            ClickAction::Click => Counter::Clics,
            ClickAction::Favorite => Counter::AjoutsFavoris,
            ClickAction::Share => Counter::Partages,
        }
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct ClickDTO {
    #[serde(default)]
    pub action: ClickAction,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, sqlx::FromRow)]
pub struct StatsTotalsDTO {
    pub total_vues: i64,
    pub total_clics: i64,
    pub total_favoris: i64,
    pub total_partages: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct DailyStatDTO {
    pub date: NaiveDate,
    pub vues: i32,
    pub clics: i32,
    pub ajouts_favoris: i32,
    pub partages: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct ProductSummaryDTO {
    pub id: i32,
    pub nom: String,
    pub vues_30j: i32,
    pub score_popularite: f64,
    pub note_moyenne: f64,
    pub nombre_avis: i32,
}

#[derive(Serialize, Debug)]
pub struct ProductStatsDTO {
    pub product: ProductSummaryDTO,
    pub period: String,
    pub stats: StatsTotalsDTO,
    pub daily: Vec<DailyStatDTO>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, sqlx::FromRow)]
pub struct GlobalTotalsDTO {
    pub total_produits: i64,
    pub produits_actifs: i64,
    pub total_vues: i64,
    pub total_clics: i64,
    pub total_favoris: i64,
    pub total_partages: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct TopProductDTO {
    pub id: i32,
    pub nom: String,
    pub vues: i64,
    pub clics: i64,
    pub score_popularite: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct CategoryStatDTO {
    pub categorie_id: i32,
    pub categorie_nom: String,
    pub nombre_produits: i64,
    pub total_vues: i64,
}

#[derive(Serialize, Debug)]
pub struct GlobalStatsDTO {
    pub period: String,
    pub global: GlobalTotalsDTO,
    #[serde(rename = "topProducts")]
    pub top_products: Vec<TopProductDTO>,
    #[serde(rename = "categoryStats")]
    pub category_stats: Vec<CategoryStatDTO>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_click_action_defaults_to_click() {
        let dto: ClickDTO = serde_json::from_str("{}").unwrap();
        assert_eq!(dto.action, ClickAction::Click);
        assert_eq!(dto.action.counter().column(), "clics");
    }

    #[test]
    fn test_click_action_mapping() {
        let dto: ClickDTO = serde_json::from_str(r#"{"action":"share"}"#).unwrap();
        assert_eq!(dto.action.counter(), Counter::Partages);
        let dto: ClickDTO = serde_json::from_str(r#"{"action":"favorite"}"#).unwrap();
        assert_eq!(dto.action.counter().column(), "ajouts_favoris");
    }

    #[test]
    fn test_unknown_click_action_is_rejected() {
        assert!(serde_json::from_str::<ClickDTO>(r#"{"action":"purchase"}"#).is_err());
    }
}
