//! Product entities - Prodotti, categorie e immagini del catalogo

use super::enums::{OfferType, ProductStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Prodotto così come letto dal db: le colonne DECIMAL arrivano già castate a DOUBLE
#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct Product {
    pub id: i32,
    pub fournisseur_id: i32,
    pub categorie_id: Option<i32>,
    pub nom: String,
    pub description: Option<String>,
    pub prix_unitaire: f64,
    pub moq: i32,
    pub stock_disponible: i32,
    pub unite: String,
    pub statut: ProductStatus,
    pub est_vedette: bool,
    pub prix_promo: Option<f64>,
    pub date_debut_promo: Option<DateTime<Utc>>,
    pub date_fin_promo: Option<DateTime<Utc>>,
    pub pourcentage_reduction: Option<f64>,
    pub est_en_offre: bool,
    pub type_offre: Option<OfferType>,
    pub quantite_offre: Option<i32>,
    pub vues_30j: i32,
    pub ventes_30j: i32,
    pub score_popularite: f64,
    pub derniere_activite: Option<DateTime<Utc>>,
    pub note_moyenne: f64,
    pub nombre_avis: i32,
    pub date_creation: DateTime<Utc>,
    pub date_modification: DateTime<Utc>,
}

/// Punteggio di popolarità di un prodotto
pub fn popularity_score(vues_30j: i32, ventes_30j: i32, note_moyenne: f64, nombre_avis: i32) -> f64 {
    let raw = f64::from(vues_30j) * 0.3
        + f64::from(ventes_30j) * 0.7
        + note_moyenne * 10.0
        + f64::from(nombre_avis) * 0.5;
    (raw * 100.0).round() / 100.0
}

#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct Category {
    pub id: i32,
    pub nom: String,
    pub description: Option<String>,
    pub parent_id: Option<i32>,
}

#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct ProductImage {
    pub id: i32,
    pub produit_id: i32,
    pub url: String,
    pub ordre: i32,
    pub est_principale: bool,
}
