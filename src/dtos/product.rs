//! Product DTOs - Catalogo, offerte speciali e gestione prodotti del fornitore

use crate::entities::{OfferType, Product, ProductImage, ProductStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::user::not_blank;

#[derive(Deserialize, Debug, Default)]
pub struct ProductQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub categorie_id: Option<i32>,
    pub fournisseur_id: Option<i32>,
    pub search: Option<String>,
    pub offers_only: Option<bool>,
    pub featured_only: Option<bool>,
    pub min_rating: Option<f64>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

impl ProductQuery {
    /// Colonna di ordinamento ammessa; qualsiasi altro valore ricade su date_creation
    pub fn sort_column(&self) -> &'static str {
        match self.sort.as_deref() {
            Some("prix_unitaire") => "p.prix_unitaire",
            Some("nom") => "p.nom",
            Some("score_popularite") => "p.score_popularite",
            Some("note_moyenne") => "p.note_moyenne",
            Some("vues_30j") => "p.vues_30j",
            _ => "p.date_creation",
        }
    }

    pub fn sort_direction(&self) -> &'static str {
        match self.order.as_deref().map(str::to_ascii_uppercase).as_deref() {
            Some("ASC") => "ASC",
            _ => "DESC",
        }
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct PopularQuery {
    pub limit: Option<u32>,
    pub category: Option<i32>,
    pub sort: Option<String>,
}

impl PopularQuery {
    pub fn order_clause(&self) -> &'static str {
        match self.sort.as_deref() {
            Some("rating") => "p.note_moyenne DESC, p.nombre_avis DESC",
            Some("views") => "p.vues_30j DESC",
            _ => "p.score_popularite DESC",
        }
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct SpecialOfferQuery {
    pub limit: Option<u32>,
    pub category: Option<i32>,
    pub sort: Option<String>,
}

impl SpecialOfferQuery {
    pub fn order_clause(&self) -> &'static str {
        match self.sort.as_deref() {
            Some("expiry_asc") => "p.date_fin_promo ASC",
            Some("price_asc") => "COALESCE(p.prix_promo, p.prix_unitaire) ASC",
            _ => "COALESCE(p.pourcentage_reduction, 0) DESC",
        }
    }
}

/// Prodotto con i nomi di fornitore e categoria e l'immagine principale
#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct ProductListItemDTO {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub product: Product,
    pub nom_entreprise: Option<String>,
    pub categorie_nom: Option<String>,
    pub image_principale: Option<String>,
}

#[derive(Serialize, Debug, Clone)]
pub struct ProductDetailDTO {
    #[serde(flatten)]
    pub item: ProductListItemDTO,
    pub images: Vec<ProductImage>,
}

/// Prezzi calcolati di un'offerta speciale
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OfferPricing {
    pub prix_final: f64,
    pub pourcentage_economie: f64,
    pub jours_restants: i64,
}

impl OfferPricing {
    /// Il prezzo promo esplicito vince sulla percentuale di riduzione
    pub fn compute(product: &Product, now: DateTime<Utc>) -> Self {
        let base = product.prix_unitaire;
        let prix_final = match (product.prix_promo, product.pourcentage_reduction) {
            (Some(promo), _) => promo,
            (None, Some(pct)) => base * (1.0 - pct / 100.0),
            (None, None) => base,
        };
        let prix_final = (prix_final * 100.0).round() / 100.0;

        let pourcentage_economie = if base > 0.0 {
            (((base - prix_final) / base) * 100.0).round().max(0.0)
        } else {
            0.0
        };

        let jours_restants = product
            .date_fin_promo
            .map(|fin| {
                let secs = (fin - now).num_seconds();
                if secs <= 0 { 0 } else { (secs + 86_399) / 86_400 }
            })
            .unwrap_or(0);

        Self {
            prix_final,
            pourcentage_economie,
            jours_restants,
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct SpecialOfferDTO {
    #[serde(flatten)]
    pub item: ProductListItemDTO,
    #[serde(flatten)]
    pub pricing: OfferPricing,
}

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct CategoryWithCountDTO {
    pub id: i32,
    pub nom: String,
    pub description: Option<String>,
    pub parent_id: Option<i32>,
    pub nombre_produits: i64,
}

fn validate_offer_window(dto: &CreateProductDTO) -> Result<(), ValidationError> {
    if let (Some(debut), Some(fin)) = (dto.date_debut_promo, dto.date_fin_promo) {
        if fin <= debut {
            return Err(ValidationError::new("promo_window"));
        }
    }
    Ok(())
}

#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
#[validate(schema(function = "validate_offer_window"))]
pub struct CreateProductDTO {
    #[validate(
        custom(function = "not_blank", message = "Product name is required"),
        length(max = 255)
    )]
    pub nom: String,
    pub description: Option<String>,
    #[validate(range(exclusive_min = 0.0, message = "Price must be positive"))]
    pub prix_unitaire: f64,
    pub categorie_id: Option<i32>,
    #[validate(range(min = 1))]
    pub moq: Option<i32>,
    #[validate(range(min = 0))]
    pub stock_disponible: Option<i32>,
    pub unite: Option<String>,
    pub statut: Option<ProductStatus>,
    pub est_vedette: Option<bool>,
    #[validate(range(exclusive_min = 0.0))]
    pub prix_promo: Option<f64>,
    pub date_debut_promo: Option<DateTime<Utc>>,
    pub date_fin_promo: Option<DateTime<Utc>>,
    #[validate(range(min = 0.0, max = 100.0))]
    pub pourcentage_reduction: Option<f64>,
    pub est_en_offre: Option<bool>,
    pub type_offre: Option<OfferType>,
    #[validate(range(min = 0))]
    pub quantite_offre: Option<i32>,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, Validate)]
pub struct UpdateProductDTO {
    #[validate(custom(function = "not_blank"))]
    pub nom: Option<String>,
    pub description: Option<String>,
    #[validate(range(exclusive_min = 0.0))]
    pub prix_unitaire: Option<f64>,
    pub categorie_id: Option<i32>,
    #[validate(range(min = 1))]
    pub moq: Option<i32>,
    #[validate(range(min = 0))]
    pub stock_disponible: Option<i32>,
    pub unite: Option<String>,
    pub statut: Option<ProductStatus>,
    pub est_vedette: Option<bool>,
    #[validate(range(exclusive_min = 0.0))]
    pub prix_promo: Option<f64>,
    pub date_debut_promo: Option<DateTime<Utc>>,
    pub date_fin_promo: Option<DateTime<Utc>>,
    #[validate(range(min = 0.0, max = 100.0))]
    pub pourcentage_reduction: Option<f64>,
    pub est_en_offre: Option<bool>,
    pub type_offre: Option<OfferType>,
    #[validate(range(min = 0))]
    pub quantite_offre: Option<i32>,
}

impl UpdateProductDTO {
    pub fn is_empty(&self) -> bool {
        self.nom.is_none()
            && self.description.is_none()
            && self.prix_unitaire.is_none()
            && self.categorie_id.is_none()
            && self.moq.is_none()
            && self.stock_disponible.is_none()
            && self.unite.is_none()
            && self.statut.is_none()
            && self.est_vedette.is_none()
            && self.prix_promo.is_none()
            && self.date_debut_promo.is_none()
            && self.date_fin_promo.is_none()
            && self.pourcentage_reduction.is_none()
            && self.est_en_offre.is_none()
            && self.type_offre.is_none()
            && self.quantite_offre.is_none()
    }
}

#[derive(Deserialize, Debug)]
pub struct AddFavoriteDTO {
    pub produit_id: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FavoriteStatsDTO {
    pub produit_id: i32,
    pub total_favoris: i64,
    pub ajouts_periode: i64,
    pub period: String,
}
