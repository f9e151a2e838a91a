//! Blog DTOs - Articoli, filtri e creazione

use crate::entities::Article;
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::user::not_blank;

lazy_static! {
    static ref SLUG_RE: Regex = Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();
}

#[derive(Deserialize, Debug, Default)]
pub struct FeaturedQuery {
    pub limit: Option<u32>,
}

#[derive(Deserialize, Debug, Default)]
pub struct RecentQuery {
    pub limit: Option<u32>,
    pub category: Option<String>,
    pub sort: Option<String>,
}

impl RecentQuery {
    /// `all` o assente significa nessun filtro
    pub fn category_filter(&self) -> Option<&str> {
        self.category.as_deref().filter(|c| !c.is_empty() && *c != "all")
    }

    pub fn order_clause(&self) -> &'static str {
        match self.sort.as_deref() {
            Some("date_asc") => "date_publication ASC",
            Some("views_desc") => "nombre_vues DESC",
            Some("likes_desc") => "nombre_likes DESC",
            _ => "date_publication DESC",
        }
    }
}

/// Articolo con la durata di lettura già calcolata
#[derive(Serialize, Debug, Clone)]
pub struct ArticleDTO {
    #[serde(flatten)]
    pub article: Article,
    pub temps_lecture_estime: i32,
}

impl From<Article> for ArticleDTO {
    fn from(article: Article) -> Self {
        let temps_lecture_estime = article.temps_lecture_estime();
        Self {
            article,
            temps_lecture_estime,
        }
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct ShareDTO {
    pub platform: Option<String>,
}

#[derive(Deserialize, Debug, Validate)]
pub struct CreateArticleDTO {
    #[validate(custom(function = "not_blank"), length(max = 255))]
    pub titre: String,
    #[validate(regex(path = *SLUG_RE, message = "Slug must be lowercase words separated by dashes"))]
    pub slug: String,
    pub extrait: Option<String>,
    #[validate(custom(function = "not_blank"))]
    pub contenu: String,
    pub image_url: Option<String>,
    pub auteur_nom: Option<String>,
    pub categorie: Option<String>,
    pub tags: Option<String>,
    #[serde(default)]
    pub est_a_la_une: bool,
    #[serde(default)]
    pub est_publie: bool,
    pub date_publication: Option<DateTime<Utc>>,
    #[validate(range(min = 0))]
    pub temps_lecture: Option<i32>,
    pub meta_description: Option<String>,
    pub meta_mots_cles: Option<String>,
}
