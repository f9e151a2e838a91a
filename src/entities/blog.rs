//! Article entity - Articoli del blog

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Caratteri letti al minuto usati per stimare la durata di lettura
const CHARS_PER_MINUTE: usize = 200;

#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct Article {
    pub id: i32,
    pub titre: String,
    pub slug: String,
    pub extrait: Option<String>,
    pub contenu: String,
    pub image_url: Option<String>,
    pub auteur_nom: Option<String>,
    pub categorie: String,
    pub tags: Option<String>,
    pub est_a_la_une: bool,
    pub est_publie: bool,
    pub date_publication: Option<DateTime<Utc>>,
    pub temps_lecture: i32,
    pub nombre_vues: i32,
    pub nombre_likes: i32,
    pub nombre_partages: i32,
    pub meta_description: Option<String>,
    pub meta_mots_cles: Option<String>,
    pub date_creation: DateTime<Utc>,
}

impl Article {
    /// Minuti di lettura: quelli salvati, altrimenti stimati dalla lunghezza del contenuto
    pub fn temps_lecture_estime(&self) -> i32 {
        estimate_reading_time(self.temps_lecture, &self.contenu)
    }
}

pub fn estimate_reading_time(stored: i32, contenu: &str) -> i32 {
    if stored > 0 {
        return stored;
    }
    let chars = contenu.chars().count();
    chars.div_ceil(CHARS_PER_MINUTE) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_reading_time_wins() {
        assert_eq!(estimate_reading_time(7, "short"), 7);
    }

    #[test]
    fn test_estimated_reading_time_rounds_up() {
        assert_eq!(estimate_reading_time(0, &"a".repeat(200)), 1);
        assert_eq!(estimate_reading_time(0, &"a".repeat(201)), 2);
        assert_eq!(estimate_reading_time(0, ""), 0);
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        // 200 caratteri accentati = 400 byte, ma un solo minuto
        assert_eq!(estimate_reading_time(0, &"é".repeat(200)), 1);
    }
}
