//! FavoriteRepository - Prodotti preferiti degli utenti

use super::product::list_item_select;
use crate::dtos::ProductListItemDTO;
use sqlx::{Error, MySqlPool};
use tracing::{info, instrument};

pub struct FavoriteRepository {
    connection_pool: MySqlPool,
}

impl FavoriteRepository {
    pub fn new(connection_pool: MySqlPool) -> Self {
        Self { connection_pool }
    }

    #[instrument(skip(self))]
    pub async fn list(&self, user_id: i32) -> Result<Vec<ProductListItemDTO>, Error> {
        let query = format!(
            "{} JOIN favoris f ON f.produit_id = p.id \
             WHERE f.utilisateur_id = ? ORDER BY f.date_ajout DESC",
            list_item_select()
        );
        sqlx::query_as::<_, ProductListItemDTO>(&query)
            .bind(user_id)
            .fetch_all(&self.connection_pool)
            .await
    }

    /// Idempotente: ritorna true solo se la riga è stata davvero inserita
    #[instrument(skip(self))]
    pub async fn add(&self, user_id: i32, produit_id: i32) -> Result<bool, Error> {
        let result =
            sqlx::query("INSERT IGNORE INTO favoris (utilisateur_id, produit_id) VALUES (?, ?)")
                .bind(user_id)
                .bind(produit_id)
                .execute(&self.connection_pool)
                .await?;
        let inserted = result.rows_affected() > 0;
        info!("Favorite add, inserted = {}", inserted);
        Ok(inserted)
    }

    #[instrument(skip(self))]
    pub async fn remove(&self, user_id: i32, produit_id: i32) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM favoris WHERE utilisateur_id = ? AND produit_id = ?")
            .bind(user_id)
            .bind(produit_id)
            .execute(&self.connection_pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn count_for_product(&self, produit_id: i32) -> Result<i64, Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM favoris WHERE produit_id = ?")
            .bind(produit_id)
            .fetch_one(&self.connection_pool)
            .await
    }
}
