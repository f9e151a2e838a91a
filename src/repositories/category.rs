//! CategoryRepository - Categorie del catalogo

use crate::dtos::CategoryWithCountDTO;
use sqlx::{Error, MySqlPool};
use tracing::instrument;

pub struct CategoryRepository {
    connection_pool: MySqlPool,
}

impl CategoryRepository {
    pub fn new(connection_pool: MySqlPool) -> Self {
        Self { connection_pool }
    }

    /// Tutte le categorie con il numero di prodotti attivi
    #[instrument(skip(self))]
    pub async fn list_with_counts(&self) -> Result<Vec<CategoryWithCountDTO>, Error> {
        sqlx::query_as::<_, CategoryWithCountDTO>(
            "SELECT c.id, c.nom, c.description, c.parent_id, \
             COUNT(p.id) AS nombre_produits \
             FROM categories c \
             LEFT JOIN produits p ON p.categorie_id = c.id AND p.statut = 'actif' \
             GROUP BY c.id, c.nom, c.description, c.parent_id \
             ORDER BY c.nom",
        )
        .fetch_all(&self.connection_pool)
        .await
    }
}
