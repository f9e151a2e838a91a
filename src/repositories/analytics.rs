//! AnalyticsRepository - Contatori giornalieri dei prodotti e aggregati

use crate::dtos::{
    CategoryStatDTO, Counter, DailyStatDTO, GlobalTotalsDTO, ProductSummaryDTO, StatsTotalsDTO,
    TopProductDTO,
};
use sqlx::{Error, MySqlConnection, MySqlPool};
use tracing::{debug, instrument};

pub struct AnalyticsRepository {
    connection_pool: MySqlPool,
}

impl AnalyticsRepository {
    pub fn new(connection_pool: MySqlPool) -> Self {
        Self { connection_pool }
    }

    /// Incrementa il contatore del giorno, creando la riga se manca
    #[instrument(skip(self, conn))]
    pub async fn bump(
        &self,
        conn: &mut MySqlConnection,
        produit_id: i32,
        counter: Counter,
    ) -> Result<(), Error> {
        let column = counter.column();
        let query = format!(
            "INSERT INTO statistiques_produits (produit_id, date, {column}) \
             VALUES (?, CURDATE(), 1) \
             ON DUPLICATE KEY UPDATE {column} = {column} + 1"
        );
        sqlx::query(&query)
            .bind(produit_id)
            .execute(&mut *conn)
            .await?;
        debug!("Counter {} bumped for product {}", column, produit_id);
        Ok(())
    }

    /// Variante senza transazione esplicita
    pub async fn bump_now(&self, produit_id: i32, counter: Counter) -> Result<(), Error> {
        let mut conn = self.connection_pool.acquire().await?;
        self.bump(&mut conn, produit_id, counter).await
    }

    #[instrument(skip(self, conn, ip_address, user_agent, referrer))]
    pub async fn record_view(
        &self,
        conn: &mut MySqlConnection,
        produit_id: i32,
        user_id: Option<i32>,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
        referrer: Option<&str>,
    ) -> Result<(), Error> {
        sqlx::query(
            "INSERT INTO vues_produits_detaillees \
             (produit_id, utilisateur_id, ip_address, user_agent, referrer) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(produit_id)
        .bind(user_id)
        .bind(ip_address)
        .bind(user_agent)
        .bind(referrer)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn product_summary(&self, produit_id: i32) -> Result<Option<ProductSummaryDTO>, Error> {
        sqlx::query_as::<_, ProductSummaryDTO>(
            "SELECT id, nom, vues_30j, CAST(score_popularite AS DOUBLE) AS score_popularite, \
             CAST(note_moyenne AS DOUBLE) AS note_moyenne, nombre_avis \
             FROM produits WHERE id = ?",
        )
        .bind(produit_id)
        .fetch_optional(&self.connection_pool)
        .await
    }

    #[instrument(skip(self))]
    pub async fn totals(&self, produit_id: i32, days: i64) -> Result<StatsTotalsDTO, Error> {
        sqlx::query_as::<_, StatsTotalsDTO>(
            "SELECT CAST(COALESCE(SUM(vues), 0) AS SIGNED) AS total_vues, \
             CAST(COALESCE(SUM(clics), 0) AS SIGNED) AS total_clics, \
             CAST(COALESCE(SUM(ajouts_favoris), 0) AS SIGNED) AS total_favoris, \
             CAST(COALESCE(SUM(partages), 0) AS SIGNED) AS total_partages \
             FROM statistiques_produits \
             WHERE produit_id = ? AND date >= CURDATE() - INTERVAL ? DAY",
        )
        .bind(produit_id)
        .bind(days)
        .fetch_one(&self.connection_pool)
        .await
    }

    #[instrument(skip(self))]
    pub async fn daily(&self, produit_id: i32, days: i64) -> Result<Vec<DailyStatDTO>, Error> {
        sqlx::query_as::<_, DailyStatDTO>(
            "SELECT date, vues, clics, ajouts_favoris, partages FROM statistiques_produits \
             WHERE produit_id = ? AND date >= CURDATE() - INTERVAL ? DAY ORDER BY date ASC",
        )
        .bind(produit_id)
        .bind(days)
        .fetch_all(&self.connection_pool)
        .await
    }

    pub async fn favorites_added(&self, produit_id: i32, days: i64) -> Result<i64, Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT CAST(COALESCE(SUM(ajouts_favoris), 0) AS SIGNED) FROM statistiques_produits \
             WHERE produit_id = ? AND date >= CURDATE() - INTERVAL ? DAY",
        )
        .bind(produit_id)
        .bind(days)
        .fetch_one(&self.connection_pool)
        .await
    }

    #[instrument(skip(self))]
    pub async fn global_totals(&self, days: i64) -> Result<GlobalTotalsDTO, Error> {
        sqlx::query_as::<_, GlobalTotalsDTO>(
            "SELECT \
                (SELECT COUNT(*) FROM produits) AS total_produits, \
                (SELECT COUNT(*) FROM produits WHERE statut = 'actif') AS produits_actifs, \
                CAST(COALESCE(SUM(s.vues), 0) AS SIGNED) AS total_vues, \
                CAST(COALESCE(SUM(s.clics), 0) AS SIGNED) AS total_clics, \
                CAST(COALESCE(SUM(s.ajouts_favoris), 0) AS SIGNED) AS total_favoris, \
                CAST(COALESCE(SUM(s.partages), 0) AS SIGNED) AS total_partages \
             FROM statistiques_produits s \
             WHERE s.date >= CURDATE() - INTERVAL ? DAY",
        )
        .bind(days)
        .fetch_one(&self.connection_pool)
        .await
    }

    #[instrument(skip(self))]
    pub async fn top_products(&self, days: i64, limit: i64) -> Result<Vec<TopProductDTO>, Error> {
        sqlx::query_as::<_, TopProductDTO>(
            "SELECT p.id, p.nom, \
             CAST(COALESCE(SUM(s.vues), 0) AS SIGNED) AS vues, \
             CAST(COALESCE(SUM(s.clics), 0) AS SIGNED) AS clics, \
             CAST(p.score_popularite AS DOUBLE) AS score_popularite \
             FROM produits p \
             LEFT JOIN statistiques_produits s ON s.produit_id = p.id \
                AND s.date >= CURDATE() - INTERVAL ? DAY \
             GROUP BY p.id, p.nom, p.score_popularite \
             ORDER BY vues DESC, p.score_popularite DESC LIMIT ?",
        )
        .bind(days)
        .bind(limit)
        .fetch_all(&self.connection_pool)
        .await
    }

    #[instrument(skip(self))]
    pub async fn category_stats(&self, days: i64) -> Result<Vec<CategoryStatDTO>, Error> {
        sqlx::query_as::<_, CategoryStatDTO>(
            "SELECT c.id AS categorie_id, c.nom AS categorie_nom, \
             COUNT(DISTINCT p.id) AS nombre_produits, \
             CAST(COALESCE(SUM(s.vues), 0) AS SIGNED) AS total_vues \
             FROM categories c \
             LEFT JOIN produits p ON p.categorie_id = c.id \
             LEFT JOIN statistiques_produits s ON s.produit_id = p.id \
                AND s.date >= CURDATE() - INTERVAL ? DAY \
             GROUP BY c.id, c.nom \
             ORDER BY total_vues DESC",
        )
        .bind(days)
        .fetch_all(&self.connection_pool)
        .await
    }
}
