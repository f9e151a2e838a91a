//! ReviewRepository - Avis, risposte dei fornitori e segnalazioni

use super::Read;
use crate::dtos::{CreateReviewDTO, PageRequest, ReviewListItemDTO, ReviewQuery, ReviewReportItemDTO};
use crate::entities::{ReportReason, ReportStatus, Review, ReviewStatus};
use sqlx::{Error, MySqlConnection, MySqlPool, QueryBuilder};
use tracing::{info, instrument};

const REVIEW_COLUMNS: &str = "id, produit_id, utilisateur_id, note, commentaire, achat_verifie, \
    statut, date_moderation, moderateur_id, raison_rejet, date_creation";

pub struct ReviewRepository {
    connection_pool: MySqlPool,
}

impl ReviewRepository {
    pub fn new(connection_pool: MySqlPool) -> Self {
        Self { connection_pool }
    }

    /// Avis approvati di un prodotto con l'eventuale risposta del fornitore
    #[instrument(skip(self, filter))]
    pub async fn list_approved(
        &self,
        produit_id: i32,
        filter: &ReviewQuery,
        page: PageRequest,
    ) -> Result<(Vec<ReviewListItemDTO>, i64), Error> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM avis_produits WHERE produit_id = ? AND statut = 'approuve'",
        )
        .bind(produit_id)
        .fetch_one(&self.connection_pool)
        .await?;

        let mut qb = QueryBuilder::new(
            "SELECT a.id, a.produit_id, a.utilisateur_id, a.note, a.commentaire, a.achat_verifie, \
             a.date_creation, u.nom AS utilisateur_nom, u.prenom AS utilisateur_prenom, \
             r.reponse, r.date_reponse, e.nom_entreprise \
             FROM avis_produits a \
             JOIN utilisateurs u ON u.id = a.utilisateur_id \
             LEFT JOIN reponses_avis r ON r.avis_id = a.id \
             LEFT JOIN entreprises e ON e.id = r.fournisseur_id \
             WHERE a.statut = 'approuve' AND a.produit_id = ",
        );
        qb.push_bind(produit_id);
        qb.push(format!(" ORDER BY {} LIMIT ", filter.order_clause()))
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = qb
            .build_query_as::<ReviewListItemDTO>()
            .fetch_all(&self.connection_pool)
            .await?;
        Ok((rows, total))
    }

    /// Conteggio avis approvati per nota, per ratingStats
    pub async fn rating_counts(&self, produit_id: i32) -> Result<Vec<(i8, i64)>, Error> {
        sqlx::query_as::<_, (i8, i64)>(
            "SELECT note, COUNT(*) FROM avis_produits \
             WHERE produit_id = ? AND statut = 'approuve' GROUP BY note",
        )
        .bind(produit_id)
        .fetch_all(&self.connection_pool)
        .await
    }

    #[instrument(skip(self, conn, data), fields(produit_id = %data.produit_id))]
    pub async fn insert(
        &self,
        conn: &mut MySqlConnection,
        user_id: i32,
        data: &CreateReviewDTO,
        achat_verifie: bool,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<i32, Error> {
        let result = sqlx::query(
            "INSERT INTO avis_produits (produit_id, utilisateur_id, note, commentaire, \
             achat_verifie, statut, ip_address, user_agent) \
             VALUES (?, ?, ?, ?, ?, 'approuve', ?, ?)",
        )
        .bind(data.produit_id)
        .bind(user_id)
        .bind(data.note)
        .bind(&data.commentaire)
        .bind(achat_verifie)
        .bind(ip_address)
        .bind(user_agent)
        .execute(&mut *conn)
        .await?;
        let id = result.last_insert_id() as i32;
        info!("Review created with id {}", id);
        Ok(id)
    }

    pub async fn exists_for_user(&self, produit_id: i32, user_id: i32) -> Result<bool, Error> {
        let found = sqlx::query_scalar::<_, i32>(
            "SELECT id FROM avis_produits WHERE produit_id = ? AND utilisateur_id = ?",
        )
        .bind(produit_id)
        .bind(user_id)
        .fetch_optional(&self.connection_pool)
        .await?;
        Ok(found.is_some())
    }

    /// Fornitore proprietario del prodotto recensito
    pub async fn owner_enterprise(&self, avis_id: i32) -> Result<Option<(i32, i32, String)>, Error> {
        sqlx::query_as::<_, (i32, i32, String)>(
            "SELECT p.fournisseur_id, a.utilisateur_id, p.nom FROM avis_produits a \
             JOIN produits p ON p.id = a.produit_id WHERE a.id = ?",
        )
        .bind(avis_id)
        .fetch_optional(&self.connection_pool)
        .await
    }

    pub async fn has_response(&self, avis_id: i32) -> Result<bool, Error> {
        let found = sqlx::query_scalar::<_, i32>("SELECT id FROM reponses_avis WHERE avis_id = ?")
            .bind(avis_id)
            .fetch_optional(&self.connection_pool)
            .await?;
        Ok(found.is_some())
    }

    #[instrument(skip(self, reponse))]
    pub async fn insert_response(
        &self,
        avis_id: i32,
        fournisseur_id: i32,
        reponse: &str,
    ) -> Result<i32, Error> {
        let result = sqlx::query(
            "INSERT INTO reponses_avis (avis_id, fournisseur_id, reponse) VALUES (?, ?, ?)",
        )
        .bind(avis_id)
        .bind(fournisseur_id)
        .bind(reponse.trim())
        .execute(&self.connection_pool)
        .await?;
        Ok(result.last_insert_id() as i32)
    }

    pub async fn has_report(&self, avis_id: i32, user_id: i32) -> Result<bool, Error> {
        let found = sqlx::query_scalar::<_, i32>(
            "SELECT id FROM signalements_avis WHERE avis_id = ? AND utilisateur_id = ?",
        )
        .bind(avis_id)
        .bind(user_id)
        .fetch_optional(&self.connection_pool)
        .await?;
        Ok(found.is_some())
    }

    #[instrument(skip(self, description))]
    pub async fn insert_report(
        &self,
        avis_id: i32,
        user_id: i32,
        raison: ReportReason,
        description: Option<&str>,
    ) -> Result<i32, Error> {
        let result = sqlx::query(
            "INSERT INTO signalements_avis (avis_id, utilisateur_id, raison, description) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(avis_id)
        .bind(user_id)
        .bind(raison)
        .bind(description)
        .execute(&self.connection_pool)
        .await?;
        Ok(result.last_insert_id() as i32)
    }

    #[instrument(skip(self, conn, raison_rejet))]
    pub async fn moderate(
        &self,
        conn: &mut MySqlConnection,
        avis_id: i32,
        moderateur_id: i32,
        statut: ReviewStatus,
        raison_rejet: Option<&str>,
    ) -> Result<u64, Error> {
        let result = sqlx::query(
            "UPDATE avis_produits SET statut = ?, raison_rejet = ?, moderateur_id = ?, \
             date_moderation = NOW() WHERE id = ?",
        )
        .bind(statut)
        .bind(raison_rejet)
        .bind(moderateur_id)
        .bind(avis_id)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    pub async fn list_reports(&self, statut: ReportStatus) -> Result<Vec<ReviewReportItemDTO>, Error> {
        sqlx::query_as::<_, ReviewReportItemDTO>(
            "SELECT s.id, s.avis_id, s.utilisateur_id, s.raison, s.description, \
             s.date_signalement, s.statut, a.note, a.commentaire, a.produit_id, \
             p.nom AS produit_nom, u.email AS signale_par \
             FROM signalements_avis s \
             JOIN avis_produits a ON a.id = s.avis_id \
             JOIN produits p ON p.id = a.produit_id \
             JOIN utilisateurs u ON u.id = s.utilisateur_id \
             WHERE s.statut = ? ORDER BY s.date_signalement DESC",
        )
        .bind(statut)
        .fetch_all(&self.connection_pool)
        .await
    }

    pub async fn count_pending(&self) -> Result<i64, Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM avis_produits WHERE statut = 'en_attente'",
        )
        .fetch_one(&self.connection_pool)
        .await
    }
}

impl Read<Review, i32> for ReviewRepository {
    #[instrument(skip(self), fields(avis_id = %id))]
    async fn read(&self, id: &i32) -> Result<Option<Review>, Error> {
        let query = format!("SELECT {REVIEW_COLUMNS} FROM avis_produits WHERE id = ?");
        sqlx::query_as::<_, Review>(&query)
            .bind(id)
            .fetch_optional(&self.connection_pool)
            .await
    }
}
