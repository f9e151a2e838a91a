//! EnterpriseRepository - Repository per entreprises, settori e città

use super::Read;
use crate::dtos::{EntrepriseListItemDTO, EntrepriseQuery, PageRequest, RegisterEntrepriseDTO};
use crate::entities::{Entreprise, EntrepriseDetail, VerificationStatus};
use sqlx::{Error, MySql, MySqlConnection, MySqlPool, QueryBuilder};
use tracing::{debug, info, instrument};

const ENTREPRISE_COLUMNS: &str = "e.id, e.utilisateur_id, e.nom_entreprise, \
    e.telephone_professionnel, e.site_web, e.description, e.secteur_activite_id, \
    e.type_entreprise_id, e.annee_creation, e.nombre_employes, e.adresse_ligne1, \
    e.adresse_ligne2, e.ville, e.code_postal, e.pays, e.numero_siret, \
    e.numero_registre_commerce, e.numero_tva, e.capacite_production, e.certifications, \
    e.statut_verification, e.commentaire_verification, e.date_verification, e.date_creation";

pub struct EnterpriseRepository {
    connection_pool: MySqlPool,
}

impl EnterpriseRepository {
    pub fn new(connection_pool: MySqlPool) -> Self {
        Self { connection_pool }
    }

    /// Crea l'entreprise in attesa di verifica e la riga delle etapes di registrazione
    #[instrument(skip(self, conn, data), fields(user_id = %user_id))]
    pub async fn insert_with_steps(
        &self,
        conn: &mut MySqlConnection,
        user_id: i32,
        data: &RegisterEntrepriseDTO,
    ) -> Result<i32, Error> {
        let result = sqlx::query(
            "INSERT INTO entreprises (utilisateur_id, nom_entreprise, telephone_professionnel, \
             site_web, description, secteur_activite_id, type_entreprise_id, annee_creation, \
             nombre_employes, adresse_ligne1, adresse_ligne2, ville, code_postal, pays, \
             numero_siret, numero_registre_commerce, numero_tva, capacite_production, \
             certifications, nom_banque, iban, nom_titulaire_compte, bic_swift, \
             statut_verification) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'en_attente')",
        )
        .bind(user_id)
        .bind(data.nom_entreprise.trim())
        .bind(&data.telephone_professionnel)
        .bind(&data.site_web)
        .bind(&data.description)
        .bind(data.secteur_activite_id)
        .bind(data.type_entreprise_id)
        .bind(data.annee_creation)
        .bind(&data.nombre_employes)
        .bind(&data.adresse_ligne1)
        .bind(&data.adresse_ligne2)
        .bind(&data.ville)
        .bind(&data.code_postal)
        .bind(data.pays.as_deref().unwrap_or("Gabon"))
        .bind(&data.numero_siret)
        .bind(&data.numero_registre_commerce)
        .bind(&data.numero_tva)
        .bind(&data.capacite_production)
        .bind(&data.certifications)
        .bind(&data.nom_banque)
        .bind(&data.iban)
        .bind(&data.nom_titulaire_compte)
        .bind(&data.bic_swift)
        .execute(&mut *conn)
        .await?;

        let entreprise_id = result.last_insert_id() as i32;

        sqlx::query(
            "INSERT INTO etapes_inscription (entreprise_id, etape_1_compte, etape_2_entreprise, \
             etape_3_adresse, etape_4_legal, etape_5_produits, etape_completee) \
             VALUES (?, TRUE, TRUE, TRUE, TRUE, TRUE, TRUE)",
        )
        .bind(entreprise_id)
        .execute(&mut *conn)
        .await?;

        info!("Entreprise created with id {}", entreprise_id);
        Ok(entreprise_id)
    }

    fn detail_select() -> String {
        format!(
            "SELECT {ENTREPRISE_COLUMNS}, s.nom AS secteur_activite, t.nom AS type_entreprise \
             FROM entreprises e \
             LEFT JOIN secteurs_activite s ON s.id = e.secteur_activite_id \
             LEFT JOIN types_entreprise t ON t.id = e.type_entreprise_id"
        )
    }

    #[instrument(skip(self))]
    pub async fn find_by_user(&self, user_id: i32) -> Result<Option<EntrepriseDetail>, Error> {
        let query = format!("{} WHERE e.utilisateur_id = ?", Self::detail_select());
        sqlx::query_as::<_, EntrepriseDetail>(&query)
            .bind(user_id)
            .fetch_optional(&self.connection_pool)
            .await
    }

    #[instrument(skip(self))]
    pub async fn id_for_user(&self, user_id: i32) -> Result<Option<i32>, Error> {
        sqlx::query_scalar::<_, i32>("SELECT id FROM entreprises WHERE utilisateur_id = ?")
            .bind(user_id)
            .fetch_optional(&self.connection_pool)
            .await
    }

    #[instrument(skip(self))]
    pub async fn detail(&self, id: i32) -> Result<Option<EntrepriseDetail>, Error> {
        let query = format!("{} WHERE e.id = ?", Self::detail_select());
        sqlx::query_as::<_, EntrepriseDetail>(&query)
            .bind(id)
            .fetch_optional(&self.connection_pool)
            .await
    }

    /// Solo le entreprises verificate sono visibili agli acquirenti
    #[instrument(skip(self, filter))]
    pub async fn list_verified(
        &self,
        filter: &EntrepriseQuery,
        page: PageRequest,
    ) -> Result<(Vec<EntrepriseListItemDTO>, i64), Error> {
        fn push_filters<'a>(qb: &mut QueryBuilder<'a, MySql>, filter: &'a EntrepriseQuery) {
            qb.push(" WHERE e.statut_verification = 'verifie'");
            if let Some(secteur) = filter.secteur.as_deref().filter(|s| !s.is_empty()) {
                qb.push(" AND s.nom = ").push_bind(secteur);
            }
            if let Some(ville) = filter.ville.as_deref().filter(|v| !v.is_empty()) {
                qb.push(" AND e.ville = ").push_bind(ville);
            }
            if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
                let pattern = format!("%{}%", search.trim());
                qb.push(" AND (e.nom_entreprise LIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR e.description LIKE ")
                    .push_bind(pattern)
                    .push(")");
            }
        }

        let mut count_qb = QueryBuilder::new(
            "SELECT COUNT(*) FROM entreprises e \
             LEFT JOIN secteurs_activite s ON s.id = e.secteur_activite_id",
        );
        push_filters(&mut count_qb, filter);
        let total = count_qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.connection_pool)
            .await?;

        let mut qb = QueryBuilder::new(
            "SELECT e.id, e.nom_entreprise, e.description, e.site_web, e.telephone_professionnel, \
             e.ville, e.pays, e.annee_creation, e.nombre_employes, e.certifications, \
             e.statut_verification, e.date_creation, \
             s.nom AS secteur_activite, t.nom AS type_entreprise, \
             (SELECT COUNT(*) FROM produits p WHERE p.fournisseur_id = e.id AND p.statut = 'actif') \
                AS nombre_produits, \
             CAST(COALESCE((SELECT AVG(p.note_moyenne) FROM produits p \
                WHERE p.fournisseur_id = e.id AND p.nombre_avis > 0), 0) AS DOUBLE) AS note_moyenne \
             FROM entreprises e \
             LEFT JOIN secteurs_activite s ON s.id = e.secteur_activite_id \
             LEFT JOIN types_entreprise t ON t.id = e.type_entreprise_id",
        );
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY e.nom_entreprise ASC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = qb
            .build_query_as::<EntrepriseListItemDTO>()
            .fetch_all(&self.connection_pool)
            .await?;
        debug!("Found {} enterprises out of {}", rows.len(), total);
        Ok((rows, total))
    }

    /// Settori effettivamente usati da almeno un'entreprise
    pub async fn sectors(&self) -> Result<Vec<String>, Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT s.nom FROM secteurs_activite s \
             JOIN entreprises e ON e.secteur_activite_id = s.id \
             WHERE s.nom IS NOT NULL AND s.nom != '' ORDER BY s.nom",
        )
        .fetch_all(&self.connection_pool)
        .await
    }

    pub async fn cities(&self) -> Result<Vec<String>, Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT ville FROM entreprises \
             WHERE ville IS NOT NULL AND ville != '' ORDER BY ville",
        )
        .fetch_all(&self.connection_pool)
        .await
    }

    #[instrument(skip(self, commentaire))]
    pub async fn set_verification(
        &self,
        id: i32,
        statut: VerificationStatus,
        commentaire: Option<&str>,
    ) -> Result<u64, Error> {
        let result = sqlx::query(
            "UPDATE entreprises SET statut_verification = ?, commentaire_verification = ?, \
             date_verification = NOW() WHERE id = ?",
        )
        .bind(statut)
        .bind(commentaire)
        .bind(id)
        .execute(&self.connection_pool)
        .await?;
        info!("Entreprise verification set to {:?}", statut);
        Ok(result.rows_affected())
    }

    pub async fn count_pending(&self) -> Result<i64, Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM entreprises WHERE statut_verification = 'en_attente'",
        )
        .fetch_one(&self.connection_pool)
        .await
    }
}

impl Read<Entreprise, i32> for EnterpriseRepository {
    #[instrument(skip(self), fields(entreprise_id = %id))]
    async fn read(&self, id: &i32) -> Result<Option<Entreprise>, Error> {
        let query = format!("SELECT {ENTREPRISE_COLUMNS} FROM entreprises e WHERE e.id = ?");
        sqlx::query_as::<_, Entreprise>(&query)
            .bind(id)
            .fetch_optional(&self.connection_pool)
            .await
    }
}
