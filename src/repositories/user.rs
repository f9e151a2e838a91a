//! UserRepository - Repository per la gestione degli utenti

use super::{Read, Update};
use crate::dtos::{AdminUserQuery, AdminUserRowDTO, CreateUserDTO, PageRequest, UpdateProfileDTO};
use crate::entities::{Adresse, User, UserStatus};
use sqlx::{Error, MySqlConnection, MySqlPool, QueryBuilder};
use tracing::{debug, info, instrument};

const USER_COLUMNS: &str = "id, email, mot_de_passe, nom, prenom, telephone, photo_profil, \
    role_id, statut, suspension_reason, suspended_at, email_verified, derniere_connexion, \
    date_inscription";

// USER REPO
pub struct UserRepository {
    connection_pool: MySqlPool,
}

impl UserRepository {
    pub fn new(connection_pool: MySqlPool) -> UserRepository {
        Self { connection_pool }
    }

    /// L'email è univoca
    #[instrument(skip(self))]
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        debug!("Finding user by email");
        let query = format!("SELECT {USER_COLUMNS} FROM utilisateurs WHERE email = ?");
        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.connection_pool)
            .await
    }

    /// Inserimento dentro una transazione già aperta (registrazione con entreprise)
    #[instrument(skip(self, conn, data), fields(email = %data.email))]
    pub async fn insert(&self, conn: &mut MySqlConnection, data: &CreateUserDTO) -> Result<i32, Error> {
        let result = sqlx::query(
            "INSERT INTO utilisateurs (email, mot_de_passe, nom, prenom, telephone, role_id) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&data.email)
        .bind(&data.mot_de_passe)
        .bind(&data.nom)
        .bind(&data.prenom)
        .bind(&data.telephone)
        .bind(data.role_id)
        .execute(&mut *conn)
        .await?;

        let new_id = result.last_insert_id() as i32;
        info!("User created with id {}", new_id);
        Ok(new_id)
    }

    #[instrument(skip(self))]
    pub async fn touch_last_login(&self, id: i32) -> Result<(), Error> {
        sqlx::query("UPDATE utilisateurs SET derniere_connexion = NOW() WHERE id = ?")
            .bind(id)
            .execute(&self.connection_pool)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, password_hash))]
    pub async fn update_password(&self, id: i32, password_hash: &str) -> Result<(), Error> {
        sqlx::query("UPDATE utilisateurs SET mot_de_passe = ? WHERE id = ?")
            .bind(password_hash)
            .bind(id)
            .execute(&self.connection_pool)
            .await?;
        info!("Password updated");
        Ok(())
    }

    /// `suspendu` registra motivo e data, qualsiasi altro stato li azzera
    #[instrument(skip(self, reason))]
    pub async fn set_status(
        &self,
        id: i32,
        statut: UserStatus,
        reason: Option<&str>,
    ) -> Result<u64, Error> {
        let result = if statut == UserStatus::Suspendu {
            sqlx::query(
                "UPDATE utilisateurs SET statut = ?, suspension_reason = ?, suspended_at = NOW() \
                 WHERE id = ?",
            )
            .bind(statut)
            .bind(reason)
            .bind(id)
            .execute(&self.connection_pool)
            .await?
        } else {
            sqlx::query(
                "UPDATE utilisateurs SET statut = ?, suspension_reason = NULL, suspended_at = NULL \
                 WHERE id = ?",
            )
            .bind(statut)
            .bind(id)
            .execute(&self.connection_pool)
            .await?
        };
        info!("User status set to {:?}", statut);
        Ok(result.rows_affected())
    }

    /// Quanti degli id forniti esistono davvero
    #[instrument(skip(self, ids))]
    pub async fn count_existing(&self, ids: &[i32]) -> Result<i64, Error> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM utilisateurs WHERE id IN (");
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");
        qb.build_query_scalar::<i64>()
            .fetch_one(&self.connection_pool)
            .await
    }

    pub async fn role_name(&self, role_id: i32) -> Result<Option<String>, Error> {
        sqlx::query_scalar::<_, String>("SELECT nom FROM roles WHERE id = ?")
            .bind(role_id)
            .fetch_optional(&self.connection_pool)
            .await
    }

    /// Indirizzi dell'utente, quello predefinito per primo
    #[instrument(skip(self))]
    pub async fn addresses(&self, user_id: i32) -> Result<Vec<Adresse>, Error> {
        sqlx::query_as::<_, Adresse>(
            "SELECT id, utilisateur_id, libelle, adresse_ligne1, adresse_ligne2, ville, \
             code_postal, pays, par_defaut FROM adresses WHERE utilisateur_id = ? \
             ORDER BY par_defaut DESC, id ASC",
        )
        .bind(user_id)
        .fetch_all(&self.connection_pool)
        .await
    }

    /// Lista paginata per il pannello admin con filtri opzionali
    #[instrument(skip(self, filter))]
    pub async fn list_for_admin(
        &self,
        filter: &AdminUserQuery,
        page: PageRequest,
    ) -> Result<(Vec<AdminUserRowDTO>, i64), Error> {
        fn push_filters<'a>(qb: &mut QueryBuilder<'a, sqlx::MySql>, filter: &'a AdminUserQuery) {
            qb.push(" WHERE 1 = 1");
            if let Some(role_id) = filter.role_id {
                qb.push(" AND u.role_id = ").push_bind(role_id);
            }
            if let Some(statut) = filter.statut {
                qb.push(" AND u.statut = ").push_bind(statut);
            }
            if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
                let pattern = format!("%{}%", search.trim());
                qb.push(" AND (u.email LIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR u.nom LIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR u.prenom LIKE ")
                    .push_bind(pattern)
                    .push(")");
            }
        }

        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM utilisateurs u");
        push_filters(&mut count_qb, filter);
        let total = count_qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.connection_pool)
            .await?;

        let mut qb = QueryBuilder::new(
            "SELECT u.id, u.email, u.nom, u.prenom, u.telephone, u.role_id, r.nom AS role, \
             u.statut, u.suspension_reason, u.suspended_at, u.derniere_connexion, \
             u.date_inscription, e.nom_entreprise \
             FROM utilisateurs u \
             LEFT JOIN roles r ON r.id = u.role_id \
             LEFT JOIN entreprises e ON e.utilisateur_id = u.id",
        );
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY u.date_inscription DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = qb
            .build_query_as::<AdminUserRowDTO>()
            .fetch_all(&self.connection_pool)
            .await?;
        Ok((rows, total))
    }

    /// Conteggio utenti per ruolo (dashboard admin)
    pub async fn count_by_role(&self) -> Result<Vec<(i32, i64)>, Error> {
        sqlx::query_as::<_, (i32, i64)>(
            "SELECT role_id, COUNT(*) FROM utilisateurs GROUP BY role_id ORDER BY role_id",
        )
        .fetch_all(&self.connection_pool)
        .await
    }
}

impl Read<User, i32> for UserRepository {
    #[instrument(skip(self), fields(user_id = %id))]
    async fn read(&self, id: &i32) -> Result<Option<User>, Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM utilisateurs WHERE id = ?");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.connection_pool)
            .await
    }
}

impl Update<User, UpdateProfileDTO, i32> for UserRepository {
    #[instrument(skip(self, data), fields(user_id = %id))]
    async fn update(&self, id: &i32, data: &UpdateProfileDTO) -> Result<User, Error> {
        let current = self.read(id).await?.ok_or(Error::RowNotFound)?;

        if data.nom.is_none() && data.prenom.is_none() && data.telephone.is_none() {
            debug!("No fields to update, returning current user");
            return Ok(current);
        }

        let mut query_builder = QueryBuilder::new("UPDATE utilisateurs SET ");
        let mut separated = query_builder.separated(", ");
        if let Some(ref nom) = data.nom {
            separated.push("nom = ");
            separated.push_bind_unseparated(nom.trim());
        }
        if let Some(ref prenom) = data.prenom {
            separated.push("prenom = ");
            separated.push_bind_unseparated(prenom);
        }
        if let Some(ref telephone) = data.telephone {
            separated.push("telephone = ");
            separated.push_bind_unseparated(telephone);
        }
        query_builder.push(" WHERE id = ");
        query_builder.push_bind(id);
        query_builder.build().execute(&self.connection_pool).await?;

        info!("User profile updated");
        self.read(id).await?.ok_or(Error::RowNotFound)
    }
}
