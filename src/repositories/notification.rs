//! NotificationRepository - Notifiche per gli utenti

use super::Read;
use crate::dtos::{NewNotification, NotificationQuery, PageRequest};
use crate::entities::Notification;
use sqlx::{Error, MySql, MySqlPool, QueryBuilder};
use tracing::{info, instrument};

const NOTIFICATION_COLUMNS: &str = "id, utilisateur_id, type, category, titre, message, priority, \
    data, lu, read_at, related_user_id, related_product_id, related_conversation_id, \
    related_order_id, date_creation";

pub struct NotificationRepository {
    connection_pool: MySqlPool,
}

impl NotificationRepository {
    pub fn new(connection_pool: MySqlPool) -> Self {
        Self { connection_pool }
    }

    #[instrument(skip(self, data), fields(user_id = %data.utilisateur_id, category = %data.category))]
    pub async fn insert(&self, data: &NewNotification) -> Result<Notification, Error> {
        let payload = data.data.as_ref().map(|value| value.to_string());
        let result = sqlx::query(
            "INSERT INTO notifications (utilisateur_id, type, category, titre, message, priority, \
             data, related_user_id, related_product_id, related_conversation_id) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(data.utilisateur_id)
        .bind(data.notification_type)
        .bind(&data.category)
        .bind(&data.titre)
        .bind(&data.message)
        .bind(data.priority)
        .bind(payload)
        .bind(data.related_user_id)
        .bind(data.related_product_id)
        .bind(data.related_conversation_id)
        .execute(&self.connection_pool)
        .await?;

        let id = result.last_insert_id() as i32;
        info!("Notification {} created", id);
        self.read(&id).await?.ok_or(Error::RowNotFound)
    }

    #[instrument(skip(self, filter))]
    pub async fn list(
        &self,
        user_id: i32,
        filter: &NotificationQuery,
        page: PageRequest,
    ) -> Result<(Vec<Notification>, i64), Error> {
        fn push_filters<'a>(qb: &mut QueryBuilder<'a, MySql>, filter: &'a NotificationQuery) {
            if filter.unread_only.unwrap_or(false) {
                qb.push(" AND lu = FALSE");
            }
            if let Some(category) = filter.category.as_deref().filter(|c| !c.is_empty()) {
                qb.push(" AND category = ").push_bind(category);
            }
            if let Some(notification_type) = filter.notification_type {
                qb.push(" AND type = ").push_bind(notification_type);
            }
        }

        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM notifications WHERE utilisateur_id = ");
        count_qb.push_bind(user_id);
        push_filters(&mut count_qb, filter);
        let total = count_qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.connection_pool)
            .await?;

        let mut qb = QueryBuilder::new(format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE utilisateur_id = "
        ));
        qb.push_bind(user_id);
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY date_creation DESC, id DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = qb
            .build_query_as::<Notification>()
            .fetch_all(&self.connection_pool)
            .await?;
        Ok((rows, total))
    }

    pub async fn count_unread(&self, user_id: i32) -> Result<i64, Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE utilisateur_id = ? AND lu = FALSE",
        )
        .bind(user_id)
        .fetch_one(&self.connection_pool)
        .await
    }

    pub async fn count_total(&self, user_id: i32) -> Result<i64, Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM notifications WHERE utilisateur_id = ?")
            .bind(user_id)
            .fetch_one(&self.connection_pool)
            .await
    }

    /// Non lette raggruppate per categoria
    pub async fn unread_by_category(&self, user_id: i32) -> Result<Vec<(String, i64)>, Error> {
        sqlx::query_as::<_, (String, i64)>(
            "SELECT category, COUNT(*) FROM notifications \
             WHERE utilisateur_id = ? AND lu = FALSE GROUP BY category",
        )
        .bind(user_id)
        .fetch_all(&self.connection_pool)
        .await
    }

    /// Non lette raggruppate per priorità
    pub async fn unread_by_priority(&self, user_id: i32) -> Result<Vec<(String, i64)>, Error> {
        sqlx::query_as::<_, (String, i64)>(
            "SELECT CAST(priority AS CHAR), COUNT(*) FROM notifications \
             WHERE utilisateur_id = ? AND lu = FALSE GROUP BY priority",
        )
        .bind(user_id)
        .fetch_all(&self.connection_pool)
        .await
    }

    #[instrument(skip(self))]
    pub async fn mark_read(&self, id: i32, user_id: i32) -> Result<u64, Error> {
        let result = sqlx::query(
            "UPDATE notifications SET lu = TRUE, read_at = COALESCE(read_at, NOW()) \
             WHERE id = ? AND utilisateur_id = ?",
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.connection_pool)
        .await?;
        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    pub async fn mark_all_read(&self, user_id: i32) -> Result<u64, Error> {
        let result = sqlx::query(
            "UPDATE notifications SET lu = TRUE, read_at = NOW() \
             WHERE utilisateur_id = ? AND lu = FALSE",
        )
        .bind(user_id)
        .execute(&self.connection_pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Ritorna le righe eliminate: 0 se la notifica non è del chiamante
    #[instrument(skip(self))]
    pub async fn delete_owned(&self, id: i32, user_id: i32) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = ? AND utilisateur_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.connection_pool)
            .await?;
        Ok(result.rows_affected())
    }
}

impl Read<Notification, i32> for NotificationRepository {
    async fn read(&self, id: &i32) -> Result<Option<Notification>, Error> {
        let query = format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?");
        sqlx::query_as::<_, Notification>(&query)
            .bind(id)
            .fetch_optional(&self.connection_pool)
            .await
    }
}
