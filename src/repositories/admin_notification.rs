//! AdminNotificationRepository - Eventi da sottoporre agli amministratori

use super::Delete;
use crate::dtos::{AdminNotificationQuery, NewAdminNotification, PageRequest};
use crate::entities::AdminNotification;
use sqlx::{Error, MySql, MySqlPool, QueryBuilder};
use tracing::{info, instrument};

const ADMIN_NOTIFICATION_COLUMNS: &str = "id, type, category, title, message, priority, data, \
    is_read, read_at, user_id, product_id, order_id, created_at";

pub struct AdminNotificationRepository {
    connection_pool: MySqlPool,
}

impl AdminNotificationRepository {
    pub fn new(connection_pool: MySqlPool) -> Self {
        Self { connection_pool }
    }

    #[instrument(skip(self, data), fields(category = %data.category))]
    pub async fn insert(&self, data: &NewAdminNotification) -> Result<i32, Error> {
        let payload = data.data.as_ref().map(|value| value.to_string());
        let result = sqlx::query(
            "INSERT INTO admin_notifications (type, category, title, message, priority, data, \
             user_id, product_id) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(data.notification_type)
        .bind(&data.category)
        .bind(&data.title)
        .bind(&data.message)
        .bind(data.priority)
        .bind(payload)
        .bind(data.user_id)
        .bind(data.product_id)
        .execute(&self.connection_pool)
        .await?;
        let id = result.last_insert_id() as i32;
        info!("Admin notification {} created", id);
        Ok(id)
    }

    #[instrument(skip(self, filter))]
    pub async fn list(
        &self,
        filter: &AdminNotificationQuery,
        page: PageRequest,
    ) -> Result<(Vec<AdminNotification>, i64), Error> {
        fn push_filters<'a>(qb: &mut QueryBuilder<'a, MySql>, filter: &'a AdminNotificationQuery) {
            qb.push(" WHERE 1 = 1");
            if let Some(notification_type) = filter.notification_type {
                qb.push(" AND type = ").push_bind(notification_type);
            }
            if let Some(priority) = filter.priority {
                qb.push(" AND priority = ").push_bind(priority);
            }
            if filter.unread_only.unwrap_or(false) {
                qb.push(" AND is_read = FALSE");
            }
        }

        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM admin_notifications");
        push_filters(&mut count_qb, filter);
        let total = count_qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.connection_pool)
            .await?;

        let mut qb = QueryBuilder::new(format!(
            "SELECT {ADMIN_NOTIFICATION_COLUMNS} FROM admin_notifications"
        ));
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = qb
            .build_query_as::<AdminNotification>()
            .fetch_all(&self.connection_pool)
            .await?;
        Ok((rows, total))
    }

    /// (totale, non lette, urgenti non lette)
    pub async fn totals(&self) -> Result<(i64, i64, i64), Error> {
        sqlx::query_as::<_, (i64, i64, i64)>(
            "SELECT COUNT(*), \
             CAST(COALESCE(SUM(is_read = FALSE), 0) AS SIGNED), \
             CAST(COALESCE(SUM(is_read = FALSE AND priority = 'urgent'), 0) AS SIGNED) \
             FROM admin_notifications",
        )
        .fetch_one(&self.connection_pool)
        .await
    }

    pub async fn unread_by_type(&self) -> Result<Vec<(String, i64)>, Error> {
        sqlx::query_as::<_, (String, i64)>(
            "SELECT CAST(type AS CHAR), COUNT(*) FROM admin_notifications \
             WHERE is_read = FALSE GROUP BY type",
        )
        .fetch_all(&self.connection_pool)
        .await
    }

    #[instrument(skip(self))]
    pub async fn mark_read(&self, id: i32) -> Result<u64, Error> {
        let result = sqlx::query(
            "UPDATE admin_notifications SET is_read = TRUE, read_at = COALESCE(read_at, NOW()) \
             WHERE id = ?",
        )
        .bind(id)
        .execute(&self.connection_pool)
        .await?;
        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    pub async fn mark_all_read(&self) -> Result<u64, Error> {
        let result = sqlx::query(
            "UPDATE admin_notifications SET is_read = TRUE, read_at = NOW() WHERE is_read = FALSE",
        )
        .execute(&self.connection_pool)
        .await?;
        Ok(result.rows_affected())
    }
}

impl Delete<i32> for AdminNotificationRepository {
    #[instrument(skip(self))]
    async fn delete(&self, id: &i32) -> Result<(), Error> {
        let result = sqlx::query("DELETE FROM admin_notifications WHERE id = ?")
            .bind(id)
            .execute(&self.connection_pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::RowNotFound);
        }
        Ok(())
    }
}
