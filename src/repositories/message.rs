//! MessageRepository - Messaggi, allegati, stato di lettura e notifiche di messaggio

use super::Read;
use crate::dtos::{
    MessageNotificationDTO, MessageRowDTO, NewAttachment, PageRequest, SearchResultDTO,
};
use crate::entities::{Attachment, Message, MessageType};
use sqlx::{Error, MySqlConnection, MySqlPool, QueryBuilder};
use tracing::{debug, info, instrument};

const MESSAGE_COLUMNS: &str = "id, conversation_id, sender_id, content, message_type, \
    parent_message_id, is_edited, is_deleted, created_at";

const ATTACHMENT_COLUMNS: &str =
    "id, message_id, filename, original_filename, file_path, file_size, mime_type, created_at";

// vista del messaggio con mittente, anteprima del padre e stato di lettura per l'utente (primo bind)
const MESSAGE_ROW_SELECT: &str = "SELECT m.id, m.conversation_id, m.content, m.message_type, \
    m.created_at, m.is_edited, m.edited_at, m.parent_message_id, \
    sender.id AS sender_id, CONCAT_WS(' ', sender.prenom, sender.nom) AS sender_name, \
    sender.role_id AS sender_role_id, \
    parent.content AS parent_content, \
    IF(parent.id IS NULL, NULL, CONCAT_WS(' ', parent_sender.prenom, parent_sender.nom)) AS parent_sender_name, \
    (mrs.message_id IS NOT NULL) AS is_read_by_user \
    FROM messages m \
    JOIN utilisateurs sender ON sender.id = m.sender_id \
    LEFT JOIN messages parent ON parent.id = m.parent_message_id \
    LEFT JOIN utilisateurs parent_sender ON parent_sender.id = parent.sender_id \
    LEFT JOIN message_read_status mrs ON mrs.message_id = m.id AND mrs.user_id = ?";

pub struct MessageRepository {
    connection_pool: MySqlPool,
}

impl MessageRepository {
    pub fn new(connection_pool: MySqlPool) -> Self {
        Self { connection_pool }
    }

    #[instrument(skip(self, conn, content))]
    pub async fn insert(
        &self,
        conn: &mut MySqlConnection,
        conversation_id: i32,
        sender_id: i32,
        content: &str,
        message_type: MessageType,
        parent_message_id: Option<i32>,
    ) -> Result<i32, Error> {
        let result = sqlx::query(
            "INSERT INTO messages (conversation_id, sender_id, content, message_type, parent_message_id) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(conversation_id)
        .bind(sender_id)
        .bind(content)
        .bind(message_type)
        .bind(parent_message_id)
        .execute(&mut *conn)
        .await?;
        let id = result.last_insert_id() as i32;
        info!("Message {} created in conversation {}", id, conversation_id);
        Ok(id)
    }

    pub async fn insert_attachment(
        &self,
        conn: &mut MySqlConnection,
        message_id: i32,
        file: &NewAttachment,
    ) -> Result<i32, Error> {
        let result = sqlx::query(
            "INSERT INTO message_attachments \
             (message_id, filename, original_filename, file_path, file_size, mime_type) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(message_id)
        .bind(&file.filename)
        .bind(&file.original_filename)
        .bind(&file.file_path)
        .bind(file.file_size)
        .bind(&file.mime_type)
        .execute(&mut *conn)
        .await?;
        Ok(result.last_insert_id() as i32)
    }

    pub async fn insert_notification(
        &self,
        conn: &mut MySqlConnection,
        user_id: i32,
        message_id: i32,
        conversation_id: i32,
    ) -> Result<(), Error> {
        sqlx::query(
            "INSERT INTO message_notifications (user_id, message_id, conversation_id) VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(message_id)
        .bind(conversation_id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Un messaggio padre deve appartenere alla stessa conversazione
    pub async fn belongs_to(&self, message_id: i32, conversation_id: i32) -> Result<bool, Error> {
        let found = sqlx::query_scalar::<_, i32>(
            "SELECT id FROM messages WHERE id = ? AND conversation_id = ?",
        )
        .bind(message_id)
        .bind(conversation_id)
        .fetch_optional(&self.connection_pool)
        .await?;
        Ok(found.is_some())
    }

    /// Pagina di messaggi non cancellati, dal più recente
    #[instrument(skip(self))]
    pub async fn page(
        &self,
        conversation_id: i32,
        user_id: i32,
        page: PageRequest,
    ) -> Result<Vec<MessageRowDTO>, Error> {
        let query = format!(
            "{MESSAGE_ROW_SELECT} WHERE m.conversation_id = ? AND m.is_deleted = FALSE \
             ORDER BY m.created_at DESC, m.id DESC LIMIT ? OFFSET ?"
        );
        sqlx::query_as::<_, MessageRowDTO>(&query)
            .bind(user_id)
            .bind(conversation_id)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.connection_pool)
            .await
    }

    /// Singolo messaggio nella vista usata dal client, per l'evento push
    pub async fn row(&self, message_id: i32, user_id: i32) -> Result<Option<MessageRowDTO>, Error> {
        let query = format!("{MESSAGE_ROW_SELECT} WHERE m.id = ?");
        sqlx::query_as::<_, MessageRowDTO>(&query)
            .bind(user_id)
            .bind(message_id)
            .fetch_optional(&self.connection_pool)
            .await
    }

    pub async fn attachments_for(&self, message_ids: &[i32]) -> Result<Vec<Attachment>, Error> {
        if message_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::new(format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM message_attachments WHERE message_id IN ("
        ));
        let mut separated = qb.separated(", ");
        for id in message_ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY id");
        qb.build_query_as::<Attachment>()
            .fetch_all(&self.connection_pool)
            .await
    }

    /// Segna come letti i messaggi indicati; le righe già presenti vengono ignorate
    #[instrument(skip(self, message_ids), fields(count = message_ids.len()))]
    pub async fn mark_read(&self, message_ids: &[i32], user_id: i32) -> Result<(), Error> {
        if message_ids.is_empty() {
            return Ok(());
        }
        let mut qb = QueryBuilder::new("INSERT IGNORE INTO message_read_status (message_id, user_id) ");
        qb.push_values(message_ids, |mut row, id| {
            row.push_bind(*id).push_bind(user_id);
        });
        qb.build().execute(&self.connection_pool).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn mark_conversation_read(&self, conversation_id: i32, user_id: i32) -> Result<u64, Error> {
        let result = sqlx::query(
            "INSERT IGNORE INTO message_read_status (message_id, user_id) \
             SELECT id, ? FROM messages \
             WHERE conversation_id = ? AND sender_id != ? AND is_deleted = FALSE",
        )
        .bind(user_id)
        .bind(conversation_id)
        .bind(user_id)
        .execute(&self.connection_pool)
        .await?;

        sqlx::query(
            "UPDATE message_notifications SET is_read = TRUE, read_at = NOW() \
             WHERE conversation_id = ? AND user_id = ? AND is_read = FALSE",
        )
        .bind(conversation_id)
        .bind(user_id)
        .execute(&self.connection_pool)
        .await?;

        debug!("Marked {} messages as read", result.rows_affected());
        Ok(result.rows_affected())
    }

    /// Soft delete, consentita solo al mittente
    #[instrument(skip(self))]
    pub async fn soft_delete(&self, id: i32, sender_id: i32) -> Result<u64, Error> {
        let result = sqlx::query(
            "UPDATE messages SET is_deleted = TRUE WHERE id = ? AND sender_id = ? AND is_deleted = FALSE",
        )
        .bind(id)
        .bind(sender_id)
        .execute(&self.connection_pool)
        .await?;
        Ok(result.rows_affected())
    }

    // ************** NOTIFICHE DI MESSAGGIO ************** //

    #[instrument(skip(self))]
    pub async fn notifications(&self, user_id: i32, limit: i64) -> Result<Vec<MessageNotificationDTO>, Error> {
        sqlx::query_as::<_, MessageNotificationDTO>(
            "SELECT mn.id, mn.conversation_id, mn.message_id, mn.created_at, mn.is_read, mn.read_at, \
             c.subject AS conversation_subject, m.content AS message_content, \
             CONCAT_WS(' ', sender.prenom, sender.nom) AS sender_name \
             FROM message_notifications mn \
             JOIN messages m ON m.id = mn.message_id \
             JOIN conversations c ON c.id = mn.conversation_id \
             JOIN utilisateurs sender ON sender.id = m.sender_id \
             WHERE mn.user_id = ? ORDER BY mn.created_at DESC, mn.id DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.connection_pool)
        .await
    }

    pub async fn unread_notifications(&self, user_id: i32) -> Result<i64, Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM message_notifications WHERE user_id = ? AND is_read = FALSE",
        )
        .bind(user_id)
        .fetch_one(&self.connection_pool)
        .await
    }

    pub async fn mark_notification_read(&self, id: i32, user_id: i32) -> Result<u64, Error> {
        let result = sqlx::query(
            "UPDATE message_notifications SET is_read = TRUE, read_at = NOW() \
             WHERE id = ? AND user_id = ?",
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.connection_pool)
        .await?;
        Ok(result.rows_affected())
    }

    // ************** RICERCA E ALLEGATI ************** //

    /// Ricerca limitata alle conversazioni di cui l'utente fa parte
    #[instrument(skip(self, term))]
    pub async fn search(
        &self,
        user_id: i32,
        term: &str,
        conversation_id: Option<i32>,
        page: PageRequest,
    ) -> Result<Vec<SearchResultDTO>, Error> {
        let mut qb = QueryBuilder::new(
            "SELECT m.id, m.content, m.created_at, m.conversation_id, \
             c.subject AS conversation_subject, \
             CONCAT_WS(' ', sender.prenom, sender.nom) AS sender_name \
             FROM messages m \
             JOIN conversations c ON c.id = m.conversation_id \
             JOIN conversation_participants cp ON cp.conversation_id = c.id \
             JOIN utilisateurs sender ON sender.id = m.sender_id \
             WHERE cp.user_id = ",
        );
        qb.push_bind(user_id)
            .push(" AND m.is_deleted = FALSE AND m.content LIKE ")
            .push_bind(format!("%{}%", term));
        if let Some(conversation_id) = conversation_id {
            qb.push(" AND m.conversation_id = ").push_bind(conversation_id);
        }
        qb.push(" ORDER BY m.created_at DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        qb.build_query_as::<SearchResultDTO>()
            .fetch_all(&self.connection_pool)
            .await
    }

    /// Allegato visibile all'utente solo se partecipa alla conversazione del messaggio
    #[instrument(skip(self))]
    pub async fn attachment_for_participant(
        &self,
        attachment_id: i32,
        user_id: i32,
    ) -> Result<Option<Attachment>, Error> {
        sqlx::query_as::<_, Attachment>(
            "SELECT att.id, att.message_id, att.filename, att.original_filename, att.file_path, \
             att.file_size, att.mime_type, att.created_at \
             FROM message_attachments att \
             JOIN messages m ON m.id = att.message_id \
             JOIN conversation_participants cp ON cp.conversation_id = m.conversation_id \
             WHERE att.id = ? AND cp.user_id = ?",
        )
        .bind(attachment_id)
        .bind(user_id)
        .fetch_optional(&self.connection_pool)
        .await
    }
}

impl Read<Message, i32> for MessageRepository {
    async fn read(&self, id: &i32) -> Result<Option<Message>, Error> {
        let query = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?");
        sqlx::query_as::<_, Message>(&query)
            .bind(id)
            .fetch_optional(&self.connection_pool)
            .await
    }
}
