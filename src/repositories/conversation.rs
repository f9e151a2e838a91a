//! ConversationRepository - Conversazioni e partecipanti

use super::Read;
use crate::dtos::{ConversationSummaryDTO, ConversationWithCreatorDTO, PageRequest, ParticipantDTO};
use crate::entities::{Conversation, ConversationType, Participant};
use sqlx::{Error, MySql, MySqlConnection, MySqlPool, QueryBuilder};
use tracing::{debug, info, instrument};

const CONVERSATION_COLUMNS: &str = "id, type, subject, created_by, created_at, updated_at";
const PARTICIPANT_COLUMNS: &str = "conversation_id, user_id, joined_at, last_read_at, is_muted";

pub struct ConversationRepository {
    connection_pool: MySqlPool,
}

impl ConversationRepository {
    pub fn new(connection_pool: MySqlPool) -> Self {
        Self { connection_pool }
    }

    /// Conversazioni dell'utente ordinate per ultima attività, con il totale per la paginazione
    #[instrument(skip(self, search))]
    pub async fn list_for_user(
        &self,
        user_id: i32,
        search: Option<&str>,
        page: PageRequest,
    ) -> Result<(Vec<ConversationSummaryDTO>, i64), Error> {
        fn push_filters<'a>(qb: &mut QueryBuilder<'a, MySql>, search: Option<&'a str>) {
            if let Some(term) = search.map(str::trim).filter(|s| !s.is_empty()) {
                let pattern = format!("%{}%", term);
                qb.push(" AND (c.subject LIKE ")
                    .push_bind(pattern.clone())
                    .push(
                        " OR EXISTS (SELECT 1 FROM messages ms \
                         WHERE ms.conversation_id = c.id AND ms.content LIKE ",
                    )
                    .push_bind(pattern)
                    .push("))");
            }
        }

        let mut count_qb = QueryBuilder::new(
            "SELECT COUNT(*) FROM conversations c \
             JOIN conversation_participants cp ON cp.conversation_id = c.id AND cp.user_id = ",
        );
        count_qb.push_bind(user_id).push(" WHERE 1 = 1");
        push_filters(&mut count_qb, search);
        let total = count_qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.connection_pool)
            .await?;

        let mut qb = QueryBuilder::new(
            "SELECT c.id, c.type, c.subject, c.created_at, c.updated_at, \
             cp.last_read_at, cp.is_muted, \
             lm.content AS last_message_content, lm.created_at AS last_message_at, \
             lm.message_type AS last_message_type, \
             IF(sender.id IS NULL, NULL, CONCAT_WS(' ', sender.prenom, sender.nom)) AS last_sender_name, \
             (SELECT COUNT(*) FROM messages m2 WHERE m2.conversation_id = c.id \
                AND m2.created_at > COALESCE(cp.last_read_at, '1970-01-01') \
                AND m2.sender_id != cp.user_id AND m2.is_deleted = FALSE) AS unread_count, \
             (SELECT GROUP_CONCAT(CONCAT_WS(' ', u.prenom, u.nom) ORDER BY u.nom SEPARATOR ', ') \
                FROM conversation_participants cp2 JOIN utilisateurs u ON u.id = cp2.user_id \
                WHERE cp2.conversation_id = c.id AND cp2.user_id != cp.user_id) AS participants \
             FROM conversations c \
             JOIN conversation_participants cp ON cp.conversation_id = c.id AND cp.user_id = ",
        );
        qb.push_bind(user_id).push(
            " LEFT JOIN messages lm ON lm.id = (SELECT MAX(id) FROM messages \
               WHERE conversation_id = c.id AND is_deleted = FALSE) \
             LEFT JOIN utilisateurs sender ON sender.id = lm.sender_id \
             WHERE 1 = 1",
        );
        push_filters(&mut qb, search);
        qb.push(" ORDER BY COALESCE(lm.created_at, c.created_at) DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = qb
            .build_query_as::<ConversationSummaryDTO>()
            .fetch_all(&self.connection_pool)
            .await?;
        debug!("Found {} conversations out of {}", rows.len(), total);
        Ok((rows, total))
    }

    #[instrument(skip(self, conn, subject))]
    pub async fn insert(
        &self,
        conn: &mut MySqlConnection,
        created_by: i32,
        subject: &str,
        conversation_type: ConversationType,
    ) -> Result<i32, Error> {
        let result =
            sqlx::query("INSERT INTO conversations (subject, created_by, type) VALUES (?, ?, ?)")
                .bind(subject)
                .bind(created_by)
                .bind(conversation_type)
                .execute(&mut *conn)
                .await?;
        let id = result.last_insert_id() as i32;
        info!("Conversation created with id {}", id);
        Ok(id)
    }

    pub async fn add_participant(
        &self,
        conn: &mut MySqlConnection,
        conversation_id: i32,
        user_id: i32,
    ) -> Result<(), Error> {
        sqlx::query("INSERT INTO conversation_participants (conversation_id, user_id) VALUES (?, ?)")
            .bind(conversation_id)
            .bind(user_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn is_participant(&self, conversation_id: i32, user_id: i32) -> Result<bool, Error> {
        Ok(self.participant(conversation_id, user_id).await?.is_some())
    }

    pub async fn participant(
        &self,
        conversation_id: i32,
        user_id: i32,
    ) -> Result<Option<Participant>, Error> {
        let query = format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM conversation_participants \
             WHERE conversation_id = ? AND user_id = ?"
        );
        sqlx::query_as::<_, Participant>(&query)
            .bind(conversation_id)
            .bind(user_id)
            .fetch_optional(&self.connection_pool)
            .await
    }

    /// Partecipanti diversi da `user_id`, letti dentro la transazione dell'invio
    pub async fn other_participants(
        &self,
        conn: &mut MySqlConnection,
        conversation_id: i32,
        user_id: i32,
    ) -> Result<Vec<Participant>, Error> {
        let query = format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM conversation_participants \
             WHERE conversation_id = ? AND user_id != ?"
        );
        sqlx::query_as::<_, Participant>(&query)
            .bind(conversation_id)
            .bind(user_id)
            .fetch_all(&mut *conn)
            .await
    }

    #[instrument(skip(self))]
    pub async fn detail(&self, id: i32) -> Result<Option<ConversationWithCreatorDTO>, Error> {
        sqlx::query_as::<_, ConversationWithCreatorDTO>(
            "SELECT c.id, c.type, c.subject, c.created_by, c.created_at, c.updated_at, \
             CONCAT_WS(' ', creator.prenom, creator.nom) AS created_by_name \
             FROM conversations c \
             LEFT JOIN utilisateurs creator ON creator.id = c.created_by \
             WHERE c.id = ?",
        )
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
    }

    pub async fn participants(&self, id: i32) -> Result<Vec<ParticipantDTO>, Error> {
        sqlx::query_as::<_, ParticipantDTO>(
            "SELECT u.id, u.nom, u.prenom, u.email, r.nom AS role_nom, \
             cp.joined_at, cp.last_read_at, cp.is_muted \
             FROM conversation_participants cp \
             JOIN utilisateurs u ON u.id = cp.user_id \
             LEFT JOIN roles r ON r.id = u.role_id \
             WHERE cp.conversation_id = ? ORDER BY u.nom, u.prenom",
        )
        .bind(id)
        .fetch_all(&self.connection_pool)
        .await
    }

    pub async fn touch(&self, conn: &mut MySqlConnection, id: i32) -> Result<(), Error> {
        sqlx::query("UPDATE conversations SET updated_at = NOW() WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    pub async fn touch_last_read(&self, conversation_id: i32, user_id: i32) -> Result<(), Error> {
        sqlx::query(
            "UPDATE conversation_participants SET last_read_at = NOW() \
             WHERE conversation_id = ? AND user_id = ?",
        )
        .bind(conversation_id)
        .bind(user_id)
        .execute(&self.connection_pool)
        .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn set_muted(&self, conversation_id: i32, user_id: i32, muted: bool) -> Result<u64, Error> {
        let result = sqlx::query(
            "UPDATE conversation_participants SET is_muted = ? \
             WHERE conversation_id = ? AND user_id = ?",
        )
        .bind(muted)
        .bind(conversation_id)
        .bind(user_id)
        .execute(&self.connection_pool)
        .await?;
        Ok(result.rows_affected())
    }
}

impl Read<Conversation, i32> for ConversationRepository {
    async fn read(&self, id: &i32) -> Result<Option<Conversation>, Error> {
        let query = format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?");
        sqlx::query_as::<_, Conversation>(&query)
            .bind(id)
            .fetch_optional(&self.connection_pool)
            .await
    }
}
