#![cfg(feature = "mysql-tests")]

mod common;

#[cfg(test)]
mod messaging_tests {
    use super::common::*;
    use axum::http::{HeaderName, StatusCode};
    use axum_test::multipart::{MultipartForm, Part};
    use serde_json::{Value, json};
    use sqlx::MySqlPool;

    fn auth() -> HeaderName {
        HeaderName::from_static("authorization")
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "messaging")))]
    async fn test_list_conversations_with_unread(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        let response = server
            .get("/api/messages/conversations")
            .add_header(auth(), bearer(&alice_token()))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["pagination"]["total"], 1);
        let conversation = &body["conversations"][0];
        assert_eq!(conversation["id"], 1);
        assert_eq!(conversation["unread_count"], 2);
        assert_eq!(conversation["last_message_content"], "Voici le devis");
        assert_eq!(conversation["participants"], "Bob Durand");

        let filtered: Value = server
            .get("/api/messages/conversations")
            .add_query_param("search", "introuvable")
            .add_header(auth(), bearer(&alice_token()))
            .await
            .json();
        assert_eq!(filtered["pagination"]["total"], 0);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "messaging")))]
    async fn test_create_conversation(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool.clone()));

        let response = server
            .post("/api/messages/conversations")
            .add_header(auth(), bearer(&alice_token()))
            .json(&json!({
                "participants": [2, 4, 2],
                "subject": "Achat groupé",
                "initialMessage": "On commande ensemble ?"
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        let conversation_id = body["conversationId"].as_i64().unwrap();

        let kind: String = sqlx::query_scalar("SELECT CAST(type AS CHAR) FROM conversations WHERE id = ?")
            .bind(conversation_id)
            .fetch_one(&pool)
            .await?;
        assert_eq!(kind, "group");

        let members: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM conversation_participants WHERE conversation_id = ?",
        )
        .bind(conversation_id)
        .fetch_one(&pool)
        .await?;
        assert_eq!(members, 3);

        let message_notifications: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM message_notifications WHERE conversation_id = ?",
        )
        .bind(conversation_id)
        .fetch_one(&pool)
        .await?;
        assert_eq!(message_notifications, 2);

        let user_notifications: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE category = 'conversation_created' \
             AND related_conversation_id = ?",
        )
        .bind(conversation_id)
        .fetch_one(&pool)
        .await?;
        assert_eq!(user_notifications, 2);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "messaging")))]
    async fn test_create_conversation_rejections(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        for payload in [
            json!({ "participants": [], "initialMessage": "Bonjour" }),
            json!({ "participants": [2], "initialMessage": "   " }),
            json!({ "participants": [1], "initialMessage": "Moi-même" }),
            json!({ "participants": [2, 999], "initialMessage": "Bonjour" }),
        ] {
            server
                .post("/api/messages/conversations")
                .add_header(auth(), bearer(&alice_token()))
                .json(&payload)
                .await
                .assert_status_bad_request();
        }
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "messaging")))]
    async fn test_conversation_detail_access(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        let response = server
            .get("/api/messages/conversations/1")
            .add_header(auth(), bearer(&bob_token()))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["conversation"]["subject"], "Commande huile");
        assert_eq!(body["participants"].as_array().map(Vec::len), Some(2));

        server
            .get("/api/messages/conversations/1")
            .add_header(auth(), bearer(&carol_token()))
            .await
            .assert_status_forbidden();
        server
            .get("/api/messages/conversations/999")
            .add_header(auth(), bearer(&carol_token()))
            .await
            .assert_status_not_found();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "messaging")))]
    async fn test_get_messages_marks_read(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool.clone()));

        let response = server
            .get("/api/messages/conversations/1/messages")
            .add_header(auth(), bearer(&alice_token()))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        // ordine cronologico
        assert_eq!(messages[0]["id"], 1);
        assert_eq!(messages[2]["id"], 3);
        assert_eq!(messages[2]["attachments"][0]["original_filename"], "devis.pdf");
        assert_eq!(body["pagination"]["limit"], 50);

        let read_rows: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM message_read_status WHERE user_id = 1",
        )
        .fetch_one(&pool)
        .await?;
        assert!(read_rows >= 2);

        let summary: Value = server
            .get("/api/messages/conversations")
            .add_header(auth(), bearer(&alice_token()))
            .await
            .json();
        assert_eq!(summary["conversations"][0]["unread_count"], 0);

        server
            .get("/api/messages/conversations/2/messages")
            .add_header(auth(), bearer(&alice_token()))
            .await
            .assert_status_forbidden();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "messaging")))]
    async fn test_send_text_message(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state_with_uploads(pool.clone()));

        let form = MultipartForm::new()
            .add_text("content", "Je confirme la commande")
            .add_text("parentMessageId", "2");
        let response = server
            .post("/api/messages/conversations/1/messages")
            .add_header(auth(), bearer(&alice_token()))
            .multipart(form)
            .await;

        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        let message_id = body["messageId"].as_i64().unwrap();

        let (kind, parent): (String, Option<i32>) = sqlx::query_as(
            "SELECT CAST(message_type AS CHAR), parent_message_id FROM messages WHERE id = ?",
        )
        .bind(message_id)
        .fetch_one(&pool)
        .await?;
        assert_eq!(kind, "text");
        assert_eq!(parent, Some(2));

        let notified: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE utilisateur_id = 2 AND category = 'new_message'",
        )
        .fetch_one(&pool)
        .await?;
        assert_eq!(notified, 1);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "messaging")))]
    async fn test_send_message_rejections(pool: MySqlPool) -> sqlx::Result<()> {
        use marketplace::services::messaging::MAX_ATTACHMENT_BYTES;

        let server = create_test_server(create_test_state_with_uploads(pool.clone()));

        // contenuto vuoto
        server
            .post("/api/messages/conversations/1/messages")
            .add_header(auth(), bearer(&alice_token()))
            .multipart(MultipartForm::new().add_text("content", "  "))
            .await
            .assert_status_bad_request();

        // parent di un'altra conversazione
        server
            .post("/api/messages/conversations/1/messages")
            .add_header(auth(), bearer(&alice_token()))
            .multipart(
                MultipartForm::new()
                    .add_text("content", "Réponse")
                    .add_text("parentMessageId", "4"),
            )
            .await
            .assert_status_bad_request();

        // tipo di file non ammesso
        let exe = Part::bytes(vec![0u8; 16])
            .file_name("virus.exe")
            .mime_type("application/octet-stream");
        server
            .post("/api/messages/conversations/1/messages")
            .add_header(auth(), bearer(&alice_token()))
            .multipart(
                MultipartForm::new()
                    .add_text("content", "Pièce jointe")
                    .add_part("attachments", exe),
            )
            .await
            .assert_status_bad_request();

        // allegato oltre i 10 MB
        let oversized = Part::bytes(vec![0u8; MAX_ATTACHMENT_BYTES + 1])
            .file_name("catalogue.pdf")
            .mime_type("application/pdf");
        let response = server
            .post("/api/messages/conversations/1/messages")
            .add_header(auth(), bearer(&alice_token()))
            .multipart(
                MultipartForm::new()
                    .add_text("content", "Catalogue complet")
                    .add_part("attachments", oversized),
            )
            .await;
        response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
        let body: Value = response.json();
        assert_eq!(body["error"], "File too large");

        // non partecipante
        server
            .post("/api/messages/conversations/1/messages")
            .add_header(auth(), bearer(&carol_token()))
            .multipart(MultipartForm::new().add_text("content", "Intrusion"))
            .await
            .assert_status_forbidden();

        // conversazione inesistente
        server
            .post("/api/messages/conversations/999/messages")
            .add_header(auth(), bearer(&alice_token()))
            .multipart(MultipartForm::new().add_text("content", "Allô ?"))
            .await
            .assert_status_not_found();

        let stored: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE conversation_id = 1")
                .fetch_one(&pool)
                .await?;
        assert_eq!(stored, 3);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "messaging")))]
    async fn test_too_many_attachments(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state_with_uploads(pool));

        let mut form = MultipartForm::new().add_text("content", "Photos");
        for i in 0..6 {
            form = form.add_part(
                "attachments",
                Part::bytes(vec![1u8; 8])
                    .file_name(format!("photo-{}.png", i))
                    .mime_type("image/png"),
            );
        }

        server
            .post("/api/messages/conversations/1/messages")
            .add_header(auth(), bearer(&alice_token()))
            .multipart(form)
            .await
            .assert_status_bad_request();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "messaging")))]
    async fn test_upload_and_download_attachment(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state_with_uploads(pool.clone()));
        let png = vec![0x89, b'P', b'N', b'G', 1, 2, 3, 4];

        let form = MultipartForm::new().add_text("content", "Photo du lot").add_part(
            "attachments",
            Part::bytes(png.clone())
                .file_name("lot.PNG")
                .mime_type("image/png"),
        );
        let response = server
            .post("/api/messages/conversations/1/messages")
            .add_header(auth(), bearer(&alice_token()))
            .multipart(form)
            .await;
        response.assert_status(StatusCode::CREATED);
        let message_id = response.json::<Value>()["messageId"].as_i64().unwrap();

        let (attachment_id, filename, kind): (i32, String, String) = sqlx::query_as(
            "SELECT a.id, a.filename, CAST(m.message_type AS CHAR) FROM message_attachments a \
             JOIN messages m ON m.id = a.message_id WHERE a.message_id = ?",
        )
        .bind(message_id)
        .fetch_one(&pool)
        .await?;
        assert!(filename.ends_with(".png"));
        assert_eq!(kind, "file");

        let download = server
            .get(&format!("/api/messages/attachments/{}", attachment_id))
            .add_header(auth(), bearer(&bob_token()))
            .await;
        download.assert_status_ok();
        assert_eq!(download.header("content-type"), "image/png");
        assert_eq!(
            download.header("content-disposition"),
            "attachment; filename=\"lot.PNG\""
        );
        assert_eq!(download.as_bytes().to_vec(), png);

        // chi non partecipa non distingue un file esistente da uno assente
        server
            .get(&format!("/api/messages/attachments/{}", attachment_id))
            .add_header(auth(), bearer(&carol_token()))
            .await
            .assert_status_not_found();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "messaging")))]
    async fn test_missing_file_on_disk(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        let response = server
            .get("/api/messages/attachments/1")
            .add_header(auth(), bearer(&alice_token()))
            .await;

        response.assert_status_not_found();
        let body: Value = response.json();
        assert_eq!(body["error"], "Physical file not found");
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "messaging")))]
    async fn test_muted_recipient_gets_no_user_notification(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state_with_uploads(pool.clone()));

        server
            .patch("/api/messages/conversations/1/mute")
            .add_header(auth(), bearer(&bob_token()))
            .json(&json!({ "muted": true }))
            .await
            .assert_status_ok();

        server
            .post("/api/messages/conversations/1/messages")
            .add_header(auth(), bearer(&alice_token()))
            .multipart(MultipartForm::new().add_text("content", "Vous êtes là ?"))
            .await
            .assert_status(StatusCode::CREATED);

        let user_notifications: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE utilisateur_id = 2 AND category = 'new_message'",
        )
        .fetch_one(&pool)
        .await?;
        assert_eq!(user_notifications, 0);

        // la notifica di messaggio resta
        let message_notifications: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM message_notifications WHERE user_id = 2",
        )
        .fetch_one(&pool)
        .await?;
        assert_eq!(message_notifications, 1);

        server
            .patch("/api/messages/conversations/2/mute")
            .add_header(auth(), bearer(&bob_token()))
            .json(&json!({ "muted": true }))
            .await
            .assert_status_forbidden();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "messaging")))]
    async fn test_mark_conversation_read(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        let response = server
            .patch("/api/messages/conversations/1/read")
            .add_header(auth(), bearer(&alice_token()))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["marked"], 2);

        server
            .patch("/api/messages/conversations/1/read")
            .add_header(auth(), bearer(&carol_token()))
            .await
            .assert_status_forbidden();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "messaging")))]
    async fn test_delete_message(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        server
            .delete("/api/messages/messages/2")
            .add_header(auth(), bearer(&alice_token()))
            .await
            .assert_status_forbidden();

        server
            .delete("/api/messages/messages/1")
            .add_header(auth(), bearer(&alice_token()))
            .await
            .assert_status_ok();

        server
            .delete("/api/messages/messages/1")
            .add_header(auth(), bearer(&alice_token()))
            .await
            .assert_status_not_found();

        let body: Value = server
            .get("/api/messages/conversations/1/messages")
            .add_header(auth(), bearer(&alice_token()))
            .await
            .json();
        assert_eq!(body["messages"].as_array().map(Vec::len), Some(2));
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "messaging")))]
    async fn test_message_notifications(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        let response = server
            .get("/api/messages/notifications")
            .add_header(auth(), bearer(&alice_token()))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["unreadCount"], 2);
        let first_id = body["notifications"][0]["id"].as_i64().unwrap();

        server
            .patch(&format!("/api/messages/notifications/{}/read", first_id))
            .add_header(auth(), bearer(&alice_token()))
            .await
            .assert_status_ok();

        // la notifica di un altro utente non è raggiungibile
        server
            .patch(&format!("/api/messages/notifications/{}/read", first_id))
            .add_header(auth(), bearer(&bob_token()))
            .await
            .assert_status_not_found();

        let body: Value = server
            .get("/api/messages/notifications")
            .add_header(auth(), bearer(&alice_token()))
            .await
            .json();
        assert_eq!(body["unreadCount"], 1);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "messaging")))]
    async fn test_search_messages(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        server
            .get("/api/messages/search")
            .add_query_param("q", "a")
            .add_header(auth(), bearer(&alice_token()))
            .await
            .assert_status_bad_request();

        let body: Value = server
            .get("/api/messages/search")
            .add_query_param("q", "devis")
            .add_header(auth(), bearer(&alice_token()))
            .await
            .json();
        assert_eq!(body["results"].as_array().map(Vec::len), Some(1));
        assert_eq!(body["results"][0]["sender_name"], "Bob Durand");

        // i messaggi delle conversazioni altrui restano invisibili
        let body: Value = server
            .get("/api/messages/search")
            .add_query_param("q", "pagnes")
            .add_header(auth(), bearer(&alice_token()))
            .await
            .json();
        assert_eq!(body["results"].as_array().map(Vec::len), Some(0));
        Ok(())
    }
}
