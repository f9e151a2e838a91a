#![cfg(feature = "mysql-tests")]

mod common;

#[cfg(test)]
mod notification_tests {
    use super::common::*;
    use axum::http::HeaderName;
    use serde_json::Value;
    use sqlx::MySqlPool;

    fn auth() -> HeaderName {
        HeaderName::from_static("authorization")
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "notifications")))]
    async fn test_list_notifications(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        let response = server
            .get("/api/notifications")
            .add_header(auth(), bearer(&alice_token()))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["pagination"]["total"], 3);
        assert_eq!(body["unreadCount"], 2);

        let unread: Value = server
            .get("/api/notifications")
            .add_query_param("unread_only", true)
            .add_header(auth(), bearer(&alice_token()))
            .await
            .json();
        assert_eq!(unread["pagination"]["total"], 2);

        let by_category: Value = server
            .get("/api/notifications")
            .add_query_param("category", "review_response")
            .add_header(auth(), bearer(&alice_token()))
            .await
            .json();
        assert_eq!(by_category["pagination"]["total"], 1);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "notifications")))]
    async fn test_notification_counts(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        let response = server
            .get("/api/notifications/counts")
            .add_header(auth(), bearer(&alice_token()))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["total"], 3);
        assert_eq!(body["unread"], 2);
        assert_eq!(body["by_category"]["general"], 1);
        assert_eq!(body["by_category"]["review_response"], 1);
        assert_eq!(body["by_priority"]["high"], 1);
        assert_eq!(body["by_priority"]["medium"], 1);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "notifications")))]
    async fn test_mark_read_only_own_notifications(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        server
            .patch("/api/notifications/2/read")
            .add_header(auth(), bearer(&alice_token()))
            .await
            .assert_status_ok();

        // notifica di Carol
        server
            .patch("/api/notifications/4/read")
            .add_header(auth(), bearer(&alice_token()))
            .await
            .assert_status_not_found();

        let counts: Value = server
            .get("/api/notifications/counts")
            .add_header(auth(), bearer(&alice_token()))
            .await
            .json();
        assert_eq!(counts["unread"], 1);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "notifications")))]
    async fn test_mark_all_read(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        let response = server
            .patch("/api/notifications/read-all")
            .add_header(auth(), bearer(&alice_token()))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["updated"], 2);

        // quelle di Carol non cambiano
        let carol: Value = server
            .get("/api/notifications/counts")
            .add_header(auth(), bearer(&carol_token()))
            .await
            .json();
        assert_eq!(carol["unread"], 1);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "notifications")))]
    async fn test_delete_notification(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        server
            .delete("/api/notifications/1")
            .add_header(auth(), bearer(&alice_token()))
            .await
            .assert_status_ok();
        server
            .delete("/api/notifications/1")
            .add_header(auth(), bearer(&alice_token()))
            .await
            .assert_status_not_found();
        server
            .delete("/api/notifications/4")
            .add_header(auth(), bearer(&alice_token()))
            .await
            .assert_status_not_found();
        Ok(())
    }
}
