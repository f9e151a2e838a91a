#![cfg(feature = "mysql-tests")]

mod common;

#[cfg(test)]
mod admin_tests {
    use super::common::*;
    use axum::http::HeaderName;
    use serde_json::{Value, json};
    use sqlx::MySqlPool;

    fn auth() -> HeaderName {
        HeaderName::from_static("authorization")
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_admin_routes_reject_other_roles(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        server
            .get("/api/admin/users")
            .add_header(auth(), bearer(&alice_token()))
            .await
            .assert_status_forbidden();
        server
            .get("/api/admin/dashboard")
            .add_header(auth(), bearer(&bob_token()))
            .await
            .assert_status_forbidden();
        server
            .get("/api/admin/dashboard")
            .await
            .assert_status_unauthorized();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "catalog")))]
    async fn test_list_users_with_filters(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        let all: Value = server
            .get("/api/admin/users")
            .add_header(auth(), bearer(&admin_token()))
            .await
            .json();
        assert_eq!(all["pagination"]["total"], 6);

        let suppliers: Value = server
            .get("/api/admin/users")
            .add_query_param("role_id", 2)
            .add_header(auth(), bearer(&admin_token()))
            .await
            .json();
        assert_eq!(suppliers["pagination"]["total"], 2);

        let suspended: Value = server
            .get("/api/admin/users")
            .add_query_param("statut", "suspendu")
            .add_header(auth(), bearer(&admin_token()))
            .await
            .json();
        assert_eq!(suspended["pagination"]["total"], 1);
        assert_eq!(suspended["users"][0]["suspension_reason"], "Spam");
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_suspend_and_reactivate_user(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool.clone()));

        server
            .patch("/api/admin/users/4/status")
            .add_header(auth(), bearer(&admin_token()))
            .json(&json!({ "statut": "suspendu", "reason": "Fraude au paiement" }))
            .await
            .assert_status_ok();

        // il token di Carol smette di funzionare
        let blocked = server
            .get("/api/notifications")
            .add_header(auth(), bearer(&carol_token()))
            .await;
        blocked.assert_status_forbidden();
        let body: Value = blocked.json();
        assert_eq!(body["details"], "Reason: Fraude au paiement");

        let (priority, category): (String, String) = sqlx::query_as(
            "SELECT CAST(priority AS CHAR), category FROM notifications WHERE utilisateur_id = 4 \
             ORDER BY id DESC LIMIT 1",
        )
        .fetch_one(&pool)
        .await?;
        assert_eq!(priority, "urgent");
        assert_eq!(category, "account_status");

        server
            .patch("/api/admin/users/4/status")
            .add_header(auth(), bearer(&admin_token()))
            .json(&json!({ "statut": "actif" }))
            .await
            .assert_status_ok();

        let reason: Option<String> =
            sqlx::query_scalar("SELECT suspension_reason FROM utilisateurs WHERE id = 4")
                .fetch_one(&pool)
                .await?;
        assert_eq!(reason, None);

        server
            .get("/api/notifications")
            .add_header(auth(), bearer(&carol_token()))
            .await
            .assert_status_ok();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_admin_cannot_suspend_self(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        server
            .patch("/api/admin/users/3/status")
            .add_header(auth(), bearer(&admin_token()))
            .json(&json!({ "statut": "suspendu" }))
            .await
            .assert_status_bad_request();

        server
            .patch("/api/admin/users/999/status")
            .add_header(auth(), bearer(&admin_token()))
            .json(&json!({ "statut": "inactif" }))
            .await
            .assert_status_not_found();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "catalog")))]
    async fn test_verify_entreprise(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool.clone()));

        server
            .patch("/api/admin/entreprises/2/verification")
            .add_header(auth(), bearer(&admin_token()))
            .json(&json!({ "statut": "en_attente" }))
            .await
            .assert_status_bad_request();

        server
            .patch("/api/admin/entreprises/2/verification")
            .add_header(auth(), bearer(&admin_token()))
            .json(&json!({ "statut": "verifie", "commentaire": "Documents conformes" }))
            .await
            .assert_status_ok();

        // ora è pubblica
        server.get("/api/entreprises/2").await.assert_status_ok();

        let notified: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE utilisateur_id = 6 AND category = 'verification_result'",
        )
        .fetch_one(&pool)
        .await?;
        assert_eq!(notified, 1);

        server
            .patch("/api/admin/entreprises/999/verification")
            .add_header(auth(), bearer(&admin_token()))
            .json(&json!({ "statut": "rejete" }))
            .await
            .assert_status_not_found();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "catalog", "reviews")))]
    async fn test_moderate_review_updates_rating(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        server
            .patch("/api/admin/reviews/2/moderate")
            .add_header(auth(), bearer(&admin_token()))
            .json(&json!({ "statut": "approuve" }))
            .await
            .assert_status_ok();

        let product: Value = server.get("/api/products/2").await.json();
        assert_eq!(product["note_moyenne"], 1.0);
        assert_eq!(product["nombre_avis"], 1);

        server
            .patch("/api/admin/reviews/1/moderate")
            .add_header(auth(), bearer(&admin_token()))
            .json(&json!({ "statut": "rejete", "raison_rejet": "Hors sujet" }))
            .await
            .assert_status_ok();

        let reviews: Value = server.get("/api/reviews/product/1").await.json();
        assert_eq!(reviews["pagination"]["total"], 0);

        server
            .patch("/api/admin/reviews/999/moderate")
            .add_header(auth(), bearer(&admin_token()))
            .json(&json!({ "statut": "approuve" }))
            .await
            .assert_status_not_found();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "catalog", "reviews")))]
    async fn test_review_reports_queue(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        server
            .post("/api/reviews/1/report")
            .add_header(auth(), bearer(&alice_token()))
            .json(&json!({ "raison": "inapproprie" }))
            .await
            .assert_status(axum::http::StatusCode::CREATED);

        let pending: Value = server
            .get("/api/admin/reviews/reports")
            .add_header(auth(), bearer(&admin_token()))
            .await
            .json();
        assert_eq!(pending["total"], 1);
        assert_eq!(pending["reports"][0]["produit_nom"], "Huile de palme 5L");
        assert_eq!(pending["reports"][0]["signale_par"], "alice@example.com");

        let handled: Value = server
            .get("/api/admin/reviews/reports")
            .add_query_param("statut", "traite")
            .add_header(auth(), bearer(&admin_token()))
            .await
            .json();
        assert_eq!(handled["total"], 0);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "notifications")))]
    async fn test_admin_notifications(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        let list: Value = server
            .get("/api/admin/notifications")
            .add_query_param("unread_only", true)
            .add_header(auth(), bearer(&admin_token()))
            .await
            .json();
        assert_eq!(list["pagination"]["total"], 2);

        let counts: Value = server
            .get("/api/admin/notifications/counts")
            .add_header(auth(), bearer(&admin_token()))
            .await
            .json();
        assert_eq!(counts["total"], 3);
        assert_eq!(counts["unread"], 2);
        assert_eq!(counts["urgent"], 1);
        assert_eq!(counts["by_type"]["product_management"], 1);

        server
            .patch("/api/admin/notifications/1/read")
            .add_header(auth(), bearer(&admin_token()))
            .await
            .assert_status_ok();
        server
            .patch("/api/admin/notifications/999/read")
            .add_header(auth(), bearer(&admin_token()))
            .await
            .assert_status_not_found();

        let all: Value = server
            .patch("/api/admin/notifications/read-all")
            .add_header(auth(), bearer(&admin_token()))
            .await
            .json();
        assert_eq!(all["updated"], 1);

        server
            .delete("/api/admin/notifications/3")
            .add_header(auth(), bearer(&admin_token()))
            .await
            .assert_status_ok();
        server
            .delete("/api/admin/notifications/3")
            .add_header(auth(), bearer(&admin_token()))
            .await
            .assert_status_not_found();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "catalog", "reviews", "notifications")))]
    async fn test_dashboard(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        let response = server
            .get("/api/admin/dashboard")
            .add_header(auth(), bearer(&admin_token()))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["users"]["total"], 6);
        assert_eq!(body["users"]["byRole"]["acheteur"], 3);
        assert_eq!(body["users"]["byRole"]["fournisseur"], 2);
        assert_eq!(body["products"]["byStatus"]["actif"], 3);
        assert_eq!(body["products"]["byStatus"]["brouillon"], 1);
        assert_eq!(body["pendingVerifications"], 1);
        assert_eq!(body["pendingReviews"], 1);
        assert_eq!(body["notifications"]["unread"], 2);
        assert_eq!(body["notifications"]["urgent"], 1);
        assert_eq!(body["onlineUsers"], 0);
        Ok(())
    }
}
