#![cfg(feature = "mysql-tests")]

mod common;

#[cfg(test)]
mod auth_tests {
    use super::common::*;
    use axum::http::{HeaderName, StatusCode};
    use serde_json::{Value, json};
    use sqlx::MySqlPool;

    async fn register(server: &axum_test::TestServer, email: &str, password: &str) -> Value {
        let response = server
            .post("/api/auth/register")
            .json(&json!({
                "email": email,
                "mot_de_passe": password,
                "nom": "Mba",
                "prenom": "Franck"
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json()
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_register_then_login(pool: MySqlPool) -> sqlx::Result<()> {
        let state = create_test_state(pool.clone());
        let server = create_test_server(state);

        let body = register(&server, "franck@example.com", "secret123").await;
        assert_eq!(body["user"]["email"], "franck@example.com");
        assert_eq!(body["user"]["role_id"], 1);
        assert!(body["token"].as_str().is_some());

        let response = server
            .post("/api/auth/login")
            .json(&json!({ "email": "franck@example.com", "mot_de_passe": "secret123" }))
            .await;
        response.assert_status_ok();
        let login: Value = response.json();
        assert_eq!(login["message"], "Login successful");

        // la registrazione avvisa gli admin
        let admin_rows: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM admin_notifications WHERE category = 'new_user'",
        )
        .fetch_one(&pool)
        .await?;
        assert_eq!(admin_rows, 1);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_register_duplicate_email(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        let response = server
            .post("/api/auth/register")
            .json(&json!({
                "email": "alice@example.com",
                "mot_de_passe": "secret123",
                "nom": "Other"
            }))
            .await;

        response.assert_status_bad_request();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "catalog")))]
    async fn test_register_supplier_creates_enterprise(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool.clone()));

        let response = server
            .post("/api/auth/register")
            .json(&json!({
                "email": "supplier@example.com",
                "mot_de_passe": "secret123",
                "nom": "Ndong",
                "role_id": 2,
                "entreprise": {
                    "nom_entreprise": "Ndong Bois",
                    "secteur_activite_id": 1,
                    "ville": "Oyem"
                }
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        assert!(body["user"]["entreprise_id"].is_i64());

        let statut: String = sqlx::query_scalar(
            "SELECT CAST(statut_verification AS CHAR) FROM entreprises WHERE nom_entreprise = 'Ndong Bois'",
        )
        .fetch_one(&pool)
        .await?;
        assert_eq!(statut, "en_attente");
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_login_wrong_password(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));
        register(&server, "franck@example.com", "secret123").await;

        let response = server
            .post("/api/auth/login")
            .json(&json!({ "email": "franck@example.com", "mot_de_passe": "wrong-one" }))
            .await;

        response.assert_status_unauthorized();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_login_unknown_email(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        let response = server
            .post("/api/auth/login")
            .json(&json!({ "email": "ghost@example.com", "mot_de_passe": "whatever" }))
            .await;

        response.assert_status_unauthorized();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_login_suspended_account(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool.clone()));
        register(&server, "franck@example.com", "secret123").await;
        sqlx::query(
            "UPDATE utilisateurs SET statut = 'suspendu', suspension_reason = 'Fraude' \
             WHERE email = 'franck@example.com'",
        )
        .execute(&pool)
        .await?;

        let response = server
            .post("/api/auth/login")
            .json(&json!({ "email": "franck@example.com", "mot_de_passe": "secret123" }))
            .await;

        response.assert_status_forbidden();
        let body: Value = response.json();
        assert_eq!(body["suspended"], true);
        assert_eq!(body["details"], "Reason: Fraude");
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_suspended_token_is_rejected(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        let response = server
            .get("/api/auth/me")
            .add_header(HeaderName::from_static("authorization"), bearer(&dave_token()))
            .await;

        response.assert_status_forbidden();
        let body: Value = response.json();
        assert_eq!(body["error"], "Account suspended");
        assert_eq!(body["suspended"], true);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_token_for_deleted_user(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));
        let token = create_test_jwt(999, "ghost@example.com", ACHETEUR);

        let response = server
            .get("/api/auth/me")
            .add_header(HeaderName::from_static("authorization"), bearer(&token))
            .await;

        response.assert_status_unauthorized();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "catalog")))]
    async fn test_me_returns_profile_with_enterprise(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        let response = server
            .get("/api/auth/me")
            .add_header(HeaderName::from_static("authorization"), bearer(&bob_token()))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["email"], "bob@example.com");
        assert_eq!(body["role"], "fournisseur");
        assert_eq!(body["entreprise"]["nom_entreprise"], "Durand Export");
        assert!(body.get("mot_de_passe").is_none());
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_profile_lists_default_address_first(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        let response = server
            .get("/api/users/profile")
            .add_header(HeaderName::from_static("authorization"), bearer(&alice_token()))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert!(body["entreprise"].is_null());
        assert_eq!(body["adresses"].as_array().map(Vec::len), Some(2));
        assert_eq!(body["adresses"][0]["ville"], "Libreville");
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_update_profile(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        let response = server
            .put("/api/users/profile")
            .add_header(HeaderName::from_static("authorization"), bearer(&alice_token()))
            .json(&json!({ "telephone": "+241 01 02 03 04" }))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["telephone"], "+241 01 02 03 04");
        assert_eq!(body["nom"], "Martin");
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_change_password(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));
        let registered = register(&server, "franck@example.com", "secret123").await;
        let token = registered["token"].as_str().unwrap_or_default().to_string();

        let wrong = server
            .put("/api/users/password")
            .add_header(HeaderName::from_static("authorization"), bearer(&token))
            .json(&json!({ "current_password": "nope", "new_password": "another123" }))
            .await;
        wrong.assert_status_bad_request();

        let ok = server
            .put("/api/users/password")
            .add_header(HeaderName::from_static("authorization"), bearer(&token))
            .json(&json!({ "current_password": "secret123", "new_password": "another123" }))
            .await;
        ok.assert_status_ok();

        let login = server
            .post("/api/auth/login")
            .json(&json!({ "email": "franck@example.com", "mot_de_passe": "another123" }))
            .await;
        login.assert_status_ok();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "catalog")))]
    async fn test_favorites_flow(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));
        let auth = bearer(&alice_token());

        let added = server
            .post("/api/users/favorites")
            .add_header(HeaderName::from_static("authorization"), auth.clone())
            .json(&json!({ "produit_id": 1 }))
            .await;
        added.assert_status(StatusCode::CREATED);

        // ripetere l'aggiunta non duplica né riconta
        server
            .post("/api/users/favorites")
            .add_header(HeaderName::from_static("authorization"), auth.clone())
            .json(&json!({ "produit_id": 1 }))
            .await
            .assert_status(StatusCode::CREATED);

        let list = server
            .get("/api/users/favorites")
            .add_header(HeaderName::from_static("authorization"), auth.clone())
            .await;
        list.assert_status_ok();
        let body: Value = list.json();
        assert_eq!(body["total"], 1);

        let stats = server
            .get("/api/users/favorites/stats/1")
            .add_query_param("period", "7d")
            .add_header(HeaderName::from_static("authorization"), auth.clone())
            .await;
        stats.assert_status_ok();
        let stats: Value = stats.json();
        assert_eq!(stats["total_favoris"], 1);
        assert_eq!(stats["ajouts_periode"], 1);
        assert_eq!(stats["period"], "7d");

        server
            .delete("/api/users/favorites/1")
            .add_header(HeaderName::from_static("authorization"), auth.clone())
            .await
            .assert_status_ok();
        server
            .delete("/api/users/favorites/1")
            .add_header(HeaderName::from_static("authorization"), auth)
            .await
            .assert_status_not_found();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "catalog")))]
    async fn test_favorite_inactive_product(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        let response = server
            .post("/api/users/favorites")
            .add_header(HeaderName::from_static("authorization"), bearer(&alice_token()))
            .json(&json!({ "produit_id": 3 }))
            .await;

        response.assert_status_not_found();
        Ok(())
    }
}
