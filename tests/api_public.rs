//! Rotte che rispondono senza raggiungere il database: root, fallback,
//! controllo del token, health degradato e validazione dei body.

mod common;

#[cfg(test)]
mod public_tests {
    use super::common::*;
    use axum::http::{HeaderName, StatusCode};
    use serde_json::{Value, json};

    #[tokio::test]
    async fn test_root_reports_running_api() {
        let server = create_test_server(lazy_state());

        let response = server.get("/").await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["message"], "Marketplace API is running");
        assert_eq!(body["environment"], "development");
        assert_eq!(body["connectedClients"], 0);
    }

    #[tokio::test]
    async fn test_unknown_route_returns_json_404() {
        let server = create_test_server(lazy_state());

        let response = server.get("/api/does-not-exist").await;

        response.assert_status_not_found();
        let body: Value = response.json();
        assert_eq!(body["error"], "Route not found");
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let server = create_test_server(lazy_state());

        let response = server.get("/api/notifications").await;

        response.assert_status_unauthorized();
        let body: Value = response.json();
        assert_eq!(body["error"], "Access token required");
    }

    #[tokio::test]
    async fn test_invalid_token_is_forbidden() {
        let server = create_test_server(lazy_state());

        let response = server
            .get("/api/messages/conversations")
            .add_header(
                HeaderName::from_static("authorization"),
                "Bearer invalid_token_here",
            )
            .await;

        response.assert_status_forbidden();
    }

    #[tokio::test]
    async fn test_token_signed_with_other_secret_is_forbidden() {
        use jsonwebtoken::{EncodingKey, Header, encode};
        use marketplace::core::Claims;

        let now = chrono::Utc::now().timestamp() as usize;
        let claims = Claims {
            id: 3,
            email: "admin@example.com".to_string(),
            role_id: 3,
            iat: now,
            exp: now + 3600,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"another-secret"),
        )
        .unwrap();
        let server = create_test_server(lazy_state());

        let response = server
            .get("/api/admin/dashboard")
            .add_header(HeaderName::from_static("authorization"), bearer(&token))
            .await;

        response.assert_status_forbidden();
    }

    #[tokio::test]
    async fn test_websocket_with_bad_query_token_is_forbidden() {
        let server = create_test_server(lazy_state());

        let response = server.get("/ws").add_query_param("token", "garbage").await;

        response.assert_status_forbidden();
    }

    #[tokio::test]
    async fn test_websocket_without_token_is_unauthorized() {
        let server = create_test_server(lazy_state());

        let response = server.get("/ws").await;

        response.assert_status_unauthorized();
    }

    #[tokio::test]
    async fn test_health_is_degraded_without_database() {
        let server = create_test_server(lazy_state());

        let response = server.get("/api/health").await;

        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
        let body: Value = response.json();
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["database"], "unreachable");
        assert!(body["uptime_secs"].is_u64());
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_payload() {
        let server = create_test_server(lazy_state());

        let response = server
            .post("/api/auth/register")
            .json(&json!({
                "email": "not-an-email",
                "mot_de_passe": "123",
                "nom": "   ",
                "role_id": 1
            }))
            .await;

        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn test_register_rejects_unknown_role() {
        let server = create_test_server(lazy_state());

        let response = server
            .post("/api/auth/register")
            .json(&json!({
                "email": "someone@example.com",
                "mot_de_passe": "secret123",
                "nom": "Someone",
                "role_id": 7
            }))
            .await;

        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn test_login_rejects_empty_password() {
        let server = create_test_server(lazy_state());

        let response = server
            .post("/api/auth/login")
            .json(&json!({ "email": "alice@example.com", "mot_de_passe": "" }))
            .await;

        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn test_query_token_is_ignored_outside_websocket() {
        let server = create_test_server(lazy_state());

        let response = server
            .get("/api/notifications")
            .add_query_param("token", alice_token())
            .await;

        response.assert_status_unauthorized();
        let body: Value = response.json();
        assert_eq!(body["error"], "Access token required");
    }

    #[tokio::test]
    async fn test_unknown_click_action_is_rejected() {
        let server = create_test_server(lazy_state());

        let response = server
            .post("/api/analytics/products/1/click")
            .json(&json!({ "action": "purchase" }))
            .await;

        response.assert_status_bad_request();
        let body: Value = response.json();
        assert_eq!(body["error"], "Invalid JSON body");
    }

    #[tokio::test]
    async fn test_security_headers_on_every_response() {
        let server = create_test_server(lazy_state());

        for response in [server.get("/").await, server.get("/api/nope").await] {
            assert_eq!(response.header("x-content-type-options"), "nosniff");
            assert_eq!(response.header("x-frame-options"), "DENY");
            assert_eq!(response.header("referrer-policy"), "no-referrer");
        }
    }

    #[tokio::test]
    async fn test_auth_routes_are_rate_limited_per_client() {
        use marketplace::core::{AppState, RateLimiter};
        use std::sync::Arc;
        use std::time::Duration;

        let mut state = AppState::new(lazy_pool(), TEST_SECRET.to_string());
        state.auth_limiter = RateLimiter::new(2, Duration::from_secs(60));
        let server = create_test_server(Arc::new(state));
        let forwarded = HeaderName::from_static("x-forwarded-for");
        let payload = json!({ "email": "alice@example.com", "mot_de_passe": "" });

        for _ in 0..2 {
            server
                .post("/api/auth/login")
                .add_header(forwarded.clone(), "198.51.100.4")
                .json(&payload)
                .await
                .assert_status_bad_request();
        }

        let limited = server
            .post("/api/auth/login")
            .add_header(forwarded.clone(), "198.51.100.4")
            .json(&payload)
            .await;
        limited.assert_status(StatusCode::TOO_MANY_REQUESTS);
        let body: Value = limited.json();
        assert_eq!(body["error"], "Too many requests");
        assert!(limited.header("retry-after").to_str().unwrap().parse::<u64>().unwrap() > 0);

        // un altro client non è toccato, e le rotte fuori da /api/auth nemmeno
        server
            .post("/api/auth/login")
            .add_header(forwarded.clone(), "198.51.100.5")
            .json(&payload)
            .await
            .assert_status_bad_request();
        server
            .get("/api/notifications")
            .add_header(forwarded, "198.51.100.4")
            .await
            .assert_status_unauthorized();
    }
}
