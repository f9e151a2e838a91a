#![cfg(feature = "mysql-tests")]

mod common;

#[cfg(test)]
mod catalog_tests {
    use super::common::*;
    use axum::http::{HeaderName, StatusCode};
    use serde_json::{Value, json};
    use sqlx::MySqlPool;

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "catalog")))]
    async fn test_list_products_only_active(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        let response = server.get("/api/products").await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["pagination"]["total"], 3);
        assert_eq!(body["pagination"]["page"], 1);
        assert_eq!(body["pagination"]["limit"], 20);
        let ids: Vec<i64> = body["products"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|p| p["id"].as_i64())
            .collect();
        assert!(!ids.contains(&3));
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "catalog")))]
    async fn test_list_products_filters_and_sort(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        let response = server
            .get("/api/products")
            .add_query_param("categorie_id", 1)
            .add_query_param("sort", "prix_unitaire")
            .add_query_param("order", "asc")
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["pagination"]["total"], 2);
        assert_eq!(body["products"][0]["nom"], "Huile de palme 5L");
        assert_eq!(body["products"][0]["nom_entreprise"], "Durand Export");
        assert_eq!(body["products"][0]["image_principale"], "/uploads/products/huile-1.jpg");

        let search = server
            .get("/api/products")
            .add_query_param("search", "pagne")
            .await;
        let body: Value = search.json();
        assert_eq!(body["pagination"]["total"], 1);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "catalog")))]
    async fn test_list_products_limit_is_clamped(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        let response = server
            .get("/api/products")
            .add_query_param("limit", 1000)
            .add_query_param("page", 0)
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["pagination"]["limit"], 100);
        assert_eq!(body["pagination"]["page"], 1);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "catalog")))]
    async fn test_popular_products_by_score(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        let response = server
            .get("/api/products/popular")
            .add_query_param("limit", 2)
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["total"], 2);
        assert_eq!(body["products"][0]["id"], 1);
        assert_eq!(body["products"][1]["id"], 4);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "catalog")))]
    async fn test_special_offers_exclude_expired(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        let response = server.get("/api/products/special-offers").await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["total"], 1);
        let offer = &body["offers"][0];
        assert_eq!(offer["id"], 1);
        assert_eq!(offer["prix_final"], 8000.0);
        assert_eq!(offer["pourcentage_economie"], 20.0);
        let days = offer["jours_restants"].as_i64().unwrap();
        assert!((4..=5).contains(&days));
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "catalog")))]
    async fn test_product_detail(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        let response = server.get("/api/products/1").await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["categorie_nom"], "Alimentation");
        assert_eq!(body["images"].as_array().map(Vec::len), Some(2));

        server.get("/api/products/3").await.assert_status_not_found();
        server.get("/api/products/999").await.assert_status_not_found();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "catalog")))]
    async fn test_categories_with_counts(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        let response = server.get("/api/categories").await;

        response.assert_status_ok();
        let body: Value = response.json();
        let categories = body["categories"].as_array().unwrap();
        assert_eq!(categories.len(), 2);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "catalog")))]
    async fn test_supplier_lists_own_products(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        let response = server
            .get("/api/supplier/products")
            .add_header(HeaderName::from_static("authorization"), bearer(&bob_token()))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        // anche le bozze sono visibili al proprietario
        assert_eq!(body["total"], 3);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "catalog")))]
    async fn test_buyer_cannot_manage_products(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        let response = server
            .post("/api/supplier/products")
            .add_header(HeaderName::from_static("authorization"), bearer(&alice_token()))
            .json(&json!({ "nom": "Manioc", "prix_unitaire": 500.0 }))
            .await;

        response.assert_status_forbidden();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "catalog")))]
    async fn test_create_product(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool.clone()));

        let response = server
            .post("/api/supplier/products")
            .add_header(HeaderName::from_static("authorization"), bearer(&bob_token()))
            .json(&json!({
                "nom": "Manioc séché",
                "prix_unitaire": 1500.0,
                "categorie_id": 1,
                "moq": 20,
                "images": ["/uploads/products/manioc.jpg"]
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        assert_eq!(body["product"]["nom"], "Manioc séché");
        assert_eq!(body["product"]["fournisseur_id"], 1);
        let produit_id = body["productId"].as_i64().unwrap();

        let images: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM images_produits WHERE produit_id = ?")
            .bind(produit_id)
            .fetch_one(&pool)
            .await?;
        assert_eq!(images, 1);

        let moderation: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM admin_notifications WHERE category = 'product_moderation' AND product_id = ?",
        )
        .bind(produit_id)
        .fetch_one(&pool)
        .await?;
        assert_eq!(moderation, 1);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "catalog")))]
    async fn test_create_product_invalid_price(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        let response = server
            .post("/api/supplier/products")
            .add_header(HeaderName::from_static("authorization"), bearer(&bob_token()))
            .json(&json!({ "nom": "Gratuit", "prix_unitaire": 0.0 }))
            .await;

        response.assert_status_bad_request();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "catalog")))]
    async fn test_update_own_product(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        let response = server
            .put("/api/supplier/products/2")
            .add_header(HeaderName::from_static("authorization"), bearer(&bob_token()))
            .json(&json!({ "prix_unitaire": 24000.0, "stock_disponible": 60 }))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["product"]["prix_unitaire"], 24000.0);
        assert_eq!(body["product"]["stock_disponible"], 60);
        assert_eq!(body["product"]["nom"], "Sardines en boîte");
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "catalog")))]
    async fn test_foreign_product_looks_missing(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));
        let auth = bearer(&bob_token());

        server
            .put("/api/supplier/products/4")
            .add_header(HeaderName::from_static("authorization"), auth.clone())
            .json(&json!({ "prix_unitaire": 1.0 }))
            .await
            .assert_status_not_found();
        server
            .delete("/api/supplier/products/4")
            .add_header(HeaderName::from_static("authorization"), auth)
            .await
            .assert_status_not_found();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "catalog")))]
    async fn test_delete_own_product(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));
        let auth = bearer(&bob_token());

        server
            .delete("/api/supplier/products/2")
            .add_header(HeaderName::from_static("authorization"), auth.clone())
            .await
            .assert_status_ok();
        server
            .delete("/api/supplier/products/2")
            .add_header(HeaderName::from_static("authorization"), auth)
            .await
            .assert_status_not_found();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "catalog")))]
    async fn test_only_verified_entreprises_are_public(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        let response = server.get("/api/entreprises").await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["pagination"]["total"], 1);
        assert_eq!(body["entreprises"][0]["nom_entreprise"], "Durand Export");
        assert_eq!(body["entreprises"][0]["nombre_produits"], 2);

        let detail = server.get("/api/suppliers/1").await;
        detail.assert_status_ok();
        let detail: Value = detail.json();
        assert_eq!(detail["secteur_activite"], "Agroalimentaire");

        server.get("/api/entreprises/2").await.assert_status_not_found();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "catalog")))]
    async fn test_sectors_and_cities(pool: MySqlPool) -> sqlx::Result<()> {
        let server = create_test_server(create_test_state(pool));

        let sectors: Value = server.get("/api/sectors").await.json();
        assert_eq!(sectors["sectors"], json!(["Agroalimentaire", "Textile"]));

        let cities: Value = server.get("/api/cities").await.json();
        assert_eq!(cities["cities"], json!(["Franceville", "Libreville"]));
        Ok(())
    }
}
