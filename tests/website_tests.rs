mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{id_of, TestApp};
use storefront::db::UserRole;

#[tokio::test]
async fn test_create_website_defaults() {
    let app = TestApp::new().await;
    let (owner_id, token) = app.user("alice", UserRole::Standard).await;

    let website = app.create_website(&token, "Toko Baju #1").await;

    assert_eq!(website["slug"], "toko-baju-1");
    assert_eq!(website["name"], "Toko Baju #1");
    assert_eq!(website["userId"], owner_id);
    assert_eq!(website["status"], true);
    assert_eq!(website["canAccess"], true);
    assert_eq!(website["canExpired"], true);
    assert_eq!(website["hasProduct"], false);
    assert!(website["phone"].is_null());
    assert!(website["createdAt"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_create_requires_name_and_url() {
    let app = TestApp::new().await;
    let (_, token) = app.user("alice", UserRole::Standard).await;

    let response = app
        .post("/api/websites", Some(&token), json!({ "name": "Shop" }))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["errors"]["url"].is_array());

    let response = app
        .post(
            "/api/websites",
            Some(&token),
            json!({ "name": "!!!", "url": "https://a.io" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_duplicate_slug_conflicts() {
    let app = TestApp::new().await;
    let (_, alice) = app.user("alice", UserRole::Standard).await;
    let (_, bob) = app.user("bob", UserRole::Standard).await;

    app.create_website(&alice, "My Shop").await;

    let response = app
        .post(
            "/api/websites",
            Some(&bob),
            json!({ "name": "my   SHOP!", "url": "https://b.io" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["success"], false);
}

#[tokio::test]
async fn test_mutations_require_auth() {
    let app = TestApp::new().await;

    let response = app
        .post(
            "/api/websites",
            None,
            json!({ "name": "Shop", "url": "https://a.io" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = app.get("/api/websites", None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_list_is_scoped_to_owner() {
    let app = TestApp::new().await;
    let (_, admin) = app.user("root", UserRole::Admin).await;
    let (_, alice) = app.user("alice", UserRole::Standard).await;
    let (_, bob) = app.user("bob", UserRole::Standard).await;

    app.create_website(&alice, "Alice One").await;
    app.create_website(&alice, "Alice Two").await;
    app.create_website(&bob, "Bob Shop").await;

    let response = app.get("/api/websites", Some(&alice)).await;
    let slugs: Vec<&str> = response
        .data()
        .as_array()
        .unwrap()
        .iter()
        .map(|w| w["slug"].as_str().unwrap())
        .collect();
    assert_eq!(slugs.len(), 2);
    assert!(slugs.iter().all(|s| s.starts_with("alice")));

    let response = app.get("/api/websites", Some(&admin)).await;
    assert_eq!(response.data().as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_public_get_by_slug() {
    let app = TestApp::new().await;
    let (_, token) = app.user("alice", UserRole::Standard).await;
    app.create_website(&token, "Public Shop").await;

    let response = app.get("/api/websites/public-shop", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["name"], "Public Shop");
    assert_eq!(response.data()["slug"], "public-shop");
    assert!(response.data().get("userId").is_none());

    let response = app.get("/api/websites/missing", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stranger_sees_404_like_missing() {
    let app = TestApp::new().await;
    let (_, admin) = app.user("root", UserRole::Admin).await;
    let (_, alice) = app.user("alice", UserRole::Standard).await;
    let (_, bob) = app.user("bob", UserRole::Standard).await;
    app.create_website(&alice, "Alice Shop").await;

    let foreign = app
        .put("/api/websites/alice-shop", Some(&bob), json!({ "phone": "1" }))
        .await;
    let missing = app
        .put("/api/websites/no-such-shop", Some(&bob), json!({ "phone": "1" }))
        .await;
    assert_eq!(foreign.status, StatusCode::NOT_FOUND);
    assert_eq!(foreign.status, missing.status);
    assert_eq!(foreign.message(), missing.message());

    let response = app.delete("/api/websites/alice-shop", Some(&bob)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app
        .put("/api/websites/alice-shop", Some(&admin), json!({ "phone": "1" }))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["phone"], "1");
}

#[tokio::test]
async fn test_partial_update_semantics() {
    let app = TestApp::new().await;
    let (_, token) = app.user("alice", UserRole::Standard).await;
    let response = app
        .post(
            "/api/websites",
            Some(&token),
            json!({
                "name": "Shop",
                "url": "https://a.io",
                "phone": "0812",
                "description": "Clothes"
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);

    let response = app
        .put(
            "/api/websites/shop",
            Some(&token),
            json!({ "phone": null, "canAccess": false }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let website = response.data();
    assert!(website["phone"].is_null());
    assert_eq!(website["description"], "Clothes");
    assert_eq!(website["canAccess"], false);
    assert_eq!(website["url"], "https://a.io");

    let response = app
        .put("/api/websites/shop", Some(&token), json!({ "url": null }))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rename_regenerates_slug() {
    let app = TestApp::new().await;
    let (_, token) = app.user("alice", UserRole::Standard).await;
    app.create_website(&token, "Old Name").await;
    app.create_website(&token, "Taken Name").await;

    let response = app
        .put(
            "/api/websites/old-name",
            Some(&token),
            json!({ "name": "Taken Name" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    let response = app
        .put(
            "/api/websites/old-name",
            Some(&token),
            json!({ "name": "New Name" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["slug"], "new-name");

    let response = app.get("/api/websites/old-name", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_soft_delete_frees_slug() {
    let app = TestApp::new().await;
    let (_, token) = app.user("alice", UserRole::Standard).await;
    let first = app.create_website(&token, "Reusable").await;

    let response = app.delete("/api/websites/reusable", Some(&token)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.data().is_null());

    let response = app.get("/api/websites/reusable", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let second = app.create_website(&token, "Reusable").await;
    assert_eq!(second["slug"], "reusable");
    assert_ne!(id_of(&first), id_of(&second));

    let deleted_at: Option<String> =
        sqlx::query_scalar("SELECT deleted_at FROM websites WHERE id = ?")
            .bind(id_of(&first))
            .fetch_one(app.db())
            .await
            .unwrap();
    assert!(deleted_at.is_some());
}

#[tokio::test]
async fn test_delete_cascades_to_products_and_events() {
    let app = TestApp::new().await;
    let (_, token) = app.user("alice", UserRole::Standard).await;
    let website = app.create_website(&token, "Cascade").await;
    let product = app.create_product(&token, id_of(&website), "Hat").await;
    app.insert_event(
        "product_view",
        id_of(&website),
        Some(id_of(&product)),
        "1.1.1.1",
        "2026-01-01T10:00:00.000Z",
    )
    .await;

    let response = app.delete("/api/websites/cascade", Some(&token)).await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app.get("/api/products/hat", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let live_events: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM analytics WHERE deleted_at IS NULL")
            .fetch_one(app.db())
            .await
            .unwrap();
    assert_eq!(live_events, 0);
}

#[tokio::test]
async fn test_public_product_listing_by_website() {
    let app = TestApp::new().await;
    let (_, token) = app.user("alice", UserRole::Standard).await;
    let website = app.create_website(&token, "Catalog").await;
    app.create_product(&token, id_of(&website), "Shirt").await;
    app.create_product(&token, id_of(&website), "Pants").await;

    let response = app.get("/api/websites/catalog/products", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data().as_array().unwrap().len(), 2);

    let response = app.get("/api/websites/nope/products", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
