//! integration tests for the http api

mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use chronicle::create_app;
use chronicle_chain::{PublicKey, SigningKey};
use chronicle_db::Database;
use chronicle_types::{ChainScope, ReplicationSource, format_created};
use tower::ServiceExt;

#[tokio::test]
async fn health_reports_pass() {
    let ctx = common::context().await;
    let app = create_app(ctx.clone());

    let response = app.oneshot(common::get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = common::signed_json(response, &ctx.signing_key.public_key()).await;
    assert_eq!(json["status"], "pass");
    assert_eq!(json["primary-entries"], 0);
}

#[tokio::test]
async fn index_lists_routes_for_the_caller() {
    let ctx = common::context().await;
    let server_key = ctx.signing_key.public_key();

    let response = create_app(ctx.clone())
        .oneshot(common::get("/chronicle"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = common::signed_json(response, &server_key).await;
    assert_eq!(json["status"], "OK");
    assert_eq!(json["results"]["public-key"], server_key.to_base64());
    let routes = json["results"]["routes"].as_array().unwrap();
    assert!(!routes.iter().any(|r| r["uri"] == "/chronicle/publish"));

    let (admin, _) = common::register_client(&ctx.db, true).await;
    let request = axum::http::Request::builder()
        .uri("/chronicle")
        .header(chronicle_chain::CLIENT_ID_HEADER, &admin.public_id)
        .body(axum::body::Body::empty())
        .unwrap();
    let response = create_app(ctx.clone()).oneshot(request).await.unwrap();
    let json = common::signed_json(response, &server_key).await;
    let routes = json["results"]["routes"].as_array().unwrap();
    assert!(routes.iter().any(|r| r["uri"] == "/chronicle/publish"));
    assert!(routes.iter().any(|r| r["uri"] == "/chronicle/register"));
}

#[tokio::test]
async fn publish_appends_and_returns_signed_receipt() {
    let ctx = common::context().await;
    let (client, key) = common::register_client(&ctx.db, false).await;
    let server_key = ctx.signing_key.public_key();

    let body = br#"{"message": "hello"}"#;
    let response = create_app(ctx.clone())
        .oneshot(common::signed_request(
            "/chronicle/publish",
            &client.public_id,
            &key,
            body,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = common::signed_json(response, &server_key).await;
    assert_eq!(json["status"], "OK");

    let head = ctx.db.latest_entry(ChainScope::Primary).await.unwrap().unwrap();
    assert_eq!(head.payload.as_bytes(), body);
    assert_eq!(head.public_key, key.public_key());
    assert_eq!(json["results"]["currhash"], head.curr_hash.to_base64());
    assert_eq!(json["results"]["summaryhash"], head.summary_hash.to_base64());
    assert_eq!(json["results"]["created"], head.created);
}

#[tokio::test]
async fn publish_by_unknown_client_is_unauthorized() {
    let ctx = common::context().await;
    let key = SigningKey::generate();

    let response = create_app(ctx.clone())
        .oneshot(common::signed_request(
            "/chronicle/publish",
            "nobody",
            &key,
            b"hello",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let json = common::signed_json(response, &ctx.signing_key.public_key()).await;
    assert_eq!(json["status"], "ERROR");
    assert_eq!(ctx.db.count_entries(ChainScope::Primary).await.unwrap(), 0);
}

#[tokio::test]
async fn publish_with_wrong_key_is_forbidden() {
    let ctx = common::context().await;
    let (client, _) = common::register_client(&ctx.db, false).await;
    let impostor = SigningKey::generate();

    let response = create_app(ctx.clone())
        .oneshot(common::signed_request(
            "/chronicle/publish",
            &client.public_id,
            &impostor,
            b"hello",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(ctx.db.count_entries(ChainScope::Primary).await.unwrap(), 0);
}

#[tokio::test]
async fn publish_with_stale_timestamp_is_forbidden() {
    let ctx = common::context().await;
    let (client, key) = common::register_client(&ctx.db, false).await;

    let body = serde_json::json!({
        "now": format_created(Utc::now() - Duration::hours(2)),
        "message": "replayed",
    })
    .to_string();
    let response = create_app(ctx.clone())
        .oneshot(common::signed_request(
            "/chronicle/publish",
            &client.public_id,
            &key,
            body.as_bytes(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(ctx.db.count_entries(ChainScope::Primary).await.unwrap(), 0);
}

#[tokio::test]
async fn lookup_and_since() {
    let ctx = common::context().await;
    let key = SigningKey::generate();
    let first = ctx.ledger().append_signed("one", &key).await.unwrap();
    ctx.ledger().append_signed("two", &key).await.unwrap();
    ctx.ledger().append_signed("three", &key).await.unwrap();
    let server_key = ctx.signing_key.public_key();

    let response = create_app(ctx.clone())
        .oneshot(common::get(&format!(
            "/chronicle/lookup/{}",
            first.summary_hash
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = common::signed_json(response, &server_key).await;
    assert_eq!(json["results"][0]["contents"], "one");

    let response = create_app(ctx.clone())
        .oneshot(common::get(&format!("/chronicle/since/{}", first.curr_hash)))
        .await
        .unwrap();
    let json = common::signed_json(response, &server_key).await;
    let since = json["results"].as_array().unwrap();
    assert_eq!(since.len(), 2);
    assert_eq!(since[0]["contents"], "two");
    assert_eq!(since[0]["prevhash"], first.curr_hash.to_base64());

    let response = create_app(ctx.clone())
        .oneshot(common::get("/chronicle/export"))
        .await
        .unwrap();
    let json = common::signed_json(response, &server_key).await;
    assert_eq!(json["results"].as_array().unwrap().len(), 3);

    let response = create_app(ctx.clone())
        .oneshot(common::get("/chronicle/lasthash"))
        .await
        .unwrap();
    let json = common::signed_json(response, &server_key).await;
    let head = ctx.ledger().head().await.unwrap().unwrap();
    assert_eq!(json["results"]["curr-hash"], head.curr_hash.to_base64());
    assert_eq!(json["results"]["summary-hash"], head.summary_hash.to_base64());
}

#[tokio::test]
async fn unknown_hash_is_not_found() {
    let ctx = common::context().await;
    let unknown = chronicle_chain::ChainHash::from([7u8; 32]);

    let response = create_app(ctx.clone())
        .oneshot(common::get(&format!("/chronicle/lookup/{}", unknown)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = create_app(ctx.clone())
        .oneshot(common::get(&format!("/chronicle/since/{}", unknown)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = create_app(ctx)
        .oneshot(common::get("/chronicle/lookup/not-a-hash"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn empty_chain_has_null_last_hash() {
    let ctx = common::context().await;
    let response = create_app(ctx.clone())
        .oneshot(common::get("/chronicle/lasthash"))
        .await
        .unwrap();
    let json = common::signed_json(response, &ctx.signing_key.public_key()).await;
    assert!(json["results"]["curr-hash"].is_null());
    assert!(json["results"]["summary-hash"].is_null());
}

#[tokio::test]
async fn register_requires_admin() {
    let ctx = common::context().await;
    let (client, key) = common::register_client(&ctx.db, false).await;

    let body = serde_json::json!({
        "publickey": SigningKey::generate().public_key().to_base64(),
        "request-time": format_created(Utc::now()),
    })
    .to_string();
    let response = create_app(ctx.clone())
        .oneshot(common::signed_request(
            "/chronicle/register",
            &client.public_id,
            &key,
            body.as_bytes(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(ctx.db.list_clients().await.unwrap().len(), 1);
}

#[tokio::test]
async fn admin_registers_and_revokes_client() {
    let ctx = common::context().await;
    let (admin, admin_key) = common::register_client(&ctx.db, true).await;
    let server_key = ctx.signing_key.public_key();
    let new_key = SigningKey::generate().public_key().to_base64();

    let body = serde_json::json!({
        "publickey": new_key,
        "comment": "new publisher",
        "request-time": format_created(Utc::now()),
    })
    .to_string();
    let response = create_app(ctx.clone())
        .oneshot(common::signed_request(
            "/chronicle/register",
            &admin.public_id,
            &admin_key,
            body.as_bytes(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = common::signed_json(response, &server_key).await;
    let client_id = json["results"]["client-id"].as_str().unwrap().to_string();

    let registered = ctx
        .db
        .get_client_by_public_id(&client_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(registered.public_key, new_key);
    assert!(!registered.is_admin);

    let body = serde_json::json!({
        "clientid": client_id,
        "publickey": new_key,
        "request-time": format_created(Utc::now()),
    })
    .to_string();
    let response = create_app(ctx.clone())
        .oneshot(common::signed_request(
            "/chronicle/revoke",
            &admin.public_id,
            &admin_key,
            body.as_bytes(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = common::signed_json(response, &server_key).await;
    assert_eq!(json["results"]["deleted"], true);
    assert!(
        ctx.db
            .get_client_by_public_id(&client_id)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn admins_cannot_be_revoked() {
    let ctx = common::context().await;
    let (admin, admin_key) = common::register_client(&ctx.db, true).await;
    let (other_admin, other_key) = common::register_client(&ctx.db, true).await;

    let body = serde_json::json!({
        "clientid": other_admin.public_id,
        "publickey": other_key.public_key().to_base64(),
        "request-time": format_created(Utc::now()),
    })
    .to_string();
    let response = create_app(ctx.clone())
        .oneshot(common::signed_request(
            "/chronicle/revoke",
            &admin.public_id,
            &admin_key,
            body.as_bytes(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(ctx.db.list_clients().await.unwrap().len(), 2);
}

#[tokio::test]
async fn stale_register_is_forbidden() {
    let ctx = common::context().await;
    let (admin, admin_key) = common::register_client(&ctx.db, true).await;

    let body = serde_json::json!({
        "publickey": SigningKey::generate().public_key().to_base64(),
        "request-time": format_created(Utc::now() - Duration::days(1)),
    })
    .to_string();
    let response = create_app(ctx.clone())
        .oneshot(common::signed_request(
            "/chronicle/register",
            &admin.public_id,
            &admin_key,
            body.as_bytes(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(ctx.db.list_clients().await.unwrap().len(), 1);
}

#[tokio::test]
async fn replica_routes() {
    let ctx = common::context().await;
    let server_key: PublicKey = ctx.signing_key.public_key();
    ctx.db
        .create_replication_source(&ReplicationSource::new(
            "upstream-a".into(),
            "upstream".into(),
            "http://upstream.invalid/chronicle".into(),
            SigningKey::generate().public_key().to_base64(),
        ))
        .await
        .unwrap();

    let response = create_app(ctx.clone())
        .oneshot(common::get("/chronicle/replica"))
        .await
        .unwrap();
    let json = common::signed_json(response, &server_key).await;
    assert_eq!(json["results"][0]["uniqueid"], "upstream-a");

    let response = create_app(ctx.clone())
        .oneshot(common::get("/chronicle/replica/upstream-a/export"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = common::signed_json(response, &server_key).await;
    assert!(json["results"].as_array().unwrap().is_empty());

    let response = create_app(ctx.clone())
        .oneshot(common::get("/chronicle/replica/missing/lasthash"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
