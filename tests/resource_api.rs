//! HTTP-level tests for the generated resource routes over in-memory models.

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use model_rest::{
    common_routes, configure, mount_routes, AppState, MemoryModel, ModelConfig, ModelRegistry, ResourceConfig,
    ValidationRule,
};
use serde_json::{json, Value};
use tower::ServiceExt;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("model_rest=debug")
        .with_test_writer()
        .try_init();
}

fn registry() -> ModelRegistry {
    ModelRegistry::new()
        .with(MemoryModel::new("User"))
        .with(MemoryModel::new("Pet").with_rule("name", ValidationRule::required()))
}

fn app_with(config: ResourceConfig) -> Router {
    init_tracing();
    let resources = configure(&config, &registry()).unwrap();
    Router::new()
        .merge(common_routes())
        .merge(mount_routes(AppState::new(resources)))
}

fn app() -> Router {
    app_with(ResourceConfig::default())
}

/// Percent-encode a query value.
fn enc(s: &str) -> String {
    let mut out = String::new();
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
    let body = match body {
        Some(v) => Body::from(v.to_string()),
        None => Body::empty(),
    };
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

fn json_of(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap()
}

async fn create_user(app: &Router, user: Value) -> Value {
    let (status, body) = call(app, Method::POST, "/api/user", Some(user)).await;
    assert_eq!(status, StatusCode::CREATED);
    json_of(&body)
}

#[tokio::test]
async fn singular_get_without_match_is_404_with_empty_body() {
    let app = app();
    let (status, body) = call(&app, Method::GET, "/api/user/7", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.is_empty());
}

#[tokio::test]
async fn singular_post_with_empty_predicate_creates() {
    let app = app();
    let (status, body) = call(&app, Method::POST, "/api/user", Some(json!({"name": "a"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json_of(&body), json!({"id": 1, "name": "a"}));

    let (status, body) = call(&app, Method::GET, "/api/user/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_of(&body)["name"], json!("a"));
}

#[tokio::test]
async fn singular_put_clears_absent_attributes_but_post_keeps_them() {
    let app = app();
    create_user(&app, json!({"name": "a", "age": 5})).await;
    create_user(&app, json!({"name": "c", "age": 9})).await;

    let (status, body) = call(&app, Method::POST, "/api/user/2", Some(json!({"name": "d"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_of(&body), json!({"id": 2, "name": "d", "age": 9}));

    let uri = format!("/api/user?name={}", enc("\"a\""));
    let (status, body) = call(&app, Method::PUT, &uri, Some(json!({"name": "b"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_of(&body), json!({"id": 1, "name": "b"}));
}

#[tokio::test]
async fn singular_update_of_missing_target_is_404() {
    let app = app();
    let (status, _) = call(&app, Method::POST, "/api/user/99", Some(json!({"name": "x"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&app, Method::PUT, "/api/user/99", Some(json!({"name": "x"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn plural_get_with_no_matches_is_404_with_empty_array() {
    let app = app();
    let (status, body) = call(&app, Method::GET, "/api/users", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json_of(&body), json!([]));
}

#[tokio::test]
async fn plural_delete_of_nothing_is_200_with_empty_body() {
    let app = app();
    let (status, body) = call(&app, Method::DELETE, "/api/users", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());
}

#[tokio::test]
async fn plural_bulk_create_then_filtered_sorted_read() {
    let app = app();
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/users",
        Some(json!([{"name": "a", "age": 30}, {"name": "b", "age": 20}, {"name": "c", "age": 40}])),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json_of(&body).as_array().unwrap().len(), 3);

    let uri = format!(
        "/api/users?age={}&sort={}&limit=1",
        enc(r#"{"$gte":25}"#),
        enc("\"age desc\"")
    );
    let (status, body) = call(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_of(&body), json!([{"id": 3, "name": "c", "age": 40}]));
}

#[tokio::test]
async fn where_overrides_sibling_keys() {
    let app = app();
    create_user(&app, json!({"name": "x"})).await;
    create_user(&app, json!({"name": "y"})).await;
    let uri = format!("/api/users?name={}&where={}", enc("\"x\""), enc(r#"{"name":"y"}"#));
    let (status, body) = call(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_of(&body), json!([{"id": 2, "name": "y"}]));
}

#[tokio::test]
async fn plural_put_replaces_every_match() {
    let app = app();
    create_user(&app, json!({"name": "a", "role": "admin"})).await;
    create_user(&app, json!({"name": "b", "role": "admin"})).await;
    create_user(&app, json!({"name": "c", "role": "user"})).await;
    let uri = format!("/api/users?role={}", enc("\"admin\""));
    let (status, body) = call(&app, Method::PUT, &uri, Some(json!({"role": "guest"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json_of(&body),
        json!([{"id": 1, "role": "guest"}, {"id": 2, "role": "guest"}])
    );
}

#[tokio::test]
async fn malformed_query_is_400_naming_the_pair() {
    let app = app();
    let (status, body) = call(&app, Method::GET, "/api/users?foo=not-json", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let err = json_of(&body);
    assert_eq!(err["error"]["code"], json!("malformed_query"));
    assert_eq!(err["error"]["details"]["key"], json!("foo"));
    assert_eq!(err["error"]["details"]["value"], json!("not-json"));
}

#[tokio::test]
async fn model_validation_failure_is_400() {
    let app = app();
    let (status, body) = call(&app, Method::POST, "/api/pet", Some(json!({"age": 1}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json_of(&body)["error"]["code"], json!("validation_error"));
}

#[tokio::test]
async fn unknown_segment_and_id_under_plural_are_404() {
    let app = app();
    let (status, _) = call(&app, Method::GET, "/api/ghosts", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&app, Method::GET, "/api/users/1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn non_object_body_is_400() {
    let app = app();
    let (status, _) = call(&app, Method::POST, "/api/user", Some(json!("just a string"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn discovery_lists_one_pair_per_model_under_the_prefix() {
    let app = app();
    let (status, body) = call(&app, Method::GET, "/api", None).await;
    assert_eq!(status, StatusCode::OK);
    let doc = json_of(&body);
    let routes = doc["routes"].as_array().unwrap();
    assert_eq!(routes.len(), 2);
    assert_eq!(routes[0]["model"], json!("Pet"));
    assert_eq!(routes[0]["singular"]["url"], json!("/api/pet/{id}"));
    assert_eq!(routes[0]["plural"]["url"], json!("/api/pets"));
    assert_eq!(routes[1]["plural"]["url"], json!("/api/users"));
    assert_eq!(routes[1]["plural"]["methods"], json!(["GET", "POST", "PUT", "DELETE"]));
}

#[tokio::test]
async fn custom_paths_and_empty_prefix() {
    let config = ResourceConfig::default()
        .with_prefix("")
        .with_models(vec![ModelConfig::named("User").with_paths("person", "people")]);
    let app = app_with(config);
    let (status, _) = call(&app, Method::POST, "/person", Some(json!({"name": "a"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = call(&app, Method::GET, "/people", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_of(&body), json!([{"id": 1, "name": "a"}]));
    let (status, _) = call(&app, Method::GET, "/pets", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_is_served_alongside_resources() {
    let app = app();
    let (status, body) = call(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_of(&body), json!({"status": "ok"}));
}

#[tokio::test]
async fn put_with_empty_predicate_creates_on_both_shapes() {
    let app = app();
    let (status, body) = call(&app, Method::PUT, "/api/user", Some(json!({"name": "a"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json_of(&body), json!({"id": 1, "name": "a"}));

    let (status, body) = call(&app, Method::PUT, "/api/users", Some(json!([{"name": "b"}, {"name": "c"}]))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json_of(&body), json!([{"id": 2, "name": "b"}, {"id": 3, "name": "c"}]));
}

#[tokio::test]
async fn singular_delete_removes_the_target() {
    let app = app();
    create_user(&app, json!({"name": "a"})).await;
    create_user(&app, json!({"name": "b"})).await;

    let (status, body) = call(&app, Method::DELETE, "/api/user/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());

    let (status, _) = call(&app, Method::GET, "/api/user/1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = call(&app, Method::GET, "/api/users", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_of(&body), json!([{"id": 2, "name": "b"}]));
}

#[tokio::test]
async fn configured_body_limit_is_honoured_both_ways() {
    let mut config = ResourceConfig::default();
    config.body_limit = 8 * 1024 * 1024;
    let app = app_with(config);
    let big = "x".repeat(3 * 1024 * 1024);
    let (status, body) = call(&app, Method::POST, "/api/user", Some(json!({"name": big}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json_of(&body)["id"], json!(1));

    let mut config = ResourceConfig::default();
    config.body_limit = 1024;
    let app = app_with(config);
    let (status, _) = call(&app, Method::POST, "/api/user", Some(json!({"name": "x".repeat(4096)}))).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}
