//! Integration Tests for Admin API Endpoints
//!
//! Tests full request/response cycle for each endpoint.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use cachemap::{api::create_router, cache::MINUTE, CacheMap, CacheRegistry};
use serde_json::Value;
use tower::ServiceExt;

// == Helper Functions ==

fn create_test_app() -> (Arc<CacheRegistry>, Router) {
    let registry = Arc::new(CacheRegistry::new());
    let app = create_router(registry.clone());
    (registry, app)
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post(uri: &str, body: Body) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

// == Health Endpoint Tests ==

#[tokio::test]
async fn test_health_endpoint() {
    let (_registry, app) = create_test_app();

    let response = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"].as_str().unwrap(), "healthy");
    assert!(json.get("timestamp").is_some());
}

// == Listing Tests ==

#[tokio::test]
async fn test_list_caches_sorted_by_miss_ratio() {
    let (registry, app) = create_test_app();
    let good: CacheMap<String, u32> = CacheMap::new(&registry, 10, "good");
    let bad: CacheMap<String, u32> = CacheMap::new(&registry, 10, "bad");
    good.put("k".to_string(), 1);
    good.get("k");
    bad.get("k");

    let response = app.oneshot(get("/caches")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["count"], 2);
    assert_eq!(json["caches"][0]["description"], "bad");
    assert_eq!(json["caches"][0]["miss_ratio"], 1.0);
    assert_eq!(json["caches"][1]["description"], "good");
    assert_eq!(json["caches"][1]["hits"], 1);
}

#[tokio::test]
async fn test_list_skips_dropped_caches() {
    let (registry, app) = create_test_app();
    {
        let _temporary: CacheMap<String, u32> = CacheMap::new(&registry, 10, "temporary");
    }

    let response = app.oneshot(get("/caches")).await.unwrap();

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["count"], 0);
}

#[tokio::test]
async fn test_cache_by_name() {
    let (registry, app) = create_test_app();
    let users: CacheMap<String, String> = CacheMap::lru(&registry, 50, "users").unwrap();
    users.put("alice".to_string(), "admin".to_string());

    let response = app.oneshot(get("/caches/users")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json[0]["description"], "users");
    assert_eq!(json[0]["size"], 1);
    assert_eq!(json[0]["limit"], 50);
    assert_eq!(json[0]["puts"], 1);
}

#[tokio::test]
async fn test_cache_by_name_not_found() {
    let (_registry, app) = create_test_app();

    let response = app.oneshot(get("/caches/nonexistent")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("nonexistent"));
}

// == Purge Endpoint Tests ==

#[tokio::test]
async fn test_purge_endpoint_clears_every_cache() {
    let (registry, app) = create_test_app();
    let plain: CacheMap<String, u32> = CacheMap::new(&registry, 10, "plain");
    let timed: CacheMap<String, u32> = CacheMap::with_ttl(&registry, 10, MINUTE, "timed").unwrap();
    plain.put("a".to_string(), 1);
    timed.put("b".to_string(), 2);

    let response = app.oneshot(post("/caches/purge", Body::empty())).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["cleared"], 2);
    assert!(plain.is_empty());
    assert!(timed.is_empty());
}

// == Shed Endpoint Tests ==

#[tokio::test]
async fn test_shed_endpoint_reclaims_oldest_first() {
    let (registry, app) = create_test_app();
    let cache: CacheMap<String, u32> = CacheMap::with_ttl(&registry, 10, MINUTE, "soft").unwrap();
    for (i, key) in ["a", "b", "c", "d"].iter().enumerate() {
        cache.put(key.to_string(), i as u32);
    }

    let response = app
        .oneshot(post("/caches/shed", Body::from(r#"{"fraction":0.5}"#)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["reclaimed"], 2);
    assert_eq!(json["purged"], 2);
    assert_eq!(cache.keys(), vec!["c".to_string(), "d".to_string()]);
}

#[tokio::test]
async fn test_shed_endpoint_rejects_bad_fraction() {
    let (_registry, app) = create_test_app();

    let response = app
        .oneshot(post("/caches/shed", Body::from(r#"{"fraction":0}"#)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json.get("error").is_some());
}

#[tokio::test]
async fn test_invalid_json_request() {
    let (_registry, app) = create_test_app();

    let response = app
        .oneshot(post("/caches/shed", Body::from(r#"{"invalid json"#)))
        .await
        .unwrap();

    // Axum returns 400 for syntax errors and 422 for shape errors
    assert!(
        response.status() == StatusCode::BAD_REQUEST
            || response.status() == StatusCode::UNPROCESSABLE_ENTITY
    );
}

// == Transaction Stats Tests ==

#[tokio::test]
async fn test_reset_transaction_stats_endpoint() {
    let (registry, app) = create_test_app();
    let cache: CacheMap<String, u32> = CacheMap::new(&registry, 10, "scoped");
    cache.get("x");
    cache.get("y");

    let response = app
        .oneshot(post("/caches/transaction-stats/reset", Body::empty()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["reset"], 1);
    assert_eq!(cache.transaction_cache_stats().misses, 0);
    assert_eq!(cache.cache_stats().misses, 2);
}
