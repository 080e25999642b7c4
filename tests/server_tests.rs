use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use scrobble_station::config::Config;
use scrobble_station::server::create_router;
use serde_json::{Value, json};
use tempfile::{TempDir, tempdir};
use tower::ServiceExt;

fn test_app() -> (TempDir, Router) {
    let dir = tempdir().unwrap();
    let app = create_router(Config::rooted_at(dir.path()));
    (dir, app)
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_root_banner() {
    let (_dir, app) = test_app();
    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_analytics_missing_before_first_build() {
    let (_dir, app) = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/analytics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ingest_build_and_fetch() {
    let (_dir, app) = test_app();
    let payload = json!([
        {"artist": "X", "track": "Y", "listenedAt": 1700000000},
        {"artist": "", "track": "Z", "listenedAt": 1700000001},
        {"artist": "X", "track": "Y", "listenedAt": 1700000002}
    ]);

    let response = app
        .clone()
        .oneshot(post_json("/ingest", &payload.to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let report = body_json(response).await;
    assert_eq!(report["ingested"], 2);
    assert_eq!(report["skipped"], 1);

    let response = app
        .clone()
        .oneshot(post_json("/build", ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["processed"], 2);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/analytics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let snapshot = body_json(response).await;
    assert_eq!(snapshot["totals"]["scrobbles"], 2);
    assert_eq!(snapshot["topArtists"][0]["name"], "X");
    assert_eq!(snapshot["topArtists"][0]["count"], 2);
}

#[tokio::test]
async fn test_ingest_rejects_non_array_body() {
    let (dir, app) = test_app();
    let response = app
        .oneshot(post_json("/ingest", r#"{"artist": "X"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(!Config::rooted_at(dir.path()).log_path().exists());
}

#[tokio::test]
async fn test_ingest_rejects_invalid_json() {
    let (_dir, app) = test_app();
    let response = app
        .oneshot(post_json("/ingest", "[{\"artist\":"))
        .await
        .unwrap();
    assert!(response.status().is_client_error());
}
