//! Route-level tests for the HTTP surface, driven through `tower::ServiceExt`
//! without binding a socket.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use quotalink::{
    config::AppConfig, handlers, models::LinkSummary, service::LinkService, store::LinkStore,
    AppState,
};
use serde_json::{json, Value};
use tower::ServiceExt;

fn app() -> Router {
    let config = AppConfig::from_lookup(|_| None).expect("defaults are valid");
    let links = Arc::new(LinkService::new(LinkStore::new(), config.link_policy()));
    handlers::router(Arc::new(AppState::new(config, links)))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Value) {
    let response = app.clone().oneshot(request).await.expect("infallible");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, headers, body)
}

async fn new_owner(app: &Router) -> String {
    let (status, headers, body) = send(
        app,
        Request::post("/session").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let cookie = headers
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(cookie.starts_with("owner_id="));
    body["owner"].as_str().unwrap().to_owned()
}

fn json_request(method: Method, uri: &str, owner: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-owner-token", owner)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn owner_request(method: Method, uri: &str, owner: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, format!("owner_id={owner}"))
        .body(Body::empty())
        .unwrap()
}

async fn create(app: &Router, owner: &str, url: &str, limit: Option<i64>) -> (String, String) {
    let (status, _, body) = send(
        app,
        json_request(
            Method::POST,
            "/api/links",
            owner,
            json!({ "url": url, "limit": limit }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    (
        body["code"].as_str().unwrap().to_owned(),
        body["short_url"].as_str().unwrap().to_owned(),
    )
}

#[tokio::test]
async fn health_is_open() {
    let app = app();
    let (status, _, _) = send(&app, Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn owner_routes_require_an_issued_token() {
    let app = app();
    let (status, _, _) = send(
        &app,
        Request::get("/api/links").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let forged = quotalink::models::OwnerId::generate().to_string();
    let (status, _, _) = send(&app, owner_request(Method::GET, "/api/links", &forged)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_then_redirect_until_quota_runs_out() {
    let app = app();
    let owner = new_owner(&app).await;
    let (code, short_url) = create(&app, &owner, "https://example.com", Some(1)).await;
    assert_eq!(short_url, format!("clck.ru/{code}"));

    let (status, headers, _) = send(
        &app,
        Request::get(format!("/{code}")).body(Body::empty()).unwrap(),
    )
    .await;
    assert!(status.is_redirection());
    assert_eq!(headers[header::LOCATION], "https://example.com");

    let (status, _, body) = send(
        &app,
        Request::get(format!("/{code}")).body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(body["error"].as_str().unwrap().contains(&code));

    let (status, _, body) = send(&app, owner_request(Method::GET, "/api/links", &owner)).await;
    assert_eq!(status, StatusCode::OK);
    let rows: Vec<LinkSummary> = serde_json::from_value(body).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!((rows[0].visits, rows[0].max_visits), (1, 1));
}

#[tokio::test]
async fn blank_url_is_rejected() {
    let app = app();
    let owner = new_owner(&app).await;
    let (status, _, _) = send(
        &app,
        json_request(Method::POST, "/api/links", &owner, json!({ "url": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_and_limit_are_owner_gated() {
    let app = app();
    let owner_a = new_owner(&app).await;
    let owner_b = new_owner(&app).await;
    let (code, _) = create(&app, &owner_a, "https://example.com", None).await;

    let limit_uri = format!("/api/links/{code}/limit");
    let (status, _, _) = send(
        &app,
        json_request(Method::PUT, &limit_uri, &owner_b, json!({ "limit": 9 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, _) = send(
        &app,
        json_request(Method::PUT, &limit_uri, &owner_a, json!({ "limit": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = send(
        &app,
        json_request(Method::PUT, &limit_uri, &owner_a, json!({ "limit": 9 })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let link_uri = format!("/api/links/{code}");
    let (status, _, _) = send(&app, owner_request(Method::DELETE, &link_uri, &owner_b)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, _) = send(&app, owner_request(Method::DELETE, &link_uri, &owner_a)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _, _) = send(
        &app,
        Request::get(format!("/{code}")).body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = send(&app, owner_request(Method::DELETE, &link_uri, &owner_a)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn listings_are_scoped_to_the_caller() {
    let app = app();
    let owner_a = new_owner(&app).await;
    let owner_b = new_owner(&app).await;
    create(&app, &owner_a, "https://same.example", None).await;
    create(&app, &owner_b, "https://same.example", None).await;
    create(&app, &owner_b, "https://other.example", Some(2)).await;

    let (_, _, body) = send(&app, owner_request(Method::GET, "/api/links", &owner_a)).await;
    let rows: Vec<LinkSummary> = serde_json::from_value(body).unwrap();
    assert_eq!(rows.len(), 1);

    let (_, _, body) = send(&app, owner_request(Method::GET, "/api/links", &owner_b)).await;
    let rows: Vec<LinkSummary> = serde_json::from_value(body).unwrap();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn unusable_redirect_target_does_not_cost_a_visit() {
    let config = AppConfig::from_lookup(|_| None).expect("defaults are valid");
    let links = Arc::new(LinkService::new(LinkStore::new(), config.link_policy()));
    let code = links
        .create(
            "https://example.com/\nbroken",
            quotalink::models::OwnerId::generate(),
            Some(2),
        )
        .unwrap();
    let app = handlers::router(Arc::new(AppState::new(config, links.clone())));

    for _ in 0..3 {
        let (status, _, _) = send(
            &app,
            Request::get(format!("/{code}")).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }
    assert_eq!(links.store().get(&code).unwrap().current_visits(), 0);
}
