//! Shared setup for the in-process API tests.
#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use http_body_util::BodyExt;
use record_store::RecordStore;
use records_server::{AppState, auth::Credentials, create_app, metrics};
use serde_json::Value;
use tower::ServiceExt; // for `oneshot`

pub const USER: &str = "admin";
pub const PASS: &str = "password123";

pub fn app_with_store(store: RecordStore) -> Router {
    let (_, m) = metrics::local_metrics();
    create_app(AppState::new(store, Credentials::new(USER, PASS), m))
}

pub fn empty_app() -> Router {
    app_with_store(RecordStore::new())
}

pub fn basic(user: &str, pass: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{user}:{pass}")))
}

pub fn authed(method: &str, uri: &str, body: Option<&str>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, basic(USER, PASS));
    match body {
        Some(text) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(text.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Sends one request through a clone of the router.
pub async fn send(app: &Router, req: Request<Body>) -> Response<Body> {
    app.clone().oneshot(req).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
