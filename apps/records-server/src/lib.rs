use anyhow::Context;
use axum::{
    Router,
    extract::{Request, State},
    http::{
        HeaderValue, Method, StatusCode, Uri, header,
        uri::PathAndQuery,
    },
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{MethodRouter, get},
};
use record_store::{RecordStore, seed_store};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::signal;
use tracing::{error, info};

pub mod auth;
pub mod envelope;
pub mod handlers;
pub mod metrics;
pub mod open_telemetry;

use auth::{Credentials, auth_middleware};
use handlers::{
    create_record, delete_record, get_record, list_records, route_not_found, update_record,
};
use metrics::Metrics;

/// Collection names the record routes are served under. `transactions` is
/// the name older SMS dashboard clients use.
pub const RESOURCES: [&str; 2] = ["records", "transactions"];

const ALLOW_ORIGIN: &str = "*";
const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, Authorization";

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RecordStore>,
    pub credentials: Arc<Credentials>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(store: RecordStore, credentials: Credentials, metrics: Metrics) -> Self {
        Self {
            store: Arc::new(store),
            credentials: Arc::new(credentials),
            metrics: Arc::new(metrics),
        }
    }
}

// --- Configuration ---

#[derive(Debug)]
pub struct Config {
    pub listen_addr: String,
    pub source_path: PathBuf,
    pub credentials: Credentials,
    pub otlp_endpoint: Option<String>,
}

pub fn load_config() -> Config {
    Config {
        listen_addr: std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string()),
        source_path: PathBuf::from(
            std::env::var("RECORDS_SOURCE_FILE")
                .unwrap_or_else(|_| "data/sms_data.json".to_string()),
        ),
        credentials: Credentials::new(
            std::env::var("RECORDS_AUTH_USER").unwrap_or_else(|_| "admin".to_string()),
            std::env::var("RECORDS_AUTH_PASS").unwrap_or_else(|_| "password123".to_string()),
        ),
        otlp_endpoint: std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
            .ok()
            .filter(|s| !s.is_empty()),
    }
}

// --- Router Setup ---

// `get` would otherwise answer HEAD as well.
fn collection_routes() -> MethodRouter<AppState> {
    get(list_records)
        .head(route_not_found)
        .post(create_record)
        .fallback(route_not_found)
}

fn item_routes() -> MethodRouter<AppState> {
    get(get_record)
        .head(route_not_found)
        .put(update_record)
        .delete(delete_record)
        .fallback(route_not_found)
}

pub fn create_app(state: AppState) -> Router {
    let mut router = Router::new();
    for resource in RESOURCES {
        router = router
            .route(&format!("/{resource}"), collection_routes())
            .route(&format!("/{resource}/:id"), item_routes());
    }

    let api = router
        .fallback(route_not_found)
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), metrics_middleware))
        .layer(middleware::from_fn(cors_middleware))
        .with_state(state);

    // Layers on a router run after route matching, so the path is trimmed in
    // an outer router whose only target is the API.
    Router::new()
        .fallback_service(api)
        .layer(middleware::map_request(normalize_path))
}

// --- Server Lifecycle ---

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = load_config();

    let telemetry = open_telemetry::init_tracing(config.otlp_endpoint.as_deref())
        .context("Failed to initialize tracing")?;
    let (meter_provider, metrics) = metrics::init_metrics(config.otlp_endpoint.as_deref())
        .context("Failed to initialize metrics")?;

    info!("Starting records server...");

    let store = RecordStore::new();
    let seeded = seed_store(&store, &config.source_path);
    metrics.records_added(seeded);

    info!(
        user = %config.credentials.username(),
        records = seeded,
        "Record store ready"
    );

    let state = AppState::new(store, config.credentials, metrics);
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .context("Failed to bind port")?;

    info!(addr = %config.listen_addr, "Listening for requests");
    for route in [
        "GET    /records",
        "GET    /records/{id}",
        "POST   /records",
        "PUT    /records/{id}",
        "DELETE /records/{id}",
    ] {
        info!("  {}", route);
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Err(e) = meter_provider.shutdown() {
        error!(error = %e, "Failed to shutdown meter provider");
    }
    if let Err(e) = telemetry.shutdown() {
        error!(error = %e, "Failed to shutdown telemetry");
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Signal received, shutting down");
}

// --- Middleware ---

/// Leading and trailing separators are insignificant: `//records/` routes
/// like `/records`.
async fn normalize_path(mut req: Request) -> Request {
    if let Some(uri) = trimmed_uri(req.uri()) {
        *req.uri_mut() = uri;
    }
    req
}

fn trimmed_uri(uri: &Uri) -> Option<Uri> {
    let path = uri.path();
    let trimmed = path.trim_matches('/');
    if path.strip_prefix('/') == Some(trimmed) {
        return None;
    }

    let rebuilt = match uri.query() {
        Some(query) => format!("/{trimmed}?{query}"),
        None => format!("/{trimmed}"),
    };
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(rebuilt).ok()?);
    Uri::from_parts(parts).ok()
}

/// Answers preflights directly and stamps CORS headers on every response.
async fn cors_middleware(req: Request, next: Next) -> Response {
    let mut response = if req.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(req).await
    };

    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static(ALLOW_ORIGIN),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    response
}

async fn metrics_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let response = next.run(req).await;
    state
        .metrics
        .record_request(method.as_str(), response.status().as_u16(), start.elapsed());
    response
}
