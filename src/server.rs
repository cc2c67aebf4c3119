use axum::{
    extract::{rejection::JsonRejection, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use hyper::Server;
use metrics_exporter_prometheus::PrometheusHandle;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};

use crate::app::{LeadCapture, SubmissionGate};
use crate::constants::SEND_PDF_ROUTE;
use crate::domain::SubmissionRequest;
use crate::error::RelayError;
use crate::metrics;

#[derive(Clone)]
pub struct AppState {
    pub capture: Arc<LeadCapture>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(capture: Arc<LeadCapture>) -> Self {
        Self {
            capture,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: Option<PrometheusHandle>) -> Self {
        self.metrics = handle;
        self
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status_code(), self.public_message()).into_response()
    }
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "lead-relay",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn metrics_endpoint(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// `POST /api/send-pdf`: 200 with an empty body once both side effects succeed.
async fn send_pdf(
    State(state): State<AppState>,
    payload: Result<Json<SubmissionRequest>, JsonRejection>,
) -> Result<StatusCode, RelayError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(error = %rejection, "Unreadable submission body");
        metrics::record_submission("invalid");
        RelayError::Validation(rejection.to_string())
    })?;
    state.capture.submit(request).await?;
    Ok(StatusCode::OK)
}

/// Create the HTTP router with all routes
pub fn create_server(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_endpoint))
        .route(SEND_PDF_ROUTE, post(send_pdf))
        .with_state(state)
        .layer(ServiceBuilder::new().layer(cors))
}

/// Periodically drop expired cooldown entries so idle keys do not linger.
pub fn spawn_sweeper(gate: Arc<SubmissionGate>, every: Duration) -> JoinHandle<()> {
    let every = every.max(Duration::from_millis(10));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = gate.sweep_now();
            metrics::record_cooldown_entries(gate.len());
            if removed > 0 {
                debug!(removed, "Background sweep cleared cooldown entries");
            }
        }
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Start the HTTP server on the specified port
pub async fn start_server(state: AppState, port: u16) -> anyhow::Result<()> {
    let app = create_server(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!("Server running on http://localhost:{port}");
    info!("Submissions: POST http://localhost:{port}{SEND_PDF_ROUTE}");

    Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
