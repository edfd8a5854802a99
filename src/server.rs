//! HTTP Server: REST API and Prometheus Metrics
//!
//! This module implements the HTTP front end: a Prometheus scrape endpoint
//! plus a small REST API over the state of the monitored NUT daemons.
//!
//! # Architecture
//!
//! - **HTTP Server**: Axum-based server exposing `/metrics`, `/health`, the
//!   REST routes under `/servers`, and a `/` landing page
//! - **On-demand Collection**: Every `/metrics` scrape polls all configured
//!   daemons, so Prometheus always sees fresh values and controls the
//!   polling cadence through its own scrape interval
//! - **State Management**: Shared state (config, metrics, clients) using Arc
//!   for thread-safety
//!
//! # Endpoints
//!
//! - `GET /` - HTML landing page with links to the other endpoints
//! - `GET /metrics` - Prometheus metrics in text format
//! - `GET /health` - Reachability of every daemon (200 all up, 503 otherwise)
//! - `GET /servers` - Configured server names
//! - `GET /servers/{server}/ups` - UPS devices on one server
//! - `GET /servers/{server}/ups/{ups}` - Description, status and clients
//! - `GET /servers/{server}/ups/{ups}/status` - Raw status string plus flags
//! - `GET /servers/{server}/ups/{ups}/statistics` - All variables, raw
//! - `GET /servers/{server}/ups/{ups}/variables/{variable}` - One variable
//!   with its typed value and metadata
//!
//! # Error Handling
//!
//! REST handlers translate [`ExporterError`] into HTTP statuses: unknown
//! server/UPS/variable become 404, daemon access refusals 403, unreachable
//! or timed-out daemons 503, and protocol-level surprises 502. The body is
//! always a JSON object with an `error` message.

use crate::collectors;
use crate::config::Config;
use crate::error::ExporterError;
use crate::metrics::MetricsCollector;
use crate::nut::types::{StatusFlags, TypedValue, UpsDevice, VarType};
use crate::nut::NutClient;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Clone)]
struct AppState {
    config: Config,
    metrics: MetricsCollector,
    clients: Arc<Vec<Arc<NutClient>>>,
}

impl AppState {
    fn client(&self, server: &str) -> Result<&Arc<NutClient>, ExporterError> {
        self.clients
            .iter()
            .find(|client| client.name() == server)
            .ok_or_else(|| ExporterError::ServerNotFound(server.to_string()))
    }
}

impl IntoResponse for ExporterError {
    fn into_response(self) -> Response {
        let status = match &self {
            ExporterError::ServerNotFound(_)
            | ExporterError::DeviceNotFound(_)
            | ExporterError::VariableNotFound(_) => StatusCode::NOT_FOUND,
            ExporterError::AccessDenied(_) => StatusCode::FORBIDDEN,
            ExporterError::ConnectionFailed(_) | ExporterError::Timeout(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ExporterError::MalformedResponse(_) | ExporterError::Daemon { .. } => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub async fn start(config: Config) -> anyhow::Result<()> {
    let metrics = MetricsCollector::new()?;

    let mut clients = Vec::with_capacity(config.monitors.len());
    for monitor in &config.monitors {
        let client = Arc::new(NutClient::new(monitor.clone()));
        if monitor.eager_connect {
            if let Err(e) = client.ping().await {
                warn!(
                    "Initial connection to {} failed (will retry on demand): {}",
                    client.name(),
                    e
                );
            }
        }
        clients.push(client);
    }

    let state = AppState {
        config: config.clone(),
        metrics,
        clients: Arc::new(clients),
    };

    // Build the router
    let app = Router::new()
        .route("/", get(root_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .route("/servers", get(list_servers_handler))
        .route("/servers/{server}/ups", get(list_ups_handler))
        .route("/servers/{server}/ups/{ups}", get(ups_detail_handler))
        .route("/servers/{server}/ups/{ups}/status", get(status_handler))
        .route(
            "/servers/{server}/ups/{ups}/statistics",
            get(statistics_handler),
        )
        .route(
            "/servers/{server}/ups/{ups}/variables/{variable}",
            get(variable_handler),
        )
        .with_state(state.clone());

    // Start the server
    let addr = format!("{}:{}", config.server.addr, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Monitor listening on {}", addr);
    info!("Metrics available at http://{}/metrics", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Tell the daemons we are leaving before the sockets drop
    for client in state.clients.iter() {
        client.close().await;
    }
    info!("Shut down cleanly");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

async fn root_handler() -> Html<&'static str> {
    Html(
        r#"<html>
<head><title>NUT Monitor</title></head>
<body>
<h1>NUT Monitor</h1>
<p><a href="/metrics">Metrics</a></p>
<p><a href="/health">Health</a></p>
<p><a href="/servers">Servers</a></p>
</body>
</html>"#,
    )
}

/// Polls every daemon, then renders the registry. Collection failures show
/// up inside the metrics themselves (`upsmon_up`, `upsmon_scrape_errors_total`),
/// never as a failed scrape.
async fn metrics_handler(State(state): State<AppState>) -> Response {
    collectors::collect_all(&state.clients, &state.metrics, &state.config.metrics).await;

    match state.metrics.render() {
        Ok(metrics) => metrics.into_response(),
        Err(e) => {
            error!("Failed to render metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error rendering metrics: {}", e),
            )
                .into_response()
        }
    }
}

#[derive(Serialize)]
struct ServerHealth {
    name: String,
    reachable: bool,
    consecutive_failures: u32,
}

async fn health_handler(State(state): State<AppState>) -> Response {
    let mut servers = Vec::with_capacity(state.clients.len());
    let mut all_ok = true;

    for client in state.clients.iter() {
        let reachable = match client.ping().await {
            Ok(()) => true,
            Err(e) => {
                warn!("Health check failed for {}: {}", client.name(), e);
                all_ok = false;
                false
            }
        };
        servers.push(ServerHealth {
            name: client.name().to_string(),
            reachable,
            consecutive_failures: client.consecutive_failures(),
        });
    }

    let status = if all_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let body = json!({
        "status": if all_ok { "ok" } else { "degraded" },
        "servers": servers,
    });
    (status, Json(body)).into_response()
}

async fn list_servers_handler(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(
        state
            .clients
            .iter()
            .map(|client| client.name().to_string())
            .collect(),
    )
}

async fn list_ups_handler(
    State(state): State<AppState>,
    Path(server): Path<String>,
) -> Result<Json<Vec<UpsDevice>>, ExporterError> {
    let client = state.client(&server)?;
    Ok(Json(client.list_devices().await?))
}

#[derive(Serialize)]
struct UpsDetail {
    name: String,
    description: String,
    status: StatusFlags,
    clients: Vec<String>,
}

async fn ups_detail_handler(
    State(state): State<AppState>,
    Path((server, ups)): Path<(String, String)>,
) -> Result<Json<UpsDetail>, ExporterError> {
    let client = state.client(&server)?;
    let description = client.device_description(&ups).await?;
    let status = client.get_status(&ups).await?;
    // Older daemons reject LIST CLIENT; the rest of the detail still stands.
    let clients = match client.list_clients(&ups).await {
        Ok(clients) => clients,
        Err(e) => {
            warn!("Failed to list clients of {}@{}: {}", ups, server, e);
            Vec::new()
        }
    };

    Ok(Json(UpsDetail {
        name: ups,
        description,
        status,
        clients,
    }))
}

#[derive(Serialize)]
struct StatusResponse {
    raw: String,
    flags: StatusFlags,
}

async fn status_handler(
    State(state): State<AppState>,
    Path((server, ups)): Path<(String, String)>,
) -> Result<Json<StatusResponse>, ExporterError> {
    let client = state.client(&server)?;
    let variable = client.get_variable(&ups, "ups.status").await?;
    let flags = StatusFlags::parse(&variable.raw);
    Ok(Json(StatusResponse {
        raw: variable.raw,
        flags,
    }))
}

/// Every variable of one UPS as a flat `name -> raw value` map.
async fn statistics_handler(
    State(state): State<AppState>,
    Path((server, ups)): Path<(String, String)>,
) -> Result<Json<BTreeMap<String, String>>, ExporterError> {
    let client = state.client(&server)?;
    let variables = client.list_variables(&ups).await?;
    Ok(Json(
        variables.into_iter().map(|v| (v.name, v.raw)).collect(),
    ))
}

#[derive(Serialize)]
struct VariableResponse {
    name: String,
    raw: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<TypedValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value_issue: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    var_type: Option<VarType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

async fn variable_handler(
    State(state): State<AppState>,
    Path((server, ups, variable)): Path<(String, String, String)>,
) -> Result<Json<VariableResponse>, ExporterError> {
    let client = state.client(&server)?;
    let var = client.get_variable(&ups, &variable).await?;
    let description = match client.variable_description(&ups, &variable).await {
        Ok(description) => Some(description),
        Err(e) => {
            debug!("No description for {} on {}@{}: {}", variable, ups, server, e);
            None
        }
    };

    let (value, value_issue) = match var.typed() {
        Some(Ok(value)) => (Some(value), None),
        Some(Err(issue)) => (None, Some(issue.to_string())),
        None => (None, None),
    };

    Ok(Json(VariableResponse {
        name: var.name,
        raw: var.raw,
        value,
        value_issue,
        var_type: var.var_type,
        description,
    }))
}
