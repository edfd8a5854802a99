//! Metrics Collectors
//!
//! One collector per slice of daemon state: device counts, status flags,
//! the variable set. Each takes a [`CollectionContext`], queries its slice
//! through the NUT client and writes the result into the shared registry,
//! reporting `Success` or an already-logged `Failed`.
//!
//! Collection happens per scrape: the `/metrics` handler calls
//! [`collect_all`], which clears the per-scrape series and polls every
//! configured server concurrently. Within one server, collectors run in
//! sequence since the daemon connection serializes exchanges anyway.
//!
//! Failures stay non-fatal at every level. A dead server leaves its `up`
//! gauge at 0; a failing device increments `scrape_errors_total` and the
//! scrape carries on with the remaining devices. Partial data with an
//! explicit error indicator beats no data.

use std::sync::Arc;

use tracing::error;

use crate::config::MetricsConfig;
use crate::metrics::MetricsCollector;
use crate::nut::NutClient;

/// Everything a collector needs for one server, borrowed for the duration
/// of the scrape.
#[derive(Clone, Copy)]
pub struct CollectionContext<'a> {
    /// NUT client for the server being collected
    pub client: &'a NutClient,
    /// Registry the collectors write into
    pub metrics: &'a MetricsCollector,
    /// Feature flags selecting which collectors run
    pub config: &'a MetricsConfig,
}

/// Outcome of one collector run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionStatus {
    /// The daemon answered and the registry was updated
    Success,
    /// The query failed; a warning is already logged and the scrape goes on
    Failed,
}

/// Collector return type. `Err` is reserved for faults that should abort
/// the scrape; a daemon that cannot be queried is `Ok(Failed)`, not `Err`.
pub type CollectionResult = Result<CollectionStatus, anyhow::Error>;

/// Refreshes all metrics from every configured server. Servers are polled
/// concurrently; each has its own connection so they cannot stall each
/// other. Called once per `/metrics` scrape.
pub async fn collect_all(
    clients: &[Arc<NutClient>],
    metrics: &MetricsCollector,
    config: &MetricsConfig,
) {
    metrics.reset();

    let mut tasks = tokio::task::JoinSet::new();
    for client in clients {
        let client = Arc::clone(client);
        let metrics = metrics.clone();
        let config = config.clone();
        tasks.spawn(async move {
            let ctx = CollectionContext {
                client: &client,
                metrics: &metrics,
                config: &config,
            };
            collect_server(&ctx).await;
        });
    }
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            error!("Collection task failed: {}", e);
        }
    }
}

/// Runs the enabled collectors against one server and sets its `up` gauge:
/// 1 when any collector got data out of the daemon, 0 when none did.
pub async fn collect_server(ctx: &CollectionContext<'_>) {
    let mut any_success = false;

    macro_rules! collect {
        ($collector:expr) => {
            match $collector.await {
                Ok(CollectionStatus::Success) => any_success = true,
                Ok(CollectionStatus::Failed) => { /* Already logged */ }
                Err(e) => error!("Collector error on {}: {}", ctx.client.name(), e),
            }
        };
    }

    collect!(device::collect_device_metrics(ctx));

    if ctx.config.collect_status_metrics {
        collect!(status::collect_status_metrics(ctx));
    }

    if ctx.config.collect_variable_metrics {
        collect!(variables::collect_variable_metrics(ctx));
    }

    let up_value = if any_success { 1.0 } else { 0.0 };
    ctx.metrics
        .up
        .with_label_values(&[ctx.client.name()])
        .set(up_value);
}

// Collector modules
pub mod device;
pub mod status;
pub mod variables;

// Re-export collector functions for convenient access
pub use device::collect_device_metrics;
pub use status::collect_status_metrics;
pub use variables::collect_variable_metrics;
