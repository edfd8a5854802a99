//! Device Metrics Collector
//!
//! Enumerates the UPS devices a daemon manages and, when enabled, how many
//! clients are attached to each.
//!
//! # Metrics Produced
//! - `upsmon_clients_connected` - Clients attached to the UPS
//!   - Labels: server, ups
//!
//! The per-server `upsmon_up` gauge is set by the orchestrator in
//! [`collect_server`](super::collect_server) from overall success.

use super::{CollectionContext, CollectionResult, CollectionStatus};
use tracing::{debug, info, warn};

/// Lists UPS devices and collects per-device client counts.
///
/// An empty device list is a valid daemon state and counts as success.
/// A failing `LIST CLIENT` for one device increments its error counter and
/// moves on to the next device.
pub async fn collect_device_metrics(ctx: &CollectionContext<'_>) -> CollectionResult {
    let server = ctx.client.name();

    let devices = match ctx.client.list_devices().await {
        Ok(devices) => devices,
        Err(e) => {
            warn!("Failed to list UPS devices on {}: {}", server, e);
            return Ok(CollectionStatus::Failed);
        }
    };

    for device in &devices {
        debug!(
            "{}: found UPS {} ({})",
            server, device.name, device.description
        );

        if !ctx.config.collect_client_metrics {
            continue;
        }
        match ctx.client.list_clients(&device.name).await {
            Ok(clients) => {
                ctx.metrics
                    .clients_connected
                    .with_label_values(&[server, &device.name])
                    .set(clients.len() as i64);
            }
            Err(e) => {
                warn!("Failed to list clients of {}@{}: {}", device.name, server, e);
                ctx.metrics
                    .scrape_errors_total
                    .with_label_values(&[server, &device.name])
                    .inc();
            }
        }
    }

    info!(
        "Updated device metrics for {} ({} UPS devices)",
        server,
        devices.len()
    );
    Ok(CollectionStatus::Success)
}
