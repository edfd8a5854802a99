//! Status Metrics Collector
//!
//! Tracks the operational state of each UPS: status flags plus the beeper
//! and charger state machines.
//!
//! # Metrics Produced
//! - `upsmon_ups_status` - UPS status flags, 1 when the flag is active
//!   - Labels: server, ups, flag
//! - `upsmon_ups_beeper_status` - Beeper state, 1 for the current state
//!   - Labels: server, ups, status
//! - `upsmon_battery_charger_status` - Charger state, 1 for the current state
//!   - Labels: server, ups, status
//!
//! Status flags come from `ups.status`, a space-separated token list
//! (`OL`, `OB CHRG`, ...). Every well-known flag is published as 0 or 1 so
//! absence is visible; tokens outside the known set are published as 1
//! under their own label rather than dropped.

use super::{CollectionContext, CollectionResult, CollectionStatus};
use crate::error::ExporterError;
use crate::metrics::{MetricsCollector, BEEPER_STATES, CHARGER_STATES, KNOWN_STATUS_FLAGS};
use crate::nut::types::StatusFlags;
use prometheus::GaugeVec;
use tracing::{debug, info, warn};

/// Collects status flag and beeper/charger state metrics for every UPS.
pub async fn collect_status_metrics(ctx: &CollectionContext<'_>) -> CollectionResult {
    let server = ctx.client.name();

    let devices = match ctx.client.list_devices().await {
        Ok(devices) => devices,
        Err(e) => {
            warn!("Failed to list UPS devices on {}: {}", server, e);
            return Ok(CollectionStatus::Failed);
        }
    };

    for device in &devices {
        match ctx.client.get_status(&device.name).await {
            Ok(flags) => update_status_flags(ctx.metrics, server, &device.name, &flags),
            Err(e) => {
                warn!("Failed to read status of {}@{}: {}", device.name, server, e);
                ctx.metrics
                    .scrape_errors_total
                    .with_label_values(&[server, &device.name])
                    .inc();
                continue;
            }
        }

        update_enum_status(
            ctx,
            &device.name,
            "ups.beeper.status",
            &ctx.metrics.beeper_status,
            BEEPER_STATES,
        )
        .await;
        update_enum_status(
            ctx,
            &device.name,
            "battery.charger.status",
            &ctx.metrics.charger_status,
            CHARGER_STATES,
        )
        .await;
    }

    info!(
        "Updated status metrics for {} ({} UPS devices)",
        server,
        devices.len()
    );
    Ok(CollectionStatus::Success)
}

/// Publishes one gauge sample per status flag.
///
/// Known flags always get a sample so a flag dropping back to 0 is
/// observable. Unknown tokens are forwarded verbatim with value 1.
pub fn update_status_flags(
    metrics: &MetricsCollector,
    server: &str,
    ups: &str,
    flags: &StatusFlags,
) {
    for &flag in KNOWN_STATUS_FLAGS {
        let value = if flags.contains(flag) { 1.0 } else { 0.0 };
        metrics
            .status
            .with_label_values(&[server, ups, flag])
            .set(value);
    }
    for flag in flags.iter() {
        if !KNOWN_STATUS_FLAGS.contains(&flag) {
            metrics
                .status
                .with_label_values(&[server, ups, flag])
                .set(1.0);
        }
    }
}

/// Renders a single-valued state variable as one gauge sample per state.
///
/// Declared states are published as 0 or 1; a current state outside the
/// declared set still gets its own sample with value 1.
pub fn set_enum_states(
    gauge: &GaugeVec,
    server: &str,
    ups: &str,
    declared: &[&str],
    current: &str,
) {
    let mut matched = false;
    for &state in declared {
        let value = if state == current {
            matched = true;
            1.0
        } else {
            0.0
        };
        gauge.with_label_values(&[server, ups, state]).set(value);
    }
    if !matched && !current.is_empty() {
        gauge.with_label_values(&[server, ups, current]).set(1.0);
    }
}

async fn update_enum_status(
    ctx: &CollectionContext<'_>,
    ups: &str,
    varname: &str,
    gauge: &GaugeVec,
    declared: &[&str],
) {
    let server = ctx.client.name();
    match ctx.client.get_variable(ups, varname).await {
        Ok(var) => set_enum_states(gauge, server, ups, declared, var.raw.trim()),
        Err(ExporterError::VariableNotFound(_)) => {
            debug!("{}@{} does not report {}", ups, server, varname);
        }
        Err(e) => {
            warn!("Failed to read {} of {}@{}: {}", varname, ups, server, e);
            ctx.metrics
                .scrape_errors_total
                .with_label_values(&[server, ups])
                .inc();
        }
    }
}
