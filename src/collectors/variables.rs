//! Variable Metrics Collector
//!
//! Publishes the full variable set of each UPS: a catch-all gauge for every
//! numeric variable, dedicated gauges for well-known variables, and info
//! metrics carrying device and driver metadata.
//!
//! # Metrics Produced
//! - `upsmon_variable_value` - Raw value of any numeric variable
//!   - Labels: server, ups, variable
//! - `upsmon_<variable>` - Dedicated gauges such as `upsmon_battery_charge`
//!   (see [`VARIABLE_GAUGES`](crate::metrics::VARIABLE_GAUGES))
//!   - Labels: server, ups
//! - `upsmon_ups_info` - Device metadata, value is always 1
//!   - Labels: server, ups, description, model, mfr, serial
//! - `upsmon_ups_driver_info` - Driver metadata, value is always 1
//!   - Labels: server, ups, name, version
//! - `upsmon_input_transfer_reason_info`, `upsmon_ups_test_result_info`,
//!   `upsmon_ups_alarm_info` - Text-valued state in labels, value always 1,
//!   each absent when the UPS does not report the variable
//!
//! When a UPS does not report `ups.power`, apparent power is derived from
//! `ups.realpower.nominal` and `ups.load`. The derived value only feeds the
//! dedicated `upsmon_ups_power` gauge; `upsmon_variable_value` carries
//! daemon-reported values exclusively.

use super::{CollectionContext, CollectionResult, CollectionStatus};
use crate::metrics::MetricsCollector;
use crate::nut::types::{UpsDevice, Variable};
use tracing::{debug, info, warn};

/// Collects variable gauges and info metrics for every UPS.
pub async fn collect_variable_metrics(ctx: &CollectionContext<'_>) -> CollectionResult {
    let server = ctx.client.name();

    let devices = match ctx.client.list_devices().await {
        Ok(devices) => devices,
        Err(e) => {
            warn!("Failed to list UPS devices on {}: {}", server, e);
            return Ok(CollectionStatus::Failed);
        }
    };

    let mut variable_count = 0;
    for device in &devices {
        let variables = match ctx.client.list_variables(&device.name).await {
            Ok(variables) => variables,
            Err(e) => {
                warn!(
                    "Failed to list variables of {}@{}: {}",
                    device.name, server, e
                );
                ctx.metrics
                    .scrape_errors_total
                    .with_label_values(&[server, &device.name])
                    .inc();
                continue;
            }
        };
        debug!(
            "{}: {} reports {} variables",
            server,
            device.name,
            variables.len()
        );
        variable_count += variables.len();
        update_variable_metrics(ctx.metrics, server, device, &variables);
    }

    info!(
        "Updated variable metrics for {} ({} variables across {} UPS devices)",
        server,
        variable_count,
        devices.len()
    );
    Ok(CollectionStatus::Success)
}

/// Applies one variable listing to the registry.
///
/// Non-numeric variables only contribute to the info metrics; they are
/// served raw over the REST API instead of being forced into gauges.
pub fn update_variable_metrics(
    metrics: &MetricsCollector,
    server: &str,
    device: &UpsDevice,
    variables: &[Variable],
) {
    let ups = device.name.as_str();
    let lookup = |name: &str| {
        variables
            .iter()
            .find(|v| v.name == name)
            .map(|v| v.raw.as_str())
            .unwrap_or("")
    };

    // Drivers without the ups.* aliases still report the device.* namespace
    let fallback = |primary: &str, secondary: &str| {
        let value = lookup(primary);
        if value.is_empty() {
            lookup(secondary)
        } else {
            value
        }
    };

    metrics
        .ups_info
        .with_label_values(&[
            server,
            ups,
            &device.description,
            fallback("ups.model", "device.model"),
            fallback("ups.mfr", "device.mfr"),
            fallback("ups.serial", "device.serial"),
        ])
        .set(1);
    metrics
        .driver_info
        .with_label_values(&[
            server,
            ups,
            lookup("driver.name"),
            lookup("driver.version"),
        ])
        .set(1);

    // Text-valued state: one info series each, only while the UPS reports it
    let text_infos = [
        (&metrics.transfer_reason_info, "input.transfer.reason"),
        (&metrics.test_result_info, "ups.test.result"),
        (&metrics.alarm_info, "ups.alarm"),
    ];
    for (gauge, varname) in text_infos {
        let value = lookup(varname);
        if !value.is_empty() {
            gauge.with_label_values(&[server, ups, value]).set(1);
        }
    }

    let mut load = None;
    let mut realpower_nominal = None;
    let mut has_power = false;

    for var in variables {
        if var.name == "ups.power" {
            has_power = true;
        }
        let Some(value) = var.numeric() else { continue };
        match var.name.as_str() {
            "ups.load" => load = Some(value),
            "ups.realpower.nominal" => realpower_nominal = Some(value),
            _ => {}
        }
        metrics
            .variable_value
            .with_label_values(&[server, ups, &var.name])
            .set(value);
        if let Some(gauge) = metrics.named_gauge(&var.name) {
            gauge.with_label_values(&[server, ups]).set(value);
        }
    }

    if !has_power {
        if let (Some(load), Some(nominal)) = (load, realpower_nominal) {
            if let Some(gauge) = metrics.named_gauge("ups.power") {
                gauge
                    .with_label_values(&[server, ups])
                    .set(nominal / 100.0 * load);
            }
        }
    }
}
