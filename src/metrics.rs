//! Prometheus Metrics Definitions
//!
//! This module defines all Prometheus metrics exposed by the NUT monitor.
//!
//! # Metric Categories
//!
//! ## Scrape Health
//! - Daemon reachability (`up`) per configured server
//! - Per-device collection error counter
//!
//! ## Device Metadata
//! - UPS and driver info metrics (value is always 1, data in labels)
//! - Attached client count
//! - Text-valued state carried as info metrics: last transfer reason,
//!   self-test result and active alarm
//!
//! ## Status
//! - `ups.status` flags rendered one time series per flag (1=set, 0=clear);
//!   the well-known flags are always present, unknown flags appear when set
//! - Beeper and battery charger state
//!
//! ## Variables
//! - A curated table of well-known UPS variables under stable metric names
//!   (`battery.charge` → `upsmon_battery_charge`, and so on)
//! - A catch-all gauge carrying every numeric variable, labeled by device
//!   and variable name
//! - Apparent power derived from `ups.realpower.nominal` and `ups.load`
//!   when the driver does not report `ups.power` itself
//!
//! All metrics use the `upsmon_` namespace prefix and carry a `server`
//! label (the configured monitor name); device-scoped metrics add `ups`.

use prometheus::{Encoder, GaugeVec, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};
use std::collections::HashMap;
use std::sync::Arc;

const NAMESPACE: &str = "upsmon";

/// `ups.status` flags that are always rendered, set or clear. Flags outside
/// this list still show up with value 1 while the daemon reports them.
pub const KNOWN_STATUS_FLAGS: &[&str] = &[
    "OL", "OB", "LB", "HB", "RB", "CHRG", "DISCHRG", "BYPASS", "CAL", "OFF", "OVER", "TRIM",
    "BOOST", "FSD",
];

/// `ups.beeper.status` states rendered enum-style (current state 1, rest 0).
pub const BEEPER_STATES: &[&str] = &["enabled", "disabled", "muted"];

/// Core `battery.charger.status` states. Drivers report other values too;
/// those appear dynamically with value 1.
pub const CHARGER_STATES: &[&str] = &["charging", "discharging", "floating", "resting"];

/// Well-known UPS variables exported under their own metric names. The
/// metric name is the variable name with dots replaced by underscores.
pub const VARIABLE_GAUGES: &[(&str, &str)] = &[
    ("device.uptime", "Device uptime in seconds"),
    ("ups.load", "UPS load (percent)"),
    ("ups.temperature", "UPS temperature (degrees C)"),
    ("battery.charge", "Battery charge (percent)"),
    (
        "battery.charge.low",
        "Remaining battery level when UPS switches to LB (percent)",
    ),
    (
        "battery.charge.warning",
        "Battery level when UPS switches to \"Warning\" state (percent)",
    ),
    (
        "battery.charge.restart",
        "Minimum battery level for UPS restart after power-off",
    ),
    ("battery.runtime", "Remaining battery runtime (seconds)"),
    (
        "battery.runtime.low",
        "Remaining battery runtime when UPS switches to LB (seconds)",
    ),
    (
        "battery.runtime.restart",
        "Minimum battery runtime for UPS restart after power-off (seconds)",
    ),
    (
        "ups.delay.shutdown",
        "Interval to wait before shutting down the load (seconds)",
    ),
    (
        "ups.delay.start",
        "Interval to wait before restarting the load (seconds)",
    ),
    ("battery.voltage", "Battery voltage (V)"),
    ("battery.voltage.nominal", "Nominal battery voltage (V)"),
    ("battery.voltage.high", "Maximum battery voltage (V)"),
    ("battery.voltage.low", "Minimum battery voltage (V)"),
    ("battery.temperature", "Battery temperature (degrees C)"),
    ("input.voltage", "Input voltage (V)"),
    ("input.voltage.nominal", "Nominal input voltage (V)"),
    ("input.voltage.minimum", "Minimum incoming voltage seen (V)"),
    ("input.voltage.maximum", "Maximum incoming voltage seen (V)"),
    ("input.transfer.high", "High voltage transfer point (V)"),
    ("input.transfer.low", "Low voltage transfer point (V)"),
    ("input.current", "Input current (A)"),
    ("input.current.nominal", "Nominal input current (A)"),
    ("input.frequency", "Input line frequency (Hz)"),
    ("input.frequency.nominal", "Nominal input line frequency (Hz)"),
    ("input.frequency.low", "Input line frequency low (Hz)"),
    ("input.frequency.high", "Input line frequency high (Hz)"),
    ("output.voltage", "Output voltage (V)"),
    ("output.voltage.nominal", "Nominal output voltage (V)"),
    ("output.current", "Output current (A)"),
    ("output.current.nominal", "Nominal output current (A)"),
    ("output.frequency", "Output frequency (Hz)"),
    ("output.frequency.nominal", "Nominal output frequency (Hz)"),
    ("ups.power", "Current value of apparent power (Volt-Amps)"),
    ("ups.power.nominal", "Nominal value of apparent power (Volt-Amps)"),
    ("ups.realpower", "Current value of real power (Watts)"),
    ("ups.realpower.nominal", "Nominal value of real power (Watts)"),
];

/// Metrics collector for the NUT monitor
#[derive(Clone)]
pub struct MetricsCollector {
    registry: Arc<Registry>,

    // Scrape health
    pub up: Arc<GaugeVec>,
    pub scrape_errors_total: Arc<IntCounterVec>,

    // Device metadata
    pub ups_info: Arc<IntGaugeVec>,
    pub driver_info: Arc<IntGaugeVec>,
    pub clients_connected: Arc<IntGaugeVec>,
    pub transfer_reason_info: Arc<IntGaugeVec>,
    pub test_result_info: Arc<IntGaugeVec>,
    pub alarm_info: Arc<IntGaugeVec>,

    // Status
    pub status: Arc<GaugeVec>,
    pub beeper_status: Arc<GaugeVec>,
    pub charger_status: Arc<GaugeVec>,

    // Variables
    pub variable_value: Arc<GaugeVec>,
    named: Arc<HashMap<&'static str, GaugeVec>>,
}

impl MetricsCollector {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let up = GaugeVec::new(
            Opts::new("up", "Whether the upsd daemon is reachable (1=up, 0=down)")
                .namespace(NAMESPACE),
            &["server"],
        )?;

        let scrape_errors_total = IntCounterVec::new(
            Opts::new(
                "scrape_errors_total",
                "Collection failures per UPS device (scrape continues past them)",
            )
            .namespace(NAMESPACE),
            &["server", "ups"],
        )?;

        let ups_info = IntGaugeVec::new(
            Opts::new("ups_info", "UPS metadata (value is always 1)").namespace(NAMESPACE),
            &["server", "ups", "description", "model", "mfr", "serial"],
        )?;

        let driver_info = IntGaugeVec::new(
            Opts::new("ups_driver_info", "UPS driver metadata (value is always 1)")
                .namespace(NAMESPACE),
            &["server", "ups", "name", "version"],
        )?;

        let clients_connected = IntGaugeVec::new(
            Opts::new(
                "clients_connected",
                "Clients the daemon reports as attached to the UPS",
            )
            .namespace(NAMESPACE),
            &["server", "ups"],
        )?;

        let transfer_reason_info = IntGaugeVec::new(
            Opts::new(
                "input_transfer_reason_info",
                "Reason for the last transfer to battery (value is always 1)",
            )
            .namespace(NAMESPACE),
            &["server", "ups", "reason"],
        )?;

        let test_result_info = IntGaugeVec::new(
            Opts::new(
                "ups_test_result_info",
                "Result of the last UPS self-test (value is always 1)",
            )
            .namespace(NAMESPACE),
            &["server", "ups", "result"],
        )?;

        let alarm_info = IntGaugeVec::new(
            Opts::new(
                "ups_alarm_info",
                "Active UPS alarm text (value is always 1, absent when no alarm)",
            )
            .namespace(NAMESPACE),
            &["server", "ups", "alarm"],
        )?;

        let status = GaugeVec::new(
            Opts::new("ups_status", "UPS status flag (1=set, 0=clear)").namespace(NAMESPACE),
            &["server", "ups", "flag"],
        )?;

        let beeper_status = GaugeVec::new(
            Opts::new(
                "ups_beeper_status",
                "UPS beeper status (enabled, disabled or muted)",
            )
            .namespace(NAMESPACE),
            &["server", "ups", "status"],
        )?;

        let charger_status = GaugeVec::new(
            Opts::new("battery_charger_status", "Battery charger status").namespace(NAMESPACE),
            &["server", "ups", "status"],
        )?;

        let variable_value = GaugeVec::new(
            Opts::new(
                "variable_value",
                "Raw value of any numeric UPS variable reported by the daemon",
            )
            .namespace(NAMESPACE),
            &["server", "ups", "variable"],
        )?;

        let mut named = HashMap::with_capacity(VARIABLE_GAUGES.len());
        for &(varname, help) in VARIABLE_GAUGES {
            let gauge = GaugeVec::new(
                Opts::new(varname.replace('.', "_"), help).namespace(NAMESPACE),
                &["server", "ups"],
            )?;
            registry.register(Box::new(gauge.clone()))?;
            named.insert(varname, gauge);
        }

        registry.register(Box::new(up.clone()))?;
        registry.register(Box::new(scrape_errors_total.clone()))?;
        registry.register(Box::new(ups_info.clone()))?;
        registry.register(Box::new(driver_info.clone()))?;
        registry.register(Box::new(clients_connected.clone()))?;
        registry.register(Box::new(transfer_reason_info.clone()))?;
        registry.register(Box::new(test_result_info.clone()))?;
        registry.register(Box::new(alarm_info.clone()))?;
        registry.register(Box::new(status.clone()))?;
        registry.register(Box::new(beeper_status.clone()))?;
        registry.register(Box::new(charger_status.clone()))?;
        registry.register(Box::new(variable_value.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            up: Arc::new(up),
            scrape_errors_total: Arc::new(scrape_errors_total),
            ups_info: Arc::new(ups_info),
            driver_info: Arc::new(driver_info),
            clients_connected: Arc::new(clients_connected),
            transfer_reason_info: Arc::new(transfer_reason_info),
            test_result_info: Arc::new(test_result_info),
            alarm_info: Arc::new(alarm_info),
            status: Arc::new(status),
            beeper_status: Arc::new(beeper_status),
            charger_status: Arc::new(charger_status),
            variable_value: Arc::new(variable_value),
            named: Arc::new(named),
        })
    }

    /// The curated gauge for a well-known variable name, if there is one.
    pub fn named_gauge(&self, varname: &str) -> Option<&GaugeVec> {
        self.named.get(varname)
    }

    /// Render metrics in Prometheus text format
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Clear all per-scrape series so devices that disappeared between
    /// scrapes do not linger with stale values. The error counter survives,
    /// counters are cumulative by contract.
    pub fn reset(&self) {
        self.up.reset();
        self.ups_info.reset();
        self.driver_info.reset();
        self.clients_connected.reset();
        self.transfer_reason_info.reset();
        self.test_result_info.reset();
        self.alarm_info.reset();
        self.status.reset();
        self.beeper_status.reset();
        self.charger_status.reset();
        self.variable_value.reset();
        for gauge in self.named.values() {
            gauge.reset();
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics collector")
    }
}
