//! Edge case tests
//!
//! Tests for unusual but valid data scenarios.

use nut_monitor::collectors::variables::update_variable_metrics;
use nut_monitor::metrics::MetricsCollector;
use nut_monitor::nut::codec::split_line;
use nut_monitor::nut::types::{StatusFlags, UpsDevice, Variable};

/// Helper to create a test metrics instance
fn create_test_metrics() -> MetricsCollector {
    MetricsCollector::new().expect("Failed to create metrics")
}

#[test]
fn test_empty_registry_renders_without_error() {
    // Given: a metrics collector with no data set
    let metrics = create_test_metrics();

    // When: rendering metrics
    let result = metrics.render();

    // Then: should render successfully
    assert!(result.is_ok());
}

#[test]
fn test_device_name_with_spaces() {
    // upsd allows quoted device names; labels must carry them verbatim
    let metrics = create_test_metrics();

    metrics
        .status
        .with_label_values(&["home", "server room ups", "OL"])
        .set(1.0);

    let rendered = metrics.render().expect("Failed to render");
    assert!(rendered.contains("ups=\"server room ups\""));
}

#[test]
fn test_unicode_device_description() {
    let metrics = create_test_metrics();
    let device = UpsDevice {
        name: "ups1".to_string(),
        description: "Küchen-USV (Erdgeschoß)".to_string(),
    };

    update_variable_metrics(&metrics, "home", &device, &[]);

    let rendered = metrics.render().expect("Failed to render");
    assert!(rendered.contains("Küchen-USV"));
}

#[test]
fn test_very_large_runtime_value() {
    // Given: a battery runtime in the "weeks" range
    let metrics = create_test_metrics();
    let device = UpsDevice {
        name: "ups1".to_string(),
        description: String::new(),
    };
    let variables = vec![Variable::new("battery.runtime", "1814400")];

    // When: applying the listing
    update_variable_metrics(&metrics, "home", &device, &variables);

    // Then: value survives unrounded
    let rendered = metrics.render().expect("Failed to render");
    assert!(rendered.contains("upsmon_battery_runtime{server=\"home\",ups=\"ups1\"} 1814400"));
}

#[test]
fn test_negative_temperature() {
    let metrics = create_test_metrics();
    let device = UpsDevice {
        name: "ups1".to_string(),
        description: String::new(),
    };
    let variables = vec![Variable::new("ups.temperature", "-5.5")];

    update_variable_metrics(&metrics, "home", &device, &variables);

    let rendered = metrics.render().expect("Failed to render");
    assert!(rendered.contains("upsmon_ups_temperature{server=\"home\",ups=\"ups1\"} -5.5"));
}

#[test]
fn test_numeric_values_in_exponent_notation() {
    // Some drivers report scientific notation; f64 parsing accepts it
    assert_eq!(Variable::new("x", "1.2e3").numeric(), Some(1200.0));
    assert_eq!(Variable::new("x", "-0").numeric(), Some(0.0));
}

#[test]
fn test_duplicate_status_flags_collapse() {
    let flags = StatusFlags::parse("OL OL OL");
    assert_eq!(flags.iter().count(), 1);
}

#[test]
fn test_split_line_on_blank_input() {
    assert!(split_line("").expect("blank line splits").is_empty());
    assert!(split_line("   ").expect("whitespace splits").is_empty());
    assert!(split_line("\r\n").expect("bare CRLF splits").is_empty());
}

#[test]
fn test_variable_value_with_embedded_quotes() {
    // A value like `Back-UPS "Pro"` arrives escaped on the wire and must
    // come back out with real quotes
    let tokens = split_line(r#"VAR ups1 ups.model "Back-UPS \"Pro\" 700""#).expect("valid line");
    assert_eq!(tokens[3], "Back-UPS \"Pro\" 700");

    // And a quoted value renders into a label unharmed
    let metrics = create_test_metrics();
    let device = UpsDevice {
        name: "ups1".to_string(),
        description: String::new(),
    };
    let variables = vec![Variable::new("ups.model", tokens[3].clone())];
    update_variable_metrics(&metrics, "home", &device, &variables);
    assert!(metrics.render().is_ok());
}

#[test]
fn test_many_devices_on_one_server() {
    let metrics = create_test_metrics();

    for i in 0..100 {
        let device = UpsDevice {
            name: format!("ups{}", i),
            description: format!("rack unit {}", i),
        };
        let variables = vec![Variable::new("battery.charge", "100")];
        update_variable_metrics(&metrics, "dc1", &device, &variables);
    }

    let rendered = metrics.render().expect("Failed to render");
    assert!(rendered.contains("ups=\"ups0\""));
    assert!(rendered.contains("ups=\"ups99\""));
}
