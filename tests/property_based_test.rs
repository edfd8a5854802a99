//! Property-based tests using proptest
//!
//! Tests that verify properties hold for arbitrary inputs.

use nut_monitor::metrics::MetricsCollector;
use nut_monitor::nut::codec::{quote_arg, split_line};
use nut_monitor::nut::types::{interpret, StatusFlags, VarType};
use proptest::prelude::*;

/// Helper to create a test metrics instance
fn create_test_metrics() -> MetricsCollector {
    MetricsCollector::new().expect("Failed to create metrics")
}

proptest! {
    #[test]
    fn test_split_line_never_panics(line in "\\PC*") {
        // Arbitrary daemon garbage may be rejected but must not panic
        let _ = split_line(&line);
    }

    #[test]
    fn test_quote_arg_round_trips(arg in "[^\r\n]*") {
        // Given: any argument without line breaks (the protocol is
        // line-oriented, arguments cannot span lines)
        let wire = format!("GET VAR ups1 {}", quote_arg(&arg));

        // When: splitting the line a daemon would have received
        let tokens = split_line(&wire).expect("quoted arg must split back");

        // Then: the argument survives unchanged as the final token
        prop_assert_eq!(tokens.len(), 4);
        prop_assert_eq!(tokens[3].as_str(), arg.as_str());
    }

    #[test]
    fn test_quoted_values_round_trip(value in "[^\r\n]*") {
        // Simulates the daemon side: a value embedded in a reply line
        let wire = format!("VAR ups1 ups.model {}", quote_arg(&value));
        let tokens = split_line(&wire).expect("quoted value must split back");
        prop_assert_eq!(tokens.last().map(String::as_str), Some(value.as_str()));
    }

    #[test]
    fn test_status_flags_never_exceed_token_count(raw in "\\PC*") {
        let flags = StatusFlags::parse(&raw);
        prop_assert!(flags.iter().count() <= raw.split_whitespace().count());
    }

    #[test]
    fn test_status_flags_parse_never_panics(raw in "\\PC*") {
        let flags = StatusFlags::parse(&raw);
        let _ = flags.online();
        let _ = flags.to_string();
    }

    #[test]
    fn test_interpret_never_panics(raw in "\\PC*", declared in proptest::collection::vec("[a-z]{1,8}", 0..4)) {
        let number_type = VarType::from_tokens(["NUMBER"]);
        let _ = interpret(&raw, &number_type);

        let enum_type = VarType {
            kinds: vec![nut_monitor::nut::types::VarKind::Enum],
            enum_values: declared,
            range: None,
        };
        let _ = interpret(&raw, &enum_type);
    }

    #[test]
    fn test_any_device_name_renders_without_panic(ups_name in "\\PC*") {
        // Given: a metrics collector and an arbitrary device name
        let metrics = create_test_metrics();

        // When: setting a status flag with any string
        metrics
            .status
            .with_label_values(&["home", ups_name.as_str(), "OL"])
            .set(1.0);

        // Then: rendering should not panic
        let result = metrics.render();
        prop_assert!(result.is_ok());
    }

    #[test]
    fn test_any_numeric_value_renders(value in proptest::num::f64::NORMAL | proptest::num::f64::ZERO) {
        let metrics = create_test_metrics();
        metrics
            .variable_value
            .with_label_values(&["home", "ups1", "battery.charge"])
            .set(value);
        prop_assert!(metrics.render().is_ok());
    }
}
