//! Error message quality tests
//!
//! Tests that verify error messages are helpful and distinguishable.

use nut_monitor::error::{ExporterError, ValueIssue};

#[test]
fn test_connection_error_message_clarity() {
    // Given: a connection failure with its cause
    let error = ExporterError::ConnectionFailed("cannot reach upsd at 10.0.0.5:3493".to_string());

    // When: converting to string
    let message = format!("{}", error);

    // Then: message carries both the failure class and the address
    assert!(message.contains("connection failed"));
    assert!(message.contains("10.0.0.5:3493"));
}

#[test]
fn test_timeout_message_names_the_command() {
    let error = ExporterError::Timeout("LIST VAR");
    let message = format!("{}", error);

    assert!(message.contains("LIST VAR"));
    assert!(message.contains("timed out"));
}

#[test]
fn test_not_found_messages_name_the_subject() {
    let device = ExporterError::DeviceNotFound("ups9".to_string());
    assert!(format!("{}", device).contains("ups9"));

    let variable = ExporterError::VariableNotFound("ups1/ups.nosuch".to_string());
    assert!(format!("{}", variable).contains("ups1/ups.nosuch"));

    let server = ExporterError::ServerNotFound("basement".to_string());
    assert!(format!("{}", server).contains("basement"));
}

#[test]
fn test_daemon_error_keeps_the_wire_code() {
    let error = ExporterError::Daemon {
        code: "DATA-STALE".to_string(),
    };
    assert!(format!("{}", error).contains("DATA-STALE"));
}

#[test]
fn test_malformed_response_quotes_the_line() {
    let error = ExporterError::MalformedResponse("expected `OK`, got: \"BEGIN\"".to_string());
    let message = format!("{}", error);
    assert!(message.contains("malformed"));
    assert!(message.contains("BEGIN"));
}

#[test]
fn test_error_messages_are_distinguishable() {
    // No two variants may produce the same operator-facing text
    let errors = vec![
        ExporterError::ConnectionFailed("x".to_string()),
        ExporterError::Timeout("GET VAR"),
        ExporterError::MalformedResponse("x".to_string()),
        ExporterError::DeviceNotFound("x".to_string()),
        ExporterError::VariableNotFound("x".to_string()),
        ExporterError::AccessDenied("x".to_string()),
        ExporterError::Daemon {
            code: "x".to_string(),
        },
        ExporterError::ServerNotFound("x".to_string()),
    ];

    let mut messages: Vec<String> = errors.iter().map(|e| format!("{}", e)).collect();
    messages.sort();
    messages.dedup();
    assert_eq!(messages.len(), 8, "two variants render identically");
}

#[test]
fn test_retryable_classification() {
    // Only failures a fresh connection can fix are retryable
    assert!(ExporterError::ConnectionFailed("x".to_string()).is_retryable());
    assert!(ExporterError::Timeout("GET VAR").is_retryable());

    assert!(!ExporterError::MalformedResponse("x".to_string()).is_retryable());
    assert!(!ExporterError::DeviceNotFound("x".to_string()).is_retryable());
    assert!(!ExporterError::VariableNotFound("x".to_string()).is_retryable());
    assert!(!ExporterError::AccessDenied("x".to_string()).is_retryable());
    assert!(!ExporterError::Daemon {
        code: "DATA-STALE".to_string()
    }
    .is_retryable());
}

#[test]
fn test_value_issue_keeps_raw_value() {
    let issue = ValueIssue::InvalidNumber {
        raw: "N/A".to_string(),
    };
    assert!(format!("{}", issue).contains("N/A"));

    let issue = ValueIssue::UnexpectedEnumValue {
        raw: "boosting".to_string(),
    };
    assert!(format!("{}", issue).contains("boosting"));
}

#[test]
fn test_io_errors_convert() {
    let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
    let error: ExporterError = io.into();
    assert!(matches!(error, ExporterError::Io(_)));
    assert!(format!("{}", error).contains("pipe closed"));
}
