//! Wire codec tests
//!
//! Encoding and decoding of upsd protocol lines with literal fixtures;
//! nothing here touches a socket.

use nut_monitor::error::ExporterError;
use nut_monitor::nut::codec::{
    expect_ok, parse_err, parse_list, parse_reply, parse_value_reply, quote_arg, split_line,
    Command,
};

fn lines(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|l| l.to_string()).collect()
}

#[test]
fn test_command_encoding() {
    assert_eq!(Command::ListUps.to_wire(), "LIST UPS\n");
    assert_eq!(Command::Logout.to_wire(), "LOGOUT\n");
    assert_eq!(
        Command::GetVar {
            ups: "ups1".to_string(),
            var: "battery.charge".to_string(),
        }
        .to_wire(),
        "GET VAR ups1 battery.charge\n"
    );
    assert_eq!(
        Command::ListVar {
            ups: "ups1".to_string(),
        }
        .to_wire(),
        "LIST VAR ups1\n"
    );
}

#[test]
fn test_command_encoding_quotes_awkward_args() {
    // Given: a device name containing a space and one containing a quote
    let spaced = Command::ListVar {
        ups: "my ups".to_string(),
    };
    let quoted = Command::GetUpsDesc {
        ups: "back\"ups".to_string(),
    };

    // Then: both survive as single protocol arguments
    assert_eq!(spaced.to_wire(), "LIST VAR \"my ups\"\n");
    assert_eq!(quoted.to_wire(), "GET UPSDESC \"back\\\"ups\"\n");
}

#[test]
fn test_quote_arg_round_trips_through_split_line() {
    for arg in ["plain", "two words", "", "tab\there", "quo\"te", "back\\slash"] {
        let wire = format!("VAR ups1 {}", quote_arg(arg));
        let tokens = split_line(&wire).expect("quoted argument should split back");
        assert_eq!(tokens, vec!["VAR", "ups1", arg], "round trip failed for {arg:?}");
    }
}

#[test]
fn test_command_debug_never_prints_password() {
    let cmd = Command::Password {
        password: "hunter2".to_string(),
    };

    let debug = format!("{:?}", cmd);
    assert_eq!(debug, "PASSWORD");
    assert!(!debug.contains("hunter2"));
}

#[test]
fn test_split_line_strips_quotes() {
    let tokens = split_line("VAR ups1 battery.charge \"100\"").expect("valid line");
    assert_eq!(tokens, vec!["VAR", "ups1", "battery.charge", "100"]);
}

#[test]
fn test_split_line_preserves_spaces_inside_quotes() {
    let tokens = split_line("UPS ups1 \"APC Back-UPS 700\"").expect("valid line");
    assert_eq!(tokens, vec!["UPS", "ups1", "APC Back-UPS 700"]);
}

#[test]
fn test_split_line_honors_escapes() {
    // \" keeps the quote, \\ keeps the backslash
    let tokens = split_line(r#"UPS ups1 "Back-UPS \"Pro\" 700""#).expect("valid line");
    assert_eq!(tokens, vec!["UPS", "ups1", "Back-UPS \"Pro\" 700"]);

    let tokens = split_line(r#"VAR ups1 ups.note "C:\\nut""#).expect("valid line");
    assert_eq!(tokens[3], "C:\\nut");
}

#[test]
fn test_split_line_keeps_quoted_empty_token() {
    // An empty quoted value is a real token, not a dropped one
    let tokens = split_line("VAR ups1 ups.alarm \"\"").expect("valid line");
    assert_eq!(tokens, vec!["VAR", "ups1", "ups.alarm", ""]);
}

#[test]
fn test_split_line_collapses_whitespace_runs() {
    let tokens = split_line("OK   Goodbye").expect("valid line");
    assert_eq!(tokens, vec!["OK", "Goodbye"]);
}

#[test]
fn test_split_line_trims_crlf() {
    let tokens = split_line("OK\r\n").expect("valid line");
    assert_eq!(tokens, vec!["OK"]);
}

#[test]
fn test_split_line_rejects_unterminated_quote() {
    let result = split_line("VAR ups1 battery.charge \"100");
    assert!(matches!(result, Err(ExporterError::MalformedResponse(_))));
}

#[test]
fn test_split_line_rejects_trailing_escape() {
    let result = split_line(r#"VAR ups1 x "abc\"#);
    assert!(matches!(result, Err(ExporterError::MalformedResponse(_))));
}

#[test]
fn test_parse_err_maps_daemon_codes() {
    // Given: the ERR codes upsd actually sends
    // Then: each lands on its own taxonomy entry, carrying the context
    match parse_err("ERR UNKNOWN-UPS", "ups9") {
        Some(ExporterError::DeviceNotFound(context)) => assert_eq!(context, "ups9"),
        other => panic!("expected DeviceNotFound, got {other:?}"),
    }
    match parse_err("ERR VAR-NOT-SUPPORTED", "ups1/ups.nosuch") {
        Some(ExporterError::VariableNotFound(context)) => assert_eq!(context, "ups1/ups.nosuch"),
        other => panic!("expected VariableNotFound, got {other:?}"),
    }
    assert!(matches!(
        parse_err("ERR ACCESS-DENIED", "ups1"),
        Some(ExporterError::AccessDenied(_))
    ));
}

#[test]
fn test_parse_err_unknown_code_falls_back_to_daemon_error() {
    match parse_err("ERR DATA-STALE", "ups1") {
        Some(ExporterError::Daemon { code }) => assert_eq!(code, "DATA-STALE"),
        other => panic!("expected Daemon error, got {other:?}"),
    }
}

#[test]
fn test_parse_err_ignores_non_err_lines() {
    assert!(parse_err("OK", "ups1").is_none());
    assert!(parse_err("VAR ups1 battery.charge \"100\"", "ups1").is_none());
    // ERRATA is not an ERR reply
    assert!(parse_err("ERRATA", "ups1").is_none());
}

#[test]
fn test_expect_ok() {
    assert!(expect_ok("OK", "home").is_ok());
    assert!(expect_ok("OK Goodbye", "home").is_ok());
    assert!(matches!(
        expect_ok("ERR ACCESS-DENIED", "home"),
        Err(ExporterError::AccessDenied(_))
    ));
    assert!(matches!(
        expect_ok("BEGIN LIST UPS", "home"),
        Err(ExporterError::MalformedResponse(_))
    ));
}

#[test]
fn test_parse_value_reply_extracts_payload() {
    let raw = parse_value_reply(
        "VAR ups1 battery.charge \"100\"",
        &["VAR", "ups1", "battery.charge"],
    )
    .expect("valid reply");
    assert_eq!(raw, "100");
}

#[test]
fn test_parse_value_reply_rejects_wrong_echo() {
    // The daemon must echo back exactly what was asked
    let result = parse_value_reply(
        "VAR other battery.charge \"100\"",
        &["VAR", "ups1", "battery.charge"],
    );
    assert!(matches!(result, Err(ExporterError::MalformedResponse(_))));
}

#[test]
fn test_parse_value_reply_rejects_extra_payload() {
    let result = parse_value_reply("UPSDESC ups1 \"a\" \"b\"", &["UPSDESC", "ups1"]);
    assert!(matches!(result, Err(ExporterError::MalformedResponse(_))));
}

#[test]
fn test_parse_reply_returns_tokens_after_prefix() {
    let tokens = parse_reply(
        "TYPE ups1 input.transfer.low ENUM RW",
        &["TYPE", "ups1", "input.transfer.low"],
    )
    .expect("valid reply");
    assert_eq!(tokens, vec!["ENUM", "RW"]);
}

#[test]
fn test_parse_list_extracts_payload_rows() {
    // Given: a complete LIST UPS block
    let reply = lines(&[
        "BEGIN LIST UPS",
        "UPS ups1 \"APC Back-UPS 700\"",
        "UPS rack \"Eaton 5P\"",
        "END LIST UPS",
    ]);

    // When: decoding against the UPS frame
    let rows = parse_list(&reply, &["UPS"]).expect("valid list");

    // Then: only the payload tokens remain, unquoted
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], vec!["ups1", "APC Back-UPS 700"]);
    assert_eq!(rows[1], vec!["rack", "Eaton 5P"]);
}

#[test]
fn test_parse_list_with_frame_arguments() {
    let reply = lines(&[
        "BEGIN LIST VAR ups1",
        "VAR ups1 battery.charge \"100\"",
        "VAR ups1 ups.status \"OL\"",
        "END LIST VAR ups1",
    ]);

    let rows = parse_list(&reply, &["VAR", "ups1"]).expect("valid list");
    assert_eq!(rows[0], vec!["battery.charge", "100"]);
    assert_eq!(rows[1], vec!["ups.status", "OL"]);
}

#[test]
fn test_parse_list_accepts_empty_block() {
    // A daemon with no devices still frames an empty list
    let reply = lines(&["BEGIN LIST UPS", "END LIST UPS"]);
    let rows = parse_list(&reply, &["UPS"]).expect("valid list");
    assert!(rows.is_empty());
}

#[test]
fn test_parse_list_rejects_frame_mismatch() {
    // END frame names a different list than BEGIN
    let reply = lines(&[
        "BEGIN LIST VAR ups1",
        "VAR ups1 battery.charge \"100\"",
        "END LIST VAR other",
    ]);
    let result = parse_list(&reply, &["VAR", "ups1"]);
    assert!(matches!(result, Err(ExporterError::MalformedResponse(_))));
}

#[test]
fn test_parse_list_rejects_missing_end() {
    let reply = lines(&["BEGIN LIST UPS"]);
    assert!(matches!(
        parse_list(&reply, &["UPS"]),
        Err(ExporterError::MalformedResponse(_))
    ));

    let empty: Vec<String> = Vec::new();
    assert!(matches!(
        parse_list(&empty, &["UPS"]),
        Err(ExporterError::MalformedResponse(_))
    ));
}

#[test]
fn test_parse_list_rejects_stray_data_row() {
    // Data rows must repeat the frame tokens before their payload
    let reply = lines(&[
        "BEGIN LIST VAR ups1",
        "CLIENT ups1 127.0.0.1",
        "END LIST VAR ups1",
    ]);
    let result = parse_list(&reply, &["VAR", "ups1"]);
    assert!(matches!(result, Err(ExporterError::MalformedResponse(_))));
}

#[test]
fn test_parse_list_rejects_err_line_as_malformed() {
    // ERR mapping happens before framing; an ERR reaching the list
    // decoder means the caller skipped that step
    let reply = lines(&["ERR UNKNOWN-UPS"]);
    let result = parse_list(&reply, &["VAR", "ups9"]);
    assert!(matches!(result, Err(ExporterError::MalformedResponse(_))));
}
