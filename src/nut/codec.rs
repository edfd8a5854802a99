//! NUT Wire Protocol Codec
//!
//! Pure translation between domain commands and the upsd line protocol.
//! Encoding produces single newline-terminated command lines; decoding
//! consumes already-delimited lines and never touches the network, so every
//! path in this module is testable with literal string fixtures.
//!
//! Replies come in two shapes:
//!
//! - single status lines: `OK`, `ERR <code>`, or a keyword echo such as
//!   `VAR ups1 battery.charge "100"`;
//! - list blocks framed by `BEGIN LIST <name> [args]` and
//!   `END LIST <name> [args]`, where both frame lines must carry the exact
//!   name and arguments of the request. A mismatch is a protocol violation.
//!
//! Values on the wire are double-quoted, with `\"` and `\\` escapes.

use std::fmt;

use crate::error::{ExporterError, Result};

/// An outgoing upsd command.
///
/// `Debug` prints only the command verb so argument values, in particular
/// passwords, never reach log output.
#[derive(Clone, PartialEq, Eq)]
pub enum Command {
    ListUps,
    ListVar { ups: String },
    ListEnum { ups: String, var: String },
    ListRange { ups: String, var: String },
    ListClient { ups: String },
    GetVar { ups: String, var: String },
    GetType { ups: String, var: String },
    GetDesc { ups: String, var: String },
    GetUpsDesc { ups: String },
    Username { name: String },
    Password { password: String },
    Logout,
}

impl Command {
    /// Serializes to one wire line, trailing newline included. Arguments
    /// are quoted whenever the protocol requires it.
    pub fn to_wire(&self) -> String {
        let line = match self {
            Command::ListUps => "LIST UPS".to_string(),
            Command::ListVar { ups } => format!("LIST VAR {}", quote_arg(ups)),
            Command::ListEnum { ups, var } => {
                format!("LIST ENUM {} {}", quote_arg(ups), quote_arg(var))
            }
            Command::ListRange { ups, var } => {
                format!("LIST RANGE {} {}", quote_arg(ups), quote_arg(var))
            }
            Command::ListClient { ups } => format!("LIST CLIENT {}", quote_arg(ups)),
            Command::GetVar { ups, var } => {
                format!("GET VAR {} {}", quote_arg(ups), quote_arg(var))
            }
            Command::GetType { ups, var } => {
                format!("GET TYPE {} {}", quote_arg(ups), quote_arg(var))
            }
            Command::GetDesc { ups, var } => {
                format!("GET DESC {} {}", quote_arg(ups), quote_arg(var))
            }
            Command::GetUpsDesc { ups } => format!("GET UPSDESC {}", quote_arg(ups)),
            Command::Username { name } => format!("USERNAME {}", quote_arg(name)),
            Command::Password { password } => format!("PASSWORD {}", quote_arg(password)),
            Command::Logout => "LOGOUT".to_string(),
        };
        line + "\n"
    }

    /// The command verb, for logging and timeout labels.
    pub fn verb(&self) -> &'static str {
        match self {
            Command::ListUps => "LIST UPS",
            Command::ListVar { .. } => "LIST VAR",
            Command::ListEnum { .. } => "LIST ENUM",
            Command::ListRange { .. } => "LIST RANGE",
            Command::ListClient { .. } => "LIST CLIENT",
            Command::GetVar { .. } => "GET VAR",
            Command::GetType { .. } => "GET TYPE",
            Command::GetDesc { .. } => "GET DESC",
            Command::GetUpsDesc { .. } => "GET UPSDESC",
            Command::Username { .. } => "USERNAME",
            Command::Password { .. } => "PASSWORD",
            Command::Logout => "LOGOUT",
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

/// Quotes an outgoing argument when it contains whitespace, a quote, or a
/// backslash. Empty arguments are quoted so they stay visible on the wire.
pub fn quote_arg(arg: &str) -> String {
    let needs_quoting = arg.is_empty()
        || arg
            .chars()
            .any(|c| c.is_ascii_whitespace() || c == '"' || c == '\\');
    if !needs_quoting {
        return arg.to_string();
    }
    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    for c in arg.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Splits a reply line into tokens, honoring double-quoted segments with
/// `\"` and `\\` escapes. A quoted empty string is a valid token. An
/// unterminated quote or trailing escape is a framing violation.
pub fn split_line(line: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut started = false;
    let mut in_quotes = false;
    let mut escaped = false;

    for c in line.trim_end_matches(['\r', '\n']).chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => {
                in_quotes = !in_quotes;
                started = true;
            }
            c if c.is_ascii_whitespace() && !in_quotes => {
                if started {
                    tokens.push(std::mem::take(&mut current));
                    started = false;
                }
            }
            c => {
                current.push(c);
                started = true;
            }
        }
    }
    if in_quotes || escaped {
        return Err(ExporterError::MalformedResponse(format!(
            "unterminated quote in reply line: {line:?}"
        )));
    }
    if started {
        tokens.push(current);
    }
    Ok(tokens)
}

/// Maps a daemon `ERR <code>` line onto the error taxonomy. Returns `None`
/// when the line is not an ERR reply. `context` names what was being
/// queried (device, or `device/variable`) and lands in the error message.
pub fn parse_err(line: &str, context: &str) -> Option<ExporterError> {
    let rest = line.strip_prefix("ERR ")?;
    let code = rest.split_whitespace().next().unwrap_or(rest);
    Some(match code {
        "UNKNOWN-UPS" => ExporterError::DeviceNotFound(context.to_string()),
        "VAR-NOT-SUPPORTED" => ExporterError::VariableNotFound(context.to_string()),
        "ACCESS-DENIED" => ExporterError::AccessDenied(context.to_string()),
        code => ExporterError::Daemon {
            code: code.to_string(),
        },
    })
}

/// Checks a single-line reply for `OK`, mapping `ERR` codes and rejecting
/// anything else as malformed.
pub fn expect_ok(line: &str, context: &str) -> Result<()> {
    if line == "OK" || line.starts_with("OK ") {
        return Ok(());
    }
    if let Some(err) = parse_err(line, context) {
        return Err(err);
    }
    Err(ExporterError::MalformedResponse(format!(
        "expected OK for {context}, got: {line:?}"
    )))
}

/// The sole line of a single-line reply. More than one line means the
/// response framing went wrong upstream.
pub fn single_line(lines: &[String]) -> Result<&str> {
    match lines {
        [line] => Ok(line.as_str()),
        _ => Err(ExporterError::MalformedResponse(format!(
            "expected a single reply line, got {}",
            lines.len()
        ))),
    }
}

/// Decodes a keyword-echo reply such as `VAR ups1 battery.charge "100"`.
/// `prefix` is the expected keyword and echoed arguments; the tokens after
/// it are returned with quoting already reversed.
pub fn parse_reply(line: &str, prefix: &[&str]) -> Result<Vec<String>> {
    let tokens = split_line(line)?;
    if tokens.len() < prefix.len()
        || !tokens[..prefix.len()]
            .iter()
            .map(String::as_str)
            .eq(prefix.iter().copied())
    {
        return Err(ExporterError::MalformedResponse(format!(
            "expected `{}` reply, got: {line:?}",
            prefix.join(" ")
        )));
    }
    Ok(tokens[prefix.len()..].to_vec())
}

/// Like [`parse_reply`], for replies whose payload is exactly one value.
pub fn parse_value_reply(line: &str, prefix: &[&str]) -> Result<String> {
    let mut payload = parse_reply(line, prefix)?;
    if payload.len() != 1 {
        return Err(ExporterError::MalformedResponse(format!(
            "expected one value after `{}`, got {}: {line:?}",
            prefix.join(" "),
            payload.len()
        )));
    }
    Ok(payload.remove(0))
}

/// Decodes a framed list reply.
///
/// `frame` is the `<name> [args]` token sequence the request implies, e.g.
/// `["VAR", "ups1"]` for `LIST VAR ups1`. The first line must be
/// `BEGIN LIST` plus the frame, the last `END LIST` plus the same frame,
/// and every data line in between must repeat the frame before its payload.
/// Returned rows are the payload tokens per data line, unquoted.
///
/// Callers map `ERR` replies via [`parse_err`] before framing validation;
/// an `ERR` line reaching this function is reported as malformed.
pub fn parse_list(lines: &[String], frame: &[&str]) -> Result<Vec<Vec<String>>> {
    let (first, rest) = lines
        .split_first()
        .ok_or_else(|| ExporterError::MalformedResponse("empty list reply".to_string()))?;
    let begin = split_line(first)?;
    if !frame_matches(&begin, "BEGIN", frame) {
        return Err(ExporterError::MalformedResponse(format!(
            "expected `BEGIN LIST {}`, got: {first:?}",
            frame.join(" ")
        )));
    }

    let (last, data) = rest.split_last().ok_or_else(|| {
        ExporterError::MalformedResponse(format!("list `{}` has no END line", frame.join(" ")))
    })?;
    let end = split_line(last)?;
    if !frame_matches(&end, "END", frame) {
        return Err(ExporterError::MalformedResponse(format!(
            "list framing mismatch: `{first:?}` closed by `{last:?}`"
        )));
    }

    let mut rows = Vec::with_capacity(data.len());
    for line in data {
        let tokens = split_line(line)?;
        if tokens.len() < frame.len()
            || !tokens[..frame.len()]
                .iter()
                .map(String::as_str)
                .eq(frame.iter().copied())
        {
            return Err(ExporterError::MalformedResponse(format!(
                "unexpected line inside `LIST {}` block: {line:?}",
                frame.join(" ")
            )));
        }
        rows.push(tokens[frame.len()..].to_vec());
    }
    Ok(rows)
}

fn frame_matches(tokens: &[String], opener: &str, frame: &[&str]) -> bool {
    tokens.len() == frame.len() + 2
        && tokens[0] == opener
        && tokens[1] == "LIST"
        && tokens[2..]
            .iter()
            .map(String::as_str)
            .eq(frame.iter().copied())
}
