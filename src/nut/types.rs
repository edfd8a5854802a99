//! NUT Protocol Domain Types
//!
//! Typed representations of what upsd reports: devices, variables with
//! their raw string values, type metadata from `GET TYPE`, and the
//! whitespace-separated flag set carried by `ups.status`.
//!
//! # Design Notes
//!
//! - **Raw values survive**: every [`Variable`] keeps the exact string the
//!   daemon sent. Typed interpretation is a separate, fallible step
//!   ([`interpret`]) so a value the declared type rejects is reported
//!   without losing data.
//! - **Type metadata is optional**: `GET TYPE` can fail independently of
//!   `GET VAR`; a variable without type info is still usable as text.
//! - **Unknown tokens pass through**: type tokens and status flags this
//!   client does not recognize are preserved verbatim, keeping the model
//!   forward-compatible with newer daemons.
//! - **Serialization**: the REST layer renders these types as JSON, hence
//!   the `Serialize` derives.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::error::ValueIssue;

/// A UPS device as reported by `LIST UPS`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpsDevice {
    pub name: String,
    pub description: String,
}

/// One token of a variable's type declaration from `GET TYPE`.
///
/// A declaration may carry several tokens (e.g. `RW STRING:32`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VarKind {
    /// Writable with `SET VAR` (not used by this read-only client).
    Rw,
    /// Integer or float, sent as its decimal text form.
    Number,
    /// Free-form text bounded to `max_length` bytes.
    String { max_length: usize },
    /// One of a small declared set of values; see [`VarType::enum_values`].
    Enum,
    /// Numeric value constrained to declared bounds; see [`VarType::range`].
    Range,
    /// A token this client does not recognize, kept verbatim.
    Other(String),
}

impl VarKind {
    /// Parses a single type token as sent by upsd (`RW`, `NUMBER`,
    /// `STRING:32`, `ENUM`, `RANGE`).
    pub fn parse(token: &str) -> VarKind {
        if let Some(len) = token.strip_prefix("STRING:") {
            if let Ok(max_length) = len.parse() {
                return VarKind::String { max_length };
            }
        }
        match token {
            "RW" => VarKind::Rw,
            "NUMBER" => VarKind::Number,
            "ENUM" => VarKind::Enum,
            "RANGE" => VarKind::Range,
            other => VarKind::Other(other.to_string()),
        }
    }
}

/// Full type metadata for one variable: the `GET TYPE` tokens plus any
/// values gathered from `LIST ENUM` / `LIST RANGE`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct VarType {
    pub kinds: Vec<VarKind>,
    /// Allowed values from `LIST ENUM`, in daemon order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
    /// Inclusive `(min, max)` bounds from `LIST RANGE`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<(f64, f64)>,
}

impl VarType {
    pub fn from_tokens<'a>(tokens: impl IntoIterator<Item = &'a str>) -> Self {
        VarType {
            kinds: tokens.into_iter().map(VarKind::parse).collect(),
            ..VarType::default()
        }
    }

    pub fn is_number(&self) -> bool {
        self.kinds.contains(&VarKind::Number)
    }

    pub fn is_enum(&self) -> bool {
        self.kinds.contains(&VarKind::Enum)
    }
}

/// A raw value interpreted according to its declared type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TypedValue {
    Number(f64),
    Text(String),
}

/// Interprets a raw value against its declared type.
///
/// `NUMBER` parses as a float; `ENUM` values must appear in the declared
/// value list (skipped when the daemon declared none); everything else,
/// including `STRING` and `RANGE`, passes through as text. Failures carry
/// the raw string so the caller can still display it.
pub fn interpret(raw: &str, var_type: &VarType) -> Result<TypedValue, ValueIssue> {
    if var_type.is_number() {
        return raw
            .trim()
            .parse::<f64>()
            .map(TypedValue::Number)
            .map_err(|_| ValueIssue::InvalidNumber {
                raw: raw.to_string(),
            });
    }
    if var_type.is_enum() && !var_type.enum_values.is_empty() {
        if var_type.enum_values.iter().any(|v| v == raw) {
            return Ok(TypedValue::Text(raw.to_string()));
        }
        return Err(ValueIssue::UnexpectedEnumValue {
            raw: raw.to_string(),
        });
    }
    Ok(TypedValue::Text(raw.to_string()))
}

/// One UPS variable: dotted name, the raw value exactly as sent, and
/// whatever type metadata a separate `GET TYPE` query produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Variable {
    pub name: String,
    pub raw: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub var_type: Option<VarType>,
}

impl Variable {
    pub fn new(name: impl Into<String>, raw: impl Into<String>) -> Self {
        Variable {
            name: name.into(),
            raw: raw.into(),
            var_type: None,
        }
    }

    /// The raw value as a float, independent of declared type. The metrics
    /// layer uses this to export any variable that happens to be numeric.
    pub fn numeric(&self) -> Option<f64> {
        self.raw.trim().parse().ok()
    }

    /// Typed view of the raw value; `None` when no type metadata is known.
    pub fn typed(&self) -> Option<Result<TypedValue, ValueIssue>> {
        self.var_type.as_ref().map(|t| interpret(&self.raw, t))
    }
}

/// The flag set carried by the `ups.status` variable, e.g. `"OL CHRG"`.
///
/// Tokens are split on whitespace and kept verbatim; flags this client does
/// not know about are retained rather than dropped.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct StatusFlags(BTreeSet<String>);

impl StatusFlags {
    pub fn parse(raw: &str) -> Self {
        StatusFlags(raw.split_whitespace().map(str::to_string).collect())
    }

    pub fn contains(&self, flag: &str) -> bool {
        self.0.contains(flag)
    }

    /// On line power (`OL`).
    pub fn online(&self) -> bool {
        self.contains("OL")
    }

    /// Running on battery (`OB`).
    pub fn on_battery(&self) -> bool {
        self.contains("OB")
    }

    /// Battery below the shutdown threshold (`LB`).
    pub fn low_battery(&self) -> bool {
        self.contains("LB")
    }

    /// Battery charging (`CHRG`).
    pub fn charging(&self) -> bool {
        self.contains("CHRG")
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl fmt::Display for StatusFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for flag in &self.0 {
            if !first {
                f.write_str(" ")?;
            }
            f.write_str(flag)?;
            first = false;
        }
        Ok(())
    }
}
