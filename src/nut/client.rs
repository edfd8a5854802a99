//! NUT Client
//!
//! Query façade over one upsd daemon. Composes the [`ConnectionManager`]
//! (socket lifecycle, serialization, timeouts) with the [`codec`] (wire
//! encode/decode) and hands out the typed values from [`types`](super::types).
//!
//! # Architecture
//!
//! - **Connection**: plain TCP to the daemon's listener (default port 3493)
//! - **Protocol**: newline-terminated ASCII commands, `OK`/`ERR` status
//!   lines, `BEGIN LIST`/`END LIST` framed blocks
//! - **Retry**: one transparent reconnect-and-retry per operation when the
//!   connection manager reports a retryable failure; a second failure is
//!   surfaced to the caller
//!
//! # Example
//!
//! ```no_run
//! use nut_monitor::config::MonitorConfig;
//! use nut_monitor::nut::NutClient;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = NutClient::new(MonitorConfig::new("home", "127.0.0.1"));
//! for ups in client.list_devices().await? {
//!     println!("{}: {}", ups.name, ups.description);
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tracing::debug;

use crate::config::MonitorConfig;
use crate::error::{ExporterError, Result};
use crate::nut::codec::{self, Command};
use crate::nut::connection::ConnectionManager;
use crate::nut::types::{StatusFlags, UpsDevice, VarKind, VarType, Variable};

/// Client for one NUT daemon.
///
/// `Send` and `Sync`; concurrent callers share the single underlying
/// connection and are serialized by the connection manager, so a caller
/// never observes another caller's partial reply.
pub struct NutClient {
    config: Arc<MonitorConfig>,
    connection: ConnectionManager,
}

impl NutClient {
    pub fn new(config: MonitorConfig) -> Self {
        let config = Arc::new(config);
        let connection = ConnectionManager::new(config.clone());
        Self { config, connection }
    }

    /// The configured server name, used as the `server` label on metrics
    /// and as the path segment in REST routes.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Lightweight connectivity check: establishes the connection if it is
    /// down, does nothing when it is already up.
    pub async fn ping(&self) -> Result<()> {
        self.connection.ensure_connected().await
    }

    /// Connect attempts and exchanges failed since the last success, for
    /// health output.
    pub fn consecutive_failures(&self) -> u32 {
        self.connection.consecutive_failures()
    }

    /// Sends `LOGOUT` and drops the connection.
    pub async fn close(&self) {
        self.connection.close().await;
    }

    /// All UPS devices the daemon manages. An empty list is a valid answer,
    /// not an error.
    pub async fn list_devices(&self) -> Result<Vec<UpsDevice>> {
        let rows = self
            .list_reply(&Command::ListUps, &["UPS"], &self.config.name)
            .await?;
        let mut devices = Vec::with_capacity(rows.len());
        for row in rows {
            match row.as_slice() {
                [name, description] => devices.push(UpsDevice {
                    name: name.clone(),
                    description: description.clone(),
                }),
                _ => {
                    return Err(ExporterError::MalformedResponse(format!(
                        "UPS row should be `<name> <description>`, got {row:?}"
                    )))
                }
            }
        }
        Ok(devices)
    }

    /// All variables of one device, raw values only. Type metadata is a
    /// per-variable query; fetching it for a whole listing would multiply
    /// round-trips, so listings leave `var_type` unset.
    pub async fn list_variables(&self, ups: &str) -> Result<Vec<Variable>> {
        let cmd = Command::ListVar {
            ups: ups.to_string(),
        };
        let rows = self.list_reply(&cmd, &["VAR", ups], ups).await?;
        let mut variables = Vec::with_capacity(rows.len());
        for row in rows {
            match row.as_slice() {
                [name, value] => variables.push(Variable::new(name.clone(), value.clone())),
                _ => {
                    return Err(ExporterError::MalformedResponse(format!(
                        "VAR row should be `<name> <value>`, got {row:?}"
                    )))
                }
            }
        }
        Ok(variables)
    }

    /// One variable with its type attached. The value comes from `GET VAR`;
    /// `GET TYPE` plus `LIST ENUM`/`LIST RANGE` enrich it where declared.
    /// A missing or unreadable type leaves `var_type` unset rather than
    /// failing a successfully read value.
    pub async fn get_variable(&self, ups: &str, var: &str) -> Result<Variable> {
        let context = format!("{ups}/{var}");
        let cmd = Command::GetVar {
            ups: ups.to_string(),
            var: var.to_string(),
        };
        let line = self.single_reply(&cmd, &context).await?;
        let raw = self
            .flag_malformed(codec::parse_value_reply(&line, &["VAR", ups, var]))
            .await?;

        let mut variable = Variable::new(var, raw);
        variable.var_type = self.fetch_type(ups, var, &context).await;
        Ok(variable)
    }

    /// Status flags of one device, split from the `ups.status` variable.
    pub async fn get_status(&self, ups: &str) -> Result<StatusFlags> {
        let variable = self.get_variable(ups, "ups.status").await?;
        Ok(StatusFlags::parse(&variable.raw))
    }

    /// The device description configured on the daemon (`GET UPSDESC`).
    pub async fn device_description(&self, ups: &str) -> Result<String> {
        let cmd = Command::GetUpsDesc {
            ups: ups.to_string(),
        };
        let line = self.single_reply(&cmd, ups).await?;
        self.flag_malformed(codec::parse_value_reply(&line, &["UPSDESC", ups]))
            .await
    }

    /// The daemon's description of one variable (`GET DESC`).
    pub async fn variable_description(&self, ups: &str, var: &str) -> Result<String> {
        let context = format!("{ups}/{var}");
        let cmd = Command::GetDesc {
            ups: ups.to_string(),
            var: var.to_string(),
        };
        let line = self.single_reply(&cmd, &context).await?;
        self.flag_malformed(codec::parse_value_reply(&line, &["DESC", ups, var]))
            .await
    }

    /// Addresses of clients the daemon reports as attached to one device.
    pub async fn list_clients(&self, ups: &str) -> Result<Vec<String>> {
        let cmd = Command::ListClient {
            ups: ups.to_string(),
        };
        let rows = self.list_reply(&cmd, &["CLIENT", ups], ups).await?;
        let mut clients = Vec::with_capacity(rows.len());
        for row in rows {
            match row.as_slice() {
                [address] => clients.push(address.clone()),
                _ => {
                    return Err(ExporterError::MalformedResponse(format!(
                        "CLIENT row should be `<address>`, got {row:?}"
                    )))
                }
            }
        }
        Ok(clients)
    }

    /// Best-effort type lookup: `GET TYPE`, then `LIST ENUM`/`LIST RANGE`
    /// for the kinds that declare extra data. Any failure degrades to no
    /// metadata instead of discarding the already-fetched value.
    async fn fetch_type(&self, ups: &str, var: &str, context: &str) -> Option<VarType> {
        let cmd = Command::GetType {
            ups: ups.to_string(),
            var: var.to_string(),
        };
        let tokens = match self.single_reply(&cmd, context).await {
            Ok(line) => match codec::parse_reply(&line, &["TYPE", ups, var]) {
                Ok(tokens) => tokens,
                Err(e) => {
                    debug!("Unusable TYPE reply for {}: {}", context, e);
                    return None;
                }
            },
            Err(e) => {
                debug!("No type metadata for {}: {}", context, e);
                return None;
            }
        };

        let mut var_type = VarType::from_tokens(tokens.iter().map(String::as_str));
        if var_type.is_enum() {
            var_type.enum_values = self.list_enum(ups, var, context).await;
        }
        if var_type.kinds.contains(&VarKind::Range) {
            var_type.range = self.fetch_range(ups, var, context).await;
        }
        Some(var_type)
    }

    async fn list_enum(&self, ups: &str, var: &str, context: &str) -> Vec<String> {
        let cmd = Command::ListEnum {
            ups: ups.to_string(),
            var: var.to_string(),
        };
        match self.list_reply(&cmd, &["ENUM", ups, var], context).await {
            Ok(rows) => rows.into_iter().filter_map(|mut row| row.pop()).collect(),
            Err(e) => {
                debug!("No enum values for {}: {}", context, e);
                Vec::new()
            }
        }
    }

    async fn fetch_range(&self, ups: &str, var: &str, context: &str) -> Option<(f64, f64)> {
        let cmd = Command::ListRange {
            ups: ups.to_string(),
            var: var.to_string(),
        };
        let rows = match self.list_reply(&cmd, &["RANGE", ups, var], context).await {
            Ok(rows) => rows,
            Err(e) => {
                debug!("No range bounds for {}: {}", context, e);
                return None;
            }
        };
        let row = rows.first()?;
        match row.as_slice() {
            [min, max] => Some((min.parse().ok()?, max.parse().ok()?)),
            _ => None,
        }
    }

    /// One exchange with the single transparent retry: a retryable failure
    /// (dropped socket, timeout) is retried exactly once against a fresh
    /// connection; everything else surfaces immediately.
    async fn exchange_with_retry(&self, cmd: &Command) -> Result<Vec<String>> {
        match self.connection.exchange(cmd).await {
            Err(e) if e.is_retryable() => {
                debug!("Retrying {} against {} after: {}", cmd.verb(), self.config.name, e);
                self.connection.exchange(cmd).await
            }
            other => other,
        }
    }

    /// Exchange expecting a framed list; maps a leading `ERR` line before
    /// framing validation so daemon errors keep their taxonomy entry.
    async fn list_reply(
        &self,
        cmd: &Command,
        frame: &[&str],
        context: &str,
    ) -> Result<Vec<Vec<String>>> {
        let lines = self.exchange_with_retry(cmd).await?;
        if let Some(err) = lines.first().and_then(|l| codec::parse_err(l, context)) {
            return Err(err);
        }
        self.flag_malformed(codec::parse_list(&lines, frame)).await
    }

    /// Exchange expecting a single status line, with `ERR` mapping applied.
    async fn single_reply(&self, cmd: &Command, context: &str) -> Result<String> {
        let lines = self.exchange_with_retry(cmd).await?;
        let line = self
            .flag_malformed(codec::single_line(&lines).map(str::to_string))
            .await?;
        if let Some(err) = codec::parse_err(&line, context) {
            return Err(err);
        }
        Ok(line)
    }

    /// A malformed reply leaves the stream position suspect, so the
    /// connection is dropped before the error is surfaced.
    async fn flag_malformed<T>(&self, result: Result<T>) -> Result<T> {
        if matches!(result, Err(ExporterError::MalformedResponse(_))) {
            self.connection.invalidate().await;
        }
        result
    }
}
