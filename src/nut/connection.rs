//! TCP Connection Management
//!
//! This module owns the TCP session to one upsd daemon. A single long-lived
//! connection is reused across queries; the protocol has no request IDs, so
//! exchanges are strictly serialized through a mutex and concurrent callers
//! queue in FIFO order.
//!
//! All byte-stream concerns live here (line buffering, timeouts, partial
//! reads); decoding of complete lines is left to [`codec`](super::codec).
//! Any I/O error, timeout, or overlong reply drops the socket, and the next
//! caller triggers a fresh connect.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use secrecy::ExposeSecret;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::MonitorConfig;
use crate::error::{ExporterError, Result};
use crate::nut::codec::{self, Command};

/// Upper bound on lines in one `BEGIN LIST` block. Real daemons report a
/// few hundred variables at most; anything past this is a framing fault.
const MAX_LIST_LINES: usize = 10_000;

/// Manages one persistent TCP connection to a upsd daemon.
pub struct ConnectionManager {
    config: Arc<MonitorConfig>,
    connection: Arc<Mutex<Option<ActiveConnection>>>,
    consecutive_failures: AtomicU32,
}

/// An established, possibly authenticated session.
struct ActiveConnection {
    stream: BufReader<TcpStream>,
    authenticated: bool,
}

impl ConnectionManager {
    pub fn new(config: Arc<MonitorConfig>) -> Self {
        Self {
            config,
            connection: Arc::new(Mutex::new(None)),
            consecutive_failures: AtomicU32::new(0),
        }
    }

    /// Connect attempts and exchanges failed since the last success.
    /// Surfaced through the health endpoint.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    /// Ensure a live, authenticated connection exists. Idempotent: when the
    /// session is already up this performs no socket operations.
    ///
    /// Failure counting lives here so that health-check pings and regular
    /// exchanges feed the same counter: a failed connect or handshake
    /// increments it, a freshly established session resets it.
    pub async fn ensure_connected(&self) -> Result<()> {
        let mut conn_guard = self.connection.lock().await;

        if conn_guard.is_none() {
            info!(
                "Connecting to upsd at {}:{} ({})",
                self.config.host, self.config.port, self.config.name
            );
            let stream = match self.connect_tcp().await {
                Ok(stream) => stream,
                Err(e) => {
                    self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
                    return Err(e);
                }
            };
            *conn_guard = Some(ActiveConnection {
                stream: BufReader::new(stream),
                authenticated: false,
            });
        }

        if let Some(conn) = conn_guard.as_mut() {
            if !conn.authenticated {
                if let Err(e) = self.authenticate(conn).await {
                    warn!(
                        "Authentication to {} failed, dropping connection: {}",
                        self.config.name, e
                    );
                    *conn_guard = None;
                    self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
                    return Err(e);
                }
                conn.authenticated = true;
                self.consecutive_failures.store(0, Ordering::Relaxed);
            }
        }

        Ok(())
    }

    async fn connect_tcp(&self) -> Result<TcpStream> {
        let host = self.config.host.as_str();
        tokio::time::timeout(
            self.config.connect_timeout(),
            TcpStream::connect((host, self.config.port)),
        )
        .await
        .map_err(|_| ExporterError::Timeout("connect"))?
        .map_err(|e| {
            ExporterError::ConnectionFailed(format!(
                "cannot reach upsd at {}:{}: {e}",
                self.config.host, self.config.port
            ))
        })
    }

    /// Sends `USERNAME`/`PASSWORD` when credentials are configured. upsd
    /// answers each with a single `OK` line or an `ERR`.
    async fn authenticate(&self, conn: &mut ActiveConnection) -> Result<()> {
        let (Some(username), Some(password)) = (&self.config.username, &self.config.password)
        else {
            return Ok(());
        };

        debug!("Authenticating to {} as {}", self.config.name, username);
        let cmd = Command::Username {
            name: username.clone(),
        };
        let line = self.send_and_read(conn, &cmd).await?;
        codec::expect_ok(&line, &self.config.name)?;

        let cmd = Command::Password {
            password: password.expose_secret().to_string(),
        };
        let line = self.send_and_read(conn, &cmd).await?;
        codec::expect_ok(&line, &self.config.name)?;

        info!("Authenticated to {}", self.config.name);
        Ok(())
    }

    /// Runs one command/response exchange on the shared connection.
    ///
    /// Returns the raw reply lines: a single line for status replies, or
    /// the full `BEGIN LIST … END LIST` block for list replies. The socket
    /// is dropped on any I/O error or timeout so the next call reconnects.
    pub async fn exchange(&self, cmd: &Command) -> Result<Vec<String>> {
        self.ensure_connected().await?;

        let mut conn_guard = self.connection.lock().await;
        let conn = conn_guard.as_mut().ok_or_else(|| {
            ExporterError::ConnectionFailed("connection lost before exchange".to_string())
        })?;

        match self.run_exchange(conn, cmd).await {
            Ok(lines) => {
                self.consecutive_failures.store(0, Ordering::Relaxed);
                Ok(lines)
            }
            Err(e) => {
                let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(
                    "{} to {} failed ({} consecutive), dropping connection: {}",
                    cmd.verb(),
                    self.config.name,
                    failures,
                    e
                );
                *conn_guard = None;
                Err(e)
            }
        }
    }

    async fn run_exchange(&self, conn: &mut ActiveConnection, cmd: &Command) -> Result<Vec<String>> {
        let first = self.send_and_read(conn, cmd).await?;
        if !first.starts_with("BEGIN ") {
            return Ok(vec![first]);
        }

        let mut lines = vec![first];
        loop {
            let line = self.read_line(conn, cmd.verb()).await?;
            let done = line.starts_with("END ");
            lines.push(line);
            if done {
                return Ok(lines);
            }
            if lines.len() > MAX_LIST_LINES {
                return Err(ExporterError::MalformedResponse(format!(
                    "list reply to {} exceeded {MAX_LIST_LINES} lines",
                    cmd.verb()
                )));
            }
        }
    }

    async fn send_and_read(&self, conn: &mut ActiveConnection, cmd: &Command) -> Result<String> {
        debug!("Sending {} to {}", cmd.verb(), self.config.name);
        let wire = cmd.to_wire();
        tokio::time::timeout(self.config.read_timeout(), async {
            conn.stream.write_all(wire.as_bytes()).await?;
            conn.stream.flush().await
        })
        .await
        .map_err(|_| ExporterError::Timeout(cmd.verb()))?
        .map_err(|e| ExporterError::ConnectionFailed(format!("write failed: {e}")))?;

        self.read_line(conn, cmd.verb()).await
    }

    async fn read_line(&self, conn: &mut ActiveConnection, verb: &'static str) -> Result<String> {
        let mut line = String::new();
        let read = tokio::time::timeout(
            self.config.read_timeout(),
            conn.stream.read_line(&mut line),
        )
        .await
        .map_err(|_| ExporterError::Timeout(verb))?
        .map_err(|e| ExporterError::ConnectionFailed(format!("read failed: {e}")))?;

        if read == 0 {
            return Err(ExporterError::ConnectionFailed(
                "connection closed by upsd".to_string(),
            ));
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(line)
    }

    /// Drops the current socket without reconnecting. Used after a decoded
    /// reply turns out malformed, since the stream position is then suspect.
    pub async fn invalidate(&self) {
        let mut conn_guard = self.connection.lock().await;
        if conn_guard.take().is_some() {
            debug!("Dropped suspect connection to {}", self.config.name);
        }
    }

    /// Sends a best-effort `LOGOUT` and closes the connection.
    pub async fn close(&self) {
        let mut conn_guard = self.connection.lock().await;
        if let Some(mut conn) = conn_guard.take() {
            let logout = Command::Logout.to_wire();
            let _ = tokio::time::timeout(self.config.read_timeout(), async {
                let _ = conn.stream.write_all(logout.as_bytes()).await;
                let _ = conn.stream.flush().await;
            })
            .await;
            info!("Connection to {} closed", self.config.name);
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        // Socket closes when the stream is dropped; LOGOUT needs close().
        debug!("ConnectionManager for {} dropped", self.config.name);
    }
}
