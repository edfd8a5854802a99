//! NUT Monitor
//!
//! A REST API and Prometheus exporter for Network UPS Tools (NUT) daemons.
//!
//! # Overview
//!
//! This monitor speaks the upsd line protocol over TCP to one or more NUT
//! daemons and republishes what they report: UPS status flags, battery and
//! power readings, and device metadata. The same state is exposed twice,
//! as Prometheus metrics for scraping and as a small JSON REST API for
//! dashboards and scripts.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐    TCP line protocol    ┌──────────────┐
//! │   upsd   │ ◄─────────────────────► │   Monitor    │
//! └──────────┘    LIST / GET           │              │
//! ┌──────────┐                         │  ┌────────┐  │      HTTP      ┌────────────┐
//! │   upsd   │ ◄─────────────────────► │  │ Client │  │ ◄────────────► │ Prometheus │
//! └──────────┘                         │  └────────┘  │   /metrics     └────────────┘
//!                                      │  ┌────────┐  │   /servers
//!                                      │  │Metrics │  │   /health
//!                                      │  └────────┘  │
//!                                      └──────────────┘
//! ```
//!
//! # Modules
//!
//! - [`nut`] - NUT protocol client: wire codec, connection management, typed
//!   variables
//! - [`metrics`] - Prometheus metric definitions
//! - [`collectors`] - Per-scrape metric collection
//! - [`server`] - HTTP server: scrape endpoint and REST API
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//!
//! # Quick Start
//!
//! ```no_run
//! use nut_monitor::{config::Config, server};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/Default.toml")?;
//!     config.validate()?;
//!     server::start(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - ✅ Multiple NUT servers monitored from one process
//! - ✅ Fresh values on every scrape, no staleness window
//! - ✅ Dedicated gauges for well-known UPS variables plus a numeric catch-all
//! - ✅ Status flag, beeper and charger state tracking
//! - ✅ JSON REST API over devices, variables and descriptions
//! - ✅ Optional upsd authentication

pub mod collectors;
pub mod config;
pub mod error;
pub mod metrics;
pub mod nut;
pub mod server;
