// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! # Client Logger
//!
//! Client-side error capture and log delivery. Application code emits leveled log
//! events; uncaught panics and failed background tasks are captured automatically.
//! Events are filtered, sampled, enriched with context, scrubbed of personal data,
//! batched and delivered to a remote collector, with a bounded offline cache for
//! whatever cannot be delivered.
//!
//! ## Architecture
//!
//! - [`config`]: options, defaults, environment overrides and log levels
//! - [`logs`]: the event pipeline (agent, filter, processor, batching, delivery)
//! - [`host`]: the host environment abstraction and host-level events
//! - [`logger`]: formatting of the pipeline's own diagnostics
//!
//! ## Usage
//!
//! ```rust,no_run
//! use client_logger::{host, Config, ErrorPayload, Logger};
//!
//! # async fn run() -> Result<(), client_logger::LoggerError> {
//! let logger = Logger::init(Config::default().with_log_url("https://collector.example.com/logs"))?;
//! host::install_panic_hook(logger.clone());
//!
//! logger.info(["User logged in"]);
//! logger.error(ErrorPayload::new("Failed to load cart").with_field("cartId", 42));
//! logger.flush_logs().await?;
//! logger.shutdown().await;
//! # Ok(())
//! # }
//! ```

#![deny(clippy::all)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod host;
pub mod logger;
pub mod logs;

pub use config::{log_level::Level, Config, Options};
pub use host::{Host, HostEvent};
pub use logs::agent::{FlushOutcome, Logger, LoggerError};
pub use logs::event::{ErrorPayload, FormattedLogEvent, LogEvent};

/// Every log level, in ascending severity.
pub const LOG_LEVELS: [Level; 6] = Level::ALL;
