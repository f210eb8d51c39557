// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Host environment abstraction.
//!
//! The pipeline never talks to the process, terminal or a UI directly. Everything it
//! needs from its surroundings goes through the [`Host`] trait:
//!
//! - **Location**: the current path, used as the event `url`, for ignore-url checks
//!   and as the redirect source
//! - **Navigation**: performed after a structured error when `routeURL` is set
//! - **Environment info**: user agent, platform, language and screen metrics
//! - **Console echo**: local display of emitted events
//!
//! Host-level occurrences (runtime errors, unhandled task failures, connectivity
//! changes, user interactions) enter the pipeline as [`HostEvent`]s through
//! [`crate::logs::agent::Logger::host_event`]. [`install_panic_hook`] wires process
//! panics in as runtime errors.

use std::panic;
use std::sync::RwLock;

use tracing::{debug, error, info, warn};

use crate::config::log_level::Level;
use crate::logs::agent::Logger;
use crate::logs::event::{BrowserInfo, ScreenResolution};
use crate::logs::hooks::{in_guarded_call, panic_message};

/// Console method used to echo an event locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleMethod {
    Debug,
    Log,
    Info,
    Warn,
    Error,
}

impl ConsoleMethod {
    /// Method matching the level name; levels without one fall back to `Log`.
    #[must_use]
    pub fn for_level(level: Level) -> Self {
        match level {
            Level::Debug => ConsoleMethod::Debug,
            Level::Info => ConsoleMethod::Info,
            Level::Warn => ConsoleMethod::Warn,
            Level::Error => ConsoleMethod::Error,
            Level::Log | Level::Fatal => ConsoleMethod::Log,
        }
    }
}

/// Capabilities the pipeline needs from its surroundings.
pub trait Host: Send + Sync {
    /// `false` when the ambient capabilities (display, location) are gone. Events
    /// emitted while unavailable are rejected with a local diagnostic.
    fn is_available(&self) -> bool {
        true
    }

    /// Current location path.
    fn location(&self) -> String;

    fn navigate(&self, target: &str);

    fn user_agent(&self) -> String;

    fn platform(&self) -> String {
        std::env::consts::OS.to_string()
    }

    fn language(&self) -> String {
        "en-US".to_string()
    }

    fn browser_info(&self) -> Option<BrowserInfo> {
        let user_agent = self.user_agent();
        Some(BrowserInfo {
            browser: detect_browser(&user_agent).to_string(),
            user_agent,
            platform: self.platform(),
            language: self.language(),
        })
    }

    fn screen_resolution(&self) -> Option<ScreenResolution> {
        None
    }

    fn echo(&self, method: ConsoleMethod, line: &str);
}

/// Browser family from a user-agent string. Order matters: Edge and Opera also
/// advertise Chrome, and Chrome also advertises Safari.
#[must_use]
pub fn detect_browser(user_agent: &str) -> &'static str {
    if user_agent.contains("Edg/") {
        "Edge"
    } else if user_agent.contains("OPR/") || user_agent.contains("Opera") {
        "Opera"
    } else if user_agent.contains("Chrome") {
        "Chrome"
    } else if user_agent.contains("Firefox") {
        "Firefox"
    } else if user_agent.contains("Safari") {
        "Safari"
    } else {
        "Unknown"
    }
}

/// [`Host`] for a plain process: an in-memory location, environment info from the
/// process and console echo through `tracing`.
#[derive(Debug)]
pub struct ProcessHost {
    location: RwLock<String>,
    screen: Option<ScreenResolution>,
}

impl Default for ProcessHost {
    fn default() -> Self {
        ProcessHost::new("/")
    }
}

impl ProcessHost {
    #[must_use]
    pub fn new(location: impl Into<String>) -> Self {
        ProcessHost {
            location: RwLock::new(location.into()),
            screen: None,
        }
    }

    #[must_use]
    pub fn with_screen(mut self, screen: ScreenResolution) -> Self {
        self.screen = Some(screen);
        self
    }

    pub fn set_location(&self, location: impl Into<String>) {
        match self.location.write() {
            Ok(mut guard) => *guard = location.into(),
            Err(poisoned) => *poisoned.into_inner() = location.into(),
        }
    }
}

impl Host for ProcessHost {
    fn location(&self) -> String {
        match self.location.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn navigate(&self, target: &str) {
        info!("HOST | Routing to {target}");
        self.set_location(target);
    }

    fn user_agent(&self) -> String {
        format!(
            "client-logger/{} ({}; {})",
            env!("CARGO_PKG_VERSION"),
            std::env::consts::OS,
            std::env::consts::ARCH
        )
    }

    fn language(&self) -> String {
        std::env::var("LANG")
            .ok()
            .and_then(|lang| lang.split('.').next().map(|l| l.replace('_', "-")))
            .filter(|lang| !lang.is_empty() && lang != "C" && lang != "POSIX")
            .unwrap_or_else(|| "en-US".to_string())
    }

    fn screen_resolution(&self) -> Option<ScreenResolution> {
        self.screen
    }

    fn echo(&self, method: ConsoleMethod, line: &str) {
        match method {
            ConsoleMethod::Debug => debug!("{line}"),
            ConsoleMethod::Log | ConsoleMethod::Info => info!("{line}"),
            ConsoleMethod::Warn => warn!("{line}"),
            ConsoleMethod::Error => error!("{line}"),
        }
    }
}

/// Host-level occurrence fed into the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// Uncaught runtime error. Logged at FATAL unless it is an opaque
    /// cross-origin `Script error`.
    RuntimeError {
        message: String,
        filename: Option<String>,
        line: Option<u32>,
        column: Option<u32>,
        stack: Option<String>,
    },
    /// A background task failed without anyone handling the failure.
    UnhandledRejection { reason: String },
    /// Connectivity restored.
    Online,
    /// Connectivity lost.
    Offline,
    Click { target: String },
    Navigation { from: String, to: String },
}

/// Reports process panics to `logger` as [`HostEvent::RuntimeError`], then runs the
/// previously installed hook. Panics raised inside the pipeline itself (hooks,
/// filters, delivery) are not reported.
pub fn install_panic_hook(logger: Logger) {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        if !in_guarded_call() {
            let location = info.location();
            logger.host_event(HostEvent::RuntimeError {
                message: panic_message(info.payload()),
                filename: location.map(|l| l.file().to_string()),
                line: location.map(std::panic::Location::line),
                column: location.map(std::panic::Location::column),
                stack: Some(std::backtrace::Backtrace::capture().to_string())
                    .filter(|stack| !stack.is_empty() && !stack.contains("disabled backtrace")),
            });
        }
        previous(info);
    }));
}
