// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Severity levels for captured log events.
//!
//! Six levels are supported, ordered by ascending threshold value:
//!
//! | Level | Threshold |
//! |-------|-----------|
//! | DEBUG | 0         |
//! | LOG   | 1         |
//! | INFO  | 2         |
//! | WARN  | 3         |
//! | ERROR | 4         |
//! | FATAL | 5         |
//!
//! The ordering drives remote routing: an event is delivered remotely only when its
//! level is at or above the configured `logThreshold` (default **ERROR**).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use tracing::error;

/// Severity of a log event.
///
/// Variants are declared in threshold order so the derived `Ord` matches
/// `DEBUG < LOG < INFO < WARN < ERROR < FATAL`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Level {
    Debug,
    Log,
    Info,
    Warn,
    #[default]
    Error,
    Fatal,
}

impl Level {
    /// Every level in threshold order (the `LOGLEVELS` enumeration).
    pub const ALL: [Level; 6] = [
        Level::Debug,
        Level::Log,
        Level::Info,
        Level::Warn,
        Level::Error,
        Level::Fatal,
    ];

    /// Numeric threshold used for routing comparisons.
    #[must_use]
    pub fn threshold(self) -> u8 {
        match self {
            Level::Debug => 0,
            Level::Log => 1,
            Level::Info => 2,
            Level::Warn => 3,
            Level::Error => 4,
            Level::Fatal => 5,
        }
    }

    /// Returns true when this level meets or exceeds `threshold`.
    #[must_use]
    pub fn meets(self, threshold: Level) -> bool {
        self.threshold() >= threshold.threshold()
    }
}

impl AsRef<str> for Level {
    fn as_ref(&self) -> &str {
        match self {
            Level::Debug => "DEBUG",
            Level::Log => "LOG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "debug" => Ok(Level::Debug),
            "log" => Ok(Level::Log),
            "info" => Ok(Level::Info),
            "warn" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            "fatal" => Ok(Level::Fatal),
            _ => Err(format!(
                "Invalid log level: '{s}'. Valid levels are: DEBUG, LOG, INFO, WARN, ERROR, FATAL",
            )),
        }
    }
}

impl Serialize for Level {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_ref())
    }
}

/// Lenient deserialization: unknown names and non-string values log an error and
/// fall back to the default threshold (`ERROR`) instead of failing initialization.
impl<'de> Deserialize<'de> for Level {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;

        if let Value::String(s) = value {
            match Level::from_str(&s) {
                Ok(level) => Ok(level),
                Err(e) => {
                    error!("{}", e);
                    Ok(Level::default())
                }
            }
        } else {
            error!("Expected a string for log level, got {:?}", value);
            Ok(Level::default())
        }
    }
}
