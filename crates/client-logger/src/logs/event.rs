// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Event data model: raw payloads, the formatted wire record, breadcrumbs and the
//! batch envelope posted to the collector.
//!
//! ```text
//!   LogEvent (Message | Error)          raw call, resolved once at the entry point
//!        │
//!        v
//!   FormattedLogEvent                   canonical, enriched record
//!        │
//!        v
//!   BatchPayload {logs, timestamp, breadcrumbs}   one HTTP POST
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::config::log_level::Level;

/// Keys of [`FormattedLogEvent`] that payload extras may not overwrite.
pub(crate) const RESERVED_KEYS: [&str; 11] = [
    "url",
    "logType",
    "message",
    "detailMessage",
    "timestamp",
    "browserInfo",
    "screenResolution",
    "userId",
    "sessionId",
    "environment",
    "errorMessage",
];

/// Returned when a dynamic payload is neither an array nor an object.
#[derive(Debug, Error, PartialEq)]
#[error("invalid log payload: expected an array of messages or an error object, got {0}")]
pub struct InvalidPayload(pub String);

/// Structured error payload: `{errorMessage, stack, ...extra}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    #[serde(rename = "errorMessage", default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ErrorPayload {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        ErrorPayload {
            message: message.into(),
            ..ErrorPayload::default()
        }
    }

    #[must_use]
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// A raw log call, resolved from its dynamic shape once at the pipeline entry.
#[derive(Debug, Clone, PartialEq)]
pub enum LogEvent {
    /// Free-form ordered values from `debug`/`log`/`info`/`warn`.
    Message(Vec<Value>),
    /// Structured error from `error`/`fatal`/`catcher` and the host listeners.
    Error(ErrorPayload),
}

impl LogEvent {
    /// Resolves a dynamic payload. Arrays become free-form messages, objects become
    /// structured errors; every other shape is rejected.
    pub fn from_value(value: Value) -> Result<Self, InvalidPayload> {
        match value {
            Value::Array(values) => Ok(LogEvent::Message(values)),
            Value::Object(mut map) => {
                let message = match map.remove("errorMessage") {
                    Some(Value::String(s)) => s,
                    Some(Value::Null) | None => String::new(),
                    Some(other) => other.to_string(),
                };
                let stack = match map.remove("stack") {
                    Some(Value::String(s)) => Some(s),
                    Some(Value::Null) | None => None,
                    Some(other) => Some(other.to_string()),
                };
                Ok(LogEvent::Error(ErrorPayload {
                    message,
                    stack,
                    extra: map,
                }))
            }
            Value::Null => Err(InvalidPayload("null".to_string())),
            Value::Bool(_) => Err(InvalidPayload("a boolean".to_string())),
            Value::Number(_) => Err(InvalidPayload("a number".to_string())),
            Value::String(_) => Err(InvalidPayload("a string".to_string())),
        }
    }

    /// The primary message used for ignore-pattern checks and the formatted
    /// `message` field. Free-form values are joined with `,`; strings are used as-is,
    /// other values in their JSON form.
    #[must_use]
    pub fn primary_message(&self) -> String {
        match self {
            LogEvent::Message(values) => values
                .iter()
                .map(|value| match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(","),
            LogEvent::Error(payload) => payload.message.clone(),
        }
    }

    #[must_use]
    pub fn stack(&self) -> Option<&str> {
        match self {
            LogEvent::Message(_) => None,
            LogEvent::Error(payload) => payload.stack.as_deref(),
        }
    }

    #[must_use]
    pub fn is_message(&self) -> bool {
        matches!(self, LogEvent::Message(_))
    }
}

impl From<ErrorPayload> for LogEvent {
    fn from(payload: ErrorPayload) -> Self {
        LogEvent::Error(payload)
    }
}

impl From<Vec<Value>> for LogEvent {
    fn from(values: Vec<Value>) -> Self {
        LogEvent::Message(values)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserInfo {
    pub browser: String,
    pub user_agent: String,
    pub platform: String,
    pub language: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenResolution {
    pub width: u32,
    pub height: u32,
    pub color_depth: u32,
}

/// Canonical record sent over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedLogEvent {
    /// Location path at capture time.
    pub url: String,
    pub log_type: Level,
    pub message: String,
    /// Stack trace or empty.
    pub detail_message: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser_info: Option<BrowserInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_resolution: Option<ScreenResolution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    /// Payload extras and fields added by a before-send hook.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One entry of the interaction/error trail attached to every batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breadcrumb {
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl Breadcrumb {
    #[must_use]
    pub fn new(kind: impl Into<String>, data: Map<String, Value>) -> Self {
        let mut data = data;
        data.remove("timestamp");
        data.remove("type");
        Breadcrumb {
            timestamp: now_iso8601(),
            kind: kind.into(),
            data,
        }
    }
}

/// Unit of network delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPayload {
    pub logs: Vec<FormattedLogEvent>,
    pub timestamp: String,
    pub breadcrumbs: Vec<Breadcrumb>,
}

impl BatchPayload {
    #[must_use]
    pub fn new(logs: Vec<FormattedLogEvent>, breadcrumbs: Vec<Breadcrumb>) -> Self {
        BatchPayload {
            logs,
            timestamp: now_iso8601(),
            breadcrumbs,
        }
    }
}

/// Current UTC time as an RFC 3339 / ISO-8601 string.
#[must_use]
pub fn now_iso8601() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}
