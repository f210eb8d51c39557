// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Configuration Module
//!
//! The pipeline is configured once, at initialization, from a flat options object.
//! After `init` the resulting [`Config`] is shared read-only (`Arc<Config>`) by every
//! pipeline component.
//!
//! ## Configuration Priority
//!
//! 1. **Defaults** - [`Config::default`]
//! 2. **Options object** - [`Options`], deserialized from JSON using the wire names
//!    (`logURL`, `logThreshold`, `batchSize`, ...)
//! 3. **Environment variables** - `CLIENT_LOGGER_*` variables via [`Options::from_env`]
//!
//! Sources are combined with [`Options::merge`] (later sources win) and applied over
//! the defaults with [`Config::from_options`].
//!
//! ## Edge Cases and Behaviors
//!
//! - **Empty `logURL`**: treated as unset, remote delivery stays disabled
//! - **`batchSize` = 0**: treated as 1
//! - **`sampleRate` outside [0, 1]**: clamped; `NaN` falls back to 1.0
//! - **Invalid level names / ignore patterns**: logged and replaced by defaults / skipped
//!
//! Hooks and custom filters are code, not data, so they are attached with the
//! builder methods [`Config::with_before_send`], [`Config::with_after_send`] and
//! [`Config::with_filter`].

pub mod ignore_pattern;
pub mod log_level;

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::error;

use crate::config::{
    ignore_pattern::{compile_patterns, deserialize_ignore_patterns, IgnorePattern},
    log_level::Level,
};
use crate::logs::hooks::{AfterSend, BeforeSend, EventFilter};

/// Default number of queued events that triggers an immediate flush.
pub const DEFAULT_BATCH_SIZE: usize = 10;
/// Default delay before a partially filled batch is flushed.
pub const DEFAULT_BATCH_TIMEOUT: Duration = Duration::from_millis(5_000);
/// Default advisory bound of the in-memory queue.
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 1_000;
/// Default hard deadline of a single delivery attempt.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(10_000);
/// Default number of breadcrumbs attached to every batch.
pub const DEFAULT_MAX_BREADCRUMBS: usize = 20;
/// Default name of the persisted offline entry.
pub const DEFAULT_STORAGE_KEY: &str = "client_logger_offline_logs";
/// Environment name considered "production" for console echo decisions.
pub const PRODUCTION_ENVIRONMENT: &str = "production";

const ENV_PREFIX: &str = "CLIENT_LOGGER_";

/// Applies `Some` values of an [`Options`] field onto the matching [`Config`] field.
macro_rules! merge_option_to_value {
    ($config:expr, $source:expr, $field:ident) => {
        if let Some(value) = &$source.$field {
            $config.$field = value.clone();
        }
    };
    ($config:expr, $config_field:ident, $source:expr, $source_field:ident, $map:expr) => {
        if let Some(value) = &$source.$source_field {
            $config.$config_field = $map(value);
        }
    };
}

/// Keeps the right-hand side value when present.
macro_rules! merge_options {
    ($base:expr, $other:expr, $($field:ident),+ $(,)?) => {
        $(
            if $other.$field.is_some() {
                $base.$field = $other.$field;
            }
        )+
    };
}

/// Flat, serializable options object. Every field is optional; missing fields keep
/// the defaults of [`Config`].
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Options {
    #[serde(rename = "logURL")]
    pub log_url: Option<String>,
    pub log_threshold: Option<Level>,
    #[serde(rename = "routeURL")]
    pub route_url: Option<String>,
    pub show_message_in_development: Option<bool>,
    pub show_message_in_production: Option<bool>,
    pub silence_stack_trace: Option<bool>,
    pub additional_information: Option<String>,
    pub batch_size: Option<usize>,
    /// Milliseconds.
    pub batch_timeout: Option<u64>,
    pub max_queue_size: Option<usize>,
    /// Milliseconds.
    pub request_timeout: Option<u64>,
    pub use_local_storage: Option<bool>,
    pub storage_path: Option<PathBuf>,
    pub storage_key: Option<String>,
    pub capture_user_agent: Option<bool>,
    pub capture_screen_resolution: Option<bool>,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub environment: Option<String>,
    #[serde(default, deserialize_with = "deserialize_ignore_patterns")]
    pub ignored_errors: Option<Vec<IgnorePattern>>,
    /// Substring or `/regex/` entries. Entries wrapped in slashes are regexes, so
    /// `"/api/"` matches any URL containing `api`.
    #[serde(default, deserialize_with = "deserialize_ignore_patterns")]
    pub ignored_urls: Option<Vec<IgnorePattern>>,
    pub sample_rate: Option<f64>,
    pub sample_seed: Option<u64>,
    pub sanitize: Option<bool>,
    pub max_breadcrumbs: Option<usize>,
    pub capture_interactions: Option<bool>,
}

impl Options {
    /// Reads `CLIENT_LOGGER_*` environment variables. Values that fail to parse are
    /// logged and ignored.
    #[must_use]
    pub fn from_env() -> Self {
        Options {
            log_url: env_string("LOG_URL"),
            log_threshold: env_parse("LOG_THRESHOLD"),
            route_url: env_string("ROUTE_URL"),
            show_message_in_development: env_parse("SHOW_MESSAGE_IN_DEVELOPMENT"),
            show_message_in_production: env_parse("SHOW_MESSAGE_IN_PRODUCTION"),
            additional_information: env_string("ADDITIONAL_INFORMATION"),
            batch_size: env_parse("BATCH_SIZE"),
            batch_timeout: env_parse("BATCH_TIMEOUT_MS"),
            request_timeout: env_parse("REQUEST_TIMEOUT_MS"),
            use_local_storage: env_parse("USE_LOCAL_STORAGE"),
            storage_path: env_string("STORAGE_PATH").map(PathBuf::from),
            user_id: env_string("USER_ID"),
            session_id: env_string("SESSION_ID"),
            environment: env_string("ENVIRONMENT"),
            ignored_errors: env_string("IGNORED_ERRORS").map(|s| split_patterns(&s)),
            ignored_urls: env_string("IGNORED_URLS").map(|s| split_patterns(&s)),
            sample_rate: env_parse("SAMPLE_RATE"),
            sanitize: env_parse("SANITIZE"),
            ..Options::default()
        }
    }

    /// Overlays `other` on top of `self`; fields set in `other` win.
    #[must_use]
    pub fn merge(mut self, other: Options) -> Self {
        merge_options!(
            self,
            other,
            log_url,
            log_threshold,
            route_url,
            show_message_in_development,
            show_message_in_production,
            silence_stack_trace,
            additional_information,
            batch_size,
            batch_timeout,
            max_queue_size,
            request_timeout,
            use_local_storage,
            storage_path,
            storage_key,
            capture_user_agent,
            capture_screen_resolution,
            user_id,
            session_id,
            environment,
            ignored_errors,
            ignored_urls,
            sample_rate,
            sample_seed,
            sanitize,
            max_breadcrumbs,
            capture_interactions,
        );
        self
    }
}

fn env_string(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}{name}"))
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_parse<T>(name: &str) -> Option<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = env_string(name)?;
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(e) => {
            error!("Failed to parse {ENV_PREFIX}{name}={raw}: {e}, ignoring");
            None
        }
    }
}

fn split_patterns(raw: &str) -> Vec<IgnorePattern> {
    let entries: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .collect();
    compile_patterns(&entries)
}

/// Resolved pipeline configuration.
#[derive(Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct Config {
    /// Collector endpoint. `None` disables remote delivery.
    pub log_url: Option<String>,
    pub log_threshold: Level,
    /// Navigation target after a structured error is logged.
    pub route_url: Option<String>,
    pub show_message_in_development: bool,
    pub show_message_in_production: bool,
    /// Captured for compatibility; the delivery path does not consume it.
    pub silence_stack_trace: bool,
    /// Static suffix appended to every message.
    pub additional_information: Option<String>,
    pub batch_size: usize,
    pub batch_timeout: Duration,
    /// Advisory only. Exceeding it is reported, not enforced.
    pub max_queue_size: usize,
    pub request_timeout: Duration,
    pub use_local_storage: bool,
    /// Directory for file-backed offline storage. In-memory storage when `None`.
    pub storage_path: Option<PathBuf>,
    pub storage_key: String,
    pub capture_user_agent: bool,
    pub capture_screen_resolution: bool,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub environment: String,
    pub ignored_errors: Vec<IgnorePattern>,
    /// Matched against the host location; see [`IgnorePattern::parse`] for the
    /// `/regex/` rule.
    pub ignored_urls: Vec<IgnorePattern>,
    pub sample_rate: f64,
    /// Seed for the sampling RNG, for reproducible sampling decisions.
    pub sample_seed: Option<u64>,
    pub custom_filters: Vec<Arc<dyn EventFilter>>,
    pub sanitize: bool,
    pub before_send: Option<Arc<dyn BeforeSend>>,
    pub after_send: Option<Arc<dyn AfterSend>>,
    pub max_breadcrumbs: usize,
    pub capture_interactions: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            log_url: None,
            log_threshold: Level::Error,
            route_url: None,
            show_message_in_development: true,
            show_message_in_production: false,
            silence_stack_trace: false,
            additional_information: None,
            batch_size: DEFAULT_BATCH_SIZE,
            batch_timeout: DEFAULT_BATCH_TIMEOUT,
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            use_local_storage: true,
            storage_path: None,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            capture_user_agent: true,
            capture_screen_resolution: true,
            user_id: None,
            session_id: None,
            environment: PRODUCTION_ENVIRONMENT.to_string(),
            ignored_errors: Vec::new(),
            ignored_urls: Vec::new(),
            sample_rate: 1.0,
            sample_seed: None,
            custom_filters: Vec::new(),
            sanitize: true,
            before_send: None,
            after_send: None,
            max_breadcrumbs: DEFAULT_MAX_BREADCRUMBS,
            capture_interactions: true,
        }
    }
}

impl Config {
    /// Builds a configuration from the defaults overlaid with `options`.
    #[must_use]
    pub fn from_options(options: &Options) -> Self {
        let mut config = Config::default();
        config.apply(options);
        config
    }

    /// Overlays `options` on this configuration and re-normalizes it.
    pub fn apply(&mut self, options: &Options) {
        merge_option_to_value!(self, log_url, options, log_url, |v: &String| Some(v.clone()));
        merge_option_to_value!(self, options, log_threshold);
        merge_option_to_value!(self, route_url, options, route_url, |v: &String| Some(
            v.clone()
        ));
        merge_option_to_value!(self, options, show_message_in_development);
        merge_option_to_value!(self, options, show_message_in_production);
        merge_option_to_value!(self, options, silence_stack_trace);
        merge_option_to_value!(
            self,
            additional_information,
            options,
            additional_information,
            |v: &String| Some(v.clone())
        );
        merge_option_to_value!(self, options, batch_size);
        merge_option_to_value!(self, batch_timeout, options, batch_timeout, |v: &u64| {
            Duration::from_millis(*v)
        });
        merge_option_to_value!(self, options, max_queue_size);
        merge_option_to_value!(self, request_timeout, options, request_timeout, |v: &u64| {
            Duration::from_millis(*v)
        });
        merge_option_to_value!(self, options, use_local_storage);
        merge_option_to_value!(self, storage_path, options, storage_path, |v: &PathBuf| {
            Some(v.clone())
        });
        merge_option_to_value!(self, options, storage_key);
        merge_option_to_value!(self, options, capture_user_agent);
        merge_option_to_value!(self, options, capture_screen_resolution);
        merge_option_to_value!(self, user_id, options, user_id, |v: &String| Some(v.clone()));
        merge_option_to_value!(self, session_id, options, session_id, |v: &String| Some(
            v.clone()
        ));
        merge_option_to_value!(self, options, environment);
        merge_option_to_value!(self, options, ignored_errors);
        merge_option_to_value!(self, options, ignored_urls);
        merge_option_to_value!(self, options, sample_rate);
        merge_option_to_value!(self, sample_seed, options, sample_seed, |v: &u64| Some(*v));
        merge_option_to_value!(self, options, sanitize);
        merge_option_to_value!(self, options, max_breadcrumbs);
        merge_option_to_value!(self, options, capture_interactions);
        self.normalize();
    }

    fn normalize(&mut self) {
        self.log_url = normalize_string(self.log_url.take());
        self.route_url = normalize_string(self.route_url.take());
        self.additional_information = normalize_string(self.additional_information.take());
        self.user_id = normalize_string(self.user_id.take());
        self.session_id = normalize_string(self.session_id.take());

        if self.batch_size == 0 {
            self.batch_size = 1;
        }
        if self.sample_rate.is_nan() {
            error!("sampleRate is not a number, using 1.0");
            self.sample_rate = 1.0;
        }
        self.sample_rate = self.sample_rate.clamp(0.0, 1.0);
        if self.storage_key.trim().is_empty() {
            self.storage_key = DEFAULT_STORAGE_KEY.to_string();
        }
    }

    #[must_use]
    pub fn with_log_url(mut self, log_url: impl Into<String>) -> Self {
        self.log_url = normalize_string(Some(log_url.into()));
        self
    }

    #[must_use]
    pub fn with_before_send(mut self, hook: impl BeforeSend + 'static) -> Self {
        self.before_send = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn with_after_send(mut self, hook: impl AfterSend + 'static) -> Self {
        self.after_send = Some(Arc::new(hook));
        self
    }

    /// Appends a custom filter. Filters run in registration order.
    #[must_use]
    pub fn with_filter(mut self, filter: impl EventFilter + 'static) -> Self {
        self.custom_filters.push(Arc::new(filter));
        self
    }

    /// Whether local console echo is enabled for the current environment.
    #[must_use]
    pub fn shows_messages(&self) -> bool {
        if self.environment == PRODUCTION_ENVIRONMENT {
            self.show_message_in_production
        } else {
            self.show_message_in_development
        }
    }
}

fn normalize_string(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("log_url", &self.log_url)
            .field("log_threshold", &self.log_threshold)
            .field("route_url", &self.route_url)
            .field("batch_size", &self.batch_size)
            .field("batch_timeout", &self.batch_timeout)
            .field("max_queue_size", &self.max_queue_size)
            .field("request_timeout", &self.request_timeout)
            .field("use_local_storage", &self.use_local_storage)
            .field("storage_path", &self.storage_path)
            .field("environment", &self.environment)
            .field("sample_rate", &self.sample_rate)
            .field("sanitize", &self.sanitize)
            .field("custom_filters", &self.custom_filters.len())
            .field("before_send", &self.before_send.is_some())
            .field("after_send", &self.after_send.is_some())
            .field("max_breadcrumbs", &self.max_breadcrumbs)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;

    fn clear_env() {
        for (key, _) in env::vars() {
            if key.starts_with(ENV_PREFIX) {
                env::remove_var(key);
            }
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.log_url.is_none());
        assert_eq!(config.log_threshold, Level::Error);
        assert!(config.show_message_in_development);
        assert!(!config.show_message_in_production);
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.batch_timeout, Duration::from_millis(5000));
        assert_eq!(config.max_queue_size, 1000);
        assert_eq!(config.request_timeout, Duration::from_millis(10_000));
        assert!(config.use_local_storage);
        assert!(config.capture_user_agent);
        assert!(config.capture_screen_resolution);
        assert_eq!(config.environment, "production");
        assert!((config.sample_rate - 1.0).abs() < f64::EPSILON);
        assert!(config.sanitize);
        assert_eq!(config.max_breadcrumbs, 20);
        assert!(config.capture_interactions);
    }

    #[test]
    fn test_from_options_wire_names() {
        let options: Options = serde_json::from_value(json!({
            "logURL": "https://collector.example.com/logs",
            "logThreshold": "warn",
            "routeURL": "/error",
            "batchSize": 3,
            "batchTimeout": 250,
            "requestTimeout": 1500,
            "userId": "user123",
            "sessionId": "session456",
            "environment": "staging",
            "ignoredErrors": ["ResizeObserver", "/^Script error/"],
            "sampleRate": 0.25,
            "sanitize": false,
            "maxBreadcrumbs": 5
        }))
        .unwrap();

        let config = Config::from_options(&options);
        assert_eq!(
            config.log_url.as_deref(),
            Some("https://collector.example.com/logs")
        );
        assert_eq!(config.log_threshold, Level::Warn);
        assert_eq!(config.route_url.as_deref(), Some("/error"));
        assert_eq!(config.batch_size, 3);
        assert_eq!(config.batch_timeout, Duration::from_millis(250));
        assert_eq!(config.request_timeout, Duration::from_millis(1500));
        assert_eq!(config.user_id.as_deref(), Some("user123"));
        assert_eq!(config.session_id.as_deref(), Some("session456"));
        assert_eq!(config.environment, "staging");
        assert_eq!(config.ignored_errors.len(), 2);
        assert!((config.sample_rate - 0.25).abs() < f64::EPSILON);
        assert!(!config.sanitize);
        assert_eq!(config.max_breadcrumbs, 5);
    }

    #[test]
    fn test_normalization() {
        let options: Options = serde_json::from_value(json!({
            "logURL": "   ",
            "batchSize": 0,
            "sampleRate": 7.5,
            "storageKey": ""
        }))
        .unwrap();

        let config = Config::from_options(&options);
        assert!(config.log_url.is_none());
        assert_eq!(config.batch_size, 1);
        assert!((config.sample_rate - 1.0).abs() < f64::EPSILON);
        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
    }

    #[test]
    fn test_merge_later_source_wins() {
        let base = Options {
            log_url: Some("https://a".to_string()),
            batch_size: Some(4),
            ..Options::default()
        };
        let overlay = Options {
            log_url: Some("https://b".to_string()),
            ..Options::default()
        };

        let merged = base.merge(overlay);
        assert_eq!(merged.log_url.as_deref(), Some("https://b"));
        assert_eq!(merged.batch_size, Some(4));
    }

    #[test]
    #[serial]
    fn test_from_env() {
        clear_env();
        env::set_var("CLIENT_LOGGER_LOG_URL", "https://env.example.com");
        env::set_var("CLIENT_LOGGER_LOG_THRESHOLD", "info");
        env::set_var("CLIENT_LOGGER_BATCH_SIZE", "25");
        env::set_var("CLIENT_LOGGER_SAMPLE_RATE", "not-a-number");
        env::set_var("CLIENT_LOGGER_IGNORED_URLS", "/health, /^\\/internal/");

        let config = Config::from_options(&Options::from_env());
        assert_eq!(config.log_url.as_deref(), Some("https://env.example.com"));
        assert_eq!(config.log_threshold, Level::Info);
        assert_eq!(config.batch_size, 25);
        assert!((config.sample_rate - 1.0).abs() < f64::EPSILON);
        assert_eq!(config.ignored_urls.len(), 2);
        assert!(config.ignored_urls[1].matches("/internal/metrics"));

        clear_env();
    }

    #[test]
    fn test_shows_messages_by_environment() {
        let config = Config::default();
        assert!(!config.shows_messages());

        let config = Config {
            environment: "development".to_string(),
            ..Config::default()
        };
        assert!(config.shows_messages());
    }

    #[test]
    fn test_builder_hooks() {
        let config = Config::default()
            .with_log_url("https://x")
            .with_filter(|_: &crate::logs::event::LogEvent, _: Level| true)
            .with_filter(|_: &crate::logs::event::LogEvent, level: Level| level >= Level::Warn);
        assert_eq!(config.log_url.as_deref(), Some("https://x"));
        assert_eq!(config.custom_filters.len(), 2);
        assert!(config.before_send.is_none());
    }
}
