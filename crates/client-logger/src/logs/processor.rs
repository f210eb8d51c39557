// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Enrichment and redaction.
//!
//! Turns a gated [`LogEvent`] into the canonical [`FormattedLogEvent`]:
//!
//! ```text
//!    LogEvent + Level
//!         │
//!         v
//!   ┌──────────────┐
//!   │   Enricher   │  (url, message + suffix, stack, timestamp, host context)
//!   └──────┬───────┘
//!          │
//!          v
//!   ┌──────────────┐
//!   │  Redaction   │  (message, detailMessage; when `sanitize` is on)
//!   └──────┬───────┘
//!          │
//!          v
//!   ┌──────────────┐
//!   │ beforeSend   │  (single optional mutation pass)
//!   └──────────────┘
//! ```
//!
//! # Redaction Rules
//!
//! Rules run in order, each replacing every match:
//!
//! 1. SSN-like `ddd-dd-dddd`
//! 2. Card-number-like 16 digits in optional groups of four
//! 3. `key|token|password|secret|authorization` followed by `:` or `=`; the value is
//!    masked and the key kept
//! 4. Email addresses
//!
//! Digit rules run before the email rule so the email pattern never sees a partially
//! masked number. Every placeholder is outside the language of every rule, so
//! redaction is idempotent.

use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;

use crate::config::{log_level::Level, Config};
use crate::host::Host;
use crate::logs::event::{now_iso8601, FormattedLogEvent, LogEvent, RESERVED_KEYS};
use crate::logs::hooks::{run_before_send, run_guarded};

/// Compiled masking rule.
#[derive(Clone, Debug)]
pub struct Rule {
    pub regex: Regex,
    /// Replacement; may reference named groups of `regex`.
    pub placeholder: &'static str,
}

fn rule(pattern: &str, placeholder: &'static str) -> Option<Rule> {
    match Regex::new(pattern) {
        Ok(regex) => Some(Rule { regex, placeholder }),
        Err(e) => {
            tracing::error!("LOGS | Failed to compile redaction rule {pattern}: {e}");
            None
        }
    }
}

lazy_static! {
    /// Redaction rules in application order.
    static ref REDACTION_RULES: Vec<Rule> = [
        rule(r"\b\d{3}-\d{2}-\d{4}\b", "***-**-****"),
        rule(r"\b(?:\d{4}[\s-]?){3}\d{4}\b", "****-****-****-****"),
        rule(
            r"(?i)(?P<key>key|token|password|secret|authorization)(?P<sep>\s*[:=]\s*)[^\s&,;]+",
            "${key}${sep}[REDACTED]",
        ),
        rule(
            r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}",
            "user@redacted.com",
        ),
    ]
    .into_iter()
    .flatten()
    .collect();
}

/// Masks personally identifiable substrings of `text`.
#[must_use]
pub fn redact(text: &str) -> String {
    let mut redacted = text.to_string();
    for rule in REDACTION_RULES.iter() {
        if rule.regex.is_match(&redacted) {
            redacted = rule
                .regex
                .replace_all(&redacted, rule.placeholder)
                .into_owned();
        }
    }
    redacted
}

#[derive(Clone)]
pub struct LogsProcessor {
    config: Arc<Config>,
    host: Arc<dyn Host>,
}

impl LogsProcessor {
    #[must_use]
    pub fn new(config: Arc<Config>, host: Arc<dyn Host>) -> Self {
        LogsProcessor { config, host }
    }

    /// Enriches the event, then applies the before-send hook if one is configured.
    ///
    /// Extra fields named like a canonical field are dropped from the hook's result,
    /// so the serialized record never carries a key twice.
    #[must_use]
    pub fn process(&self, event: &LogEvent, level: Level, url: &str) -> FormattedLogEvent {
        let formatted = self.enrich(event, level, url);
        let Some(hook) = &self.config.before_send else {
            return formatted;
        };
        let mut formatted = run_before_send(hook.as_ref(), formatted, level);
        formatted.extra.retain(|key, _| {
            let reserved = RESERVED_KEYS.contains(&key.as_str());
            if reserved {
                tracing::debug!("LOGS | Dropping extra field {key} set by beforeSend");
            }
            !reserved
        });
        formatted
    }

    /// Builds the canonical record for `event`, captured at location `url`.
    #[must_use]
    pub fn enrich(&self, event: &LogEvent, level: Level, url: &str) -> FormattedLogEvent {
        let config = &self.config;

        let mut message = event.primary_message();
        if let Some(info) = &config.additional_information {
            message.push_str(" --> ");
            message.push_str(info);
        }
        let mut detail_message = event.stack().unwrap_or_default().to_string();

        if config.sanitize {
            message = redact(&message);
            detail_message = redact(&detail_message);
        }

        let extra = match event {
            LogEvent::Error(payload) => payload
                .extra
                .iter()
                .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            LogEvent::Message(_) => serde_json::Map::new(),
        };

        FormattedLogEvent {
            url: url.to_string(),
            log_type: level,
            message,
            detail_message,
            timestamp: now_iso8601(),
            browser_info: if config.capture_user_agent {
                run_guarded("host browser_info", || self.host.browser_info()).flatten()
            } else {
                None
            },
            screen_resolution: if config.capture_screen_resolution {
                run_guarded("host screen_resolution", || self.host.screen_resolution())
                    .flatten()
            } else {
                None
            },
            user_id: config.user_id.clone(),
            session_id: config.session_id.clone(),
            environment: Some(config.environment.clone()),
            extra,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::host::ProcessHost;
    use crate::logs::event::{ErrorPayload, ScreenResolution};
    use serde_json::json;

    fn processor(config: Config) -> LogsProcessor {
        let host = ProcessHost::default().with_screen(ScreenResolution {
            width: 1280,
            height: 720,
            color_depth: 24,
        });
        LogsProcessor::new(Arc::new(config), Arc::new(host))
    }

    #[test]
    fn test_redact_ssn() {
        let redacted = redact("SSN 123-45-6789 on file");
        assert_eq!(redacted, "SSN ***-**-**** on file");
        assert!(!Regex::new(r"\d{3}-\d{2}-\d{4}").unwrap().is_match(&redacted));
    }

    #[test]
    fn test_redact_card_numbers() {
        assert_eq!(redact("card 4532123456789010"), "card ****-****-****-****");
        assert_eq!(
            redact("card 4532 1234 5678 9010 expired"),
            "card ****-****-****-**** expired"
        );
        assert_eq!(redact("card 4532-1234-5678-9010"), "card ****-****-****-****");
    }

    #[test]
    fn test_redact_secrets_keeps_key() {
        assert_eq!(
            redact("request failed password=hunter2 retrying"),
            "request failed password=[REDACTED] retrying"
        );
        assert_eq!(
            redact("Authorization: Bearer"),
            "Authorization: [REDACTED]"
        );
        assert_eq!(
            redact("GET /api?token=abc123&page=2"),
            "GET /api?token=[REDACTED]&page=2"
        );
    }

    #[test]
    fn test_redact_email() {
        assert_eq!(
            redact("contact jane.doe+work@example.co.uk now"),
            "contact user@redacted.com now"
        );
    }

    #[test]
    fn test_redact_is_idempotent() {
        let inputs = [
            "SSN 123-45-6789, card 4532123456789010, mail bob@example.com, secret: s3cr3t",
            "api_key=abcdef token : xyz",
            "nothing sensitive here",
        ];
        for input in inputs {
            let once = redact(input);
            assert_eq!(redact(&once), once);
        }
    }

    #[test]
    fn test_enrich_message_event() {
        let config = Config {
            additional_information: Some("build 42".to_string()),
            user_id: Some("user123".to_string()),
            session_id: Some("session456".to_string()),
            ..Config::default()
        };
        let event = LogEvent::Message(vec![json!("User logged in"), json!(3)]);

        let formatted = processor(config).enrich(&event, Level::Info, "/login");
        assert_eq!(formatted.url, "/login");
        assert_eq!(formatted.log_type, Level::Info);
        assert_eq!(formatted.message, "User logged in,3 --> build 42");
        assert_eq!(formatted.detail_message, "");
        assert_eq!(formatted.user_id.as_deref(), Some("user123"));
        assert_eq!(formatted.session_id.as_deref(), Some("session456"));
        assert_eq!(formatted.environment.as_deref(), Some("production"));
        assert!(formatted.browser_info.is_some());
        assert_eq!(formatted.screen_resolution.map(|s| s.width), Some(1280));
        assert!(formatted.extra.is_empty());
    }

    #[test]
    fn test_enrich_error_event() {
        let payload = ErrorPayload::new("boom for bob@example.com")
            .with_stack("at checkout (cart.rs:10)")
            .with_field("rowNumber", 10)
            .with_field("message", "spoofed");
        let formatted =
            processor(Config::default()).enrich(&LogEvent::Error(payload), Level::Fatal, "/cart");

        assert_eq!(formatted.message, "boom for user@redacted.com");
        assert_eq!(formatted.detail_message, "at checkout (cart.rs:10)");
        assert_eq!(formatted.extra.get("rowNumber"), Some(&json!(10)));
        assert!(formatted.extra.get("message").is_none());
    }

    #[test]
    fn test_enrich_respects_capture_flags_and_sanitize() {
        let config = Config {
            capture_user_agent: false,
            capture_screen_resolution: false,
            sanitize: false,
            ..Config::default()
        };
        let event = LogEvent::Message(vec![json!("SSN 123-45-6789")]);
        let formatted = processor(config).enrich(&event, Level::Warn, "/");

        assert!(formatted.browser_info.is_none());
        assert!(formatted.screen_resolution.is_none());
        assert_eq!(formatted.message, "SSN 123-45-6789");
    }

    #[test]
    fn test_process_applies_before_send() {
        let config = Config::default().with_before_send(|event: &FormattedLogEvent, _: Level| {
            let mut event = event.clone();
            event.extra.insert("x".to_string(), json!(1));
            Some(event)
        });
        let event = LogEvent::Error(ErrorPayload::new("boom"));
        let formatted = processor(config).process(&event, Level::Error, "/");
        assert_eq!(formatted.extra.get("x"), Some(&json!(1)));
    }

    #[test]
    fn test_process_drops_reserved_keys_added_by_before_send() {
        let config = Config::default().with_before_send(|event: &FormattedLogEvent, _: Level| {
            let mut event = event.clone();
            event.extra.insert("url".to_string(), json!("/elsewhere"));
            event.extra.insert("message".to_string(), json!("shadow"));
            event.extra.insert("x".to_string(), json!(1));
            Some(event)
        });
        let event = LogEvent::Message(vec![json!("first")]);
        let formatted = processor(config).process(&event, Level::Info, "/home");

        assert_eq!(formatted.url, "/home");
        assert_eq!(formatted.message, "first");
        assert_eq!(formatted.extra.len(), 1);
        assert_eq!(formatted.extra.get("x"), Some(&json!(1)));

        let encoded = serde_json::to_string(&formatted).unwrap();
        assert_eq!(encoded.matches("\"url\"").count(), 1);
        let decoded: FormattedLogEvent = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, formatted);
    }

    #[test]
    fn test_enrich_survives_panicking_host() {
        struct BrokenScreen;
        impl Host for BrokenScreen {
            fn location(&self) -> String {
                "/".to_string()
            }
            fn navigate(&self, _target: &str) {}
            fn user_agent(&self) -> String {
                panic!("no navigator")
            }
            fn screen_resolution(&self) -> Option<ScreenResolution> {
                panic!("no display")
            }
            fn echo(&self, _method: crate::host::ConsoleMethod, _line: &str) {}
        }
        let processor = LogsProcessor::new(Arc::new(Config::default()), Arc::new(BrokenScreen));
        let event = LogEvent::Error(ErrorPayload::new("boom"));
        let formatted = processor.enrich(&event, Level::Error, "/");

        assert!(formatted.browser_info.is_none());
        assert!(formatted.screen_resolution.is_none());
        assert_eq!(formatted.message, "boom");
    }
}
