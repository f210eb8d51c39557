// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Filter and sampling gate.
//!
//! Decides, per event, whether it enters the pipeline. Checks run in order and the
//! first rejection short-circuits the rest:
//!
//! 1. **Ignore patterns**: the primary message against `ignoredErrors`, the current
//!    location against `ignoredUrls`
//! 2. **Sampling**: one uniform draw in `[0, 1)`, rejected when `>= sampleRate`
//! 3. **Custom filters**: run in registration order, the first `false` rejects
//!
//! The only state is the sampling RNG; with `sampleSeed` set, decisions are
//! reproducible.

use std::sync::Arc;

use tracing::debug;

use crate::config::{ignore_pattern::IgnorePattern, log_level::Level, Config};
use crate::logs::event::LogEvent;
use crate::logs::hooks::{run_filter, EventFilter};

pub struct LogFilter {
    ignored_errors: Vec<IgnorePattern>,
    ignored_urls: Vec<IgnorePattern>,
    sample_rate: f64,
    custom_filters: Vec<Arc<dyn EventFilter>>,
    rng: fastrand::Rng,
}

impl LogFilter {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let rng = match config.sample_seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        LogFilter {
            ignored_errors: config.ignored_errors.clone(),
            ignored_urls: config.ignored_urls.clone(),
            sample_rate: config.sample_rate,
            custom_filters: config.custom_filters.clone(),
            rng,
        }
    }

    /// Returns `true` when the event should be emitted.
    pub fn should_emit(&mut self, event: &LogEvent, level: Level, url: &str) -> bool {
        let message = event.primary_message();
        if self.ignored_errors.iter().any(|p| p.matches(&message)) {
            debug!("LOGS | Dropping {level} event: message matches an ignored error pattern");
            return false;
        }
        if self.ignored_urls.iter().any(|p| p.matches(url)) {
            debug!("LOGS | Dropping {level} event: url {url} matches an ignored url pattern");
            return false;
        }

        let draw = self.rng.f64();
        if draw >= self.sample_rate {
            debug!(
                "LOGS | Dropping {level} event: sampled out ({draw:.3} >= {})",
                self.sample_rate
            );
            return false;
        }

        for (index, filter) in self.custom_filters.iter().enumerate() {
            if !run_filter(filter.as_ref(), event, level) {
                debug!("LOGS | Dropping {level} event: rejected by custom filter #{index}");
                return false;
            }
        }

        true
    }
}
