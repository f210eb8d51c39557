// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Local diagnostics output.
//!
//! Everything the pipeline reports about itself (dropped events, delivery failures,
//! hook panics) and the console echo of [`crate::host::ProcessHost`] goes through
//! `tracing`. [`Formatter`] renders those events as:
//!
//! ```text
//! CLIENT_LOGGER | LEVEL | [span{fields}: ]message fields
//! ```
//!
//! Applications that already install a subscriber keep theirs; [`init_tracing`] is a
//! convenience for those that do not.

use std::fmt;

use tracing_core::{Event, Subscriber};
use tracing_subscriber::fmt::{
    format::{self, FormatEvent, FormatFields},
    FmtContext, FormattedFields,
};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy)]
pub struct Formatter;

impl<S, N> FormatEvent<S, N> for Formatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(&mut writer, "CLIENT_LOGGER | {} | ", event.metadata().level())?;

        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                write!(writer, "{}", span.name())?;
                let ext = span.extensions();
                if let Some(fields) = ext.get::<FormattedFields<N>>() {
                    if !fields.is_empty() {
                        write!(writer, "{{{fields}}}")?;
                    }
                }
                write!(writer, ": ")?;
            }
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Installs a global subscriber using [`Formatter`]. `RUST_LOG` wins over
/// `default_filter` when set.
pub fn init_tracing(default_filter: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_filter))?;
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(filter)
        .event_format(Formatter)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
