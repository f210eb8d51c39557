// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Caller-supplied strategies injected through [`crate::config::Config`].
//!
//! All three traits are implemented for plain closures with the matching signature,
//! so `config.with_before_send(|event: &FormattedLogEvent, level: Level| { .. })`
//! works without a wrapper type. Implementations may panic; the pipeline catches the
//! panic at the call site, logs it and carries on.
//!
//! Panics raised inside a guarded call are invisible to the panic hook installed by
//! [`crate::host::install_panic_hook`], so a failing hook can never feed itself back
//! into the pipeline. The same guard wraps every call into the [`crate::host::Host`]
//! and the offline storage backend through `run_guarded`.

use std::cell::Cell;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::task::{Context, Poll};

use tracing::error;

use crate::config::log_level::Level;
use crate::logs::event::{FormattedLogEvent, LogEvent};

/// Receives the enriched event and returns a replacement, or `None` to keep it.
pub trait BeforeSend: Send + Sync {
    fn before_send(&self, event: &FormattedLogEvent, level: Level) -> Option<FormattedLogEvent>;
}

/// Notified once per emitted event after it has been routed.
pub trait AfterSend: Send + Sync {
    fn after_send(&self, event: &FormattedLogEvent, level: Level);
}

/// Returns `false` to drop the event.
pub trait EventFilter: Send + Sync {
    fn keep(&self, event: &LogEvent, level: Level) -> bool;
}

impl<F> BeforeSend for F
where
    F: Fn(&FormattedLogEvent, Level) -> Option<FormattedLogEvent> + Send + Sync,
{
    fn before_send(&self, event: &FormattedLogEvent, level: Level) -> Option<FormattedLogEvent> {
        self(event, level)
    }
}

impl<F> AfterSend for F
where
    F: Fn(&FormattedLogEvent, Level) + Send + Sync,
{
    fn after_send(&self, event: &FormattedLogEvent, level: Level) {
        self(event, level);
    }
}

impl<F> EventFilter for F
where
    F: Fn(&LogEvent, Level) -> bool + Send + Sync,
{
    fn keep(&self, event: &LogEvent, level: Level) -> bool {
        self(event, level)
    }
}

thread_local! {
    static GUARDED: Cell<bool> = const { Cell::new(false) };
}

/// Whether the current thread is running pipeline-internal code.
pub(crate) fn in_guarded_call() -> bool {
    GUARDED.with(Cell::get)
}

/// Restores the previous guard state, also when unwinding.
struct ResetGuard(bool);

impl Drop for ResetGuard {
    fn drop(&mut self) {
        GUARDED.with(|g| g.set(self.0));
    }
}

fn with_guard<R>(f: impl FnOnce() -> R) -> R {
    let _reset = ResetGuard(GUARDED.with(|g| g.replace(true)));
    f()
}

/// Future wrapper that marks every poll of `inner` as a guarded call.
pub(crate) struct Guarded<F> {
    inner: Pin<Box<F>>,
}

pub(crate) fn guarded<F: Future>(inner: F) -> Guarded<F> {
    Guarded {
        inner: Box::pin(inner),
    }
}

impl<F: Future> Future for Guarded<F> {
    type Output = F::Output;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let inner = self.inner.as_mut();
        with_guard(|| inner.poll(cx))
    }
}

/// Runs a before-send hook. A panicking hook keeps the pre-hook event.
pub(crate) fn run_before_send(
    hook: &dyn BeforeSend,
    event: FormattedLogEvent,
    level: Level,
) -> FormattedLogEvent {
    match with_guard(|| catch_unwind(AssertUnwindSafe(|| hook.before_send(&event, level)))) {
        Ok(Some(replacement)) => replacement,
        Ok(None) => event,
        Err(panic) => {
            error!(
                "LOGS | beforeSend hook panicked: {}, keeping original event",
                panic_message(panic.as_ref())
            );
            event
        }
    }
}

/// Runs an after-send hook, swallowing panics.
pub(crate) fn run_after_send(hook: &dyn AfterSend, event: &FormattedLogEvent, level: Level) {
    let outcome = with_guard(|| catch_unwind(AssertUnwindSafe(|| hook.after_send(event, level))));
    if let Err(panic) = outcome {
        error!(
            "LOGS | afterSend hook panicked: {}",
            panic_message(panic.as_ref())
        );
    }
}

/// Runs a custom filter. A panicking filter does not drop the event.
pub(crate) fn run_filter(filter: &dyn EventFilter, event: &LogEvent, level: Level) -> bool {
    match with_guard(|| catch_unwind(AssertUnwindSafe(|| filter.keep(event, level)))) {
        Ok(keep) => keep,
        Err(panic) => {
            error!(
                "LOGS | custom filter panicked: {}, keeping event",
                panic_message(panic.as_ref())
            );
            true
        }
    }
}

/// Runs a call into an injected collaborator such as the host or the storage backend.
/// Returns `None` when the call panicked.
pub(crate) fn run_guarded<T>(what: &str, f: impl FnOnce() -> T) -> Option<T> {
    match with_guard(|| catch_unwind(AssertUnwindSafe(f))) {
        Ok(value) => Some(value),
        Err(panic) => {
            error!("LOGS | {what} panicked: {}", panic_message(panic.as_ref()));
            None
        }
    }
}

/// Extracts the message of a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
