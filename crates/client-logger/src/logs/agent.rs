// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Event pipeline orchestrator.
//!
//! A single [`LogsAgent`] task owns every piece of mutable pipeline state: the batch
//! queue, the breadcrumb trail, the offline cache, the pending flush deadline and the
//! online flag. Cloneable [`Logger`] handles talk to it over a channel, so state is
//! only ever touched by one task and no locks are needed.
//!
//! ```text
//!    Logger handles ──┐            ┌── HostEvent (panic hook, connectivity, UI)
//!                     v            v
//!               ┌──────────────────────┐
//!               │      LogsAgent       │──── timer (one pending deadline)
//!               └──────────┬───────────┘
//!                          │ emit
//!                          v
//!      gate ─> echo ─> enrich/redact ─> beforeSend ─> route ─> afterSend ─> redirect
//!                                                       │
//!                              threshold met + logURL   │   otherwise
//!                                  ┌────────────────────┴───────────┐
//!                                  v                                v
//!                             Aggregator ──flush──> Flusher    OfflineCache
//!                                  ^                   │            ^
//!                                  └── requeue (online)┴─ persist ──┘
//!                                                         (offline / panic)
//! ```
//!
//! # Delivery
//!
//! A flush snapshots and clears the queue, prepends whatever the offline cache holds
//! and hands the batch to a spawned delivery task. The outcome comes back to the agent
//! as a completion message, so enqueues keep flowing while a request is in flight.
//! A failed batch is requeued ahead of newer events while online and persisted
//! offline otherwise, or when the delivery task itself panicked. There is no backoff:
//! a persistently failing collector is retried at every later flush trigger.
//!
//! # Shutdown
//!
//! [`Logger::shutdown`] cancels the agent. Pending commands are processed, in-flight
//! deliveries are awaited and a last flush is attempted; anything still undelivered
//! ends up in the offline cache. The stopped signal is released even when the agent
//! task dies, so `shutdown` never waits on a dead agent.
//!
//! Every call into the [`Host`] runs behind the same panic guard as the hooks. A
//! panicking host reads as location `/` and available, and its echo and navigation
//! are skipped.

use std::error::Error as StdError;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{log_level::Level, Config};
use crate::host::{ConsoleMethod, Host, HostEvent, ProcessHost};
use crate::logs::aggregator::Aggregator;
use crate::logs::breadcrumbs::Breadcrumbs;
use crate::logs::constants::{
    BREADCRUMB_CLICK, BREADCRUMB_CUSTOM, BREADCRUMB_ERROR, BREADCRUMB_NAVIGATION,
    OPAQUE_SCRIPT_ERROR,
};
use crate::logs::event::{
    BatchPayload, BrowserInfo, ErrorPayload, FormattedLogEvent, InvalidPayload, LogEvent,
    ScreenResolution,
};
use crate::logs::filter::LogFilter;
use crate::logs::flusher::{Flusher, RequestSender};
use crate::logs::hooks::{guarded, panic_message, run_after_send, run_guarded};
use crate::logs::offline::{FileStorage, MemoryStorage, OfflineCache, Storage};
use crate::logs::processor::LogsProcessor;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoggerError {
    #[error("no tokio runtime available to run the logs agent")]
    NoRuntime,
    #[error("logs agent is not running")]
    Stopped,
    #[error("logs agent dropped the response")]
    ResponseDropped,
}

/// Result of one flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing queued, or no collector configured.
    Skipped,
    /// The batch of `n` events was accepted by the collector.
    Delivered(usize),
    /// Delivery failed while online; `n` events are back in front of the queue.
    Requeued(usize),
    /// Delivery failed while offline; `n` events went to the offline cache.
    Persisted(usize),
}

#[derive(Debug)]
pub enum LogsCommand {
    Emit { event: LogEvent, level: Level },
    AddBreadcrumb { kind: String, data: Map<String, Value> },
    Host(HostEvent),
    Flush(Option<oneshot::Sender<FlushOutcome>>),
    GetStoredLogs(oneshot::Sender<Vec<FormattedLogEvent>>),
    GetQueuedLogs(oneshot::Sender<Vec<FormattedLogEvent>>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    Delivered,
    Failed,
    Panicked,
}

struct DeliveryFinished {
    logs: Vec<FormattedLogEvent>,
    delivery: Delivery,
    respond_to: Option<oneshot::Sender<FlushOutcome>>,
}

#[allow(clippy::module_name_repetitions)]
pub struct LogsAgent {
    config: Arc<Config>,
    host: Arc<dyn Host>,
    filter: LogFilter,
    processor: LogsProcessor,
    aggregator: Aggregator,
    breadcrumbs: Breadcrumbs,
    offline: OfflineCache,
    flusher: Arc<Flusher>,
    online: bool,
    stopping: bool,
    flush_deadline: Option<Instant>,
    in_flight: usize,
    rx: mpsc::UnboundedReceiver<LogsCommand>,
    completions_tx: mpsc::UnboundedSender<DeliveryFinished>,
    completions_rx: mpsc::UnboundedReceiver<DeliveryFinished>,
    cancel_token: CancellationToken,
    stopped: CancellationToken,
}

impl LogsAgent {
    #[must_use]
    pub fn new(
        config: Arc<Config>,
        host: Arc<dyn Host>,
        storage: Arc<dyn Storage>,
        flusher: Flusher,
    ) -> (Self, mpsc::UnboundedSender<LogsCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();

        let agent = LogsAgent {
            filter: LogFilter::new(&config),
            processor: LogsProcessor::new(Arc::clone(&config), Arc::clone(&host)),
            aggregator: Aggregator::new(config.batch_size, config.max_queue_size),
            breadcrumbs: Breadcrumbs::new(config.max_breadcrumbs),
            offline: OfflineCache::new(storage, config.storage_key.clone(), config.use_local_storage),
            flusher: Arc::new(flusher),
            online: true,
            stopping: false,
            flush_deadline: None,
            in_flight: 0,
            rx,
            completions_tx,
            completions_rx,
            cancel_token: CancellationToken::new(),
            stopped: CancellationToken::new(),
            config,
            host,
        };

        (agent, tx)
    }

    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Cancelled once the agent has finished its shutdown sequence.
    #[must_use]
    pub fn stopped_token(&self) -> CancellationToken {
        self.stopped.clone()
    }

    pub async fn run(mut self) {
        let _stopped = self.stopped.clone().drop_guard();
        debug!("LOGS | Logs agent started");
        loop {
            let deadline = self.flush_deadline;
            tokio::select! {
                biased;
                () = self.cancel_token.cancelled() => {
                    debug!("LOGS | Received shutdown signal, draining remaining commands");
                    break;
                }
                command = self.rx.recv() => match command {
                    Some(command) => self.handle(command),
                    None => {
                        debug!("LOGS | All logger handles dropped");
                        break;
                    }
                },
                Some(finished) = self.completions_rx.recv() => self.finish_delivery(finished),
                () = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    debug!("LOGS | Batch timeout elapsed, flushing");
                    self.flush(None);
                }
            }
        }
        self.shutdown().await;
        debug!("LOGS | Logs agent stopped");
    }

    fn handle(&mut self, command: LogsCommand) {
        match command {
            LogsCommand::Emit { event, level } => self.emit(event, level),
            LogsCommand::AddBreadcrumb { kind, data } => self.breadcrumbs.record(&kind, data),
            LogsCommand::Host(event) => self.handle_host_event(event),
            LogsCommand::Flush(respond_to) => self.flush(respond_to),
            LogsCommand::GetStoredLogs(respond_to) => {
                if respond_to.send(self.offline.read_all()).is_err() {
                    debug!("LOGS | Stored logs requester went away");
                }
            }
            LogsCommand::GetQueuedLogs(respond_to) => {
                if respond_to.send(self.aggregator.snapshot()).is_err() {
                    debug!("LOGS | Queued logs requester went away");
                }
            }
        }
    }

    /// Current host location, `/` when the host cannot tell.
    fn location(&self) -> String {
        run_guarded("host location", || self.host.location())
            .unwrap_or_else(|| "/".to_string())
    }

    fn emit(&mut self, event: LogEvent, level: Level) {
        if !run_guarded("host is_available", || self.host.is_available()).unwrap_or(true) {
            error!("LOGS | Invalid payload or environment, dropping {level} event");
            return;
        }

        let url = self.location();
        if !self.filter.should_emit(&event, level, &url) {
            return;
        }

        if self.config.shows_messages() {
            let line = format!("[{level}]: {}", event.primary_message());
            let method = ConsoleMethod::for_level(level);
            run_guarded("host echo", || self.host.echo(method, &line));
        }

        let formatted = self.processor.process(&event, level, &url);

        let after_send = self.config.after_send.clone();
        let hook_event = after_send.as_ref().map(|_| formatted.clone());

        if self.config.log_url.is_some() && level.meets(self.config.log_threshold) {
            self.enqueue(formatted);
        } else {
            self.offline.push(formatted);
        }

        if let (Some(hook), Some(sent)) = (after_send, hook_event) {
            run_after_send(hook.as_ref(), &sent, level);
        }

        if let Some(route) = &self.config.route_url {
            if !event.is_message() && self.location() != *route {
                run_guarded("host navigate", || self.host.navigate(route));
            }
        }
    }

    fn enqueue(&mut self, event: FormattedLogEvent) {
        if self.aggregator.enqueue(event) {
            self.flush(None);
        } else {
            self.flush_deadline = Some(Instant::now() + self.config.batch_timeout);
        }
    }

    /// Builds the next batch, or `None` when there is nothing to send.
    fn take_batch(&mut self) -> Option<(String, BatchPayload)> {
        let url = self.config.log_url.clone()?;
        if self.aggregator.is_empty() {
            return None;
        }

        let queued = self.aggregator.take();
        self.flush_deadline = None;

        let mut logs = self.offline.drain_all();
        logs.extend(queued);
        Some((url, BatchPayload::new(logs, self.breadcrumbs.snapshot())))
    }

    fn flush(&mut self, respond_to: Option<oneshot::Sender<FlushOutcome>>) {
        let Some((url, payload)) = self.take_batch() else {
            respond(respond_to, FlushOutcome::Skipped);
            return;
        };

        debug!("LOGS | Flushing {} logs", payload.logs.len());
        self.in_flight += 1;
        let flusher = Arc::clone(&self.flusher);
        let completions = self.completions_tx.clone();
        tokio::spawn(async move {
            let payload = Arc::new(payload);
            let delivery = deliver(flusher, url, Arc::clone(&payload)).await;
            let finished = DeliveryFinished {
                logs: payload.logs.clone(),
                delivery,
                respond_to,
            };
            if completions.send(finished).is_err() {
                debug!("LOGS | Logs agent stopped before delivery finished");
            }
        });
    }

    fn finish_delivery(&mut self, finished: DeliveryFinished) {
        self.in_flight = self.in_flight.saturating_sub(1);
        let DeliveryFinished {
            logs,
            delivery,
            respond_to,
        } = finished;
        let count = logs.len();

        let outcome = match delivery {
            Delivery::Delivered => FlushOutcome::Delivered(count),
            Delivery::Failed if self.online && !self.stopping => {
                warn!("LOGS | Failed to deliver {count} logs, requeueing");
                self.aggregator.requeue_front(logs);
                FlushOutcome::Requeued(count)
            }
            Delivery::Failed | Delivery::Panicked => {
                warn!("LOGS | Failed to deliver {count} logs, storing them offline");
                self.offline.push_all(logs);
                FlushOutcome::Persisted(count)
            }
        };
        respond(respond_to, outcome);
    }

    fn handle_host_event(&mut self, event: HostEvent) {
        match event {
            HostEvent::RuntimeError {
                message,
                filename,
                line,
                column,
                stack,
            } => {
                self.breadcrumbs
                    .record(BREADCRUMB_ERROR, fields([("message", Value::from(message.as_str()))]));
                if message.contains(OPAQUE_SCRIPT_ERROR) {
                    debug!("LOGS | Not logging opaque cross-origin script error");
                    return;
                }

                let mut payload = ErrorPayload::new(message);
                payload.stack = stack;
                if let Some(line) = line {
                    payload = payload.with_field("lineNumber", line);
                }
                if let Some(column) = column {
                    payload = payload.with_field("columnNumber", column);
                }
                if let Some(filename) = filename {
                    payload = payload.with_field("filename", filename);
                }
                self.emit(LogEvent::Error(payload), Level::Fatal);
            }
            HostEvent::UnhandledRejection { reason } => {
                let message = format!("Unhandled rejection: {reason}");
                self.breadcrumbs
                    .record(BREADCRUMB_ERROR, fields([("message", Value::from(message.as_str()))]));
                self.emit(LogEvent::Error(ErrorPayload::new(message)), Level::Fatal);
            }
            HostEvent::Online => {
                info!("LOGS | Connectivity restored, flushing");
                self.online = true;
                self.flush(None);
            }
            HostEvent::Offline => {
                info!("LOGS | Connectivity lost");
                self.online = false;
            }
            HostEvent::Click { target } => {
                if self.config.capture_interactions {
                    self.breadcrumbs
                        .record(BREADCRUMB_CLICK, fields([("target", Value::from(target))]));
                }
            }
            HostEvent::Navigation { from, to } => {
                if self.config.capture_interactions {
                    self.breadcrumbs.record(
                        BREADCRUMB_NAVIGATION,
                        fields([("from", Value::from(from)), ("to", Value::from(to))]),
                    );
                }
            }
        }
    }

    async fn shutdown(&mut self) {
        self.rx.close();
        while let Some(command) = self.rx.recv().await {
            self.handle(command);
        }

        self.stopping = true;
        while self.in_flight > 0 {
            match self.completions_rx.recv().await {
                Some(finished) => self.finish_delivery(finished),
                None => break,
            }
        }

        if let Some((url, payload)) = self.take_batch() {
            debug!("LOGS | Final flush of {} logs", payload.logs.len());
            let payload = Arc::new(payload);
            let delivery = deliver(Arc::clone(&self.flusher), url, Arc::clone(&payload)).await;
            self.in_flight += 1;
            self.finish_delivery(DeliveryFinished {
                logs: payload.logs.clone(),
                delivery,
                respond_to: None,
            });
        }
    }
}

/// Runs one send on its own task so a panicking transport surfaces as
/// [`Delivery::Panicked`] instead of tearing down the caller.
async fn deliver(flusher: Arc<Flusher>, url: String, payload: Arc<BatchPayload>) -> Delivery {
    let attempt = tokio::spawn(guarded(async move { flusher.send(&url, &payload).await }));
    match attempt.await {
        Ok(true) => Delivery::Delivered,
        Ok(false) => Delivery::Failed,
        Err(e) => {
            error!("LOGS | Delivery task failed: {e}");
            Delivery::Panicked
        }
    }
}

fn respond(respond_to: Option<oneshot::Sender<FlushOutcome>>, outcome: FlushOutcome) {
    if let Some(respond_to) = respond_to {
        if respond_to.send(outcome).is_err() {
            debug!("LOGS | Flush requester went away");
        }
    }
}

fn fields<const N: usize>(pairs: [(&str, Value); N]) -> Map<String, Value> {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

/// Handle to a running logs pipeline. Cheap to clone; every clone feeds the same
/// agent.
#[derive(Clone)]
pub struct Logger {
    tx: mpsc::UnboundedSender<LogsCommand>,
    host: Arc<dyn Host>,
    cancel_token: CancellationToken,
    stopped: CancellationToken,
}

impl Logger {
    /// Starts a pipeline with the process host, default storage and HTTP transport.
    /// Must be called from within a tokio runtime.
    pub fn init(config: Config) -> Result<Logger, LoggerError> {
        Logger::builder(config).start()
    }

    #[must_use]
    pub fn builder(config: Config) -> LoggerBuilder {
        LoggerBuilder {
            config,
            host: None,
            storage: None,
            flusher: None,
        }
    }

    fn send(&self, command: LogsCommand) -> Result<(), LoggerError> {
        self.tx.send(command).map_err(|_| LoggerError::Stopped)
    }

    /// Feeds `event` into the pipeline at `level`. Never blocks.
    pub fn emit(&self, event: impl Into<LogEvent>, level: Level) {
        if self
            .send(LogsCommand::Emit {
                event: event.into(),
                level,
            })
            .is_err()
        {
            debug!("LOGS | Logs agent stopped, dropping {level} event");
        }
    }

    /// Feeds a dynamically shaped payload into the pipeline. Arrays are free-form
    /// messages and objects structured errors; anything else is rejected with a local
    /// diagnostic.
    pub fn emit_value(&self, payload: Value, level: Level) -> Result<(), InvalidPayload> {
        match LogEvent::from_value(payload) {
            Ok(event) => {
                self.emit(event, level);
                Ok(())
            }
            Err(e) => {
                error!("LOGS | {e}, dropping {level} event");
                Err(e)
            }
        }
    }

    fn emit_messages<I>(&self, messages: I, level: Level)
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let values = messages.into_iter().map(Into::into).collect::<Vec<Value>>();
        self.emit(LogEvent::Message(values), level);
    }

    pub fn debug<I>(&self, messages: I)
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.emit_messages(messages, Level::Debug);
    }

    pub fn log<I>(&self, messages: I)
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.emit_messages(messages, Level::Log);
    }

    pub fn info<I>(&self, messages: I)
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.emit_messages(messages, Level::Info);
    }

    pub fn warn<I>(&self, messages: I)
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.emit_messages(messages, Level::Warn);
    }

    pub fn error(&self, payload: impl Into<LogEvent>) {
        self.emit(payload, Level::Error);
    }

    pub fn fatal(&self, payload: impl Into<LogEvent>) {
        self.emit(payload, Level::Fatal);
    }

    /// Logs `error` at ERROR. Its source chain becomes the detail message.
    pub fn catcher(&self, error: &(dyn StdError + 'static)) {
        let mut chain = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            chain.push(format!("caused by: {cause}"));
            source = cause.source();
        }

        let mut payload = ErrorPayload::new(error.to_string());
        if !chain.is_empty() {
            payload.stack = Some(chain.join("\n"));
        }
        self.error(payload);
    }

    /// Runs `f`; an `Err` is logged through [`Logger::catcher`] and swallowed.
    pub fn try_catch<T, E, F>(&self, f: F) -> Option<T>
    where
        F: FnOnce() -> Result<T, E>,
        E: StdError + 'static,
    {
        self.try_catch_with(f, |_| {})
    }

    /// Like [`Logger::try_catch`], then hands the error to `on_error`.
    pub fn try_catch_with<T, E, F, C>(&self, f: F, on_error: C) -> Option<T>
    where
        F: FnOnce() -> Result<T, E>,
        E: StdError + 'static,
        C: FnOnce(E),
    {
        match f() {
            Ok(value) => Some(value),
            Err(e) => {
                self.catcher(&e);
                on_error(e);
                None
            }
        }
    }

    /// Records a custom breadcrumb carrying `message` and `data`.
    pub fn add_breadcrumb(&self, message: impl Into<String>, data: Map<String, Value>) {
        let mut data = data;
        data.insert("message".to_string(), Value::String(message.into()));
        let command = LogsCommand::AddBreadcrumb {
            kind: BREADCRUMB_CUSTOM.to_string(),
            data,
        };
        if self.send(command).is_err() {
            debug!("LOGS | Logs agent stopped, dropping breadcrumb");
        }
    }

    /// Feeds a host-level occurrence into the pipeline.
    pub fn host_event(&self, event: HostEvent) {
        if self.send(LogsCommand::Host(event)).is_err() {
            debug!("LOGS | Logs agent stopped, dropping host event");
        }
    }

    /// Flushes the queue now, regardless of batch size and timer, and waits for the
    /// delivery outcome.
    pub async fn flush_logs(&self) -> Result<FlushOutcome, LoggerError> {
        let (respond_to, response) = oneshot::channel();
        self.send(LogsCommand::Flush(Some(respond_to)))?;
        response.await.map_err(|_| LoggerError::ResponseDropped)
    }

    /// Contents of the offline cache, oldest first.
    pub async fn get_stored_logs(&self) -> Result<Vec<FormattedLogEvent>, LoggerError> {
        let (respond_to, response) = oneshot::channel();
        self.send(LogsCommand::GetStoredLogs(respond_to))?;
        response.await.map_err(|_| LoggerError::ResponseDropped)
    }

    /// Events waiting in the batch queue, in delivery order.
    pub async fn queued_logs(&self) -> Result<Vec<FormattedLogEvent>, LoggerError> {
        let (respond_to, response) = oneshot::channel();
        self.send(LogsCommand::GetQueuedLogs(respond_to))?;
        response.await.map_err(|_| LoggerError::ResponseDropped)
    }

    #[must_use]
    pub fn get_browser_info(&self) -> Option<BrowserInfo> {
        run_guarded("host browser_info", || self.host.browser_info()).flatten()
    }

    #[must_use]
    pub fn get_screen_resolution(&self) -> Option<ScreenResolution> {
        run_guarded("host screen_resolution", || self.host.screen_resolution()).flatten()
    }

    /// Spawns `task`; an `Err` or a panic is reported as
    /// [`HostEvent::UnhandledRejection`].
    pub fn spawn_monitored<F, T, E>(&self, task: F) -> JoinHandle<Option<T>>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        let logger = self.clone();
        tokio::spawn(async move {
            match tokio::spawn(task).await {
                Ok(Ok(value)) => Some(value),
                Ok(Err(e)) => {
                    logger.host_event(HostEvent::UnhandledRejection {
                        reason: e.to_string(),
                    });
                    None
                }
                Err(e) => {
                    let reason = if e.is_panic() {
                        panic_message(e.into_panic().as_ref())
                    } else {
                        e.to_string()
                    };
                    logger.host_event(HostEvent::UnhandledRejection { reason });
                    None
                }
            }
        })
    }

    /// Stops the agent and waits until pending events were flushed or stored offline.
    pub async fn shutdown(&self) {
        self.cancel_token.cancel();
        self.stopped.cancelled().await;
    }
}

pub struct LoggerBuilder {
    config: Config,
    host: Option<Arc<dyn Host>>,
    storage: Option<Arc<dyn Storage>>,
    flusher: Option<Flusher>,
}

impl LoggerBuilder {
    #[must_use]
    pub fn host(mut self, host: Arc<dyn Host>) -> Self {
        self.host = Some(host);
        self
    }

    #[must_use]
    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Replaces the HTTP transport. `preferred` is tried first when present.
    #[must_use]
    pub fn transport(
        mut self,
        preferred: Option<Arc<dyn RequestSender>>,
        legacy: Arc<dyn RequestSender>,
    ) -> Self {
        self.flusher = Some(Flusher::new(preferred, legacy, self.config.request_timeout));
        self
    }

    /// Spawns the agent on the current tokio runtime.
    pub fn start(self) -> Result<Logger, LoggerError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| LoggerError::NoRuntime)?;

        let config = Arc::new(self.config);
        let host = self
            .host
            .unwrap_or_else(|| Arc::new(ProcessHost::default()) as Arc<dyn Host>);
        let storage = self.storage.unwrap_or_else(|| match &config.storage_path {
            Some(dir) => Arc::new(FileStorage::new(dir)) as Arc<dyn Storage>,
            None => Arc::new(MemoryStorage::new()) as Arc<dyn Storage>,
        });
        let flusher = self.flusher.unwrap_or_else(|| Flusher::from_config(&config));

        debug!("LOGS | Starting logger with {config:?}");
        let (agent, tx) = LogsAgent::new(Arc::clone(&config), Arc::clone(&host), storage, flusher);
        let cancel_token = agent.cancel_token();
        let stopped = agent.stopped_token();
        runtime.spawn(agent.run());

        Ok(Logger {
            tx,
            host,
            cancel_token,
            stopped,
        })
    }
}
