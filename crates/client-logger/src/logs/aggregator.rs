// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! In-memory batching queue.
//!
//! Holds formatted events awaiting delivery, in call order. A flush takes the whole
//! queue at once (snapshot-and-clear), so events enqueued while a delivery is in
//! flight always land in the next batch. A failed batch is put back in front of
//! everything enqueued after it.
//!
//! The queue itself is not time-aware: the owning agent decides when to flush, using
//! the `bool` returned by [`Aggregator::enqueue`] for the size trigger and its own
//! deadline for the timer trigger.
//!
//! `max_queue_size` is advisory. Exceeding it is reported, never enforced by
//! eviction; the offline cache carries the only hard bound of the pipeline.

use std::collections::VecDeque;

use tracing::warn;

use crate::logs::event::FormattedLogEvent;

#[derive(Debug, Clone)]
pub struct Aggregator {
    pub(crate) messages: VecDeque<FormattedLogEvent>,
    pub(crate) batch_size: usize,
    pub(crate) max_queue_size: usize,
}

impl Aggregator {
    #[must_use]
    pub fn new(batch_size: usize, max_queue_size: usize) -> Self {
        Aggregator {
            messages: VecDeque::new(),
            batch_size: batch_size.max(1),
            max_queue_size,
        }
    }

    /// Appends an event. Returns `true` once the queue holds at least a full batch.
    pub fn enqueue(&mut self, event: FormattedLogEvent) -> bool {
        self.messages.push_back(event);
        if self.messages.len() > self.max_queue_size {
            warn!(
                "LOGS | Queue holds {} logs, above the configured maximum of {}",
                self.messages.len(),
                self.max_queue_size
            );
        }
        self.messages.len() >= self.batch_size
    }

    /// Takes every queued event, leaving the queue empty.
    pub fn take(&mut self) -> Vec<FormattedLogEvent> {
        self.messages.drain(..).collect()
    }

    /// Puts a failed batch back ahead of the events queued after it.
    pub fn requeue_front(&mut self, batch: Vec<FormattedLogEvent>) {
        for event in batch.into_iter().rev() {
            self.messages.push_front(event);
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<FormattedLogEvent> {
        self.messages.iter().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
