// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::collections::VecDeque;

use serde_json::{Map, Value};

use crate::logs::event::Breadcrumb;

/// Size-bounded trail of recent interactions and errors. The oldest entry is
/// evicted first once `capacity` is reached.
#[derive(Debug, Clone)]
pub struct Breadcrumbs {
    entries: VecDeque<Breadcrumb>,
    capacity: usize,
}

impl Breadcrumbs {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Breadcrumbs {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, breadcrumb: Breadcrumb) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(breadcrumb);
    }

    /// Records a breadcrumb of the given type with free-form fields.
    pub fn record(&mut self, kind: &str, data: Map<String, Value>) {
        self.push(Breadcrumb::new(kind, data));
    }

    /// Copy of the trail, oldest first, for attaching to a batch.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Breadcrumb> {
        self.entries.iter().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
