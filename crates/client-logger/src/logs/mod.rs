// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Log capture and delivery pipeline.
//!
//! # Architecture
//!
//! ```text
//!                     ┌──────────────┐
//!                     │   Sources    │  (log calls, panics, task failures)
//!                     └──────┬───────┘
//!                            │
//!                            v
//!                     ┌──────────────┐
//!                     │    Filter    │  (ignore patterns, sampling, custom filters)
//!                     └──────┬───────┘
//!                            │
//!                            v
//!                     ┌──────────────┐
//!                     │  Processor   │  (enrich, redact, beforeSend)
//!                     └──────┬───────┘
//!                            │
//!               ┌────────────┴─────────────┐
//!               v                          v
//!        ┌──────────────┐          ┌──────────────┐
//!        │  Aggregator  │          │ OfflineCache │  (sub-threshold, undeliverable)
//!        └──────┬───────┘          └──────┬───────┘
//!               │   flush (size / timer / manual / online)
//!               v                          │
//!        ┌──────────────┐                  │
//!        │   Flusher    │ <────────────────┘
//!        └──────────────┘
//! ```
//!
//! # Components
//!
//! - **[`agent`]**: the orchestrator task and the public [`agent::Logger`] handle
//! - **[`filter`]**: drop decisions
//! - **[`processor`]**: enrichment and redaction
//! - **[`hooks`]**: caller-supplied `beforeSend`/`afterSend`/filter strategies
//! - **[`aggregator`]**: the in-memory batch queue
//! - **[`breadcrumbs`]**: the bounded interaction trail
//! - **[`offline`]**: the bounded persistent buffer
//! - **[`flusher`]**: HTTP delivery with timeout and transport fallback
//! - **[`event`]**: wire types

pub mod agent;
pub mod aggregator;
pub mod breadcrumbs;
pub mod constants;
pub mod event;
pub mod filter;
pub mod flusher;
pub mod hooks;
pub mod offline;
pub mod processor;
