// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Fixed limits of the logs pipeline.

/// Maximum number of events held by the offline cache. Older entries are evicted
/// first once the bound is exceeded.
pub const OFFLINE_CAPACITY: usize = 500;

/// `Content-Type` of every delivery request.
pub const CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// Breadcrumb type recorded for captured runtime errors and unhandled rejections.
pub(crate) const BREADCRUMB_ERROR: &str = "error";
/// Breadcrumb type recorded by [`crate::logs::agent::Logger::add_breadcrumb`].
pub(crate) const BREADCRUMB_CUSTOM: &str = "custom";
pub(crate) const BREADCRUMB_CLICK: &str = "click";
pub(crate) const BREADCRUMB_NAVIGATION: &str = "navigation";

/// Marker of opaque cross-origin runtime errors, which carry no useful detail.
pub(crate) const OPAQUE_SCRIPT_ERROR: &str = "Script error";
