// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Helper functions for integration tests

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use client_logger::logs::flusher::RequestSender;
use client_logger::logs::offline::{MemoryStorage, Storage};
use client_logger::{Config, Host, Logger};
use serde_json::Value;

use super::mocks::TestHost;

pub const COLLECTOR_URL: &str = "http://collector.test/logs";

/// Collector configured, size trigger only (the timer is pushed out of reach).
pub fn collector_config() -> Config {
    Config {
        log_url: Some(COLLECTOR_URL.to_string()),
        batch_timeout: Duration::from_secs(3_600),
        ..Config::default()
    }
}

pub fn start(config: Config, sender: Arc<dyn RequestSender>) -> Logger {
    start_with(config, sender, TestHost::new("/"), Arc::new(MemoryStorage::new()))
}

pub fn start_with(
    config: Config,
    sender: Arc<dyn RequestSender>,
    host: Arc<dyn Host>,
    storage: Arc<dyn Storage>,
) -> Logger {
    Logger::builder(config)
        .host(host)
        .storage(storage)
        .transport(None, sender)
        .start()
        .expect("test runs inside a tokio runtime")
}

/// Polls `check` every 10ms until it holds, panicking after two seconds.
pub async fn wait_until<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let result = tokio::time::timeout(Duration::from_secs(2), async {
        while !check().await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(result.is_ok(), "condition not met within 2s");
}

/// Synchronous flavor of [`wait_until`].
pub async fn wait_for(check: impl Fn() -> bool) {
    wait_until(|| {
        let met = check();
        async move { met }
    })
    .await;
}

/// `message` of every log in a captured batch body.
pub fn messages(batch: &Value) -> Vec<String> {
    batch["logs"]
        .as_array()
        .map(|logs| {
            logs.iter()
                .map(|log| log["message"].as_str().unwrap_or_default().to_string())
                .collect()
        })
        .unwrap_or_default()
}
