// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Test doubles for the transport and the host.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use client_logger::host::ConsoleMethod;
use client_logger::logs::event::ScreenResolution;
use client_logger::logs::flusher::{RequestSender, TransportError};
use client_logger::Host;
use serde_json::Value;

pub const CHROME_UA: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

#[derive(Clone, Debug)]
pub struct CapturedRequest {
    pub url: String,
    pub body: Value,
}

/// Sender answering with scripted statuses, then `fallback_status` for every later
/// call. Every request is captured before the optional delay.
pub struct ScriptedSender {
    statuses: Mutex<VecDeque<u16>>,
    fallback_status: u16,
    delay: Duration,
    requests: Mutex<Vec<CapturedRequest>>,
    calls: AtomicUsize,
}

impl ScriptedSender {
    pub fn new(statuses: Vec<u16>, fallback_status: u16, delay: Duration) -> Arc<Self> {
        Arc::new(ScriptedSender {
            statuses: Mutex::new(statuses.into()),
            fallback_status,
            delay,
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn ok() -> Arc<Self> {
        ScriptedSender::new(Vec::new(), 200, Duration::ZERO)
    }

    pub fn with_status(status: u16) -> Arc<Self> {
        ScriptedSender::new(Vec::new(), status, Duration::ZERO)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn batches(&self) -> Vec<Value> {
        self.requests().into_iter().map(|r| r.body).collect()
    }
}

#[async_trait]
impl RequestSender for ScriptedSender {
    async fn post(&self, url: &str, body: Vec<u8>) -> Result<u16, TransportError> {
        self.requests.lock().unwrap().push(CapturedRequest {
            url: url.to_string(),
            body: serde_json::from_slice(&body).unwrap(),
        });
        let status = self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.fallback_status);
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(status)
    }
}

/// Host with an in-memory location that records navigations and console echo.
pub struct TestHost {
    location: Mutex<String>,
    available: AtomicBool,
    echo_panics: AtomicBool,
    navigations: Mutex<Vec<String>>,
    echoes: Mutex<Vec<(ConsoleMethod, String)>>,
}

impl TestHost {
    pub fn new(location: &str) -> Arc<Self> {
        Arc::new(TestHost {
            location: Mutex::new(location.to_string()),
            available: AtomicBool::new(true),
            echo_panics: AtomicBool::new(false),
            navigations: Mutex::new(Vec::new()),
            echoes: Mutex::new(Vec::new()),
        })
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Makes every later console echo panic.
    pub fn set_echo_panics(&self, panics: bool) {
        self.echo_panics.store(panics, Ordering::SeqCst);
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().unwrap().clone()
    }

    pub fn echoes(&self) -> Vec<(ConsoleMethod, String)> {
        self.echoes.lock().unwrap().clone()
    }
}

impl Host for TestHost {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn location(&self) -> String {
        self.location.lock().unwrap().clone()
    }

    fn navigate(&self, target: &str) {
        self.navigations.lock().unwrap().push(target.to_string());
        *self.location.lock().unwrap() = target.to_string();
    }

    fn user_agent(&self) -> String {
        CHROME_UA.to_string()
    }

    fn platform(&self) -> String {
        "Linux x86_64".to_string()
    }

    fn screen_resolution(&self) -> Option<ScreenResolution> {
        Some(ScreenResolution {
            width: 1920,
            height: 1080,
            color_depth: 24,
        })
    }

    fn echo(&self, method: ConsoleMethod, line: &str) {
        if self.echo_panics.load(Ordering::SeqCst) {
            panic!("console unavailable");
        }
        self.echoes.lock().unwrap().push((method, line.to_string()));
    }
}

/// Sender whose every request panics.
pub struct PanickingSender;

#[async_trait]
impl RequestSender for PanickingSender {
    async fn post(&self, _url: &str, _body: Vec<u8>) -> Result<u16, TransportError> {
        panic!("transport exploded")
    }
}
