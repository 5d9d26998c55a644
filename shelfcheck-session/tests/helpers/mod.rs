//! Test Helper Utilities
//!
//! Fake catalogue clients and store builders shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use shelfcheck_common::models::{LibraryItem, ResolutionType, SessionConfig};
use shelfcheck_common::notify::RecordingNotifier;
use shelfcheck_common::time::ManualClock;
use shelfcheck_common::{Error, Result};
use shelfcheck_session::client::{ItemResolver, SessionStarter};
use shelfcheck_session::store::MemoryEngine;
use shelfcheck_session::{SessionController, SessionStore};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Start-session fake returning a canned body (or failing)
pub struct FakeStarter {
    response: Mutex<Option<Result<Value>>>,
    calls: Mutex<Vec<SessionConfig>>,
}

impl FakeStarter {
    pub fn returning(body: Value) -> Self {
        Self {
            response: Mutex::new(Some(Ok(body))),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: Error) -> Self {
        Self {
            response: Mutex::new(Some(Err(error))),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<SessionConfig> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionStarter for FakeStarter {
    async fn start_session(&self, config: &SessionConfig) -> Result<Value> {
        self.calls.lock().unwrap().push(config.clone());
        self.response
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Err(Error::Network("no canned response left".to_string())))
    }
}

/// Item resolver fake recording every call; barcodes in `fail_for` are rejected
#[derive(Default)]
pub struct FakeResolver {
    calls: Mutex<Vec<(ResolutionType, String)>>,
    fail_for: Mutex<HashSet<String>>,
}

impl FakeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, barcode: &str) {
        self.fail_for.lock().unwrap().insert(barcode.to_string());
    }

    pub fn calls(&self) -> Vec<(ResolutionType, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ItemResolver for FakeResolver {
    async fn resolve_item(&self, resolution: ResolutionType, item: &LibraryItem) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((resolution, item.barcode.clone()));
        if self.fail_for.lock().unwrap().contains(&item.barcode) {
            return Err(Error::Api("Item is locked".to_string()));
        }
        Ok(())
    }
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
}

/// Controller wired to fakes, plus handles for inspecting them
pub struct Harness {
    pub controller: SessionController,
    pub store: Arc<SessionStore>,
    pub light: Arc<MemoryEngine>,
    pub clock: Arc<ManualClock>,
    pub starter: Arc<FakeStarter>,
    pub resolver: Arc<FakeResolver>,
    pub notifier: Arc<RecordingNotifier>,
}

impl Harness {
    pub fn new(starter: FakeStarter) -> Self {
        let light = Arc::new(MemoryEngine::new());
        let clock = Arc::new(ManualClock::new(start_time()));
        let store = Arc::new(SessionStore::new(light.clone()).with_clock(clock.clone()));
        Self::with_store(starter, store, light, clock)
    }

    pub fn with_store(
        starter: FakeStarter,
        store: Arc<SessionStore>,
        light: Arc<MemoryEngine>,
        clock: Arc<ManualClock>,
    ) -> Self {
        let starter = Arc::new(starter);
        let resolver = Arc::new(FakeResolver::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let controller = SessionController::new(
            store.clone(),
            starter.clone(),
            resolver.clone(),
            notifier.clone(),
        )
        .with_catalog_base("https://staff.example.org");
        Self {
            controller,
            store,
            light,
            clock,
            starter,
            resolver,
            notifier,
        }
    }

    /// A second controller over the same store, as after a page reload
    pub fn reloaded(&self, starter: FakeStarter) -> Self {
        Self::with_store(starter, self.store.clone(), self.light.clone(), self.clock.clone())
    }
}

pub fn config() -> SessionConfig {
    SessionConfig {
        inventory_date: "2024-06-01".to_string(),
        compare_barcodes: true,
        ..Default::default()
    }
}

pub fn item(barcode: &str) -> LibraryItem {
    LibraryItem {
        barcode: barcode.to_string(),
        ..Default::default()
    }
}

/// Start-session body listing `barcodes` in `location_data`
pub fn response_with(barcodes: &[&str]) -> Value {
    let items: Vec<Value> = barcodes
        .iter()
        .map(|b| json!({"barcode": b, "title": format!("Title {}", b)}))
        .collect();
    json!({"location_data": items, "total_records": barcodes.len()})
}
