//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chartdeck_data::{
    AdapterConfig, ChartDataError, DataAdapter, DataRequirements, DataSourceConfig, DatasetRow,
    ManualClock, SourceFetcher,
};

pub const BTC_CSV: &str = include_str!("../fixtures/btc_price.csv");

pub const HOUR: Duration = Duration::from_secs(3600);

/// A fetcher that replays scripted responses per source location.
///
/// Each call pops the next response for the location; when the script runs
/// out the call fails with an I/O error.
#[derive(Default)]
pub struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, VecDeque<Result<String, ChartDataError>>>>,
    calls: Mutex<HashMap<String, usize>>,
    delay: Option<Duration>,
    started: AtomicUsize,
    aborted: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every fetch waits `delay` (tokio time) before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn succeed(self, location: &str, payload: &str) -> Self {
        self.push(location, Ok(payload.to_string()));
        self
    }

    pub fn fail(self, location: &str, times: usize) -> Self {
        for _ in 0..times {
            self.push(
                location,
                Err(ChartDataError::Io {
                    location: location.to_string(),
                    message: "connection reset".to_string(),
                }),
            );
        }
        self
    }

    pub fn push(&self, location: &str, response: Result<String, ChartDataError>) {
        self.scripts
            .lock()
            .unwrap()
            .entry(location.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn calls(&self, location: &str) -> usize {
        self.calls.lock().unwrap().get(location).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    /// Fetches that started.
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Fetches dropped before they produced a response.
    pub fn aborted(&self) -> usize {
        self.aborted.load(Ordering::SeqCst)
    }
}

struct AbortGuard<'a> {
    aborted: &'a AtomicUsize,
    finished: bool,
}

impl Drop for AbortGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.aborted.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl SourceFetcher for ScriptedFetcher {
    async fn fetch(&self, source: &DataSourceConfig) -> Result<Vec<u8>, ChartDataError> {
        let location = source.location().to_string();
        *self.calls.lock().unwrap().entry(location.clone()).or_default() += 1;
        self.started.fetch_add(1, Ordering::SeqCst);

        let mut guard = AbortGuard {
            aborted: &self.aborted,
            finished: false,
        };
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        guard.finished = true;

        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&location)
            .and_then(VecDeque::pop_front);
        match next {
            Some(response) => response.map(String::into_bytes),
            None => Err(ChartDataError::Io {
                location,
                message: "no scripted response".to_string(),
            }),
        }
    }
}

pub fn adapter<R: DatasetRow>(
    chart_type: &str,
    requirements: DataRequirements,
    fetcher: &Arc<ScriptedFetcher>,
    clock: &Arc<ManualClock>,
) -> DataAdapter<R> {
    DataAdapter::with_config(
        chart_type,
        requirements,
        fetcher.clone(),
        AdapterConfig::default().with_clock(clock.clone()),
    )
}
