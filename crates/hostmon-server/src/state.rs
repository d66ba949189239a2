use crate::plugins::PluginRegistry;
use crate::receiver::ReceiverStore;
use chrono::{DateTime, Utc};
use hostmon_collector::Collector;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Request counters surfaced on `/stats`.
#[derive(Debug, Default)]
pub struct RequestStats {
    total: AtomicU64,
    bad: AtomicU64,
}

impl RequestStats {
    pub fn record(&self) {
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bad(&self) {
        self.total.fetch_add(1, Ordering::Relaxed);
        self.bad.fetch_add(1, Ordering::Relaxed);
    }

    /// (total, bad)
    pub fn snapshot(&self) -> (u64, u64) {
        (
            self.total.load(Ordering::Relaxed),
            self.bad.load(Ordering::Relaxed),
        )
    }
}

#[derive(Clone)]
pub struct AgentState {
    /// Built-in collectors. Several keep previous readings for deltas, so
    /// they are collected under a lock, never across an await point.
    pub collectors: Arc<Mutex<Vec<Box<dyn Collector>>>>,
    pub plugins: Arc<PluginRegistry>,
    pub receiver: Arc<ReceiverStore>,
    pub stats: Arc<RequestStats>,
    pub start_time: DateTime<Utc>,
}

impl AgentState {
    pub fn new(collectors: Vec<Box<dyn Collector>>, plugins: PluginRegistry) -> Self {
        Self {
            collectors: Arc::new(Mutex::new(collectors)),
            plugins: Arc::new(plugins),
            receiver: Arc::new(ReceiverStore::new()),
            stats: Arc::new(RequestStats::default()),
            start_time: Utc::now(),
        }
    }
}
