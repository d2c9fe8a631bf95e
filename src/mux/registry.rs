use crate::rpc::adapter::ProviderAdapter;

use std::{
    sync::{
        Arc,
        RwLock,
        RwLockReadGuard,
        RwLockWriteGuard,
    },
    time::{
        Duration,
        Instant,
    },
};

/// Per-provider runtime state. Owned exclusively by the registry, adapters
/// themselves never carry health bookkeeping.
pub struct ProviderRecord {
    pub adapter: Arc<dyn ProviderAdapter>,
    pub weight: u128,       // static priority hint, higher means preferred
    pub failure_count: u32, // consecutive failed uses, reset on success
    pub last_used: u128,    // micros since the registry epoch, set at selection time
    pub cooldown_until: u128,
}

impl ProviderRecord {
    pub fn new(adapter: Arc<dyn ProviderAdapter>, weight: u32) -> Self {
        Self {
            adapter,
            weight: weight.max(1) as u128,
            failure_count: 0,
            last_used: 0,
            cooldown_until: 0,
        }
    }

    pub fn is_cooling(&self, now: u128) -> bool {
        now < self.cooldown_until
    }
}

pub(crate) struct Inner {
    pub records: Vec<ProviderRecord>,
    // Index of the last record round robin selected. Scans start right after it.
    pub cursor: usize,
}

/// Fixed membership set of providers plus the selection cursor, established
/// once at startup. One lock guards every mutation, which is plenty for the
/// handful of backends a deployment realistically has. The lock is never held
/// across an await.
pub struct Registry {
    pub(crate) inner: RwLock<Inner>,
    epoch: Instant,
    pub cooldown_threshold: u32,
    pub cooldown: Duration,
}

impl Registry {
    pub fn new(records: Vec<ProviderRecord>, cooldown_threshold: u32, cooldown: Duration) -> Self {
        let cursor = records.len().saturating_sub(1);

        Self {
            inner: RwLock::new(Inner { records, cursor }),
            epoch: Instant::now(),
            cooldown_threshold: cooldown_threshold.max(1),
            cooldown,
        }
    }

    pub fn len(&self) -> usize {
        self.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Monotonic time, safe against wall clock jumps
    pub fn now_micros(&self) -> u128 {
        self.epoch.elapsed().as_micros()
    }

    pub fn names(&self) -> Vec<String> {
        self.read()
            .records
            .iter()
            .map(|record| record.adapter.name().to_string())
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read()
            .records
            .iter()
            .any(|record| record.adapter.name() == name)
    }

    pub fn adapter(&self, position: usize) -> Arc<dyn ProviderAdapter> {
        Arc::clone(&self.read().records[position].adapter)
    }

    // A failed use walks the record towards cooldown. Once the threshold is
    // met the record is out of rotation until `cooldown_until` passes, and a
    // single failure after that probation re-arms the cooldown immediately.
    pub fn record_failure(&self, position: usize) {
        let now = self.now_micros();
        let mut inner = self.write();

        let record = match inner.records.get_mut(position) {
            Some(record) => record,
            None => return,
        };

        record.failure_count += 1;
        if record.failure_count >= self.cooldown_threshold {
            record.cooldown_until = now + self.cooldown.as_micros();
        }
    }

    // Health is only forgiven by a successful use
    pub fn record_success(&self, position: usize) {
        let mut inner = self.write();

        if let Some(record) = inner.records.get_mut(position) {
            record.failure_count = 0;
        }
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap()
    }
}
