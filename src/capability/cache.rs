//! TTL cache of capability records.
//!
//! One coarse `Mutex` guards the whole map. Every critical section is a plain map
//! operation; callers await probes and invocations with the lock released.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::record::{CapabilityRecord, CapabilityState};
use crate::{Error, ErrorContext, Result};

struct Slot {
    record: CapabilityRecord,
    stored_at: Instant,
}

impl Slot {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() > ttl
    }
}

/// Capability records keyed by endpoint id. At most one record per id.
pub struct CapabilityCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, Slot>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CapabilityCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Slot>>> {
        self.entries.lock().map_err(|_| {
            Error::runtime_with_context(
                "capability cache poisoned",
                ErrorContext::new().with_source("capability_cache"),
            )
        })
    }

    /// Live record for `endpoint_id`. An expired record is evicted and reported as absent.
    pub fn get(&self, endpoint_id: &str) -> Result<Option<CapabilityRecord>> {
        let mut entries = self.lock()?;
        let expired = match entries.get(endpoint_id) {
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return Ok(None);
            }
            Some(slot) => slot.is_expired(self.ttl),
        };
        if expired {
            entries.remove(endpoint_id);
            self.misses.fetch_add(1, Ordering::Relaxed);
            warn!(endpoint = %endpoint_id, "capability record expired");
            return Ok(None);
        }
        self.hits.fetch_add(1, Ordering::Relaxed);
        let record = entries.get(endpoint_id).map(|slot| slot.record.clone());
        debug!(endpoint = %endpoint_id, "capability cache hit");
        Ok(record)
    }

    /// Store `record`, replacing any previous record for the same endpoint.
    pub fn insert(&self, record: CapabilityRecord) -> Result<()> {
        let mut entries = self.lock()?;
        entries.insert(
            record.endpoint_id.clone(),
            Slot {
                record,
                stored_at: Instant::now(),
            },
        );
        Ok(())
    }

    /// Record a native-path failure: the endpoint is marked textual-only.
    ///
    /// Only ever narrows capability. Returns the state it replaced.
    pub fn degrade(&self, endpoint_id: &str, error: impl Into<String>) -> Result<CapabilityState> {
        let record = CapabilityRecord::degraded(endpoint_id, error);
        let mut entries = self.lock()?;
        let previous = entries
            .get(endpoint_id)
            .filter(|slot| !slot.is_expired(self.ttl))
            .map(|slot| slot.record.state())
            .unwrap_or(CapabilityState::Unknown);
        entries.insert(
            endpoint_id.to_string(),
            Slot {
                record,
                stored_at: Instant::now(),
            },
        );
        drop(entries);
        info!(
            endpoint = %endpoint_id,
            from = %previous,
            to = %CapabilityState::TextualConfirmed,
            "capability degraded"
        );
        Ok(previous)
    }

    /// Remove one endpoint's record, or every record. Returns how many were removed.
    pub fn clear(&self, endpoint_id: Option<&str>) -> Result<usize> {
        let mut entries = self.lock()?;
        let removed = match endpoint_id {
            Some(id) => usize::from(entries.remove(id).is_some()),
            None => {
                let n = entries.len();
                entries.clear();
                n
            }
        };
        drop(entries);
        match endpoint_id {
            Some(id) => info!(endpoint = %id, removed, "capability cache cleared"),
            None => info!(removed, "capability cache cleared"),
        }
        Ok(removed)
    }

    /// Current state of `endpoint_id` without touching hit/miss counters.
    pub fn state(&self, endpoint_id: &str) -> Result<CapabilityState> {
        let entries = self.lock()?;
        Ok(entries
            .get(endpoint_id)
            .filter(|slot| !slot.is_expired(self.ttl))
            .map(|slot| slot.record.state())
            .unwrap_or(CapabilityState::Unknown))
    }

    /// Number of live records.
    pub fn len(&self) -> Result<usize> {
        let entries = self.lock()?;
        Ok(entries.values().filter(|s| !s.is_expired(self.ttl)).count())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Snapshot of live records, sorted by endpoint id.
    pub fn stats(&self) -> Result<CapabilityCacheStats> {
        let entries = self.lock()?;
        let mut cached: Vec<CachedCapability> = entries
            .values()
            .filter(|slot| !slot.is_expired(self.ttl))
            .map(|slot| CachedCapability::from(&slot.record))
            .collect();
        drop(entries);
        cached.sort_by(|a, b| a.endpoint_id.cmp(&b.endpoint_id));
        Ok(CapabilityCacheStats {
            total_cached: cached.len(),
            cache_ttl_hours: self.ttl.as_secs_f64() / 3600.0,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: cached,
        })
    }
}

impl std::fmt::Debug for CapabilityCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityCache")
            .field("ttl", &self.ttl)
            .field("hits", &self.hits.load(Ordering::Relaxed))
            .field("misses", &self.misses.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Serializable cache report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapabilityCacheStats {
    pub total_cached: usize,
    pub cache_ttl_hours: f64,
    pub hits: u64,
    pub misses: u64,
    pub entries: Vec<CachedCapability>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CachedCapability {
    pub endpoint_id: String,
    pub supports_native: bool,
    /// Seconds since the UNIX epoch.
    pub tested_at: u64,
    pub test_duration_ms: f64,
    pub error: Option<String>,
}

impl From<&CapabilityRecord> for CachedCapability {
    fn from(r: &CapabilityRecord) -> Self {
        Self {
            endpoint_id: r.endpoint_id.clone(),
            supports_native: r.supports_native,
            tested_at: r.tested_at_unix_secs(),
            test_duration_ms: r.test_duration_ms,
            error: r.error.clone(),
        }
    }
}
