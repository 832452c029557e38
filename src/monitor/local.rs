// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! In-process monitoring backend.
//!
//! Keeps event counters and duration statistics in memory. Used by tests, the
//! benchmarks and the demo command, and by deployments that only want the
//! numbers in their own logs. The backend can be marked unreachable to
//! exercise fail-fast registration, and can delay lookups to simulate a slow
//! remote registry.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::stats::DurationStats;
use super::{
    AccumulatorHandle, ContainerHandle, EventClass, EventHandle, ListenerInfo, MonitorBackend,
    Timer,
};
use crate::error::MonitorError;

#[derive(Debug)]
struct EventEntry {
    container: ContainerHandle,
    class: EventClass,
    name: String,
    count: AtomicU64,
}

#[derive(Debug)]
struct AccumulatorEntry {
    event: EventHandle,
    name: String,
    stats: Mutex<DurationStats>,
}

#[derive(Debug, Default)]
struct Objects {
    containers: Vec<String>,
    container_index: HashMap<String, ContainerHandle>,
    events: Vec<EventEntry>,
    event_index: HashMap<(ContainerHandle, String), EventHandle>,
    accumulators: Vec<AccumulatorEntry>,
    accumulator_index: HashMap<(EventHandle, String), AccumulatorHandle>,
}

/// Number of lookup calls a backend has served, hits included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LookupCounts {
    pub containers: u64,
    pub events: u64,
    pub accumulators: u64,
}

#[derive(Debug, Default)]
struct LookupCounters {
    containers: AtomicU64,
    events: AtomicU64,
    accumulators: AtomicU64,
}

/// Monitoring backend that keeps everything in process memory.
#[derive(Debug)]
pub struct LocalBackend {
    listener: ListenerInfo,
    objects: RwLock<Objects>,
    reachable: AtomicBool,
    lookup_delay: Duration,
    lookups: LookupCounters,
    start_time: Instant,
}

impl LocalBackend {
    pub fn new(listener: ListenerInfo) -> Self {
        Self {
            listener,
            objects: RwLock::new(Objects::default()),
            reachable: AtomicBool::new(true),
            lookup_delay: Duration::ZERO,
            lookups: LookupCounters::default(),
            start_time: Instant::now(),
        }
    }

    /// Sleep this long inside every lookup.
    pub fn with_lookup_delay(mut self, delay: Duration) -> Self {
        self.lookup_delay = delay;
        self
    }

    /// Mark the backend reachable or not. Unreachable backends fail lookups.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::SeqCst)
    }

    /// Lookup calls served so far.
    pub fn lookup_counts(&self) -> LookupCounts {
        LookupCounts {
            containers: self.lookups.containers.load(Ordering::SeqCst),
            events: self.lookups.events.load(Ordering::SeqCst),
            accumulators: self.lookups.accumulators.load(Ordering::SeqCst),
        }
    }

    /// Current count of the named event, in any container.
    pub fn event_count(&self, name: &str) -> Option<u64> {
        let objects = self.objects.read().ok()?;
        objects
            .events
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.count.load(Ordering::Relaxed))
    }

    /// Statistics of the named accumulator, in any container.
    pub fn accumulator_stats(&self, name: &str) -> Option<DurationStats> {
        let objects = self.objects.read().ok()?;
        let entry = objects.accumulators.iter().find(|a| a.name == name)?;
        let stats = entry.stats.lock().ok()?;
        Some(stats.clone())
    }

    /// Copy out every counter and accumulator.
    pub fn snapshot(&self) -> MonitorSnapshot {
        let mut events = BTreeMap::new();
        let mut accumulators = BTreeMap::new();

        if let Ok(objects) = self.objects.read() {
            for entry in &objects.events {
                let container = objects
                    .containers
                    .get(entry.container.id() as usize)
                    .cloned()
                    .unwrap_or_default();
                events.insert(
                    format!("{}/{}", container, entry.name),
                    (entry.class, entry.count.load(Ordering::Relaxed)),
                );
            }
            for entry in &objects.accumulators {
                let (container, event) = objects
                    .events
                    .get(entry.event.id() as usize)
                    .map(|e| {
                        let container = objects
                            .containers
                            .get(e.container.id() as usize)
                            .map(String::as_str)
                            .unwrap_or_default();
                        (container, e.name.as_str())
                    })
                    .unwrap_or_default();
                if let Ok(stats) = entry.stats.lock() {
                    accumulators.insert(
                        format!("{}/{}/{}", container, event, entry.name),
                        stats.clone(),
                    );
                }
            }
        }

        MonitorSnapshot {
            listener: self.listener.clone(),
            events,
            accumulators,
            uptime: self.start_time.elapsed(),
        }
    }

    fn check_reachable(&self) -> Result<(), MonitorError> {
        if !self.lookup_delay.is_zero() {
            std::thread::sleep(self.lookup_delay);
        }
        if self.is_reachable() {
            Ok(())
        } else {
            Err(MonitorError::BackendUnreachable(format!(
                "listener '{}' has no connection",
                self.listener.name
            )))
        }
    }
}

impl Default for LocalBackend {
    fn default() -> Self {
        Self::new(ListenerInfo::default())
    }
}

impl MonitorBackend for LocalBackend {
    fn listener(&self) -> &ListenerInfo {
        &self.listener
    }

    fn lookup_container(&self, name: &str) -> Result<ContainerHandle, MonitorError> {
        self.lookups.containers.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;

        let mut objects = self
            .objects
            .write()
            .map_err(|_| MonitorError::container(name, "object table poisoned"))?;
        if let Some(&handle) = objects.container_index.get(name) {
            return Ok(handle);
        }

        let handle = ContainerHandle::new(objects.containers.len() as u32);
        objects.containers.push(name.to_string());
        objects.container_index.insert(name.to_string(), handle);
        debug!(container = name, id = handle.id(), "Created container");
        Ok(handle)
    }

    fn lookup_event(
        &self,
        container: ContainerHandle,
        class: EventClass,
        name: &str,
    ) -> Result<EventHandle, MonitorError> {
        self.lookups.events.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;

        let mut objects = self
            .objects
            .write()
            .map_err(|_| MonitorError::event(name, "object table poisoned"))?;
        if container.id() as usize >= objects.containers.len() {
            return Err(MonitorError::UnknownHandle(format!("{:?}", container)));
        }

        let key = (container, name.to_string());
        if let Some(&handle) = objects.event_index.get(&key) {
            return Ok(handle);
        }

        let handle = EventHandle::new(objects.events.len() as u32);
        objects.events.push(EventEntry {
            container,
            class,
            name: name.to_string(),
            count: AtomicU64::new(0),
        });
        objects.event_index.insert(key, handle);
        debug!(event = name, %class, id = handle.id(), "Created event");
        Ok(handle)
    }

    fn lookup_accumulator(
        &self,
        event: EventHandle,
        name: &str,
    ) -> Result<AccumulatorHandle, MonitorError> {
        self.lookups.accumulators.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;

        let mut objects = self
            .objects
            .write()
            .map_err(|_| MonitorError::accumulator(name, "object table poisoned"))?;
        if event.id() as usize >= objects.events.len() {
            return Err(MonitorError::UnknownHandle(format!("{:?}", event)));
        }

        let key = (event, name.to_string());
        if let Some(&handle) = objects.accumulator_index.get(&key) {
            return Ok(handle);
        }

        let handle = AccumulatorHandle::new(objects.accumulators.len() as u32);
        objects.accumulators.push(AccumulatorEntry {
            event,
            name: name.to_string(),
            stats: Mutex::new(DurationStats::new()),
        });
        objects.accumulator_index.insert(key, handle);
        debug!(accumulator = name, id = handle.id(), "Created accumulator");
        Ok(handle)
    }

    fn end_timing(&self, timer: Timer, count: bool) {
        let elapsed = timer.elapsed();
        let Ok(objects) = self.objects.read() else {
            return;
        };
        let Some(entry) = objects.accumulators.get(timer.accumulator().id() as usize) else {
            warn!(handle = ?timer.accumulator(), "Dropping sample for unknown accumulator");
            return;
        };

        if let Ok(mut stats) = entry.stats.lock() {
            stats.record(elapsed);
        }
        if count {
            if let Some(event) = objects.events.get(entry.event.id() as usize) {
                event.count.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn record_event(&self, event: EventHandle) {
        let Ok(objects) = self.objects.read() else {
            return;
        };
        match objects.events.get(event.id() as usize) {
            Some(entry) => {
                entry.count.fetch_add(1, Ordering::Relaxed);
            }
            None => warn!(handle = ?event, "Dropping occurrence for unknown event"),
        }
    }
}

/// Point-in-time copy of a [`LocalBackend`].
#[derive(Debug, Clone)]
pub struct MonitorSnapshot {
    pub listener: ListenerInfo,

    /// Event class and count, keyed by `container/event`.
    pub events: BTreeMap<String, (EventClass, u64)>,

    /// Duration statistics, keyed by `container/event/accumulator`.
    pub accumulators: BTreeMap<String, DurationStats>,

    pub uptime: Duration,
}

impl MonitorSnapshot {
    /// Format as a human-readable report.
    pub fn format_report(&self) -> String {
        let mut report = String::new();

        report.push_str("=== Monitoring Report ===\n\n");
        report.push_str(&format!(
            "Listener: {} {}\n",
            self.listener.name, self.listener.version
        ));
        report.push_str(&format!("Uptime: {:.2?}\n\n", self.uptime));

        if !self.events.is_empty() {
            report.push_str("Events:\n");
            for (name, (class, count)) in &self.events {
                report.push_str(&format!("  {} [{}]: {}\n", name, class, count));
            }
            report.push('\n');
        }

        if !self.accumulators.is_empty() {
            report.push_str("Durations:\n");
            for (name, stats) in &self.accumulators {
                report.push_str(&format!(
                    "  {}: {} samples, avg {:.2?}, min {:.2?}, max {:.2?}, p99 {:.2?}\n",
                    name,
                    stats.samples,
                    stats.mean(),
                    stats.min_or_zero(),
                    stats.max,
                    stats.histogram.p99()
                ));
            }
        }

        report
    }
}
