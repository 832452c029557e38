// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Monitoring backend abstraction.
//!
//! A monitoring backend is organised as a tree of named objects:
//!
//! - a **container** per listener component (e.g. `cmisContainer`)
//! - **events** inside a container, each carrying an occurrence counter
//! - **accumulators** attached to an event, collecting duration samples
//!
//! Lookups create the object on first use and return the existing handle
//! afterwards. Handles are opaque, `Copy` and valid for the life of the
//! backend.
//!
//! Timing a call is `begin_timing` followed by `end_timing`; passing
//! `count = true` to `end_timing` also bumps the owning event's counter.

mod local;
mod stats;

pub use local::{LocalBackend, LookupCounts, MonitorSnapshot};
pub use stats::{DurationStats, Histogram};

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::MonitorError;

/// Identity a listener presents to the monitoring backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerInfo {
    pub name: String,
    pub version: String,
}

impl ListenerInfo {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl Default for ListenerInfo {
    fn default() -> Self {
        Self::new("CMIS V 1.1 monitoring extension", "0.1")
    }
}

/// Category an event is filed under.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventClass {
    /// Remote procedure calls (the default for service operations).
    #[default]
    Rpc,
    Database,
    Network,
}

impl EventClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rpc => "rpc",
            Self::Database => "database",
            Self::Network => "network",
        }
    }
}

impl fmt::Display for EventClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rpc" => Ok(Self::Rpc),
            "database" | "db" => Ok(Self::Database),
            "network" | "net" => Ok(Self::Network),
            other => Err(format!("unknown event class '{}'", other)),
        }
    }
}

macro_rules! handle_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            pub fn new(id: u32) -> Self {
                Self(id)
            }

            pub fn id(&self) -> u32 {
                self.0
            }
        }
    };
}

handle_type!(
    /// Handle to a container of events.
    ContainerHandle
);
handle_type!(
    /// Handle to an event (an occurrence counter).
    EventHandle
);
handle_type!(
    /// Handle to a duration accumulator attached to an event.
    AccumulatorHandle
);

/// A running duration measurement.
///
/// Created by [`MonitorBackend::begin_timing`] and consumed by
/// [`MonitorBackend::end_timing`]. Once stopped, the measured duration is
/// fixed, so the caller and the backend see the same value.
#[derive(Debug)]
pub struct Timer {
    accumulator: AccumulatorHandle,
    started: Instant,
    stopped: Option<Duration>,
}

impl Timer {
    /// Start timing against an accumulator.
    pub fn start(accumulator: AccumulatorHandle) -> Self {
        Self {
            accumulator,
            started: Instant::now(),
            stopped: None,
        }
    }

    pub fn accumulator(&self) -> AccumulatorHandle {
        self.accumulator
    }

    /// Freeze the measurement and return it. Later calls return the same
    /// duration.
    pub fn stop(&mut self) -> Duration {
        let started = self.started;
        *self.stopped.get_or_insert_with(|| started.elapsed())
    }

    /// Measured duration if stopped, otherwise time since start.
    pub fn elapsed(&self) -> Duration {
        self.stopped.unwrap_or_else(|| self.started.elapsed())
    }
}

/// Client interface of a monitoring backend.
///
/// Lookups are idempotent: asking twice for the same name under the same
/// parent returns the same handle. Timing and event recording sit on the
/// request path and cannot fail; a backend drops samples for handles it does
/// not know.
pub trait MonitorBackend: Send + Sync {
    /// Identity of the listener this backend reports for.
    fn listener(&self) -> &ListenerInfo;

    /// Look up (or create) the root container with the given name.
    fn lookup_container(&self, name: &str) -> Result<ContainerHandle, MonitorError>;

    /// Look up (or create) an event inside a container.
    fn lookup_event(
        &self,
        container: ContainerHandle,
        class: EventClass,
        name: &str,
    ) -> Result<EventHandle, MonitorError>;

    /// Look up (or create) a duration accumulator attached to an event.
    fn lookup_accumulator(
        &self,
        event: EventHandle,
        name: &str,
    ) -> Result<AccumulatorHandle, MonitorError>;

    /// Begin a duration measurement.
    fn begin_timing(&self, accumulator: AccumulatorHandle) -> Timer {
        Timer::start(accumulator)
    }

    /// Stop a measurement, recording its duration. With `count` set, the
    /// accumulator's event is incremented by one.
    fn end_timing(&self, timer: Timer, count: bool);

    /// Increment an event's counter without a duration.
    fn record_event(&self, event: EventHandle);
}
