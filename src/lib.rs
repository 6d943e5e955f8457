pub mod alerts;
pub mod config;
pub mod exporter;
pub mod monitors;
pub mod notify;
pub mod poll;
pub mod secrets;
pub mod sources;
pub mod util;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The four host metrics sampled every cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Cpu,
    Memory,
    Disk,
    Latency,
}

impl MetricKind {
    /// All kinds in the order a cycle evaluates them.
    pub const ALL: [MetricKind; 4] = [
        MetricKind::Cpu,
        MetricKind::Memory,
        MetricKind::Disk,
        MetricKind::Latency,
    ];

    /// How a breach of this kind turns into a notification.
    pub fn policy(self) -> AlertPolicy {
        match self {
            MetricKind::Cpu | MetricKind::Memory => AlertPolicy::Sustained,
            MetricKind::Disk | MetricKind::Latency => AlertPolicy::Immediate,
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            MetricKind::Latency => "ms",
            _ => "%",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MetricKind::Cpu => "CPU",
            MetricKind::Memory => "Memory",
            MetricKind::Disk => "Disk",
            MetricKind::Latency => "network latency",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertPolicy {
    /// Fires once per episode, after the value stayed above threshold for the sustained window.
    Sustained,
    /// Fires on every sample above threshold, gated only by the throttle.
    Immediate,
}

/// A single instantaneous sample. Produced fresh each cycle and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricReading {
    pub kind: MetricKind,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

impl MetricReading {
    pub fn new(kind: MetricKind, value: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind,
            value,
            timestamp,
        }
    }
}
