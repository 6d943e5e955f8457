//! Metric sampling
//!
//! A [`MetricSource`] answers one instantaneous reading per metric kind. `None` means
//! "no reading this cycle"; the poll loop skips that kind and carries on.

pub mod ping;
pub mod system;

use std::path::Path;

use async_trait::async_trait;

pub use system::SystemMetricSource;

#[async_trait]
pub trait MetricSource: Send {
    /// Global CPU usage in percent
    async fn read_cpu(&mut self) -> Option<f64>;

    /// Used memory in percent
    async fn read_memory(&mut self) -> Option<f64>;

    /// Usage in percent of the filesystem holding `path`
    async fn read_disk(&mut self, path: &Path) -> Option<f64>;

    /// Round-trip time to `host` in milliseconds
    async fn ping(&mut self, host: &str) -> Option<f64>;
}
