use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use sysinfo::{Disks, System};
use tracing::{trace, warn};

use super::{MetricSource, ping};

/// Window over which CPU usage is averaged
const CPU_SAMPLE_WINDOW: Duration = Duration::from_secs(1);

/// Reads the local machine through `sysinfo` and the system `ping` binary.
pub struct SystemMetricSource {
    system: System,
    probe_timeout: Duration,
}

impl SystemMetricSource {
    pub fn new(probe_timeout: Duration) -> Self {
        Self {
            system: System::new(),
            probe_timeout,
        }
    }
}

#[async_trait]
impl MetricSource for SystemMetricSource {
    async fn read_cpu(&mut self) -> Option<f64> {
        self.system.refresh_cpu_usage();
        tokio::time::sleep(CPU_SAMPLE_WINDOW.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL)).await;
        self.system.refresh_cpu_usage();

        let usage = self.system.global_cpu_usage() as f64;
        trace!("cpu: {usage}%");
        Some(usage)
    }

    async fn read_memory(&mut self) -> Option<f64> {
        self.system.refresh_memory();

        let total = self.system.total_memory();
        if total == 0 {
            warn!("memory: total reported as 0");
            return None;
        }

        let usage = self.system.used_memory() as f64 / total as f64 * 100.0;
        trace!("memory: {usage}%");
        Some(usage)
    }

    async fn read_disk(&mut self, path: &Path) -> Option<f64> {
        let disks = Disks::new_with_refreshed_list();
        let usage = disk_usage_percent(
            disks
                .list()
                .iter()
                .map(|disk| (disk.mount_point(), disk.total_space(), disk.available_space())),
            path,
        );

        if usage.is_none() {
            warn!("disk: no filesystem found for {}", path.display());
        }
        usage
    }

    async fn ping(&mut self, host: &str) -> Option<f64> {
        ping::ping(host, self.probe_timeout).await
    }
}

/// Usage of the mount with the longest mount point containing `path`.
///
/// Each mount is `(mount_point, total_bytes, available_bytes)`.
pub fn disk_usage_percent<'a>(
    mounts: impl IntoIterator<Item = (&'a Path, u64, u64)>,
    path: &Path,
) -> Option<f64> {
    let (_, total, available) = mounts
        .into_iter()
        .filter(|(mount_point, total, _)| *total > 0 && path.starts_with(mount_point))
        .max_by_key(|(mount_point, _, _)| mount_point.as_os_str().len())?;

    let used = total.saturating_sub(available);
    Some(used as f64 / total as f64 * 100.0)
}
