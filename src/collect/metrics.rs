// ABOUTME: One-shot host metric snapshots: CPU, load, memory, swap, disks, network
// ABOUTME: CPU percentages need two refreshes separated by a short interval
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Vigil Agent Contributors

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sysinfo::{Disks, Networks, System, MINIMUM_CPU_UPDATE_INTERVAL};

/// One point-in-time view of the host, as served by `GET /api/metrics`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Whole-machine CPU utilization percentage.
    pub cpu_percent: f64,
    /// 1-minute load average.
    pub load1: f64,
    /// 5-minute load average.
    pub load5: f64,
    /// 15-minute load average.
    pub load15: f64,
    /// Bytes of memory in use.
    pub memory_used: u64,
    /// Bytes of memory installed.
    pub memory_total: u64,
    /// Bytes of swap in use.
    pub swap_used: u64,
    /// Bytes of swap configured.
    pub swap_total: u64,
    /// Used-space percentage per mount point.
    pub disk_usage: BTreeMap<String, f64>,
    /// Total bytes received across interfaces since boot.
    pub net_bytes_in: u64,
    /// Total bytes transmitted across interfaces since boot.
    pub net_bytes_out: u64,
    /// Total bytes read across disks.
    pub disk_read_bytes: u64,
    /// Total bytes written across disks.
    pub disk_write_bytes: u64,
    /// Boot time, seconds since the epoch.
    pub boot_time: u64,
    /// Uptime in seconds.
    pub uptime: u64,
}

/// Reusable snapshot source. The system handle persists across snapshots so
/// CPU deltas stay meaningful on a stream.
pub struct MetricsCollector {
    system: System,
}

impl MetricsCollector {
    /// A collector with no data loaded yet.
    #[must_use]
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }

    /// Take one snapshot. CPU utilization is measured over a short window
    /// (two refreshes with the minimum interval between them), so this
    /// call takes roughly that long.
    pub async fn snapshot(&mut self) -> MetricsSnapshot {
        self.system.refresh_cpu_usage();
        tokio::time::sleep(MINIMUM_CPU_UPDATE_INTERVAL).await;
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();

        let load = System::load_average();

        let mut disk_usage = BTreeMap::new();
        let mut disk_read_bytes: u64 = 0;
        let mut disk_write_bytes: u64 = 0;
        let disks = Disks::new_with_refreshed_list();
        for disk in disks.list() {
            let total = disk.total_space();
            if total == 0 {
                continue;
            }
            let used = total.saturating_sub(disk.available_space());
            let percent = used as f64 / total as f64 * 100.0;
            disk_usage.insert(disk.mount_point().to_string_lossy().into_owned(), percent);
            let io = disk.usage();
            disk_read_bytes = disk_read_bytes.saturating_add(io.total_read_bytes);
            disk_write_bytes = disk_write_bytes.saturating_add(io.total_written_bytes);
        }

        let mut net_bytes_in: u64 = 0;
        let mut net_bytes_out: u64 = 0;
        let networks = Networks::new_with_refreshed_list();
        for (_interface, data) in &networks {
            net_bytes_in = net_bytes_in.saturating_add(data.total_received());
            net_bytes_out = net_bytes_out.saturating_add(data.total_transmitted());
        }

        MetricsSnapshot {
            cpu_percent: f64::from(self.system.global_cpu_usage()),
            load1: load.one,
            load5: load.five,
            load15: load.fifteen,
            memory_used: self.system.used_memory(),
            memory_total: self.system.total_memory(),
            swap_used: self.system.used_swap(),
            swap_total: self.system.total_swap(),
            disk_usage,
            net_bytes_in,
            net_bytes_out,
            disk_read_bytes,
            disk_write_bytes,
            boot_time: System::boot_time(),
            uptime: System::uptime(),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
