use crate::Collector;
use anyhow::Result;
use hostmon_common::types::{Metric, Metrics};
use sysinfo::Disks;

pub struct DiskCollector {
    disks: Disks,
}

impl Default for DiskCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl DiskCollector {
    pub fn new() -> Self {
        Self {
            disks: Disks::new_with_refreshed_list(),
        }
    }
}

/// Mount points that only ever hold virtual/pseudo filesystems.
fn is_pseudo_mount(mount: &str) -> bool {
    mount.starts_with("/snap/")
        || mount.starts_with("/sys/")
        || mount.starts_with("/proc/")
        || mount.starts_with("/dev/")
        || mount.starts_with("/run/")
}

/// Sanitize a mount point for use inside a dotted metric name.
fn mount_key(mount: &str) -> String {
    if mount == "/" {
        return "root".to_string();
    }
    mount
        .trim_matches('/')
        .replace(['/', '.'], "_")
}

impl Collector for DiskCollector {
    fn id(&self) -> &str {
        "disk"
    }

    fn collect(&mut self) -> Result<Metrics> {
        self.disks.refresh(false);
        let mut metrics = Metrics::new();

        for disk in self.disks.iter() {
            let mount = disk.mount_point().to_string_lossy().to_string();
            if is_pseudo_mount(&mount) {
                continue;
            }

            let total = disk.total_space();
            if total == 0 {
                continue;
            }
            let available = disk.available_space();
            let used = total.saturating_sub(available);
            let used_pct = (used as f64 / total as f64) * 100.0;

            let key = mount_key(&mount);
            metrics.insert(format!("{key}.total"), Metric::uint64(total));
            metrics.insert(format!("{key}.used"), Metric::uint64(used));
            metrics.insert(format!("{key}.available"), Metric::uint64(available));
            metrics.insert(format!("{key}.used_percent"), Metric::double(used_pct));
        }

        Ok(metrics)
    }
}
