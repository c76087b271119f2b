use std::collections::HashSet;

use log::debug;
use sysinfo::Disks;

use crate::error::MetricError;

use super::types::{percent_of, DiskSnapshot, DiskUsage};

/// Filesystem types backed by memory, the kernel, or another mount.
const VIRTUAL_FS_TYPES: &[&str] = &[
    "tmpfs",
    "devtmpfs",
    "overlay",
    "overlayfs",
    "aufs",
    "squashfs",
    "ramfs",
    "proc",
    "sysfs",
    "devpts",
    "cgroup",
    "cgroup2",
    "efivarfs",
    "nsfs",
    "tracefs",
    "debugfs",
    "securityfs",
    "pstore",
    "bpf",
    "autofs",
    "mqueue",
    "hugetlbfs",
    "configfs",
    "fusectl",
    "binfmt_misc",
    "rpc_pipefs",
];

pub fn is_virtual_fs(file_system: &str) -> bool {
    let fs = file_system.trim().to_ascii_lowercase();
    fs.starts_with("fuse.") || VIRTUAL_FS_TYPES.contains(&fs.as_str())
}

pub trait DiskSource {
    fn list_filesystems(&mut self) -> Result<Vec<DiskSnapshot>, MetricError>;
}

pub struct SysinfoDisks;

impl DiskSource for SysinfoDisks {
    fn list_filesystems(&mut self) -> Result<Vec<DiskSnapshot>, MetricError> {
        let disks = Disks::new_with_refreshed_list();
        let list = disks.list();

        if list.is_empty() {
            return Err(MetricError::unavailable("disk", "no filesystems discovered"));
        }

        Ok(list
            .iter()
            .map(|disk| {
                let total_space = disk.total_space();
                // statvfs f_bavail: root-reserved blocks land in "used"
                let available_space = disk.available_space();
                DiskSnapshot {
                    device: disk.name().to_string_lossy().to_string(),
                    mount_point: disk.mount_point().to_string_lossy().to_string(),
                    file_system: disk.file_system().to_string_lossy().to_string(),
                    total_space,
                    available_space,
                    used_space: total_space.saturating_sub(available_space),
                }
            })
            .collect())
    }
}

/// Sum persistent filesystems, counting each device once. A listing with
/// nothing persistent in it (an overlay-root container) sums to zero.
pub fn aggregate(filesystems: Vec<DiskSnapshot>) -> DiskUsage {
    let mut seen_devices = HashSet::new();
    let mut kept = Vec::new();

    for fs in filesystems {
        if is_virtual_fs(&fs.file_system) {
            debug!("skipping {} ({}) at {}", fs.device, fs.file_system, fs.mount_point);
            continue;
        }
        if !seen_devices.insert(fs.device.clone()) {
            debug!("{} already counted; skipping {}", fs.device, fs.mount_point);
            continue;
        }
        kept.push(fs);
    }

    if kept.is_empty() {
        debug!("no persistent filesystems in listing");
    }

    let total_bytes = kept.iter().fold(0u64, |acc, fs| acc.saturating_add(fs.total_space));
    let used_bytes = kept.iter().fold(0u64, |acc, fs| acc.saturating_add(fs.used_space));

    DiskUsage {
        total_bytes,
        used_bytes,
        used_percent: percent_of(used_bytes, total_bytes),
        filesystems: kept,
    }
}

pub fn collect_disk_usage(source: &mut dyn DiskSource) -> Result<DiskUsage, MetricError> {
    Ok(aggregate(source.list_filesystems()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fs(device: &str, mount: &str, kind: &str, total: u64, used: u64) -> DiskSnapshot {
        DiskSnapshot {
            device: device.to_string(),
            mount_point: mount.to_string(),
            file_system: kind.to_string(),
            total_space: total,
            available_space: total - used,
            used_space: used,
        }
    }

    #[test]
    fn virtual_types_are_recognised() {
        for kind in ["tmpfs", "overlay", "devtmpfs", "squashfs", "fuse.lxcfs", "TMPFS"] {
            assert!(is_virtual_fs(kind), "{} should be virtual", kind);
        }
        for kind in ["ext4", "xfs", "btrfs", "zfs", "vfat", "nfs4"] {
            assert!(!is_virtual_fs(kind), "{} should be persistent", kind);
        }
    }

    #[test]
    fn aggregate_excludes_virtual_filesystems_with_nonzero_sizes() {
        let usage = aggregate(vec![
            fs("/dev/sda1", "/", "ext4", 1_000, 400),
            fs("tmpfs", "/run", "tmpfs", 5_000, 5_000),
            fs("overlay", "/var/lib/docker/x", "overlay", 9_000, 8_000),
            fs("/dev/sdb1", "/data", "xfs", 3_000, 600),
        ]);

        assert_eq!(usage.total_bytes, 4_000);
        assert_eq!(usage.used_bytes, 1_000);
        assert_eq!(usage.used_percent, 25.0);
        assert_eq!(usage.filesystems.len(), 2);
    }

    #[test]
    fn bind_mounts_count_once() {
        let usage = aggregate(vec![
            fs("/dev/sda1", "/", "ext4", 1_000, 500),
            fs("/dev/sda1", "/var/lib/kubelet", "ext4", 1_000, 500),
        ]);
        assert_eq!(usage.total_bytes, 1_000);
        assert_eq!(usage.filesystems.len(), 1);
    }

    #[test]
    fn overlay_root_sums_to_zero() {
        let usage = aggregate(vec![
            fs("overlay", "/", "overlay", 10_000, 4_000),
            fs("tmpfs", "/tmp", "tmpfs", 10, 1),
        ]);
        assert_eq!(usage.total_bytes, 0);
        assert_eq!(usage.used_bytes, 0);
        assert_eq!(usage.used_percent, 0.0);
        assert!(usage.filesystems.is_empty());
    }

    struct Listing(Option<Vec<DiskSnapshot>>);

    impl DiskSource for Listing {
        fn list_filesystems(&mut self) -> Result<Vec<DiskSnapshot>, MetricError> {
            self.0
                .clone()
                .ok_or_else(|| MetricError::unavailable("disk", "no filesystems discovered"))
        }
    }

    #[test]
    fn unreadable_listing_is_unavailable() {
        let err = collect_disk_usage(&mut Listing(None)).unwrap_err();
        assert!(matches!(err, MetricError::MetricUnavailable { metric: "disk", .. }));

        let usage = collect_disk_usage(&mut Listing(Some(Vec::new()))).unwrap();
        assert_eq!(usage.total_bytes, 0);
    }
}
