use crate::collectors::{CollectError, MetricsSource};
use crate::snapshot::{DiskStat, MemoryStat};
#[cfg(target_os = "linux")]
use std::fs;
use sysinfo::{ComponentExt, CpuExt, System, SystemExt};
#[cfg(not(target_os = "linux"))]
use sysinfo::DiskExt;
use tracing::debug;

/// Reads the running host through sysinfo, plus mount table and statvfs on unix.
pub struct HostProbe {
    system: System,
}

impl HostProbe {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for HostProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSource for HostProbe {
    fn host_name(&mut self) -> Option<String> {
        self.system.host_name().filter(|h| !h.trim().is_empty())
    }

    fn prime_cpu(&mut self) {
        self.system.refresh_cpu();
    }

    fn cpu_usage(&mut self) -> Result<f64, CollectError> {
        self.system.refresh_cpu();
        if self.system.cpus().is_empty() {
            return Err(CollectError::unavailable(
                "cpu usage",
                "platform reports no cpus",
            ));
        }
        Ok(self.system.global_cpu_info().cpu_usage() as f64)
    }

    fn memory(&mut self) -> Result<MemoryStat, CollectError> {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        if total == 0 {
            return Err(CollectError::unavailable(
                "memory",
                "platform reports zero total memory",
            ));
        }
        Ok(MemoryStat::from_bytes(
            total,
            self.system.available_memory(),
            self.system.used_memory(),
            self.system.free_memory(),
        )
        .with_swap(
            self.system.total_swap(),
            self.system.used_swap(),
            self.system.free_swap(),
        ))
    }

    #[cfg(target_os = "linux")]
    fn partitions(&mut self) -> Result<Vec<String>, CollectError> {
        let text = fs::read_to_string("/proc/self/mounts")
            .map_err(|err| CollectError::unavailable("disk partitions", err.to_string()))?;
        let mounts = parse_mount_table(&text);
        debug!(count = mounts.len(), "mount table read");
        Ok(mounts)
    }

    #[cfg(not(target_os = "linux"))]
    fn partitions(&mut self) -> Result<Vec<String>, CollectError> {
        self.system.refresh_disks_list();
        let mounts: Vec<String> = self
            .system
            .disks()
            .iter()
            .map(|d| d.mount_point().to_string_lossy().to_string())
            .collect();
        if mounts.is_empty() {
            return Err(CollectError::unavailable(
                "disk partitions",
                "platform reports no mounted disks",
            ));
        }
        Ok(mounts)
    }

    #[cfg(unix)]
    fn disk_usage(&mut self, mountpoint: &str) -> Result<DiskStat, CollectError> {
        statvfs_usage(mountpoint)
    }

    #[cfg(not(unix))]
    fn disk_usage(&mut self, mountpoint: &str) -> Result<DiskStat, CollectError> {
        self.system.refresh_disks();
        let disk = self
            .system
            .disks()
            .iter()
            .find(|d| d.mount_point().to_string_lossy() == mountpoint)
            .ok_or_else(|| {
                CollectError::unavailable("disk usage", format!("{mountpoint}: not mounted"))
            })?;
        let total = disk.total_space();
        let free = disk.available_space();
        Ok(DiskStat::new(mountpoint, total, total.saturating_sub(free), free))
    }

    fn temperatures(&mut self) -> Result<Vec<f64>, CollectError> {
        self.system.refresh_components_list();
        let mut temps: Vec<f64> = self
            .system
            .components()
            .iter()
            .map(|c| c.temperature() as f64)
            .collect();
        let sysinfo_count = temps.len();
        if temps.is_empty() {
            temps = collect_linux_temps();
        }
        debug!(
            sysinfo_temps = sysinfo_count,
            total_temps = temps.len(),
            "temperature sources read"
        );
        Ok(temps)
    }
}

/// Mountpoints from a `/proc/mounts`-style table, in file order.
pub fn parse_mount_table(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .map(unescape_mount_field)
        .collect()
}

/// Decodes the `\NNN` octal escapes the kernel writes for space, tab, newline and backslash.
fn unescape_mount_field(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() {
            let digits = &bytes[i + 1..i + 4];
            if digits.iter().all(|b| (b'0'..=b'7').contains(b)) {
                let v = digits
                    .iter()
                    .fold(0_u32, |acc, b| acc * 8 + u32::from(b - b'0'));
                if let Ok(v) = u8::try_from(v) {
                    out.push(v);
                    i += 4;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(unix)]
fn statvfs_usage(mountpoint: &str) -> Result<DiskStat, CollectError> {
    use std::ffi::CString;
    use std::mem::MaybeUninit;

    let c_path = CString::new(mountpoint).map_err(|err| {
        CollectError::unavailable("disk usage", format!("{mountpoint}: {err}"))
    })?;
    let mut stat = MaybeUninit::<libc::statvfs>::uninit();

    // SAFETY: c_path is NUL-terminated and stat points to writable storage of the right type.
    let ret = unsafe { libc::statvfs(c_path.as_ptr(), stat.as_mut_ptr()) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        return Err(CollectError::unavailable(
            "disk usage",
            format!("{mountpoint}: {err}"),
        ));
    }
    // SAFETY: statvfs returned 0, so the struct is initialized.
    let stat = unsafe { stat.assume_init() };

    Ok(usage_from_blocks(
        mountpoint,
        stat.f_blocks as u64,
        stat.f_bfree as u64,
        stat.f_bavail as u64,
        stat.f_frsize as u64,
    ))
}

/// Byte counts from statvfs block counters; bogus counters saturate instead of overflowing.
#[cfg_attr(not(unix), allow(dead_code))]
fn usage_from_blocks(
    mountpoint: &str,
    blocks: u64,
    bfree: u64,
    bavail: u64,
    frsize: u64,
) -> DiskStat {
    let total = blocks.saturating_mul(frsize);
    let free = bavail.saturating_mul(frsize);
    let used = blocks.saturating_sub(bfree).saturating_mul(frsize);
    DiskStat::new(mountpoint, total, used, free)
}

#[cfg(target_os = "linux")]
fn collect_linux_temps() -> Vec<f64> {
    let Ok(entries) = fs::read_dir("/sys/class/thermal") else {
        return Vec::new();
    };

    let mut zones: Vec<_> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|v| v.to_str())
                .is_some_and(|n| n.starts_with("thermal_zone"))
        })
        .collect();
    zones.sort();

    zones
        .iter()
        .filter_map(|zone| fs::read_to_string(zone.join("temp")).ok())
        .filter_map(|raw| raw.trim().parse::<f64>().ok())
        .map(|v| if v > 1000.0 { v / 1000.0 } else { v })
        .collect()
}

#[cfg(not(target_os = "linux"))]
fn collect_linux_temps() -> Vec<f64> {
    Vec::new()
}
