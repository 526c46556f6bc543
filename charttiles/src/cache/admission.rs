//! Disk-space admission control for the tile cache.
//!
//! The cache samples free space at the cache root every
//! [`DISK_CHECK_INTERVAL`] written tiles. Once free space drops under
//! [`MIN_FREE_DISK_BYTES`], caching is disabled for the remainder of the
//! process lifetime; requests keep serving remote bytes without writing
//! them. The sticky behavior is deliberate (see DESIGN.md) - a cache that
//! flaps around the threshold is worse than one that stops cleanly.

use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::warn;

/// Minimum free space at the cache root before caching shuts off (1 GiB).
pub const MIN_FREE_DISK_BYTES: u64 = 1024 * 1024 * 1024;

/// Number of cached tiles between free-space probes.
pub const DISK_CHECK_INTERVAL: u64 = 1000;

type DiskProbe = Box<dyn Fn(&Path) -> io::Result<u64> + Send + Sync>;

/// Process-wide cache admission state.
///
/// Constructed once at startup and passed as an explicit dependency;
/// the free-space probe is injectable for tests.
pub struct CacheState {
    caching_disabled: AtomicBool,
    tiles_written: AtomicU64,
    probe: DiskProbe,
}

impl std::fmt::Debug for CacheState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheState")
            .field("caching_disabled", &self.caching_enabled())
            .field("tiles_written", &self.tiles_written.load(Ordering::Relaxed))
            .finish()
    }
}

impl CacheState {
    /// State with the real filesystem probe.
    pub fn new() -> Self {
        Self::with_probe(Box::new(free_disk_space))
    }

    /// State with an injected probe, for tests and simulations.
    pub fn with_probe(probe: DiskProbe) -> Self {
        Self {
            caching_disabled: AtomicBool::new(false),
            tiles_written: AtomicU64::new(0),
            probe,
        }
    }

    #[inline]
    pub fn caching_enabled(&self) -> bool {
        !self.caching_disabled.load(Ordering::Relaxed)
    }

    /// Disables caching for the rest of the process lifetime.
    pub fn disable_caching(&self) {
        if !self.caching_disabled.swap(true, Ordering::Relaxed) {
            warn!("free disk space below threshold, tile caching disabled");
        }
    }

    /// Admits one tile write: returns false when caching is disabled.
    ///
    /// Counts the write and probes free space every
    /// [`DISK_CHECK_INTERVAL`] admitted tiles.
    pub fn admit_write(&self, cache_root: &Path) -> bool {
        if !self.caching_enabled() {
            return false;
        }
        let written = self.tiles_written.fetch_add(1, Ordering::Relaxed) + 1;
        if written % DISK_CHECK_INTERVAL == 0 && !self.check_disk_space(cache_root) {
            return false;
        }
        true
    }

    /// Probes free space immediately; disables caching and returns false
    /// when the threshold is crossed.
    pub fn check_disk_space(&self, cache_root: &Path) -> bool {
        match (self.probe)(cache_root) {
            Ok(free) if free < MIN_FREE_DISK_BYTES => {
                self.disable_caching();
                false
            }
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "free-space probe failed, leaving caching enabled");
                true
            }
        }
    }
}

impl Default for CacheState {
    fn default() -> Self {
        Self::new()
    }
}

/// Free bytes available to unprivileged writers on the filesystem
/// holding `path`.
#[cfg(unix)]
pub fn free_disk_space(path: &Path) -> io::Result<u64> {
    use std::os::unix::ffi::OsStrExt;

    let c_path = std::ffi::CString::new(path.as_os_str().as_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(stat.f_bavail as u64 * stat.f_frsize as u64)
}

#[cfg(not(unix))]
pub fn free_disk_space(_path: &Path) -> io::Result<u64> {
    // No portable probe; admission control is effectively off.
    Ok(u64::MAX)
}
