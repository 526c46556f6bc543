//! Cache job type and lifecycle.
//!
//! A job is a long-running unit of work over one chart source: seeding a
//! region into the cache or deleting a region from it. Jobs live in the
//! [`crate::jobs::JobRegistry`] across start/stop transitions; state,
//! kind, and counters are atomics so `info()` snapshots never block the
//! worker pool.

use crate::cache::TileCache;
use crate::coord::Tile;
use crate::provider::ChartSource;
use crate::region::Polygon;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Worker pool size for seeding jobs.
pub const DEFAULT_SEED_CONCURRENCY: usize = 32;

/// Chunk size for region deletes and orphan purges.
pub const DELETE_CHUNK_SIZE: usize = 1000;

/// Errors from job creation and registry control.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobError {
    #[error("invalid area: {0}")]
    InvalidArea(String),
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
    #[error("job {0} is running")]
    Busy(u64),
    #[error("unknown job {0}")]
    UnknownJob(u64),
}

/// What a job does when started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum JobKind {
    None = 0,
    Seed = 1,
    Delete = 2,
}

impl JobKind {
    #[inline]
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Seed,
            2 => Self::Delete,
            _ => Self::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Seed => "seed",
            Self::Delete => "delete",
        }
    }
}

/// Whether the job is currently executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum JobState {
    Stopped = 0,
    Running = 1,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Running => "running",
        }
    }
}

/// Caller-supplied job options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOptions {
    /// Fetch tiles again even when already cached.
    #[serde(default)]
    pub refetch: bool,
    /// Export the seeded region to a standalone MBTiles file on completion.
    #[serde(default)]
    pub mbtiles: bool,
    /// Vacuum the store after a delete.
    #[serde(default)]
    pub vacuum: bool,
}

/// Live job counters. Individually atomic; cross-field reads are
/// eventually consistent with in-flight workers.
#[derive(Debug, Default)]
pub(crate) struct JobCounters {
    pub total: AtomicU64,
    pub downloaded: AtomicU64,
    pub cached: AtomicU64,
    pub failed: AtomicU64,
    pub deleted: AtomicU64,
}

/// Factory producing a fresh, finite, lazy, single-use tile sequence.
pub type TileFactory = Box<dyn Fn() -> Box<dyn Iterator<Item = Tile> + Send> + Send + Sync>;

/// A seeding or deleting job over one chart source.
pub struct CacheJob<C> {
    pub id: u64,
    pub source: Arc<ChartSource>,
    pub area_description: String,
    pub options: JobOptions,
    pub(crate) kind: AtomicU8,
    pub(crate) state: AtomicU8,
    pub(crate) status: Mutex<String>,
    pub(crate) polygons: Vec<Polygon>,
    pub(crate) min_zoom: u8,
    pub(crate) max_zoom: u8,
    pub(crate) tiles: TileFactory,
    pub(crate) counters: JobCounters,
    pub(crate) estimated_total: u64,
    pub(crate) cancel: Mutex<CancellationToken>,
    pub(crate) cache: Arc<TileCache<C>>,
    pub(crate) concurrency: usize,
}

impl<C> std::fmt::Debug for CacheJob<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheJob")
            .field("id", &self.id)
            .field("area_description", &self.area_description)
            .field("options", &self.options)
            .field("kind", &self.kind())
            .field("state", &self.state())
            .field("min_zoom", &self.min_zoom)
            .field("max_zoom", &self.max_zoom)
            .field("estimated_total", &self.estimated_total)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl<C> CacheJob<C> {
    pub fn kind(&self) -> JobKind {
        JobKind::from_u8(self.kind.load(Ordering::Acquire))
    }

    pub fn state(&self) -> JobState {
        if self.state.load(Ordering::Acquire) == JobState::Running as u8 {
            JobState::Running
        } else {
            JobState::Stopped
        }
    }

    pub fn status(&self) -> String {
        self.status.lock().unwrap().clone()
    }

    pub(crate) fn set_status(&self, status: &str) {
        *self.status.lock().unwrap() = status.to_string();
    }

    /// Requests cooperative cancellation of the current run. Workers
    /// exit before their next pull; in-flight fetches and writes finish
    /// and are still counted.
    pub fn cancel(&self) {
        self.cancel.lock().unwrap().cancel();
    }

    pub fn cancel_requested(&self) -> bool {
        self.cancel.lock().unwrap().is_cancelled()
    }

    /// Transitions `stopped -> running` and arms a fresh cancellation
    /// token for this run. Fails with [`JobError::Busy`] when already
    /// running.
    pub(crate) fn begin_run(&self, kind: JobKind) -> Result<CancellationToken, JobError> {
        self.state
            .compare_exchange(
                JobState::Stopped as u8,
                JobState::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|_| JobError::Busy(self.id))?;

        self.kind.store(kind as u8, Ordering::Release);
        let token = CancellationToken::new();
        *self.cancel.lock().unwrap() = token.clone();

        match kind {
            JobKind::Seed => {
                self.counters.downloaded.store(0, Ordering::Relaxed);
                self.counters.cached.store(0, Ordering::Relaxed);
                self.counters.failed.store(0, Ordering::Relaxed);
                self.counters
                    .total
                    .store(self.estimated_total, Ordering::Relaxed);
            }
            JobKind::Delete => {
                self.counters.deleted.store(0, Ordering::Relaxed);
                self.counters
                    .total
                    .store(self.estimated_total, Ordering::Relaxed);
            }
            JobKind::None => {}
        }
        Ok(token)
    }

    /// Transitions back to `stopped`, optionally setting a final status.
    pub(crate) fn finish(&self, status: Option<&str>) {
        if let Some(status) = status {
            self.set_status(status);
        }
        self.state.store(JobState::Stopped as u8, Ordering::Release);
    }

    /// Immutable progress snapshot.
    pub fn info(&self) -> JobInfo {
        let kind = self.kind();
        let total = self.counters.total.load(Ordering::Relaxed);
        let downloaded = self.counters.downloaded.load(Ordering::Relaxed);
        let cached = self.counters.cached.load(Ordering::Relaxed);
        let failed = self.counters.failed.load(Ordering::Relaxed);
        let deleted = self.counters.deleted.load(Ordering::Relaxed);

        let progress = if total == 0 {
            0.0
        } else {
            match kind {
                JobKind::Seed => (downloaded + cached + failed) as f64 / total as f64,
                JobKind::Delete => deleted as f64 / total as f64,
                JobKind::None => 0.0,
            }
        };

        JobInfo {
            id: self.id,
            kind: kind.as_str().to_string(),
            state: self.state().as_str().to_string(),
            status: self.status(),
            provider: self.source.identifier.clone(),
            area_description: self.area_description.clone(),
            total_tiles: total,
            downloaded_tiles: downloaded,
            cached_tiles: cached,
            failed_tiles: failed,
            deleted_tiles: deleted,
            progress,
            options: self.options,
        }
    }
}

/// Snapshot of a job's progress, serialized for the jobs endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInfo {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: String,
    pub state: String,
    pub status: String,
    pub provider: String,
    pub area_description: String,
    pub total_tiles: u64,
    pub downloaded_tiles: u64,
    pub cached_tiles: u64,
    pub failed_tiles: u64,
    pub deleted_tiles: u64,
    pub progress: f64,
    pub options: JobOptions,
}
