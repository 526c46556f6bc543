//! Seeding and deleting jobs over the tile cache.
//!
//! Jobs are created through the [`JobRegistry`], run as cooperative
//! worker pools on the tokio runtime, and report progress through
//! immutable [`JobInfo`] snapshots.

mod delete;
mod job;
mod registry;
mod seed;

pub use job::{
    CacheJob, JobError, JobInfo, JobKind, JobOptions, JobState, TileFactory,
    DEFAULT_SEED_CONCURRENCY, DELETE_CHUNK_SIZE,
};
pub use registry::{JobRegistry, JobSpec, RegionSpec};
