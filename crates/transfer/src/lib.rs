//! Transfer planning for the upload subsystem.
//!
//! Pure logic only — no I/O and no HTTP. The upload crate drives these
//! types against a real transport:
//!
//! - [`ChunkPlan`] splits a total size into sequential byte ranges.
//! - [`Strategy`] picks single-shot multipart vs. chunked transfer.
//! - [`ProgressEstimator`] turns byte counts into throttled speed/ETA
//!   updates.

mod chunker;
mod progress;
mod strategy;

pub use chunker::{ChunkIter, ChunkPlan, ChunkSpec, DEFAULT_CHUNK_SIZE};
pub use progress::{ProgressEstimator, ProgressSample, ProgressUpdate};
pub use strategy::{DEFAULT_SINGLE_SHOT_LIMIT, Strategy, StrategyConfig, is_local_base_url};
