//! Dataset Module
//!
//! Loading, preprocessing, and batching of point-cloud partitions. A
//! partition holds the points, class labels, and per-point masks of one
//! split (train or test), fully materialized and immutable after the
//! optional center/normalize preprocessing pass.

pub mod batcher;
pub mod loader;
pub mod sampler;

pub use batcher::{PointBatch, PointBatcher};
pub use loader::Partition;
pub use sampler::{EpochDraw, MiniBatch};
