//! # pointcnn-seg
//!
//! Joint object classification and foreground/background point segmentation
//! for HDF5-stored point clouds, trained with the Burn framework.
//!
//! The crate is organised around a single offline training job: load the
//! train/test partitions, resample and shuffle a working set every epoch,
//! augment each mini-batch with a random rigid transform plus jitter, run the
//! point network, and update parameters under a composite
//! classification + segmentation loss with a step-decayed learning rate.
//!
//! ## Modules
//!
//! - `dataset`: HDF5 partition loading, mask binarisation, center/normalize
//!   preprocessing, per-epoch sampling and batching
//! - `augment`: per-batch rotation/scaling transforms and point jitter
//! - `model`: the point network, experiment-setting tables and the name
//!   registry that resolves both at startup
//! - `training`: composite loss, learning-rate schedule, scalar summary
//!   stream and the epoch-by-epoch trainer
//! - `utils`: error taxonomy, metric accumulators, logging setup

pub mod augment;
pub mod backend;
pub mod config;
pub mod dataset;
pub mod model;
pub mod training;
pub mod utils;

pub use config::RunConfig;
pub use dataset::loader::Partition;
pub use dataset::sampler::EpochDraw;
pub use model::seg_net::{SegNet, SegNetConfig, SegNetOutput};
pub use model::setting::{ExperimentSetting, OptimizerKind};
pub use training::scheduler::DecaySchedule;
pub use training::trainer::{EpochReport, RunReport, Trainer};
pub use utils::error::{Result, TrainError};

/// Object classes in the dataset (ScanObjectNN main split).
pub const NUM_CLASSES: usize = 15;

/// Segmentation is a per-point foreground/background decision.
pub const NUM_SEG_CLASSES: usize = 2;

/// Default weight of the segmentation term in the composite loss.
pub const DEFAULT_SEG_WEIGHT: f64 = 0.5;

/// Version of the library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
