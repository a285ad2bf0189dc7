//! Training Module
//!
//! The per-epoch training/evaluation loop and its supporting pieces:
//! composite loss, exponential learning-rate decay, the structured scalar
//! stream, and checkpoint persistence.

pub mod loss;
pub mod scheduler;
pub mod summary;
pub mod trainer;

pub use loss::{classification_predictions, segmentation_predictions, BatchLosses};
pub use scheduler::DecaySchedule;
pub use summary::ScalarWriter;
pub use trainer::{EpochReport, RunReport, Trainer};
