//! Model Module
//!
//! The segmentation network, the experiment-setting hyperparameter tables,
//! and the name-based registry that resolves both at startup.

pub mod registry;
pub mod seg_net;
pub mod setting;

pub use registry::{resolve_model, resolve_setting};
pub use seg_net::{SegNet, SegNetConfig, SegNetOutput};
pub use setting::{ExperimentSetting, OptimizerKind};
