//! Experiment-setting hyperparameter tables.

use serde::{Deserialize, Serialize};

use crate::augment::{AugmentRange, RotationOrder};

/// Static optimizer choice; fixed for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OptimizerKind {
    Adam { epsilon: f64 },
    /// Momentum SGD with Nesterov acceleration.
    Momentum { momentum: f64 },
}

/// One named hyperparameter table.
///
/// Training and evaluation carry separate augmentation ranges: evaluation
/// uses narrower or zero-width ranges to measure invariance rather than
/// inject noise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentSetting {
    pub num_epochs: usize,
    pub batch_size: usize,
    /// Points drawn per sample each epoch
    pub sample_num: usize,

    pub learning_rate_base: f64,
    pub decay_steps: usize,
    pub decay_rate: f64,
    pub learning_rate_min: f64,
    pub weight_decay: f64,
    pub optimizer: OptimizerKind,

    pub jitter: f32,
    pub jitter_val: f32,
    pub rotation_range: AugmentRange,
    pub rotation_range_val: AugmentRange,
    pub scaling_range: AugmentRange,
    pub scaling_range_val: AugmentRange,
    pub rotation_order: RotationOrder,
}

impl ExperimentSetting {
    /// The object-dataset table used for the ScanObjectNN splits.
    pub fn object_x3() -> Self {
        Self {
            num_epochs: 250,
            batch_size: 32,
            sample_num: 1024,
            learning_rate_base: 0.01,
            decay_steps: 8000,
            decay_rate: 0.5,
            learning_rate_min: 1e-6,
            weight_decay: 1e-5,
            optimizer: OptimizerKind::Adam { epsilon: 1e-2 },
            jitter: 0.001,
            jitter_val: 0.0,
            rotation_range: AugmentRange::uniform(
                std::f32::consts::PI / 72.0,
                std::f32::consts::PI,
                std::f32::consts::PI / 72.0,
            ),
            rotation_range_val: AugmentRange::none(),
            scaling_range: AugmentRange::gauss(0.05, 0.05, 0.05),
            scaling_range_val: AugmentRange::none(),
            rotation_order: RotationOrder::Xyz,
        }
    }

    /// A small table for smoke runs on synthetic data.
    pub fn quick() -> Self {
        Self {
            num_epochs: 1,
            batch_size: 8,
            sample_num: 64,
            learning_rate_base: 0.01,
            decay_steps: 100,
            decay_rate: 0.5,
            learning_rate_min: 1e-6,
            weight_decay: 0.0,
            optimizer: OptimizerKind::Adam { epsilon: 1e-8 },
            jitter: 0.0,
            jitter_val: 0.0,
            rotation_range: AugmentRange::none(),
            rotation_range_val: AugmentRange::none(),
            scaling_range: AugmentRange::none(),
            scaling_range_val: AugmentRange::none(),
            rotation_order: RotationOrder::Xyz,
        }
    }
}
