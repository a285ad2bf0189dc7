//! Name-based resolution of models and experiment settings.
//!
//! Both are resolved exactly once at startup; an unknown name is a fatal
//! configuration error.

use crate::model::{ExperimentSetting, SegNetConfig};
use crate::utils::error::{Result, TrainError};

/// Resolve a model name to its network configuration.
pub fn resolve_model(name: &str, num_classes: usize) -> Result<SegNetConfig> {
    match name {
        "seg_net" => Ok(SegNetConfig::new().with_num_classes(num_classes)),
        other => Err(TrainError::Configuration(format!(
            "unknown model '{other}' (available: seg_net)"
        ))),
    }
}

/// Resolve an experiment-setting name to its hyperparameter table.
pub fn resolve_setting(name: &str) -> Result<ExperimentSetting> {
    match name {
        "object_x3" => Ok(ExperimentSetting::object_x3()),
        "quick" => Ok(ExperimentSetting::quick()),
        other => Err(TrainError::Configuration(format!(
            "unknown setting '{other}' (available: object_x3, quick)"
        ))),
    }
}
