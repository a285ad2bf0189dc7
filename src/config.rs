//! Run configuration snapshot.
//!
//! One immutable value constructed at startup from the command line and
//! passed into every component; no component reads ambient global state.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::utils::error::{Result, TrainError};
use crate::DEFAULT_SEG_WEIGHT;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// GPU device index (ignored on the CPU backend)
    pub gpu: usize,
    /// Checkpoint directory to resume model, optimizer, and step state from
    pub load_ckpt: Option<PathBuf>,
    /// Folder for checkpoints, the text log, and the summary stream
    pub log_dir: PathBuf,
    /// Keep background points in the loaded partitions
    pub with_bg: bool,
    /// Rescale each sample into the unit sphere
    pub norm: bool,
    /// Subtract each sample's coordinate mean
    pub center_data: bool,
    /// Weight of the segmentation term in the composite loss
    pub seg_weight: f64,
    pub train_file: PathBuf,
    pub test_file: PathBuf,
    /// Model name resolved through the registry
    pub model: String,
    /// Experiment-setting name resolved through the registry
    pub setting: String,
    /// Override of the setting's epoch count
    pub epochs: Option<usize>,
    /// Override of the setting's batch size
    pub batch_size: Option<usize>,
    /// Points drawn per sample each epoch
    pub num_point: usize,
    /// Seed for every random draw of the run
    pub seed: u64,
}

impl RunConfig {
    /// Check the cross-field constraints that clap cannot express.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.seg_weight) {
            return Err(TrainError::Configuration(format!(
                "segmentation weight {} is outside [0, 1]",
                self.seg_weight
            )));
        }
        if self.num_point == 0 {
            return Err(TrainError::Configuration(
                "per-sample point count must be positive".to_string(),
            ));
        }
        if matches!(self.batch_size, Some(0)) {
            return Err(TrainError::Configuration(
                "batch size override must be positive".to_string(),
            ));
        }
        if matches!(self.epochs, Some(0)) {
            return Err(TrainError::Configuration(
                "epoch override must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            gpu: 0,
            load_ckpt: None,
            log_dir: PathBuf::from("log/"),
            with_bg: true,
            norm: true,
            center_data: true,
            seg_weight: DEFAULT_SEG_WEIGHT,
            train_file: PathBuf::from(
                "h5_files/main_split/training_objectdataset_augmentedrot_scale75.h5",
            ),
            test_file: PathBuf::from(
                "h5_files/main_split/test_objectdataset_augmentedrot_scale75.h5",
            ),
            model: "seg_net".to_string(),
            setting: "object_x3".to_string(),
            epochs: None,
            batch_size: None,
            num_point: 1024,
            seed: 42,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(RunConfig::default().validate().is_ok());
    }

    #[test]
    fn test_out_of_range_seg_weight_is_rejected() {
        let config = RunConfig {
            seg_weight: 1.2,
            ..RunConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(TrainError::Configuration(_))
        ));
    }

    #[test]
    fn test_zero_overrides_are_rejected() {
        let config = RunConfig {
            batch_size: Some(0),
            ..RunConfig::default()
        };
        assert!(config.validate().is_err());

        let config = RunConfig {
            epochs: Some(0),
            ..RunConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
