//! Exponential learning-rate decay with a staircase and a floor.

use crate::model::ExperimentSetting;
use crate::utils::error::{Result, TrainError};

/// `lr = max(min, base * rate^floor(step / decay_steps))`
#[derive(Debug, Clone, Copy)]
pub struct DecaySchedule {
    base: f64,
    decay_steps: usize,
    decay_rate: f64,
    min: f64,
}

impl DecaySchedule {
    pub fn new(base: f64, decay_steps: usize, decay_rate: f64, min: f64) -> Result<Self> {
        if decay_steps == 0 {
            return Err(TrainError::Configuration(
                "decay_steps must be positive".to_string(),
            ));
        }
        if base <= 0.0 || decay_rate <= 0.0 {
            return Err(TrainError::Configuration(format!(
                "learning rate base {base} and decay rate {decay_rate} must be positive"
            )));
        }
        Ok(Self {
            base,
            decay_steps,
            decay_rate,
            min,
        })
    }

    pub fn from_setting(setting: &ExperimentSetting) -> Result<Self> {
        Self::new(
            setting.learning_rate_base,
            setting.decay_steps,
            setting.decay_rate,
            setting.learning_rate_min,
        )
    }

    /// Learning rate at the given global step.
    pub fn lr_at(&self, global_step: usize) -> f64 {
        let exponent = (global_step / self.decay_steps) as i32;
        (self.base * self.decay_rate.powi(exponent)).max(self.min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staircase_decay() {
        let schedule = DecaySchedule::new(0.1, 100, 0.5, 1e-9).unwrap();

        assert_eq!(schedule.lr_at(0), 0.1);
        assert_eq!(schedule.lr_at(99), 0.1);
        assert_eq!(schedule.lr_at(100), 0.05);
        assert_eq!(schedule.lr_at(199), 0.05);
        assert_eq!(schedule.lr_at(200), 0.025);
    }

    #[test]
    fn test_floor_is_respected() {
        let schedule = DecaySchedule::new(0.1, 10, 0.5, 1e-3).unwrap();
        assert_eq!(schedule.lr_at(10_000), 1e-3);
    }

    #[test]
    fn test_zero_decay_steps_is_rejected() {
        assert!(matches!(
            DecaySchedule::new(0.1, 0, 0.5, 1e-6),
            Err(TrainError::Configuration(_))
        ));
    }

    #[test]
    fn test_from_setting() {
        let schedule = DecaySchedule::from_setting(&ExperimentSetting::object_x3()).unwrap();
        assert_eq!(schedule.lr_at(0), 0.01);
    }
}
