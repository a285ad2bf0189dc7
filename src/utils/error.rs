//! Error Handling Module
//!
//! Defines the error taxonomy for the training job. Every error is fatal at
//! this layer: the run logs the detail and aborts, there are no retries and
//! no partial-failure semantics. Uses thiserror for ergonomic definitions.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for training operations.
#[derive(Error, Debug)]
pub enum TrainError {
    /// Missing or malformed HDF5 input (wrong shapes, missing datasets).
    /// Raised before training starts.
    #[error("failed to load '{0}': {1}")]
    DataLoad(PathBuf, String),

    /// A mask value outside the supported encoding was found during
    /// binarisation.
    #[error("invalid mask value {value} at sample {sample}, point {point} (expected -1, 0 or 1)")]
    InvalidMask {
        value: i64,
        sample: usize,
        point: usize,
    },

    /// Inconsistent configuration detected at setup (weight outside [0,1],
    /// sample count larger than the stored point count, empty partition,
    /// unknown registry name).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Failure during a forward/backward pass, checkpoint write or any
    /// other computation after setup. Aborts the run.
    #[error("computation error: {0}")]
    Computation(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type for training operations.
pub type Result<T> = std::result::Result<T, TrainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TrainError::Configuration("seg weight out of range".to_string());
        assert_eq!(
            format!("{}", err),
            "configuration error: seg weight out of range"
        );
    }

    #[test]
    fn test_data_load_error_includes_path() {
        let err = TrainError::DataLoad(PathBuf::from("/data/train.h5"), "no such file".to_string());
        assert!(format!("{}", err).contains("train.h5"));
    }

    #[test]
    fn test_invalid_mask_error_reports_location() {
        let err = TrainError::InvalidMask {
            value: 2,
            sample: 7,
            point: 130,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("2"));
        assert!(msg.contains("sample 7"));
        assert!(msg.contains("point 130"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: TrainError = io.into();
        assert!(matches!(err, TrainError::Io(_)));
    }
}
