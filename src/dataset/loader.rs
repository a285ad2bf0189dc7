//! HDF5 partition loading and coordinate preprocessing.
//!
//! A partition file exposes three co-indexed datasets: `data` (float,
//! N x P x 3), `label` (int, N), and `mask` (int, N x P).

use std::path::Path;

use ndarray::{Array, Array1, Array2, Array3, Axis, Dimension, Ix1, Ix2, Ix3};

use crate::utils::error::{Result, TrainError};

const POINTS_DATASET: &str = "data";
const LABELS_DATASET: &str = "label";
const MASKS_DATASET: &str = "mask";

/// One dataset split, fully materialized in memory.
#[derive(Debug, Clone)]
pub struct Partition {
    points: Array3<f32>,
    labels: Array1<i64>,
    masks: Array2<i64>,
}

impl Partition {
    /// Build a partition from pre-loaded arrays, checking co-indexing.
    pub fn from_arrays(
        points: Array3<f32>,
        labels: Array1<i64>,
        masks: Array2<i64>,
    ) -> Result<Self> {
        let (n, p, d) = points.dim();
        if d != 3 {
            return Err(TrainError::Configuration(format!(
                "points must have 3 coordinates per point, got {d}"
            )));
        }
        if labels.len() != n {
            return Err(TrainError::Configuration(format!(
                "label count {} does not match sample count {n}",
                labels.len()
            )));
        }
        if masks.dim() != (n, p) {
            return Err(TrainError::Configuration(format!(
                "mask shape {:?} does not match points shape ({n}, {p})",
                masks.dim()
            )));
        }
        Ok(Self {
            points,
            labels,
            masks,
        })
    }

    /// Read the three co-indexed datasets from an HDF5 file.
    pub fn load(path: &Path) -> Result<Self> {
        let file = hdf5::File::open(path)
            .map_err(|e| TrainError::DataLoad(path.to_path_buf(), e.to_string()))?;

        let points = read_dataset::<f32, Ix3>(&file, POINTS_DATASET, path)?;
        let labels = read_dataset::<i64, Ix1>(&file, LABELS_DATASET, path)?;
        let masks = read_dataset::<i64, Ix2>(&file, MASKS_DATASET, path)?;

        Self::from_arrays(points, labels, masks)
            .map_err(|e| TrainError::DataLoad(path.to_path_buf(), e.to_string()))
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.points.dim().0
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Points stored per sample.
    pub fn num_points(&self) -> usize {
        self.points.dim().1
    }

    pub fn points(&self) -> &Array3<f32> {
        &self.points
    }

    pub fn labels(&self) -> &Array1<i64> {
        &self.labels
    }

    pub fn masks(&self) -> &Array2<i64> {
        &self.masks
    }

    /// Map raw mask encodings onto strict {0, 1}.
    ///
    /// Background points are stored as -1 (or already 0) in the raw files;
    /// any other value outside {0, 1} is rejected with its location.
    pub fn binarize_masks(mut self) -> Result<Self> {
        for ((sample, point), value) in self.masks.indexed_iter_mut() {
            *value = match *value {
                -1 | 0 => 0,
                1 => 1,
                other => {
                    return Err(TrainError::InvalidMask {
                        value: other,
                        sample,
                        point,
                    })
                }
            };
        }
        Ok(self)
    }

    /// Subtract each sample's coordinate mean.
    pub fn center(mut self) -> Self {
        for mut sample in self.points.axis_iter_mut(Axis(0)) {
            if let Some(mean) = sample.mean_axis(Axis(0)) {
                sample -= &mean;
            }
        }
        self
    }

    /// Rescale each sample into the unit sphere.
    ///
    /// Division is by the largest point norm, so `center` followed by
    /// `normalize` is idempotent under a second application.
    pub fn normalize(mut self) -> Self {
        for mut sample in self.points.axis_iter_mut(Axis(0)) {
            let max_norm = sample
                .axis_iter(Axis(0))
                .map(|point| point.dot(&point).sqrt())
                .fold(0.0f32, f32::max);
            if max_norm > f32::EPSILON {
                sample /= max_norm;
            }
        }
        self
    }
}

fn read_dataset<T, D>(file: &hdf5::File, name: &str, path: &Path) -> Result<Array<T, D>>
where
    T: hdf5::H5Type,
    D: Dimension,
{
    let dataset = file
        .dataset(name)
        .map_err(|e| TrainError::DataLoad(path.to_path_buf(), format!("dataset '{name}': {e}")))?;
    dataset
        .read_dyn::<T>()
        .map_err(|e| TrainError::DataLoad(path.to_path_buf(), format!("dataset '{name}': {e}")))?
        .into_dimensionality::<D>()
        .map_err(|e| TrainError::DataLoad(path.to_path_buf(), format!("dataset '{name}': {e}")))
}
