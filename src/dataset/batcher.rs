//! Mini-batch to tensor conversion.

use burn::prelude::*;

use super::sampler::MiniBatch;

/// One mini-batch uploaded to the compute device.
///
/// Host-side label/mask copies are kept alongside the tensors so metric
/// bookkeeping does not read parameters back from the device.
#[derive(Clone, Debug)]
pub struct PointBatch<B: Backend> {
    /// Point coordinates with shape [batch_size, points, 3]
    pub points: Tensor<B, 3>,
    /// Class labels with shape [batch_size]
    pub labels: Tensor<B, 1, Int>,
    /// Binary per-point masks with shape [batch_size, points]
    pub masks: Tensor<B, 2, Int>,
    /// Row-major host copy of the labels
    pub label_values: Vec<i64>,
    /// Row-major host copy of the masks
    pub mask_values: Vec<i64>,
}

impl<B: Backend> PointBatch<B> {
    pub fn batch_size(&self) -> usize {
        self.label_values.len()
    }

    pub fn num_points(&self) -> usize {
        if self.label_values.is_empty() {
            0
        } else {
            self.mask_values.len() / self.label_values.len()
        }
    }
}

/// Converts sampled mini-batches into device tensors.
#[derive(Clone, Debug)]
pub struct PointBatcher<B: Backend> {
    device: B::Device,
}

impl<B: Backend> PointBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    pub fn batch(&self, mini: &MiniBatch) -> PointBatch<B> {
        let (batch_size, num_points, _) = mini.points.dim();

        let points_data: Vec<f32> = mini.points.iter().copied().collect();
        let points = Tensor::<B, 3>::from_floats(
            TensorData::new(points_data, [batch_size, num_points, 3]),
            &self.device,
        );

        let label_values: Vec<i64> = mini.labels.iter().copied().collect();
        let labels = Tensor::<B, 1, Int>::from_data(
            TensorData::new(label_values.clone(), [batch_size]),
            &self.device,
        );

        let mask_values: Vec<i64> = mini.masks.iter().copied().collect();
        let masks = Tensor::<B, 2, Int>::from_data(
            TensorData::new(mask_values.clone(), [batch_size, num_points]),
            &self.device,
        );

        PointBatch {
            points,
            labels,
            masks,
            label_values,
            mask_values,
        }
    }
}
