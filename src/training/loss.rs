//! Composite classification + segmentation loss and prediction rules.

use burn::nn::loss::CrossEntropyLossConfig;
use burn::prelude::*;
use burn::tensor::activation::softmax;
use burn::tensor::ElementConversion;

use crate::model::SegNetOutput;
use crate::utils::error::{Result, TrainError};

/// The loss terms of one mini-batch.
///
/// `total` is the convex combination reported in the logs; the
/// regularization penalty is added separately for the optimizer step only.
#[derive(Debug, Clone)]
pub struct BatchLosses<B: Backend> {
    pub total: Tensor<B, 1>,
    pub classify: Tensor<B, 1>,
    pub seg: Tensor<B, 1>,
}

impl<B: Backend> BatchLosses<B> {
    /// Host-side copies of the three terms, for metric accumulation.
    pub fn values(&self) -> (f64, f64, f64) {
        (
            self.total.clone().into_scalar().elem(),
            self.classify.clone().into_scalar().elem(),
            self.seg.clone().into_scalar().elem(),
        )
    }
}

/// Compute the weighted classification + segmentation loss.
///
/// The scalar sample label is broadcast to every point position before the
/// classification cross-entropy, enforcing per-point consistency with the
/// sample-level label. `total = (1 - w) * classify + w * seg`.
pub fn composite_loss<B: Backend>(
    output: &SegNetOutput<B>,
    labels: Tensor<B, 1, Int>,
    masks: Tensor<B, 2, Int>,
    seg_weight: f64,
) -> BatchLosses<B> {
    let device = output.classification.device();
    let [batch_size, num_points, num_classes] = output.classification.dims();
    let [_, _, num_seg_classes] = output.segmentation.dims();

    let labels_tiled = labels
        .reshape([batch_size, 1])
        .repeat_dim(1, num_points)
        .reshape([batch_size * num_points]);
    let classify = CrossEntropyLossConfig::new().init(&device).forward(
        output
            .classification
            .clone()
            .reshape([batch_size * num_points, num_classes]),
        labels_tiled,
    );

    let seg = CrossEntropyLossConfig::new().init(&device).forward(
        output
            .segmentation
            .clone()
            .reshape([batch_size * num_points, num_seg_classes]),
        masks.reshape([batch_size * num_points]),
    );

    let total =
        classify.clone().mul_scalar(1.0 - seg_weight) + seg.clone().mul_scalar(seg_weight);

    BatchLosses {
        total,
        classify,
        seg,
    }
}

/// Aggregate per-point classification logits into one prediction per sample.
///
/// Softmax over classes, sum over points, then argmax. Summing before the
/// argmax (instead of a per-point majority vote) changes which borderline
/// samples land on the right side and must not be replaced.
pub fn classification_predictions<B: Backend>(logits: Tensor<B, 3>) -> Result<Vec<i64>> {
    let [batch_size, _, _] = logits.dims();
    let probs = softmax(logits, 2);
    let summed = probs.sum_dim(1);
    summed
        .argmax(2)
        .reshape([batch_size])
        .into_data()
        .convert::<i64>()
        .to_vec()
        .map_err(|e| {
            TrainError::Computation(format!("failed to read classification predictions: {e:?}"))
        })
}

/// Per-point argmax over the 2-way segmentation logits, row-major.
pub fn segmentation_predictions<B: Backend>(logits: Tensor<B, 3>) -> Result<Vec<i64>> {
    let [batch_size, num_points, _] = logits.dims();
    logits
        .argmax(2)
        .reshape([batch_size * num_points])
        .into_data()
        .convert::<i64>()
        .to_vec()
        .map_err(|e| {
            TrainError::Computation(format!("failed to read segmentation predictions: {e:?}"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DefaultBackend;
    use burn::tensor::Distribution;

    fn random_output(
        batch_size: usize,
        num_points: usize,
        num_classes: usize,
        device: &<DefaultBackend as Backend>::Device,
    ) -> SegNetOutput<DefaultBackend> {
        SegNetOutput {
            classification: Tensor::random(
                [batch_size, num_points, num_classes],
                Distribution::Normal(0.0, 1.0),
                device,
            ),
            segmentation: Tensor::random(
                [batch_size, num_points, 2],
                Distribution::Normal(0.0, 1.0),
                device,
            ),
        }
    }

    #[test]
    fn test_weight_boundaries() {
        let device = Default::default();
        let output = random_output(2, 8, 4, &device);
        let labels = Tensor::<DefaultBackend, 1, Int>::from_ints([1, 3], &device);
        let masks = Tensor::<DefaultBackend, 2, Int>::zeros([2, 8], &device);

        let at_zero = composite_loss(&output, labels.clone(), masks.clone(), 0.0);
        let (total, classify, _) = at_zero.values();
        assert!((total - classify).abs() < 1e-6);

        let at_one = composite_loss(&output, labels, masks, 1.0);
        let (total, _, seg) = at_one.values();
        assert!((total - seg).abs() < 1e-6);
    }

    #[test]
    fn test_total_is_convex_combination() {
        let device = Default::default();
        let output = random_output(2, 8, 4, &device);
        let labels = Tensor::<DefaultBackend, 1, Int>::from_ints([0, 2], &device);
        let masks = Tensor::<DefaultBackend, 2, Int>::ones([2, 8], &device);

        let losses = composite_loss(&output, labels, masks, 0.25);
        let (total, classify, seg) = losses.values();
        assert!((total - (0.75 * classify + 0.25 * seg)).abs() < 1e-6);
    }

    #[test]
    fn test_classification_prediction_sums_over_points() {
        let device = Default::default();
        // Two points vote for different classes; the summed probabilities
        // must decide, not either point alone.
        let logits = Tensor::<DefaultBackend, 3>::from_floats(
            TensorData::new(
                vec![
                    5.0f32, 0.0, 0.0, // point 0 strongly class 0
                    0.0, 1.0, 0.0, // point 1 weakly class 1
                ],
                [1, 2, 3],
            ),
            &device,
        );

        let pred = classification_predictions(logits).unwrap();
        assert_eq!(pred, vec![0]);
    }

    #[test]
    fn test_segmentation_predictions_are_per_point() {
        let device = Default::default();
        let logits = Tensor::<DefaultBackend, 3>::from_floats(
            TensorData::new(
                vec![
                    2.0f32, -1.0, // background
                    -1.0, 2.0, // foreground
                    0.5, 0.0, // background
                ],
                [1, 3, 2],
            ),
            &device,
        );

        let pred = segmentation_predictions(logits).unwrap();
        assert_eq!(pred, vec![0, 1, 0]);
    }
}
