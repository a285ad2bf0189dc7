//! Metrics Module
//!
//! Per-epoch accumulators for the training and evaluation passes. An
//! accumulator is a plain value owned by the epoch that builds it; it is
//! constructed fresh at epoch entry and dropped at epoch exit, so no metric
//! state can leak across epochs.

/// Scalar aggregates accumulated over the mini-batches of one epoch.
#[derive(Debug, Clone, Default)]
pub struct EpochStats {
    batches: usize,
    samples: usize,
    points: usize,
    loss_sum: f64,
    classify_loss_sum: f64,
    seg_loss_sum: f64,
    sample_weighted_loss_sum: f64,
    correct: usize,
    seg_correct: usize,
}

impl EpochStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one mini-batch into the epoch aggregates.
    ///
    /// `cls_pred`/`labels` are per-sample, `seg_pred`/`masks` per-point
    /// (row-major `batch * points`); the slices must be co-indexed.
    pub fn add_batch(
        &mut self,
        total_loss: f64,
        classify_loss: f64,
        seg_loss: f64,
        cls_pred: &[i64],
        labels: &[i64],
        seg_pred: &[i64],
        masks: &[i64],
    ) {
        debug_assert_eq!(cls_pred.len(), labels.len());
        debug_assert_eq!(seg_pred.len(), masks.len());

        self.batches += 1;
        self.samples += labels.len();
        self.points += masks.len();
        self.loss_sum += total_loss;
        self.classify_loss_sum += classify_loss;
        self.seg_loss_sum += seg_loss;
        self.sample_weighted_loss_sum += total_loss * labels.len() as f64;

        self.correct += cls_pred
            .iter()
            .zip(labels.iter())
            .filter(|(p, l)| p == l)
            .count();
        self.seg_correct += seg_pred
            .iter()
            .zip(masks.iter())
            .filter(|(p, m)| p == m)
            .count();
    }

    /// Mean total loss over batches.
    pub fn mean_loss(&self) -> f64 {
        if self.batches > 0 {
            self.loss_sum / self.batches as f64
        } else {
            0.0
        }
    }

    /// Mean classification loss over batches.
    pub fn mean_classify_loss(&self) -> f64 {
        if self.batches > 0 {
            self.classify_loss_sum / self.batches as f64
        } else {
            0.0
        }
    }

    /// Mean segmentation loss over batches.
    pub fn mean_seg_loss(&self) -> f64 {
        if self.batches > 0 {
            self.seg_loss_sum / self.batches as f64
        } else {
            0.0
        }
    }

    /// Sample-weighted mean total loss, used for the evaluation pass.
    pub fn sample_mean_loss(&self) -> f64 {
        if self.samples > 0 {
            self.sample_weighted_loss_sum / self.samples as f64
        } else {
            0.0
        }
    }

    /// Sample-level classification accuracy in `[0, 1]`.
    pub fn accuracy(&self) -> f64 {
        if self.samples > 0 {
            self.correct as f64 / self.samples as f64
        } else {
            0.0
        }
    }

    /// Point-level segmentation accuracy in `[0, 1]`.
    pub fn seg_accuracy(&self) -> f64 {
        if self.points > 0 {
            self.seg_correct as f64 / self.points as f64
        } else {
            0.0
        }
    }

    pub fn batches(&self) -> usize {
        self.batches
    }

    pub fn samples(&self) -> usize {
        self.samples
    }
}

/// Per-class accuracy bookkeeping for the evaluation pass.
#[derive(Debug, Clone)]
pub struct ClassStats {
    seen: Vec<usize>,
    correct: Vec<usize>,
}

impl ClassStats {
    pub fn new(num_classes: usize) -> Self {
        Self {
            seen: vec![0; num_classes],
            correct: vec![0; num_classes],
        }
    }

    /// Record one held-out sample of class `label`.
    pub fn add(&mut self, label: i64, predicted: i64) {
        let idx = label as usize;
        if idx < self.seen.len() {
            self.seen[idx] += 1;
            if predicted == label {
                self.correct[idx] += 1;
            }
        }
    }

    /// Accuracy for one class, `None` if the class has no held-out samples.
    pub fn class_accuracy(&self, class_idx: usize) -> Option<f64> {
        match self.seen.get(class_idx) {
            Some(&seen) if seen > 0 => Some(self.correct[class_idx] as f64 / seen as f64),
            _ => None,
        }
    }

    /// Mean accuracy over the classes with at least one held-out sample.
    pub fn avg_class_accuracy(&self) -> f64 {
        let mut sum = 0.0;
        let mut classes = 0usize;
        for idx in 0..self.seen.len() {
            if let Some(acc) = self.class_accuracy(idx) {
                sum += acc;
                classes += 1;
            }
        }
        if classes > 0 {
            sum / classes as f64
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_stats_accuracy_bounds() {
        let mut stats = EpochStats::new();
        stats.add_batch(
            1.5,
            1.0,
            2.0,
            &[0, 1, 1, 0],
            &[0, 1, 0, 1],
            &[1, 0, 1, 0, 1, 0, 1, 0],
            &[1, 1, 1, 0, 0, 0, 1, 0],
        );

        assert!(stats.accuracy() >= 0.0 && stats.accuracy() <= 1.0);
        assert!(stats.seg_accuracy() >= 0.0 && stats.seg_accuracy() <= 1.0);
        assert_eq!(stats.accuracy(), 0.5);
        assert_eq!(stats.seg_accuracy(), 5.0 / 8.0);
        assert_eq!(stats.batches(), 1);
        assert_eq!(stats.samples(), 4);
    }

    #[test]
    fn test_epoch_stats_loss_means() {
        let mut stats = EpochStats::new();
        stats.add_batch(1.0, 0.5, 1.5, &[0, 0], &[0, 0], &[1, 1], &[1, 1]);
        stats.add_batch(3.0, 2.5, 3.5, &[1, 1], &[1, 1], &[0, 0], &[0, 0]);

        assert_eq!(stats.mean_loss(), 2.0);
        assert_eq!(stats.mean_classify_loss(), 1.5);
        assert_eq!(stats.mean_seg_loss(), 2.5);
        // Equal batch sizes make the sample-weighted mean agree.
        assert_eq!(stats.sample_mean_loss(), 2.0);
    }

    #[test]
    fn test_epoch_stats_empty_is_zero() {
        let stats = EpochStats::new();
        assert_eq!(stats.mean_loss(), 0.0);
        assert_eq!(stats.accuracy(), 0.0);
        assert_eq!(stats.seg_accuracy(), 0.0);
    }

    #[test]
    fn test_class_stats_all_correct_is_one() {
        let mut stats = ClassStats::new(3);
        stats.add(1, 1);
        stats.add(1, 1);
        stats.add(2, 0);

        assert_eq!(stats.class_accuracy(1), Some(1.0));
        assert_eq!(stats.class_accuracy(2), Some(0.0));
        assert_eq!(stats.class_accuracy(0), None);
        // Mean over the two seen classes only.
        assert_eq!(stats.avg_class_accuracy(), 0.5);
    }

    #[test]
    fn test_class_stats_empty() {
        let stats = ClassStats::new(4);
        assert_eq!(stats.avg_class_accuracy(), 0.0);
    }
}
