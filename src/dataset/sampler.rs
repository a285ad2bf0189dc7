//! Per-epoch resampling and mini-batch slicing.

use ndarray::{s, Array1, Array2, Array3, Axis};
use rand::seq::SliceRandom;
use rand::Rng;

use super::loader::Partition;
use crate::utils::error::{Result, TrainError};

/// The reshuffled working set for one epoch.
#[derive(Debug, Clone)]
pub struct EpochDraw {
    points: Array3<f32>,
    labels: Array1<i64>,
    masks: Array2<i64>,
}

/// One mini-batch cut from an [`EpochDraw`].
#[derive(Debug, Clone)]
pub struct MiniBatch {
    pub points: Array3<f32>,
    pub labels: Array1<i64>,
    pub masks: Array2<i64>,
}

/// Draw one epoch's working set from a partition.
///
/// A fresh subset of `sample_count` point indices is drawn for the epoch and
/// applied to every sample, then the sample order is reshuffled with points,
/// label, and mask staying co-indexed.
pub fn draw_epoch<R: Rng>(
    partition: &Partition,
    sample_count: usize,
    rng: &mut R,
) -> Result<EpochDraw> {
    if partition.is_empty() {
        return Err(TrainError::Configuration(
            "cannot draw an epoch from an empty partition".to_string(),
        ));
    }
    if sample_count == 0 {
        return Err(TrainError::Configuration(
            "per-sample point count must be positive".to_string(),
        ));
    }
    let stored = partition.num_points();
    if sample_count > stored {
        return Err(TrainError::Configuration(format!(
            "requested {sample_count} points per sample but the partition stores {stored}"
        )));
    }

    let mut point_indices: Vec<usize> = (0..stored).collect();
    point_indices.shuffle(rng);
    point_indices.truncate(sample_count);

    let mut order: Vec<usize> = (0..partition.len()).collect();
    order.shuffle(rng);

    Ok(EpochDraw {
        points: partition
            .points()
            .select(Axis(1), &point_indices)
            .select(Axis(0), &order),
        labels: partition.labels().select(Axis(0), &order),
        masks: partition
            .masks()
            .select(Axis(1), &point_indices)
            .select(Axis(0), &order),
    })
}

impl EpochDraw {
    pub fn len(&self) -> usize {
        self.points.dim().0
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Full mini-batches available at the given batch size.
    pub fn num_batches(&self, batch_size: usize) -> usize {
        if batch_size == 0 {
            0
        } else {
            self.len() / batch_size
        }
    }

    /// Cut the draw into full mini-batches, dropping the remainder.
    pub fn batches(&self, batch_size: usize) -> Result<impl Iterator<Item = MiniBatch> + '_> {
        if batch_size == 0 {
            return Err(TrainError::Configuration(
                "batch size must be positive".to_string(),
            ));
        }
        let num_batches = self.len() / batch_size;
        Ok((0..num_batches).map(move |batch_idx| {
            let lo = batch_idx * batch_size;
            let hi = lo + batch_size;
            MiniBatch {
                points: self.points.slice(s![lo..hi, .., ..]).to_owned(),
                labels: self.labels.slice(s![lo..hi]).to_owned(),
                masks: self.masks.slice(s![lo..hi, ..]).to_owned(),
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn tagged_partition(samples: usize, points: usize) -> Partition {
        // Every coordinate of sample i equals i, so co-indexing with the
        // label is checkable after any shuffle.
        let mut data = Array3::<f32>::zeros((samples, points, 3));
        let mut labels = Array1::<i64>::zeros(samples);
        let mut masks = Array2::<i64>::zeros((samples, points));
        for i in 0..samples {
            data.slice_mut(s![i, .., ..]).fill(i as f32);
            labels[i] = i as i64;
            masks.slice_mut(s![i, ..]).fill((i % 2) as i64);
        }
        Partition::from_arrays(data, labels, masks).unwrap()
    }

    #[test]
    fn test_draw_keeps_samples_co_indexed() {
        let partition = tagged_partition(16, 8);
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let draw = draw_epoch(&partition, 4, &mut rng).unwrap();
        assert_eq!(draw.len(), 16);

        for (i, label) in draw.labels.iter().enumerate() {
            for &coord in draw.points.slice(s![i, .., ..]).iter() {
                assert_eq!(coord as i64, *label);
            }
            for &m in draw.masks.slice(s![i, ..]).iter() {
                assert_eq!(m, label % 2);
            }
        }
    }

    #[test]
    fn test_draw_subsets_points() {
        let partition = tagged_partition(4, 10);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let draw = draw_epoch(&partition, 6, &mut rng).unwrap();
        assert_eq!(draw.points.dim(), (4, 6, 3));
        assert_eq!(draw.masks.dim(), (4, 6));
    }

    #[test]
    fn test_draw_reshuffles_between_epochs() {
        let partition = tagged_partition(64, 4);
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let first = draw_epoch(&partition, 4, &mut rng).unwrap();
        let second = draw_epoch(&partition, 4, &mut rng).unwrap();
        assert_ne!(first.labels, second.labels);
    }

    #[test]
    fn test_batches_drop_remainder() {
        let partition = tagged_partition(14, 4);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let draw = draw_epoch(&partition, 4, &mut rng).unwrap();

        let batches: Vec<_> = draw.batches(4).unwrap().collect();
        assert_eq!(batches.len(), 3);
        for batch in &batches {
            assert_eq!(batch.points.dim(), (4, 4, 3));
            assert_eq!(batch.labels.len(), 4);
            assert_eq!(batch.masks.dim(), (4, 4));
        }
    }

    #[test]
    fn test_oversized_point_request_is_rejected() {
        let partition = tagged_partition(4, 8);
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let result = draw_epoch(&partition, 9, &mut rng);
        assert!(matches!(result, Err(TrainError::Configuration(_))));
    }

    #[test]
    fn test_empty_partition_is_rejected() {
        let partition = Partition::from_arrays(
            Array3::<f32>::zeros((0, 8, 3)),
            Array1::<i64>::zeros(0),
            Array2::<i64>::zeros((0, 8)),
        )
        .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let result = draw_epoch(&partition, 4, &mut rng);
        assert!(matches!(result, Err(TrainError::Configuration(_))));
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        let partition = tagged_partition(8, 4);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let draw = draw_epoch(&partition, 4, &mut rng).unwrap();

        assert!(draw.batches(0).is_err());
    }
}
