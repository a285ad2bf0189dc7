//! Batch Augmentation Module
//!
//! Per-batch random rigid transforms for point clouds: a per-sample
//! rotation composed with a per-sample anisotropic scaling, plus one
//! scalar jitter magnitude shared across the batch. Transforms are drawn
//! fresh for every mini-batch and never cached.
//!
//! Points are row vectors, so a transform `M` acts as `p' = p . M`. The
//! combined matrix is `rotation . diag(scale)`: rotation first, scaling
//! after. Classification quality is numerically sensitive to this
//! composition order, so it must not be swapped.

use burn::prelude::*;
use burn::tensor::Distribution;
use ndarray::{s, Array2, Array3};
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

/// How a random factor is drawn from its range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrawPolicy {
    /// Uniform within `center +/- width`.
    Uniform,
    /// Gaussian with standard deviation `width`, clamped at three sigmas.
    Gauss,
}

/// Per-axis widths for one family of random factors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AugmentRange {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub policy: DrawPolicy,
}

impl AugmentRange {
    pub fn uniform(x: f32, y: f32, z: f32) -> Self {
        Self {
            x,
            y,
            z,
            policy: DrawPolicy::Uniform,
        }
    }

    pub fn gauss(x: f32, y: f32, z: f32) -> Self {
        Self {
            x,
            y,
            z,
            policy: DrawPolicy::Gauss,
        }
    }

    /// Zero-width range: every draw returns the center value.
    pub fn none() -> Self {
        Self::uniform(0.0, 0.0, 0.0)
    }
}

/// Order in which the three axis rotations are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotationOrder {
    Xyz,
    Xzy,
    Yxz,
    Yzx,
    Zxy,
    Zyx,
}

/// The random transforms drawn for one mini-batch.
#[derive(Debug, Clone)]
pub struct BatchTransforms {
    /// Pure rotations, shape [batch_size, 3, 3]
    pub rotations: Array3<f32>,
    /// Rotation composed with scaling, shape [batch_size, 3, 3]
    pub xforms: Array3<f32>,
    /// Additive noise magnitude shared across the batch
    pub jitter: f32,
}

/// Draw per-sample rotation and rotation+scale matrices for one batch.
pub fn sample_transforms<R: Rng>(
    batch_size: usize,
    rotation_range: AugmentRange,
    scaling_range: AugmentRange,
    order: RotationOrder,
    jitter: f32,
    rng: &mut R,
) -> BatchTransforms {
    let mut rotations = Array3::<f32>::zeros((batch_size, 3, 3));
    let mut xforms = Array3::<f32>::zeros((batch_size, 3, 3));

    for i in 0..batch_size {
        let rx = draw(0.0, rotation_range.x, rotation_range.policy, rng);
        let ry = draw(0.0, rotation_range.y, rotation_range.policy, rng);
        let rz = draw(0.0, rotation_range.z, rotation_range.policy, rng);
        let rotation = euler_to_matrix(rx, ry, rz, order);

        let sx = draw(1.0, scaling_range.x, scaling_range.policy, rng);
        let sy = draw(1.0, scaling_range.y, scaling_range.policy, rng);
        let sz = draw(1.0, scaling_range.z, scaling_range.policy, rng);
        let scaling = Array2::from_diag(&ndarray::arr1(&[sx, sy, sz]));

        let xform = rotation.dot(&scaling);
        rotations.slice_mut(s![i, .., ..]).assign(&rotation);
        xforms.slice_mut(s![i, .., ..]).assign(&xform);
    }

    BatchTransforms {
        rotations,
        xforms,
        jitter,
    }
}

impl BatchTransforms {
    /// Apply the per-sample transforms and the jitter noise to a batch of
    /// point coordinates with shape [batch_size, points, 3].
    ///
    /// Noise is regenerated on every call.
    pub fn apply<B: Backend>(&self, points: Tensor<B, 3>) -> Tensor<B, 3> {
        let device = points.device();
        let [batch_size, num_points, _] = points.dims();

        let xform_data: Vec<f32> = self.xforms.iter().copied().collect();
        let xforms = Tensor::<B, 3>::from_floats(
            TensorData::new(xform_data, [batch_size, 3, 3]),
            &device,
        );

        let transformed = points.matmul(xforms);
        if self.jitter > 0.0 {
            let noise = Tensor::<B, 3>::random(
                [batch_size, num_points, 3],
                Distribution::Normal(0.0, 1.0),
                &device,
            );
            transformed + noise.mul_scalar(self.jitter)
        } else {
            transformed
        }
    }
}

fn draw<R: Rng>(center: f32, width: f32, policy: DrawPolicy, rng: &mut R) -> f32 {
    if width <= 0.0 {
        return center;
    }
    match policy {
        DrawPolicy::Uniform => center + width * rng.gen_range(-1.0f32..=1.0),
        DrawPolicy::Gauss => {
            let z: f32 = rng.sample(StandardNormal);
            (center + width * z).clamp(center - 3.0 * width, center + 3.0 * width)
        }
    }
}

/// Rotation matrix for row-vector points, axis rotations composed in the
/// given order (first listed axis is applied first).
fn euler_to_matrix(rx: f32, ry: f32, rz: f32, order: RotationOrder) -> Array2<f32> {
    let x = rotation_x(rx);
    let y = rotation_y(ry);
    let z = rotation_z(rz);
    match order {
        RotationOrder::Xyz => x.dot(&y).dot(&z),
        RotationOrder::Xzy => x.dot(&z).dot(&y),
        RotationOrder::Yxz => y.dot(&x).dot(&z),
        RotationOrder::Yzx => y.dot(&z).dot(&x),
        RotationOrder::Zxy => z.dot(&x).dot(&y),
        RotationOrder::Zyx => z.dot(&y).dot(&x),
    }
}

fn rotation_x(angle: f32) -> Array2<f32> {
    let (sin, cos) = angle.sin_cos();
    ndarray::arr2(&[[1.0, 0.0, 0.0], [0.0, cos, sin], [0.0, -sin, cos]])
}

fn rotation_y(angle: f32) -> Array2<f32> {
    let (sin, cos) = angle.sin_cos();
    ndarray::arr2(&[[cos, 0.0, -sin], [0.0, 1.0, 0.0], [sin, 0.0, cos]])
}

fn rotation_z(angle: f32) -> Array2<f32> {
    let (sin, cos) = angle.sin_cos();
    ndarray::arr2(&[[cos, sin, 0.0], [-sin, cos, 0.0], [0.0, 0.0, 1.0]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DefaultBackend;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn max_abs_diff(a: &Array2<f32>, b: &Array2<f32>) -> f32 {
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y).abs())
            .fold(0.0, f32::max)
    }

    #[test]
    fn test_zero_ranges_give_identity_matrices() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let transforms = sample_transforms(
            4,
            AugmentRange::none(),
            AugmentRange::none(),
            RotationOrder::Xyz,
            0.0,
            &mut rng,
        );

        let identity = Array2::<f32>::eye(3);
        for i in 0..4 {
            let rotation = transforms.rotations.slice(s![i, .., ..]).to_owned();
            let xform = transforms.xforms.slice(s![i, .., ..]).to_owned();
            assert!(max_abs_diff(&rotation, &identity) < 1e-6);
            assert!(max_abs_diff(&xform, &identity) < 1e-6);
        }
    }

    #[test]
    fn test_rotations_are_orthonormal() {
        let mut rng = ChaCha8Rng::seed_from_u64(23);
        let transforms = sample_transforms(
            8,
            AugmentRange::uniform(std::f32::consts::PI, 0.4, std::f32::consts::PI),
            AugmentRange::none(),
            RotationOrder::Zyx,
            0.0,
            &mut rng,
        );

        let identity = Array2::<f32>::eye(3);
        for i in 0..8 {
            let rotation: Array2<f32> = transforms.rotations.slice(s![i, .., ..]).to_owned();
            let product = rotation.t().dot(&rotation);
            assert!(max_abs_diff(&product, &identity) < 1e-5);
        }
    }

    #[test]
    fn test_gauss_draws_stay_within_three_sigmas() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for _ in 0..1000 {
            let v = draw(0.0, 0.1, DrawPolicy::Gauss, &mut rng);
            assert!(v.abs() <= 0.3 + 1e-6);
        }
    }

    #[test]
    fn test_scaling_enters_the_combined_matrix_only() {
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let transforms = sample_transforms(
            4,
            AugmentRange::none(),
            AugmentRange::gauss(0.1, 0.1, 0.1),
            RotationOrder::Xyz,
            0.0,
            &mut rng,
        );

        let identity = Array2::<f32>::eye(3);
        for i in 0..4 {
            let rotation = transforms.rotations.slice(s![i, .., ..]).to_owned();
            assert!(max_abs_diff(&rotation, &identity) < 1e-6);
        }
        // With probability ~1 at least one scale factor differs from 1.
        let xforms_identity = (0..4).all(|i| {
            max_abs_diff(&transforms.xforms.slice(s![i, .., ..]).to_owned(), &identity) < 1e-6
        });
        assert!(!xforms_identity);
    }

    #[test]
    fn test_identity_transform_leaves_points_unchanged() {
        let mut rng = ChaCha8Rng::seed_from_u64(29);
        let transforms = sample_transforms(
            2,
            AugmentRange::none(),
            AugmentRange::none(),
            RotationOrder::Xyz,
            0.0,
            &mut rng,
        );

        let device = Default::default();
        let points = Tensor::<DefaultBackend, 3>::from_floats(
            TensorData::new(
                vec![
                    1.0f32, 2.0, 3.0, -1.0, 0.5, 0.0, //
                    0.0, 0.0, 1.0, 4.0, -2.0, 0.25,
                ],
                [2, 2, 3],
            ),
            &device,
        );

        let augmented = transforms.apply(points.clone());
        let diff = (augmented - points).abs().max().into_scalar();
        assert!(diff < 1e-6);
    }
}
