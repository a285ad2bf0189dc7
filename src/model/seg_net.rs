//! Point-Cloud Segmentation Network
//!
//! A per-point network with a pooled global feature, built with the Burn
//! framework. Every point is embedded independently, the embeddings are
//! mean-pooled into one global descriptor, and the descriptor is
//! concatenated back onto each point before the two output heads:
//! per-point classification logits and per-point foreground/background
//! segmentation logits.

use burn::{
    config::Config,
    module::Module,
    nn::{Dropout, DropoutConfig, Linear, LinearConfig, Relu},
    tensor::{backend::Backend, Tensor},
};

use crate::NUM_SEG_CLASSES;

/// Configuration for the segmentation network
#[derive(Config, Debug)]
pub struct SegNetConfig {
    /// Number of object classes
    #[config(default = "15")]
    pub num_classes: usize,

    /// Width of the per-point embedding
    #[config(default = "128")]
    pub point_features: usize,

    /// Width of the pooled global descriptor
    #[config(default = "256")]
    pub global_features: usize,

    /// Dropout rate before the output heads
    #[config(default = "0.2")]
    pub dropout_rate: f64,
}

/// Both logit tensors produced by one forward pass.
#[derive(Debug, Clone)]
pub struct SegNetOutput<B: Backend> {
    /// Per-point classification logits, shape [batch, points, num_classes]
    pub classification: Tensor<B, 3>,
    /// Per-point segmentation logits, shape [batch, points, 2]
    pub segmentation: Tensor<B, 3>,
}

/// Joint classification + segmentation network over raw point coordinates.
#[derive(Module, Debug)]
pub struct SegNet<B: Backend> {
    embed1: Linear<B>,
    embed2: Linear<B>,
    global: Linear<B>,
    fuse: Linear<B>,
    dropout: Dropout,
    cls_head: Linear<B>,
    seg_head: Linear<B>,

    num_classes: usize,
}

impl SegNetConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> SegNet<B> {
        let embed1 = LinearConfig::new(3, 64).init(device);
        let embed2 = LinearConfig::new(64, self.point_features).init(device);
        let global = LinearConfig::new(self.point_features, self.global_features).init(device);
        let fuse = LinearConfig::new(
            self.point_features + self.global_features,
            self.point_features,
        )
        .init(device);
        let dropout = DropoutConfig::new(self.dropout_rate).init();
        let cls_head = LinearConfig::new(self.point_features, self.num_classes).init(device);
        let seg_head = LinearConfig::new(self.point_features, NUM_SEG_CLASSES).init(device);

        SegNet {
            embed1,
            embed2,
            global,
            fuse,
            dropout,
            cls_head,
            seg_head,
            num_classes: self.num_classes,
        }
    }
}

impl<B: Backend> SegNet<B> {
    /// Forward pass.
    ///
    /// # Arguments
    /// * `points` - Augmented coordinates of shape [batch, points, 3]
    pub fn forward(&self, points: Tensor<B, 3>) -> SegNetOutput<B> {
        let relu = Relu::new();
        let [_, num_points, _] = points.dims();

        // Per-point embedding: [B, P, 3] -> [B, P, F]
        let x = relu.forward(self.embed1.forward(points));
        let point_features = relu.forward(self.embed2.forward(x));

        // Global descriptor: mean-pool over points, then broadcast back.
        let pooled = point_features.clone().mean_dim(1);
        let global_features = relu.forward(self.global.forward(pooled));
        let global_tiled = global_features.repeat_dim(1, num_points);

        // [B, P, F + G] -> [B, P, F]
        let fused = Tensor::cat(vec![point_features, global_tiled], 2);
        let fused = relu.forward(self.fuse.forward(fused));
        let fused = self.dropout.forward(fused);

        SegNetOutput {
            classification: self.cls_head.forward(fused.clone()),
            segmentation: self.seg_head.forward(fused),
        }
    }

    /// Sum of squared weights of every linear layer, for the optimizer-side
    /// regularization term.
    pub fn regularization(&self) -> Tensor<B, 1> {
        let mut sum = self.embed1.weight.val().powf_scalar(2.0).sum();
        for layer in [
            &self.embed2,
            &self.global,
            &self.fuse,
            &self.cls_head,
            &self.seg_head,
        ] {
            sum = sum + layer.weight.val().powf_scalar(2.0).sum();
        }
        sum
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DefaultBackend;

    #[test]
    fn test_output_shapes() {
        let device = Default::default();
        let config = SegNetConfig::new();
        let model = config.init::<DefaultBackend>(&device);

        let points = Tensor::<DefaultBackend, 3>::zeros([2, 32, 3], &device);
        let output = model.forward(points);

        assert_eq!(output.classification.dims(), [2, 32, 15]);
        assert_eq!(output.segmentation.dims(), [2, 32, 2]);
    }

    #[test]
    fn test_custom_class_count() {
        let device = Default::default();
        let config = SegNetConfig::new().with_num_classes(2);
        let model = config.init::<DefaultBackend>(&device);

        let points = Tensor::<DefaultBackend, 3>::zeros([1, 16, 3], &device);
        let output = model.forward(points);

        assert_eq!(output.classification.dims(), [1, 16, 2]);
        assert_eq!(model.num_classes(), 2);
    }

    #[test]
    fn test_regularization_is_positive() {
        let device = Default::default();
        let model = SegNetConfig::new().init::<DefaultBackend>(&device);

        let penalty = model.regularization().into_scalar();
        assert!(penalty > 0.0);
    }
}
