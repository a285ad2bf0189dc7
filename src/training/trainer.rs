//! Training Pipeline
//!
//! The per-epoch loop over both partitions using the Burn framework:
//! - Forward/backward passes with automatic differentiation
//! - Composite classification + segmentation loss with a regularization
//!   term added for the optimizer step only
//! - Adam or Nesterov-momentum optimizer under exponential LR decay
//! - Per-epoch metric aggregation and logging
//! - Unconditional per-epoch checkpoint overwrite

use std::path::{Path, PathBuf};

use burn::{
    module::{AutodiffModule, Module},
    optim::{
        adaptor::OptimizerAdaptor, momentum::MomentumConfig, Adam, AdamConfig, GradientsParams,
        Optimizer, Sgd, SgdConfig,
    },
    record::{CompactRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::augment;
use crate::dataset::{sampler, Partition, PointBatcher};
use crate::model::{ExperimentSetting, OptimizerKind, SegNet};
use crate::training::{loss, DecaySchedule, ScalarWriter};
use crate::utils::error::{Result, TrainError};
use crate::utils::metrics::{ClassStats, EpochStats};

/// Checkpoint file stems inside the log directory, overwritten every epoch.
/// The recorder appends its own `.mpk` extension.
pub const MODEL_CHECKPOINT: &str = "model";
pub const OPTIMIZER_CHECKPOINT: &str = "optimizer";
/// Run counters saved alongside the recorder files.
pub const TRAINER_STATE: &str = "trainer.json";

/// Counters a resumed run needs to pick up the decay schedule where the
/// saved run left it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct TrainerState {
    global_step: usize,
}

/// Batch counts of one completed epoch.
#[derive(Debug, Clone, Copy)]
pub struct EpochReport {
    pub epoch: usize,
    pub train_batches: usize,
    pub eval_batches: usize,
}

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub epochs: Vec<EpochReport>,
}

/// The optimizer chosen by the experiment setting, fixed for the run.
enum Optim<B: AutodiffBackend> {
    Adam(OptimizerAdaptor<Adam<B::InnerBackend>, SegNet<B>, B>),
    Momentum(OptimizerAdaptor<Sgd<B::InnerBackend>, SegNet<B>, B>),
}

impl<B: AutodiffBackend> Optim<B> {
    fn from_kind(kind: OptimizerKind) -> Self {
        match kind {
            OptimizerKind::Adam { epsilon } => {
                Optim::Adam(AdamConfig::new().with_epsilon(epsilon as f32).init())
            }
            OptimizerKind::Momentum { momentum } => Optim::Momentum(
                SgdConfig::new()
                    .with_momentum(Some(
                        MomentumConfig::new()
                            .with_momentum(momentum)
                            .with_nesterov(true),
                    ))
                    .init(),
            ),
        }
    }

    fn step(&mut self, lr: f64, model: SegNet<B>, grads: GradientsParams) -> SegNet<B> {
        match self {
            Optim::Adam(optim) => optim.step(lr, model, grads),
            Optim::Momentum(optim) => optim.step(lr, model, grads),
        }
    }

    fn save(&self, recorder: &CompactRecorder, path: PathBuf) -> Result<()> {
        let result = match self {
            Optim::Adam(optim) => recorder.record(optim.to_record(), path),
            Optim::Momentum(optim) => recorder.record(optim.to_record(), path),
        };
        result.map_err(|e| {
            TrainError::Computation(format!("failed to save optimizer checkpoint: {e:?}"))
        })
    }

    fn load(self, recorder: &CompactRecorder, path: PathBuf, device: &B::Device) -> Result<Self> {
        let result = match self {
            Optim::Adam(optim) => recorder
                .load(path, device)
                .map(|record| Optim::Adam(optim.load_record(record))),
            Optim::Momentum(optim) => recorder
                .load(path, device)
                .map(|record| Optim::Momentum(optim.load_record(record))),
        };
        result.map_err(|e| {
            TrainError::Computation(format!("failed to load optimizer checkpoint: {e:?}"))
        })
    }
}

/// Drives training and evaluation epochs over two partitions.
pub struct Trainer<B: AutodiffBackend> {
    model: SegNet<B>,
    optim: Optim<B>,
    setting: ExperimentSetting,
    schedule: DecaySchedule,
    seg_weight: f64,
    global_step: usize,
    device: B::Device,
    rng: ChaCha8Rng,
    log_dir: PathBuf,
    summary: ScalarWriter,
}

impl<B: AutodiffBackend> Trainer<B> {
    pub fn new(
        model: SegNet<B>,
        setting: ExperimentSetting,
        seg_weight: f64,
        log_dir: impl Into<PathBuf>,
        seed: u64,
        device: B::Device,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&seg_weight) {
            return Err(TrainError::Configuration(format!(
                "segmentation weight {seg_weight} is outside [0, 1]"
            )));
        }
        let log_dir = log_dir.into();
        std::fs::create_dir_all(&log_dir)?;

        let schedule = DecaySchedule::from_setting(&setting)?;
        let optim = Optim::from_kind(setting.optimizer);
        let summary = ScalarWriter::create(&log_dir)?;
        info!("Parameter number: {}", model.num_params());

        Ok(Self {
            model,
            optim,
            setting,
            schedule,
            seg_weight,
            global_step: 0,
            device,
            rng: ChaCha8Rng::seed_from_u64(seed),
            log_dir,
            summary,
        })
    }

    /// Run the full epoch loop: train, evaluate, checkpoint, repeated
    /// `num_epochs` times. Any error aborts the run.
    pub fn fit(&mut self, train: &Partition, test: &Partition) -> Result<RunReport> {
        let mut epochs = Vec::with_capacity(self.setting.num_epochs);

        for epoch in 0..self.setting.num_epochs {
            info!("**** EPOCH {epoch:03} ****");

            let train_batches = self.train_one_epoch(train)?;
            let eval_batches = self.eval_one_epoch(test)?;
            self.save_checkpoint()?;

            epochs.push(EpochReport {
                epoch,
                train_batches,
                eval_batches,
            });
        }

        Ok(RunReport { epochs })
    }

    /// One augmented pass over the training partition with parameter
    /// updates. Returns the number of mini-batches processed.
    fn train_one_epoch(&mut self, partition: &Partition) -> Result<usize> {
        let batch_size = self.setting.batch_size;
        let draw = sampler::draw_epoch(partition, self.setting.sample_num, &mut self.rng)?;
        let batcher = PointBatcher::<B>::new(self.device.clone());
        let mut stats = EpochStats::new();

        for mini in draw.batches(batch_size)? {
            let transforms = augment::sample_transforms(
                batch_size,
                self.setting.rotation_range,
                self.setting.scaling_range,
                self.setting.rotation_order,
                self.setting.jitter,
                &mut self.rng,
            );

            let batch = batcher.batch(&mini);
            let augmented = transforms.apply(batch.points.clone());
            let output = self.model.forward(augmented);

            let losses = loss::composite_loss(
                &output,
                batch.labels.clone(),
                batch.masks.clone(),
                self.seg_weight,
            );
            let penalty = self
                .model
                .regularization()
                .mul_scalar(self.setting.weight_decay);
            let optimizer_loss = losses.total.clone() + penalty;

            let lr = self.schedule.lr_at(self.global_step);
            let grads = optimizer_loss.backward();
            let grads = GradientsParams::from_grads(grads, &self.model);
            self.model = self.optim.step(lr, self.model.clone(), grads);
            self.global_step += 1;

            let cls_pred = loss::classification_predictions(output.classification)?;
            let seg_pred = loss::segmentation_predictions(output.segmentation)?;
            let (total, classify, seg) = losses.values();
            stats.add_batch(
                total,
                classify,
                seg,
                &cls_pred,
                &batch.label_values,
                &seg_pred,
                &batch.mask_values,
            );

            self.summary.scalar("train/loss", self.global_step, total)?;
            self.summary
                .scalar("train/learning_rate", self.global_step, lr)?;

            debug!(
                "step {}: loss = {:.6}, lr = {:.6}",
                self.global_step, total, lr
            );
        }

        info!("mean loss: {:.6}", stats.mean_loss());
        info!("classify mean loss: {:.6}", stats.mean_classify_loss());
        info!("seg mean loss: {:.6}", stats.mean_seg_loss());
        info!("accuracy: {:.6}", stats.accuracy());
        info!("seg accuracy: {:.6}", stats.seg_accuracy());

        let step = self.global_step;
        self.summary
            .scalar("train/mean_loss", step, stats.mean_loss())?;
        self.summary
            .scalar("train/classify_mean_loss", step, stats.mean_classify_loss())?;
        self.summary
            .scalar("train/seg_mean_loss", step, stats.mean_seg_loss())?;
        self.summary
            .scalar("train/accuracy", step, stats.accuracy())?;
        self.summary
            .scalar("train/seg_accuracy", step, stats.seg_accuracy())?;

        Ok(stats.batches())
    }

    /// One forward-only pass over the evaluation partition with the
    /// evaluation augmentation ranges. Returns the mini-batch count.
    fn eval_one_epoch(&mut self, partition: &Partition) -> Result<usize> {
        let batch_size = self.setting.batch_size;
        let draw = sampler::draw_epoch(partition, self.setting.sample_num, &mut self.rng)?;
        let batcher = PointBatcher::<B::InnerBackend>::new(self.device.clone());
        let model_valid = self.model.valid();
        let mut stats = EpochStats::new();
        let mut class_stats = ClassStats::new(model_valid.num_classes());

        for mini in draw.batches(batch_size)? {
            let transforms = augment::sample_transforms(
                batch_size,
                self.setting.rotation_range_val,
                self.setting.scaling_range_val,
                self.setting.rotation_order,
                self.setting.jitter_val,
                &mut self.rng,
            );

            let batch = batcher.batch(&mini);
            let augmented = transforms.apply(batch.points.clone());
            let output = model_valid.forward(augmented);

            let losses = loss::composite_loss(
                &output,
                batch.labels.clone(),
                batch.masks.clone(),
                self.seg_weight,
            );

            let cls_pred = loss::classification_predictions(output.classification)?;
            let seg_pred = loss::segmentation_predictions(output.segmentation)?;
            let (total, classify, seg) = losses.values();
            for (&label, &predicted) in batch.label_values.iter().zip(cls_pred.iter()) {
                class_stats.add(label, predicted);
            }
            stats.add_batch(
                total,
                classify,
                seg,
                &cls_pred,
                &batch.label_values,
                &seg_pred,
                &batch.mask_values,
            );
        }

        info!("eval mean loss: {:.6}", stats.sample_mean_loss());
        info!("eval accuracy: {:.6}", stats.accuracy());
        info!("eval avg class acc: {:.6}", class_stats.avg_class_accuracy());
        info!("eval seg accuracy: {:.6}", stats.seg_accuracy());

        let step = self.global_step;
        self.summary
            .scalar("eval/mean_loss", step, stats.sample_mean_loss())?;
        self.summary
            .scalar("eval/accuracy", step, stats.accuracy())?;
        self.summary
            .scalar("eval/avg_class_acc", step, class_stats.avg_class_accuracy())?;
        self.summary
            .scalar("eval/seg_accuracy", step, stats.seg_accuracy())?;

        Ok(stats.batches())
    }

    /// Persist model and optimizer state, overwriting the previous epoch's
    /// files. A failed write aborts the run.
    fn save_checkpoint(&self) -> Result<()> {
        let recorder = CompactRecorder::new();

        let model_path = self.log_dir.join(MODEL_CHECKPOINT);
        self.model
            .clone()
            .save_file(&model_path, &recorder)
            .map_err(|e| {
                TrainError::Computation(format!("failed to save model checkpoint: {e:?}"))
            })?;
        self.optim
            .save(&recorder, self.log_dir.join(OPTIMIZER_CHECKPOINT))?;

        let state = TrainerState {
            global_step: self.global_step,
        };
        let encoded = serde_json::to_vec(&state)
            .map_err(|e| TrainError::Computation(format!("failed to encode run state: {e}")))?;
        std::fs::write(self.log_dir.join(TRAINER_STATE), encoded)?;

        info!(
            "Model saved in file: {}",
            model_path.with_extension("mpk").display()
        );
        Ok(())
    }

    /// Restore model parameters, optimizer moments, and the step counter
    /// from a checkpoint directory, so a resumed run continues the decay
    /// schedule instead of restarting it.
    pub fn load_checkpoint(&mut self, dir: &Path) -> Result<()> {
        let recorder = CompactRecorder::new();
        self.model = self
            .model
            .clone()
            .load_file(dir.join(MODEL_CHECKPOINT), &recorder, &self.device)
            .map_err(|e| {
                TrainError::Computation(format!("failed to load model checkpoint: {e:?}"))
            })?;
        self.optim = Optim::from_kind(self.setting.optimizer).load(
            &recorder,
            dir.join(OPTIMIZER_CHECKPOINT),
            &self.device,
        )?;

        let raw = std::fs::read(dir.join(TRAINER_STATE))?;
        let state: TrainerState = serde_json::from_slice(&raw)
            .map_err(|e| TrainError::Computation(format!("failed to decode run state: {e}")))?;
        self.global_step = state.global_step;

        info!(
            "Model restored from {} at step {}",
            dir.display(),
            self.global_step
        );
        Ok(())
    }

    pub fn model(&self) -> &SegNet<B> {
        &self.model
    }

    pub fn global_step(&self) -> usize {
        self.global_step
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }
}
