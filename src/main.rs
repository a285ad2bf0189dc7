//! Training entry point for joint point-cloud classification and
//! foreground/background segmentation.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use tracing::{error, info};

use pointcnn_seg::backend::{self, TrainingBackend};
use pointcnn_seg::config::RunConfig;
use pointcnn_seg::dataset::Partition;
use pointcnn_seg::model::registry;
use pointcnn_seg::training::Trainer;
use pointcnn_seg::utils::logging::{init_logging, LogConfig};
use pointcnn_seg::NUM_CLASSES;

/// Joint classification + segmentation training on HDF5 point clouds
#[derive(Parser, Debug)]
#[command(name = "train_seg")]
#[command(version)]
#[command(about = "Train a point-cloud classification + segmentation network", long_about = None)]
struct Args {
    /// GPU device index (ignored on the CPU backend)
    #[arg(long, default_value = "0")]
    gpu: usize,

    /// Checkpoint directory to resume model, optimizer, and step state from
    #[arg(short = 'l', long)]
    load_ckpt: Option<PathBuf>,

    /// Folder for checkpoints, the text log, and the summary stream
    #[arg(short = 's', long, default_value = "log/")]
    log_dir: PathBuf,

    /// Keep background points
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    with_bg: bool,

    /// Rescale each sample into the unit sphere
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    norm: bool,

    /// Subtract each sample's coordinate mean
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    center_data: bool,

    /// Segmentation weight in the composite loss, in [0, 1]
    #[arg(long, default_value = "0.5")]
    seg_weight: f64,

    /// Location of the training HDF5 file
    #[arg(
        long,
        default_value = "h5_files/main_split/training_objectdataset_augmentedrot_scale75.h5"
    )]
    train_file: PathBuf,

    /// Location of the test HDF5 file
    #[arg(
        long,
        default_value = "h5_files/main_split/test_objectdataset_augmentedrot_scale75.h5"
    )]
    test_file: PathBuf,

    /// Model to use
    #[arg(short = 'm', long, default_value = "seg_net")]
    model: String,

    /// Experiment setting to use
    #[arg(short = 'x', long, default_value = "object_x3")]
    setting: String,

    /// Number of training epochs (default defined in the setting)
    #[arg(long)]
    epochs: Option<usize>,

    /// Batch size (default defined in the setting)
    #[arg(long)]
    batch_size: Option<usize>,

    /// Points drawn per sample each epoch
    #[arg(long, default_value = "1024")]
    num_point: usize,

    /// Random seed
    #[arg(long, default_value = "42")]
    seed: u64,
}

impl From<Args> for RunConfig {
    fn from(args: Args) -> Self {
        RunConfig {
            gpu: args.gpu,
            load_ckpt: args.load_ckpt,
            log_dir: args.log_dir,
            with_bg: args.with_bg,
            norm: args.norm,
            center_data: args.center_data,
            seg_weight: args.seg_weight,
            train_file: args.train_file,
            test_file: args.test_file,
            model: args.model,
            setting: args.setting,
            epochs: args.epochs,
            batch_size: args.batch_size,
            num_point: args.num_point,
            seed: args.seed,
        }
    }
}

fn main() -> ExitCode {
    let config = RunConfig::from(Args::parse());

    if let Err(e) = std::fs::create_dir_all(&config.log_dir) {
        eprintln!("cannot create log directory {}: {e}", config.log_dir.display());
        return ExitCode::FAILURE;
    }
    let log_config = LogConfig::default().with_log_dir(&config.log_dir);
    if let Err(e) = init_logging(&log_config) {
        eprintln!("cannot initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    println!(
        "{}",
        format!("train_seg v{}", pointcnn_seg::VERSION).bold().green()
    );

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Error detail goes to the log stream before termination.
            error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &RunConfig) -> anyhow::Result<()> {
    config.validate()?;
    info!("configuration: {:?}", config);
    info!("backend: {}", backend::backend_name());

    info!("Preparing datasets...");
    let mut train = Partition::load(&config.train_file)?.binarize_masks()?;
    let mut test = Partition::load(&config.test_file)?.binarize_masks()?;

    info!("Normalized: {}", config.norm);
    info!("Center Data: {}", config.center_data);

    if config.center_data {
        train = train.center();
        test = test.center();
    }
    if config.norm {
        train = train.normalize();
        test = test.normalize();
    }

    info!(
        "{}/{} training/validation samples",
        train.len(),
        test.len()
    );

    let mut setting = registry::resolve_setting(&config.setting)?;
    if let Some(epochs) = config.epochs {
        setting.num_epochs = epochs;
    }
    if let Some(batch_size) = config.batch_size {
        setting.batch_size = batch_size;
    }
    setting.sample_num = config.num_point;

    let device = backend::device(config.gpu);
    let model = registry::resolve_model(&config.model, NUM_CLASSES)?
        .init::<TrainingBackend>(&device);

    let mut trainer = Trainer::new(
        model,
        setting,
        config.seg_weight,
        &config.log_dir,
        config.seed,
        device,
    )?;

    if let Some(ckpt) = &config.load_ckpt {
        trainer.load_checkpoint(ckpt)?;
    }

    let report = trainer.fit(&train, &test)?;
    info!(
        "run finished after {} epochs, {} optimizer steps",
        report.epochs.len(),
        trainer.global_step()
    );

    Ok(())
}
