mod checkpoint;
mod metrics;
mod model;
mod utils;

use anyhow::{Context, Result, anyhow, ensure};
use burn::config::Config;
use burn::optim::AdamConfig;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use model::architecture::{
    DiscriminatorConfig, GeneratorConfig, InitScheme, ModelConfig, NetworkKind, NormKind,
};
use model::constants::WIDTH;
use model::training::TrainingConfig;

#[cfg(feature = "cuda")]
mod backend {
    use burn::backend::{Autodiff, Cuda, cuda::CudaDevice};

    pub type Inference = Cuda<f32, i32>;
    pub type Train = Autodiff<Inference>;

    pub fn device() -> CudaDevice {
        CudaDevice::default()
    }
}

#[cfg(not(feature = "cuda"))]
mod backend {
    use burn::backend::{Autodiff, NdArray, ndarray::NdArrayDevice};

    pub type Inference = NdArray<f32>;
    pub type Train = Autodiff<Inference>;

    pub fn device() -> NdArrayDevice {
        NdArrayDevice::Cpu
    }
}

#[derive(Parser)]
#[command(name = "motion_acgan", about = "Conditional GAN over motion images")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train the generator/discriminator pair on a motion-image dataset
    Train(TrainArgs),
    /// Generate one motion GIF per action class from a trained checkpoint
    Sample(SampleArgs),
}

#[derive(Args)]
struct TrainArgs {
    /// Dataset root with one subdirectory of motion images per action class
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    #[arg(long, default_value = "checkpoints")]
    ckpt_dir: PathBuf,

    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    /// Where per-checkpoint preview images are written
    #[arg(long, default_value = "figures")]
    figure_dir: PathBuf,

    /// Number of action classes; must match the dataset layout
    #[arg(long)]
    num_classes: usize,

    #[arg(long, value_enum, default_value_t = NetworkKind::Acgan)]
    network: NetworkKind,

    #[arg(long, value_enum, default_value_t = NormKind::Batch)]
    norm: NormKind,

    #[arg(long, value_enum, default_value_t = InitScheme::Normal)]
    init: InitScheme,

    #[arg(long, default_value_t = 300)]
    num_epochs: usize,

    #[arg(long, default_value_t = 16)]
    batch_size: usize,

    #[arg(long, default_value_t = 2)]
    num_workers: usize,

    #[arg(long, default_value_t = 2e-4)]
    learning_rate: f64,

    /// Number of frame columns decoded from each generated motion image
    #[arg(long, default_value_t = 16)]
    sequence_length: usize,

    /// Checkpoint and preview cadence, in epochs
    #[arg(long, default_value_t = 100)]
    checkpoint_every: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Continue from the checkpoints in --ckpt-dir instead of starting fresh
    #[arg(long)]
    resume: bool,
}

#[derive(Args)]
struct SampleArgs {
    #[arg(long, default_value = "checkpoints")]
    ckpt_dir: PathBuf,

    #[arg(long, default_value = "samples")]
    output_dir: PathBuf,

    /// Overrides the sequence length recorded in the run config
    #[arg(long)]
    sequence_length: Option<usize>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("motion_acgan=info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Train(args) => run_train(args),
        Command::Sample(args) => run_sample(args),
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    ensure!(args.num_classes >= 1, "--num-classes must be at least 1");
    validate_sequence_length(args.sequence_length)?;
    ensure!(
        args.checkpoint_every >= 1,
        "--checkpoint-every must be at least 1"
    );

    let model = ModelConfig::new(
        GeneratorConfig::new(args.num_classes)
            .with_norm(args.norm)
            .with_init(args.init),
        DiscriminatorConfig::new()
            .with_norm(args.norm)
            .with_init(args.init),
    );
    let config = TrainingConfig::new(model, AdamConfig::new(), AdamConfig::new(), args.network)
        .with_num_epochs(args.num_epochs)
        .with_batch_size(args.batch_size)
        .with_num_workers(args.num_workers)
        .with_seed(args.seed)
        .with_learning_rate(args.learning_rate)
        .with_sequence_length(args.sequence_length)
        .with_checkpoint_every(args.checkpoint_every)
        .with_resume(args.resume);

    model::training::train::<backend::Train>(
        &args.data_dir,
        &args.ckpt_dir,
        &args.log_dir,
        &args.figure_dir,
        config,
        backend::device(),
    )
}

fn run_sample(args: SampleArgs) -> Result<()> {
    let config_path = args.ckpt_dir.join("config.json");
    let mut config = TrainingConfig::load(&config_path)
        .map_err(|err| anyhow!("{err}"))
        .with_context(|| format!("failed to load run config {}", config_path.display()))?;
    if let Some(sequence_length) = args.sequence_length {
        validate_sequence_length(sequence_length)?;
        config.sequence_length = sequence_length;
    }

    model::sampling::sample::<backend::Inference>(
        &args.ckpt_dir,
        &args.output_dir,
        &config,
        backend::device(),
    )
}

fn validate_sequence_length(sequence_length: usize) -> Result<()> {
    ensure!(
        (1..=WIDTH).contains(&sequence_length),
        "--sequence-length must be between 1 and {WIDTH}"
    );
    Ok(())
}
