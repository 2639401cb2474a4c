use crate::checkpoint;
use crate::metrics::MetricsLogger;
use crate::model::{
    architecture::{Discriminator, Generator, ModelConfig, NetworkKind},
    constants::{HEIGHT, LATENT_DIM, WIDTH},
    data::{MotionBatch, MotionBatcher, MotionDataset},
};
use crate::utils::chw_vec_to_image;

use anyhow::{Context, Result, bail};
use burn::{
    data::dataloader::DataLoaderBuilder,
    nn::loss::{BinaryCrossEntropyLoss, BinaryCrossEntropyLossConfig},
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::{Distribution, ElementConversion, backend::AutodiffBackend},
};
use std::path::Path;
use tracing::info;

#[derive(Config)]
pub struct TrainingConfig {
    pub model: ModelConfig,
    pub optimizer_g: AdamConfig,
    pub optimizer_d: AdamConfig,
    pub network: NetworkKind,

    #[config(default = 300)]
    pub num_epochs: usize,

    #[config(default = 16)]
    pub batch_size: usize,

    #[config(default = 2)]
    pub num_workers: usize,

    #[config(default = 42)]
    pub seed: u64,

    #[config(default = 2e-4)]
    pub learning_rate: f64,

    #[config(default = 16)]
    pub sequence_length: usize,

    #[config(default = 100)]
    pub checkpoint_every: usize,

    #[config(default = false)]
    pub resume: bool,
}

struct StepLosses {
    g: f32,
    d_real: f32,
    d_fake: f32,
}

pub fn train<B: AutodiffBackend>(
    data_dir: &Path,
    ckpt_dir: &Path,
    log_dir: &Path,
    figure_dir: &Path,
    config: TrainingConfig,
    device: B::Device,
) -> Result<()> {
    std::fs::create_dir_all(ckpt_dir)?;
    std::fs::create_dir_all(figure_dir)?;
    config
        .save(ckpt_dir.join("config.json"))
        .context("failed to save run config")?;

    B::seed(config.seed);

    let dataset = MotionDataset::new(data_dir)
        .with_context(|| format!("failed to load dataset from {}", data_dir.display()))?;
    if dataset.num_classes() != config.model.generator.num_classes {
        bail!(
            "dataset has {} classes but the generator is configured for {}",
            dataset.num_classes(),
            config.model.generator.num_classes
        );
    }
    info!(
        "loaded {} motion images across {} classes: {:?}",
        burn::data::dataset::Dataset::len(&dataset),
        dataset.num_classes(),
        dataset.class_names()
    );

    let dataloader_train = DataLoaderBuilder::new(MotionBatcher::default())
        .batch_size(config.batch_size)
        .shuffle(config.seed)
        .num_workers(config.num_workers)
        .build(dataset);

    let (mut generator, mut discriminator) = match config.network {
        NetworkKind::Acgan => (
            config.model.generator.init::<B>(&device),
            config.model.discriminator.init::<B>(&device),
        ),
    };

    let mut optim_g = config
        .optimizer_g
        .clone()
        .with_beta_1(0.5)
        .with_beta_2(0.999)
        .init::<B, Generator<B>>();
    let mut optim_d = config
        .optimizer_d
        .clone()
        .with_beta_1(0.5)
        .with_beta_2(0.999)
        .init::<B, Discriminator<B>>();

    let mut start_epoch = 0;
    if config.resume {
        let (g, og, g_epoch) =
            checkpoint::load(&ckpt_dir.join("generator"), generator, optim_g, &device)
                .context("resume requested but generator checkpoint is unusable")?;
        let (d, od, d_epoch) = checkpoint::load(
            &ckpt_dir.join("discriminator"),
            discriminator,
            optim_d,
            &device,
        )
        .context("resume requested but discriminator checkpoint is unusable")?;
        generator = g;
        optim_g = og;
        discriminator = d;
        optim_d = od;
        start_epoch = g_epoch.max(d_epoch) + 1;
        info!("resumed from epoch {}", start_epoch.saturating_sub(1));
    }

    let mut metrics = if config.resume {
        MetricsLogger::append(log_dir)?
    } else {
        MetricsLogger::create(log_dir)?
    };
    let bce = BinaryCrossEntropyLossConfig::new()
        .with_logits(true)
        .init(&device);

    for epoch in start_epoch..config.num_epochs {
        let mut g_losses = Vec::new();
        let mut d_real_losses = Vec::new();
        let mut d_fake_losses = Vec::new();

        for batch in dataloader_train.iter() {
            let (generator_next, discriminator_next, losses) = train_step(
                generator,
                discriminator,
                &mut optim_g,
                &mut optim_d,
                &bce,
                batch,
                config.learning_rate,
                &device,
            );
            generator = generator_next;
            discriminator = discriminator_next;

            g_losses.push(losses.g);
            d_real_losses.push(losses.d_real);
            d_fake_losses.push(losses.d_fake);
        }

        let g_mean = mean(&g_losses);
        let d_real_mean = mean(&d_real_losses);
        let d_fake_mean = mean(&d_fake_losses);

        info!(
            "epoch [{}/{}]  g_loss: {:.4}  d_real_loss: {:.4}  d_fake_loss: {:.4}",
            epoch + 1,
            config.num_epochs,
            g_mean,
            d_real_mean,
            d_fake_mean,
        );
        metrics.log_scalar("generator_loss", g_mean, epoch)?;
        metrics.log_scalar("discriminator_real_loss", d_real_mean, epoch)?;
        metrics.log_scalar("discriminator_fake_loss", d_fake_mean, epoch)?;

        if epoch % config.checkpoint_every == 0 {
            checkpoint::save(&ckpt_dir.join("generator"), &generator, &optim_g, epoch)?;
            checkpoint::save(
                &ckpt_dir.join("discriminator"),
                &discriminator,
                &optim_d,
                epoch,
            )?;
            save_preview(&generator, figure_dir, epoch, &device)?;
        }
    }

    // Nothing trained means nothing to persist; rewriting the loaded
    // checkpoint here would regress its epoch.
    if start_epoch < config.num_epochs {
        let last_epoch = config.num_epochs - 1;
        checkpoint::save(&ckpt_dir.join("generator"), &generator, &optim_g, last_epoch)?;
        checkpoint::save(
            &ckpt_dir.join("discriminator"),
            &discriminator,
            &optim_d,
            last_epoch,
        )?;
    }
    metrics.close()?;

    Ok(())
}

/// One adversarial step: discriminator update on (real, detached fake), then
/// generator update against the fresh discriminator judgment. Each backward
/// materializes its own gradients, and only the stepped network's slice of
/// them is ever applied, so the discriminator stays frozen through the
/// generator half.
#[allow(clippy::too_many_arguments)]
fn train_step<B, OG, OD>(
    generator: Generator<B>,
    discriminator: Discriminator<B>,
    optim_g: &mut OG,
    optim_d: &mut OD,
    bce: &BinaryCrossEntropyLoss<B>,
    batch: MotionBatch<B>,
    lr: f64,
    device: &B::Device,
) -> (Generator<B>, Discriminator<B>, StepLosses)
where
    B: AutodiffBackend,
    OG: Optimizer<Generator<B>, B>,
    OD: Optimizer<Discriminator<B>, B>,
{
    let real = batch.images.to_device(device);
    let labels = batch.labels.to_device(device);

    let (discriminator, fake, d_real, d_fake) =
        discriminator_step(&generator, discriminator, optim_d, bce, real, labels, lr, device);
    let (generator, g) = generator_step(generator, &discriminator, optim_g, bce, fake, lr, device);

    (generator, discriminator, StepLosses { g, d_real, d_fake })
}

#[allow(clippy::too_many_arguments)]
fn discriminator_step<B, OD>(
    generator: &Generator<B>,
    discriminator: Discriminator<B>,
    optim_d: &mut OD,
    bce: &BinaryCrossEntropyLoss<B>,
    real: Tensor<B, 4>,
    labels: Tensor<B, 1, Int>,
    lr: f64,
    device: &B::Device,
) -> (Discriminator<B>, Tensor<B, 4>, f32, f32)
where
    B: AutodiffBackend,
    OD: Optimizer<Discriminator<B>, B>,
{
    let batch_size = real.dims()[0];
    let ones = Tensor::<B, 1, Int>::ones([batch_size], device);
    let zeros = Tensor::<B, 1, Int>::zeros([batch_size], device);

    let real_logits: Tensor<B, 1> = discriminator.forward(real).flatten(0, 1);
    let loss_d_real = bce.forward(real_logits, ones);

    let noise = Tensor::<B, 2>::random(
        [batch_size, LATENT_DIM],
        Distribution::Normal(0.0, 1.0),
        device,
    );
    let fake = generator.forward(noise, labels);

    // Judged detached: the discriminator loss must not reach the generator.
    let fake_logits: Tensor<B, 1> = discriminator.forward(fake.clone().detach()).flatten(0, 1);
    let loss_d_fake = bce.forward(fake_logits, zeros);

    let loss_d = (loss_d_real.clone() + loss_d_fake.clone()).div_scalar(2.0);
    let grads_d = GradientsParams::from_grads(loss_d.backward(), &discriminator);
    let discriminator = optim_d.step(lr, discriminator, grads_d);

    (
        discriminator,
        fake,
        loss_d_real.into_scalar().elem::<f32>(),
        loss_d_fake.into_scalar().elem::<f32>(),
    )
}

fn generator_step<B, OG>(
    generator: Generator<B>,
    discriminator: &Discriminator<B>,
    optim_g: &mut OG,
    bce: &BinaryCrossEntropyLoss<B>,
    fake: Tensor<B, 4>,
    lr: f64,
    device: &B::Device,
) -> (Generator<B>, f32)
where
    B: AutodiffBackend,
    OG: Optimizer<Generator<B>, B>,
{
    let batch_size = fake.dims()[0];
    let ones = Tensor::<B, 1, Int>::ones([batch_size], device);

    let fake_logits: Tensor<B, 1> = discriminator.forward(fake).flatten(0, 1);
    let loss_g = bce.forward(fake_logits, ones);
    let grads_g = GradientsParams::from_grads(loss_g.backward(), &generator);
    let generator = optim_g.step(lr, generator, grads_g);

    (generator, loss_g.into_scalar().elem::<f32>())
}

fn mean(values: &[f32]) -> f32 {
    values.iter().sum::<f32>() / values.len().max(1) as f32
}

/// Saves one generated motion image as a PNG so a training run can be eyeballed
/// without the sampling path.
fn save_preview<B: AutodiffBackend>(
    generator: &Generator<B>,
    figure_dir: &Path,
    epoch: usize,
    device: &B::Device,
) -> Result<()> {
    let noise = Tensor::<B, 2>::random([1, LATENT_DIM], Distribution::Normal(0.0, 1.0), device);
    let label = Tensor::<B, 1, Int>::zeros([1], device);
    let sample: Tensor<B, 3> = generator.forward(noise, label).squeeze(0);
    let data = sample
        .into_data()
        .to_vec::<f32>()
        .map_err(|err| anyhow::anyhow!("{err:?}"))?;

    if let Some(image) = chw_vec_to_image(&data, HEIGHT, WIDTH) {
        image
            .save(figure_dir.join(format!("preview-epoch-{epoch}.png")))
            .context("failed to save preview image")?;
    }
    Ok(())
}
