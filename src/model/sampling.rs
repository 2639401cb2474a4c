use crate::model::{
    architecture::{Generator, NetworkKind},
    constants::{CHANNELS, HEIGHT, LATENT_DIM, NUM_JOINTS, WIDTH},
    training::TrainingConfig,
};
use crate::utils::{MotionSequence, image_to_motion_sequence, write_motion_gif};

use anyhow::{Context, Result, anyhow};
use burn::{
    prelude::*,
    record::{BinFileRecorder, FullPrecisionSettings, Recorder},
    tensor::Distribution,
};
use std::path::Path;
use tracing::info;

/// Loads the generator from the checkpoint directory and writes one animated
/// GIF per action class into `output_dir`.
pub fn sample<B: Backend>(
    ckpt_dir: &Path,
    output_dir: &Path,
    config: &TrainingConfig,
    device: B::Device,
) -> Result<()> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir {}", output_dir.display()))?;

    let model_path = ckpt_dir.join("generator").join("model");
    let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
    let record = recorder
        .load(model_path.clone(), &device)
        .with_context(|| format!("missing or unreadable generator record at {}", model_path.display()))?;
    let generator = match config.network {
        NetworkKind::Acgan => config.model.generator.init::<B>(&device).load_record(record),
    };

    let sequences = generate_sequences(
        &generator,
        config.model.generator.num_classes,
        config.sequence_length,
        &device,
    )?;
    for (label, sequence) in sequences.iter().enumerate() {
        let path = output_dir.join(format!("motion-class-{label}.gif"));
        write_motion_gif(sequence, &path)?;
        info!("wrote {}", path.display());
    }

    Ok(())
}

/// Generates one motion sequence per class: a single latent draw per label,
/// decoded from motion-image layout back into per-frame joint coordinates.
pub fn generate_sequences<B: Backend>(
    generator: &Generator<B>,
    num_classes: usize,
    sequence_length: usize,
    device: &B::Device,
) -> Result<Vec<MotionSequence>> {
    let noise = Tensor::<B, 2>::random(
        [num_classes, LATENT_DIM],
        Distribution::Normal(0.0, 1.0),
        device,
    );
    let labels = Tensor::<B, 1, Int>::arange(0..num_classes as i64, device);

    // [class, channel, joint, frame] -> [class, frame, joint, channel]
    let images = generator.forward(noise, labels).permute([0, 3, 2, 1]);
    let data = images
        .into_data()
        .to_vec::<f32>()
        .map_err(|err| anyhow!("{err:?}"))?;

    data.chunks_exact(WIDTH * HEIGHT * CHANNELS)
        .map(|sample| image_to_motion_sequence(sample, NUM_JOINTS, CHANNELS, sequence_length))
        .collect()
}
