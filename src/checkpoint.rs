use anyhow::{Context, Result};
use burn::module::AutodiffModule;
use burn::optim::Optimizer;
use burn::record::{BinFileRecorder, FullPrecisionSettings, Recorder};
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Sidecar state persisted next to the module and optimizer records.
#[derive(Debug, Serialize, Deserialize)]
struct CheckpointState {
    epoch: usize,
}

/// Persists one network role (module record, optimizer record, epoch) into
/// `dir`. Writes are not atomic with respect to process termination.
pub fn save<B, M, O>(dir: &Path, net: &M, optim: &O, epoch: usize) -> Result<()>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
    O: Optimizer<M, B>,
{
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create checkpoint dir {}", dir.display()))?;
    let recorder = BinFileRecorder::<FullPrecisionSettings>::new();

    recorder
        .record(net.clone().into_record(), dir.join("model"))
        .context("failed to save module record")?;
    recorder
        .record(optim.to_record(), dir.join("optim"))
        .context("failed to save optimizer record")?;

    let state = CheckpointState { epoch };
    std::fs::write(dir.join("state.json"), serde_json::to_string_pretty(&state)?)
        .context("failed to save checkpoint state")?;
    Ok(())
}

/// Restores one network role from `dir`, returning the loaded module and
/// optimizer together with the persisted epoch. Missing checkpoint files are
/// a hard error.
pub fn load<B, M, O>(dir: &Path, net: M, optim: O, device: &B::Device) -> Result<(M, O, usize)>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
    O: Optimizer<M, B>,
{
    let recorder = BinFileRecorder::<FullPrecisionSettings>::new();

    let record = recorder
        .load(dir.join("model"), device)
        .with_context(|| format!("missing or unreadable module record in {}", dir.display()))?;
    let net = net.load_record(record);

    let record = recorder
        .load(dir.join("optim"), device)
        .with_context(|| format!("missing or unreadable optimizer record in {}", dir.display()))?;
    let optim = optim.load_record(record);

    let state_path = dir.join("state.json");
    let contents = std::fs::read_to_string(&state_path)
        .with_context(|| format!("missing checkpoint state {}", state_path.display()))?;
    let state: CheckpointState = serde_json::from_str(&contents)
        .with_context(|| format!("malformed checkpoint state {}", state_path.display()))?;
    Ok((net, optim, state.epoch))
}
