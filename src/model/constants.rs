/// Dimensionality of the generator's latent input.
pub const LATENT_DIM: usize = 100;

pub const CHANNELS: usize = 3;

/// Rows of a motion image, one per tracked joint.
pub const HEIGHT: usize = 64;

/// Columns of a motion image, one per frame slot. A run's `sequence_length`
/// selects how many leading columns carry frames.
pub const WIDTH: usize = 64;

pub const NUM_JOINTS: usize = HEIGHT;
