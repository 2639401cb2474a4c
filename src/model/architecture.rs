use burn::{
    nn::{
        BatchNorm, BatchNormConfig, Dropout, DropoutConfig, Embedding, EmbeddingConfig,
        Initializer, InstanceNorm, InstanceNormConfig, LeakyRelu, LeakyReluConfig, Linear,
        LinearConfig, PaddingConfig2d, Relu, Tanh,
        conv::{Conv2d, Conv2dConfig, ConvTranspose2d, ConvTranspose2dConfig},
    },
    prelude::*,
};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::model::constants::{CHANNELS, LATENT_DIM};

/// Network family selector. Resolved to concrete constructors at configuration
/// time rather than dispatched on a name string at first use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum NetworkKind {
    Acgan,
}

/// Normalization applied after each convolution stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum NormKind {
    Batch,
    Instance,
}

impl NormKind {
    pub fn init<B: Backend>(self, num_features: usize, device: &B::Device) -> Norm<B> {
        match self {
            NormKind::Batch => Norm::Batch(BatchNormConfig::new(num_features).init(device)),
            NormKind::Instance => {
                Norm::Instance(InstanceNormConfig::new(num_features).init(device))
            }
        }
    }
}

#[derive(Module, Debug)]
pub enum Norm<B: Backend> {
    Batch(BatchNorm<B, 2>),
    Instance(InstanceNorm<B>),
}

impl<B: Backend> Norm<B> {
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        match self {
            Norm::Batch(norm) => norm.forward(input),
            Norm::Instance(norm) => norm.forward(input),
        }
    }
}

/// Weight initialization scheme, mapped onto the framework's initializers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum InitScheme {
    Normal,
    Xavier,
    Kaiming,
}

impl InitScheme {
    pub fn initializer(self, gain: f64) -> Initializer {
        match self {
            InitScheme::Normal => Initializer::Normal {
                mean: 0.0,
                std: gain,
            },
            InitScheme::Xavier => Initializer::XavierNormal { gain },
            InitScheme::Kaiming => Initializer::KaimingNormal {
                gain,
                fan_out_only: false,
            },
        }
    }
}

#[derive(Config, Debug)]
pub struct GeneratorConfig {
    pub num_classes: usize,

    #[config(default = 64)]
    pub nker: usize,

    #[config(default = "NormKind::Batch")]
    pub norm: NormKind,

    #[config(default = 0.25)]
    pub dropout: f64,

    #[config(default = "InitScheme::Normal")]
    pub init: InitScheme,

    #[config(default = 0.02)]
    pub init_gain: f64,
}

/// Maps (latent vector, class label) to a motion-image tensor in `[-1, 1]`.
/// Conditioning multiplies the latent with a learned per-class embedding.
#[derive(Module, Debug)]
pub struct Generator<B: Backend> {
    label_embed: Embedding<B>,
    linear1: Linear<B>,
    conv1: ConvTranspose2d<B>,
    conv2: ConvTranspose2d<B>,
    conv3: ConvTranspose2d<B>,
    conv4: ConvTranspose2d<B>,
    norm1: Norm<B>,
    norm2: Norm<B>,
    norm3: Norm<B>,
    norm4: Norm<B>,
    activation: Relu,
    activation2: Tanh,
    dropout: Dropout,
    nker: usize,
}

impl GeneratorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Generator<B> {
        let initializer = self.init.initializer(self.init_gain);
        let deconv = |channels: [usize; 2]| {
            ConvTranspose2dConfig::new(channels, [3, 3])
                .with_stride([2, 2])
                .with_padding([1, 1])
                .with_padding_out([1, 1])
                .with_initializer(initializer.clone())
        };
        let c8 = self.nker * 8;

        Generator {
            label_embed: EmbeddingConfig::new(self.num_classes, LATENT_DIM)
                .with_initializer(initializer.clone())
                .init(device),
            linear1: LinearConfig::new(LATENT_DIM, c8 * 4 * 4)
                .with_initializer(initializer.clone())
                .init(device),
            conv1: deconv([c8, self.nker * 4]).init(device),
            conv2: deconv([self.nker * 4, self.nker * 2]).init(device),
            conv3: deconv([self.nker * 2, self.nker]).init(device),
            conv4: deconv([self.nker, CHANNELS]).init(device),
            norm1: self.norm.init(c8, device),
            norm2: self.norm.init(self.nker * 4, device),
            norm3: self.norm.init(self.nker * 2, device),
            norm4: self.norm.init(self.nker, device),
            activation: Relu,
            activation2: Tanh,
            dropout: DropoutConfig::new(self.dropout).init(),
            nker: self.nker,
        }
    }
}

impl<B: Backend> Generator<B> {
    /// `noise` is `[batch, LATENT_DIM]`, `labels` is `[batch]`. Output is
    /// `[batch, CHANNELS, HEIGHT, WIDTH]`.
    pub fn forward(&self, noise: Tensor<B, 2>, labels: Tensor<B, 1, Int>) -> Tensor<B, 4> {
        let embed = self.label_embed.forward(labels.unsqueeze_dim(1));
        let embed = embed.reshape([-1, LATENT_DIM as i32]);

        let x = self.linear1.forward(noise * embed);
        let mut x = x.reshape([-1, (self.nker * 8) as i32, 4, 4]);
        x = self.norm1.forward(x);
        x = self.activation.forward(x);
        x = self.dropout.forward(x);
        x = self.conv1.forward(x);
        x = self.norm2.forward(x);
        x = self.activation.forward(x);
        x = self.dropout.forward(x);
        x = self.conv2.forward(x);
        x = self.norm3.forward(x);
        x = self.activation.forward(x);
        x = self.dropout.forward(x);
        x = self.conv3.forward(x);
        x = self.norm4.forward(x);
        x = self.activation.forward(x);
        x = self.conv4.forward(x);
        self.activation2.forward(x)
    }
}

#[derive(Config, Debug)]
pub struct DiscriminatorConfig {
    #[config(default = 64)]
    pub nker: usize,

    #[config(default = "NormKind::Batch")]
    pub norm: NormKind,

    #[config(default = 0.2)]
    pub leaky_relu_slope: f64,

    #[config(default = 0.3)]
    pub dropout: f64,

    #[config(default = "InitScheme::Normal")]
    pub init: InitScheme,

    #[config(default = 0.02)]
    pub init_gain: f64,
}

/// Maps a motion-image tensor to a single real/fake logit per sample.
#[derive(Module, Debug)]
pub struct Discriminator<B: Backend> {
    conv1: Conv2d<B>,
    conv2: Conv2d<B>,
    conv3: Conv2d<B>,
    conv4: Conv2d<B>,
    norm1: Norm<B>,
    norm2: Norm<B>,
    norm3: Norm<B>,
    norm4: Norm<B>,
    fc: Linear<B>,
    activation: LeakyRelu,
    dropout: Dropout,
    nker: usize,
}

impl DiscriminatorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Discriminator<B> {
        let initializer = self.init.initializer(self.init_gain);
        let conv = |channels: [usize; 2]| {
            Conv2dConfig::new(channels, [4, 4])
                .with_stride([2, 2])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .with_initializer(initializer.clone())
        };
        let c8 = self.nker * 8;

        Discriminator {
            conv1: conv([CHANNELS, self.nker]).init(device), // 64 -> 32
            conv2: conv([self.nker, self.nker * 2]).init(device), // 32 -> 16
            conv3: conv([self.nker * 2, self.nker * 4]).init(device), // 16 -> 8
            conv4: conv([self.nker * 4, c8]).init(device), // 8 -> 4
            norm1: self.norm.init(self.nker, device),
            norm2: self.norm.init(self.nker * 2, device),
            norm3: self.norm.init(self.nker * 4, device),
            norm4: self.norm.init(c8, device),
            fc: LinearConfig::new(c8 * 4 * 4, 1)
                .with_initializer(initializer)
                .init(device),
            activation: LeakyReluConfig::new()
                .with_negative_slope(self.leaky_relu_slope)
                .init(),
            dropout: DropoutConfig::new(self.dropout).init(),
            nker: self.nker,
        }
    }
}

impl<B: Backend> Discriminator<B> {
    /// Returns raw logits `[batch, 1]`; the adversarial loss applies the
    /// sigmoid internally.
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut x = self.conv1.forward(input);
        x = self.norm1.forward(x);
        x = self.activation.forward(x);
        x = self.dropout.forward(x);

        x = self.conv2.forward(x);
        x = self.norm2.forward(x);
        x = self.activation.forward(x);
        x = self.dropout.forward(x);

        x = self.conv3.forward(x);
        x = self.norm3.forward(x);
        x = self.activation.forward(x);
        x = self.dropout.forward(x);

        x = self.conv4.forward(x);
        x = self.norm4.forward(x);
        x = self.activation.forward(x);

        let x_flat = x.reshape([-1i32, (self.nker * 8 * 4 * 4) as i32]);
        self.fc.forward(x_flat)
    }
}

#[derive(Config, Debug)]
pub struct ModelConfig {
    pub generator: GeneratorConfig,
    pub discriminator: DiscriminatorConfig,
}
