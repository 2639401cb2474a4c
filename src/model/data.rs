use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::prelude::*;
use image::ImageReader;
use std::path::{Path, PathBuf};

use crate::model::constants::{CHANNELS, HEIGHT, WIDTH};

#[derive(Debug, Clone)]
pub struct MotionItem {
    pub image: Vec<f32>,
    pub label: usize,
}

/// Motion-image dataset. The data directory holds one subdirectory per action
/// class; the class index is the subdirectory's position in sorted order.
pub struct MotionDataset {
    samples: Vec<(PathBuf, usize)>,
    class_names: Vec<String>,
}

impl MotionDataset {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self, std::io::Error> {
        let data_dir = data_dir.as_ref();
        let mut class_dirs = Vec::new();

        for entry in std::fs::read_dir(data_dir)? {
            let path = entry?.path();
            if path.is_dir() {
                class_dirs.push(path);
            }
        }
        class_dirs.sort();
        if class_dirs.is_empty() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no class directories found in the data directory",
            ));
        }

        let mut samples = Vec::new();
        let mut class_names = Vec::new();
        for (label, class_dir) in class_dirs.iter().enumerate() {
            let mut files = Vec::new();
            for entry in std::fs::read_dir(class_dir)? {
                let path = entry?.path();
                if !path.is_file() {
                    continue;
                }
                if let Some(ext) = path.extension().and_then(|s| s.to_str()) {
                    match ext.to_lowercase().as_str() {
                        "jpg" | "jpeg" | "png" | "bmp" | "tiff" => files.push(path),
                        _ => {}
                    }
                }
            }
            files.sort();
            samples.extend(files.into_iter().map(|path| (path, label)));
            class_names.push(
                class_dir
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            );
        }
        if samples.is_empty() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no valid image files found in the class directories",
            ));
        }

        Ok(Self {
            samples,
            class_names,
        })
    }

    pub fn num_classes(&self) -> usize {
        self.class_names.len()
    }

    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }
}

impl Dataset<MotionItem> for MotionDataset {
    fn len(&self) -> usize {
        self.samples.len()
    }

    fn get(&self, index: usize) -> Option<MotionItem> {
        let (path, label) = &self.samples[index];
        let image = ImageReader::open(path).ok()?.decode().ok()?;
        let image = if image.width() != WIDTH as u32 || image.height() != HEIGHT as u32 {
            image.resize_exact(
                WIDTH as u32,
                HEIGHT as u32,
                image::imageops::FilterType::Triangle,
            )
        } else {
            image
        };
        let image = image.to_rgb8();

        let plane = HEIGHT * WIDTH;
        let mut image_data = vec![0.0f32; CHANNELS * plane];
        for (x, y, pixel) in image.enumerate_pixels() {
            let idx = y as usize * WIDTH + x as usize;
            for c in 0..CHANNELS {
                // Normalize to [-1, 1]
                image_data[c * plane + idx] = (pixel[c] as f32 / 127.5) - 1.0;
            }
        }

        Some(MotionItem {
            image: image_data,
            label: *label,
        })
    }
}

#[derive(Clone, Default)]
pub struct MotionBatcher {}

#[derive(Clone, Debug)]
pub struct MotionBatch<B: Backend> {
    pub images: Tensor<B, 4>, // Shape: [batch_size, channels, height, width]
    pub labels: Tensor<B, 1, Int>,
}

impl<B: Backend> Batcher<B, MotionItem, MotionBatch<B>> for MotionBatcher {
    fn batch(&self, items: Vec<MotionItem>, device: &B::Device) -> MotionBatch<B> {
        let labels: Vec<i64> = items.iter().map(|item| item.label as i64).collect();
        let num_items = labels.len();

        let image_tensors: Vec<Tensor<B, 4>> = items
            .into_iter()
            .map(|item| {
                Tensor::<B, 3>::from_data(
                    TensorData::new(item.image, [CHANNELS, HEIGHT, WIDTH])
                        .convert::<B::FloatElem>(),
                    device,
                )
                .reshape([1, CHANNELS, HEIGHT, WIDTH])
            })
            .collect();
        let images = Tensor::cat(image_tensors, 0);
        let labels = Tensor::<B, 1, Int>::from_data(
            TensorData::new(labels, [num_items]).convert::<B::IntElem>(),
            device,
        );
        MotionBatch { images, labels }
    }
}
