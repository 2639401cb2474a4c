use anyhow::{Context, Result, ensure};
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, Rgba, RgbaImage};
use imageproc::drawing::draw_filled_circle_mut;
use std::fs::File;
use std::path::Path;

use crate::model::constants::CHANNELS;

const CANVAS_SIZE: u32 = 128;
const JOINT_RADIUS: i32 = 2;
const FRAME_DELAY_MS: u32 = 80;

/// One frame of a reconstructed motion sequence: (x, y) per joint, in [-1, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct MotionFrame {
    pub joints: Vec<(f32, f32)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MotionSequence {
    pub frames: Vec<MotionFrame>,
}

/// Converts a CHW float image in [-1, 1] into an RGB image.
pub fn chw_vec_to_image(data: &[f32], height: usize, width: usize) -> Option<image::DynamicImage> {
    let expected_len = width * height * CHANNELS;
    if data.len() != expected_len {
        return None;
    }

    let plane = width * height;
    let mut raw_pixels = Vec::with_capacity(expected_len);
    for idx in 0..plane {
        for c in 0..CHANNELS {
            // Reversing the normalization: (val + 1.0) * 127.5
            let denormalized = (data[c * plane + idx] + 1.0) * 127.5;
            raw_pixels.push(denormalized.clamp(0.0, 255.0) as u8);
        }
    }

    let img_buf = image::ImageBuffer::<image::Rgb<u8>, Vec<u8>>::from_raw(
        width as u32,
        height as u32,
        raw_pixels,
    )?;

    Some(image::DynamicImage::ImageRgb8(img_buf))
}

/// Reconstructs a motion sequence from one generated sample in frame-major
/// `[frame, joint, channel]` layout. Channels R/G carry the joint's x/y
/// coordinates; the first `sequence_length` frame columns are used.
pub fn image_to_motion_sequence(
    data: &[f32],
    num_joints: usize,
    num_channels: usize,
    sequence_length: usize,
) -> Result<MotionSequence> {
    ensure!(num_channels >= 2, "need at least x and y channels per joint");
    let frame_stride = num_joints * num_channels;
    ensure!(frame_stride > 0, "empty frame layout");
    let available = data.len() / frame_stride;
    ensure!(
        sequence_length <= available,
        "sequence length {sequence_length} exceeds the {available} encoded frame columns"
    );

    let frames = (0..sequence_length)
        .map(|frame_idx| {
            let joints = (0..num_joints)
                .map(|joint_idx| {
                    let base = frame_idx * frame_stride + joint_idx * num_channels;
                    (data[base], data[base + 1])
                })
                .collect();
            MotionFrame { joints }
        })
        .collect();

    Ok(MotionSequence { frames })
}

/// Renders a motion sequence as a looping animated GIF, one GIF frame per
/// motion frame, joints drawn as filled markers.
pub fn write_motion_gif(sequence: &MotionSequence, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create gif file {}", path.display()))?;
    let mut encoder = GifEncoder::new(file);
    encoder.set_repeat(Repeat::Infinite)?;

    for frame in &sequence.frames {
        let mut canvas =
            RgbaImage::from_pixel(CANVAS_SIZE, CANVAS_SIZE, Rgba([255, 255, 255, 255]));
        for &(x, y) in &frame.joints {
            let px = to_canvas(x);
            let py = to_canvas(y);
            draw_filled_circle_mut(&mut canvas, (px, py), JOINT_RADIUS, Rgba([30, 30, 30, 255]));
        }
        encoder.encode_frame(Frame::from_parts(
            canvas,
            0,
            0,
            Delay::from_numer_denom_ms(FRAME_DELAY_MS, 1),
        ))?;
    }

    Ok(())
}

fn to_canvas(coord: f32) -> i32 {
    let unit = (coord.clamp(-1.0, 1.0) + 1.0) * 0.5;
    (unit * (CANVAS_SIZE - 1) as f32) as i32
}
