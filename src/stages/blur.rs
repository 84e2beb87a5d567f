//! Gaussian smoothing.
//!
//! The kernel follows the usual derivation for an odd size `k`:
//! `sigma = 0.3 * ((k - 1) * 0.5 - 1) + 0.8`, sampled and normalised.
//! Filtering is separable with reflect-101 borders.

use image::{GrayImage, RgbImage};

use crate::error::Result;
use crate::graph::{
    ImageData, Inputs, Outputs, ParamDecl, ParamSet, PortDecl, StageImpl, Value, ValueKind,
};

/// Gaussian blur over grayscale or RGB frames. `size` is the odd kernel
/// width; size 1 is the identity.
pub struct GaussianBlur;

static BLUR_IN: &[PortDecl] = &[PortDecl::new("image", ValueKind::Image)];
static BLUR_OUT: &[PortDecl] = &[PortDecl::new("image", ValueKind::Image)];
static BLUR_PARAMS: &[ParamDecl] = &[ParamDecl::int("size", 1, 101, 2, 5)];

impl StageImpl for GaussianBlur {
    fn type_name(&self) -> &'static str {
        "gaussian_blur"
    }

    fn inputs(&self) -> &'static [PortDecl] {
        BLUR_IN
    }

    fn outputs(&self) -> &'static [PortDecl] {
        BLUR_OUT
    }

    fn params(&self) -> &'static [ParamDecl] {
        BLUR_PARAMS
    }

    fn compute(&self, params: &ParamSet, inputs: &Inputs<'_>, outputs: &mut Outputs) -> Result<()> {
        let size = params.int("size")? as usize;
        let image = inputs.image("image")?;
        if size == 1 {
            return outputs.set("image", Value::Image(image.clone()));
        }
        let kernel = gaussian_kernel(size);
        let blurred = match image {
            ImageData::Gray(img) => ImageData::Gray(smooth_gray(img, &kernel)),
            ImageData::Rgb(img) => ImageData::Rgb(smooth_rgb(img, &kernel)),
        };
        outputs.set("image", Value::Image(blurred))
    }
}

/// Normalised 1-D Gaussian kernel of odd width `size`.
pub(crate) fn gaussian_kernel(size: usize) -> Vec<f32> {
    debug_assert!(size % 2 == 1);
    if size == 1 {
        return vec![1.0];
    }
    let sigma = 0.3 * ((size - 1) as f32 * 0.5 - 1.0) + 0.8;
    let half = (size / 2) as i64;
    let mut kernel: Vec<f32> = (-half..=half)
        .map(|x| (-(x * x) as f32 / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum: f32 = kernel.iter().sum();
    for v in &mut kernel {
        *v /= sum;
    }
    kernel
}

/// Reflect-101 border index (`dcb|abcdefgh|gfe`).
fn reflect(mut i: i64, len: i64) -> i64 {
    loop {
        if i < 0 {
            i = -i;
        } else if i >= len {
            i = 2 * len - 2 - i;
        } else {
            return i;
        }
    }
}

/// Separable convolution of a grayscale image with a 1-D kernel.
pub(crate) fn smooth_gray(src: &GrayImage, kernel: &[f32]) -> GrayImage {
    let (w, h) = src.dimensions();
    let half = (kernel.len() / 2) as i64;

    // Horizontal pass into a float plane.
    let mut plane = vec![0.0f32; (w * h) as usize];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let sx = reflect(x as i64 + k as i64 - half, w as i64) as u32;
                acc += weight * f32::from(src.get_pixel(sx, y).0[0]);
            }
            plane[(y * w + x) as usize] = acc;
        }
    }

    // Vertical pass back to bytes.
    let mut out = GrayImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let sy = reflect(y as i64 + k as i64 - half, h as i64) as u32;
                acc += weight * plane[(sy * w + x) as usize];
            }
            out.get_pixel_mut(x, y).0 = [acc.round().clamp(0.0, 255.0) as u8];
        }
    }
    out
}

fn smooth_rgb(src: &RgbImage, kernel: &[f32]) -> RgbImage {
    let (w, h) = src.dimensions();
    let mut out = RgbImage::new(w, h);
    for channel in 0..3 {
        let mut plane = GrayImage::new(w, h);
        for (src_px, dst_px) in src.pixels().zip(plane.pixels_mut()) {
            dst_px.0 = [src_px.0[channel]];
        }
        let smoothed = smooth_gray(&plane, kernel);
        for (src_px, dst_px) in smoothed.pixels().zip(out.pixels_mut()) {
            dst_px.0[channel] = src_px.0[0];
        }
    }
    out
}
