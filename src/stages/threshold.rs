//! Adaptive thresholding.

use image::GrayImage;

use crate::error::Result;
use crate::graph::{
    ImageData, Inputs, Outputs, ParamDecl, ParamSet, PortDecl, StageImpl, Value, ValueKind,
};

use super::blur::{gaussian_kernel, smooth_gray};
use super::compute_err;

/// Inverted-binary adaptive threshold: a pixel becomes foreground (255)
/// when it is at most `mean - c`, where the mean is taken over the
/// `block_size` neighbourhood. Dark objects on light backgrounds come out
/// as foreground, which is what the contour extractor expects.
pub struct AdaptiveThreshold;

static THRESHOLD_IN: &[PortDecl] = &[PortDecl::new("image", ValueKind::Image)];
static THRESHOLD_OUT: &[PortDecl] = &[PortDecl::new("image", ValueKind::Image)];
static THRESHOLD_PARAMS: &[ParamDecl] = &[
    ParamDecl::int("block_size", 3, 101, 2, 11),
    ParamDecl::int("c", -100, 100, 1, 3),
    ParamDecl::choice("method", &["mean", "gaussian"], "mean"),
];

impl StageImpl for AdaptiveThreshold {
    fn type_name(&self) -> &'static str {
        "adaptive_threshold"
    }

    fn inputs(&self) -> &'static [PortDecl] {
        THRESHOLD_IN
    }

    fn outputs(&self) -> &'static [PortDecl] {
        THRESHOLD_OUT
    }

    fn params(&self) -> &'static [ParamDecl] {
        THRESHOLD_PARAMS
    }

    fn compute(&self, params: &ParamSet, inputs: &Inputs<'_>, outputs: &mut Outputs) -> Result<()> {
        let block_size = params.int("block_size")? as usize;
        let c = params.int("c")? as f64;
        let method = params.str("method")?;
        let ImageData::Gray(src) = inputs.image("image")? else {
            return Err(compute_err("adaptive threshold expects a grayscale image"));
        };
        let means: Vec<f64> = match method {
            "gaussian" => {
                let smoothed = smooth_gray(src, &gaussian_kernel(block_size));
                smoothed.pixels().map(|p| f64::from(p.0[0])).collect()
            }
            _ => box_means(src, block_size),
        };
        let mut out = GrayImage::new(src.width(), src.height());
        for ((src_px, dst_px), mean) in src.pixels().zip(out.pixels_mut()).zip(means) {
            dst_px.0 = [if f64::from(src_px.0[0]) <= mean - c { 255 } else { 0 }];
        }
        outputs.set("image", Value::Image(ImageData::Gray(out)))
    }
}

/// Per-pixel mean over a `block_size` square window clamped to the image
/// bounds, computed with a summed-area table.
fn box_means(src: &GrayImage, block_size: usize) -> Vec<f64> {
    let (w, h) = (src.width() as usize, src.height() as usize);
    let half = (block_size / 2) as i64;

    // Integral image, one extra row/column of zeros.
    let mut integral = vec![0u64; (w + 1) * (h + 1)];
    for y in 0..h {
        let mut row_sum = 0u64;
        for x in 0..w {
            row_sum += u64::from(src.get_pixel(x as u32, y as u32).0[0]);
            integral[(y + 1) * (w + 1) + (x + 1)] = integral[y * (w + 1) + (x + 1)] + row_sum;
        }
    }

    let mut means = Vec::with_capacity(w * h);
    for y in 0..h as i64 {
        for x in 0..w as i64 {
            let x0 = (x - half).max(0) as usize;
            let y0 = (y - half).max(0) as usize;
            let x1 = (x + half + 1).min(w as i64) as usize;
            let y1 = (y + half + 1).min(h as i64) as usize;
            let sum = integral[y1 * (w + 1) + x1] + integral[y0 * (w + 1) + x0]
                - integral[y0 * (w + 1) + x1]
                - integral[y1 * (w + 1) + x0];
            means.push(sum as f64 / ((x1 - x0) * (y1 - y0)) as f64);
        }
    }
    means
}
