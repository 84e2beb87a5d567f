//! Morphological filtering on grayscale images.

use image::GrayImage;

use crate::error::Result;
use crate::graph::{
    ImageData, Inputs, Outputs, ParamDecl, ParamSet, PortDecl, StageImpl, Value, ValueKind,
};

use super::compute_err;

/// Morphological operator with a selectable structuring element.
///
/// Erosion and dilation are the min/max of the neighbourhood selected by
/// the element; the compound operations are built from those two. Windows
/// are clamped at the image border, so border pixels never pull in
/// out-of-image values.
pub struct Morphology;

static MORPH_IN: &[PortDecl] = &[PortDecl::new("image", ValueKind::Image)];
static MORPH_OUT: &[PortDecl] = &[PortDecl::new("image", ValueKind::Image)];
static MORPH_PARAMS: &[ParamDecl] = &[
    ParamDecl::int("ksize", 1, 99, 2, 5),
    ParamDecl::choice("shape", &["ellipse", "rect", "cross"], "ellipse"),
    ParamDecl::choice(
        "operation",
        &["open", "close", "gradient", "tophat", "blackhat"],
        "open",
    ),
];

impl StageImpl for Morphology {
    fn type_name(&self) -> &'static str {
        "morphology"
    }

    fn inputs(&self) -> &'static [PortDecl] {
        MORPH_IN
    }

    fn outputs(&self) -> &'static [PortDecl] {
        MORPH_OUT
    }

    fn params(&self) -> &'static [ParamDecl] {
        MORPH_PARAMS
    }

    fn compute(&self, params: &ParamSet, inputs: &Inputs<'_>, outputs: &mut Outputs) -> Result<()> {
        let size = params.int("ksize")? as usize;
        let shape = params.str("shape")?;
        let operation = params.str("operation")?;
        let ImageData::Gray(src) = inputs.image("image")? else {
            return Err(compute_err("morphology expects a grayscale image"));
        };

        let element = Element::new(shape, size);
        let out = match operation {
            "open" => element.dilate(&element.erode(src)),
            "close" => element.erode(&element.dilate(src)),
            "gradient" => diff(&element.dilate(src), &element.erode(src)),
            "tophat" => diff(src, &element.dilate(&element.erode(src))),
            "blackhat" => diff(&element.erode(&element.dilate(src)), src),
            other => return Err(compute_err(format!("unknown operation '{other}'"))),
        };
        outputs.set("image", Value::Image(ImageData::Gray(out)))
    }
}

/// Per-pixel saturating difference.
fn diff(a: &GrayImage, b: &GrayImage) -> GrayImage {
    let mut out = GrayImage::new(a.width(), a.height());
    for ((pa, pb), po) in a.pixels().zip(b.pixels()).zip(out.pixels_mut()) {
        po.0 = [pa.0[0].saturating_sub(pb.0[0])];
    }
    out
}

/// A structuring element as the list of active offsets around the anchor.
struct Element {
    offsets: Vec<(i64, i64)>,
}

impl Element {
    fn new(shape: &str, size: usize) -> Self {
        let half = (size / 2) as i64;
        let mut offsets = Vec::new();
        for dy in -half..=half {
            for dx in -half..=half {
                let active = match shape {
                    "rect" => true,
                    "cross" => dx == 0 || dy == 0,
                    // Inscribed ellipse; size 1..=3 degenerates to a cross.
                    _ => {
                        let r = half.max(1) as f64;
                        let (fx, fy) = (dx as f64 / r, dy as f64 / r);
                        fx * fx + fy * fy <= 1.0 + 1e-9
                    }
                };
                if active {
                    offsets.push((dx, dy));
                }
            }
        }
        Self { offsets }
    }

    fn apply(&self, src: &GrayImage, fold: impl Fn(u8, u8) -> u8, init: u8) -> GrayImage {
        let (w, h) = (src.width() as i64, src.height() as i64);
        let mut out = GrayImage::new(src.width(), src.height());
        for y in 0..h {
            for x in 0..w {
                let mut acc = init;
                for &(dx, dy) in &self.offsets {
                    let (sx, sy) = (x + dx, y + dy);
                    if sx >= 0 && sx < w && sy >= 0 && sy < h {
                        acc = fold(acc, src.get_pixel(sx as u32, sy as u32).0[0]);
                    }
                }
                out.get_pixel_mut(x as u32, y as u32).0 = [acc];
            }
        }
        out
    }

    fn erode(&self, src: &GrayImage) -> GrayImage {
        self.apply(src, u8::min, u8::MAX)
    }

    fn dilate(&self, src: &GrayImage) -> GrayImage {
        self.apply(src, u8::max, u8::MIN)
    }
}
