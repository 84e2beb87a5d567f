//! Contour extraction, filtering and overlay drawing.

use image::{GrayImage, RgbImage};

use crate::error::Result;
use crate::graph::{
    Contour, ImageData, Inputs, Outputs, ParamDecl, ParamSet, Point, PortDecl, StageImpl, Value,
    ValueKind,
};

use super::compute_err;

/// Extracts the external boundary of every 8-connected foreground region
/// in a binary image.
///
/// Components are labelled first, then each one is traced clockwise from
/// its topmost-leftmost pixel with Moore neighbour tracing. Hole
/// boundaries are never reported; a region's contour encloses its holes.
pub struct ContourExtract;

static EXTRACT_IN: &[PortDecl] = &[PortDecl::new("image", ValueKind::Image)];
static EXTRACT_OUT: &[PortDecl] = &[PortDecl::new("contours", ValueKind::ContourSet)];

impl StageImpl for ContourExtract {
    fn type_name(&self) -> &'static str {
        "contour_extract"
    }

    fn inputs(&self) -> &'static [PortDecl] {
        EXTRACT_IN
    }

    fn outputs(&self) -> &'static [PortDecl] {
        EXTRACT_OUT
    }

    fn compute(&self, _params: &ParamSet, inputs: &Inputs<'_>, outputs: &mut Outputs) -> Result<()> {
        let ImageData::Gray(src) = inputs.image("image")? else {
            return Err(compute_err("contour extraction expects a binary image"));
        };
        outputs.set("contours", Value::Contours(extract_contours(src)))
    }
}

pub(crate) fn extract_contours(src: &GrayImage) -> Vec<Contour> {
    let (w, h) = (src.width() as i64, src.height() as i64);
    let mut labels = vec![0u32; (w * h) as usize];
    let mut contours = Vec::new();
    let mut next_label = 0u32;

    let fg = |x: i64, y: i64| x >= 0 && x < w && y >= 0 && y < h && src.get_pixel(x as u32, y as u32).0[0] > 0;

    // Row-major scan means each component is first seen at its
    // topmost-leftmost pixel, the canonical trace start.
    for y in 0..h {
        for x in 0..w {
            if !fg(x, y) || labels[(y * w + x) as usize] != 0 {
                continue;
            }
            next_label += 1;
            let count = flood_label(&mut labels, w, &fg, x, y, next_label);
            contours.push(trace_boundary(&labels, w, h, next_label, x, y, count));
        }
    }
    contours
}

/// 8-connected flood fill; returns the component's pixel count.
fn flood_label(
    labels: &mut [u32],
    w: i64,
    fg: &impl Fn(i64, i64) -> bool,
    x: i64,
    y: i64,
    label: u32,
) -> usize {
    let mut count = 0;
    let mut stack = vec![(x, y)];
    labels[(y * w + x) as usize] = label;
    while let Some((cx, cy)) = stack.pop() {
        count += 1;
        for dy in -1..=1 {
            for dx in -1..=1 {
                let (nx, ny) = (cx + dx, cy + dy);
                if fg(nx, ny) && labels[(ny * w + nx) as usize] == 0 {
                    labels[(ny * w + nx) as usize] = label;
                    stack.push((nx, ny));
                }
            }
        }
    }
    count
}

// Clockwise 8-neighbourhood in image coordinates (y down), starting east.
const DX: [i64; 8] = [1, 1, 0, -1, -1, -1, 0, 1];
const DY: [i64; 8] = [0, 1, 1, 1, 0, -1, -1, -1];

/// Moore neighbour tracing restricted to one labelled component. `sx, sy`
/// is the component's topmost-leftmost pixel.
fn trace_boundary(labels: &[u32], w: i64, h: i64, label: u32, sx: i64, sy: i64, count: usize) -> Contour {
    let on = |x: i64, y: i64| {
        x >= 0 && x < w && y >= 0 && y < h && labels[(y * w + x) as usize] == label
    };

    let mut points = vec![Point::new(sx as i32, sy as i32)];
    let (mut x, mut y) = (sx, sy);
    // The start pixel was reached from the west; resume the clockwise scan
    // one past the backtrack direction. 5 is north-west.
    let mut dir = 5usize;
    // Jacob's stopping criterion: the trace is closed once it leaves the
    // start pixel towards the same neighbour as its very first move.
    let mut first_move = None;
    // Every boundary pixel is visited at most four times; the bound caps a
    // trace that never repeats its first move.
    for _ in 0..count * 4 + 8 {
        let mut next = None;
        for i in 0..8 {
            let d = (dir + i) % 8;
            let (nx, ny) = (x + DX[d], y + DY[d]);
            if on(nx, ny) {
                next = Some((d, nx, ny));
                break;
            }
        }
        let Some((d, nx, ny)) = next else {
            break; // isolated single pixel
        };
        if (x, y) == (sx, sy) {
            match first_move {
                None => first_move = Some((nx, ny)),
                Some(second) if (nx, ny) == second => break,
                Some(_) => {}
            }
        }
        x = nx;
        y = ny;
        dir = (d + 6) % 8;
        points.push(Point::new(x as i32, y as i32));
    }
    // The final arrival back at the start closes the polygon implicitly.
    if points.len() > 1 && points.last() == points.first() {
        points.pop();
    }
    Contour::new(points)
}

/// Keeps only contours whose enclosed area lies within `[minimum, maximum]`.
pub struct SizeFilter;

static FILTER_IN: &[PortDecl] = &[PortDecl::new("contours", ValueKind::ContourSet)];
static FILTER_OUT: &[PortDecl] = &[PortDecl::new("contours", ValueKind::ContourSet)];
static FILTER_PARAMS: &[ParamDecl] = &[
    ParamDecl::float("minimum", 0.0, 1000.0, 0.0),
    ParamDecl::float("maximum", 0.0, 1000.0, 1000.0),
];

impl StageImpl for SizeFilter {
    fn type_name(&self) -> &'static str {
        "size_filter"
    }

    fn inputs(&self) -> &'static [PortDecl] {
        FILTER_IN
    }

    fn outputs(&self) -> &'static [PortDecl] {
        FILTER_OUT
    }

    fn params(&self) -> &'static [ParamDecl] {
        FILTER_PARAMS
    }

    fn compute(&self, params: &ParamSet, inputs: &Inputs<'_>, outputs: &mut Outputs) -> Result<()> {
        let minimum = params.float("minimum")?;
        let maximum = params.float("maximum")?;
        let kept: Vec<Contour> = inputs
            .contours("contours")?
            .iter()
            .filter(|c| {
                let area = c.area();
                area >= minimum && area <= maximum
            })
            .cloned()
            .collect();
        outputs.set("contours", Value::Contours(kept))
    }
}

/// Draws contour outlines over an image. Grayscale inputs are promoted to
/// RGB so the overlay colour survives.
pub struct DrawContours;

static DRAW_IN: &[PortDecl] = &[
    PortDecl::new("image", ValueKind::Image),
    PortDecl::new("contours", ValueKind::ContourSet),
];
static DRAW_OUT: &[PortDecl] = &[PortDecl::new("image", ValueKind::Image)];
static DRAW_PARAMS: &[ParamDecl] = &[
    ParamDecl::color("color", "#ff0000"),
    ParamDecl::int("thickness", 1, 100, 1, 1),
];

impl StageImpl for DrawContours {
    fn type_name(&self) -> &'static str {
        "draw_contours"
    }

    fn inputs(&self) -> &'static [PortDecl] {
        DRAW_IN
    }

    fn outputs(&self) -> &'static [PortDecl] {
        DRAW_OUT
    }

    fn params(&self) -> &'static [ParamDecl] {
        DRAW_PARAMS
    }

    fn compute(&self, params: &ParamSet, inputs: &Inputs<'_>, outputs: &mut Outputs) -> Result<()> {
        let color = params.color("color")?;
        let thickness = params.int("thickness")?;
        let mut canvas = match inputs.image("image")? {
            ImageData::Rgb(img) => img.clone(),
            ImageData::Gray(img) => {
                let mut rgb = RgbImage::new(img.width(), img.height());
                for (src, dst) in img.pixels().zip(rgb.pixels_mut()) {
                    dst.0 = [src.0[0]; 3];
                }
                rgb
            }
        };
        let radius = (thickness / 2) as i64;
        for contour in inputs.contours("contours")? {
            for point in &contour.points {
                stamp(&mut canvas, point.x as i64, point.y as i64, radius, color);
            }
        }
        outputs.set("image", Value::Image(ImageData::Rgb(canvas)))
    }
}

/// Fills a disc of the given radius around a boundary pixel.
fn stamp(canvas: &mut RgbImage, cx: i64, cy: i64, radius: i64, color: [u8; 3]) {
    let (w, h) = (canvas.width() as i64, canvas.height() as i64);
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy > radius * radius {
                continue;
            }
            let (x, y) = (cx + dx, cy + dy);
            if x >= 0 && x < w && y >= 0 && y < h {
                canvas.get_pixel_mut(x as u32, y as u32).0 = color;
            }
        }
    }
}
