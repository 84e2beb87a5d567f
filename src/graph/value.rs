//! Typed payloads flowing through ports.
//!
//! Every port carries one [`ValueKind`]; edges may only join ports of equal
//! kind, so the payload enum never has to be re-checked downstream of a
//! validated graph.

use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of data a port carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Image,
    ContourSet,
    Scalar,
    Record,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Image => "Image",
            ValueKind::ContourSet => "ContourSet",
            ValueKind::Scalar => "Scalar",
            ValueKind::Record => "Record",
        };
        f.write_str(name)
    }
}

/// An image payload. Stages that only operate on one channel layout check
/// the variant at compute time and report a compute error otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageData {
    Gray(GrayImage),
    Rgb(RgbImage),
}

impl ImageData {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            ImageData::Gray(img) => img.dimensions(),
            ImageData::Rgb(img) => img.dimensions(),
        }
    }

    pub fn width(&self) -> u32 {
        self.dimensions().0
    }

    pub fn height(&self) -> u32 {
        self.dimensions().1
    }
}

/// A single contour point in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A traced external boundary of one connected foreground region.
///
/// Points are the centres of the boundary pixels, in trace order. Area and
/// centroid are polygon (shoelace) quantities, so a ring-shaped region
/// reports the area it encloses, holes included.
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    pub points: Vec<Point>,
}

impl Contour {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Enclosed area of the boundary polygon (absolute shoelace sum).
    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    fn signed_area(&self) -> f64 {
        if self.points.len() < 3 {
            return 0.0;
        }
        let mut sum = 0.0;
        for (a, b) in self.segments() {
            sum += (a.x as f64) * (b.y as f64) - (b.x as f64) * (a.y as f64);
        }
        sum / 2.0
    }

    /// Polygon centroid. `None` when the contour encloses no area.
    pub fn centroid(&self) -> Option<(f64, f64)> {
        let area = self.signed_area();
        if area.abs() < f64::EPSILON {
            return None;
        }
        let mut cx = 0.0;
        let mut cy = 0.0;
        for (a, b) in self.segments() {
            let cross = (a.x as f64) * (b.y as f64) - (b.x as f64) * (a.y as f64);
            cx += (a.x as f64 + b.x as f64) * cross;
            cy += (a.y as f64 + b.y as f64) * cross;
        }
        Some((cx / (6.0 * area), cy / (6.0 * area)))
    }

    fn segments(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }
}

/// One extracted object, as written to the data output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub x: f64,
    pub y: f64,
    pub area: f64,
}

impl FeatureRecord {
    /// Column order for tabular sinks.
    pub const FIELDS: &'static [&'static str] = &["x", "y", "area"];
}

/// A value held by a port.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Image(ImageData),
    Contours(Vec<Contour>),
    Scalar(f64),
    Records(Vec<FeatureRecord>),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Image(_) => ValueKind::Image,
            Value::Contours(_) => ValueKind::ContourSet,
            Value::Scalar(_) => ValueKind::Scalar,
            Value::Records(_) => ValueKind::Record,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect_contour(x0: i32, y0: i32, x1: i32, y1: i32) -> Contour {
        // Axis-aligned rectangle through pixel centres, traced clockwise in
        // image coordinates (y grows downward).
        Contour::new(vec![
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ])
    }

    #[test]
    fn rectangle_area_is_width_times_height() {
        let c = rect_contour(10, 10, 29, 29);
        assert_eq!(c.area(), 361.0); // 19 * 19
    }

    #[test]
    fn rectangle_centroid_is_centre() {
        let c = rect_contour(10, 10, 29, 29);
        let (cx, cy) = c.centroid().unwrap();
        assert!((cx - 19.5).abs() < 1e-9);
        assert!((cy - 19.5).abs() < 1e-9);
    }

    #[test]
    fn degenerate_contour_has_no_centroid() {
        let c = Contour::new(vec![Point::new(5, 5)]);
        assert_eq!(c.area(), 0.0);
        assert!(c.centroid().is_none());
    }

    #[test]
    fn value_kind_matches_variant() {
        assert_eq!(Value::Scalar(1.0).kind(), ValueKind::Scalar);
        assert_eq!(Value::Contours(Vec::new()).kind(), ValueKind::ContourSet);
    }
}
