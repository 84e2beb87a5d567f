//! Colour space conversion.

use image::GrayImage;

use crate::error::Result;
use crate::graph::{ImageData, Inputs, Outputs, ParamSet, PortDecl, StageImpl, Value, ValueKind};

/// RGB to single-channel luma conversion using the BT.601 weights
/// (0.299, 0.587, 0.114). Grayscale input passes through unchanged.
pub struct Grayscale;

static GRAYSCALE_IN: &[PortDecl] = &[PortDecl::new("image", ValueKind::Image)];
static GRAYSCALE_OUT: &[PortDecl] = &[PortDecl::new("image", ValueKind::Image)];

impl StageImpl for Grayscale {
    fn type_name(&self) -> &'static str {
        "grayscale"
    }

    fn inputs(&self) -> &'static [PortDecl] {
        GRAYSCALE_IN
    }

    fn outputs(&self) -> &'static [PortDecl] {
        GRAYSCALE_OUT
    }

    fn compute(&self, _params: &ParamSet, inputs: &Inputs<'_>, outputs: &mut Outputs) -> Result<()> {
        let gray = match inputs.image("image")? {
            ImageData::Gray(img) => img.clone(),
            ImageData::Rgb(img) => {
                let mut out = GrayImage::new(img.width(), img.height());
                for (src, dst) in img.pixels().zip(out.pixels_mut()) {
                    let [r, g, b] = src.0;
                    let luma =
                        0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b);
                    dst.0 = [luma.round() as u8];
                }
                out
            }
        };
        outputs.set("image", Value::Image(ImageData::Gray(gray)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn luma_weights_match_reference_values() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, image::Rgb([255, 255, 255]));
        img.put_pixel(1, 0, image::Rgb([255, 0, 0]));
        let stage = Grayscale;
        let params = ParamSet::from_decls(stage.params());
        let value = Value::Image(ImageData::Rgb(img));
        let inputs = Inputs::new(GRAYSCALE_IN, vec![&value]);
        let mut outputs = Outputs::new(GRAYSCALE_OUT);
        stage.compute(&params, &inputs, &mut outputs).unwrap();
        let out = outputs.into_values().remove(0).unwrap();
        let Value::Image(ImageData::Gray(gray)) = out else {
            panic!("expected grayscale image");
        };
        assert_eq!(gray.get_pixel(0, 0).0, [255]);
        assert_eq!(gray.get_pixel(1, 0).0, [76]); // 0.299 * 255
    }
}
