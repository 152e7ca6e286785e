use image::RgbaImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

use crate::proposal::error::RenderError;
use crate::proposal::text::{encode_win_ansi, text_width, FontFace};

/// 8-bit RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub const fn hex(value: u32) -> Self {
        Self([(value >> 16) as u8, (value >> 8) as u8, value as u8])
    }

    fn operands(self) -> Vec<Object> {
        self.0
            .iter()
            .map(|channel| (f32::from(*channel) / 255.0).into())
            .collect()
    }

    /// Linear blend, `t` in `0.0..=1.0`.
    pub fn mix(self, other: Self, t: f32) -> [f32; 3] {
        let mut out = [0.0; 3];
        for (index, slot) in out.iter_mut().enumerate() {
            let from = f32::from(self.0[index]) / 255.0;
            let to = f32::from(other.0[index]) / 255.0;
            *slot = from * (1.0 - t) + to * t;
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

/// Content-stream builder for a single page. Coordinates are PDF points
/// with the origin at the bottom left.
#[derive(Debug)]
pub struct PageCanvas {
    operations: Vec<Operation>,
    horizontal_scale: f32,
}

impl Default for PageCanvas {
    fn default() -> Self {
        Self::new()
    }
}

impl PageCanvas {
    pub fn new() -> Self {
        Self {
            operations: Vec::new(),
            horizontal_scale: 100.0,
        }
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn encode(self) -> Result<Vec<u8>, RenderError> {
        Ok(Content {
            operations: self.operations,
        }
        .encode()?)
    }

    /// Horizontal text scaling in percent, applied to every text drawn
    /// until changed.
    pub fn set_horizontal_scale(&mut self, percent: f32) {
        self.horizontal_scale = percent;
    }

    pub fn set_fill(&mut self, color: Rgb) {
        self.push("rg", color.operands());
    }

    pub fn set_fill_components(&mut self, [r, g, b]: [f32; 3]) {
        self.push("rg", vec![r.into(), g.into(), b.into()]);
    }

    pub fn set_stroke(&mut self, color: Rgb) {
        self.push("RG", color.operands());
    }

    pub fn set_line_width(&mut self, width: f32) {
        self.push("w", vec![width.into()]);
    }

    pub fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.push(
            "re",
            vec![x.into(), y.into(), width.into(), height.into()],
        );
        self.push("f", vec![]);
    }

    pub fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        self.push("m", vec![x1.into(), y1.into()]);
        self.push("l", vec![x2.into(), y2.into()]);
        self.push("S", vec![]);
    }

    /// Stroked rectangle with circular corners drawn as Bézier arcs.
    pub fn stroke_round_rect(&mut self, x: f32, y: f32, width: f32, height: f32, radius: f32) {
        const KAPPA: f32 = 0.552_284_8;
        let r = radius.min(width / 2.0).min(height / 2.0);
        let k = r * KAPPA;
        let (right, top) = (x + width, y + height);

        self.push("m", vec![(x + r).into(), y.into()]);
        self.push("l", vec![(right - r).into(), y.into()]);
        self.curve([right - r + k, y], [right, y + r - k], [right, y + r]);
        self.push("l", vec![right.into(), (top - r).into()]);
        self.curve([right, top - r + k], [right - r + k, top], [right - r, top]);
        self.push("l", vec![(x + r).into(), top.into()]);
        self.curve([x + r - k, top], [x, top - r + k], [x, top - r]);
        self.push("l", vec![x.into(), (y + r).into()]);
        self.curve([x, y + r - k], [x + r - k, y], [x + r, y]);
        self.push("S", vec![]);
    }

    fn curve(&mut self, c1: [f32; 2], c2: [f32; 2], end: [f32; 2]) {
        self.push(
            "c",
            vec![
                c1[0].into(),
                c1[1].into(),
                c2[0].into(),
                c2[1].into(),
                end[0].into(),
                end[1].into(),
            ],
        );
    }

    /// Width of `text` once the current horizontal scale is applied.
    pub fn measure(&self, face: FontFace, text: &str, size: f32) -> f32 {
        text_width(face, text, size) * self.horizontal_scale / 100.0
    }

    /// Draws `text` with its baseline at `y`; `x` is the anchor for `align`.
    /// Returns the advance width.
    pub fn text(
        &mut self,
        align: Align,
        x: f32,
        y: f32,
        face: FontFace,
        size: f32,
        text: &str,
    ) -> f32 {
        let width = self.measure(face, text, size);
        let start = match align {
            Align::Left => x,
            Align::Center => x - width / 2.0,
            Align::Right => x - width,
        };

        self.push("BT", vec![]);
        self.push("Tf", vec![face.resource_name().into(), size.into()]);
        if self.horizontal_scale != 100.0 {
            self.push("Tz", vec![self.horizontal_scale.into()]);
        }
        self.push("Td", vec![start.into(), y.into()]);
        self.push("Tj", vec![Object::string_literal(encode_win_ansi(text))]);
        self.push("ET", vec![]);
        width
    }

    /// Paints a registered image XObject into the given box.
    pub fn image(&mut self, name: &str, x: f32, y: f32, width: f32, height: f32) {
        self.push("q", vec![]);
        self.push(
            "cm",
            vec![
                width.into(),
                0.into(),
                0.into(),
                height.into(),
                x.into(),
                y.into(),
            ],
        );
        self.push("Do", vec![Object::Name(name.as_bytes().to_vec())]);
        self.push("Q", vec![]);
    }

    fn push(&mut self, operator: &str, operands: Vec<Object>) {
        self.operations.push(Operation::new(operator, operands));
    }
}

/// Adds `image` as an RGB XObject with its alpha channel as a soft mask.
pub fn add_image_xobject(doc: &mut Document, image: &RgbaImage) -> ObjectId {
    let (width, height) = image.dimensions();
    let pixels = image.as_raw();

    let mut rgb = Vec::with_capacity(pixels.len() / 4 * 3);
    let mut alpha = Vec::with_capacity(pixels.len() / 4);
    for pixel in pixels.chunks_exact(4) {
        rgb.extend_from_slice(&pixel[..3]);
        alpha.push(pixel[3]);
    }

    let mask_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(width),
            "Height" => i64::from(height),
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
        },
        alpha,
    ));

    doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(width),
            "Height" => i64::from(height),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "SMask" => mask_id,
        },
        rgb,
    ))
}

/// Largest box with the image's aspect ratio that fits in the target,
/// centred in it: `(x, y, width, height)`.
pub fn fit_centered(
    image_width: u32,
    image_height: u32,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
) -> (f32, f32, f32, f32) {
    let scale = (width / image_width as f32).min(height / image_height as f32);
    let fitted_width = image_width as f32 * scale;
    let fitted_height = image_height as f32 * scale;
    (
        x + (width - fitted_width) / 2.0,
        y + (height - fitted_height) / 2.0,
        fitted_width,
        fitted_height,
    )
}
