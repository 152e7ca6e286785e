use std::sync::OnceLock;

use image::{Rgba, RgbaImage};
use rusttype::{point, Font, Scale};

use super::layout::{ChartLabel, HAlign, VAlign, DPI};
use crate::proposal::error::RenderError;
use crate::proposal::text::FontFace;

static REGULAR_TTF: &[u8] = include_bytes!("../../../assets/fonts/DejaVuSans.ttf");
static BOLD_TTF: &[u8] = include_bytes!("../../../assets/fonts/DejaVuSans-Bold.ttf");

static FONTS: OnceLock<Option<ChartFonts>> = OnceLock::new();

/// The faces chart labels are measured and rasterized with.
pub struct ChartFonts {
    regular: Font<'static>,
    bold: Font<'static>,
}

impl std::fmt::Debug for ChartFonts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChartFonts").finish_non_exhaustive()
    }
}

/// Parses the bundled faces once per process.
pub fn chart_fonts() -> Result<&'static ChartFonts, RenderError> {
    FONTS
        .get_or_init(load_fonts)
        .as_ref()
        .ok_or_else(|| RenderError::Chart("bundled chart font could not be parsed".to_string()))
}

fn load_fonts() -> Option<ChartFonts> {
    Some(ChartFonts {
        regular: Font::try_from_bytes(REGULAR_TTF)?,
        bold: Font::try_from_bytes(BOLD_TTF)?,
    })
}

impl ChartFonts {
    fn face(&self, face: FontFace) -> &Font<'static> {
        match face {
            FontFace::Regular => &self.regular,
            FontFace::Bold => &self.bold,
        }
    }

    /// Advance width of `text` in canvas pixels.
    pub fn width_px(&self, face: FontFace, text: &str, size_pt: f32) -> f32 {
        let font = self.face(face);
        let scale = scale_for(font, size_pt);
        font.layout(text, scale, point(0.0, 0.0))
            .last()
            .map(|glyph| glyph.position().x + glyph.unpositioned().h_metrics().advance_width)
            .unwrap_or(0.0)
    }

    /// Blends the anti-aliased glyphs of `label` onto `canvas` in `color`.
    pub fn draw_label(&self, canvas: &mut RgbaImage, label: &ChartLabel, color: [u8; 3]) {
        let font = self.face(label.face);
        let scale = scale_for(font, label.size_pt);
        let metrics = font.v_metrics(scale);

        let width = self.width_px(label.face, &label.text, label.size_pt);
        let left = match label.h_align {
            HAlign::Left => label.x,
            HAlign::Center => label.x - width / 2.0,
            HAlign::Right => label.x - width,
        };
        let baseline = match label.v_align {
            VAlign::Top => label.y + metrics.ascent,
            VAlign::Middle => label.y + (metrics.ascent + metrics.descent) / 2.0,
        };

        let (canvas_width, canvas_height) = canvas.dimensions();
        for glyph in font.layout(&label.text, scale, point(left, baseline)) {
            let Some(bounds) = glyph.pixel_bounding_box() else {
                continue;
            };
            glyph.draw(|gx, gy, coverage| {
                let x = bounds.min.x + gx as i32;
                let y = bounds.min.y + gy as i32;
                if x < 0 || y < 0 || x as u32 >= canvas_width || y as u32 >= canvas_height {
                    return;
                }
                let pixel = canvas.get_pixel_mut(x as u32, y as u32);
                *pixel = blend(*pixel, color, coverage);
            });
        }
    }
}

/// Text sizes are em heights in points; rusttype scales by ascent minus
/// descent.
fn scale_for(font: &Font<'_>, size_pt: f32) -> Scale {
    let em_px = size_pt * DPI / 72.0;
    let metrics = font.v_metrics_unscaled();
    let units_per_em = f32::from(font.units_per_em());
    Scale::uniform(em_px * (metrics.ascent - metrics.descent) / units_per_em)
}

/// Source-over compositing of an opaque colour at `coverage`.
fn blend(under: Rgba<u8>, color: [u8; 3], coverage: f32) -> Rgba<u8> {
    let top = coverage.clamp(0.0, 1.0);
    if top == 0.0 {
        return under;
    }
    let under_alpha = f32::from(under[3]) / 255.0;
    let alpha = top + under_alpha * (1.0 - top);
    let channel = |index: usize| {
        let value = (f32::from(color[index]) * top
            + f32::from(under[index]) * under_alpha * (1.0 - top))
            / alpha;
        value.round().clamp(0.0, 255.0) as u8
    };
    Rgba([
        channel(0),
        channel(1),
        channel(2),
        (alpha * 255.0).round() as u8,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_faces_parse_and_bold_runs_wider() {
        let fonts = chart_fonts().expect("fonts load");
        let regular = fonts.width_px(FontFace::Regular, "R$ 550,75", 18.0);
        let bold = fonts.width_px(FontFace::Bold, "R$ 550,75", 18.0);

        assert!(regular > 0.0);
        assert!(bold > regular);
        assert_eq!(fonts.width_px(FontFace::Regular, "", 18.0), 0.0);
    }

    #[test]
    fn width_scales_with_point_size() {
        let fonts = chart_fonts().expect("fonts load");
        let small = fonts.width_px(FontFace::Regular, "Geração", 12.0);
        let large = fonts.width_px(FontFace::Regular, "Geração", 24.0);
        assert!((large - 2.0 * small).abs() < 1.0);
    }

    #[test]
    fn blending_keeps_full_coverage_opaque() {
        let red = Rgba([209, 29, 5, 255]);
        assert_eq!(blend(red, [255, 255, 255], 1.0), Rgba([255, 255, 255, 255]));
        assert_eq!(blend(red, [255, 255, 255], 0.0), red);

        let clear = Rgba([0, 0, 0, 0]);
        let half = blend(clear, [255, 255, 255], 0.5);
        assert_eq!(half, Rgba([255, 255, 255, 128]));
    }

    #[test]
    fn labels_are_clipped_to_the_canvas() {
        let fonts = chart_fonts().expect("fonts load");
        let mut canvas = RgbaImage::new(40, 20);
        let label = ChartLabel {
            text: "Economia".to_string(),
            x: 30.0,
            y: 10.0,
            size_pt: 18.0,
            face: FontFace::Bold,
            h_align: HAlign::Left,
            v_align: VAlign::Middle,
        };
        fonts.draw_label(&mut canvas, &label, [255, 255, 255]);
        assert!(canvas.pixels().any(|pixel| pixel[3] > 0));
        assert_eq!(canvas.get_pixel(0, 10)[3], 0);
    }
}
