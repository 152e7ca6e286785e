use std::io::Cursor;

use image::{ImageFormat, Rgba, RgbaImage};

use super::glyphs::chart_fonts;
use super::layout::{ChartLayout, PixelRect, CANVAS_HEIGHT, CANVAS_WIDTH};
use crate::proposal::error::RenderError;

const GRIDLINE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const GRIDLINE_PX: f32 = 2.0;
const LABEL_COLOR: [u8; 3] = [255, 255, 255];

/// Paints gridlines, stacked bars, legend swatches and then every label on
/// a transparent canvas.
pub fn rasterize(layout: &ChartLayout) -> Result<RgbaImage, RenderError> {
    let fonts = chart_fonts()?;
    let mut canvas = RgbaImage::new(CANVAS_WIDTH, CANVAS_HEIGHT);

    let (left, right) = ChartLayout::gridline_span();
    for tick in &layout.axis.ticks {
        let y = layout.y_to_px(*tick);
        fill_rect(
            &mut canvas,
            PixelRect {
                x: left,
                y: y - GRIDLINE_PX / 2.0,
                width: right - left,
                height: GRIDLINE_PX,
            },
            GRIDLINE,
        );
    }

    for bar in &layout.bars {
        for segment in &bar.segments {
            let [r, g, b] = segment.kind.color();
            fill_rect(
                &mut canvas,
                layout.segment_rect(bar, segment),
                Rgba([r, g, b, 255]),
            );
        }
    }

    for entry in &layout.legend {
        let [r, g, b] = entry.kind.color();
        fill_rect(&mut canvas, entry.swatch, Rgba([r, g, b, 255]));
    }

    for label in &layout.labels {
        fonts.draw_label(&mut canvas, label, LABEL_COLOR);
    }

    Ok(canvas)
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, RenderError> {
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png)?;
    Ok(bytes.into_inner())
}

/// Fills the pixels whose centres fall inside `rect`, clipped to the canvas.
/// Rectangles with negative extents are normalized first.
fn fill_rect(canvas: &mut RgbaImage, rect: PixelRect, color: Rgba<u8>) {
    let (x0, x1) = ordered(rect.x, rect.x + rect.width);
    let (y0, y1) = ordered(rect.y, rect.y + rect.height);

    let clamp = |value: f32, limit: u32| value.round().clamp(0.0, limit as f32) as u32;
    let (left, right) = (clamp(x0, canvas.width()), clamp(x1, canvas.width()));
    let (top, bottom) = (clamp(y0, canvas.height()), clamp(y1, canvas.height()));

    for y in top..bottom {
        for x in left..right {
            canvas.put_pixel(x, y, color);
        }
    }
}

fn ordered(a: f32, b: f32) -> (f32, f32) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
