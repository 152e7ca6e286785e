use super::glyphs::{chart_fonts, ChartFonts};
use crate::proposal::error::RenderError;
use crate::proposal::format;
use crate::proposal::text::FontFace;

pub const CANVAS_WIDTH: u32 = 1000;
pub const CANVAS_HEIGHT: u32 = 850;
/// Pixels per inch; text sizes are kept in points.
pub const DPI: f32 = 100.0;

const PLOT_LEFT: f32 = 220.0;
const PLOT_RIGHT: f32 = 960.0;
const PLOT_TOP: f32 = 150.0;
const PLOT_BOTTOM: f32 = 640.0;

const BAR_CENTERS: [f64; 2] = [0.3, 0.7];
const BAR_WIDTH: f64 = 0.25;
const VISUAL_FLOOR_RATIO: f64 = 0.05;

const TICK_LABEL_X: f64 = -0.03;
const AXIS_FONT_PT: f32 = 18.0;
const CATEGORY_GAP_PX: f32 = 8.0;
const CATEGORY_ROW_PX: f32 = 34.0;
const TOTAL_DROP_RATIO: f32 = 0.07;
const TITLE_FONT_PT: f32 = 24.0;
const CALLOUT_FONT_PT: f32 = 28.0;
const TITLE_LINE_CENTERS: [f32; 2] = [86.0, 122.0];
const LEGEND_FONT_PT: f32 = 14.0;
const LEGEND_TOP: f32 = 760.0;
const LEGEND_ROW_PX: f32 = 34.0;
const LEGEND_COLUMN_X: [f32; 2] = [250.0, 610.0];
const LEGEND_SWATCH_PX: f32 = 22.0;
const LEGEND_TEXT_GAP_PX: f32 = 10.0;

const CATEGORIES: [&str; 2] = ["SEM Geração Solar:", "COM Geração Solar:"];

/// Values the comparison chart is drawn from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartInput {
    pub pre_discount_total: f64,
    pub post_discount_total: f64,
    pub monthly_saving: f64,
    pub minimum_consumption_cost: f64,
    pub public_lighting_fee: f64,
    pub discount_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    PublicLighting,
    MinimumConsumption,
    CompensableEnergy,
    DiscountedGeneration,
}

impl SegmentKind {
    pub const fn legend_order() -> [Self; 4] {
        [
            Self::PublicLighting,
            Self::MinimumConsumption,
            Self::CompensableEnergy,
            Self::DiscountedGeneration,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::PublicLighting => "Iluminação Pública",
            Self::MinimumConsumption => "Consumo Mínimo",
            Self::CompensableEnergy => "Consumo Compensável",
            Self::DiscountedGeneration => "Cons. Comp. c/ Deságio",
        }
    }

    pub const fn color(self) -> [u8; 3] {
        match self {
            Self::PublicLighting => [0xfc, 0x88, 0x00],
            Self::MinimumConsumption => [0xf4, 0xc4, 0x30],
            Self::CompensableEnergy => [0xd1, 0x1d, 0x05],
            Self::DiscountedGeneration => [0x00, 0xb0, 0x50],
        }
    }
}

/// One stacked block. `value` is the true amount; the visual fields are in
/// data units and may differ from it because of the visibility floor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub value: f64,
    pub visual_bottom: f64,
    pub visual_height: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub category: &'static str,
    pub center: f64,
    pub total: f64,
    pub segments: Vec<Segment>,
}

impl Bar {
    /// Height of the drawn stack; equals `total` after compensation.
    pub fn visual_total(&self) -> f64 {
        self.segments.iter().map(|segment| segment.visual_height).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    pub ceiling: f64,
    pub ticks: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VAlign {
    Top,
    Middle,
}

/// Text rasterized onto the chart, in canvas pixels (origin top left).
#[derive(Debug, Clone, PartialEq)]
pub struct ChartLabel {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub size_pt: f32,
    pub face: FontFace,
    pub h_align: HAlign,
    pub v_align: VAlign,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegendEntry {
    pub kind: SegmentKind,
    pub swatch: PixelRect,
}

/// Full chart geometry, shapes and text alike, in canvas pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartLayout {
    pub axis: Axis,
    pub bars: [Bar; 2],
    pub labels: Vec<ChartLabel>,
    pub legend: Vec<LegendEntry>,
}

impl ChartLayout {
    pub fn compute(input: &ChartInput) -> Result<Self, RenderError> {
        let values = [
            ("pre_discount_total", input.pre_discount_total),
            ("post_discount_total", input.post_discount_total),
            ("minimum_consumption_cost", input.minimum_consumption_cost),
            ("public_lighting_fee", input.public_lighting_fee),
            ("discount_pct", input.discount_pct),
        ];
        if let Some((field, _)) = values.iter().find(|(_, value)| !value.is_finite()) {
            return Err(RenderError::Chart(format!("{field} is not finite")));
        }

        let reference = input.pre_discount_total.max(input.post_discount_total);
        if reference <= 0.0 {
            return Err(RenderError::Chart(format!(
                "bar totals must be positive (largest is {reference})"
            )));
        }

        let axis = axis_for(reference);
        let bars = [
            stack_bar(
                CATEGORIES[0],
                BAR_CENTERS[0],
                input.pre_discount_total,
                input,
                SegmentKind::CompensableEnergy,
                reference,
            ),
            stack_bar(
                CATEGORIES[1],
                BAR_CENTERS[1],
                input.post_discount_total,
                input,
                SegmentKind::DiscountedGeneration,
                reference,
            ),
        ];

        let mut layout = Self {
            axis,
            bars,
            labels: Vec::new(),
            legend: Vec::new(),
        };
        layout.labels = layout.build_labels(chart_fonts()?, input.discount_pct);
        layout.legend = legend_entries();
        Ok(layout)
    }

    pub fn x_to_px(x: f64) -> f32 {
        PLOT_LEFT + x as f32 * (PLOT_RIGHT - PLOT_LEFT)
    }

    pub fn y_to_px(&self, value: f64) -> f32 {
        PLOT_BOTTOM - (value / self.axis.ceiling) as f32 * (PLOT_BOTTOM - PLOT_TOP)
    }

    /// Gridline span in pixels: `(left, right)`.
    pub fn gridline_span() -> (f32, f32) {
        (Self::x_to_px(0.0), Self::x_to_px(1.0))
    }

    /// Pixel rectangle of a segment. Negative visual heights come back with
    /// a negative `height`; painters normalize them.
    pub fn segment_rect(&self, bar: &Bar, segment: &Segment) -> PixelRect {
        let left = Self::x_to_px(bar.center - BAR_WIDTH / 2.0);
        let right = Self::x_to_px(bar.center + BAR_WIDTH / 2.0);
        let bottom = self.y_to_px(segment.visual_bottom);
        let top = self.y_to_px(segment.visual_bottom + segment.visual_height);
        PixelRect {
            x: left,
            y: top,
            width: right - left,
            height: bottom - top,
        }
    }

    fn build_labels(&self, fonts: &ChartFonts, discount_pct: f64) -> Vec<ChartLabel> {
        let mut labels = Vec::new();

        let tick_x = Self::x_to_px(TICK_LABEL_X);
        for tick in &self.axis.ticks {
            labels.push(ChartLabel {
                text: format!("R$ {}", format::currency(tick.trunc())),
                x: tick_x,
                y: self.y_to_px(*tick),
                size_pt: AXIS_FONT_PT,
                face: FontFace::Regular,
                h_align: HAlign::Right,
                v_align: VAlign::Middle,
            });
        }

        let plot_height = PLOT_BOTTOM - PLOT_TOP;
        for bar in &self.bars {
            let x = Self::x_to_px(bar.center);

            for segment in bar.segments.iter().filter(|segment| segment.value > 0.0) {
                labels.push(ChartLabel {
                    text: format!("R$ {}", format::currency(segment.value)),
                    x,
                    y: self.y_to_px(segment.visual_bottom + segment.visual_height / 2.0),
                    size_pt: segment_label_size(segment.value),
                    face: FontFace::Bold,
                    h_align: HAlign::Center,
                    v_align: VAlign::Middle,
                });
            }

            labels.push(ChartLabel {
                text: bar.category.to_string(),
                x,
                y: PLOT_BOTTOM + CATEGORY_GAP_PX,
                size_pt: AXIS_FONT_PT,
                face: FontFace::Regular,
                h_align: HAlign::Center,
                v_align: VAlign::Top,
            });

            labels.push(ChartLabel {
                text: format!("R$ {}", format::currency(bar.total)),
                x,
                y: PLOT_BOTTOM + CATEGORY_ROW_PX + plot_height * TOTAL_DROP_RATIO,
                size_pt: AXIS_FONT_PT,
                face: FontFace::Regular,
                h_align: HAlign::Center,
                v_align: VAlign::Top,
            });
        }

        labels.extend(title_labels(fonts, discount_pct));

        for entry in legend_entries() {
            labels.push(ChartLabel {
                text: entry.kind.label().to_string(),
                x: entry.swatch.x + entry.swatch.width + LEGEND_TEXT_GAP_PX,
                y: entry.swatch.y + entry.swatch.height / 2.0,
                size_pt: LEGEND_FONT_PT,
                face: FontFace::Regular,
                h_align: HAlign::Left,
                v_align: VAlign::Middle,
            });
        }

        labels
    }
}

/// Axis ceiling and tick positions for the larger of the two bars.
pub fn axis_for(max_value: f64) -> Axis {
    if max_value < 300.0 {
        let ceiling = (max_value / 50.0).ceil() * 50.0;
        let steps = (ceiling / 50.0) as usize;
        return Axis {
            ceiling,
            ticks: (0..=steps).map(|step| step as f64 * 50.0).collect(),
        };
    }

    if max_value < 400.0 {
        return Axis {
            ceiling: 400.0,
            ticks: vec![0.0, 66.50, 133.00, 200.50, 267.00, 333.50, 400.00],
        };
    }

    if max_value < 600.0 {
        return Axis {
            ceiling: 600.0,
            ticks: (0..=6).map(|step| f64::from(step) * 100.0).collect(),
        };
    }

    let ceiling = (max_value / 100.0).ceil() * 100.0;
    let interval = ceiling / 6.0;
    Axis {
        ceiling,
        ticks: (0..=6).map(|step| f64::from(step) * interval).collect(),
    }
}

/// Draw height for a segment: small non-zero values are raised to 5 % of
/// the reference so they stay visible and labelled.
pub fn visual_height(value: f64, reference: f64) -> f64 {
    if value == 0.0 {
        return 0.0;
    }
    let floor = reference * VISUAL_FLOOR_RATIO;
    if value < floor {
        floor
    } else {
        value
    }
}

pub fn segment_label_size(value: f64) -> f32 {
    if value > 99_999.0 {
        16.0
    } else if value > 9_999.0 {
        17.0
    } else {
        18.0
    }
}

/// Stacks lighting fee, minimum consumption and `top_kind` from the bottom.
/// The top segment gives back whatever the floor added below it.
fn stack_bar(
    category: &'static str,
    center: f64,
    total: f64,
    input: &ChartInput,
    top_kind: SegmentKind,
    reference: f64,
) -> Bar {
    let fee = input.public_lighting_fee;
    let minimum = input.minimum_consumption_cost;
    let top = total - minimum - fee;

    let fee_visual = visual_height(fee, reference);
    let minimum_visual = visual_height(minimum, reference);
    let adjustment = (fee_visual - fee) + (minimum_visual - minimum);
    let top_visual = top - adjustment;

    Bar {
        category,
        center,
        total,
        segments: vec![
            Segment {
                kind: SegmentKind::PublicLighting,
                value: fee,
                visual_bottom: 0.0,
                visual_height: fee_visual,
            },
            Segment {
                kind: SegmentKind::MinimumConsumption,
                value: minimum,
                visual_bottom: fee_visual,
                visual_height: minimum_visual,
            },
            Segment {
                kind: top_kind,
                value: top,
                visual_bottom: fee_visual + minimum_visual,
                visual_height: top_visual,
            },
        ],
    }
}

fn title_labels(fonts: &ChartFonts, discount_pct: f64) -> Vec<ChartLabel> {
    let center = (PLOT_LEFT + PLOT_RIGHT) / 2.0;
    let runs = [
        ("Economia de ".to_string(), FontFace::Regular, TITLE_FONT_PT),
        (
            format!("{}%", discount_pct.trunc() as i64),
            FontFace::Bold,
            CALLOUT_FONT_PT,
        ),
        (
            " na energia solar injetada".to_string(),
            FontFace::Regular,
            TITLE_FONT_PT,
        ),
    ];

    let line_width: f32 = runs
        .iter()
        .map(|(text, face, size)| fonts.width_px(*face, text, *size))
        .sum();
    let mut x = center - line_width / 2.0;

    let mut labels = Vec::with_capacity(runs.len() + 1);
    for (text, face, size) in runs {
        let width = fonts.width_px(face, &text, size);
        labels.push(ChartLabel {
            text,
            x,
            y: TITLE_LINE_CENTERS[0],
            size_pt: size,
            face,
            h_align: HAlign::Left,
            v_align: VAlign::Middle,
        });
        x += width;
    }

    labels.push(ChartLabel {
        text: "e compensada, ao longo do Contrato.".to_string(),
        x: center,
        y: TITLE_LINE_CENTERS[1],
        size_pt: TITLE_FONT_PT,
        face: FontFace::Regular,
        h_align: HAlign::Center,
        v_align: VAlign::Middle,
    });
    labels
}

/// Two columns filled top to bottom, like the plotting library the layout
/// was tuned against.
fn legend_entries() -> Vec<LegendEntry> {
    SegmentKind::legend_order()
        .into_iter()
        .enumerate()
        .map(|(index, kind)| {
            let column = index / 2;
            let row = index % 2;
            LegendEntry {
                kind,
                swatch: PixelRect {
                    x: LEGEND_COLUMN_X[column],
                    y: LEGEND_TOP + row as f32 * LEGEND_ROW_PX,
                    width: LEGEND_SWATCH_PX,
                    height: LEGEND_SWATCH_PX,
                },
            }
        })
        .collect()
}
