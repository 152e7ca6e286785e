//! Savings comparison chart: two stacked bars, before and after the solar
//! subscription.
//!
//! The PNG is self-contained: shapes and every [`ChartLabel`] are painted
//! on a transparent background, the text with the bundled DejaVu Sans faces.

mod glyphs;
mod layout;
mod raster;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use image::RgbaImage;
use tracing::{debug, warn};
use uuid::Uuid;

pub use layout::{
    axis_for, segment_label_size, visual_height, Axis, Bar, ChartInput, ChartLabel, ChartLayout,
    HAlign, LegendEntry, PixelRect, Segment, SegmentKind, VAlign, CANVAS_HEIGHT, CANVAS_WIDTH, DPI,
};
pub use raster::{encode_png, rasterize};

use super::error::RenderError;
use super::figures::FinancialFigures;

const TMP_DIR: &str = "tmp";
const STALE_AFTER: Duration = Duration::from_secs(10 * 60);

impl ChartInput {
    pub fn from_figures(figures: &FinancialFigures) -> Self {
        Self {
            pre_discount_total: figures.pre_discount_total,
            post_discount_total: figures.post_discount_total,
            monthly_saving: figures.monthly_saving,
            minimum_consumption_cost: figures.minimum_consumption_cost,
            public_lighting_fee: figures.public_lighting_fee,
            discount_pct: figures.discount_pct,
        }
    }
}

/// A chart drawn in memory.
#[derive(Debug, Clone)]
pub struct ChartDrawing {
    pub layout: ChartLayout,
    pub image: RgbaImage,
}

impl ChartDrawing {
    pub fn draw(input: &ChartInput) -> Result<Self, RenderError> {
        let layout = ChartLayout::compute(input)?;
        let image = rasterize(&layout)?;
        Ok(Self { layout, image })
    }
}

/// A chart persisted under the renderer's directory.
#[derive(Debug, Clone)]
pub struct RenderedChart {
    pub path: PathBuf,
    pub drawing: ChartDrawing,
}

/// Writes each chart under a unique name so concurrent requests never share
/// a file.
#[derive(Debug, Clone)]
pub struct ChartRenderer {
    charts_dir: PathBuf,
    stale_after: Duration,
}

impl ChartRenderer {
    pub fn new(charts_dir: impl Into<PathBuf>) -> Self {
        Self {
            charts_dir: charts_dir.into(),
            stale_after: STALE_AFTER,
        }
    }

    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    pub fn charts_dir(&self) -> &Path {
        &self.charts_dir
    }

    pub fn render(&self, input: &ChartInput) -> Result<RenderedChart, RenderError> {
        let drawing = ChartDrawing::draw(input)?;
        let png = encode_png(&drawing.image)?;

        let tmp_dir = self.charts_dir.join(TMP_DIR);
        fs::create_dir_all(&tmp_dir).map_err(|err| RenderError::io(&tmp_dir, err))?;

        let file_name = format!("chart_{}.png", Uuid::new_v4().simple());
        let tmp_path = tmp_dir.join(&file_name);
        let path = self.charts_dir.join(&file_name);

        fs::write(&tmp_path, &png).map_err(|err| RenderError::io(&tmp_path, err))?;
        if let Err(err) = fs::rename(&tmp_path, &path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(RenderError::io(&path, err));
        }
        debug!(path = %path.display(), bytes = png.len(), "chart written");

        self.sweep_stale(&tmp_dir);
        Ok(RenderedChart { path, drawing })
    }

    /// Deletes a chart whose document was never published. Failures are
    /// logged and ignored.
    pub fn discard(&self, path: &Path) {
        match fs::remove_file(path) {
            Ok(()) => debug!(path = %path.display(), "orphaned chart removed"),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "orphaned chart cleanup failed")
            }
        }
    }

    /// Removes temporaries abandoned by interrupted renders. Failures are
    /// logged and ignored.
    fn sweep_stale(&self, tmp_dir: &Path) {
        let entries = match fs::read_dir(tmp_dir) {
            Ok(entries) => entries,
            Err(err) => {
                debug!(error = %err, "chart temp directory not readable");
                return;
            }
        };

        let now = SystemTime::now();
        for entry in entries.flatten() {
            let path = entry.path();
            let is_chart = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with("chart_") && name.ends_with(".png"));
            if !is_chart {
                continue;
            }

            let age = entry
                .metadata()
                .and_then(|meta| meta.modified())
                .ok()
                .and_then(|modified| now.duration_since(modified).ok());
            if age.is_some_and(|age| age > self.stale_after) {
                match fs::remove_file(&path) {
                    Ok(()) => debug!(path = %path.display(), "removed stale chart temp file"),
                    Err(err) => {
                        warn!(path = %path.display(), error = %err, "stale chart cleanup failed")
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> ChartInput {
        ChartInput {
            pre_discount_total: 439.85,
            post_discount_total: 388.49,
            monthly_saving: 51.36,
            minimum_consumption_cost: 56.90655,
            public_lighting_fee: 61.990508,
            discount_pct: 20.0,
        }
    }

    #[test]
    fn render_writes_a_uniquely_named_png() {
        let dir = tempfile::tempdir().expect("temp dir");
        let renderer = ChartRenderer::new(dir.path());

        let first = renderer.render(&input()).expect("first chart");
        let second = renderer.render(&input()).expect("second chart");

        assert_ne!(first.path, second.path);
        for chart in [&first, &second] {
            let bytes = fs::read(&chart.path).expect("chart readable");
            assert_eq!(&bytes[..4], b"\x89PNG");
            assert_eq!(chart.path.parent(), Some(dir.path()));
        }

        let leftovers = fs::read_dir(dir.path().join(TMP_DIR))
            .expect("tmp dir exists")
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn stale_temporaries_are_swept() {
        let dir = tempfile::tempdir().expect("temp dir");
        let tmp_dir = dir.path().join(TMP_DIR);
        fs::create_dir_all(&tmp_dir).expect("tmp dir");
        let abandoned = tmp_dir.join("chart_abandoned.png");
        let unrelated = tmp_dir.join("notes.txt");
        fs::write(&abandoned, b"partial").expect("abandoned file");
        fs::write(&unrelated, b"keep").expect("unrelated file");

        std::thread::sleep(Duration::from_millis(20));
        ChartRenderer::new(dir.path())
            .with_stale_after(Duration::from_millis(1))
            .render(&input())
            .expect("chart renders");

        assert!(!abandoned.exists());
        assert!(unrelated.exists());
    }

    #[test]
    fn discard_removes_the_rendered_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let renderer = ChartRenderer::new(dir.path());
        let chart = renderer.render(&input()).expect("chart renders");

        renderer.discard(&chart.path);
        assert!(!chart.path.exists());
        renderer.discard(&chart.path);
    }

    #[test]
    fn invalid_input_writes_nothing() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut bad = input();
        bad.pre_discount_total = f64::INFINITY;

        let err = ChartRenderer::new(dir.path())
            .render(&bad)
            .expect_err("non-finite total rejected");
        assert!(matches!(err, RenderError::Chart(_)));
        assert_eq!(fs::read_dir(dir.path()).expect("dir readable").count(), 0);
    }
}
