//! Single-page A4 proposal assembled with `lopdf`.

mod canvas;
mod page;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use image::RgbaImage;
use lopdf::{dictionary, Dictionary, Document, Object, Stream};
use tracing::debug;
use uuid::Uuid;

pub use canvas::{add_image_xobject, fit_centered, Align, PageCanvas, Rgb};
pub use page::{
    draw_page, invoice_tables, savings_value_size, Amount, InvoiceRow, InvoiceTable, PageSpec,
    UnitPriceHeader, BACKGROUND_XOBJECT, CHART_XOBJECT, PAGE_HEIGHT, PAGE_WIDTH,
};

use super::chart::ChartDrawing;
use super::domain::DerivedParameters;
use super::error::RenderError;
use super::figures::FinancialFigures;
use super::format;
use super::text::{encode_win_ansi, FontFace};

/// Artwork drawn under the page content when present in the assets
/// directory.
pub const BACKGROUND_TEMPLATE: &str = "modelo-SEM-texto.png";

const DOCUMENT_TITLE: &str = "Proposta de Energia Solar por Assinatura";
const PRODUCER: &str = concat!("solar-proposal ", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy)]
pub struct DocumentInput<'a> {
    pub parameters: &'a DerivedParameters,
    pub figures: &'a FinancialFigures,
    pub chart: &'a ChartDrawing,
    pub issued_on: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct DocumentRenderer {
    output_dir: PathBuf,
    background_path: PathBuf,
}

impl DocumentRenderer {
    pub fn new(output_dir: impl Into<PathBuf>, assets_dir: impl AsRef<Path>) -> Self {
        Self {
            output_dir: output_dir.into(),
            background_path: assets_dir.as_ref().join(BACKGROUND_TEMPLATE),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Builds the PDF in memory.
    pub fn compose(&self, input: &DocumentInput<'_>) -> Result<Vec<u8>, RenderError> {
        let background = self.load_background()?;

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut fonts = Dictionary::new();
        for face in [FontFace::Regular, FontFace::Bold] {
            let font_id = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => face.base_font(),
                "Encoding" => "WinAnsiEncoding",
            });
            fonts.set(face.resource_name(), font_id);
        }

        let mut xobjects = Dictionary::new();
        let chart_image = &input.chart.image;
        xobjects.set(CHART_XOBJECT, add_image_xobject(&mut doc, chart_image));
        if let Some(image) = &background {
            xobjects.set(BACKGROUND_XOBJECT, add_image_xobject(&mut doc, image));
        }

        let mut canvas = PageCanvas::new();
        draw_page(
            &mut canvas,
            &PageSpec {
                parameters: input.parameters,
                figures: input.figures,
                chart_size: chart_image.dimensions(),
                background_size: background.as_ref().map(RgbaImage::dimensions),
                issued_on: input.issued_on,
            },
        );
        let content_id = doc.add_object(Stream::new(dictionary! {}, canvas.encode()?));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => fonts,
                "XObject" => xobjects,
            },
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal(DOCUMENT_TITLE),
            "Subject" => Object::string_literal(encode_win_ansi(&input.parameters.name)),
            "Producer" => Object::string_literal(PRODUCER),
            "CreationDate" => Object::string_literal(
                input.issued_on.format("D:%Y%m%d000000").to_string(),
            ),
        });
        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);

        doc.compress();
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).map_err(RenderError::Serialize)?;
        Ok(bytes)
    }

    /// Composes the PDF and publishes it as `simulacao_<name>.pdf`. The file
    /// appears in one rename; a failed render leaves nothing behind.
    pub fn render(&self, input: &DocumentInput<'_>) -> Result<RenderedDocument, RenderError> {
        let bytes = self.compose(input)?;

        fs::create_dir_all(&self.output_dir)
            .map_err(|err| RenderError::io(&self.output_dir, err))?;
        let path = self
            .output_dir
            .join(format::proposal_filename(&input.parameters.name));
        let tmp_path = self
            .output_dir
            .join(format!(".proposal_{}.pdf.tmp", Uuid::new_v4().simple()));

        fs::write(&tmp_path, &bytes).map_err(|err| RenderError::io(&tmp_path, err))?;
        if let Err(err) = fs::rename(&tmp_path, &path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(RenderError::io(&path, err));
        }
        debug!(path = %path.display(), bytes = bytes.len(), "proposal document written");

        Ok(RenderedDocument { path, bytes })
    }

    fn load_background(&self) -> Result<Option<RgbaImage>, RenderError> {
        if !self.background_path.is_file() {
            return Ok(None);
        }
        let image = image::open(&self.background_path)?.to_rgba8();
        Ok(Some(image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposal::chart::ChartInput;
    use crate::proposal::ParameterDeriver;

    const ADDRESS: &str = "Avenida Afonso Pena, 1500 - Centro - Campo Grande/MS";

    struct Fixture {
        parameters: DerivedParameters,
        figures: FinancialFigures,
        chart: ChartDrawing,
    }

    fn fixture() -> Fixture {
        let deriver = ParameterDeriver::default();
        let parameters = deriver
            .derive("Ana / Souza", ADDRESS, "439,85")
            .expect("valid input");
        let figures =
            FinancialFigures::compute(&parameters, deriver.schedule()).expect("figures compute");
        let chart = ChartDrawing::draw(&ChartInput::from_figures(&figures)).expect("chart draws");
        Fixture {
            parameters,
            figures,
            chart,
        }
    }

    fn input(fixture: &Fixture) -> DocumentInput<'_> {
        DocumentInput {
            parameters: &fixture.parameters,
            figures: &fixture.figures,
            chart: &fixture.chart,
            issued_on: NaiveDate::from_ymd_opt(2026, 3, 2).expect("valid date"),
        }
    }

    #[test]
    fn composed_pdf_has_one_page_with_chart_and_fonts() {
        let dir = tempfile::tempdir().expect("temp dir");
        let fixture = fixture();
        let bytes = DocumentRenderer::new(dir.path(), dir.path())
            .compose(&input(&fixture))
            .expect("pdf composes");

        assert!(bytes.starts_with(b"%PDF-1.5"));
        let doc = Document::load_mem(&bytes).expect("pdf parses");
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 1);

        let page_id = pages[&1];
        let (resources, _) = doc.get_page_resources(page_id);
        let resources = resources.expect("inline resources");
        let xobjects = resources
            .get(b"XObject")
            .and_then(Object::as_dict)
            .expect("xobject dictionary");
        assert!(xobjects.has(CHART_XOBJECT.as_bytes()));
        assert!(!xobjects.has(BACKGROUND_XOBJECT.as_bytes()));

        let content = doc.get_page_content(page_id).expect("page content");
        let needle = encode_win_ansi("TOTAL A PAGAR");
        assert!(content.windows(needle.len()).any(|window| window == needle));
    }

    #[test]
    fn background_template_is_embedded_when_present() {
        let dir = tempfile::tempdir().expect("temp dir");
        RgbaImage::from_pixel(4, 6, image::Rgba([200, 200, 200, 255]))
            .save(dir.path().join(BACKGROUND_TEMPLATE))
            .expect("template saved");

        let fixture = fixture();
        let bytes = DocumentRenderer::new(dir.path(), dir.path())
            .compose(&input(&fixture))
            .expect("pdf composes");
        let doc = Document::load_mem(&bytes).expect("pdf parses");
        let page_id = doc.get_pages()[&1];
        let (resources, _) = doc.get_page_resources(page_id);
        let xobjects = resources
            .expect("inline resources")
            .get(b"XObject")
            .and_then(Object::as_dict)
            .expect("xobject dictionary");
        assert!(xobjects.has(BACKGROUND_XOBJECT.as_bytes()));
    }

    #[test]
    fn unreadable_template_fails_the_render() {
        let dir = tempfile::tempdir().expect("temp dir");
        let assets = dir.path().join("assets");
        fs::create_dir_all(&assets).expect("assets dir");
        fs::write(assets.join(BACKGROUND_TEMPLATE), b"not a png").expect("bad template");

        let fixture = fixture();
        let output = dir.path().join("output");
        let err = DocumentRenderer::new(&output, &assets)
            .render(&input(&fixture))
            .expect_err("corrupt template rejected");
        assert!(matches!(err, RenderError::Image(_)));
        assert!(!output.exists());
    }

    #[test]
    fn render_publishes_under_the_sanitized_name() {
        let dir = tempfile::tempdir().expect("temp dir");
        let fixture = fixture();
        let renderer = DocumentRenderer::new(dir.path().join("output"), dir.path());

        let rendered = renderer.render(&input(&fixture)).expect("pdf renders");
        assert_eq!(
            rendered.path.file_name().and_then(|name| name.to_str()),
            Some("simulacao_Ana_Souza.pdf")
        );
        assert_eq!(fs::read(&rendered.path).expect("pdf readable"), rendered.bytes);

        let entries: Vec<_> = fs::read_dir(renderer.output_dir())
            .expect("output dir")
            .flatten()
            .collect();
        assert_eq!(entries.len(), 1);
    }
}
