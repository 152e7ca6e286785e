//! Fixed A4 layout of the proposal. Every position is in points from the
//! bottom left; table and prose rows are given as depth below the top edge.

use chrono::NaiveDate;

use super::canvas::{fit_centered, Align, PageCanvas, Rgb};
use crate::proposal::domain::DerivedParameters;
use crate::proposal::figures::FinancialFigures;
use crate::proposal::format;
use crate::proposal::text::{wrap, FontFace};

pub const PAGE_WIDTH: f32 = 595.2756;
pub const PAGE_HEIGHT: f32 = 841.8898;

pub const CHART_XOBJECT: &str = "Chart";
pub const BACKGROUND_XOBJECT: &str = "Background";

const WHITE: Rgb = Rgb::hex(0xffffff);
const BLACK: Rgb = Rgb::hex(0x000000);
const WARNING: Rgb = Rgb::hex(0xff0000);
const HIGHLIGHT: Rgb = Rgb::hex(0xffc20e);

const GRADIENT_START: Rgb = Rgb::hex(0x0b4882);
const GRADIENT_END: Rgb = Rgb::hex(0x0c243c);
const GRADIENT_STEPS: u32 = 300;
const GRADIENT_BLEED: f32 = 2.0;

const IDENTITY_LEFT_RATIO: f32 = 0.55;
const IDENTITY_WIDTH_RATIO: f32 = 0.4;
const IDENTITY_TOP_MARGIN: f32 = 40.0;
const IDENTITY_SIDE_PADDING: f32 = 10.0;
const IDENTITY_CELL_PADDING: f32 = 3.0;
const NAME_SIZE: f32 = 14.0;
const NAME_LEADING: f32 = 15.0;
const ADDRESS_SIZE: f32 = 9.0;
const ADDRESS_LEADING: f32 = 12.0;

const CHART_FRAME_X: f32 = 45.0;
const CHART_FRAME_DEPTH: f32 = 427.0;
const CHART_FRAME_WIDTH: f32 = 230.0;
const CHART_FRAME_HEIGHT: f32 = 195.0;
const CHART_FRAME_RADIUS: f32 = 15.0;
const CHART_FRAME_LINE: f32 = 0.5;
const CHART_BOX_X: f32 = 48.0;
const CHART_BOX_DEPTH: f32 = 425.0;
const CHART_BOX_WIDTH: f32 = 225.0;
const CHART_BOX_HEIGHT: f32 = 190.0;

const SAVINGS_TITLE: &str = "Economia";
const SAVINGS_TITLE_X: f32 = 155.0;
const SAVINGS_TITLE_DEPTH: f32 = 195.0;
const SAVINGS_TITLE_SIZE: f32 = 18.0;
const SAVINGS_COLUMNS: [(f32, &str); 3] = [
    (70.0, "Mensal"),
    (150.0, "Anual"),
    (240.0, "Em 5 anos"),
];
const SAVINGS_LABEL_DEPTH: f32 = 213.0;
const SAVINGS_LABEL_SIZE: f32 = 12.0;
const SAVINGS_VALUE_DEPTH: f32 = 227.0;
const SAVINGS_VALUE_SIZE: f32 = 14.0;
const SAVINGS_VALUE_SIZE_COMPACT: f32 = 12.0;
const SAVINGS_COMPACT_ABOVE: f64 = 9_999.0;

const TABLE_TITLE_X: f32 = 425.0;
const TABLE_TITLE_SIZE: f32 = 8.0;
const TABLE_HEADER_SIZE: f32 = 4.0;
const TABLE_ROW_SIZE: f32 = 4.0;
const TABLE_TOTAL_SIZE: f32 = 6.0;
const TABLE_NOTE_SIZE: f32 = 4.0;
const TABLE_RULE_LINE: f32 = 0.5;
const TABLE_RULE_GAP: f32 = 2.0;
const TABLE_RULE_LEFT: f32 = 306.0;
const TABLE_RULE_RIGHT: f32 = 542.0;
const HEADER_ITEM_X: f32 = 306.0;
const ITEM_X: f32 = 307.0;
const UNIT_X: f32 = 430.0;
const QUANTITY_RIGHT: f32 = 470.0;
const UNIT_PRICE_RIGHT: f32 = 514.0;
const UNIT_PRICE_TAXED_HEADER_X: f32 = 482.0;
const UNIT_PRICE_TAXED_HEADER_RISE: f32 = 5.0;
const UNIT_PRICE_HEADER_X: f32 = 485.0;
const AMOUNT_RIGHT: f32 = 542.0;
const TOTAL_LABEL_RIGHT: f32 = 504.0;
const NOTE_X: f32 = 307.0;

/// Calibri-like narrowing for the marketing copy set in Helvetica.
const PROSE_HORIZONTAL_SCALE: f32 = 86.0;
const PITCH_SIZE: f32 = 14.0;
const STEPS_HEADING: &str = "Passos";
const STEPS_HEADING_X: f32 = 190.0;
const STEPS_HEADING_Y: f32 = 245.0;
const STEPS_HEADING_SIZE: f32 = 11.0;
const STEPS_SIZE: f32 = 9.0;

/// Everything a page needs besides the canvas.
#[derive(Debug, Clone, Copy)]
pub struct PageSpec<'a> {
    pub parameters: &'a DerivedParameters,
    pub figures: &'a FinancialFigures,
    pub chart_size: (u32, u32),
    pub background_size: Option<(u32, u32)>,
    pub issued_on: NaiveDate,
}

pub fn draw_page(canvas: &mut PageCanvas, page: &PageSpec<'_>) {
    draw_gradient(canvas);
    if let Some((width, height)) = page.background_size {
        let (x, y, w, h) = fit_centered(width, height, 0.0, 0.0, PAGE_WIDTH, PAGE_HEIGHT);
        canvas.image(BACKGROUND_XOBJECT, x, y, w, h);
    }
    draw_identity(canvas, page.parameters);
    draw_chart(canvas, page.chart_size);
    draw_savings(canvas, page.figures);
    for table in invoice_tables(page.figures, page.issued_on) {
        draw_invoice_table(canvas, &table);
    }
    draw_prose(canvas);
}

fn from_top(depth: f32) -> f32 {
    PAGE_HEIGHT - depth
}

fn draw_gradient(canvas: &mut PageCanvas) {
    let strip = PAGE_WIDTH / GRADIENT_STEPS as f32;
    for step in 0..GRADIENT_STEPS {
        let t = step as f32 / GRADIENT_STEPS as f32;
        canvas.set_fill_components(GRADIENT_START.mix(GRADIENT_END, t));
        canvas.fill_rect(
            PAGE_WIDTH * (1.0 - t) - GRADIENT_BLEED,
            -GRADIENT_BLEED,
            strip + 2.0 * GRADIENT_BLEED,
            PAGE_HEIGHT + 2.0 * GRADIENT_BLEED,
        );
    }
}

/// Customer name (upper case) over the address, centred in the right-hand
/// column and wrapped to its width.
fn draw_identity(canvas: &mut PageCanvas, parameters: &DerivedParameters) {
    let column_left = PAGE_WIDTH * IDENTITY_LEFT_RATIO;
    let column_width = PAGE_WIDTH * IDENTITY_WIDTH_RATIO;
    let centre = column_left + column_width / 2.0;
    let text_width = column_width - 2.0 * IDENTITY_SIDE_PADDING;

    canvas.set_fill(WHITE);
    let mut top = from_top(IDENTITY_TOP_MARGIN);
    let blocks = [
        (parameters.name.to_uppercase(), NAME_SIZE, NAME_LEADING),
        (parameters.address.clone(), ADDRESS_SIZE, ADDRESS_LEADING),
    ];
    for (text, size, leading) in blocks {
        let lines = wrap(FontFace::Bold, &text, size, text_width);
        let mut baseline = top - IDENTITY_CELL_PADDING - size;
        for line in &lines {
            canvas.text(Align::Center, centre, baseline, FontFace::Bold, size, line);
            baseline -= leading;
        }
        top -= 2.0 * IDENTITY_CELL_PADDING + lines.len() as f32 * leading;
    }
}

fn draw_chart(canvas: &mut PageCanvas, (width, height): (u32, u32)) {
    canvas.set_stroke(WHITE);
    canvas.set_line_width(CHART_FRAME_LINE);
    canvas.stroke_round_rect(
        CHART_FRAME_X,
        from_top(CHART_FRAME_DEPTH),
        CHART_FRAME_WIDTH,
        CHART_FRAME_HEIGHT,
        CHART_FRAME_RADIUS,
    );

    let (x, y, w, h) = fit_centered(
        width,
        height,
        CHART_BOX_X,
        from_top(CHART_BOX_DEPTH),
        CHART_BOX_WIDTH,
        CHART_BOX_HEIGHT,
    );
    canvas.image(CHART_XOBJECT, x, y, w, h);
}

pub fn savings_value_size(monthly_saving: f64) -> f32 {
    if monthly_saving > SAVINGS_COMPACT_ABOVE {
        SAVINGS_VALUE_SIZE_COMPACT
    } else {
        SAVINGS_VALUE_SIZE
    }
}

fn draw_savings(canvas: &mut PageCanvas, figures: &FinancialFigures) {
    canvas.set_fill(WHITE);
    canvas.text(
        Align::Center,
        SAVINGS_TITLE_X,
        from_top(SAVINGS_TITLE_DEPTH),
        FontFace::Bold,
        SAVINGS_TITLE_SIZE,
        SAVINGS_TITLE,
    );

    let value_size = savings_value_size(figures.monthly_saving);
    let values = [
        figures.monthly_saving,
        figures.annual_saving,
        figures.five_year_saving,
    ];
    for ((x, label), value) in SAVINGS_COLUMNS.into_iter().zip(values) {
        canvas.text(
            Align::Center,
            x,
            from_top(SAVINGS_LABEL_DEPTH),
            FontFace::Bold,
            SAVINGS_LABEL_SIZE,
            label,
        );
        canvas.text(
            Align::Center,
            x,
            from_top(SAVINGS_VALUE_DEPTH),
            FontFace::Bold,
            value_size,
            &format!("R${}", format::currency(value)),
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitPriceHeader {
    /// Two lines: "Preço Unit" over "C/ Tributos (R$)*".
    TaxesIncluded,
    Plain,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Amount {
    Charge(String),
    /// Drawn bold in the warning colour.
    Credit(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceRow {
    pub depth: f32,
    pub item: String,
    pub unit: &'static str,
    pub quantity: Option<String>,
    pub unit_price: Option<String>,
    pub amount: Option<Amount>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceTable {
    pub title: &'static str,
    pub title_depth: f32,
    pub header_depth: f32,
    pub unit_price_header: UnitPriceHeader,
    pub rows: Vec<InvoiceRow>,
    pub total_depth: f32,
    pub total_label: &'static str,
    pub total_amount: String,
    pub notes: Vec<(f32, String)>,
}

fn money(value: f64) -> String {
    format!("R$ {}", format::currency(value))
}

fn row(
    depth: f32,
    item: impl Into<String>,
    unit: &'static str,
    quantity: Option<String>,
    unit_price: Option<String>,
    amount: Option<Amount>,
) -> InvoiceRow {
    InvoiceRow {
        depth,
        item: item.into(),
        unit,
        quantity,
        unit_price,
        amount,
    }
}

/// The before, after and what-you-pay invoices, with their footnotes.
pub fn invoice_tables(figures: &FinancialFigures, issued_on: NaiveDate) -> [InvoiceTable; 3] {
    let consumption = Some(format::integer(figures.consumption));
    let compensable = Some(format::integer(figures.compensable_energy));
    let full_tariff = Some(format!("R$ {}", format::tariff(figures.unit_tariff)));
    let discounted_tariff = Some(format!("R$ {}", format::tariff(figures.discounted_tariff)));
    let lighting_fee = Some(Amount::Charge(money(figures.public_lighting_fee)));
    let minimum_tier = figures.minimum_tier;
    let discount = figures.discount_pct.trunc() as i64;

    let before = InvoiceTable {
        title: "(Antes) Fatura Distribuidora SEM GERAÇÃO SOLAR",
        title_depth: 199.0,
        header_depth: 222.0,
        unit_price_header: UnitPriceHeader::TaxesIncluded,
        rows: vec![
            row(
                229.0,
                "Consumo Médio Mensal",
                "KWH",
                consumption.clone(),
                full_tariff.clone(),
                Some(Amount::Charge(money(figures.energy_charge))),
            ),
            row(235.0, "LANÇAMENTOS E SERVIÇOS", "", None, None, None),
            row(
                241.0,
                "CONTRIBUIÇÃO ILUMINAÇÃO PÚBLICA (CIP)",
                "",
                None,
                None,
                lighting_fee.clone(),
            ),
        ],
        total_depth: 260.0,
        total_label: "TOTAL A PAGAR",
        total_amount: money(figures.pre_discount_total),
        notes: vec![(
            273.0,
            format!(
                "*Tarifas e tributos praticados pela Distribuidora em {}",
                format::month_and_year(issued_on)
            ),
        )],
    };

    let after = InvoiceTable {
        title: "(Depois) Fatura Distribuidora COM GERAÇÃO SOLAR",
        title_depth: 289.0,
        header_depth: 307.0,
        unit_price_header: UnitPriceHeader::Plain,
        rows: vec![
            row(
                314.0,
                "Consumo Médio Mensal",
                "KWH",
                consumption,
                full_tariff.clone(),
                Some(Amount::Charge(money(figures.energy_charge))),
            ),
            row(
                320.0,
                "Energia Solar",
                "KWH",
                compensable.clone(),
                full_tariff,
                Some(Amount::Credit(format!(
                    "-R$ {}",
                    format::currency(figures.compensated_energy_charge)
                ))),
            ),
            row(
                326.0,
                "CONTRIBUIÇÃO ILUMINAÇÃO PÚBLICA (CIP)",
                "",
                None,
                None,
                lighting_fee,
            ),
        ],
        total_depth: 339.0,
        total_label: "VALOR FIXO RESIDUAL**",
        total_amount: money(figures.distributor_residual),
        notes: vec![(
            351.0,
            format!(
                "**O valor residual é resultado da cobrança obrigatória do Custo de Disponibilidade ({minimum_tier}kWh) + CIP"
            ),
        )],
    };

    let payable = InvoiceTable {
        title: "O que vou pagar:",
        title_depth: 365.0,
        header_depth: 380.0,
        unit_price_header: UnitPriceHeader::Plain,
        rows: vec![
            row(
                387.0,
                format!("VALOR DE LOCAÇÃO**** (Geração Solar c/ {discount}% de deságio)"),
                "KWH",
                compensable,
                discounted_tariff,
                Some(Amount::Charge(money(figures.generator_invoice))),
            ),
            row(
                393.0,
                format!(
                    "VALOR FIXO RESIDUAL DISTRIBUIDORA (Consumo Mínimo de {minimum_tier}kWh + CIP)"
                ),
                "",
                None,
                None,
                Some(Amount::Charge(money(figures.distributor_residual))),
            ),
        ],
        total_depth: 405.0,
        total_label: "VALOR TOTAL DA FATURA COM GERAÇÃO SOLAR",
        total_amount: money(figures.post_discount_total),
        notes: vec![
            (
                417.0,
                "***Não pagar a fatura residual da Distribuidora. Pagar somente a Fatura LOCAÇÃO."
                    .to_string(),
            ),
            (
                423.0,
                "****O valor estimado com base na performance de geração de creditos a compensar no ciclo de faturamento."
                    .to_string(),
            ),
        ],
    };

    [before, after, payable]
}

fn draw_invoice_table(canvas: &mut PageCanvas, table: &InvoiceTable) {
    canvas.set_fill(BLACK);
    canvas.text(
        Align::Center,
        TABLE_TITLE_X,
        from_top(table.title_depth),
        FontFace::Bold,
        TABLE_TITLE_SIZE,
        table.title,
    );

    let header_y = from_top(table.header_depth);
    let bold = FontFace::Bold;
    canvas.text(Align::Left, HEADER_ITEM_X, header_y, bold, TABLE_HEADER_SIZE, "Itens da Fatura");
    canvas.text(Align::Left, UNIT_X, header_y, bold, TABLE_HEADER_SIZE, "Unid");
    canvas.text(Align::Right, QUANTITY_RIGHT, header_y, bold, TABLE_HEADER_SIZE, "Quant");
    match table.unit_price_header {
        UnitPriceHeader::TaxesIncluded => {
            canvas.text(
                Align::Left,
                UNIT_PRICE_TAXED_HEADER_X,
                header_y + UNIT_PRICE_TAXED_HEADER_RISE,
                bold,
                TABLE_HEADER_SIZE,
                "Preço Unit",
            );
            canvas.text(
                Align::Left,
                UNIT_PRICE_TAXED_HEADER_X,
                header_y,
                bold,
                TABLE_HEADER_SIZE,
                "C/ Tributos (R$)*",
            );
        }
        UnitPriceHeader::Plain => {
            canvas.text(
                Align::Left,
                UNIT_PRICE_HEADER_X,
                header_y,
                bold,
                TABLE_HEADER_SIZE,
                "Preço Unit (R$)",
            );
        }
    }
    canvas.text(Align::Right, AMOUNT_RIGHT, header_y, bold, TABLE_HEADER_SIZE, "Valor (R$)");

    let rule_y = header_y - TABLE_RULE_GAP;
    canvas.set_stroke(BLACK);
    canvas.set_line_width(TABLE_RULE_LINE);
    canvas.line(TABLE_RULE_LEFT, rule_y, TABLE_RULE_RIGHT, rule_y);

    let regular = FontFace::Regular;
    for row in &table.rows {
        let y = from_top(row.depth);
        canvas.text(Align::Left, ITEM_X, y, regular, TABLE_ROW_SIZE, &row.item);
        if !row.unit.is_empty() {
            canvas.text(Align::Left, UNIT_X, y, regular, TABLE_ROW_SIZE, row.unit);
        }
        if let Some(quantity) = &row.quantity {
            canvas.text(Align::Right, QUANTITY_RIGHT, y, regular, TABLE_ROW_SIZE, quantity);
        }
        if let Some(price) = &row.unit_price {
            canvas.text(Align::Right, UNIT_PRICE_RIGHT, y, regular, TABLE_ROW_SIZE, price);
        }
        match &row.amount {
            Some(Amount::Charge(text)) => {
                canvas.text(Align::Right, AMOUNT_RIGHT, y, regular, TABLE_ROW_SIZE, text);
            }
            Some(Amount::Credit(text)) => {
                canvas.set_fill(WARNING);
                canvas.text(Align::Right, AMOUNT_RIGHT, y, bold, TABLE_ROW_SIZE, text);
                canvas.set_fill(BLACK);
            }
            None => {}
        }
    }

    let total_y = from_top(table.total_depth);
    canvas.text(
        Align::Right,
        TOTAL_LABEL_RIGHT,
        total_y,
        bold,
        TABLE_TOTAL_SIZE,
        table.total_label,
    );
    canvas.text(Align::Right, AMOUNT_RIGHT, total_y, bold, TABLE_TOTAL_SIZE, &table.total_amount);

    for (depth, note) in &table.notes {
        canvas.text(Align::Left, NOTE_X, from_top(*depth), regular, TABLE_NOTE_SIZE, note);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tone {
    Plain,
    Highlight,
}

impl Tone {
    const fn face(self) -> FontFace {
        match self {
            Self::Plain => FontFace::Regular,
            Self::Highlight => FontFace::Bold,
        }
    }

    const fn color(self) -> Rgb {
        match self {
            Self::Plain => WHITE,
            Self::Highlight => HIGHLIGHT,
        }
    }
}

/// A line of copy that starts at a fixed point; its runs follow each other.
struct ProseLine {
    x: f32,
    y: f32,
    runs: &'static [(Tone, &'static str)],
}

const fn plain(x: f32, y: f32, runs: &'static [(Tone, &'static str)]) -> ProseLine {
    ProseLine { x, y, runs }
}

const PITCH: [ProseLine; 4] = [
    plain(
        35.0,
        PAGE_HEIGHT - 533.0,
        &[
            (Tone::Plain, "A "),
            (Tone::Highlight, "Energia Solar por Assinatura"),
            (
                Tone::Plain,
                " é um modelo de negócio que permite às pessoas físicas e",
            ),
        ],
    ),
    plain(
        35.0,
        PAGE_HEIGHT - 546.0,
        &[(
            Tone::Plain,
            "jurídicas gerarem sua própria energia solar e se beneficiar do sistema de compensação da",
        )],
    ),
    plain(
        35.0,
        PAGE_HEIGHT - 559.0,
        &[(
            Tone::Plain,
            "Distribuidora sem a necessidade de realizar obras ou investimentos, sem taxas, sem fidelização",
        )],
    ),
    plain(
        35.0,
        PAGE_HEIGHT - 572.0,
        &[(
            Tone::Plain,
            "e sem gastos com manutenção. Na prática, você loca uma parcela da usina solar já em operação.",
        )],
    ),
];

const STEPS: [ProseLine; 18] = [
    plain(
        110.0,
        235.0,
        &[(Tone::Plain, "1º) Você nos encaminha sua(s) conta(s) de luz. Analisamos")],
    ),
    plain(
        110.0,
        226.0,
        &[(Tone::Plain, "o seu consumo, estimamos sua economia e lhe apresentamos")],
    ),
    plain(
        110.0,
        217.0,
        &[
            (Tone::Plain, "nosso "),
            (Tone::Highlight, "Estudo-Proposta"),
            (Tone::Plain, "."),
        ],
    ),
    plain(110.0, 200.0, &[(Tone::Plain, "2º) Você aprova a proposta e nos envia os seguintes")]),
    plain(110.0, 192.0, &[(Tone::Plain, "documentos:")]),
    plain(
        110.0,
        184.0,
        &[(Tone::Plain, " -  Cópia do documento pessoal do titular da conta de luz;")],
    ),
    plain(
        110.0,
        176.0,
        &[(Tone::Plain, " -  Se Pessoa Jurídica: i) cópia do Contrato Social e ii) cópia do")],
    ),
    plain(110.0, 168.0, &[(Tone::Plain, "    cartão CNPJ.")]),
    plain(
        110.0,
        149.0,
        &[
            (Tone::Plain, "3º) Você receberá o contrato por e-mail e "),
            (Tone::Highlight, "assinará digitalmente"),
            (Tone::Plain, "."),
        ],
    ),
    plain(110.0, 122.0, &[(Tone::Plain, "4º) Assumiremos a titularidade da(s) sua(s) unidade(s)")]),
    plain(110.0, 114.0, &[(Tone::Plain, "consumidora(s) beneficiárias e cuidaremos de toda a")]),
    plain(
        110.0,
        106.0,
        &[
            (Tone::Highlight, "Comunicação com a Distribuidora"),
            (Tone::Plain, " para garantir sua"),
        ],
    ),
    plain(110.0, 98.0, &[(Tone::Plain, "economia sem complicações")]),
    plain(
        110.0,
        71.0,
        &[
            (Tone::Plain, "5º) Em até 90 dias você passa a "),
            (Tone::Highlight, "usufruir de energia limpa,"),
        ],
    ),
    plain(110.0, 63.0, &[(Tone::Plain, "renovável e mais barata.")]),
    plain(
        110.0,
        40.0,
        &[
            (Tone::Plain, "6) Você contará com 100% do nosso "),
            (Tone::Highlight, "suporte técnico e"),
        ],
    ),
    plain(
        110.0,
        32.0,
        &[
            (Tone::Highlight, "comercial vitalício"),
            (Tone::Plain, " (durante toda a vigência do seu contrato"),
        ],
    ),
    plain(
        110.0,
        24.0,
        &[(Tone::Plain, "conosco), através do nosso WhatsApp (67) 9 9343-1808.")],
    ),
];

fn draw_prose(canvas: &mut PageCanvas) {
    canvas.set_horizontal_scale(PROSE_HORIZONTAL_SCALE);
    draw_lines(canvas, &PITCH, PITCH_SIZE);

    canvas.set_fill(HIGHLIGHT);
    canvas.text(
        Align::Left,
        STEPS_HEADING_X,
        STEPS_HEADING_Y,
        FontFace::Bold,
        STEPS_HEADING_SIZE,
        STEPS_HEADING,
    );
    draw_lines(canvas, &STEPS, STEPS_SIZE);
    canvas.set_horizontal_scale(100.0);
}

fn draw_lines(canvas: &mut PageCanvas, lines: &[ProseLine], size: f32) {
    for line in lines {
        let mut x = line.x;
        for (tone, text) in line.runs {
            canvas.set_fill(tone.color());
            x += canvas.text(Align::Left, x, line.y, tone.face(), size, text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposal::text::encode_win_ansi;
    use crate::proposal::ParameterDeriver;

    const ADDRESS: &str =
        "Rua das Palmeiras, 456 - Jardim dos Estados - Campo Grande/MS - CEP 79020-000";

    struct Fixture {
        parameters: DerivedParameters,
        figures: FinancialFigures,
    }

    fn fixture(bill: &str) -> Fixture {
        let deriver = ParameterDeriver::default();
        let parameters = deriver
            .derive("João da Silva Santos", ADDRESS, bill)
            .expect("valid input");
        let figures =
            FinancialFigures::compute(&parameters, deriver.schedule()).expect("figures compute");
        Fixture {
            parameters,
            figures,
        }
    }

    fn issued_on() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).expect("valid date")
    }

    fn draw(fixture: &Fixture, background_size: Option<(u32, u32)>) -> PageCanvas {
        let mut canvas = PageCanvas::new();
        draw_page(
            &mut canvas,
            &PageSpec {
                parameters: &fixture.parameters,
                figures: &fixture.figures,
                chart_size: (1000, 850),
                background_size,
                issued_on: issued_on(),
            },
        );
        canvas
    }

    fn shown(canvas: &PageCanvas) -> Vec<Vec<u8>> {
        canvas
            .operations()
            .iter()
            .filter(|op| op.operator == "Tj")
            .filter_map(|op| op.operands.first().and_then(|o| o.as_str().ok()))
            .map(<[u8]>::to_vec)
            .collect()
    }

    fn shows(canvas: &PageCanvas, text: &str) -> bool {
        shown(canvas).contains(&encode_win_ansi(text))
    }

    #[test]
    fn page_carries_customer_savings_and_totals() {
        let canvas = draw(&fixture("550.75"), None);

        assert!(shows(&canvas, "JOÃO DA SILVA SANTOS"));
        assert!(shows(&canvas, "Economia"));
        assert!(shows(&canvas, "R$68,97"));
        assert!(shows(&canvas, "R$827,65"));
        assert!(shows(&canvas, "R$4.138,24"));
        assert!(shows(&canvas, "R$ 550,75"));
        assert!(shows(&canvas, "R$ 205,90"));
        assert!(shows(&canvas, "R$ 481,78"));
        assert!(shows(&canvas, "R$ 1,138131"));
        assert!(shows(&canvas, "R$ 0,910505"));
        assert!(shows(
            &canvas,
            "*Tarifas e tributos praticados pela Distribuidora em OUTUBRO/2026"
        ));
        assert!(shows(&canvas, "Passos"));
    }

    #[test]
    fn chart_is_one_framed_image_without_vector_text() {
        let canvas = draw(&fixture("550.75"), None);
        assert!(!shows(&canvas, "SEM Geração Solar:"));
        assert!(!shows(&canvas, "Cons. Comp. c/ Deságio"));
        assert!(!shows(&canvas, "20%"));

        let images: Vec<_> = canvas
            .operations()
            .iter()
            .filter(|op| op.operator == "Do")
            .collect();
        assert_eq!(images.len(), 1);
        assert_eq!(
            images[0].operands[0].as_name().ok(),
            Some(CHART_XOBJECT.as_bytes())
        );
    }

    #[test]
    fn background_is_painted_before_everything_but_the_gradient() {
        let canvas = draw(&fixture("550.75"), Some((1240, 1754)));
        let names: Vec<_> = canvas
            .operations()
            .iter()
            .filter(|op| op.operator == "Do")
            .filter_map(|op| op.operands[0].as_name().ok())
            .collect();
        assert_eq!(
            names,
            vec![BACKGROUND_XOBJECT.as_bytes(), CHART_XOBJECT.as_bytes()]
        );
    }

    #[test]
    fn solar_credit_is_drawn_bold_in_the_warning_colour() {
        let canvas = draw(&fixture("550.75"), None);
        let ops = canvas.operations();
        let credit = encode_win_ansi("-R$ 344,85");
        let index = ops
            .iter()
            .position(|op| {
                op.operator == "Tj" && op.operands[0].as_str().ok() == Some(credit.as_slice())
            })
            .expect("credit amount shown");

        let font = ops[..index]
            .iter()
            .rev()
            .find(|op| op.operator == "Tf")
            .expect("font selected");
        assert_eq!(font.operands[0].as_name().ok(), Some(&b"F2"[..]));

        let fill = ops[..index]
            .iter()
            .rev()
            .find(|op| op.operator == "rg")
            .expect("fill selected");
        let channels: Vec<f32> = fill
            .operands
            .iter()
            .map(|o| o.as_float().expect("channel"))
            .collect();
        assert_eq!(channels, vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn invoice_tables_follow_the_figures() {
        let fixture = fixture("550.75");
        let [before, after, payable] = invoice_tables(&fixture.figures, issued_on());

        assert_eq!(before.rows[0].quantity.as_deref(), Some("403"));
        assert_eq!(
            before.rows[0].amount,
            Some(Amount::Charge("R$ 458,67".to_string()))
        );
        assert_eq!(before.total_amount, "R$ 550,75");

        assert_eq!(after.rows[1].quantity.as_deref(), Some("303"));
        assert_eq!(
            after.rows[1].amount,
            Some(Amount::Credit("-R$ 344,85".to_string()))
        );
        assert!(after.notes[0].1.contains("(100kWh)"));

        assert_eq!(
            payable.rows[0].item,
            "VALOR DE LOCAÇÃO**** (Geração Solar c/ 20% de deságio)"
        );
        assert_eq!(
            payable.rows[0].amount,
            Some(Amount::Charge("R$ 275,88".to_string()))
        );
        assert_eq!(payable.total_amount, "R$ 481,78");
    }

    #[test]
    fn savings_values_shrink_for_large_monthly_savings() {
        assert_eq!(savings_value_size(9_999.0), 14.0);
        assert_eq!(savings_value_size(10_000.0), 12.0);
    }

    #[test]
    fn long_identity_wraps_inside_its_column() {
        let mut fixture = fixture("550.75");
        fixture.parameters.name = "Maria Aparecida dos Santos Albuquerque de Oliveira".to_string();
        let canvas = draw(&fixture, None);

        let column_width = PAGE_WIDTH * IDENTITY_WIDTH_RATIO - 2.0 * IDENTITY_SIDE_PADDING;
        let name_lines = wrap(
            FontFace::Bold,
            &fixture.parameters.name.to_uppercase(),
            NAME_SIZE,
            column_width,
        );
        assert!(name_lines.len() > 1);
        for line in &name_lines {
            assert!(shows(&canvas, line));
        }
    }
}
