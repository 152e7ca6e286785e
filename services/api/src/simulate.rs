use chrono::Local;
use clap::Args;
use solar_proposal::config::{AppConfig, ProposalConfig};
use solar_proposal::error::AppError;
use solar_proposal::proposal::{format, GeneratedProposal, ProposalService};
use solar_proposal::telemetry;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Args, Debug)]
pub(crate) struct SimulateArgs {
    /// Customer full name printed on the proposal
    #[arg(long)]
    pub(crate) name: String,
    /// Installation address
    #[arg(long)]
    pub(crate) address: String,
    /// Monthly bill amount, e.g. 439.85 or "R$ 1.234,56"
    #[arg(long)]
    pub(crate) bill: String,
    /// Directory receiving the PDF (overrides PROPOSAL_OUTPUT_DIR)
    #[arg(long)]
    pub(crate) output_dir: Option<PathBuf>,
}

pub(crate) fn run_simulation(args: SimulateArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let proposal_config = with_output_dir(config.proposal, args.output_dir);
    let service = ProposalService::new(&proposal_config);
    let request_id = Uuid::new_v4().simple().to_string();

    let generated = service.generate(&args.name, &args.address, &args.bill, &request_id)?;
    print!("{}", render_summary(&generated));
    Ok(())
}

fn with_output_dir(mut config: ProposalConfig, output_dir: Option<PathBuf>) -> ProposalConfig {
    if let Some(dir) = output_dir {
        config.output_dir = dir;
    }
    config
}

fn render_summary(generated: &GeneratedProposal) -> String {
    let parameters = &generated.parameters;
    let figures = &generated.figures;
    let mut lines = vec![
        format!("Proposta solar ({})", Local::now().format("%d/%m/%Y %H:%M")),
        format!("  Cliente: {}", parameters.name),
        format!("  Endereço: {}", parameters.address),
        format!(
            "  Fatura informada: R$ {}",
            format::currency(parameters.original_bill_amount)
        ),
        format!(
            "  Consumo médio: {} kWh (mínimo {} kWh)",
            format::integer(parameters.consumption),
            parameters.minimum_tier
        ),
        format!(
            "  Iluminação pública: R$ {}",
            format::currency(parameters.public_lighting_fee)
        ),
        String::new(),
        "Valores".to_string(),
        format!(
            "  Sem energia solar: R$ {}",
            format::currency(figures.pre_discount_total)
        ),
        format!(
            "  Com energia solar: R$ {}",
            format::currency(figures.post_discount_total)
        ),
        format!(
            "  Economia mensal: R$ {}",
            format::currency(figures.monthly_saving)
        ),
        format!(
            "  Economia anual: R$ {}",
            format::currency(figures.annual_saving)
        ),
        format!(
            "  Economia em 5 anos: R$ {}",
            format::currency(figures.five_year_saving)
        ),
    ];

    for scenario in &figures.scenarios {
        lines.push(format!(
            "  {}: R$ {} ao mês, R$ {} ao ano",
            scenario.flag_label,
            format::currency(scenario.monthly),
            format::currency(scenario.annual)
        ));
    }

    lines.push(String::new());
    lines.push(format!("PDF: {}", generated.pdf_path.display()));
    lines.push(format!("Gráfico: {}", generated.chart_path.display()));

    let mut rendered = lines.join("\n");
    rendered.push('\n');
    rendered
}
