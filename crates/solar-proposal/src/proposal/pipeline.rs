use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use tracing::{info, info_span, warn};

use super::chart::{ChartInput, ChartRenderer};
use super::deriver::ParameterDeriver;
use super::document::{DocumentInput, DocumentRenderer};
use super::domain::DerivedParameters;
use super::error::ProposalError;
use super::figures::FinancialFigures;
use crate::config::ProposalConfig;

const CHARTS_SUBDIR: &str = "charts";

/// Result of one successful run: the published document, its bytes and the
/// values printed on it.
#[derive(Debug, Clone)]
pub struct GeneratedProposal {
    pub pdf_path: PathBuf,
    pub pdf_bytes: Vec<u8>,
    pub chart_path: PathBuf,
    pub parameters: DerivedParameters,
    pub figures: FinancialFigures,
}

/// Validate, derive, compute, draw, lay out. Stages share nothing mutable,
/// so one service can serve concurrent requests.
#[derive(Debug, Clone)]
pub struct ProposalService {
    deriver: ParameterDeriver,
    charts: ChartRenderer,
    documents: DocumentRenderer,
}

impl ProposalService {
    pub fn new(config: &ProposalConfig) -> Self {
        Self {
            deriver: ParameterDeriver::new(config.tariff.clone(), config.limits),
            charts: ChartRenderer::new(config.output_dir.join(CHARTS_SUBDIR)),
            documents: DocumentRenderer::new(&config.output_dir, &config.assets_dir),
        }
    }

    pub fn deriver(&self) -> &ParameterDeriver {
        &self.deriver
    }

    /// Generates a proposal dated today.
    pub fn generate(
        &self,
        name: &str,
        address: &str,
        bill_amount: &str,
        request_id: &str,
    ) -> Result<GeneratedProposal, ProposalError> {
        self.generate_on(name, address, bill_amount, request_id, Local::now().date_naive())
    }

    pub fn generate_on(
        &self,
        name: &str,
        address: &str,
        bill_amount: &str,
        request_id: &str,
        issued_on: NaiveDate,
    ) -> Result<GeneratedProposal, ProposalError> {
        let span = info_span!("proposal", request_id);
        let _entered = span.enter();

        let result = self.run(name, address, bill_amount, issued_on);
        match &result {
            Ok(generated) => info!(
                path = %generated.pdf_path.display(),
                consumption = generated.parameters.consumption,
                monthly_saving = generated.figures.monthly_saving,
                "proposal generated"
            ),
            Err(err) => warn!(kind = err.kind(), error = %err, "proposal rejected"),
        }
        result
    }

    fn run(
        &self,
        name: &str,
        address: &str,
        bill_amount: &str,
        issued_on: NaiveDate,
    ) -> Result<GeneratedProposal, ProposalError> {
        let parameters = self.deriver.derive(name, address, bill_amount)?;
        let figures = FinancialFigures::compute(&parameters, self.deriver.schedule())?;

        let chart = self.charts.render(&ChartInput::from_figures(&figures))?;
        let rendered = self.documents.render(&DocumentInput {
            parameters: &parameters,
            figures: &figures,
            chart: &chart.drawing,
            issued_on,
        });
        let document = match rendered {
            Ok(document) => document,
            Err(err) => {
                self.charts.discard(&chart.path);
                return Err(err.into());
            }
        };

        Ok(GeneratedProposal {
            pdf_path: document.path,
            pdf_bytes: document.bytes,
            chart_path: chart.path,
            parameters,
            figures,
        })
    }
}
