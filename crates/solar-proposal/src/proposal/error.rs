use std::path::PathBuf;

use thiserror::Error;

/// Input rejected before any computation runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("nome completo deve ter pelo menos {min} caracteres")]
    NameTooShort { min: usize },
    #[error("nome completo não pode ter mais de {max} caracteres")]
    NameTooLong { max: usize },
    #[error("nome completo deve conter pelo menos uma letra")]
    NameWithoutLetters,
    #[error("endereço deve ter pelo menos {min} caracteres")]
    AddressTooShort { min: usize },
    #[error("valor da fatura é obrigatório")]
    BillAmountMissing,
    #[error("valor da fatura deve ser um número válido (recebido '{raw}')")]
    BillAmountNotNumeric { raw: String },
    #[error("valor da fatura deve ser maior que zero")]
    BillAmountNotPositive,
    #[error("valor da fatura muito alto (máximo {cap:.2})")]
    BillAmountAboveCap { cap: f64 },
}

/// Derived figures that cannot be put on a proposal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ComputationError {
    #[error("{field} is not a finite number")]
    NonFinite { field: &'static str },
    #[error("bill does not reconcile: expected {expected:.6}, derived {derived:.6}")]
    ReconciliationMismatch { expected: f64, derived: f64 },
}

/// Chart or document generation failure. Nothing is left on disk.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("chart cannot be drawn: {0}")]
    Chart(String),
    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("pdf assembly failed: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("pdf serialization failed: {0}")]
    Serialize(#[source] std::io::Error),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RenderError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum ProposalError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),
    #[error("inconsistent figures: {0}")]
    Computation(#[from] ComputationError),
    #[error("proposal generation failed: {0}")]
    Render(#[from] RenderError),
}

impl ProposalError {
    /// Stable tag for failure payloads.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Computation(_) => "computation",
            Self::Render(_) => "render",
        }
    }
}
