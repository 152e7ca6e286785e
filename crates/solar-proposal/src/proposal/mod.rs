//! Proposal pipeline: validated input flows through parameter derivation,
//! financial figures, the comparison chart and the PDF layout.

pub mod chart;
mod deriver;
pub mod document;
mod domain;
mod error;
mod figures;
pub mod format;
mod pipeline;
pub mod text;

pub use deriver::{parse_bill_amount, ParameterDeriver};
pub use domain::{
    BillingInput, DerivedParameters, FlagSurcharge, InputLimits, TariffFlag, TariffSchedule,
    TierBand,
};
pub use error::{ComputationError, ProposalError, RenderError, ValidationError};
pub use figures::{FinancialFigures, ScenarioSaving};
pub use pipeline::{GeneratedProposal, ProposalService};
