//! Solar subscription proposals: bill-amount derivation, savings figures,
//! comparison chart and the single-page PDF that carries them.

pub mod config;
pub mod error;
pub mod proposal;
pub mod telemetry;
