use serde::Serialize;

use super::domain::{DerivedParameters, TariffFlag, TariffSchedule};
use super::error::ComputationError;

const RECONCILIATION_TOLERANCE: f64 = 1e-6;

/// Savings if a tariff flag stays active for the whole period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScenarioSaving {
    pub flag: TariffFlag,
    pub flag_label: &'static str,
    pub rate: f64,
    pub monthly: f64,
    pub annual: f64,
    pub five_year: f64,
}

/// Every monetary value printed on the proposal, computed once per request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialFigures {
    pub unit_tariff: f64,
    pub discounted_tariff: f64,
    pub discount_pct: f64,
    pub consumption: i64,
    pub minimum_tier: u32,
    /// Consumption above the availability minimum, covered by solar credits.
    pub compensable_energy: i64,
    pub public_lighting_fee: f64,
    /// Consumption priced at the full tariff, before the lighting fee.
    pub energy_charge: f64,
    /// Distributor bill without solar generation.
    pub pre_discount_total: f64,
    /// Part of the distributor bill offset by injected energy.
    pub compensated_energy_charge: f64,
    pub minimum_consumption_cost: f64,
    /// What the distributor still bills: availability minimum plus lighting fee.
    pub distributor_residual: f64,
    /// Rental invoice from the generator, at the discounted tariff.
    pub generator_invoice: f64,
    pub post_discount_total: f64,
    pub monthly_saving: f64,
    pub annual_saving: f64,
    pub five_year_saving: f64,
    pub scenarios: Vec<ScenarioSaving>,
}

impl FinancialFigures {
    pub fn compute(
        params: &DerivedParameters,
        schedule: &TariffSchedule,
    ) -> Result<Self, ComputationError> {
        let unit_tariff = schedule.unit_tariff;
        let rebuilt_bill = params.consumption as f64 * unit_tariff + params.public_lighting_fee;
        ensure_finite("public_lighting_fee", params.public_lighting_fee)?;
        ensure_finite("original_bill_amount", params.original_bill_amount)?;
        if (rebuilt_bill - params.original_bill_amount).abs() > RECONCILIATION_TOLERANCE {
            return Err(ComputationError::ReconciliationMismatch {
                expected: params.original_bill_amount,
                derived: rebuilt_bill,
            });
        }

        // Negative when the bill sits below its tier minimum; carried through.
        let compensable_energy = params.consumption - i64::from(params.minimum_tier);

        let discounted_tariff = schedule.discounted_tariff();
        let consumption = params.consumption as f64;
        let compensable = compensable_energy as f64;
        let fee = params.public_lighting_fee;

        let energy_charge = consumption * unit_tariff;
        let pre_discount_total = energy_charge + fee;
        let compensated_energy_charge = compensable * unit_tariff;
        let minimum_consumption_cost = f64::from(params.minimum_tier) * unit_tariff;
        let distributor_residual = minimum_consumption_cost + fee;
        let generator_invoice = compensable * discounted_tariff;
        let post_discount_total = generator_invoice + distributor_residual;

        let monthly_saving = pre_discount_total - post_discount_total;
        let annual_saving = monthly_saving * 12.0;
        let five_year_saving = annual_saving * 5.0;

        let scenarios = schedule
            .surcharges
            .iter()
            .map(|surcharge| {
                let monthly = monthly_saving + compensable * surcharge.rate;
                let annual = monthly * 12.0;
                ScenarioSaving {
                    flag: surcharge.flag,
                    flag_label: surcharge.flag.label(),
                    rate: surcharge.rate,
                    monthly,
                    annual,
                    five_year: annual * 5.0,
                }
            })
            .collect();

        let figures = Self {
            unit_tariff,
            discounted_tariff,
            discount_pct: schedule.discount_pct,
            consumption: params.consumption,
            minimum_tier: params.minimum_tier,
            compensable_energy,
            public_lighting_fee: fee,
            energy_charge,
            pre_discount_total,
            compensated_energy_charge,
            minimum_consumption_cost,
            distributor_residual,
            generator_invoice,
            post_discount_total,
            monthly_saving,
            annual_saving,
            five_year_saving,
            scenarios,
        };
        figures.ensure_finite()?;
        Ok(figures)
    }

    pub fn scenario(&self, flag: TariffFlag) -> Option<&ScenarioSaving> {
        self.scenarios.iter().find(|scenario| scenario.flag == flag)
    }

    fn ensure_finite(&self) -> Result<(), ComputationError> {
        let named = [
            ("unit_tariff", self.unit_tariff),
            ("discounted_tariff", self.discounted_tariff),
            ("energy_charge", self.energy_charge),
            ("pre_discount_total", self.pre_discount_total),
            ("compensated_energy_charge", self.compensated_energy_charge),
            ("minimum_consumption_cost", self.minimum_consumption_cost),
            ("distributor_residual", self.distributor_residual),
            ("generator_invoice", self.generator_invoice),
            ("post_discount_total", self.post_discount_total),
            ("monthly_saving", self.monthly_saving),
            ("annual_saving", self.annual_saving),
            ("five_year_saving", self.five_year_saving),
        ];
        for (field, value) in named {
            ensure_finite(field, value)?;
        }
        for scenario in &self.scenarios {
            ensure_finite("scenario_monthly", scenario.monthly)?;
            ensure_finite("scenario_five_year", scenario.five_year)?;
        }
        Ok(())
    }
}

fn ensure_finite(field: &'static str, value: f64) -> Result<(), ComputationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ComputationError::NonFinite { field })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposal::ParameterDeriver;

    const ADDRESS: &str = "Rua das Palmeiras, 456 - Centro - Campo Grande/MS";

    fn figures_for(bill: &str) -> FinancialFigures {
        let deriver = ParameterDeriver::default();
        let params = deriver
            .derive("João da Silva Santos", ADDRESS, bill)
            .expect("valid input");
        FinancialFigures::compute(&params, deriver.schedule()).expect("figures compute")
    }

    fn close(left: f64, right: f64) -> bool {
        (left - right).abs() < 1e-6
    }

    #[test]
    fn splits_reference_bill_between_distributor_and_generator() {
        let figures = figures_for("550.75");

        assert_eq!(figures.consumption, 403);
        assert_eq!(figures.minimum_tier, 100);
        assert_eq!(figures.compensable_energy, 303);
        assert!(close(figures.pre_discount_total, 550.75));
        assert!(close(figures.minimum_consumption_cost, 113.8131));
        assert!(close(
            figures.distributor_residual,
            113.8131 + figures.public_lighting_fee
        ));
        assert!(close(figures.generator_invoice, 303.0 * 0.9105048));
        assert!(close(
            figures.compensated_energy_charge - figures.generator_invoice,
            figures.monthly_saving
        ));
        assert!(close(figures.monthly_saving, 303.0 * 1.138131 * 0.2));
    }

    #[test]
    fn projections_are_exact_multiples() {
        for bill in ["120.00", "439.85", "550.75", "1234,56", "98000"] {
            let figures = figures_for(bill);
            assert_eq!(figures.monthly_saving * 12.0, figures.annual_saving);
            assert_eq!(figures.annual_saving * 5.0, figures.five_year_saving);
            for scenario in &figures.scenarios {
                assert_eq!(scenario.monthly * 12.0, scenario.annual);
                assert_eq!(scenario.annual * 5.0, scenario.five_year);
            }
        }
    }

    #[test]
    fn surcharge_scenarios_grow_with_flag_severity() {
        let figures = figures_for("439.85");
        assert_eq!(figures.scenarios.len(), 4);

        let yellow = figures.scenario(TariffFlag::Yellow).expect("yellow scenario");
        assert!(close(
            yellow.monthly,
            figures.monthly_saving + 282.0 * 0.024181
        ));

        let monthly: Vec<f64> = figures.scenarios.iter().map(|s| s.monthly).collect();
        assert!(monthly.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(monthly[0] > figures.monthly_saving);
    }

    #[test]
    fn identical_inputs_produce_identical_figures() {
        assert_eq!(figures_for("550.75"), figures_for("550.75"));
    }

    #[test]
    fn bills_below_the_availability_minimum_still_produce_figures() {
        let figures = figures_for("60,00");

        assert_eq!(figures.consumption, 15);
        assert_eq!(figures.minimum_tier, 30);
        assert_eq!(figures.compensable_energy, -15);
        assert!(close(figures.pre_discount_total, 60.0));
        assert!(figures.generator_invoice < 0.0);
        assert!(close(
            figures.post_discount_total,
            figures.generator_invoice + figures.distributor_residual
        ));
        assert!(figures.monthly_saving < 0.0);
        assert_eq!(figures.monthly_saving * 12.0, figures.annual_saving);
    }

    #[test]
    fn rejects_parameters_that_do_not_reconcile() {
        let deriver = ParameterDeriver::default();
        let mut params = deriver
            .derive("Ana Souza", ADDRESS, "439.85")
            .expect("valid input");
        params.public_lighting_fee += 0.5;

        let err = FinancialFigures::compute(&params, deriver.schedule())
            .expect_err("tampered fee must be detected");
        assert!(matches!(err, ComputationError::ReconciliationMismatch { .. }));
    }

    #[test]
    fn rejects_non_finite_parameters() {
        let deriver = ParameterDeriver::default();
        let mut params = deriver
            .derive("Ana Souza", ADDRESS, "439.85")
            .expect("valid input");
        params.public_lighting_fee = f64::NAN;

        let err = FinancialFigures::compute(&params, deriver.schedule())
            .expect_err("NaN fee must be detected");
        assert_eq!(
            err,
            ComputationError::NonFinite {
                field: "public_lighting_fee"
            }
        );
    }
}
