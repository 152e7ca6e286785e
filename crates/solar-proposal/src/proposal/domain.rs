use serde::{Deserialize, Serialize};

/// One bill band: amounts up to `upper_bound` (inclusive) pay the given
/// availability minimum and fixed fee.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierBand {
    pub upper_bound: Option<f64>,
    pub minimum_kwh: u32,
    pub base_fee: f64,
}

/// Tariff flag surcharges applied by the distributor on top of the base
/// tariff, from the mildest to the most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TariffFlag {
    Yellow,
    RedTier1,
    RedTier2,
    HybridScarcity,
}

impl TariffFlag {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::Yellow,
            Self::RedTier1,
            Self::RedTier2,
            Self::HybridScarcity,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Yellow => "Bandeira Amarela",
            Self::RedTier1 => "Bandeira Vermelha Patamar 1",
            Self::RedTier2 => "Bandeira Vermelha Patamar 2",
            Self::HybridScarcity => "Bandeira Escassez Hídrica",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlagSurcharge {
    pub flag: TariffFlag,
    /// R$ per kWh added while the flag is active.
    pub rate: f64,
}

/// Every pricing constant the proposal depends on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TariffSchedule {
    /// Distributor price per kWh, taxes included.
    pub unit_tariff: f64,
    /// Contract discount in percent.
    pub discount_pct: f64,
    /// Ordered by ascending `upper_bound`; the last band is open ended.
    pub bands: [TierBand; 3],
    pub surcharges: [FlagSurcharge; 4],
}

impl Default for TariffSchedule {
    fn default() -> Self {
        Self {
            unit_tariff: 1.138131,
            discount_pct: 20.0,
            bands: [
                TierBand {
                    upper_bound: Some(300.0),
                    minimum_kwh: 30,
                    base_fee: 42.90,
                },
                TierBand {
                    upper_bound: Some(500.0),
                    minimum_kwh: 50,
                    base_fee: 61.67,
                },
                TierBand {
                    upper_bound: None,
                    minimum_kwh: 100,
                    base_fee: 92.51,
                },
            ],
            surcharges: [
                FlagSurcharge {
                    flag: TariffFlag::Yellow,
                    rate: 0.024181,
                },
                FlagSurcharge {
                    flag: TariffFlag::RedTier1,
                    rate: 0.057252,
                },
                FlagSurcharge {
                    flag: TariffFlag::RedTier2,
                    rate: 0.101047,
                },
                FlagSurcharge {
                    flag: TariffFlag::HybridScarcity,
                    rate: 0.182160,
                },
            ],
        }
    }
}

impl TariffSchedule {
    pub fn band_for(&self, bill_amount: f64) -> &TierBand {
        self.bands
            .iter()
            .find(|band| band.upper_bound.map_or(true, |bound| bill_amount <= bound))
            .unwrap_or(&self.bands[self.bands.len() - 1])
    }

    pub fn discounted_tariff(&self) -> f64 {
        self.unit_tariff * (1.0 - self.discount_pct / 100.0)
    }
}

/// Bounds enforced on webhook input before anything is computed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputLimits {
    pub min_name_chars: usize,
    pub max_name_chars: usize,
    pub min_address_chars: usize,
    pub max_bill_amount: f64,
}

impl Default for InputLimits {
    fn default() -> Self {
        Self {
            min_name_chars: 3,
            max_name_chars: 100,
            min_address_chars: 10,
            max_bill_amount: 99_999.99,
        }
    }
}

/// Validated request data. Only [`BillingInput::parse`] builds one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillingInput {
    name: String,
    address: String,
    bill_amount: f64,
}

impl BillingInput {
    pub(crate) fn from_parts(name: String, address: String, bill_amount: f64) -> Self {
        Self {
            name,
            address,
            bill_amount,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn bill_amount(&self) -> f64 {
        self.bill_amount
    }
}

/// Normalized billing parameters. `consumption * unit_tariff +
/// public_lighting_fee` reproduces `original_bill_amount`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedParameters {
    pub name: String,
    pub address: String,
    /// Average monthly consumption in kWh.
    pub consumption: i64,
    /// Availability minimum billed by the distributor regardless of credits.
    pub minimum_tier: u32,
    /// CIP line of the bill, adjusted to absorb consumption rounding.
    pub public_lighting_fee: f64,
    pub original_bill_amount: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_are_inclusive_at_their_upper_bound() {
        let schedule = TariffSchedule::default();
        assert_eq!(schedule.band_for(300.0).minimum_kwh, 30);
        assert_eq!(schedule.band_for(300.01).minimum_kwh, 50);
        assert_eq!(schedule.band_for(500.0).minimum_kwh, 50);
        assert_eq!(schedule.band_for(500.01).minimum_kwh, 100);
        assert_eq!(schedule.band_for(50_000.0).base_fee, 92.51);
    }

    #[test]
    fn discounted_tariff_applies_contract_discount() {
        let schedule = TariffSchedule::default();
        assert!((schedule.discounted_tariff() - 0.9105048).abs() < 1e-9);
    }
}
