use super::domain::{BillingInput, DerivedParameters, InputLimits, TariffSchedule};
use super::error::ValidationError;

/// Turns raw webhook fields into reconciled billing parameters.
#[derive(Debug, Clone, Default)]
pub struct ParameterDeriver {
    schedule: TariffSchedule,
    limits: InputLimits,
}

impl ParameterDeriver {
    pub fn new(schedule: TariffSchedule, limits: InputLimits) -> Self {
        Self { schedule, limits }
    }

    pub fn schedule(&self) -> &TariffSchedule {
        &self.schedule
    }

    pub fn derive(
        &self,
        name: &str,
        address: &str,
        bill_amount: &str,
    ) -> Result<DerivedParameters, ValidationError> {
        let input = BillingInput::parse(name, address, bill_amount, &self.limits)?;
        Ok(self.derive_from_input(&input))
    }

    /// Infallible once the input has been validated.
    pub fn derive_from_input(&self, input: &BillingInput) -> DerivedParameters {
        let bill_amount = input.bill_amount();
        let band = self.schedule.band_for(bill_amount);
        let unit_tariff = self.schedule.unit_tariff;

        let estimated_consumption = (bill_amount - band.base_fee) / unit_tariff;
        let consumption = estimated_consumption.round_ties_even() as i64;
        let public_lighting_fee = bill_amount - consumption as f64 * unit_tariff;

        DerivedParameters {
            name: input.name().to_string(),
            address: input.address().to_string(),
            consumption,
            minimum_tier: band.minimum_kwh,
            public_lighting_fee,
            original_bill_amount: bill_amount,
        }
    }
}

impl BillingInput {
    pub fn parse(
        name: &str,
        address: &str,
        bill_amount: &str,
        limits: &InputLimits,
    ) -> Result<Self, ValidationError> {
        let name = validate_name(name, limits)?;
        let address = validate_address(address, limits)?;
        let bill_amount = parse_bill_amount(bill_amount)?;

        if bill_amount <= 0.0 {
            return Err(ValidationError::BillAmountNotPositive);
        }
        if bill_amount > limits.max_bill_amount {
            return Err(ValidationError::BillAmountAboveCap {
                cap: limits.max_bill_amount,
            });
        }

        Ok(Self::from_parts(name, address, bill_amount))
    }
}

fn validate_name(raw: &str, limits: &InputLimits) -> Result<String, ValidationError> {
    let name = raw.trim();
    let chars = name.chars().count();

    if chars < limits.min_name_chars {
        return Err(ValidationError::NameTooShort {
            min: limits.min_name_chars,
        });
    }
    if chars > limits.max_name_chars {
        return Err(ValidationError::NameTooLong {
            max: limits.max_name_chars,
        });
    }
    if !name.chars().any(char::is_alphabetic) {
        return Err(ValidationError::NameWithoutLetters);
    }

    Ok(name.to_string())
}

fn validate_address(raw: &str, limits: &InputLimits) -> Result<String, ValidationError> {
    let address = raw.trim();
    if address.chars().count() < limits.min_address_chars {
        return Err(ValidationError::AddressTooShort {
            min: limits.min_address_chars,
        });
    }
    Ok(address.to_string())
}

/// Accepts `439.85`, `439,85`, `R$ 1.234,56` and `1,234.56`. When both
/// separators appear the right-most one is the decimal point.
pub fn parse_bill_amount(raw: &str) -> Result<f64, ValidationError> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != 'R' && *c != '$')
        .collect();

    if cleaned.is_empty() {
        return Err(ValidationError::BillAmountMissing);
    }

    let not_numeric = || ValidationError::BillAmountNotNumeric {
        raw: raw.trim().to_string(),
    };

    if !cleaned
        .chars()
        .all(|c| c.is_ascii_digit() || c == '.' || c == ',')
    {
        return Err(not_numeric());
    }

    let normalized = match (cleaned.rfind('.'), cleaned.rfind(',')) {
        (Some(dot), Some(comma)) => {
            let (thousands, decimal) = if dot > comma { (',', '.') } else { ('.', ',') };
            let without_grouping: String = cleaned.chars().filter(|c| *c != thousands).collect();
            if without_grouping.matches(decimal).count() > 1 {
                return Err(not_numeric());
            }
            without_grouping.replace(decimal, ".")
        }
        (None, Some(_)) => cleaned.replace(',', "."),
        _ => cleaned,
    };

    if normalized.matches('.').count() > 1 || !normalized.chars().any(|c| c.is_ascii_digit()) {
        return Err(not_numeric());
    }

    normalized
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(not_numeric)
}
