//! Smallest-unit balance to decimal display string.

use alloy::primitives::{utils, U256};
use thiserror::Error;

use crate::domain::NATIVE_CURRENCY_DECIMALS;
use crate::ports::PortError;

#[derive(Debug, Error)]
pub enum BalanceError {
    #[error("invalid balance {raw:?}: {reason}")]
    Parse { raw: String, reason: String },
    #[error("cannot scale balance: {0}")]
    Units(String),
}

impl From<BalanceError> for PortError {
    fn from(e: BalanceError) -> Self {
        PortError::Validation(e.to_string())
    }
}

/// Formats a base-10 wei string as ether, e.g. `"1000000000000000000"` -> `"1.0"`.
pub fn format_ether(raw: &str) -> Result<String, BalanceError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(BalanceError::Parse {
            raw: raw.to_owned(),
            reason: "empty".to_owned(),
        });
    }
    let value = U256::from_str_radix(trimmed, 10).map_err(|e| BalanceError::Parse {
        raw: raw.to_owned(),
        reason: e.to_string(),
    })?;
    format_units(value, NATIVE_CURRENCY_DECIMALS)
}

/// Scales `value` by `decimals`, keeping at least one fractional digit.
pub fn format_units(value: U256, decimals: u8) -> Result<String, BalanceError> {
    let formatted =
        utils::format_units(value, decimals).map_err(|e| BalanceError::Units(e.to_string()))?;
    Ok(trim_fraction(formatted))
}

fn trim_fraction(formatted: String) -> String {
    match formatted.split_once('.') {
        Some((whole, fraction)) => {
            let fraction = fraction.trim_end_matches('0');
            if fraction.is_empty() {
                format!("{whole}.0")
            } else {
                format!("{whole}.{fraction}")
            }
        }
        None => format!("{formatted}.0"),
    }
}
