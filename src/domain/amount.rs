use crate::error::{LedgerError, ValidationError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A strictly positive amount in an asset's smallest unit.
///
/// Ensures that deposit and settlement amounts are never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u128", into = "u128")]
pub struct Amount(u128);

impl Amount {
    pub fn new(value: u128) -> Result<Self, ValidationError> {
        if value > 0 {
            Ok(Self(value))
        } else {
            Err(ValidationError::ZeroAmount)
        }
    }

    pub fn value(&self) -> u128 {
        self.0
    }
}

impl TryFrom<u128> for Amount {
    type Error = ValidationError;

    fn try_from(value: u128) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for u128 {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

/// Converts `amount` between fixed-point precisions.
///
/// Scaling up multiplies by the power of ten; scaling down floors.
pub fn scale_amount(amount: u128, from_decimals: u32, to_decimals: u32) -> Result<u128, LedgerError> {
    let overflow = || ValidationError::ScaleOverflow {
        from: from_decimals,
        to: to_decimals,
    };
    match from_decimals.cmp(&to_decimals) {
        std::cmp::Ordering::Equal => Ok(amount),
        std::cmp::Ordering::Less => {
            let factor = 10u128
                .checked_pow(to_decimals - from_decimals)
                .ok_or_else(overflow)?;
            Ok(amount.checked_mul(factor).ok_or_else(overflow)?)
        }
        std::cmp::Ordering::Greater => {
            // 10^39 exceeds u128, and anything divided by it floors to zero.
            match 10u128.checked_pow(from_decimals - to_decimals) {
                Some(factor) => Ok(amount / factor),
                None => Ok(0),
            }
        }
    }
}

/// Renders a base-unit amount as a human-readable decimal, e.g. `1500000` at
/// 6 decimals becomes `1.5`.
pub fn format_units(amount: u128, decimals: u32) -> String {
    i128::try_from(amount)
        .ok()
        .and_then(|v| Decimal::try_from_i128_with_scale(v, decimals).ok())
        .map(|d| d.normalize().to_string())
        .unwrap_or_else(|| amount.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_validation() {
        assert!(Amount::new(1).is_ok());
        assert_eq!(Amount::new(0), Err(ValidationError::ZeroAmount));
    }

    #[test]
    fn test_scale_up() {
        assert_eq!(
            scale_amount(1_000_000, 6, 18).unwrap(),
            1_000_000_000_000_000_000
        );
        assert_eq!(scale_amount(42, 6, 6).unwrap(), 42);
    }

    #[test]
    fn test_scale_down_floors() {
        assert_eq!(scale_amount(999_999_999_999_999_999, 18, 6).unwrap(), 999_999);
        assert_eq!(scale_amount(1, 18, 6).unwrap(), 0);
        assert_eq!(scale_amount(u128::MAX, 60, 0).unwrap(), 0);
    }

    #[test]
    fn test_scale_round_trip_on_exact_multiples() {
        for x in [0u128, 1, 7, 1_000_000, 123_456_789] {
            let up = scale_amount(x, 6, 18).unwrap();
            assert_eq!(scale_amount(up, 18, 6).unwrap(), x);
        }
    }

    #[test]
    fn test_scale_overflow() {
        let err = scale_amount(u128::MAX, 6, 18).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Validation(ValidationError::ScaleOverflow { .. })
        ));
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(1_500_000, 6), "1.5");
        assert_eq!(format_units(0, 6), "0");
        assert_eq!(format_units(42, 0), "42");
    }
}
