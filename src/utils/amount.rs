use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use solana_sdk::pubkey::Pubkey;

use crate::error::{LaunchError, Result};

/// Largest `Decimal` scale
const MAX_DECIMALS: u8 = 28;

/// A raw on-chain quantity of one mint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenAmount {
    pub mint: Pubkey,
    pub decimals: u8,
    pub raw: u64,
}

impl TokenAmount {
    pub fn new(mint: Pubkey, decimals: u8, raw: u64) -> Self {
        Self { mint, decimals, raw }
    }

    /// Human units × 10^decimals, truncated toward zero
    pub fn from_ui(mint: Pubkey, decimals: u8, ui_amount: f64) -> Result<Self> {
        let raw = ui_to_raw(ui_amount, decimals)?;
        Ok(Self::new(mint, decimals, raw))
    }

    pub fn ui_amount(&self) -> Decimal {
        let mut value = Decimal::from(self.raw);
        // Decimal scale tops out at 28
        if value.set_scale(u32::from(self.decimals)).is_err() {
            return Decimal::ZERO;
        }
        value
    }
}

/// Convert a human amount to base units
pub fn ui_to_raw(ui_amount: f64, decimals: u8) -> Result<u64> {
    if !ui_amount.is_finite() || ui_amount < 0.0 {
        return Err(LaunchError::Amount(format!(
            "{} is not a non-negative finite amount",
            ui_amount
        )));
    }

    if decimals > MAX_DECIMALS {
        return Err(LaunchError::Amount(format!(
            "{} decimals exceeds the supported maximum of {}",
            decimals, MAX_DECIMALS
        )));
    }

    let value = Decimal::from_f64(ui_amount)
        .ok_or_else(|| LaunchError::Amount(format!("{} cannot be represented", ui_amount)))?;
    let scale = Decimal::from_i128_with_scale(10i128.pow(u32::from(decimals)), 0);

    value
        .checked_mul(scale)
        .and_then(|v| v.trunc().to_u64())
        .ok_or_else(|| {
            LaunchError::Amount(format!(
                "{} with {} decimals overflows u64",
                ui_amount, decimals
            ))
        })
}

/// `ceil(balance × fraction)`, the share of the base balance put into the pool
pub fn fraction_of(balance: u64, fraction: f64) -> Result<u64> {
    if !fraction.is_finite() || !(0.0..=1.0).contains(&fraction) {
        return Err(LaunchError::Amount(format!(
            "fraction {} must be within [0, 1]",
            fraction
        )));
    }

    let fraction = Decimal::from_f64(fraction)
        .ok_or_else(|| LaunchError::Amount(format!("{} cannot be represented", fraction)))?;

    (Decimal::from(balance) * fraction)
        .ceil()
        .to_u64()
        .ok_or_else(|| LaunchError::Amount("base input overflows u64".to_string()))
}

/// Reject the run when the quote input exceeds what the wallet holds
pub fn ensure_sufficient(requested: u64, available: u64) -> Result<()> {
    if requested > available {
        return Err(LaunchError::InsufficientBalance {
            requested,
            available,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::constants::WSOL_MINT;
    use proptest::prelude::*;

    #[test]
    fn test_ui_to_raw_scales_by_decimals() {
        assert_eq!(ui_to_raw(1.5, 9).unwrap(), 1_500_000_000);
        assert_eq!(ui_to_raw(0.01, 6).unwrap(), 10_000);
        assert_eq!(ui_to_raw(3.0, 0).unwrap(), 3);
    }

    #[test]
    fn test_ui_to_raw_rejects_negative_and_nan() {
        assert!(ui_to_raw(-1.0, 9).is_err());
        assert!(ui_to_raw(f64::NAN, 9).is_err());
        assert!(ui_to_raw(f64::INFINITY, 9).is_err());
    }

    #[test]
    fn test_ui_to_raw_rejects_overflow() {
        assert!(ui_to_raw(1e12, 9).is_err());
    }

    #[test]
    fn test_ui_to_raw_rejects_unsupported_decimals() {
        for decimals in [29u8, 30, 39, u8::MAX] {
            assert!(matches!(ui_to_raw(0.0, decimals), Err(LaunchError::Amount(_))));
        }
        assert_eq!(ui_to_raw(0.0, 28).unwrap(), 0);
    }

    #[test]
    fn test_fraction_of_rounds_up() {
        assert_eq!(fraction_of(1_000, 0.5).unwrap(), 500);
        assert_eq!(fraction_of(3, 0.5).unwrap(), 2);
        assert_eq!(fraction_of(1_000, 1.0).unwrap(), 1_000);
        assert!(fraction_of(1_000, 1.5).is_err());
    }

    #[test]
    fn test_token_amount_ui_amount() {
        let amount = TokenAmount::from_ui(WSOL_MINT, 9, 0.25).unwrap();
        assert_eq!(amount.raw, 250_000_000);
        assert_eq!(amount.ui_amount(), Decimal::new(25, 2));
    }

    proptest! {
        #[test]
        fn prop_balance_check_rejects_overdraw(
            ui in 0.0f64..1_000.0,
            decimals in 0u8..=9,
            available in 0u64..2_000_000_000_000,
        ) {
            let requested = ui_to_raw(ui, decimals).unwrap();
            let outcome = ensure_sufficient(requested, available);
            if requested > available {
                let rejected = matches!(
                    outcome,
                    Err(LaunchError::InsufficientBalance { .. })
                );
                prop_assert!(rejected);
            } else {
                prop_assert!(outcome.is_ok());
            }
        }
    }
}
