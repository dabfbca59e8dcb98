//! Price schedule for the voucher series.
//!
//! The series is priced by sequence position: the n-th voucher sold costs the
//! n-th tier. Positions past the end of the table stay on the last tier. One
//! schedule is loaded at startup and shared by everything that needs a price,
//! so display and verification can never disagree.

use crate::TokenId;
use alloy::primitives::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when building a price schedule.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PricingError {
	#[error("Price schedule must contain at least one tier")]
	EmptySchedule,
	#[error("Tier {index} has non-positive amount {amount}")]
	NonPositiveTier { index: usize, amount: Decimal },
}

/// Ordered table of required payment amounts, in whole token units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSchedule {
	tiers: Vec<Decimal>,
}

impl PriceSchedule {
	pub fn new(tiers: Vec<Decimal>) -> Result<Self, PricingError> {
		if tiers.is_empty() {
			return Err(PricingError::EmptySchedule);
		}
		if let Some((index, amount)) = tiers
			.iter()
			.enumerate()
			.find(|(_, amount)| **amount <= Decimal::ZERO)
		{
			return Err(PricingError::NonPositiveTier {
				index,
				amount: *amount,
			});
		}
		Ok(Self { tiers })
	}

	pub fn tiers(&self) -> &[Decimal] {
		&self.tiers
	}

	/// Number of distinct price positions in the series.
	pub fn series_length(&self) -> usize {
		self.tiers.len()
	}

	/// Amount required for the given token id.
	///
	/// Ids are 1-based. Anything past the table is capped at the last tier and
	/// id 0 is treated as the first position.
	pub fn expected_amount(&self, token_id: TokenId) -> Decimal {
		let position = usize::try_from(token_id.saturating_sub(1)).unwrap_or(usize::MAX);
		let index = position.min(self.tiers.len() - 1);
		self.tiers[index]
	}
}

/// Converts a whole-unit amount into token base units.
///
/// Fractional digits beyond `decimals` are truncated. Returns `None` for
/// negative amounts or on overflow.
pub fn to_base_units(amount: Decimal, decimals: u8) -> Option<U256> {
	if amount.is_sign_negative() && !amount.is_zero() {
		return None;
	}

	let mantissa = U256::from(amount.mantissa().unsigned_abs());
	let scale = amount.scale();
	let decimals = u32::from(decimals);
	let ten = U256::from(10u8);

	if scale <= decimals {
		mantissa.checked_mul(ten.pow(U256::from(decimals - scale)))
	} else {
		Some(mantissa / ten.pow(U256::from(scale - decimals)))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn schedule() -> PriceSchedule {
		PriceSchedule::new(
			[4450, 8900, 17800, 35600, 71150]
				.into_iter()
				.map(Decimal::from)
				.collect(),
		)
		.unwrap()
	}

	#[test]
	fn test_expected_amount_by_position() {
		let schedule = schedule();
		assert_eq!(schedule.expected_amount(1), Decimal::from(4450));
		assert_eq!(schedule.expected_amount(2), Decimal::from(8900));
		assert_eq!(schedule.expected_amount(5), Decimal::from(71150));
	}

	#[test]
	fn test_expected_amount_is_capped_at_last_tier() {
		let schedule = schedule();
		assert_eq!(schedule.expected_amount(6), Decimal::from(71150));
		assert_eq!(schedule.expected_amount(u64::MAX), Decimal::from(71150));
		assert_eq!(schedule.expected_amount(0), Decimal::from(4450));
	}

	#[test]
	fn test_schedule_rejects_bad_tiers() {
		assert_eq!(
			PriceSchedule::new(vec![]).unwrap_err(),
			PricingError::EmptySchedule
		);
		assert!(matches!(
			PriceSchedule::new(vec![Decimal::from(10), Decimal::ZERO]),
			Err(PricingError::NonPositiveTier { index: 1, .. })
		));
	}

	#[test]
	fn test_to_base_units() {
		let wei = U256::from(10u8).pow(U256::from(18u8));

		assert_eq!(
			to_base_units(Decimal::from(4450), 18),
			Some(U256::from(4450u64) * wei)
		);
		// 0.5 tokens
		assert_eq!(
			to_base_units(Decimal::new(5, 1), 18),
			Some(wei / U256::from(2u8))
		);
		// Digits past the token precision are dropped
		assert_eq!(to_base_units(Decimal::new(1999, 3), 2), Some(U256::from(199u64)));
		assert_eq!(to_base_units(Decimal::from(-1), 18), None);
	}
}
