//! Largest-remainder allocation of a total into minor-unit portions.
//!
//! Every function here returns portions that sum exactly to the total once
//! the total is rounded to `minor_units`: no minor unit is lost or invented.

use rust_decimal::prelude::*;

use super::error::ValidationError;

/// Allocation utility for dividing totals among participants.
pub struct AllocationUtil;

impl AllocationUtil {
    /// Splits `total` evenly across `count` recipients.
    ///
    /// Leftover minor units go one each to the first recipients in order.
    ///
    /// ```
    /// use rust_decimal_macros::dec;
    /// use tally_core::split::AllocationUtil;
    ///
    /// // 100 / 3 = [33.34, 33.33, 33.33]
    /// let portions = AllocationUtil::allocate_equal(dec!(100), 3, 2).unwrap();
    /// assert_eq!(portions, vec![dec!(33.34), dec!(33.33), dec!(33.33)]);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `AmountOutOfRange` if an intermediate value overflows.
    pub fn allocate_equal(
        total: Decimal,
        count: usize,
        minor_units: u32,
    ) -> Result<Vec<Decimal>, ValidationError> {
        if count == 0 {
            return Ok(vec![]);
        }
        Self::allocate_by_weights(total, &vec![Decimal::ONE; count], minor_units)
    }

    /// Splits `total` in proportion to `weights`.
    ///
    /// Each portion is first truncated to `minor_units`; the leftover units go
    /// to the portions with the largest truncated fraction, earlier entries
    /// winning ties. Returns an empty vector when the weights are empty or sum
    /// to zero.
    ///
    /// # Errors
    ///
    /// Returns `AmountOutOfRange` if the weights or a weighted portion
    /// overflow.
    pub fn allocate_by_weights(
        total: Decimal,
        weights: &[Decimal],
        minor_units: u32,
    ) -> Result<Vec<Decimal>, ValidationError> {
        let weight_sum = Self::checked_sum(weights.iter().copied())?;
        if weights.is_empty() || weight_sum <= Decimal::ZERO {
            return Ok(vec![]);
        }

        let unit = Decimal::new(1, minor_units);
        let total = total.round_dp_with_strategy(minor_units, RoundingStrategy::MidpointNearestEven);

        let exact = weights
            .iter()
            .map(|w| {
                total
                    .checked_mul(*w)
                    .and_then(|x| x.checked_div(weight_sum))
                    .ok_or(ValidationError::AmountOutOfRange)
            })
            .collect::<Result<Vec<Decimal>, _>>()?;
        let mut portions: Vec<Decimal> = exact
            .iter()
            .map(|e| e.round_dp_with_strategy(minor_units, RoundingStrategy::ToZero))
            .collect();

        let allocated = Self::checked_sum(portions.iter().copied())?;
        let leftover_units = total
            .checked_sub(allocated)
            .and_then(|rest| rest.checked_div(unit))
            .ok_or(ValidationError::AmountOutOfRange)?
            .round_dp_with_strategy(0, RoundingStrategy::ToZero)
            .to_usize()
            .unwrap_or(0);

        if leftover_units == 0 {
            return Ok(portions);
        }

        // stable sort keeps listing order among equal fractions
        let mut by_fraction: Vec<(usize, Decimal)> = exact
            .iter()
            .zip(&portions)
            .map(|(e, p)| *e - *p)
            .enumerate()
            .collect();
        by_fraction.sort_by(|a, b| b.1.cmp(&a.1));

        for (idx, _) in by_fraction.into_iter().take(leftover_units) {
            portions[idx] += unit;
        }

        Ok(portions)
    }

    /// Sums `amounts`, failing instead of overflowing.
    ///
    /// # Errors
    ///
    /// Returns `AmountOutOfRange` if the sum does not fit a `Decimal`.
    pub fn checked_sum(
        amounts: impl IntoIterator<Item = Decimal>,
    ) -> Result<Decimal, ValidationError> {
        amounts.into_iter().try_fold(Decimal::ZERO, |acc, amount| {
            acc.checked_add(amount).ok_or(ValidationError::AmountOutOfRange)
        })
    }
}
