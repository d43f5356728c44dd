//! Margin policy: a 40% default rate with a guaranteed absolute floor
//!
//! The floor holds regardless of how small or negative the cost-side
//! principal is, so the business never sells below a fixed minimum markup.
//! The rate is back-derived whenever the floor binds.

/// Default margin rate applied to the cost-side installment principal
pub const DEFAULT_MARGIN_RATE: f64 = 0.40;

/// Guaranteed minimum margin per sale (원)
pub const MIN_MARGIN_AMOUNT: i64 = 400_000;

/// Resolved margin for one sale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margin {
    /// Effective rate; back-derived from the amount when the floor binds
    pub rate: f64,
    /// Absolute margin in won
    pub amount: i64,
}

/// Compute the margin for a cost-side installment principal.
///
/// A zero principal has no base to apply a rate to: the default rate is
/// reported with a zero amount. Otherwise the amount is 40% of the
/// principal's magnitude, floored at 400,000원.
pub fn margin_for(origin_installment_principal: i64) -> Margin {
    if origin_installment_principal == 0 {
        return Margin {
            rate: DEFAULT_MARGIN_RATE,
            amount: 0,
        };
    }

    let base = origin_installment_principal.abs() as f64;
    let amount = (base * DEFAULT_MARGIN_RATE).round().max(MIN_MARGIN_AMOUNT as f64) as i64;
    Margin {
        rate: amount as f64 / base,
        amount,
    }
}
