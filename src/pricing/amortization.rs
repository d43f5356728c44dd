//! Plan-fee amortization over the 24-month contract window
//!
//! Subscribers are only bound to the opening plan for the carrier's
//! mandatory-use period (의무사용기간); afterwards the fee reverts to a floor
//! plan. The effective monthly plan price is the length-weighted average of
//! the two segments over the 730-day contract. 선약 applies its flat 25%
//! plan discount to both segments.

use crate::tables::data::{Carrier, SupportType};

/// Device installment term
pub const CONTRACT_MONTHS: i64 = 24;

/// 24 months expressed in days, the unit mandatory periods are published in
pub const CONTRACT_DAYS: i64 = 730;

/// Universal fallback plan used when the subscribed fee undercuts the
/// carrier minimum (원/month)
pub const STANDARD_PLAN_FEE: i64 = 12_100;

/// 선약 keeps 75% of the plan fee (25% discount)
pub const CHOICE_DISCOUNT_FACTOR: f64 = 0.75;

/// Cheapest plan the carrier lets subscribers downgrade to (원/month)
pub fn min_plan_fee(carrier: Carrier) -> i64 {
    match carrier {
        Carrier::Sk => 43_000,
        Carrier::Kt => 49_000,
        Carrier::Lg => 47_000,
    }
}

/// Mandatory-use period in days for the carrier and discount scheme
pub fn mandatory_days(carrier: Carrier, support_type: SupportType) -> i64 {
    match support_type {
        SupportType::Announce => 188,
        SupportType::Choice => match carrier {
            Carrier::Sk | Carrier::Kt => 130,
            Carrier::Lg => 95,
        },
    }
}

/// Effective monthly plan price over the contract, rounded to the won.
///
/// During the mandatory period the subscribed fee applies; for the remaining
/// days the fee reverts to the carrier minimum, or to the standard fallback
/// plan when the subscribed fee was already below the minimum.
pub fn month_rate_plan_price(
    carrier: Carrier,
    support_type: SupportType,
    subscribed_fee: i64,
) -> i64 {
    let mandatory = mandatory_days(carrier, support_type);
    let remaining = CONTRACT_DAYS - mandatory;
    let min_fee = min_plan_fee(carrier);

    let remaining_base = if subscribed_fee < min_fee {
        STANDARD_PLAN_FEE
    } else {
        min_fee
    };

    let discount = match support_type {
        SupportType::Choice => CHOICE_DISCOUNT_FACTOR,
        SupportType::Announce => 1.0,
    };
    let mandatory_fee = subscribed_fee as f64 * discount;
    let remaining_fee = remaining_base as f64 * discount;

    let weighted =
        (mandatory_fee * mandatory as f64 + remaining_fee * remaining as f64) / CONTRACT_DAYS as f64;
    weighted.round() as i64
}
