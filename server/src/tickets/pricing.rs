//! Derived figures shown next to ticket plans in the catalogue.

use rust_decimal::Decimal;

/// Category label used when neither plan nor service has one.
pub const FALLBACK_CATEGORY: &str = "その他";

/// Price of one session, rounded down to a whole unit.
pub fn price_per_session(price: Decimal, total_sessions: i32) -> Option<Decimal> {
    if total_sessions <= 0 {
        return None;
    }
    Some((price / Decimal::from(total_sessions)).floor())
}

/// Percentage saved against buying every session at the unit price,
/// rounded half up.
pub fn discount_rate(price: Decimal, unit_price: Decimal, total_sessions: i32) -> Option<Decimal> {
    let list_total = unit_price * Decimal::from(total_sessions);
    if list_total <= Decimal::ZERO {
        return None;
    }
    let rate = (Decimal::ONE - price / list_total) * Decimal::ONE_HUNDRED;
    Some((rate + Decimal::new(5, 1)).floor())
}

pub fn plan_category(plan_category: Option<&str>, service_category: Option<&str>) -> String {
    [plan_category, service_category]
        .into_iter()
        .flatten()
        .find(|c| !c.is_empty())
        .unwrap_or(FALLBACK_CATEGORY)
        .to_string()
}
