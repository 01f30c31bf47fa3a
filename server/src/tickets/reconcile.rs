//! Merges regular and limited-offer tickets into one status-annotated list.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::error::TicketError;
use crate::models::ticket::{
    LimitedTicketRow, RegularTicketRow, ServiceSummary, Ticket, TicketStatus, TicketVariant,
};

/// Session length used when no source knows the duration.
pub const DEFAULT_DURATION_MINUTES: i32 = 60;

/// Builds the unified ticket view for one customer, newest purchase first.
///
/// `today` is supplied by the caller; nothing here reads the clock. Rows
/// with a missing purchase or expiry date fail the whole call.
pub fn reconcile(
    regular: &[RegularTicketRow],
    limited: &[LimitedTicketRow],
    today: NaiveDate,
) -> Result<Vec<Ticket>, TicketError> {
    let mut tickets = Vec::with_capacity(regular.len() + limited.len());

    for row in regular {
        tickets.push(from_regular(row, today)?);
    }
    for row in limited {
        tickets.push(from_limited(row, today)?);
    }

    // Stable sort keeps fetch order between equal purchase dates.
    tickets.sort_by(|a, b| b.purchase_date.cmp(&a.purchase_date));

    Ok(tickets)
}

/// Outstanding balance, never below zero even after an overpayment.
pub fn remaining_payment(purchase_price: Decimal, total_paid: Decimal) -> Decimal {
    (purchase_price - total_paid).max(Decimal::ZERO)
}

/// Lifecycle status. Exhausted sessions win over a past expiry date, and a
/// ticket expiring today is still active.
pub fn derive_status(
    sessions_remaining: i32,
    expiry_date: NaiveDate,
    today: NaiveDate,
) -> TicketStatus {
    if sessions_remaining == 0 {
        TicketStatus::UsedUp
    } else if expiry_date < today {
        TicketStatus::Expired
    } else {
        TicketStatus::Active
    }
}

struct Lifecycle {
    purchase_date: NaiveDate,
    expiry_date: NaiveDate,
    remaining_payment: Decimal,
    status: TicketStatus,
}

fn lifecycle(
    ticket_id: Uuid,
    purchase_date: Option<NaiveDate>,
    expiry_date: Option<NaiveDate>,
    sessions_remaining: i32,
    purchase_price: Decimal,
    total_paid: Decimal,
    today: NaiveDate,
) -> Result<Lifecycle, TicketError> {
    let purchase_date = purchase_date.ok_or(TicketError::MalformedInput {
        ticket_id,
        field: "purchase_date",
    })?;
    let expiry_date = expiry_date.ok_or(TicketError::MalformedInput {
        ticket_id,
        field: "expiry_date",
    })?;
    if sessions_remaining < 0 {
        return Err(TicketError::MalformedInput {
            ticket_id,
            field: "sessions_remaining",
        });
    }

    Ok(Lifecycle {
        purchase_date,
        expiry_date,
        remaining_payment: remaining_payment(purchase_price, total_paid),
        status: derive_status(sessions_remaining, expiry_date, today),
    })
}

fn from_regular(row: &RegularTicketRow, today: NaiveDate) -> Result<Ticket, TicketError> {
    let life = lifecycle(
        row.customer_ticket_id,
        row.purchase_date,
        row.expiry_date,
        row.sessions_remaining,
        row.purchase_price,
        row.total_paid,
        today,
    )?;

    Ok(Ticket {
        customer_ticket_id: row.customer_ticket_id,
        customer_id: row.customer_id,
        plan_id: row.plan_id,
        plan_name: row.plan_name.clone(),
        plan_price: Some(row.plan_price),
        total_sessions: Some(row.total_sessions),
        validity_days: row.validity_days,
        sessions_remaining: row.sessions_remaining,
        purchase_date: life.purchase_date,
        expiry_date: life.expiry_date,
        purchase_price: row.purchase_price,
        total_paid: row.total_paid,
        remaining_payment: life.remaining_payment,
        status: life.status,
        service: ServiceSummary {
            service_id: Some(row.service_id),
            service_name: row.service_name.clone(),
            service_category: row.service_category.clone().unwrap_or_default(),
            duration_minutes: row.duration_minutes,
        },
        is_limited: false,
        variant: TicketVariant::Regular,
    })
}

fn from_limited(row: &LimitedTicketRow, today: NaiveDate) -> Result<Ticket, TicketError> {
    let life = lifecycle(
        row.purchase_id,
        row.purchase_date,
        row.expiry_date,
        row.sessions_remaining,
        row.purchase_price,
        row.total_paid,
        today,
    )?;
    let variant = TicketVariant::Limited {
        offer_id: row.offer_id,
        base_plan_id: row.base_plan_id,
    };

    Ok(Ticket {
        customer_ticket_id: row.purchase_id,
        customer_id: row.customer_id,
        plan_id: row.offer_id,
        plan_name: row.offer_name.clone(),
        plan_price: row.special_price,
        total_sessions: row.total_sessions,
        validity_days: row.validity_days,
        sessions_remaining: row.sessions_remaining,
        purchase_date: life.purchase_date,
        expiry_date: life.expiry_date,
        purchase_price: row.purchase_price,
        total_paid: row.total_paid,
        remaining_payment: life.remaining_payment,
        status: life.status,
        service: resolve_service(&service_tiers(row)),
        is_limited: variant.is_limited(),
        variant,
    })
}

/// Partial service details offered by one source. Any field may be unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceCandidate {
    pub service_id: Option<Uuid>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub duration_minutes: Option<i32>,
}

/// The service record reached through the offer's base plan.
pub fn service_tier(row: &LimitedTicketRow) -> ServiceCandidate {
    ServiceCandidate {
        service_id: row.service_id,
        name: row.service_name.clone(),
        category: row.service_category.clone(),
        duration_minutes: row.service_duration_minutes,
    }
}

/// The base plan template itself.
pub fn base_plan_tier(row: &LimitedTicketRow) -> ServiceCandidate {
    ServiceCandidate {
        service_id: row.base_plan_service_id,
        name: row.base_plan_name.clone(),
        ..ServiceCandidate::default()
    }
}

/// Defaults embedded in the offer.
pub fn offer_tier(row: &LimitedTicketRow) -> ServiceCandidate {
    ServiceCandidate {
        name: Some(row.offer_name.clone()),
        duration_minutes: row.offer_duration_minutes,
        ..ServiceCandidate::default()
    }
}

/// Fallback order for limited tickets, most specific first.
pub fn service_tiers(row: &LimitedTicketRow) -> [ServiceCandidate; 3] {
    [service_tier(row), base_plan_tier(row), offer_tier(row)]
}

/// Resolves each field independently, first tier with a value wins.
pub fn resolve_service(tiers: &[ServiceCandidate]) -> ServiceSummary {
    ServiceSummary {
        service_id: tiers.iter().find_map(|t| t.service_id),
        service_name: tiers
            .iter()
            .find_map(|t| t.name.clone())
            .unwrap_or_default(),
        service_category: tiers
            .iter()
            .find_map(|t| t.category.clone())
            .unwrap_or_default(),
        duration_minutes: tiers
            .iter()
            .find_map(|t| t.duration_minutes)
            .unwrap_or(DEFAULT_DURATION_MINUTES),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn yen(amount: i64) -> Decimal {
        Decimal::new(amount, 0)
    }

    fn regular(purchase: NaiveDate, expiry: NaiveDate, sessions: i32) -> RegularTicketRow {
        RegularTicketRow {
            customer_ticket_id: Uuid::new_v4(),
            customer_id: Uuid::nil(),
            plan_id: Uuid::new_v4(),
            sessions_remaining: sessions,
            purchase_date: Some(purchase),
            expiry_date: Some(expiry),
            purchase_price: yen(30000),
            total_paid: yen(10000),
            plan_name: "Cut 5 sessions".to_string(),
            plan_price: yen(30000),
            total_sessions: 5,
            validity_days: None,
            service_id: Uuid::new_v4(),
            service_name: "Cut".to_string(),
            service_category: Some("hair".to_string()),
            duration_minutes: 45,
        }
    }

    fn limited(purchase: NaiveDate, expiry: NaiveDate, sessions: i32) -> LimitedTicketRow {
        LimitedTicketRow {
            purchase_id: Uuid::new_v4(),
            customer_id: Uuid::nil(),
            offer_id: Uuid::new_v4(),
            sessions_remaining: sessions,
            purchase_date: Some(purchase),
            expiry_date: Some(expiry),
            purchase_price: yen(12000),
            total_paid: yen(12000),
            offer_name: "Summer spa".to_string(),
            special_price: Some(yen(12000)),
            total_sessions: Some(3),
            validity_days: Some(90),
            offer_duration_minutes: None,
            base_plan_id: None,
            base_plan_name: None,
            base_plan_service_id: None,
            service_id: None,
            service_name: None,
            service_category: None,
            service_duration_minutes: None,
        }
    }

    #[test]
    fn test_remaining_payment_clamps_at_zero() {
        assert_eq!(remaining_payment(yen(10000), yen(4000)), yen(6000));
        assert_eq!(remaining_payment(yen(10000), yen(10000)), Decimal::ZERO);
        assert_eq!(remaining_payment(yen(10000), yen(15000)), Decimal::ZERO);
    }

    #[test]
    fn test_status_priority() {
        let today = date(2025, 7, 1);
        assert_eq!(derive_status(0, date(2025, 1, 1), today), TicketStatus::UsedUp);
        assert_eq!(derive_status(0, date(2026, 1, 1), today), TicketStatus::UsedUp);
        assert_eq!(derive_status(2, date(2025, 6, 30), today), TicketStatus::Expired);
        assert_eq!(derive_status(2, today, today), TicketStatus::Active);
        assert_eq!(derive_status(2, date(2026, 1, 1), today), TicketStatus::Active);
    }

    #[test]
    fn test_used_up_beats_expired() {
        let today = date(2025, 7, 1);
        let row = regular(date(2024, 1, 1), date(2025, 1, 31), 0);
        let tickets = reconcile(&[row], &[], today).unwrap();
        assert_eq!(tickets[0].status, TicketStatus::UsedUp);
    }

    #[test]
    fn test_merged_list_is_newest_first() {
        let today = date(2025, 7, 1);
        let regular_row = regular(date(2025, 5, 1), date(2026, 5, 31), 3);
        let limited_row = limited(date(2025, 6, 1), date(2025, 8, 30), 2);
        let limited_id = limited_row.purchase_id;

        let tickets = reconcile(&[regular_row], &[limited_row], today).unwrap();

        assert_eq!(tickets.len(), 2);
        assert_eq!(tickets[0].customer_ticket_id, limited_id);
        assert!(tickets[0].is_limited);
        assert!(!tickets[1].is_limited);
        assert_eq!(tickets[1].variant, TicketVariant::Regular);
    }

    #[test]
    fn test_equal_purchase_dates_keep_fetch_order() {
        let today = date(2025, 7, 1);
        let first = regular(date(2025, 5, 1), date(2026, 5, 31), 3);
        let second = regular(date(2025, 5, 1), date(2026, 5, 31), 3);
        let ids = [first.customer_ticket_id, second.customer_ticket_id];

        let tickets = reconcile(&[first, second], &[], today).unwrap();
        assert_eq!(tickets[0].customer_ticket_id, ids[0]);
        assert_eq!(tickets[1].customer_ticket_id, ids[1]);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let today = date(2025, 7, 1);
        let regular_rows = vec![
            regular(date(2025, 5, 1), date(2026, 5, 31), 3),
            regular(date(2024, 2, 1), date(2025, 2, 28), 1),
        ];
        let limited_rows = vec![limited(date(2025, 6, 1), date(2025, 8, 30), 0)];

        let once = reconcile(&regular_rows, &limited_rows, today).unwrap();
        let twice = reconcile(&regular_rows, &limited_rows, today).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_missing_dates_fail_fast() {
        let today = date(2025, 7, 1);

        let mut row = regular(date(2025, 5, 1), date(2026, 5, 31), 3);
        row.expiry_date = None;
        let id = row.customer_ticket_id;
        assert_eq!(
            reconcile(&[row], &[], today).unwrap_err(),
            TicketError::MalformedInput {
                ticket_id: id,
                field: "expiry_date"
            }
        );

        let mut row = limited(date(2025, 6, 1), date(2025, 8, 30), 2);
        row.purchase_date = None;
        let id = row.purchase_id;
        assert_eq!(
            reconcile(&[], &[row], today).unwrap_err(),
            TicketError::MalformedInput {
                ticket_id: id,
                field: "purchase_date"
            }
        );
    }

    #[test]
    fn test_negative_sessions_are_malformed() {
        let row = regular(date(2025, 5, 1), date(2026, 5, 31), -1);
        let err = reconcile(&[row], &[], date(2025, 7, 1)).unwrap_err();
        assert!(matches!(
            err,
            TicketError::MalformedInput {
                field: "sessions_remaining",
                ..
            }
        ));
    }

    #[test]
    fn test_service_tier_wins_when_present() {
        let mut row = limited(date(2025, 6, 1), date(2025, 8, 30), 2);
        let service_id = Uuid::new_v4();
        row.service_id = Some(service_id);
        row.service_name = Some("Head spa".to_string());
        row.service_category = Some("spa".to_string());
        row.service_duration_minutes = Some(90);
        row.base_plan_name = Some("Head spa 3x".to_string());
        row.base_plan_service_id = Some(Uuid::new_v4());
        row.offer_duration_minutes = Some(30);

        let resolved = resolve_service(&service_tiers(&row));
        assert_eq!(resolved.service_id, Some(service_id));
        assert_eq!(resolved.service_name, "Head spa");
        assert_eq!(resolved.service_category, "spa");
        assert_eq!(resolved.duration_minutes, 90);
    }

    #[test]
    fn test_base_plan_tier_fills_name_and_id() {
        let mut row = limited(date(2025, 6, 1), date(2025, 8, 30), 2);
        let plan_service = Uuid::new_v4();
        row.base_plan_name = Some("Color 3x".to_string());
        row.base_plan_service_id = Some(plan_service);
        row.offer_duration_minutes = Some(75);

        let resolved = resolve_service(&service_tiers(&row));
        assert_eq!(resolved.service_id, Some(plan_service));
        assert_eq!(resolved.service_name, "Color 3x");
        assert_eq!(resolved.service_category, "");
        assert_eq!(resolved.duration_minutes, 75);
    }

    #[test]
    fn test_offer_tier_and_defaults() {
        let row = limited(date(2025, 6, 1), date(2025, 8, 30), 2);

        let resolved = resolve_service(&service_tiers(&row));
        assert_eq!(resolved.service_id, None);
        assert_eq!(resolved.service_name, "Summer spa");
        assert_eq!(resolved.duration_minutes, DEFAULT_DURATION_MINUTES);

        assert_eq!(offer_tier(&row).name.as_deref(), Some("Summer spa"));
        assert_eq!(base_plan_tier(&row), ServiceCandidate::default());
    }

    #[test]
    fn test_limited_ticket_serializes_with_provenance() {
        let mut row = limited(date(2025, 6, 1), date(2025, 8, 30), 2);
        let base_plan = Uuid::new_v4();
        row.base_plan_id = Some(base_plan);
        let offer_id = row.offer_id;

        let tickets = reconcile(&[], &[row], date(2025, 7, 1)).unwrap();
        let json = serde_json::to_value(&tickets[0]).unwrap();

        assert_eq!(json["ticket_type"], "limited");
        assert_eq!(json["is_limited"], true);
        assert_eq!(json["status"], "active");
        assert_eq!(json["limited_offer_id"], offer_id.to_string());
        assert_eq!(json["base_plan_id"], base_plan.to_string());
        assert_eq!(json["duration_minutes"], 60);
        assert_eq!(json["purchase_date"], "2025-06-01");
    }

    #[test]
    fn test_regular_ticket_serializes_used_up_status() {
        let row = regular(date(2025, 5, 1), date(2026, 5, 31), 0);
        let tickets = reconcile(&[row], &[], date(2025, 7, 1)).unwrap();
        let json = serde_json::to_value(&tickets[0]).unwrap();

        assert_eq!(json["ticket_type"], "regular");
        assert_eq!(json["status"], "used_up");
        assert_eq!(json["service_category"], "hair");
        assert!(json.get("limited_offer_id").is_none());
    }
}
