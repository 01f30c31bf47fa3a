use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A regular (standard plan) ticket as loaded from `customer_tickets`,
/// joined with its plan and service, with installments already summed.
#[derive(Debug, Clone, FromRow)]
pub struct RegularTicketRow {
    pub customer_ticket_id: Uuid,
    pub customer_id: Uuid,
    pub plan_id: Uuid,
    pub sessions_remaining: i32,
    pub purchase_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub purchase_price: Decimal,
    pub total_paid: Decimal,
    pub plan_name: String,
    pub plan_price: Decimal,
    pub total_sessions: i32,
    pub validity_days: Option<i32>,
    pub service_id: Uuid,
    pub service_name: String,
    pub service_category: Option<String>,
    pub duration_minutes: i32,
}

/// A limited-offer ticket as loaded from `limited_ticket_purchases`.
///
/// Service details are kept per source (the base plan's service, the base
/// plan itself, the offer) so the reconciler can pick the first one present.
#[derive(Debug, Clone, FromRow)]
pub struct LimitedTicketRow {
    pub purchase_id: Uuid,
    pub customer_id: Uuid,
    pub offer_id: Uuid,
    pub sessions_remaining: i32,
    pub purchase_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub purchase_price: Decimal,
    pub total_paid: Decimal,
    pub offer_name: String,
    pub special_price: Option<Decimal>,
    pub total_sessions: Option<i32>,
    pub validity_days: Option<i32>,
    pub offer_duration_minutes: Option<i32>,
    pub base_plan_id: Option<Uuid>,
    pub base_plan_name: Option<String>,
    pub base_plan_service_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
    pub service_name: Option<String>,
    pub service_category: Option<String>,
    pub service_duration_minutes: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Active,
    Expired,
    UsedUp,
}

/// Where a ticket came from. Limited tickets carry their offer and the
/// optional base plan they were templated on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "ticket_type", rename_all = "lowercase")]
pub enum TicketVariant {
    Regular,
    Limited {
        #[serde(rename = "limited_offer_id")]
        offer_id: Uuid,
        base_plan_id: Option<Uuid>,
    },
}

impl TicketVariant {
    pub fn is_limited(&self) -> bool {
        matches!(self, TicketVariant::Limited { .. })
    }
}

/// Service fields resolved for display and booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceSummary {
    pub service_id: Option<Uuid>,
    pub service_name: String,
    pub service_category: String,
    pub duration_minutes: i32,
}

/// One entry of a customer's unified ticket list. `status` and
/// `remaining_payment` are derived on every read and never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ticket {
    pub customer_ticket_id: Uuid,
    pub customer_id: Uuid,
    pub plan_id: Uuid,
    pub plan_name: String,
    pub plan_price: Option<Decimal>,
    pub total_sessions: Option<i32>,
    pub validity_days: Option<i32>,
    pub sessions_remaining: i32,
    pub purchase_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub purchase_price: Decimal,
    pub total_paid: Decimal,
    pub remaining_payment: Decimal,
    pub status: TicketStatus,
    #[serde(flatten)]
    pub service: ServiceSummary,
    pub is_limited: bool,
    #[serde(flatten)]
    pub variant: TicketVariant,
}

/// Active limited-offer purchase, as offered for booking.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LimitedPurchase {
    pub purchase_id: Uuid,
    pub offer_id: Uuid,
    pub offer_name: String,
    pub description: Option<String>,
    pub service_id: Option<Uuid>,
    pub service_name: Option<String>,
    pub base_plan_id: Option<Uuid>,
    pub base_plan_name: Option<String>,
    pub total_sessions: Option<i32>,
    pub sessions_remaining: i32,
    pub purchase_price: Decimal,
    pub special_price: Option<Decimal>,
    pub purchase_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub is_active: bool,
}
