use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tickets::purchase::PaymentMethod;
use crate::utils::error::AppError;

/// Body of `POST /api/ticket-purchases`.
#[derive(Debug, Clone, Deserialize)]
pub struct TicketPurchaseRequest {
    pub customer_id: Option<Uuid>,
    pub plan_id: Option<Uuid>,
    pub purchase_price: Option<Decimal>,
    pub payment_amount: Option<Decimal>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    pub cash_amount: Option<Decimal>,
    pub card_amount: Option<Decimal>,
    pub staff_id: Option<Uuid>,
    #[serde(default)]
    pub use_immediately: bool,
    pub related_payment_id: Option<Uuid>,
    pub notes: Option<String>,
}

/// Body of `POST /api/limited-offer-purchases`.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitedPurchaseRequest {
    pub customer_id: Option<Uuid>,
    pub offer_id: Option<Uuid>,
    pub purchase_price: Option<Decimal>,
    pub payment_amount: Option<Decimal>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    pub cash_amount: Option<Decimal>,
    pub card_amount: Option<Decimal>,
    pub staff_id: Option<Uuid>,
    #[serde(default)]
    pub use_immediately: bool,
    pub related_payment_id: Option<Uuid>,
    pub notes: Option<String>,
}

/// Body of `PATCH /api/ticket-purchases`.
#[derive(Debug, Clone, Deserialize)]
pub struct AdditionalPaymentRequest {
    pub customer_ticket_id: Option<Uuid>,
    pub payment_amount: Option<Decimal>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
}

/// Fields shared by both kinds of purchase once required ids are checked.
#[derive(Debug, Clone)]
pub struct PurchaseOrder {
    pub customer_id: Uuid,
    /// Plan id for regular tickets, offer id for limited ones.
    pub product_id: Uuid,
    pub staff_id: Uuid,
    pub purchase_price: Option<Decimal>,
    pub payment_amount: Decimal,
    pub payment_method: PaymentMethod,
    pub cash_amount: Option<Decimal>,
    pub card_amount: Option<Decimal>,
    pub use_immediately: bool,
    pub related_payment_id: Option<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AdditionalPayment {
    pub customer_ticket_id: Uuid,
    pub payment_amount: Decimal,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, AppError> {
    value.ok_or_else(|| AppError::ValidationError(format!("{} is required", field)))
}

fn non_negative(value: Option<Decimal>, field: &str) -> Result<Option<Decimal>, AppError> {
    match value {
        Some(amount) if amount < Decimal::ZERO => Err(AppError::ValidationError(format!(
            "{} must not be negative",
            field
        ))),
        other => Ok(other),
    }
}

impl TicketPurchaseRequest {
    pub fn validate(self) -> Result<PurchaseOrder, AppError> {
        Ok(PurchaseOrder {
            customer_id: required(self.customer_id, "customer_id")?,
            product_id: required(self.plan_id, "plan_id")?,
            payment_amount: required(
                non_negative(self.payment_amount, "payment_amount")?,
                "payment_amount",
            )?,
            staff_id: required(self.staff_id, "staff_id")?,
            purchase_price: non_negative(self.purchase_price, "purchase_price")?,
            payment_method: self.payment_method,
            cash_amount: non_negative(self.cash_amount, "cash_amount")?,
            card_amount: non_negative(self.card_amount, "card_amount")?,
            use_immediately: self.use_immediately,
            related_payment_id: self.related_payment_id,
            notes: self.notes,
        })
    }
}

impl LimitedPurchaseRequest {
    pub fn validate(self) -> Result<PurchaseOrder, AppError> {
        Ok(PurchaseOrder {
            customer_id: required(self.customer_id, "customer_id")?,
            product_id: required(self.offer_id, "offer_id")?,
            payment_amount: required(
                non_negative(self.payment_amount, "payment_amount")?,
                "payment_amount",
            )?,
            staff_id: required(self.staff_id, "staff_id")?,
            purchase_price: non_negative(self.purchase_price, "purchase_price")?,
            payment_method: self.payment_method,
            cash_amount: non_negative(self.cash_amount, "cash_amount")?,
            card_amount: non_negative(self.card_amount, "card_amount")?,
            use_immediately: self.use_immediately,
            related_payment_id: self.related_payment_id,
            notes: self.notes,
        })
    }
}

impl AdditionalPaymentRequest {
    pub fn validate(self) -> Result<AdditionalPayment, AppError> {
        Ok(AdditionalPayment {
            customer_ticket_id: required(self.customer_ticket_id, "customer_ticket_id")?,
            payment_amount: required(self.payment_amount, "payment_amount")?,
            payment_method: self.payment_method,
            notes: self.notes,
        })
    }
}

/// Returned after a ticket or limited offer is sold.
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseReceipt {
    pub customer_ticket_id: Uuid,
    pub payment_id: Uuid,
    pub plan_name: String,
    pub service_name: Option<String>,
    pub total_sessions: i32,
    pub sessions_remaining: i32,
    pub full_price: Decimal,
    pub paid_amount: Decimal,
    pub remaining_amount: Decimal,
    pub purchase_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub is_fully_paid: bool,
    pub used_immediately: bool,
}

/// Returned after an installment on an existing ticket.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentReceipt {
    pub customer_ticket_id: Uuid,
    pub plan_name: String,
    pub full_price: Decimal,
    pub total_paid: Decimal,
    pub remaining_amount: Decimal,
    pub is_fully_paid: bool,
}
