//! Rules applied when a ticket is sold or paid down.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::TicketError;
use super::expiry::calculate_expiry_date;

/// Validity used for limited offers that do not configure their own.
pub const DEFAULT_LIMITED_VALIDITY_DAYS: i32 = 180;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
    Mixed,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Mixed => "mixed",
        }
    }
}

/// How a payment divides between the cash drawer and card terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenderSplit {
    pub cash: Decimal,
    pub card: Decimal,
}

pub fn split_tender(
    method: PaymentMethod,
    amount: Decimal,
    cash: Option<Decimal>,
    card: Option<Decimal>,
) -> TenderSplit {
    match method {
        PaymentMethod::Cash => TenderSplit {
            cash: amount,
            card: Decimal::ZERO,
        },
        PaymentMethod::Card => TenderSplit {
            cash: Decimal::ZERO,
            card: amount,
        },
        PaymentMethod::Mixed => TenderSplit {
            cash: cash.unwrap_or_default(),
            card: card.unwrap_or_default(),
        },
    }
}

/// Sessions left on a new ticket. Using the ticket right away consumes one.
pub fn initial_sessions(total_sessions: i32, use_immediately: bool) -> Result<i32, TicketError> {
    if total_sessions <= 0 {
        return Err(TicketError::InvalidArgument(format!(
            "total_sessions must be positive (got {})",
            total_sessions
        )));
    }
    Ok(if use_immediately {
        total_sessions - 1
    } else {
        total_sessions
    })
}

/// Validates an installment and returns the balance left after it.
pub fn check_installment(
    full_price: Decimal,
    total_paid: Decimal,
    amount: Decimal,
) -> Result<Decimal, TicketError> {
    if amount <= Decimal::ZERO {
        return Err(TicketError::InvalidArgument(format!(
            "payment_amount must be positive (got {})",
            amount
        )));
    }
    let remaining = full_price - total_paid;
    if amount > remaining {
        return Err(TicketError::Overpayment {
            remaining,
            attempted: amount,
        });
    }
    Ok(remaining - amount)
}

/// Validates the payment taken at purchase time, which may be zero.
pub fn check_initial_payment(full_price: Decimal, amount: Decimal) -> Result<Decimal, TicketError> {
    if full_price < Decimal::ZERO {
        return Err(TicketError::InvalidArgument(format!(
            "purchase_price must not be negative (got {})",
            full_price
        )));
    }
    if amount.is_zero() {
        return Ok(full_price);
    }
    check_installment(full_price, Decimal::ZERO, amount)
}

/// Validity days for a limited-offer purchase; unset or zero means the
/// offer default.
pub fn limited_validity_days(configured: Option<i32>) -> i32 {
    match configured {
        Some(days) if days != 0 => days,
        _ => DEFAULT_LIMITED_VALIDITY_DAYS,
    }
}

/// What is being sold: a regular plan or a limited offer, reduced to the
/// figures that drive the sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaleTerms {
    pub list_price: Option<Decimal>,
    pub total_sessions: Option<i32>,
    pub validity_days: Option<i32>,
}

impl SaleTerms {
    pub fn for_plan(price: Decimal, total_sessions: i32, validity_days: Option<i32>) -> Self {
        Self {
            list_price: Some(price),
            total_sessions: Some(total_sessions),
            validity_days,
        }
    }

    /// Offers without their own validity fall back to
    /// `DEFAULT_LIMITED_VALIDITY_DAYS`.
    pub fn for_offer(
        special_price: Option<Decimal>,
        total_sessions: Option<i32>,
        validity_days: Option<i32>,
    ) -> Self {
        Self {
            list_price: special_price,
            total_sessions,
            validity_days: Some(limited_validity_days(validity_days)),
        }
    }
}

/// Values written for a new ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaleSchedule {
    pub full_price: Decimal,
    pub remaining_amount: Decimal,
    pub expiry_date: NaiveDate,
    pub total_sessions: i32,
    pub sessions_remaining: i32,
}

/// Settles price, balance, expiry and sessions for a sale on
/// `purchase_date`. An explicit `price_override` beats the list price.
pub fn schedule_sale(
    terms: &SaleTerms,
    price_override: Option<Decimal>,
    payment_amount: Decimal,
    use_immediately: bool,
    purchase_date: NaiveDate,
) -> Result<SaleSchedule, TicketError> {
    let full_price = price_override
        .or(terms.list_price)
        .ok_or_else(|| TicketError::InvalidArgument("no price is configured".to_string()))?;
    let total_sessions = terms.total_sessions.ok_or_else(|| {
        TicketError::InvalidArgument("no session count is configured".to_string())
    })?;

    Ok(SaleSchedule {
        full_price,
        remaining_amount: check_initial_payment(full_price, payment_amount)?,
        expiry_date: calculate_expiry_date(purchase_date, terms.validity_days)?,
        total_sessions,
        sessions_remaining: initial_sessions(total_sessions, use_immediately)?,
    })
}
