//! Guards for maintaining ticket plans and limited offers.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::TicketError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenderRestriction {
    #[default]
    All,
    Female,
    Male,
}

impl GenderRestriction {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenderRestriction::All => "all",
            GenderRestriction::Female => "female",
            GenderRestriction::Male => "male",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfferType {
    #[default]
    Service,
    Ticket,
}

impl OfferType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferType::Service => "service",
            OfferType::Ticket => "ticket",
        }
    }
}

/// What happens to a limited offer on delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferRemoval {
    /// Never sold; the row can go.
    Delete,
    /// Sold at least once; purchases still point at it.
    Deactivate,
}

fn invalid(msg: &str) -> TicketError {
    TicketError::InvalidArgument(msg.to_string())
}

pub fn check_plan_terms(
    name: &str,
    service_category: &str,
    total_sessions: i32,
    price: Decimal,
    validity_days: i32,
) -> Result<(), TicketError> {
    if name.trim().is_empty() {
        return Err(invalid("name is required"));
    }
    if service_category.trim().is_empty() {
        return Err(invalid("service_category is required"));
    }
    if total_sessions <= 0 {
        return Err(invalid("total_sessions must be positive"));
    }
    if price <= Decimal::ZERO {
        return Err(invalid("price must be positive"));
    }
    if validity_days <= 0 {
        return Err(invalid("validity_days must be positive"));
    }
    Ok(())
}

/// A plan is unique per service, session count, gender restriction and
/// category. `existing` is the id of a plan already matching all four.
pub fn check_plan_unique(existing: Option<Uuid>) -> Result<(), TicketError> {
    match existing {
        Some(plan_id) => Err(TicketError::Conflict(format!(
            "A plan with the same service, sessions, gender restriction and category already exists ({})",
            plan_id
        ))),
        None => Ok(()),
    }
}

/// Plans stay while any sold ticket or limited offer refers to them.
pub fn check_plan_deletable(sold_tickets: i64, linked_offers: i64) -> Result<(), TicketError> {
    if sold_tickets > 0 {
        return Err(TicketError::Conflict(format!(
            "Plan has {} sold ticket(s) and cannot be deleted",
            sold_tickets
        )));
    }
    if linked_offers > 0 {
        return Err(TicketError::Conflict(format!(
            "Plan is the base of {} limited offer(s) and cannot be deleted",
            linked_offers
        )));
    }
    Ok(())
}

pub fn check_offer_terms(
    name: &str,
    offer_type: OfferType,
    special_price: Option<Decimal>,
    total_sessions: Option<i32>,
    validity_days: i32,
) -> Result<(), TicketError> {
    if name.trim().is_empty() {
        return Err(invalid("name is required"));
    }
    if offer_type == OfferType::Ticket && !special_price.is_some_and(|p| p > Decimal::ZERO) {
        return Err(invalid("ticket offers need a positive special_price"));
    }
    if special_price.is_some_and(|p| p < Decimal::ZERO) {
        return Err(invalid("special_price must not be negative"));
    }
    if total_sessions.is_some_and(|n| n <= 0) {
        return Err(invalid("total_sessions must be positive"));
    }
    if validity_days < 0 {
        return Err(invalid("validity_days must not be negative"));
    }
    Ok(())
}

pub fn offer_removal(purchases: i64) -> OfferRemoval {
    if purchases > 0 {
        OfferRemoval::Deactivate
    } else {
        OfferRemoval::Delete
    }
}
