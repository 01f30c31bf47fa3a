use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::tickets::catalog::{check_offer_terms, check_plan_terms, GenderRestriction, OfferType};
use crate::tickets::pricing::{discount_rate, plan_category, price_per_session};
use crate::tickets::purchase::DEFAULT_LIMITED_VALIDITY_DAYS;
use crate::utils::error::AppError;

#[derive(Debug, Clone, FromRow)]
pub struct TicketPlanRow {
    pub plan_id: Uuid,
    pub service_id: Uuid,
    pub name: String,
    pub service_category: Option<String>,
    pub gender_restriction: String,
    pub total_sessions: i32,
    pub price: Decimal,
    pub validity_days: Option<i32>,
    pub service_name: String,
    pub service_master_category: Option<String>,
    pub service_unit_price: Decimal,
}

/// Catalogue entry for a ticket plan with its per-session figures.
#[derive(Debug, Clone, Serialize)]
pub struct TicketPlan {
    pub plan_id: Uuid,
    pub service_id: Uuid,
    pub name: String,
    pub service_category: String,
    pub gender_restriction: String,
    pub total_sessions: i32,
    pub price: Decimal,
    pub validity_days: Option<i32>,
    pub service_name: String,
    pub service_unit_price: Decimal,
    pub price_per_session: Option<Decimal>,
    pub discount_rate: Option<Decimal>,
}

impl From<TicketPlanRow> for TicketPlan {
    fn from(row: TicketPlanRow) -> Self {
        Self {
            service_category: plan_category(
                row.service_category.as_deref(),
                row.service_master_category.as_deref(),
            ),
            price_per_session: price_per_session(row.price, row.total_sessions),
            discount_rate: discount_rate(row.price, row.service_unit_price, row.total_sessions),
            plan_id: row.plan_id,
            service_id: row.service_id,
            name: row.name,
            gender_restriction: row.gender_restriction,
            total_sessions: row.total_sessions,
            price: row.price,
            validity_days: row.validity_days,
            service_name: row.service_name,
            service_unit_price: row.service_unit_price,
        }
    }
}

/// Plan fields needed to sell a regular ticket.
#[derive(Debug, Clone, FromRow)]
pub struct PlanForSale {
    pub plan_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub total_sessions: i32,
    pub validity_days: Option<i32>,
    pub service_id: Uuid,
    pub service_name: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LimitedOffer {
    pub offer_id: Uuid,
    pub offer_type: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub base_plan_id: Option<Uuid>,
    pub duration_minutes: Option<i32>,
    pub original_price: Option<Decimal>,
    pub special_price: Option<Decimal>,
    pub total_sessions: Option<i32>,
    pub validity_days: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub max_sales: Option<i32>,
    pub current_sales: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub base_plan_name: Option<String>,
    pub base_gender_restriction: Option<String>,
    pub base_service_name: Option<String>,
}

/// Offer fields needed to sell a limited ticket.
#[derive(Debug, Clone, FromRow)]
pub struct OfferForSale {
    pub offer_id: Uuid,
    pub name: String,
    pub special_price: Option<Decimal>,
    pub total_sessions: Option<i32>,
    pub validity_days: Option<i32>,
    pub base_plan_id: Option<Uuid>,
    pub base_plan_name: Option<String>,
    pub service_id: Option<Uuid>,
    pub service_name: Option<String>,
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, AppError> {
    value.ok_or_else(|| AppError::ValidationError(format!("{} is required", field)))
}

/// Body of `POST` and `PUT /api/ticket-plans`. `plan_id` is only read on
/// update, `service_id` only on create.
#[derive(Debug, Clone, Deserialize)]
pub struct PlanRequest {
    pub plan_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
    pub name: Option<String>,
    pub service_category: Option<String>,
    #[serde(default)]
    pub gender_restriction: GenderRestriction,
    pub total_sessions: Option<i32>,
    pub price: Option<Decimal>,
    pub validity_days: Option<i32>,
}

/// Editable fields of a ticket plan, already checked.
#[derive(Debug, Clone)]
pub struct PlanDetails {
    pub name: String,
    pub service_category: String,
    pub gender_restriction: GenderRestriction,
    pub total_sessions: i32,
    pub price: Decimal,
    pub validity_days: i32,
}

impl PlanRequest {
    fn details(self) -> Result<PlanDetails, AppError> {
        let details = PlanDetails {
            name: required(self.name, "name")?,
            service_category: required(self.service_category, "service_category")?,
            gender_restriction: self.gender_restriction,
            total_sessions: required(self.total_sessions, "total_sessions")?,
            price: required(self.price, "price")?,
            validity_days: required(self.validity_days, "validity_days")?,
        };
        check_plan_terms(
            &details.name,
            &details.service_category,
            details.total_sessions,
            details.price,
            details.validity_days,
        )?;
        Ok(details)
    }

    pub fn validate_new(self) -> Result<(Uuid, PlanDetails), AppError> {
        let service_id = required(self.service_id, "service_id")?;
        Ok((service_id, self.details()?))
    }

    pub fn validate_update(self) -> Result<(Uuid, PlanDetails), AppError> {
        let plan_id = required(self.plan_id, "plan_id")?;
        Ok((plan_id, self.details()?))
    }
}

/// Body of `POST` and `PUT /api/limited-offers`.
#[derive(Debug, Clone, Deserialize)]
pub struct OfferRequest {
    pub offer_id: Option<Uuid>,
    #[serde(default)]
    pub offer_type: OfferType,
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub base_plan_id: Option<Uuid>,
    pub duration_minutes: Option<i32>,
    pub original_price: Option<Decimal>,
    pub special_price: Option<Decimal>,
    pub total_sessions: Option<i32>,
    pub validity_days: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub max_sales: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct OfferDetails {
    pub offer_type: OfferType,
    pub name: String,
    pub description: String,
    pub category: Option<String>,
    pub base_plan_id: Option<Uuid>,
    pub duration_minutes: Option<i32>,
    pub original_price: Option<Decimal>,
    pub special_price: Option<Decimal>,
    pub total_sessions: Option<i32>,
    pub validity_days: i32,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub max_sales: Option<i32>,
    pub is_active: bool,
}

impl OfferRequest {
    fn details(self) -> Result<OfferDetails, AppError> {
        let details = OfferDetails {
            offer_type: self.offer_type,
            name: required(self.name, "name")?,
            description: self.description.unwrap_or_default(),
            category: self.category,
            base_plan_id: self.base_plan_id,
            duration_minutes: self.duration_minutes,
            original_price: self.original_price,
            special_price: self.special_price,
            total_sessions: self.total_sessions,
            validity_days: self.validity_days.unwrap_or(DEFAULT_LIMITED_VALIDITY_DAYS),
            start_date: self.start_date,
            end_date: self.end_date,
            max_sales: self.max_sales,
            is_active: self.is_active.unwrap_or(true),
        };
        check_offer_terms(
            &details.name,
            details.offer_type,
            details.special_price,
            details.total_sessions,
            details.validity_days,
        )?;
        if let (Some(start), Some(end)) = (details.start_date, details.end_date) {
            if end < start {
                return Err(AppError::ValidationError(
                    "end_date must not be before start_date".to_string(),
                ));
            }
        }
        Ok(details)
    }

    pub fn validate_new(self) -> Result<OfferDetails, AppError> {
        self.details()
    }

    pub fn validate_update(self) -> Result<(Uuid, OfferDetails), AppError> {
        let offer_id = required(self.offer_id, "offer_id")?;
        Ok((offer_id, self.details()?))
    }
}

/// `?id=` on catalogue deletes.
#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: Option<Uuid>,
}

impl IdQuery {
    pub fn require(self) -> Result<Uuid, AppError> {
        required(self.id, "id")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_view_derives_catalogue_figures() {
        let row = TicketPlanRow {
            plan_id: Uuid::new_v4(),
            service_id: Uuid::new_v4(),
            name: "Cut 5".to_string(),
            service_category: None,
            gender_restriction: "all".to_string(),
            total_sessions: 5,
            price: Decimal::new(25000, 0),
            validity_days: None,
            service_name: "Cut".to_string(),
            service_master_category: Some("hair".to_string()),
            service_unit_price: Decimal::new(6000, 0),
        };

        let plan = TicketPlan::from(row);
        assert_eq!(plan.service_category, "hair");
        assert_eq!(plan.price_per_session, Some(Decimal::new(5000, 0)));
        assert_eq!(plan.discount_rate, Some(Decimal::new(17, 0)));
    }

    #[test]
    fn test_plan_request_needs_category() {
        let request: PlanRequest = serde_json::from_value(serde_json::json!({
            "service_id": Uuid::new_v4(),
            "name": "Cut 5",
            "total_sessions": 5,
            "price": 25000,
            "validity_days": 365
        }))
        .unwrap();

        assert!(matches!(
            request.validate_new(),
            Err(AppError::ValidationError(ref msg)) if msg.contains("service_category")
        ));
    }

    #[test]
    fn test_plan_request_defaults_gender_to_all() {
        let request: PlanRequest = serde_json::from_value(serde_json::json!({
            "plan_id": Uuid::new_v4(),
            "name": "Cut 5",
            "service_category": "hair",
            "total_sessions": 5,
            "price": 25000,
            "validity_days": 365
        }))
        .unwrap();

        let (_, details) = request.validate_update().unwrap();
        assert_eq!(details.gender_restriction, GenderRestriction::All);
    }

    #[test]
    fn test_offer_request_defaults() {
        let request: OfferRequest = serde_json::from_value(serde_json::json!({
            "name": "Summer spa"
        }))
        .unwrap();

        let details = request.validate_new().unwrap();
        assert_eq!(details.offer_type, OfferType::Service);
        assert_eq!(details.validity_days, DEFAULT_LIMITED_VALIDITY_DAYS);
        assert!(details.is_active);
        assert_eq!(details.description, "");
    }

    #[test]
    fn test_ticket_offer_needs_special_price() {
        let request: OfferRequest = serde_json::from_value(serde_json::json!({
            "offer_type": "ticket",
            "name": "Spa 3x",
            "total_sessions": 3
        }))
        .unwrap();

        assert!(matches!(
            request.validate_new(),
            Err(AppError::ValidationError(_))
        ));
    }

    #[test]
    fn test_offer_dates_must_be_ordered() {
        let request: OfferRequest = serde_json::from_value(serde_json::json!({
            "name": "Summer spa",
            "start_date": "2025-08-01",
            "end_date": "2025-07-01"
        }))
        .unwrap();

        assert!(request.validate_new().is_err());
    }
}
