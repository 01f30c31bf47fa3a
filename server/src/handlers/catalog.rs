use axum::extract::State;
use axum::response::Response;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::db;
use crate::models::plan::{IdQuery, OfferRequest, PlanRequest, TicketPlan};
use crate::routes::AppState;
use crate::tickets::catalog::OfferRemoval;
use crate::utils::error::AppError;
use crate::utils::extract::{AppJson, AppQuery};
use crate::utils::response::{success, success_with_message};

#[derive(Debug, Deserialize)]
pub struct PlanFilter {
    #[serde(rename = "serviceId")]
    pub service_id: Option<Uuid>,
}

/// `GET /api/ticket-plans?serviceId=`
pub async fn list_ticket_plans(
    State(state): State<AppState>,
    AppQuery(filter): AppQuery<PlanFilter>,
) -> Result<Response, AppError> {
    let plans: Vec<TicketPlan> = db::catalog::list_ticket_plans(&state.pool, filter.service_id)
        .await?
        .into_iter()
        .map(TicketPlan::from)
        .collect();
    Ok(success(plans))
}

/// `POST /api/ticket-plans`
pub async fn create_ticket_plan(
    State(state): State<AppState>,
    AppJson(request): AppJson<PlanRequest>,
) -> Result<Response, AppError> {
    let (service_id, details) = request.validate_new()?;
    let plan_id = db::catalog::create_ticket_plan(&state.pool, service_id, &details).await?;
    Ok(success_with_message(
        json!({ "plan_id": plan_id }),
        "Ticket plan created",
    ))
}

/// `PUT /api/ticket-plans`
pub async fn update_ticket_plan(
    State(state): State<AppState>,
    AppJson(request): AppJson<PlanRequest>,
) -> Result<Response, AppError> {
    let (plan_id, details) = request.validate_update()?;
    db::catalog::update_ticket_plan(&state.pool, plan_id, &details).await?;
    Ok(success_with_message(
        json!({ "plan_id": plan_id }),
        "Ticket plan updated",
    ))
}

/// `DELETE /api/ticket-plans?id=`
pub async fn delete_ticket_plan(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<IdQuery>,
) -> Result<Response, AppError> {
    let plan_id = query.require()?;
    db::catalog::delete_ticket_plan(&state.pool, plan_id).await?;
    Ok(success_with_message(
        json!({ "plan_id": plan_id }),
        "Ticket plan deleted",
    ))
}

/// `GET /api/limited-offers`
pub async fn list_limited_offers(State(state): State<AppState>) -> Result<Response, AppError> {
    let offers = db::catalog::list_limited_offers(&state.pool).await?;
    Ok(success(offers))
}

/// `POST /api/limited-offers`
pub async fn create_limited_offer(
    State(state): State<AppState>,
    AppJson(request): AppJson<OfferRequest>,
) -> Result<Response, AppError> {
    let details = request.validate_new()?;
    let offer_id = db::catalog::create_limited_offer(&state.pool, &details).await?;
    Ok(success_with_message(
        json!({ "offer_id": offer_id }),
        "Limited offer created",
    ))
}

/// `PUT /api/limited-offers`
pub async fn update_limited_offer(
    State(state): State<AppState>,
    AppJson(request): AppJson<OfferRequest>,
) -> Result<Response, AppError> {
    let (offer_id, details) = request.validate_update()?;
    db::catalog::update_limited_offer(&state.pool, offer_id, &details).await?;
    Ok(success_with_message(
        json!({ "offer_id": offer_id }),
        "Limited offer updated",
    ))
}

/// `DELETE /api/limited-offers?id=`: sold offers are deactivated instead.
pub async fn delete_limited_offer(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<IdQuery>,
) -> Result<Response, AppError> {
    let offer_id = query.require()?;
    let message = match db::catalog::remove_limited_offer(&state.pool, offer_id).await? {
        OfferRemoval::Delete => "Limited offer deleted",
        OfferRemoval::Deactivate => "Limited offer has purchases and was deactivated",
    };
    Ok(success_with_message(
        json!({ "offer_id": offer_id }),
        message,
    ))
}
