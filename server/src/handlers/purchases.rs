use axum::extract::State;
use axum::response::Response;

use super::today;
use crate::db;
use crate::models::purchase::{
    AdditionalPaymentRequest, LimitedPurchaseRequest, TicketPurchaseRequest,
};
use crate::routes::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::AppJson;
use crate::utils::response::success;

/// `POST /api/ticket-purchases`
pub async fn purchase_ticket(
    State(state): State<AppState>,
    AppJson(request): AppJson<TicketPurchaseRequest>,
) -> Result<Response, AppError> {
    let order = request.validate()?;
    let receipt = db::purchases::purchase_regular_ticket(&state.pool, &order, today()).await?;
    Ok(success(receipt))
}

/// `PATCH /api/ticket-purchases`: pay down an existing regular ticket.
pub async fn pay_ticket_balance(
    State(state): State<AppState>,
    AppJson(request): AppJson<AdditionalPaymentRequest>,
) -> Result<Response, AppError> {
    let payment = request.validate()?;
    let receipt = db::purchases::record_additional_payment(&state.pool, &payment).await?;
    Ok(success(receipt))
}

/// `POST /api/limited-offer-purchases`
pub async fn purchase_limited_offer(
    State(state): State<AppState>,
    AppJson(request): AppJson<LimitedPurchaseRequest>,
) -> Result<Response, AppError> {
    let order = request.validate()?;
    let receipt = db::purchases::purchase_limited_ticket(&state.pool, &order, today()).await?;
    Ok(success(receipt))
}
