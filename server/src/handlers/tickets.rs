use axum::extract::State;
use axum::response::Response;
use tracing::{debug, info};
use uuid::Uuid;

use super::today;
use crate::db;
use crate::routes::AppState;
use crate::tickets::reconcile;
use crate::utils::error::AppError;
use crate::utils::extract::AppPath;
use crate::utils::response::success;

/// `GET /api/customers/:id/tickets`: regular and limited tickets merged,
/// newest purchase first, each with its status and outstanding balance.
pub async fn customer_tickets(
    State(state): State<AppState>,
    AppPath(customer_id): AppPath<Uuid>,
) -> Result<Response, AppError> {
    let regular = db::tickets::fetch_regular_tickets(&state.pool, customer_id).await?;
    let limited = db::tickets::fetch_limited_tickets(&state.pool, customer_id).await?;
    debug!(
        customer_id = %customer_id,
        regular = regular.len(),
        limited = limited.len(),
        "Loaded ticket rows"
    );

    let tickets = reconcile(&regular, &limited, today())?;
    info!(customer_id = %customer_id, count = tickets.len(), "Fetched customer tickets");

    Ok(success(tickets))
}

/// `GET /api/customers/:id/limited-purchases`
pub async fn customer_limited_purchases(
    State(state): State<AppState>,
    AppPath(customer_id): AppPath<Uuid>,
) -> Result<Response, AppError> {
    let purchases =
        db::tickets::fetch_active_limited_purchases(&state.pool, customer_id, today()).await?;
    Ok(success(purchases))
}
