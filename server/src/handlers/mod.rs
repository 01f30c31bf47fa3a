use axum::response::Response;
use chrono::{Local, NaiveDate};
use serde::Serialize;

use crate::utils::response::success_with_message;

pub mod catalog;
pub mod purchases;
pub mod tickets;

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "salon-pos-api",
    };

    success_with_message(payload, "Health check successful")
}

/// The salon's current calendar date. Handlers read the clock here and pass
/// the date down so the ticket rules stay deterministic.
pub(crate) fn today() -> NaiveDate {
    Local::now().date_naive()
}
