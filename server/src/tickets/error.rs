use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Failures raised by the ticket rules. None of them know about HTTP; the
/// web layer maps them through `AppError`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TicketError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Ticket {ticket_id} is missing or has an invalid {field}")]
    MalformedInput { ticket_id: Uuid, field: &'static str },

    #[error("{0}")]
    Conflict(String),

    #[error("Payment of {attempted} exceeds the remaining balance of {remaining}")]
    Overpayment {
        remaining: Decimal,
        attempted: Decimal,
    },
}
