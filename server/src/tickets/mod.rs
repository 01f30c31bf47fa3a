//! Ticket rules: expiry at purchase, reconciliation on read, and the
//! payment checks in between. Everything here is pure; callers pass in
//! the rows and the current date.

pub mod catalog;
pub mod error;
pub mod expiry;
pub mod pricing;
pub mod purchase;
pub mod reconcile;

pub use error::TicketError;
pub use expiry::calculate_expiry_date;
pub use reconcile::reconcile;
