//! Queries against the salon database. Nothing here derives ticket status
//! or expiry on its own; those come from `crate::tickets`.

pub mod catalog;
pub mod purchases;
pub mod tickets;

/// Value of `ticket_payments.ticket_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketSource {
    Regular,
    Limited,
}

impl TicketSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketSource::Regular => "regular",
            TicketSource::Limited => "limited",
        }
    }
}
