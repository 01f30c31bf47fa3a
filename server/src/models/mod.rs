pub mod plan;
pub mod purchase;
pub mod ticket;
