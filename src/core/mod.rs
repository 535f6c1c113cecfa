//! Core business logic - framework-agnostic operations on leads, quotes and
//! follow-ups. Nothing here knows about HTTP; gateways are reached through
//! the traits in [`crate::notify`].

pub mod follow_up;
pub mod lead;
pub mod messages;
pub mod numbering;
pub mod quote;
pub mod sweep;
pub mod totals;
