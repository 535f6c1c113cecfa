//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod follow_up;
pub mod lead;
pub mod quote;

// Re-export specific types to avoid conflicts
pub use follow_up::{Column as FollowUpColumn, Entity as FollowUp, Model as FollowUpModel};
pub use lead::{Column as LeadColumn, Entity as Lead, Model as LeadModel};
pub use quote::{Column as QuoteColumn, Entity as Quote, LineItem, LineItems, Model as QuoteModel};
