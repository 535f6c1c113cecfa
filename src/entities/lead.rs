//! Lead entity - A sales prospect that quotes are sent to.
//!
//! The phone number drives the follow-up channel (WhatsApp when present),
//! the email address is the destination for the email channel.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lead database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "leads")]
pub struct Model {
    /// Unique identifier for the lead
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Contact name
    #[sea_orm(column_name = "nombre")]
    pub name: String,
    /// Company display name, used for the quote number tag when present
    #[sea_orm(column_name = "empresa")]
    pub company: Option<String>,
    /// Phone number as entered by the user (not normalized)
    #[sea_orm(column_name = "telefono")]
    pub phone: Option<String>,
    /// Email address
    pub email: Option<String>,
    /// When the lead was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Lead and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One lead has many quotes
    #[sea_orm(has_many = "super::quote::Entity")]
    Quotes,
}

impl Related<super::quote::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Quotes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
