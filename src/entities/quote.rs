//! Quote (presupuesto) entity - A priced proposal sent to a lead.
//!
//! Line items are persisted as a JSON array of
//! `{descripcion, cantidad, precio_unitario}` objects. `subtotal`, `impuestos`
//! and `total` are stored alongside so exports never recompute them.
//! `estado` holds the lifecycle state string (see `core::quote::QuoteState`).

use rust_decimal::Decimal;
use sea_orm::FromJsonQueryResult;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One priced line of a quote
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Free-text description of the line
    #[serde(rename = "descripcion")]
    pub description: String,
    /// Quantity, must be greater than zero
    #[serde(rename = "cantidad", with = "rust_decimal::serde::float")]
    pub quantity: Decimal,
    /// Unit price, must not be negative
    #[serde(rename = "precio_unitario", with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
}

/// Ordered line items, stored as one JSON column
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct LineItems(pub Vec<LineItem>);

/// Quote database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "presupuestos")]
pub struct Model {
    /// Unique identifier for the quote
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Lead this quote was issued to
    pub lead_id: i64,
    /// Human-readable sequence number, unique across all quotes
    #[sea_orm(column_name = "numero", unique)]
    pub number: String,
    /// Date the quote was issued
    #[sea_orm(column_name = "fecha_emision")]
    pub issue_date: Date,
    /// Last day the quote is valid
    #[sea_orm(column_name = "fecha_vencimiento")]
    pub expiry_date: Date,
    /// ISO currency code (e.g. `"EUR"`)
    #[sea_orm(column_name = "moneda")]
    pub currency: String,
    /// Line items as JSON
    #[sea_orm(column_type = "Json")]
    pub items: LineItems,
    /// Sum of quantity × unit price
    pub subtotal: Decimal,
    /// 21% tax on the subtotal, rounded to cents
    #[sea_orm(column_name = "impuestos")]
    pub tax: Decimal,
    /// Subtotal plus tax
    pub total: Decimal,
    /// Lifecycle state: `borrador`, `enviado`, `aceptado`, `rechazado` or `vencido`
    #[sea_orm(column_name = "estado")]
    pub state: String,
    /// When the quote was created
    pub created_at: DateTimeUtc,
    /// When the quote was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Quote and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each quote belongs to one lead
    #[sea_orm(
        belongs_to = "super::lead::Entity",
        from = "Column::LeadId",
        to = "super::lead::Column::Id"
    )]
    Lead,
    /// One quote has many follow-ups
    #[sea_orm(has_many = "super::follow_up::Entity")]
    FollowUps,
}

impl Related<super::lead::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lead.def()
    }
}

impl Related<super::follow_up::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FollowUps.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
