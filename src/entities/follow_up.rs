//! Follow-up (seguimiento) entity - One scheduled reminder for a sent quote.
//!
//! `tipo` and `canal` are stored as plain strings and parsed in `core::follow_up`.
//! `ejecutado_at` stays NULL until the sweep processes the row.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Follow-up database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "seguimientos")]
pub struct Model {
    /// Unique identifier for the follow-up
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Quote this follow-up belongs to
    #[sea_orm(column_name = "presupuesto_id")]
    pub quote_id: i64,
    /// Touchpoint kind: `dia_3`, `dia_7` or `pre_vencimiento`
    #[sea_orm(column_name = "tipo")]
    pub kind: String,
    /// When the follow-up becomes due
    #[sea_orm(column_name = "programado_para")]
    pub scheduled_for: DateTimeUtc,
    /// Delivery channel: `whatsapp` or `email`
    #[sea_orm(column_name = "canal")]
    pub channel: String,
    /// When the sweep processed this follow-up, None while pending
    #[sea_orm(column_name = "ejecutado_at")]
    pub executed_at: Option<DateTimeUtc>,
    /// Content variant tag recorded when executed
    #[sea_orm(column_name = "contenido_usado")]
    pub content_variant: Option<String>,
    /// When the follow-up was scheduled
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `FollowUp` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each follow-up belongs to one quote
    #[sea_orm(
        belongs_to = "super::quote::Entity",
        from = "Column::QuoteId",
        to = "super::quote::Column::Id"
    )]
    Quote,
}

impl Related<super::quote::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Quote.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
