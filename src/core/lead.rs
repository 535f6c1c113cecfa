//! Lead business logic - creation, lookup and contact helpers.
//!
//! The follow-up channel of a quote is decided by whether its lead has a
//! phone number, and WhatsApp messages go to the digits-only form of it.

use crate::{
    entities::{Lead, lead},
    errors::{Error, Result},
};
use sea_orm::{Set, prelude::*};
use tracing::info;

/// Input for creating a lead
#[derive(Debug, Clone, Default)]
pub struct NewLead {
    /// Contact name
    pub name: String,
    /// Company display name
    pub company: Option<String>,
    /// Phone number in any human format
    pub phone: Option<String>,
    /// Email address
    pub email: Option<String>,
}

/// Strips everything but digits from a phone number.
///
/// Returns None when no digits remain, so `"+34 600 11 22 33"` becomes
/// `Some("34600112233")` and `" - "` becomes None.
#[must_use]
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    (!digits.is_empty()).then_some(digits)
}

/// Whether the lead can be reached over WhatsApp.
#[must_use]
pub fn has_phone(lead: &lead::Model) -> bool {
    lead.phone.as_deref().and_then(normalize_phone).is_some()
}

/// The lead's email address, if it has a usable one.
#[must_use]
pub fn email_address(lead: &lead::Model) -> Option<&str> {
    lead.email
        .as_deref()
        .map(str::trim)
        .filter(|email| email.contains('@'))
}

/// Creates a new lead. Blank optional fields are stored as NULL.
pub async fn create_lead(db: &DatabaseConnection, new_lead: NewLead) -> Result<lead::Model> {
    let name = new_lead.name.trim().to_string();
    if name.is_empty() {
        return Err(Error::InvalidLead {
            reason: "name cannot be empty".to_string(),
        });
    }

    let non_blank = |value: Option<String>| {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let lead = lead::ActiveModel {
        name: Set(name),
        company: Set(non_blank(new_lead.company)),
        phone: Set(non_blank(new_lead.phone)),
        email: Set(non_blank(new_lead.email)),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let result = lead.insert(db).await?;
    info!(lead_id = result.id, "Created lead");
    Ok(result)
}

/// Finds a lead by its unique ID.
pub async fn get_lead_by_id<C>(db: &C, lead_id: i64) -> Result<Option<lead::Model>>
where
    C: ConnectionTrait,
{
    Lead::find_by_id(lead_id).one(db).await.map_err(Into::into)
}
