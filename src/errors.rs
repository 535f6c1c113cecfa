//! Unified error type for the quote follow-up service.

use thiserror::Error;

/// Every failure the crate can surface to a caller.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or is invalid
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Any query or insert failure from the relational store
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// I/O failure (config file, listener socket)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The referenced lead does not exist
    #[error("Lead not found: {id}")]
    LeadNotFound {
        /// Requested lead id
        id: i64,
    },

    /// Lead input failed validation
    #[error("Invalid lead: {reason}")]
    InvalidLead {
        /// Why the lead was rejected
        reason: String,
    },

    /// The referenced quote does not exist
    #[error("Quote not found: {id}")]
    QuoteNotFound {
        /// Requested quote id
        id: i64,
    },

    /// A quote line item failed validation
    #[error("Invalid line item: {reason}")]
    InvalidLineItem {
        /// Why the item was rejected
        reason: String,
    },

    /// Expiry date precedes the issue date
    #[error("Expiry date {expiry} is before issue date {issue}")]
    InvalidDateRange {
        /// Issue date of the quote
        issue: chrono::NaiveDate,
        /// Requested expiry date
        expiry: chrono::NaiveDate,
    },

    /// A stored quote state string is not one of the known states
    #[error("Unknown quote state: {value}")]
    InvalidQuoteState {
        /// The unrecognized value
        value: String,
    },

    /// The four-digit daily sequence has no numbers left
    #[error("Quote number sequence exhausted for {date_key}")]
    SequenceExhausted {
        /// Day bucket (`YYYYMMDD`)
        date_key: String,
    },

    /// Concurrent creations kept colliding on the same quote number
    #[error("Could not allocate a unique quote number after {attempts} attempts")]
    NumberConflict {
        /// How many numbers were tried
        attempts: u32,
    },

    /// An outbound gateway could not be constructed
    #[error("Messaging gateway error: {message}")]
    Gateway {
        /// What went wrong
        message: String,
    },
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
