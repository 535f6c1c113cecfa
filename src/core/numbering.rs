//! Quote number generation.
//!
//! Numbers look like `ACMEINST PN_ LIS-20250218-0007`: a client tag derived
//! from the company (or lead) name, the issue day, and a four-digit sequence
//! shared by every quote issued that day.
//!
//! The next sequence is the numeric maximum of the day's existing suffixes plus
//! one. Two concurrent creations can still compute the same number; the unique
//! index on `presupuestos.numero` rejects the second insert and
//! `core::quote::create_quote` retries with a fresh number.

use crate::{
    entities::{Quote, quote},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use regex::Regex;
use sea_orm::{QuerySelect, prelude::*};
use std::sync::LazyLock;
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};
use tracing::debug;

/// Tag used when neither a company nor a lead name yields any characters.
pub const DEFAULT_TAG: &str = "CLI";

/// Highest sequence that still fits the four-digit suffix.
pub const MAX_DAILY_SEQUENCE: u32 = 9999;

const TAG_WORD_CHARS: usize = 4;
const TAG_MAX_CHARS: usize = 8;

#[allow(clippy::unwrap_used)]
static SEQUENCE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-(\d+)$").unwrap());

fn tag_from(name: &str) -> String {
    let cleaned: String = name
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect();

    cleaned
        .split_whitespace()
        .flat_map(|word| word.chars().take(TAG_WORD_CHARS))
        .take(TAG_MAX_CHARS)
        .collect::<String>()
        .to_ascii_uppercase()
}

/// Builds the short uppercase client tag for a quote number.
///
/// Uses the company name when it yields any characters, then the lead name,
/// then [`DEFAULT_TAG`].
#[must_use]
pub fn client_tag(company: Option<&str>, lead_name: Option<&str>) -> String {
    [company, lead_name]
        .into_iter()
        .flatten()
        .map(tag_from)
        .find(|tag| !tag.is_empty())
        .unwrap_or_else(|| DEFAULT_TAG.to_string())
}

/// Formats the day bucket of a quote number (`YYYYMMDD`).
#[must_use]
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Extracts the trailing numeric sequence of a quote number.
#[must_use]
pub fn sequence_suffix(number: &str) -> Option<u32> {
    SEQUENCE_SUFFIX
        .captures(number)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Returns the sequence following the highest suffix among `numbers`.
///
/// Suffixes are compared as integers, so `...-0010` ranks above `...-0009`
/// regardless of string ordering.
pub fn next_sequence<'a, I>(numbers: I) -> u32
where
    I: IntoIterator<Item = &'a str>,
{
    numbers
        .into_iter()
        .filter_map(sequence_suffix)
        .max()
        .map_or(1, |last| last.saturating_add(1))
}

/// Formats a complete quote number.
#[must_use]
pub fn format_quote_number(tag: &str, date_key: &str, sequence: u32) -> String {
    format!("{tag} PN_ LIS-{date_key}-{sequence:04}")
}

/// Computes the next quote number for `date`.
///
/// Loads every number issued in the day bucket and continues from the highest
/// suffix. Fails with [`Error::SequenceExhausted`] past [`MAX_DAILY_SEQUENCE`].
pub async fn next_quote_number<C>(
    db: &C,
    company: Option<&str>,
    lead_name: Option<&str>,
    date: NaiveDate,
) -> Result<String>
where
    C: ConnectionTrait,
{
    let key = date_key(date);
    let issued: Vec<String> = Quote::find()
        .select_only()
        .column(quote::Column::Number)
        .filter(quote::Column::Number.like(format!("%LIS-{key}-%")))
        .into_tuple()
        .all(db)
        .await?;

    let sequence = next_sequence(issued.iter().map(String::as_str));
    if sequence > MAX_DAILY_SEQUENCE {
        return Err(Error::SequenceExhausted { date_key: key });
    }

    let number = format_quote_number(&client_tag(company, lead_name), &key, sequence);
    debug!(number = %number, issued_today = issued.len(), "Allocated quote number");
    Ok(number)
}
