//! Quote business logic - Handles creation, editing and state changes of quotes.
//!
//! Creating a quote validates its items, computes totals, allocates a sequence
//! number and stores everything in one database transaction. Whenever a quote
//! enters the sent state (created as sent, or moved there later) its three
//! follow-ups are scheduled inside that same transaction, so a failed insert
//! leaves neither the state change nor any follow-up behind.

use crate::{
    core::{
        follow_up::{has_follow_ups, schedule_follow_ups},
        lead::{get_lead_by_id, has_phone},
        numbering::next_quote_number,
        totals::{compute_totals, validate_line_items},
    },
    entities::{LineItem, LineItems, Quote, lead, quote},
    errors::{Error, Result},
};
use async_trait::async_trait;
use chrono::{Days, NaiveDate, Utc};
use sea_orm::{DatabaseTransaction, QueryOrder, Set, SqlErr, TransactionTrait, prelude::*};
use tracing::{debug, info, instrument, warn};

/// Days a quote stays valid when no expiry date is given.
pub const DEFAULT_VALIDITY_DAYS: u64 = 30;

/// How many quote numbers are tried before giving up on collisions.
pub const MAX_NUMBER_ATTEMPTS: u32 = 5;

/// Lifecycle state of a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuoteState {
    /// Being prepared, not shown to the lead yet
    Draft,
    /// Sent to the lead; follow-ups are scheduled on entering this state
    Sent,
    /// Accepted by the lead
    Accepted,
    /// Rejected by the lead
    Rejected,
    /// Validity period ran out
    Expired,
}

impl QuoteState {
    /// Every state.
    pub const ALL: [Self; 5] = [
        Self::Draft,
        Self::Sent,
        Self::Accepted,
        Self::Rejected,
        Self::Expired,
    ];

    /// Value stored in `presupuestos.estado`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "borrador",
            Self::Sent => "enviado",
            Self::Accepted => "aceptado",
            Self::Rejected => "rechazado",
            Self::Expired => "vencido",
        }
    }

    /// Parses a stored `estado` value.
    pub fn parse(value: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == value)
            .ok_or_else(|| Error::InvalidQuoteState {
                value: value.to_string(),
            })
    }
}

/// Input for creating a quote
#[derive(Debug, Clone)]
pub struct NewQuote {
    /// Lead the quote is issued to
    pub lead_id: i64,
    /// Date printed on the quote
    pub issue_date: NaiveDate,
    /// Expiry date, defaults to issue date + [`DEFAULT_VALIDITY_DAYS`]
    pub expiry_date: Option<NaiveDate>,
    /// ISO currency code
    pub currency: String,
    /// Priced line items
    pub items: Vec<LineItem>,
    /// Initial state, usually draft or sent
    pub state: QuoteState,
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Source of quote numbers for [`create_quote`].
#[async_trait]
trait NumberAllocator: Send + Sync {
    async fn allocate(
        &self,
        txn: &DatabaseTransaction,
        lead: &lead::Model,
        date: NaiveDate,
    ) -> Result<String>;
}

/// The shared per-day sequence.
struct DailySequence;

#[async_trait]
impl NumberAllocator for DailySequence {
    async fn allocate(
        &self,
        txn: &DatabaseTransaction,
        lead: &lead::Model,
        date: NaiveDate,
    ) -> Result<String> {
        next_quote_number(txn, lead.company.as_deref(), Some(&lead.name), date).await
    }
}

/// Creates a quote, allocating its number from `today`'s sequence and, when
/// created as sent, scheduling its follow-ups.
///
/// A number collision with a concurrent creation rolls back and retries with
/// a fresh number, up to [`MAX_NUMBER_ATTEMPTS`] times.
#[instrument(skip(db, new_quote), fields(lead_id = new_quote.lead_id))]
pub async fn create_quote(
    db: &DatabaseConnection,
    new_quote: NewQuote,
    today: NaiveDate,
) -> Result<quote::Model> {
    create_quote_with(db, new_quote, today, &DailySequence).await
}

async fn create_quote_with(
    db: &DatabaseConnection,
    new_quote: NewQuote,
    today: NaiveDate,
    allocator: &dyn NumberAllocator,
) -> Result<quote::Model> {
    validate_line_items(&new_quote.items)?;

    let issue_date = new_quote.issue_date;
    let expiry_date = new_quote
        .expiry_date
        .unwrap_or(issue_date + Days::new(DEFAULT_VALIDITY_DAYS));
    if expiry_date < issue_date {
        return Err(Error::InvalidDateRange {
            issue: issue_date,
            expiry: expiry_date,
        });
    }

    let lead = get_lead_by_id(db, new_quote.lead_id)
        .await?
        .ok_or(Error::LeadNotFound {
            id: new_quote.lead_id,
        })?;

    let totals = compute_totals(&new_quote.items);
    let items = LineItems(new_quote.items);

    for attempt in 1..=MAX_NUMBER_ATTEMPTS {
        let txn = db.begin().await?;

        let number = allocator.allocate(&txn, &lead, today).await?;

        let now = Utc::now();
        let quote_model = quote::ActiveModel {
            lead_id: Set(lead.id),
            number: Set(number.clone()),
            issue_date: Set(issue_date),
            expiry_date: Set(expiry_date),
            currency: Set(new_quote.currency.clone()),
            items: Set(items.clone()),
            subtotal: Set(totals.subtotal),
            tax: Set(totals.tax),
            total: Set(totals.total),
            state: Set(new_quote.state.as_str().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let created = match quote_model.insert(&txn).await {
            Ok(created) => created,
            Err(e) if is_unique_violation(&e) => {
                warn!(attempt, number = %number, "Quote number taken, retrying");
                txn.rollback().await?;
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if new_quote.state == QuoteState::Sent {
            schedule_follow_ups(&txn, created.id, issue_date, expiry_date, has_phone(&lead))
                .await?;
        }

        txn.commit().await?;
        info!(quote_id = created.id, number = %created.number, "Created quote");
        return Ok(created);
    }

    Err(Error::NumberConflict {
        attempts: MAX_NUMBER_ATTEMPTS,
    })
}

/// Replaces the line items of a quote and recomputes its totals.
pub async fn update_quote_items(
    db: &DatabaseConnection,
    quote_id: i64,
    items: Vec<LineItem>,
) -> Result<quote::Model> {
    validate_line_items(&items)?;

    let quote = get_quote_by_id(db, quote_id)
        .await?
        .ok_or(Error::QuoteNotFound { id: quote_id })?;

    let totals = compute_totals(&items);
    let mut active_model: quote::ActiveModel = quote.into();
    active_model.items = Set(LineItems(items));
    active_model.subtotal = Set(totals.subtotal);
    active_model.tax = Set(totals.tax);
    active_model.total = Set(totals.total);
    active_model.updated_at = Set(Utc::now());

    active_model.update(db).await.map_err(Into::into)
}

/// Moves a quote to `new_state`.
///
/// Entering the sent state schedules follow-ups unless the quote already has
/// some. Setting the state the quote is already in changes nothing.
#[instrument(skip(db))]
pub async fn change_quote_state(
    db: &DatabaseConnection,
    quote_id: i64,
    new_state: QuoteState,
) -> Result<quote::Model> {
    let txn = db.begin().await?;

    let quote = Quote::find_by_id(quote_id)
        .one(&txn)
        .await?
        .ok_or(Error::QuoteNotFound { id: quote_id })?;

    let current = QuoteState::parse(&quote.state)?;
    if current == new_state {
        debug!(state = new_state.as_str(), "Quote already in requested state");
        txn.commit().await?;
        return Ok(quote);
    }

    let mut active_model: quote::ActiveModel = quote.into();
    active_model.state = Set(new_state.as_str().to_string());
    active_model.updated_at = Set(Utc::now());
    let updated = active_model.update(&txn).await?;

    if new_state == QuoteState::Sent {
        if has_follow_ups(&txn, quote_id).await? {
            debug!(quote_id, "Follow-ups already scheduled, skipping");
        } else {
            let lead = get_lead_by_id(&txn, updated.lead_id)
                .await?
                .ok_or(Error::LeadNotFound {
                    id: updated.lead_id,
                })?;
            schedule_follow_ups(
                &txn,
                quote_id,
                updated.issue_date,
                updated.expiry_date,
                has_phone(&lead),
            )
            .await?;
        }
    }

    txn.commit().await?;
    info!(
        quote_id,
        from = current.as_str(),
        to = new_state.as_str(),
        "Changed quote state"
    );
    Ok(updated)
}

/// Finds a quote by its unique ID.
pub async fn get_quote_by_id<C>(db: &C, quote_id: i64) -> Result<Option<quote::Model>>
where
    C: ConnectionTrait,
{
    Quote::find_by_id(quote_id).one(db).await.map_err(Into::into)
}

/// All quotes of a lead, newest issue date first.
pub async fn list_quotes_for_lead(
    db: &DatabaseConnection,
    lead_id: i64,
) -> Result<Vec<quote::Model>> {
    Quote::find()
        .filter(quote::Column::LeadId.eq(lead_id))
        .order_by_desc(quote::Column::IssueDate)
        .order_by_desc(quote::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
