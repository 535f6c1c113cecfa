//! Follow-up scheduling and persistence.
//!
//! When a quote enters the sent state it gets three touchpoints:
//! 1. three days after issue
//! 2. seven days after issue
//! 3. the day before the quote expires
//!
//! All three use the same channel: WhatsApp when the lead has a phone number,
//! email otherwise. Rows are inserted in one statement with
//! `ON CONFLICT (presupuesto_id, tipo) DO NOTHING`, so scheduling the same quote
//! twice, even concurrently, never produces a second set.

use crate::{
    entities::{FollowUp, follow_up},
    errors::Result,
};
use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{debug, info, instrument};

/// Kind of follow-up touchpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FollowUpKind {
    /// Three days after the issue date
    Day3,
    /// Seven days after the issue date
    Day7,
    /// One day before the expiry date
    PreExpiry,
}

impl FollowUpKind {
    /// Every kind, in firing order.
    pub const ALL: [Self; 3] = [Self::Day3, Self::Day7, Self::PreExpiry];

    /// Value stored in `seguimientos.tipo`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Day3 => "dia_3",
            Self::Day7 => "dia_7",
            Self::PreExpiry => "pre_vencimiento",
        }
    }

    /// Parses a stored `tipo` value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }
}

/// Delivery channel of a follow-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// WhatsApp message through the messaging gateway
    WhatsApp,
    /// Email through the SMTP relay
    Email,
}

impl Channel {
    /// Value stored in `seguimientos.canal`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WhatsApp => "whatsapp",
            Self::Email => "email",
        }
    }

    /// Parses a stored `canal` value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "whatsapp" => Some(Self::WhatsApp),
            "email" => Some(Self::Email),
            _ => None,
        }
    }

    /// WhatsApp when the lead has a phone number, email otherwise.
    #[must_use]
    pub const fn for_lead(lead_has_phone: bool) -> Self {
        if lead_has_phone {
            Self::WhatsApp
        } else {
            Self::Email
        }
    }
}

/// A follow-up computed from a quote's dates, before it is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedFollowUp {
    /// Touchpoint kind
    pub kind: FollowUpKind,
    /// When the follow-up becomes due (midnight UTC of the target day)
    pub scheduled_for: DateTime<Utc>,
    /// Delivery channel
    pub channel: Channel,
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Computes the three follow-ups for a quote.
///
/// Pure date arithmetic: day 3 and day 7 count from `issue_date`, the
/// pre-expiry touchpoint is the day before `expiry_date`.
#[must_use]
pub fn plan_follow_ups(
    issue_date: NaiveDate,
    expiry_date: NaiveDate,
    lead_has_phone: bool,
) -> [PlannedFollowUp; 3] {
    let channel = Channel::for_lead(lead_has_phone);
    let planned = |kind, date| PlannedFollowUp {
        kind,
        scheduled_for: start_of_day(date),
        channel,
    };

    [
        planned(FollowUpKind::Day3, issue_date + Days::new(3)),
        planned(FollowUpKind::Day7, issue_date + Days::new(7)),
        planned(FollowUpKind::PreExpiry, expiry_date - Days::new(1)),
    ]
}

/// Inserts the three follow-ups of a quote as one batch.
///
/// Kinds that already exist for the quote are skipped by the unique index, so
/// the call is idempotent. Returns how many rows were actually inserted.
#[instrument(skip(db))]
pub async fn schedule_follow_ups<C>(
    db: &C,
    quote_id: i64,
    issue_date: NaiveDate,
    expiry_date: NaiveDate,
    lead_has_phone: bool,
) -> Result<u64>
where
    C: ConnectionTrait,
{
    let now = Utc::now();
    let rows = plan_follow_ups(issue_date, expiry_date, lead_has_phone).map(|planned| {
        follow_up::ActiveModel {
            quote_id: Set(quote_id),
            kind: Set(planned.kind.as_str().to_string()),
            scheduled_for: Set(planned.scheduled_for),
            channel: Set(planned.channel.as_str().to_string()),
            executed_at: Set(None),
            content_variant: Set(None),
            created_at: Set(now),
            ..Default::default()
        }
    });

    let inserted = FollowUp::insert_many(rows)
        .on_conflict(
            OnConflict::columns([follow_up::Column::QuoteId, follow_up::Column::Kind])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    info!(quote_id, inserted, "Scheduled follow-ups");
    Ok(inserted)
}

/// Whether any follow-up exists for the quote.
pub async fn has_follow_ups<C>(db: &C, quote_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    let count = FollowUp::find()
        .filter(follow_up::Column::QuoteId.eq(quote_id))
        .count(db)
        .await?;
    Ok(count > 0)
}

/// All follow-ups of a quote, earliest first.
pub async fn list_follow_ups_for_quote<C>(db: &C, quote_id: i64) -> Result<Vec<follow_up::Model>>
where
    C: ConnectionTrait,
{
    FollowUp::find()
        .filter(follow_up::Column::QuoteId.eq(quote_id))
        .order_by_asc(follow_up::Column::ScheduledFor)
        .order_by_asc(follow_up::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Pending follow-ups whose time has come, earliest first.
pub async fn find_due_follow_ups<C>(db: &C, now: DateTime<Utc>) -> Result<Vec<follow_up::Model>>
where
    C: ConnectionTrait,
{
    FollowUp::find()
        .filter(follow_up::Column::ExecutedAt.is_null())
        .filter(follow_up::Column::ScheduledFor.lte(now))
        .order_by_asc(follow_up::Column::ScheduledFor)
        .order_by_asc(follow_up::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Marks a follow-up as executed with the given content variant.
///
/// Only pending rows are touched; returns false when the row was already
/// executed (or does not exist).
pub async fn mark_executed<C>(
    db: &C,
    follow_up_id: i64,
    executed_at: DateTime<Utc>,
    content_variant: &str,
) -> Result<bool>
where
    C: ConnectionTrait,
{
    let result = FollowUp::update_many()
        .col_expr(follow_up::Column::ExecutedAt, Expr::value(executed_at))
        .col_expr(follow_up::Column::ContentVariant, Expr::value(content_variant))
        .filter(follow_up::Column::Id.eq(follow_up_id))
        .filter(follow_up::Column::ExecutedAt.is_null())
        .exec(db)
        .await?;

    debug!(follow_up_id, rows = result.rows_affected, "Marked follow-up executed");
    Ok(result.rows_affected == 1)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::quote::QuoteState;
    use crate::test_utils::*;
    use chrono::TimeZone;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_plan_follow_ups_dates() {
        let plan = plan_follow_ups(ymd(2025, 2, 18), ymd(2025, 3, 18), true);

        assert_eq!(plan[0].kind, FollowUpKind::Day3);
        assert_eq!(plan[0].scheduled_for.date_naive(), ymd(2025, 2, 21));
        assert_eq!(plan[1].kind, FollowUpKind::Day7);
        assert_eq!(plan[1].scheduled_for.date_naive(), ymd(2025, 2, 25));
        assert_eq!(plan[2].kind, FollowUpKind::PreExpiry);
        assert_eq!(plan[2].scheduled_for.date_naive(), ymd(2025, 3, 17));
    }

    #[test]
    fn test_plan_follow_ups_scheduled_at_midnight_utc() {
        let plan = plan_follow_ups(ymd(2025, 2, 18), ymd(2025, 3, 18), true);
        assert_eq!(
            plan[0].scheduled_for,
            Utc.with_ymd_and_hms(2025, 2, 21, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_plan_follow_ups_crosses_month_end() {
        let plan = plan_follow_ups(ymd(2024, 2, 27), ymd(2024, 3, 1), false);
        assert_eq!(plan[0].scheduled_for.date_naive(), ymd(2024, 3, 1));
        assert_eq!(plan[1].scheduled_for.date_naive(), ymd(2024, 3, 5));
        assert_eq!(plan[2].scheduled_for.date_naive(), ymd(2024, 2, 29));
    }

    #[test]
    fn test_channel_selection() {
        let with_phone = plan_follow_ups(ymd(2025, 2, 18), ymd(2025, 3, 18), true);
        assert!(with_phone.iter().all(|p| p.channel == Channel::WhatsApp));

        let without_phone = plan_follow_ups(ymd(2025, 2, 18), ymd(2025, 3, 18), false);
        assert!(without_phone.iter().all(|p| p.channel == Channel::Email));
    }

    #[test]
    fn test_kind_and_channel_parse() {
        for kind in FollowUpKind::ALL {
            assert_eq!(FollowUpKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(FollowUpKind::parse("dia_30"), None);
        assert_eq!(Channel::parse("whatsapp"), Some(Channel::WhatsApp));
        assert_eq!(Channel::parse("email"), Some(Channel::Email));
        assert_eq!(Channel::parse("sms"), None);
    }

    #[tokio::test]
    async fn test_schedule_follow_ups_inserts_three_rows() -> Result<()> {
        let db = setup_test_db().await?;
        let lead = create_test_lead(&db, "Juan", Some("600111222")).await?;
        let quote = create_test_quote(&db, lead.id, ymd(2025, 2, 18), QuoteState::Draft).await?;

        let inserted =
            schedule_follow_ups(&db, quote.id, ymd(2025, 2, 18), ymd(2025, 3, 18), true).await?;
        assert_eq!(inserted, 3);

        let rows = list_follow_ups_for_quote(&db, quote.id).await?;
        let kinds: Vec<&str> = rows.iter().map(|r| r.kind.as_str()).collect();
        assert_eq!(kinds, ["dia_3", "dia_7", "pre_vencimiento"]);
        assert!(rows.iter().all(|r| r.channel == "whatsapp"));
        assert!(rows.iter().all(|r| r.executed_at.is_none()));
        Ok(())
    }

    #[tokio::test]
    async fn test_schedule_follow_ups_twice_is_ignored() -> Result<()> {
        let db = setup_test_db().await?;
        let lead = create_test_lead(&db, "Juan", None).await?;
        let quote = create_test_quote(&db, lead.id, ymd(2025, 2, 18), QuoteState::Draft).await?;

        schedule_follow_ups(&db, quote.id, ymd(2025, 2, 18), ymd(2025, 3, 18), false).await?;
        let second =
            schedule_follow_ups(&db, quote.id, ymd(2025, 2, 18), ymd(2025, 3, 18), false).await?;
        assert_eq!(second, 0);

        let count = FollowUp::find()
            .filter(follow_up::Column::QuoteId.eq(quote.id))
            .count(&db)
            .await?;
        assert_eq!(count, 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_has_follow_ups() -> Result<()> {
        let db = setup_test_db().await?;
        let lead = create_test_lead(&db, "Juan", None).await?;
        let quote = create_test_quote(&db, lead.id, ymd(2025, 2, 18), QuoteState::Draft).await?;

        assert!(!has_follow_ups(&db, quote.id).await?);
        schedule_follow_ups(&db, quote.id, ymd(2025, 2, 18), ymd(2025, 3, 18), false).await?;
        assert!(has_follow_ups(&db, quote.id).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_find_due_follow_ups_selection() -> Result<()> {
        let db = setup_test_db().await?;
        let lead = create_test_lead(&db, "Juan", Some("600111222")).await?;
        let quote = create_test_quote(&db, lead.id, ymd(2025, 2, 18), QuoteState::Draft).await?;
        schedule_follow_ups(&db, quote.id, ymd(2025, 2, 18), ymd(2025, 3, 18), true).await?;

        // Between day 7 and pre-expiry: day 3 and day 7 are in the past.
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        let rows = list_follow_ups_for_quote(&db, quote.id).await?;
        mark_executed(&db, rows[0].id, now, "plantilla_v1").await?;

        let due = find_due_follow_ups(&db, now).await?;
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].kind, "dia_7");
        Ok(())
    }

    #[tokio::test]
    async fn test_find_due_follow_ups_includes_exact_time() -> Result<()> {
        let db = setup_test_db().await?;
        let lead = create_test_lead(&db, "Juan", None).await?;
        let quote = create_test_quote(&db, lead.id, ymd(2025, 2, 18), QuoteState::Draft).await?;
        schedule_follow_ups(&db, quote.id, ymd(2025, 2, 18), ymd(2025, 3, 18), false).await?;

        let exactly_day3 = Utc.with_ymd_and_hms(2025, 2, 21, 0, 0, 0).unwrap();
        let due = find_due_follow_ups(&db, exactly_day3).await?;
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].kind, "dia_3");
        Ok(())
    }

    #[tokio::test]
    async fn test_mark_executed_only_once() -> Result<()> {
        let db = setup_test_db().await?;
        let lead = create_test_lead(&db, "Juan", None).await?;
        let quote = create_test_quote(&db, lead.id, ymd(2025, 2, 18), QuoteState::Draft).await?;
        schedule_follow_ups(&db, quote.id, ymd(2025, 2, 18), ymd(2025, 3, 18), false).await?;
        let first = list_follow_ups_for_quote(&db, quote.id).await?.remove(0);

        let now = Utc.with_ymd_and_hms(2025, 2, 22, 7, 0, 0).unwrap();
        assert!(mark_executed(&db, first.id, now, "plantilla_v1").await?);

        let later = Utc.with_ymd_and_hms(2025, 2, 23, 7, 0, 0).unwrap();
        assert!(!mark_executed(&db, first.id, later, "otra").await?);

        let stored = FollowUp::find_by_id(first.id).one(&db).await?.unwrap();
        assert_eq!(stored.executed_at, Some(now));
        assert_eq!(stored.content_variant.as_deref(), Some("plantilla_v1"));
        Ok(())
    }
}
