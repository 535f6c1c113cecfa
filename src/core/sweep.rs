//! Follow-up sweep - delivers every due follow-up once.
//!
//! A sweep loads the pending follow-ups whose time has come, renders the
//! message for each and hands it to the gateway for its channel. Delivered
//! records are marked executed; anything that fails stays pending and is
//! picked up again by the next sweep. One record failing never stops the
//! others.

use crate::{
    core::{
        follow_up::{Channel, find_due_follow_ups, mark_executed},
        lead::{email_address, normalize_phone},
        messages::{TEMPLATE_VARIANT, UNSENT_VARIANT, email_subject, render_message},
    },
    entities::{FollowUpModel, Lead, LeadModel, Quote, QuoteModel, lead, quote},
    errors::Result,
    notify::Dispatcher,
};
use chrono::{DateTime, Utc};
use sea_orm::prelude::*;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, instrument, warn};

/// Outcome of one sweep run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Follow-ups that were due when the sweep started
    pub due: usize,
    /// Follow-ups marked executed by this sweep
    pub processed: usize,
    /// Due follow-ups left pending for a later sweep
    pub pending: usize,
}

/// What happened to a single follow-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    /// A gateway accepted the message
    Sent,
    /// No email transport exists; closed without sending
    Recorded,
    /// Not delivered, stays pending
    NotSent,
}

impl Delivery {
    const fn variant(self) -> Option<&'static str> {
        match self {
            Self::Sent => Some(TEMPLATE_VARIANT),
            Self::Recorded => Some(UNSENT_VARIANT),
            Self::NotSent => None,
        }
    }
}

async fn load_quotes(db: &DatabaseConnection, due: &[FollowUpModel]) -> Result<HashMap<i64, QuoteModel>> {
    let ids: BTreeSet<i64> = due.iter().map(|f| f.quote_id).collect();
    let quotes = Quote::find()
        .filter(quote::Column::Id.is_in(ids))
        .all(db)
        .await?;
    Ok(quotes.into_iter().map(|q| (q.id, q)).collect())
}

async fn load_leads(
    db: &DatabaseConnection,
    quotes: &HashMap<i64, QuoteModel>,
) -> Result<HashMap<i64, LeadModel>> {
    let ids: BTreeSet<i64> = quotes.values().map(|q| q.lead_id).collect();
    let leads = Lead::find()
        .filter(lead::Column::Id.is_in(ids))
        .all(db)
        .await?;
    Ok(leads.into_iter().map(|l| (l.id, l)).collect())
}

async fn deliver(
    dispatcher: &Dispatcher,
    follow_up: &FollowUpModel,
    quote: &QuoteModel,
    lead: &LeadModel,
) -> Delivery {
    let text = render_message(&follow_up.kind, &lead.name, &quote.number);

    match Channel::parse(&follow_up.channel) {
        Some(Channel::WhatsApp) => {
            let Some(phone) = lead.phone.as_deref().and_then(normalize_phone) else {
                warn!(follow_up_id = follow_up.id, "Lead has no phone number, leaving pending");
                return Delivery::NotSent;
            };
            if dispatcher.whatsapp.send_text(&phone, &text).await {
                Delivery::Sent
            } else {
                Delivery::NotSent
            }
        }
        // Anything that is not WhatsApp goes the email path.
        Some(Channel::Email) | None => {
            let Some(gateway) = &dispatcher.email else {
                warn!(
                    follow_up_id = follow_up.id,
                    "No email transport configured, recording follow-up as not dispatched"
                );
                return Delivery::Recorded;
            };
            let Some(address) = email_address(lead) else {
                warn!(follow_up_id = follow_up.id, "Lead has no email address, leaving pending");
                return Delivery::NotSent;
            };
            if gateway.send(address, &email_subject(&quote.number), &text).await {
                Delivery::Sent
            } else {
                Delivery::NotSent
            }
        }
    }
}

/// Runs one sweep over the follow-ups due at `now`.
///
/// Fails only when the due list or its quotes and leads cannot be loaded; in
/// that case nothing has been marked.
#[instrument(skip(db, dispatcher))]
pub async fn run_sweep(
    db: &DatabaseConnection,
    dispatcher: &Dispatcher,
    now: DateTime<Utc>,
) -> Result<SweepReport> {
    let due = find_due_follow_ups(db, now).await?;
    if due.is_empty() {
        debug!("No follow-ups due");
        return Ok(SweepReport::default());
    }

    let quotes = load_quotes(db, &due).await?;
    let leads = load_leads(db, &quotes).await?;

    let mut processed = 0;
    for follow_up in &due {
        let Some(quote) = quotes.get(&follow_up.quote_id) else {
            warn!(follow_up_id = follow_up.id, quote_id = follow_up.quote_id, "Quote missing");
            continue;
        };
        let Some(lead) = leads.get(&quote.lead_id) else {
            warn!(follow_up_id = follow_up.id, lead_id = quote.lead_id, "Lead missing");
            continue;
        };

        let Some(variant) = deliver(dispatcher, follow_up, quote, lead).await.variant() else {
            continue;
        };

        match mark_executed(db, follow_up.id, now, variant).await {
            Ok(true) => processed += 1,
            Ok(false) => debug!(follow_up_id = follow_up.id, "Follow-up already executed"),
            Err(e) => warn!(follow_up_id = follow_up.id, error = %e, "Failed to mark follow-up executed"),
        }
    }

    let report = SweepReport {
        due: due.len(),
        processed,
        pending: due.len() - processed,
    };
    info!(due = report.due, processed = report.processed, pending = report.pending, "Sweep finished");
    Ok(report)
}
