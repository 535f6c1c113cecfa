//! Shared test utilities for the quote follow-up service.
//!
//! This module provides common helper functions for setting up test databases,
//! creating test entities with sensible defaults, and stub gateways that record
//! what they were asked to send.

use crate::{
    core::{
        lead::{NewLead, create_lead},
        numbering::next_quote_number,
        quote::{DEFAULT_VALIDITY_DAYS, QuoteState},
        totals::compute_totals,
    },
    entities::{LineItem, LineItems, quote},
    errors::Result,
    notify::{Dispatcher, EmailGateway, WhatsAppGateway},
};
use async_trait::async_trait;
use chrono::{Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a test lead with no company and no email.
pub async fn create_test_lead(
    db: &DatabaseConnection,
    name: &str,
    phone: Option<&str>,
) -> Result<crate::entities::LeadModel> {
    create_lead(
        db,
        NewLead {
            name: name.to_string(),
            phone: phone.map(str::to_string),
            ..NewLead::default()
        },
    )
    .await
}

/// Creates a test lead belonging to `company`, without phone.
pub async fn create_test_lead_with_company(
    db: &DatabaseConnection,
    name: &str,
    company: &str,
) -> Result<crate::entities::LeadModel> {
    create_lead(
        db,
        NewLead {
            name: name.to_string(),
            company: Some(company.to_string()),
            ..NewLead::default()
        },
    )
    .await
}

/// Creates a test lead reachable only by email.
pub async fn create_test_lead_with_email(
    db: &DatabaseConnection,
    name: &str,
    email: &str,
) -> Result<crate::entities::LeadModel> {
    create_lead(
        db,
        NewLead {
            name: name.to_string(),
            email: Some(email.to_string()),
            ..NewLead::default()
        },
    )
    .await
}

/// Two units at 15000, subtotal 30000.
#[must_use]
pub fn sample_items() -> Vec<LineItem> {
    vec![LineItem {
        description: "Instalación split 3000 frigorías".to_string(),
        quantity: Decimal::from(2),
        unit_price: Decimal::from(15000),
    }]
}

/// Inserts a quote row directly, skipping follow-up scheduling.
///
/// # Defaults
/// * number: next free number for `issue_date`
/// * expiry: `issue_date` + 30 days
/// * items: [`sample_items`]
pub async fn create_test_quote(
    db: &DatabaseConnection,
    lead_id: i64,
    issue_date: NaiveDate,
    state: QuoteState,
) -> Result<quote::Model> {
    let number = next_quote_number(db, None, Some("Test"), issue_date).await?;
    insert_quote_row(db, lead_id, &number, issue_date, state).await
}

/// Inserts a draft quote with an exact number, for numbering tests.
pub async fn insert_raw_quote(
    db: &DatabaseConnection,
    lead_id: i64,
    number: &str,
    issue_date: NaiveDate,
) -> Result<quote::Model> {
    insert_quote_row(db, lead_id, number, issue_date, QuoteState::Draft).await
}

async fn insert_quote_row(
    db: &DatabaseConnection,
    lead_id: i64,
    number: &str,
    issue_date: NaiveDate,
    state: QuoteState,
) -> Result<quote::Model> {
    let items = sample_items();
    let totals = compute_totals(&items);
    let now = Utc::now();

    let model = quote::ActiveModel {
        lead_id: Set(lead_id),
        number: Set(number.to_string()),
        issue_date: Set(issue_date),
        expiry_date: Set(issue_date + Days::new(DEFAULT_VALIDITY_DAYS)),
        currency: Set("EUR".to_string()),
        items: Set(LineItems(items)),
        subtotal: Set(totals.subtotal),
        tax: Set(totals.tax),
        total: Set(totals.total),
        state: Set(state.as_str().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    model.insert(db).await.map_err(Into::into)
}

/// WhatsApp gateway that records messages and fails for chosen phones.
#[derive(Debug, Default)]
pub struct StubWhatsApp {
    failing: HashSet<String>,
    sent: Mutex<Vec<(String, String)>>,
}

impl StubWhatsApp {
    /// A stub that rejects every phone in `failing` (digits only).
    #[must_use]
    pub fn failing_for(failing: &[&str]) -> Self {
        Self {
            failing: failing.iter().map(|p| (*p).to_string()).collect(),
            sent: Mutex::default(),
        }
    }

    /// `(phone, text)` pairs accepted so far.
    #[allow(clippy::unwrap_used)]
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl WhatsAppGateway for StubWhatsApp {
    #[allow(clippy::unwrap_used)]
    async fn send_text(&self, phone: &str, text: &str) -> bool {
        if self.failing.contains(phone) {
            return false;
        }
        self.sent
            .lock()
            .unwrap()
            .push((phone.to_string(), text.to_string()));
        true
    }
}

/// Email gateway that records every message and always succeeds.
#[derive(Debug, Default)]
pub struct StubEmail {
    sent: Mutex<Vec<(String, String, String)>>,
}

impl StubEmail {
    /// `(to, subject, body)` triples accepted so far.
    #[allow(clippy::unwrap_used)]
    pub fn sent(&self) -> Vec<(String, String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailGateway for StubEmail {
    #[allow(clippy::unwrap_used)]
    async fn send(&self, to: &str, subject: &str, body: &str) -> bool {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string(), body.to_string()));
        true
    }
}

/// A dispatcher with a stub WhatsApp gateway and no email transport.
/// Returns the stub as well so tests can inspect what was sent.
#[must_use]
pub fn stub_dispatcher(failing_phones: &[&str]) -> (Dispatcher, Arc<StubWhatsApp>) {
    let whatsapp = Arc::new(StubWhatsApp::failing_for(failing_phones));
    let dispatcher = Dispatcher::new(Arc::clone(&whatsapp) as Arc<dyn WhatsAppGateway>, None);
    (dispatcher, whatsapp)
}
