//! In-process mail sender and ledger, used for `--dry-run` and in tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::info;

use crate::app::ports::{LeadLedgerPort, MailSenderPort};
use crate::domain::{LeadRow, MailMessage};
use crate::error::{RelayError, Result};

/// Records messages instead of sending them. Can be told to fail every send.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<MailMessage>>,
    attempts: AtomicUsize,
    failure: Option<String>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MailSenderPort for RecordingMailer {
    async fn send(&self, message: &MailMessage) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = &self.failure {
            return Err(RelayError::Api {
                status: 503,
                message: reason.clone(),
            });
        }
        info!(
            to = %message.to,
            subject = %message.subject,
            attachment = %message.attachment.filename,
            "Dry run: recorded email"
        );
        self.sent
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(message.clone());
        Ok(())
    }
}

/// Keeps ledger rows in memory. Can be told to fail every append.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    rows: Mutex<Vec<LeadRow>>,
    attempts: AtomicUsize,
    failure: Option<String>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn rows(&self) -> Vec<LeadRow> {
        self.rows.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LeadLedgerPort for InMemoryLedger {
    async fn append(&self, row: &LeadRow) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = &self.failure {
            return Err(RelayError::Api {
                status: 500,
                message: reason.clone(),
            });
        }
        info!(name = %row.name, email = %row.email, date = %row.date, "Dry run: recorded lead");
        self.rows
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(row.clone());
        Ok(())
    }
}
