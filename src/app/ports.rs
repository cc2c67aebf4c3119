use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{LeadRow, MailMessage};
use crate::error::Result;

/// Sends one message with its attachment. Any delivery problem is an error.
#[async_trait]
pub trait MailSenderPort: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<()>;
}

/// Appends one row to the lead ledger.
#[async_trait]
pub trait LeadLedgerPort: Send + Sync {
    async fn append(&self, row: &LeadRow) -> Result<()>;
}

/// Source of the current time, injectable so cooldown behaviour is testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
