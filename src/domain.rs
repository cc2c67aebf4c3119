//! Data shapes shared by the gate, the orchestrator and the adapters.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{RelayError, Result};

/// Raw inbound body. Fields stay optional so a missing field is a validation
/// error rather than a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmissionRequest {
    #[serde(default)]
    pub name: Option<serde_json::Value>,
    #[serde(default)]
    pub email: Option<serde_json::Value>,
}

impl SubmissionRequest {
    /// Turn the body into a `Submission`. Missing, empty and non-string values
    /// are all rejected.
    pub fn validate(self) -> Result<Submission> {
        let name = non_empty_string(self.name)
            .ok_or_else(|| RelayError::Validation("missing name".to_string()))?;
        let email = non_empty_string(self.email)
            .ok_or_else(|| RelayError::Validation("missing email".to_string()))?;
        Ok(Submission { name, email })
    }
}

fn non_empty_string(value: Option<serde_json::Value>) -> Option<String> {
    match value {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    }
}

/// A validated lead. The email doubles as the cooldown key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
    pub attachment: Attachment,
}

/// One row of the lead ledger: `[name, email, YYYY-MM-DD]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeadRow {
    pub name: String,
    pub email: String,
    pub date: NaiveDate,
}

impl LeadRow {
    pub fn values(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.email.clone(),
            self.date.format("%Y-%m-%d").to_string(),
        ]
    }
}

/// Result of delivering an admitted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    EmailError(String),
    LedgerError(String),
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::EmailError(_) => "email_error",
            Outcome::LedgerError(_) => "sheet_error",
        }
    }

    pub fn into_result(self) -> Result<()> {
        match self {
            Outcome::Success => Ok(()),
            Outcome::EmailError(reason) => Err(RelayError::EmailDelivery(reason)),
            Outcome::LedgerError(reason) => Err(RelayError::LedgerWrite(reason)),
        }
    }
}
