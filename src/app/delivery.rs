use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use super::ports::{Clock, LeadLedgerPort, MailSenderPort};
use crate::constants::render_body;
use crate::domain::{Attachment, LeadRow, MailMessage, Outcome, Submission};
use crate::error::{RelayError, Result};

/// Fixed parts of the outgoing message.
#[derive(Debug, Clone)]
pub struct MessageTemplate {
    pub from: String,
    pub subject: String,
    pub attachment: Attachment,
}

impl MessageTemplate {
    pub fn build(&self, submission: &Submission) -> MailMessage {
        MailMessage {
            from: self.from.clone(),
            to: submission.email.clone(),
            subject: self.subject.clone(),
            text: render_body(&submission.name),
            attachment: self.attachment.clone(),
        }
    }
}

/// Sends the guide, then records the lead. Each call is attempted once.
pub struct DeliveryOrchestrator {
    mailer: Arc<dyn MailSenderPort>,
    ledger: Arc<dyn LeadLedgerPort>,
    clock: Arc<dyn Clock>,
    template: MessageTemplate,
    call_timeout: Duration,
}

impl DeliveryOrchestrator {
    pub fn new(
        mailer: Arc<dyn MailSenderPort>,
        ledger: Arc<dyn LeadLedgerPort>,
        clock: Arc<dyn Clock>,
        template: MessageTemplate,
        call_timeout: Duration,
    ) -> Self {
        Self {
            mailer,
            ledger,
            clock,
            template,
            call_timeout,
        }
    }

    pub async fn deliver(&self, submission: &Submission) -> Outcome {
        let message = self.template.build(submission);
        if let Err(e) = self
            .bounded("email delivery", self.mailer.send(&message))
            .await
        {
            error!(email = %submission.email, error = %e, "Email sending failed");
            return Outcome::EmailError(e.to_string());
        }
        info!(email = %submission.email, "Email sent");

        // The email is out at this point; a ledger failure does not undo it.
        let row = LeadRow {
            name: submission.name.clone(),
            email: submission.email.clone(),
            date: self.clock.now().date_naive(),
        };
        if let Err(e) = self.bounded("ledger append", self.ledger.append(&row)).await {
            error!(email = %submission.email, error = %e, "Lead ledger write failed");
            return Outcome::LedgerError(e.to_string());
        }
        info!(name = %submission.name, email = %submission.email, "Saved lead");

        Outcome::Success
    }

    async fn bounded<F>(&self, operation: &'static str, call: F) -> Result<()>
    where
        F: Future<Output = Result<()>>,
    {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(RelayError::Timeout {
                operation,
                after: self.call_timeout,
            }),
        }
    }
}
