use std::sync::Arc;
use tracing::{info, warn};

use super::delivery::DeliveryOrchestrator;
use super::submission_gate::SubmissionGate;
use crate::domain::SubmissionRequest;
use crate::error::{RelayError, Result};
use crate::metrics;

/// Full request flow: validate, pass the gate, deliver.
pub struct LeadCapture {
    gate: Arc<SubmissionGate>,
    orchestrator: DeliveryOrchestrator,
}

impl LeadCapture {
    pub fn new(gate: Arc<SubmissionGate>, orchestrator: DeliveryOrchestrator) -> Self {
        Self { gate, orchestrator }
    }

    pub async fn submit(&self, request: SubmissionRequest) -> Result<()> {
        let submission = match request.validate() {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "Rejected invalid submission");
                metrics::record_submission("invalid");
                return Err(e);
            }
        };

        // Check-and-set is synchronous; nothing awaits between the check and the insert.
        let admitted = self.gate.admit_now(&submission.email);
        metrics::record_cooldown_entries(self.gate.len());
        if !admitted {
            info!(email = %submission.email, "Duplicate submission blocked");
            metrics::record_submission("rejected");
            return Err(RelayError::RateLimited {
                email: submission.email,
            });
        }

        let outcome = self.orchestrator.deliver(&submission).await;
        metrics::record_submission(outcome.label());
        outcome.into_result()
    }
}
