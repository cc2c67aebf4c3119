pub mod delivery;
pub mod lead_capture;
pub mod ports;
pub mod submission_gate;

pub use delivery::{DeliveryOrchestrator, MessageTemplate};
pub use lead_capture::LeadCapture;
pub use submission_gate::SubmissionGate;
