pub mod clock;
pub mod http_mail;
pub mod memory;
pub mod sheets;

pub use clock::{ManualClock, SystemClock};
pub use http_mail::HttpMailSender;
pub use memory::{InMemoryLedger, RecordingMailer};
pub use sheets::GoogleSheetsLedger;
