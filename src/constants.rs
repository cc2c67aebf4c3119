/// Route and response constants shared by the server and the error mapping.
pub const SEND_PDF_ROUTE: &str = "/api/send-pdf";

pub const MISSING_FIELDS_MESSAGE: &str = "Missing name or email";
pub const RATE_LIMITED_MESSAGE: &str = "Please wait before submitting again.";
pub const EMAIL_ERROR_MESSAGE: &str = "Email error";
pub const SHEET_ERROR_MESSAGE: &str = "Sheet error";

// Defaults used when neither the config file nor the environment sets a value
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_COOLDOWN_SECS: u64 = 5 * 60;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONFIG_PATH: &str = "relay.toml";

pub const DEFAULT_FROM_NAME: &str = "Muy Bien Español";
pub const DEFAULT_SUBJECT: &str = "🎁 Your Free Spanish PDF Guide";
pub const DEFAULT_ATTACHMENT_PATH: &str = "pdf/spanish-guide.pdf";
pub const DEFAULT_ATTACHMENT_NAME: &str = "spanish-guide.pdf";
pub const DEFAULT_MAIL_API_URL: &str = "https://api.resend.com/emails";

pub const DEFAULT_SHEET_RANGE: &str = "A1:C1";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4";
pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Greeting sent with the guide. `{name}` is replaced with the submitter's name.
pub const BODY_TEMPLATE: &str = "Hola {name},\n\nAquí tienes tu guía para aprender español. ¡Gracias por unirte!\n\nUn abrazo,\nMuy Bien Español";

/// Render the mail body for a submitter.
pub fn render_body(name: &str) -> String {
    BODY_TEMPLATE.replace("{name}", name)
}
