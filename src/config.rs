//! Runtime configuration.
//!
//! Non-secret settings may come from an optional TOML file; the environment
//! (including a `.env` file) overrides them and is the only source of secrets.

use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::app::MessageTemplate;
use crate::constants::*;
use crate::domain::Attachment;
use crate::error::{RelayError, Result};

/// A credential that never shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    port: Option<u16>,
    cooldown_secs: Option<u64>,
    sweep_interval_secs: Option<u64>,
    call_timeout_secs: Option<u64>,
    #[serde(default)]
    mail: FileMailConfig,
    #[serde(default)]
    sheet: FileSheetConfig,
}

#[derive(Debug, Default, Deserialize)]
struct FileMailConfig {
    from_name: Option<String>,
    subject: Option<String>,
    attachment_path: Option<PathBuf>,
    attachment_name: Option<String>,
    api_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FileSheetConfig {
    spreadsheet_id: Option<String>,
    range: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub cooldown: Duration,
    pub sweep_interval: Duration,
    pub call_timeout: Duration,
    pub mail: MailConfig,
    pub sheet: SheetConfig,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub from_name: String,
    pub sender_address: Option<String>,
    pub api_key: Option<Secret>,
    pub api_url: String,
    pub subject: String,
    pub attachment_path: PathBuf,
    pub attachment_name: String,
}

#[derive(Debug, Clone)]
pub struct SheetConfig {
    pub spreadsheet_id: Option<String>,
    pub range: String,
    pub credentials: Option<ServiceAccountCredentials>,
}

#[derive(Debug, Clone)]
pub struct ServiceAccountCredentials {
    pub client_email: String,
    pub private_key: Secret,
    pub project_id: Option<String>,
}

impl Config {
    /// Load `.env`, the optional TOML file and the process environment.
    pub fn load() -> Result<Self> {
        let _ = dotenv::dotenv();

        let path = std::env::var("LEAD_RELAY_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let contents = match fs::read_to_string(&path) {
            Ok(c) => Some(c),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                return Err(RelayError::Config(format!(
                    "Failed to read config file '{}': {}",
                    path, e
                )))
            }
        };

        Self::from_sources(contents.as_deref(), |key| std::env::var(key).ok())
    }

    /// Build from file contents plus an environment lookup. Environment wins.
    pub fn from_sources<F>(file: Option<&str>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file: FileConfig = match file {
            Some(contents) => toml::from_str(contents)?,
            None => FileConfig::default(),
        };
        let env = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let port = match env("PORT") {
            Some(p) => p
                .parse()
                .map_err(|_| RelayError::Config(format!("PORT is not a valid port: {p}")))?,
            None => file.port.unwrap_or(DEFAULT_PORT),
        };

        let mail = MailConfig {
            from_name: file.mail.from_name.unwrap_or_else(|| DEFAULT_FROM_NAME.to_string()),
            sender_address: env("MAIL_USER"),
            api_key: env("MAIL_API_KEY").or_else(|| env("MAIL_PASS")).map(Secret::new),
            api_url: env("MAIL_API_URL")
                .or(file.mail.api_url)
                .unwrap_or_else(|| DEFAULT_MAIL_API_URL.to_string()),
            subject: file.mail.subject.unwrap_or_else(|| DEFAULT_SUBJECT.to_string()),
            attachment_path: file
                .mail
                .attachment_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ATTACHMENT_PATH)),
            attachment_name: file
                .mail
                .attachment_name
                .unwrap_or_else(|| DEFAULT_ATTACHMENT_NAME.to_string()),
        };

        let credentials = match (env("GOOGLE_CLIENT_EMAIL"), env("GOOGLE_PRIVATE_KEY")) {
            (Some(client_email), Some(key)) => Some(ServiceAccountCredentials {
                client_email,
                private_key: Secret::new(expand_newlines(&key)),
                project_id: env("GOOGLE_PROJECT_ID"),
            }),
            _ => None,
        };

        let sheet = SheetConfig {
            spreadsheet_id: env("SHEET_ID").or(file.sheet.spreadsheet_id),
            range: file.sheet.range.unwrap_or_else(|| DEFAULT_SHEET_RANGE.to_string()),
            credentials,
        };

        Ok(Self {
            port,
            cooldown: Duration::from_secs(file.cooldown_secs.unwrap_or(DEFAULT_COOLDOWN_SECS)),
            sweep_interval: Duration::from_secs(
                file.sweep_interval_secs.unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS),
            ),
            call_timeout: Duration::from_secs(
                file.call_timeout_secs.unwrap_or(DEFAULT_CALL_TIMEOUT_SECS),
            ),
            mail,
            sheet,
        })
    }

    /// Everything the real mail and sheet adapters need must be present.
    pub fn validate_for_delivery(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.mail.sender_address.is_none() {
            missing.push("MAIL_USER");
        }
        if self.mail.api_key.is_none() {
            missing.push("MAIL_API_KEY");
        }
        if self.sheet.spreadsheet_id.is_none() {
            missing.push("SHEET_ID");
        }
        if self.sheet.credentials.is_none() {
            missing.push("GOOGLE_CLIENT_EMAIL/GOOGLE_PRIVATE_KEY");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(RelayError::Config(format!(
                "missing required settings: {}",
                missing.join(", ")
            )))
        }
    }

    pub fn message_template(&self) -> MessageTemplate {
        MessageTemplate {
            from: self.mail.from_header(),
            subject: self.mail.subject.clone(),
            attachment: Attachment {
                filename: self.mail.attachment_name.clone(),
                path: self.mail.attachment_path.clone(),
            },
        }
    }

    /// Human-readable summary with credentials redacted.
    pub fn summary(&self) -> String {
        format!(
            "port={} cooldown={}s sweep_interval={}s call_timeout={}s\n\
             mail: from={} api_url={} api_key={} attachment={}\n\
             sheet: id={} range={} service_account={}",
            self.port,
            self.cooldown.as_secs(),
            self.sweep_interval.as_secs(),
            self.call_timeout.as_secs(),
            self.mail.from_header(),
            self.mail.api_url,
            if self.mail.api_key.is_some() { "set" } else { "missing" },
            self.mail.attachment_path.display(),
            self.sheet.spreadsheet_id.as_deref().unwrap_or("missing"),
            self.sheet.range,
            self.sheet
                .credentials
                .as_ref()
                .map(|c| c.client_email.as_str())
                .unwrap_or("missing"),
        )
    }
}

impl MailConfig {
    /// `"Display Name" <address>`, or just the display name when no address is set.
    pub fn from_header(&self) -> String {
        match &self.sender_address {
            Some(address) => format!("\"{}\" <{}>", self.from_name, address),
            None => self.from_name.clone(),
        }
    }
}

/// Private keys pasted into env files usually carry literal `\n` sequences.
fn expand_newlines(key: &str) -> String {
    key.replace("\\n", "\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn full_env() -> Vec<(&'static str, &'static str)> {
        vec![
            ("MAIL_USER", "guide@example.com"),
            ("MAIL_API_KEY", "re_123"),
            ("GOOGLE_CLIENT_EMAIL", "svc@project.iam.gserviceaccount.com"),
            ("GOOGLE_PRIVATE_KEY", "-----BEGIN KEY-----\\nabc\\n-----END KEY-----"),
            ("SHEET_ID", "sheet-1"),
        ]
    }

    #[test]
    fn defaults_without_file_or_env() {
        let config = Config::from_sources(None, env_from(&[])).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.cooldown, Duration::from_secs(300));
        assert_eq!(config.sheet.range, "A1:C1");
        assert_eq!(config.mail.attachment_name, "spanish-guide.pdf");
        assert!(config.validate_for_delivery().is_err());
    }

    #[test]
    fn env_overrides_file() {
        let file = r#"
            port = 8080
            cooldown_secs = 60

            [sheet]
            spreadsheet_id = "from-file"
            range = "Leads!A1:C1"
        "#;
        let config = Config::from_sources(
            Some(file),
            env_from(&[("PORT", "9000"), ("SHEET_ID", "from-env")]),
        )
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.cooldown, Duration::from_secs(60));
        assert_eq!(config.sheet.spreadsheet_id.as_deref(), Some("from-env"));
        assert_eq!(config.sheet.range, "Leads!A1:C1");
    }

    #[test]
    fn private_key_newlines_are_expanded() {
        let config = Config::from_sources(None, env_from(&full_env())).unwrap();
        let creds = config.sheet.credentials.unwrap();
        assert_eq!(
            creds.private_key.expose(),
            "-----BEGIN KEY-----\nabc\n-----END KEY-----"
        );
    }

    #[test]
    fn complete_env_validates_and_redacts() {
        let config = Config::from_sources(None, env_from(&full_env())).unwrap();
        config.validate_for_delivery().unwrap();
        assert_eq!(
            config.mail.from_header(),
            "\"Muy Bien Español\" <guide@example.com>"
        );
        let debug = format!("{config:?}");
        assert!(!debug.contains("re_123"));
        assert!(!debug.contains("BEGIN KEY"));
        assert!(!config.summary().contains("re_123"));
    }

    #[test]
    fn reports_every_missing_setting() {
        let config = Config::from_sources(None, env_from(&[("MAIL_USER", "x@y.z")])).unwrap();
        let err = config.validate_for_delivery().unwrap_err().to_string();
        assert!(err.contains("MAIL_API_KEY"));
        assert!(err.contains("SHEET_ID"));
        assert!(!err.contains("MAIL_USER"));
    }

    #[test]
    fn invalid_port_is_a_config_error() {
        let err = Config::from_sources(None, env_from(&[("PORT", "http")])).unwrap_err();
        assert!(matches!(err, RelayError::Config(_)));
    }

    #[test]
    fn malformed_file_is_a_toml_error() {
        let err = Config::from_sources(Some("port = ["), env_from(&[])).unwrap_err();
        assert!(matches!(err, RelayError::Toml(_)));
    }
}
