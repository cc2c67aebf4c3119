//! Lead ledger backed by the Google Sheets `values:append` API.
//!
//! Auth uses the service-account flow: a short-lived RS256 JWT is exchanged at
//! the OAuth token endpoint for an access token, which is cached until a minute
//! before it expires.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::app::ports::LeadLedgerPort;
use crate::config::ServiceAccountCredentials;
use crate::constants::{GOOGLE_TOKEN_URL, SHEETS_API_BASE, SHEETS_SCOPE};
use crate::domain::LeadRow;
use crate::error::{RelayError, Result};

const TOKEN_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct AppendBody {
    values: Vec<Vec<String>>,
}

pub struct GoogleSheetsLedger {
    client: reqwest::Client,
    client_email: String,
    key: EncodingKey,
    spreadsheet_id: String,
    range: String,
    token_url: String,
    api_base: String,
    cached_token: Arc<RwLock<Option<CachedToken>>>,
}

impl GoogleSheetsLedger {
    pub fn new(
        credentials: &ServiceAccountCredentials,
        spreadsheet_id: impl Into<String>,
        range: impl Into<String>,
    ) -> Result<Self> {
        let key = EncodingKey::from_rsa_pem(credentials.private_key.expose().as_bytes())?;
        Ok(Self {
            client: reqwest::Client::new(),
            client_email: credentials.client_email.clone(),
            key,
            spreadsheet_id: spreadsheet_id.into(),
            range: range.into(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            api_base: SHEETS_API_BASE.to_string(),
            cached_token: Arc::new(RwLock::new(None)),
        })
    }

    /// Point at different token and API hosts (for testing).
    pub fn with_endpoints(mut self, token_url: impl Into<String>, api_base: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self.api_base = api_base.into();
        self
    }

    async fn access_token(&self) -> Result<String> {
        let now = Utc::now();
        {
            let cache = self.cached_token.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > now {
                    return Ok(cached.token.clone());
                }
            }
        }

        let fresh = self.exchange_token(now).await?;
        let token = fresh.token.clone();
        *self.cached_token.write().await = Some(fresh);
        Ok(token)
    }

    async fn exchange_token(&self, now: DateTime<Utc>) -> Result<CachedToken> {
        let iat = now.timestamp();
        let claims = Claims {
            iss: &self.client_email,
            scope: SHEETS_SCOPE,
            aud: &self.token_url,
            iat,
            exp: iat + TOKEN_LIFETIME_SECS,
        };
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &self.key)?;

        let resp = self
            .client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RelayError::Api {
                status: status.as_u16(),
                message: format!("token exchange failed: {}", resp.text().await.unwrap_or_default()),
            });
        }

        let body: TokenResponse = resp.json().await?;
        debug!(expires_in = body.expires_in, "Obtained Google access token");
        Ok(CachedToken {
            token: body.access_token,
            expires_at: now + Duration::seconds(body.expires_in),
        })
    }

    fn append_url(&self) -> String {
        format!(
            "{}/spreadsheets/{}/values/{}:append",
            self.api_base.trim_end_matches('/'),
            self.spreadsheet_id,
            self.range
        )
    }
}

#[async_trait]
impl LeadLedgerPort for GoogleSheetsLedger {
    async fn append(&self, row: &LeadRow) -> Result<()> {
        let token = self.access_token().await?;
        let resp = self
            .client
            .post(self.append_url())
            .bearer_auth(token)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .json(&AppendBody {
                values: vec![row.values()],
            })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RelayError::Api {
                status: status.as_u16(),
                message: resp.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Secret;
    use chrono::NaiveDate;
    use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TEST_KEY: &str = include_str!("../../tests/fixtures/service_account_key.pem");

    fn credentials() -> ServiceAccountCredentials {
        ServiceAccountCredentials {
            client_email: "svc@project.iam.gserviceaccount.com".into(),
            private_key: Secret::new(TEST_KEY),
            project_id: Some("project".into()),
        }
    }

    fn row() -> LeadRow {
        LeadRow {
            name: "Ana".into(),
            email: "a@x.com".into(),
            date: NaiveDate::from_ymd_opt(2024, 3, 7).unwrap(),
        }
    }

    async fn mount_token(server: &MockServer, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.test",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    fn ledger(server: &MockServer) -> GoogleSheetsLedger {
        GoogleSheetsLedger::new(&credentials(), "sheet-1", "A1:C1")
            .unwrap()
            .with_endpoints(format!("{}/token", server.uri()), server.uri())
    }

    #[tokio::test]
    async fn appends_row_with_cached_token() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/spreadsheets/sheet-1/values/A1:C1:append"))
            .and(query_param("valueInputOption", "USER_ENTERED"))
            .and(header("authorization", "Bearer ya29.test"))
            .and(body_json(serde_json::json!({
                "values": [["Ana", "a@x.com", "2024-03-07"]]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(2)
            .mount(&server)
            .await;

        let ledger = ledger(&server);
        ledger.append(&row()).await.unwrap();
        ledger.append(&row()).await.unwrap();
    }

    #[tokio::test]
    async fn api_failure_is_reported() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/spreadsheets/sheet-1/values/A1:C1:append"))
            .respond_with(ResponseTemplate::new(403).set_body_string("PERMISSION_DENIED"))
            .mount(&server)
            .await;

        let err = ledger(&server).append(&row()).await.unwrap_err();
        assert!(matches!(err, RelayError::Api { status: 403, .. }));
    }

    #[tokio::test]
    async fn token_exchange_failure_skips_append() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/spreadsheets/sheet-1/values/A1:C1:append"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = ledger(&server).append(&row()).await.unwrap_err();
        match err {
            RelayError::Api { status, message } => {
                assert_eq!(status, 400);
                assert!(message.contains("invalid_grant"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_malformed_private_key() {
        let creds = ServiceAccountCredentials {
            private_key: Secret::new("not a key"),
            ..credentials()
        };
        assert!(matches!(
            GoogleSheetsLedger::new(&creds, "sheet-1", "A1:C1"),
            Err(RelayError::Jwt(_))
        ));
    }
}
