//! Minimal AWS clients for the two services the companion uses
//!
//! Comprehend (sentiment) speaks the JSON 1.1 protocol and SNS (alerts)
//! speaks the query protocol. Both are plain signed POSTs to the regional
//! endpoint, so one signer and one send helper cover them.

mod comprehend;
mod sigv4;
mod sns;

pub use comprehend::ComprehendClient;
pub use sns::SnsClient;

use chrono::Utc;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Static credentials for request signing
#[derive(Clone)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl AwsCredentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    #[must_use]
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }
}

// Never print the secret.
impl std::fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum AwsError {
    #[error("Invalid endpoint {0}")]
    InvalidEndpoint(String),
    #[error("Request timeout: {0}")]
    Timeout(String),
    #[error("Request failed: {0}")]
    Network(String),
    #[error("{service} returned HTTP {status} {code}: {message}")]
    Service {
        service: &'static str,
        status: u16,
        code: String,
        message: String,
    },
    #[error("Failed to parse {service} response: {message}")]
    Parse {
        service: &'static str,
        message: String,
    },
}

/// Default request timeout for the shared HTTP client. The callers put
/// their own tighter deadlines around each call.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

fn http_client() -> Client {
    Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .expect("Failed to create HTTP client")
}

/// Resolve the endpoint for `service`, honouring an override
fn endpoint(service: &str, region: &str, override_url: Option<&str>) -> Result<Url, AwsError> {
    let raw = override_url.map_or_else(
        || format!("https://{service}.{region}.amazonaws.com/"),
        str::to_string,
    );
    Url::parse(&raw).map_err(|e| AwsError::InvalidEndpoint(format!("{raw}: {e}")))
}

/// A signed POST of `body` to `url`, returning status and body text
struct SignedPost<'a> {
    http: &'a Client,
    url: &'a Url,
    service: &'static str,
    region: &'a str,
    credentials: &'a AwsCredentials,
    content_type: &'a str,
    target: Option<&'a str>,
}

impl SignedPost<'_> {
    async fn send(&self, body: Vec<u8>) -> Result<(u16, String), AwsError> {
        let mut headers = vec![("content-type", self.content_type)];
        if let Some(target) = self.target {
            headers.push(("x-amz-target", target));
        }

        let signed = sigv4::sign(
            &sigv4::SigningInput {
                method: "POST",
                url: self.url,
                headers: &headers,
                body: &body,
            },
            self.credentials,
            self.region,
            self.service,
            Utc::now(),
        );

        let mut request = self.http.post(self.url.clone());
        for (name, value) in headers.iter().copied() {
            request = request.header(name, value);
        }
        for (name, value) in &signed {
            request = request.header(*name, value);
        }

        let response = request.body(body).send().await.map_err(|e| {
            if e.is_timeout() {
                AwsError::Timeout(e.to_string())
            } else {
                AwsError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| AwsError::Network(format!("Failed to read response: {e}")))?;
        Ok((status, text))
    }
}
