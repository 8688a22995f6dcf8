//! Amazon Comprehend `DetectSentiment`

use super::{endpoint, http_client, AwsCredentials, AwsError, SignedPost};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

const SERVICE: &str = "comprehend";
const TARGET: &str = "Comprehend_20171127.DetectSentiment";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// Comprehend rejects documents larger than this many UTF-8 bytes
pub const COMPREHEND_MAX_TEXT_BYTES: usize = 5000;

pub struct ComprehendClient {
    http: Client,
    url: Url,
    region: String,
    credentials: AwsCredentials,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DetectSentimentInput<'a> {
    text: &'a str,
    language_code: &'a str,
}

/// Sentiment label plus confidence scores
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DetectSentimentOutput {
    pub sentiment: String,
    #[serde(default)]
    pub sentiment_score: Option<SentimentScore>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "PascalCase")]
#[allow(dead_code)] // Logged only
pub struct SentimentScore {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
    pub mixed: f64,
}

#[derive(Debug, Deserialize)]
struct ComprehendErrorBody {
    #[serde(rename = "__type", default)]
    error_type: String,
    #[serde(alias = "Message", default)]
    message: String,
}

impl ComprehendClient {
    pub fn new(
        credentials: AwsCredentials,
        region: &str,
        endpoint_override: Option<&str>,
    ) -> Result<Self, AwsError> {
        Ok(Self {
            http: http_client(),
            url: endpoint(SERVICE, region, endpoint_override)?,
            region: region.to_string(),
            credentials,
        })
    }

    /// Classify `text`. Input beyond the service limit is cut at a char
    /// boundary rather than rejected.
    pub async fn detect_sentiment(
        &self,
        text: &str,
        language_code: &str,
    ) -> Result<DetectSentimentOutput, AwsError> {
        let input = DetectSentimentInput {
            text: truncate_utf8(text, COMPREHEND_MAX_TEXT_BYTES),
            language_code,
        };
        let body = serde_json::to_vec(&input).map_err(|e| AwsError::Parse {
            service: SERVICE,
            message: e.to_string(),
        })?;

        let (status, text) = SignedPost {
            http: &self.http,
            url: &self.url,
            service: SERVICE,
            region: &self.region,
            credentials: &self.credentials,
            content_type: CONTENT_TYPE,
            target: Some(TARGET),
        }
        .send(body)
        .await?;

        if !(200..300).contains(&status) {
            let parsed = serde_json::from_str::<ComprehendErrorBody>(&text).ok();
            let (code, message) = match parsed {
                Some(err) => (
                    // "com.amazonaws.comprehend#TextSizeLimitExceededException"
                    err.error_type
                        .rsplit('#')
                        .next()
                        .unwrap_or_default()
                        .to_string(),
                    err.message,
                ),
                None => (String::new(), text),
            };
            return Err(AwsError::Service {
                service: SERVICE,
                status,
                code,
                message,
            });
        }

        serde_json::from_str(&text).map_err(|e| AwsError::Parse {
            service: SERVICE,
            message: e.to_string(),
        })
    }
}

/// Longest prefix of `text` that fits in `max_bytes` without splitting a char
fn truncate_utf8(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let end = text
        .char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .take_while(|&end| end <= max_bytes)
        .last()
        .unwrap_or(0);
    text.get(..end).unwrap_or_default()
}
