//! Service configuration from the environment
//!
//! Read once at startup. Missing credentials are not fatal: the affected
//! collaborator reports itself as unconfigured on every call instead.

use crate::aws::AwsCredentials;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_AWS_REGION: &str = "us-east-1";
const DEFAULT_LANGUAGE_CODE: &str = "es";

const DEFAULT_CLASSIFIER_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_NOTIFIER_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_ENGINE_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_SESSION_IDLE_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub gemini: GeminiConfig,
    pub aws: AwsConfig,
    /// Denylist file; built-in phrases when unset
    pub risk_phrases_path: Option<PathBuf>,
    /// Persona prompt file; built-in prompt when unset
    pub system_prompt_path: Option<PathBuf>,
    pub timeouts: Timeouts,
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AwsConfig {
    pub credentials: Option<AwsCredentials>,
    pub region: String,
    pub sns_topic_arn: Option<String>,
    /// Language code sent to the sentiment classifier
    pub language_code: String,
    pub comprehend_endpoint: Option<String>,
    pub sns_endpoint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub classifier: Duration,
    pub notifier: Duration,
    pub engine: Duration,
    /// Sessions unused for this long are dropped
    pub session_idle: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            classifier: DEFAULT_CLASSIFIER_TIMEOUT,
            notifier: DEFAULT_NOTIFIER_TIMEOUT,
            engine: DEFAULT_ENGINE_TIMEOUT,
            session_idle: DEFAULT_SESSION_IDLE_TTL,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let secs = |key: &str, default: Duration| {
            get(key)
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|&s| s > 0)
                .map_or(default, Duration::from_secs)
        };

        // The original deployment used AWS_ACCESS_KEY / AWS_SECRET_KEY; the
        // standard SDK names are accepted too.
        let access_key = get("AWS_ACCESS_KEY").or_else(|| get("AWS_ACCESS_KEY_ID"));
        let secret_key = get("AWS_SECRET_KEY").or_else(|| get("AWS_SECRET_ACCESS_KEY"));
        let credentials = match (access_key, secret_key) {
            (Some(id), Some(secret)) => {
                let creds = AwsCredentials::new(id, secret);
                Some(match get("AWS_SESSION_TOKEN") {
                    Some(token) => creds.with_session_token(token),
                    None => creds,
                })
            }
            _ => None,
        };

        Self {
            port: get("CRISIS_CHAT_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            gemini: GeminiConfig {
                api_key: get("GEMINI_API_KEY"),
                model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
                base_url: get("GEMINI_BASE_URL"),
            },
            aws: AwsConfig {
                credentials,
                region: get("AWS_REGION").unwrap_or_else(|| DEFAULT_AWS_REGION.to_string()),
                sns_topic_arn: get("SNS_TOPIC_ARN"),
                language_code: get("SENTIMENT_LANGUAGE")
                    .unwrap_or_else(|| DEFAULT_LANGUAGE_CODE.to_string()),
                comprehend_endpoint: get("COMPREHEND_ENDPOINT"),
                sns_endpoint: get("SNS_ENDPOINT"),
            },
            risk_phrases_path: get("RISK_PHRASES_PATH").map(PathBuf::from),
            system_prompt_path: get("SYSTEM_PROMPT_PATH").map(PathBuf::from),
            timeouts: Timeouts {
                classifier: secs("CLASSIFIER_TIMEOUT_SECS", DEFAULT_CLASSIFIER_TIMEOUT),
                notifier: secs("NOTIFIER_TIMEOUT_SECS", DEFAULT_NOTIFIER_TIMEOUT),
                engine: secs("ENGINE_TIMEOUT_SECS", DEFAULT_ENGINE_TIMEOUT),
                session_idle: secs("SESSION_IDLE_TTL_SECS", DEFAULT_SESSION_IDLE_TTL),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]);

        assert_eq!(cfg.port, 8000);
        assert_eq!(cfg.gemini.model, "gemini-1.5-flash");
        assert!(cfg.gemini.api_key.is_none());
        assert!(cfg.aws.credentials.is_none());
        assert_eq!(cfg.aws.region, "us-east-1");
        assert_eq!(cfg.aws.language_code, "es");
        assert_eq!(cfg.timeouts, Timeouts::default());
        assert!(cfg.risk_phrases_path.is_none());
    }

    #[test]
    fn test_original_aws_variable_names() {
        let cfg = config(&[
            ("AWS_ACCESS_KEY", "AKID"),
            ("AWS_SECRET_KEY", "secret"),
            ("SNS_TOPIC_ARN", "arn:aws:sns:us-east-1:123:alertas"),
        ]);

        let creds = cfg.aws.credentials.unwrap();
        assert_eq!(creds.access_key_id, "AKID");
        assert_eq!(creds.secret_access_key, "secret");
        assert!(creds.session_token.is_none());
        assert_eq!(
            cfg.aws.sns_topic_arn.as_deref(),
            Some("arn:aws:sns:us-east-1:123:alertas")
        );
    }

    #[test]
    fn test_sdk_variable_names_and_session_token() {
        let cfg = config(&[
            ("AWS_ACCESS_KEY_ID", "AKID2"),
            ("AWS_SECRET_ACCESS_KEY", "secret2"),
            ("AWS_SESSION_TOKEN", "tok"),
            ("AWS_REGION", "eu-west-1"),
        ]);

        let creds = cfg.aws.credentials.unwrap();
        assert_eq!(creds.access_key_id, "AKID2");
        assert_eq!(creds.session_token.as_deref(), Some("tok"));
        assert_eq!(cfg.aws.region, "eu-west-1");
    }

    #[test]
    fn test_partial_credentials_are_ignored() {
        let cfg = config(&[("AWS_ACCESS_KEY", "AKID")]);
        assert!(cfg.aws.credentials.is_none());
    }

    #[test]
    fn test_blank_and_invalid_values_fall_back() {
        let cfg = config(&[
            ("GEMINI_API_KEY", "   "),
            ("CRISIS_CHAT_PORT", "not-a-port"),
            ("ENGINE_TIMEOUT_SECS", "0"),
            ("CLASSIFIER_TIMEOUT_SECS", "abc"),
            ("NOTIFIER_TIMEOUT_SECS", "3"),
            ("SESSION_IDLE_TTL_SECS", "900"),
        ]);

        assert!(cfg.gemini.api_key.is_none());
        assert_eq!(cfg.port, 8000);
        assert_eq!(cfg.timeouts.engine, DEFAULT_ENGINE_TIMEOUT);
        assert_eq!(cfg.timeouts.classifier, DEFAULT_CLASSIFIER_TIMEOUT);
        assert_eq!(cfg.timeouts.notifier, Duration::from_secs(3));
        assert_eq!(cfg.timeouts.session_idle, Duration::from_secs(900));
    }

    #[test]
    fn test_file_paths() {
        let cfg = config(&[
            ("RISK_PHRASES_PATH", "/etc/crisis-chat/frases.txt"),
            ("SYSTEM_PROMPT_PATH", "/etc/crisis-chat/prompt.txt"),
        ]);
        assert_eq!(
            cfg.risk_phrases_path,
            Some(PathBuf::from("/etc/crisis-chat/frases.txt"))
        );
        assert!(cfg.system_prompt_path.is_some());
    }
}
