//! AWS Signature Version 4 for single-request POSTs
//!
//! Only what the Comprehend and SNS calls need: root-path requests with no
//! query string and a small set of headers.

use super::AwsCredentials;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use url::Url;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Request parts that take part in the signature
pub struct SigningInput<'a> {
    pub method: &'a str,
    pub url: &'a Url,
    /// Headers sent with the request besides host and the x-amz-* ones the
    /// signer adds itself
    pub headers: &'a [(&'a str, &'a str)],
    pub body: &'a [u8],
}

/// Compute the headers to attach: `x-amz-date`, the optional
/// `x-amz-security-token` and `authorization`.
pub fn sign(
    input: &SigningInput<'_>,
    credentials: &AwsCredentials,
    region: &str,
    service: &str,
    now: DateTime<Utc>,
) -> Vec<(&'static str, String)> {
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date = now.format("%Y%m%d").to_string();

    let mut extra = vec![("x-amz-date", amz_date.clone())];
    if let Some(token) = &credentials.session_token {
        extra.push(("x-amz-security-token", token.clone()));
    }

    let mut headers: Vec<(String, String)> = input
        .headers
        .iter()
        .map(|(k, v)| (k.to_ascii_lowercase(), v.trim().to_string()))
        .chain(std::iter::once(("host".to_string(), host_header(input.url))))
        .chain(extra.iter().map(|(k, v)| ((*k).to_string(), v.clone())))
        .collect();
    headers.sort_by(|a, b| a.0.cmp(&b.0));

    let canonical = canonical_request(input.method, input.url.path(), &headers, input.body);
    let signed_headers = signed_header_names(&headers);

    let scope = format!("{date}/{region}/{service}/aws4_request");
    let string_to_sign = format!(
        "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
        hex::encode(Sha256::digest(canonical.as_bytes()))
    );

    let key = signing_key(&credentials.secret_access_key, &date, region, service);
    let signature = hex::encode(hmac(&key, string_to_sign.as_bytes()));

    let authorization = format!(
        "{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
        credentials.access_key_id
    );

    extra.push(("authorization", authorization));
    extra
}

/// Canonical request; `headers` must be lower-cased and sorted by name
pub fn canonical_request(
    method: &str,
    path: &str,
    headers: &[(String, String)],
    body: &[u8],
) -> String {
    let path = if path.is_empty() { "/" } else { path };
    let canonical_headers: String = headers
        .iter()
        .map(|(k, v)| format!("{k}:{v}\n"))
        .collect();

    format!(
        "{method}\n{path}\n\n{canonical_headers}\n{}\n{}",
        signed_header_names(headers),
        hex::encode(Sha256::digest(body))
    )
}

fn signed_header_names(headers: &[(String, String)]) -> String {
    headers
        .iter()
        .map(|(k, _)| k.as_str())
        .collect::<Vec<_>>()
        .join(";")
}

/// Host header as the HTTP client sends it (port only when non-default)
fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

/// Derive the request signing key for a day, region and service
pub fn signing_key(secret: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac(format!("AWS4{secret}").as_bytes(), date.as_bytes());
    let k_region = hmac(&k_date, region.as_bytes());
    let k_service = hmac(&k_region, service.as_bytes());
    hmac(&k_service, b"aws4_request")
}

fn hmac(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
