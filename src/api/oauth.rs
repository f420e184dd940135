// src/api/oauth.rs
//! OAuth 1.0a request signing (HMAC-SHA1, user context).
//!
//! Every call to the blocking endpoints must carry an `Authorization: OAuth ...`
//! header whose signature covers the method, the normalized URL and all
//! query/body parameters.

use crate::error::AppError;
use crate::types::Credentials;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Method;
use sha1::Sha1;
use url::Url;

type HmacSha1 = Hmac<Sha1>;

/// RFC 3986 unreserved characters stay literal; everything else is escaped.
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

const SIGNATURE_METHOD: &str = "HMAC-SHA1";
const OAUTH_VERSION: &str = "1.0";

fn encode(value: &str) -> String {
    utf8_percent_encode(value, OAUTH_ENCODE_SET).to_string()
}

/// Signs requests on behalf of one account.
#[derive(Debug, Clone)]
pub struct OAuthSigner {
    credentials: Credentials,
}

impl OAuthSigner {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    /// Builds the `Authorization` header value with a fresh nonce and timestamp.
    pub fn authorization_header(
        &self,
        method: &Method,
        url: &Url,
        body_params: &[(String, String)],
    ) -> Result<String, AppError> {
        let nonce = uuid::Uuid::new_v4().as_simple().to_string();
        let timestamp = chrono::Utc::now().timestamp();
        self.authorization_header_with(method, url, body_params, &nonce, timestamp)
    }

    /// Builds the `Authorization` header value for a given nonce and timestamp.
    pub fn authorization_header_with(
        &self,
        method: &Method,
        url: &Url,
        body_params: &[(String, String)],
        nonce: &str,
        timestamp: i64,
    ) -> Result<String, AppError> {
        let mut oauth_params = self.protocol_params(nonce, timestamp);
        let signature = self.signature(method, url, body_params, &oauth_params)?;
        oauth_params.push(("oauth_signature".to_string(), signature));
        oauth_params.sort();

        let fields: Vec<String> = oauth_params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
            .collect();
        Ok(format!("OAuth {}", fields.join(", ")))
    }

    fn protocol_params(&self, nonce: &str, timestamp: i64) -> Vec<(String, String)> {
        vec![
            (
                "oauth_consumer_key".to_string(),
                self.credentials.consumer_key.expose().to_string(),
            ),
            ("oauth_nonce".to_string(), nonce.to_string()),
            (
                "oauth_signature_method".to_string(),
                SIGNATURE_METHOD.to_string(),
            ),
            ("oauth_timestamp".to_string(), timestamp.to_string()),
            (
                "oauth_token".to_string(),
                self.credentials.access_token.expose().to_string(),
            ),
            ("oauth_version".to_string(), OAUTH_VERSION.to_string()),
        ]
    }

    fn signature(
        &self,
        method: &Method,
        url: &Url,
        body_params: &[(String, String)],
        oauth_params: &[(String, String)],
    ) -> Result<String, AppError> {
        let base = signature_base_string(method, url, body_params, oauth_params);
        let key = format!(
            "{}&{}",
            encode(self.credentials.consumer_secret.expose()),
            encode(self.credentials.access_token_secret.expose())
        );

        let mut mac = HmacSha1::new_from_slice(key.as_bytes())
            .map_err(|e| AppError::Signing(e.to_string()))?;
        mac.update(base.as_bytes());
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }
}

/// `METHOD&encoded-base-url&encoded-parameter-string`
pub fn signature_base_string(
    method: &Method,
    url: &Url,
    body_params: &[(String, String)],
    oauth_params: &[(String, String)],
) -> String {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (encode(&k), encode(&v)))
        .chain(body_params.iter().map(|(k, v)| (encode(k), encode(v))))
        .chain(oauth_params.iter().map(|(k, v)| (encode(k), encode(v))))
        .collect();
    params.sort();

    let parameter_string = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.as_str().to_uppercase(),
        encode(&base_url(url)),
        encode(&parameter_string)
    )
}

/// Scheme, host, non-default port and path; no query or fragment.
fn base_url(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default().to_lowercase();
    let port = url.port().map(|p| format!(":{}", p)).unwrap_or_default();
    format!("{}://{}{}{}", url.scheme(), host, port, url.path())
}
