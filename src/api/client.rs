// src/api/client.rs
//! HTTP client for the X API v2 blocking endpoints.
//!
//! Handles signing and transport; parsing lives in `parser` and
//! pacing/retry decisions live with the job.

use super::oauth::OAuthSigner;
use super::parser;
use super::rate_limit::RateLimitStatus;
use super::{BlockListRepository, BlockedPage};
use crate::error::AppError;
use crate::types::{AccountIdentity, ApiBaseUrl, Credentials, PageSize, PaginationToken, UserId};
use reqwest::{header, Client, Method, Response};
use url::Url;

const USER_AGENT: &str = concat!("xunblock/", env!("CARGO_PKG_VERSION"));

/// A signing wrapper around reqwest Client for X API requests.
#[derive(Clone)]
pub struct XHttpClient {
    client: Client,
    signer: OAuthSigner,
    base_url: ApiBaseUrl,
}

impl XHttpClient {
    /// Creates a new HTTP client that signs every request with `credentials`.
    pub fn new(credentials: Credentials, base_url: ApiBaseUrl) -> Result<Self, AppError> {
        let client = Client::builder()
            .default_headers(Self::create_headers())
            .build()?;
        Ok(Self {
            client,
            signer: OAuthSigner::new(credentials),
            base_url,
        })
    }

    fn create_headers() -> header::HeaderMap {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::USER_AGENT, header::HeaderValue::from_static(USER_AGENT));
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        headers
    }

    fn endpoint_url(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Url, AppError> {
        let raw = self.base_url.endpoint(endpoint);
        let mut url = Url::parse(&raw)
            .map_err(|e| AppError::MalformedResponse(format!("Bad endpoint URL {}: {}", raw, e)))?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    /// Sends a signed request and reads the body along with rate-limit headers.
    async fn send(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<ApiResponse<String>, AppError> {
        let url = self.endpoint_url(endpoint, query)?;
        let authorization = self.signer.authorization_header(&method, &url, &[])?;

        log::debug!("{} {}", method, url);
        let response = self
            .client
            .request(method, url)
            .header(header::AUTHORIZATION, authorization)
            .send()
            .await?;

        let result = extract_response_text(response).await?;
        log::debug!(
            "{} (status: {}) {}",
            result.url,
            result.status,
            result.rate_limit.format_status()
        );
        if result.rate_limit.is_exhausted() {
            log::info!("Endpoint window exhausted. {}", result.rate_limit.format_status());
        }
        Ok(result)
    }
}

#[async_trait::async_trait]
impl BlockListRepository for XHttpClient {
    async fn authenticated_user(&self) -> Result<AccountIdentity, AppError> {
        let result = self.send(Method::GET, "users/me", &[]).await?;
        parser::parse_me_response(result)
    }

    async fn blocked_users(
        &self,
        source: &UserId,
        cursor: Option<&PaginationToken>,
        page_size: PageSize,
    ) -> Result<BlockedPage, AppError> {
        let endpoint = format!("users/{}/blocking", source);
        let mut query = vec![("max_results", page_size.get().to_string())];
        if let Some(cursor) = cursor {
            query.push(("pagination_token", cursor.as_str().to_string()));
        }
        let result = self.send(Method::GET, &endpoint, &query).await?;
        parser::parse_blocking_page(result)
    }

    async fn unblock(&self, source: &UserId, target: &UserId) -> Result<(), AppError> {
        let endpoint = format!("users/{}/blocking/{}", source, target);
        let result = self.send(Method::DELETE, &endpoint, &[]).await?;
        parser::parse_unblock_response(result)
    }
}

/// Result of an HTTP operation with response metadata.
#[derive(Debug)]
pub struct ApiResponse<T> {
    pub data: T,
    pub status: reqwest::StatusCode,
    pub url: String,
    pub rate_limit: RateLimitStatus,
}

/// Extracts the response body as text with status, URL and rate-limit metadata.
pub async fn extract_response_text(response: Response) -> Result<ApiResponse<String>, AppError> {
    let status = response.status();
    let url = response.url().to_string();
    let rate_limit = RateLimitStatus::from_headers(response.headers());
    let text = response.text().await?;

    Ok(ApiResponse {
        data: text,
        status,
        url,
        rate_limit,
    })
}
