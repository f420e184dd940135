// src/api/parser.rs
//! Turns raw X API responses into domain values or typed errors.

use super::client::ApiResponse;
use super::responses::{BlockingListEnvelope, ErrorBody, UnblockEnvelope, UserEnvelope};
use super::BlockedPage;
use crate::constants::ERROR_BODY_PREVIEW_LENGTH;
use crate::error::{AppError, XErrorCode};
use crate::types::{AccountIdentity, PaginationToken};
use reqwest::StatusCode;

/// Parse any X API response, mapping non-success statuses to errors.
pub fn parse_api_response<T>(result: ApiResponse<String>) -> Result<T, AppError>
where
    T: serde::de::DeserializeOwned,
{
    if result.status.is_success() {
        parse_success(&result.data, &result.url)
    } else {
        Err(parse_error(&result))
    }
}

fn parse_success<T>(body: &str, url: &str) -> Result<T, AppError>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_str(body).map_err(|e| {
        log::error!("Failed to parse response from {}: {}", url, e);
        AppError::MalformedResponse(format!("{} (body: {})", e, preview(body)))
    })
}

fn parse_error(result: &ApiResponse<String>) -> AppError {
    if result.status == StatusCode::TOO_MANY_REQUESTS {
        return AppError::RateLimited {
            reset_at: result.rate_limit.reset_at,
        };
    }

    let message = serde_json::from_str::<ErrorBody>(&result.data)
        .ok()
        .and_then(|body| body.message())
        .unwrap_or_else(|| format!("HTTP {} from {}: {}", result.status, result.url, preview(&result.data)));

    AppError::XService {
        code: XErrorCode::from_http_status(result.status.as_u16()),
        message,
        status: result.status,
    }
}

fn preview(body: &str) -> String {
    if body.chars().count() > ERROR_BODY_PREVIEW_LENGTH {
        let cut: String = body.chars().take(ERROR_BODY_PREVIEW_LENGTH).collect();
        format!("{}...", cut)
    } else {
        body.to_string()
    }
}

/// Parse the `users/me` response.
pub fn parse_me_response(result: ApiResponse<String>) -> Result<AccountIdentity, AppError> {
    let envelope: UserEnvelope = parse_api_response(result)?;
    envelope
        .data
        .ok_or_else(|| AppError::MalformedResponse("users/me response has no data".to_string()))
}

/// Parse one page of the blocking list.
pub fn parse_blocking_page(result: ApiResponse<String>) -> Result<BlockedPage, AppError> {
    let envelope: BlockingListEnvelope = parse_api_response(result)?;
    let next_token = match envelope.meta.next_token {
        Some(token) => match PaginationToken::new(token) {
            Ok(token) => Some(token),
            Err(e) => {
                log::warn!("Ignoring unusable next_token ({}); treating page as the last", e);
                None
            }
        },
        None => None,
    };

    if envelope.meta.result_count as usize != envelope.data.len() {
        log::debug!(
            "Blocking page reports result_count {} but carries {} users",
            envelope.meta.result_count,
            envelope.data.len()
        );
    }

    Ok(BlockedPage {
        users: envelope.data,
        next_token,
    })
}

/// Parse an unblock response, insisting the block is actually gone.
pub fn parse_unblock_response(result: ApiResponse<String>) -> Result<(), AppError> {
    let envelope: UnblockEnvelope = parse_api_response(result)?;
    match envelope.data {
        Some(state) if !state.blocking => Ok(()),
        Some(_) => Err(AppError::MalformedResponse(
            "Unblock acknowledged but the user is still blocked".to_string(),
        )),
        None => Err(AppError::MalformedResponse(
            "Unblock response has no data".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::rate_limit::RateLimitStatus;
    use chrono::{TimeZone, Utc};

    fn response(status: u16, body: &str) -> ApiResponse<String> {
        ApiResponse {
            data: body.to_string(),
            status: StatusCode::from_u16(status).unwrap(),
            url: "https://api.twitter.com/2/users/1/blocking".to_string(),
            rate_limit: RateLimitStatus::default(),
        }
    }

    #[test]
    fn parses_page_with_next_token() {
        let body = r#"{
            "data": [{"id": "2244994945", "name": "X Dev", "username": "XDevelopers"}],
            "meta": {"result_count": 1, "next_token": "7140dibdnow9c7btw481q6yxnb9vz"}
        }"#;
        let page = parse_blocking_page(response(200, body)).unwrap();
        assert_eq!(page.users.len(), 1);
        assert_eq!(page.users[0].id.as_str(), "2244994945");
        assert_eq!(page.users[0].username, "XDevelopers");
        assert_eq!(
            page.next_token.as_ref().map(|t| t.as_str()),
            Some("7140dibdnow9c7btw481q6yxnb9vz")
        );
    }

    #[test]
    fn parses_exhausted_page() {
        let page = parse_blocking_page(response(200, r#"{"meta": {"result_count": 0}}"#)).unwrap();
        assert!(page.users.is_empty());
        assert!(page.next_token.is_none());
    }

    #[test]
    fn blank_next_token_ends_pagination() {
        let body = r#"{
            "data": [{"id": "12", "name": "Twelve", "username": "twelve"}],
            "meta": {"result_count": 1, "next_token": "   "}
        }"#;
        let page = parse_blocking_page(response(200, body)).unwrap();
        assert_eq!(page.users.len(), 1);
        assert!(page.next_token.is_none());
    }

    #[test]
    fn rate_limit_carries_reset_time() {
        let mut result = response(429, r#"{"title": "Too Many Requests", "status": 429}"#);
        let reset = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        result.rate_limit.reset_at = Some(reset);

        match parse_blocking_page(result) {
            Err(AppError::RateLimited { reset_at }) => assert_eq!(reset_at, Some(reset)),
            other => panic!("Expected RateLimited, got {:?}", other),
        }
    }

    #[test]
    fn problem_body_becomes_service_error() {
        let body = r#"{"title": "Unauthorized", "type": "about:blank", "status": 401, "detail": "Unauthorized"}"#;
        match parse_me_response(response(401, body)) {
            Err(AppError::XService { code, message, .. }) => {
                assert_eq!(code, XErrorCode::Unauthorized);
                assert_eq!(message, "Unauthorized");
            }
            other => panic!("Expected XService, got {:?}", other),
        }
    }

    #[test]
    fn legacy_errors_list_is_joined() {
        let body = r#"{"errors": [{"message": "Invalid or expired token"}, {"message": "Try again"}]}"#;
        match parse_me_response(response(403, body)) {
            Err(AppError::XService { message, .. }) => {
                assert_eq!(message, "Invalid or expired token; Try again")
            }
            other => panic!("Expected XService, got {:?}", other),
        }
    }

    #[test]
    fn unparseable_error_body_falls_back_to_status() {
        match parse_unblock_response(response(502, "<html>bad gateway</html>")) {
            Err(AppError::XService { code, message, .. }) => {
                assert_eq!(code, XErrorCode::ServerError);
                assert!(message.starts_with("HTTP 502 Bad Gateway"));
            }
            other => panic!("Expected XService, got {:?}", other),
        }
    }

    #[test]
    fn unblock_must_report_not_blocking() {
        assert!(parse_unblock_response(response(200, r#"{"data": {"blocking": false}}"#)).is_ok());
        assert!(matches!(
            parse_unblock_response(response(200, r#"{"data": {"blocking": true}}"#)),
            Err(AppError::MalformedResponse(_))
        ));
    }
}
