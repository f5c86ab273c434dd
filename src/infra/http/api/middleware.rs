use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, HeaderValue, Request, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use metrics::counter;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use super::error::ApiError;
use super::rate_limit::{RATE_LIMITED_TOTAL, RateDecision};
use super::state::ApiState;

const UNKNOWN_CLIENT: &str = "unknown";

/// Gate admin routes behind the shared bearer token.
pub async fn admin_auth(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = extract_token(request.headers().get(header::AUTHORIZATION)) else {
        return ApiError::unauthorized().into_response();
    };

    let Some(expected) = state.admin_token.as_deref() else {
        warn!(
            target = "chaptrack::api::auth",
            "admin request rejected: no admin token configured"
        );
        return ApiError::forbidden().into_response();
    };

    if !bool::from(token.as_bytes().ct_eq(expected.as_bytes())) {
        return ApiError::forbidden().into_response();
    }

    next.run(request).await
}

pub async fn api_rate_limit(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client = client_key(&request);
    let limiter = &state.rate_limiter;

    match limiter.check(&client) {
        RateDecision::Allowed { remaining } => {
            let mut response = next.run(request).await;
            insert_rate_headers(response.headers_mut(), limiter.limit(), remaining);
            response
        }
        RateDecision::Limited { retry_after_secs } => {
            counter!(RATE_LIMITED_TOTAL).increment(1);
            debug!(
                target = "chaptrack::api::ratelimit",
                client = %client,
                retry_after_secs,
                "request rejected by rate limiter"
            );
            let mut response = ApiError::rate_limited(retry_after_secs).into_response();
            insert_rate_headers(response.headers_mut(), limiter.limit(), 0);
            response
        }
    }
}

fn insert_rate_headers(headers: &mut HeaderMap, limit: u32, remaining: u32) {
    headers.insert("ratelimit-limit", HeaderValue::from(limit));
    headers.insert("ratelimit-remaining", HeaderValue::from(remaining));
}

/// Peer address when the server recorded one, else the first forwarded hop.
fn client_key(request: &Request<Body>) -> String {
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}

fn extract_token(header: Option<&HeaderValue>) -> Option<String> {
    let raw = header?.to_str().ok()?;
    let bearer = raw.strip_prefix("Bearer ")?.trim();
    if bearer.is_empty() {
        return None;
    }
    Some(bearer.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_token_is_extracted() {
        let header = HeaderValue::from_static("Bearer secret");
        assert_eq!(extract_token(Some(&header)).as_deref(), Some("secret"));
    }

    #[test]
    fn other_schemes_and_blank_tokens_are_ignored() {
        assert_eq!(
            extract_token(Some(&HeaderValue::from_static("Basic abc"))),
            None
        );
        assert_eq!(extract_token(Some(&HeaderValue::from_static("Bearer "))), None);
        assert_eq!(extract_token(None), None);
    }

    #[test]
    fn client_key_prefers_peer_address() {
        let mut request = Request::builder()
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .body(Body::empty())
            .expect("request");
        assert_eq!(client_key(&request), "203.0.113.9");

        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 7], 5555))));
        assert_eq!(client_key(&request), "192.0.2.7");
    }
}
