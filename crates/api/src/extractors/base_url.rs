//! Base URL of the current request, used to build links in emails.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};

use crate::app::AppState;
use crate::error::ApiError;

const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
const X_FORWARDED_HOST: &str = "x-forwarded-host";

/// `scheme://host[:port]` of the application, without a trailing slash.
///
/// Resolution order:
/// 1. `server.public_base_url` when configured
/// 2. `X-Forwarded-Proto` / `X-Forwarded-Host` when `security.trust_forwarded_headers` is set
/// 3. the `Host` header over plain http
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestBaseUrl(pub String);

impl RequestBaseUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[async_trait]
impl FromRequestParts<AppState> for RequestBaseUrl {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let scheme = parts.uri.scheme_str().unwrap_or("http");
        resolve_base_url(
            &parts.headers,
            scheme,
            &state.config.server.public_base_url,
            state.config.security.trust_forwarded_headers,
        )
        .map(RequestBaseUrl)
        .ok_or_else(|| ApiError::Validation("Unable to determine the request host".to_string()))
    }
}

pub fn resolve_base_url(
    headers: &HeaderMap,
    default_scheme: &str,
    public_base_url: &str,
    trust_forwarded: bool,
) -> Option<String> {
    let configured = public_base_url.trim().trim_end_matches('/');
    if !configured.is_empty() {
        return Some(configured.to_string());
    }

    if trust_forwarded {
        if let Some(host) = first_value(headers, X_FORWARDED_HOST).filter(|h| valid_host(h)) {
            let scheme = first_value(headers, X_FORWARDED_PROTO)
                .map(|p| p.to_ascii_lowercase())
                .filter(|p| p == "http" || p == "https")
                .unwrap_or_else(|| default_scheme.to_string());
            return Some(format!("{}://{}", scheme, host));
        }
    }

    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|h| valid_host(h))?;
    Some(format!("{}://{}", default_scheme, host))
}

/// First entry of a comma-separated header.
fn first_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn valid_host(host: &str) -> bool {
    !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':' | '[' | ']' | '_'))
}
