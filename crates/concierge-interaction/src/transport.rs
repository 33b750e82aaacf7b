//! Shared HTTP plumbing for every recommendation-service client.

use concierge_core::backend::CredentialProvider;
use concierge_core::config::ApiConfig;
use concierge_core::error::{ConciergeError, Result};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

/// Identifies the resource behind a lookup so a 404 becomes `NotFound`.
#[derive(Debug, Clone)]
pub(crate) struct Lookup {
    pub entity_type: &'static str,
    pub id: String,
}

impl Lookup {
    pub fn new(entity_type: &'static str, id: impl ToString) -> Self {
        Self {
            entity_type,
            id: id.to_string(),
        }
    }
}

/// One `reqwest::Client` plus the base URL and the injected credentials.
///
/// Cloning is cheap; the auth, admin and data clients share one transport.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl HttpTransport {
    pub fn new(config: &ApiConfig, credentials: Arc<dyn CredentialProvider>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|err| ConciergeError::config(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialProvider> {
        &self.credentials
    }

    /// Builds a request to `path`, attaching the bearer token when logged in.
    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let request = self.client.request(method, url);
        match self.credentials.bearer_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Sends the request and turns non-2xx statuses into errors.
    ///
    /// A 401 clears the stored credentials before returning `Unauthorized`.
    pub(crate) async fn execute(
        &self,
        request: RequestBuilder,
        lookup: Option<Lookup>,
    ) -> Result<Response> {
        let response = request.send().await.map_err(|err| {
            let reason = if err.is_timeout() {
                "timed out"
            } else if err.is_connect() {
                "could not connect"
            } else {
                "failed"
            };
            ConciergeError::transport(None, format!("Request {reason}: {err}"))
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!("[Api] {} rejected the credentials, logging out", response.url().path());
            if let Err(e) = self.credentials.clear() {
                tracing::error!("[Api] Failed to clear credentials: {}", e);
            }
            return Err(ConciergeError::Unauthorized);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read error body".to_string());
        Err(map_http_error(status, &body, lookup))
    }

    /// Sends the request and decodes a JSON body.
    pub(crate) async fn json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        lookup: Option<Lookup>,
    ) -> Result<T> {
        let response = self.execute(request, lookup).await?;
        let status = response.status();
        response.json::<T>().await.map_err(|err| {
            ConciergeError::transport(
                Some(status.as_u16()),
                format!("Failed to parse response: {err}"),
            )
        })
    }

    /// Sends the request and discards the body.
    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<()> {
        self.execute(request, None).await.map(|_| ())
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

fn map_http_error(status: StatusCode, body: &str, lookup: Option<Lookup>) -> ConciergeError {
    if status == StatusCode::NOT_FOUND
        && let Some(lookup) = lookup
    {
        return ConciergeError::not_found(lookup.entity_type, lookup.id);
    }

    let message = match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            detail: serde_json::Value::String(detail),
        }) => detail,
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) if body.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("Unexpected status")
            .to_string(),
        Err(_) => body.to_string(),
    };

    ConciergeError::transport(Some(status.as_u16()), message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_field_is_extracted() {
        let err = map_http_error(
            StatusCode::BAD_REQUEST,
            r#"{"detail": "Username already taken"}"#,
            None,
        );
        assert_eq!(
            err,
            ConciergeError::transport(Some(400), "Username already taken")
        );
    }

    #[test]
    fn test_raw_body_used_without_detail() {
        let err = map_http_error(StatusCode::BAD_GATEWAY, "upstream down", None);
        assert_eq!(err, ConciergeError::transport(Some(502), "upstream down"));

        let err = map_http_error(StatusCode::SERVICE_UNAVAILABLE, "", None);
        assert_eq!(
            err,
            ConciergeError::transport(Some(503), "Service Unavailable")
        );
    }

    #[test]
    fn test_not_found_only_for_lookups() {
        let err = map_http_error(StatusCode::NOT_FOUND, "{}", Some(Lookup::new("venue", 9)));
        assert_eq!(err, ConciergeError::not_found("venue", "9"));

        let err = map_http_error(StatusCode::NOT_FOUND, r#"{"detail": "Not Found"}"#, None);
        assert!(matches!(err, ConciergeError::Transport { status: Some(404), .. }));
    }
}
