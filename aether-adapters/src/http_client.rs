//! JSON-over-HTTPS transport shared by network backends.

use std::sync::Arc;
use std::time::Duration;

use hyper::body::{Bytes, to_bytes};
use hyper::client::HttpConnector;
use hyper::header::CONTENT_TYPE;
use hyper::{Body, Client, Request, StatusCode, Uri};
use hyper_rustls::HttpsConnector;
use rustls::{ClientConfig, OwnedTrustAnchor, RootCertStore};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::time::timeout;
use webpki_roots::TLS_SERVER_ROOTS;

use crate::traits::{BackendError, BackendResult};

/// Client posting JSON bodies and decoding JSON replies, bounded by a timeout.
#[derive(Clone)]
pub(crate) struct JsonClient {
    inner: Client<HttpsConnector<HttpConnector>, Body>,
    timeout: Duration,
}

impl JsonClient {
    /// Builds a client trusting the bundled web PKI roots. Plain `http://`
    /// endpoints are allowed for local daemons.
    pub(crate) fn new(timeout: Duration) -> Self {
        let mut roots = RootCertStore::empty();
        roots.add_trust_anchors(TLS_SERVER_ROOTS.iter().map(|anchor| {
            OwnedTrustAnchor::from_subject_spki_name_constraints(
                anchor.subject,
                anchor.spki,
                anchor.name_constraints,
            )
        }));
        let tls = ClientConfig::builder()
            .with_safe_defaults()
            .with_root_certificates(roots)
            .with_no_client_auth();

        let mut http = HttpConnector::new();
        http.enforce_http(false);

        Self {
            inner: Client::builder().build(HttpsConnector::from((http, Arc::new(tls)))),
            timeout,
        }
    }

    pub(crate) const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// POSTs `payload` to `endpoint` and decodes a successful reply as `R`.
    ///
    /// `provider` prefixes every error message.
    pub(crate) async fn post<P, R>(
        &self,
        provider: &str,
        endpoint: &Uri,
        payload: &P,
    ) -> BackendResult<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let body = serde_json::to_vec(payload).map_err(|err| {
            BackendError::invalid_request(format!("failed to encode {provider} request: {err}"))
        })?;
        let request = Request::post(endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .map_err(|err| {
                BackendError::transport(format!("failed to build {provider} request: {err}"))
            })?;

        let (status, bytes) = timeout(self.timeout, self.send(request))
            .await
            .map_err(|_| BackendError::Timeout {
                after: self.timeout,
            })?
            .map_err(|err| BackendError::transport(format!("{provider} request failed: {err}")))?;

        decode_reply(provider, status, &bytes)
    }

    async fn send(&self, request: Request<Body>) -> Result<(StatusCode, Bytes), hyper::Error> {
        let response = self.inner.request(request).await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body()).await?;
        Ok((status, bytes))
    }
}

fn decode_reply<R: DeserializeOwned>(
    provider: &str,
    status: StatusCode,
    bytes: &[u8],
) -> BackendResult<R> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(BackendError::RateLimited { retry_after: None });
    }
    if !status.is_success() {
        let reason = String::from_utf8_lossy(bytes);
        let message = format!("{provider} returned {status}: {reason}");
        return Err(BackendError::response(message));
    }
    serde_json::from_slice(bytes).map_err(|err| {
        BackendError::response(format!("failed to decode {provider} response: {err}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn error_status_carries_body() {
        let err = decode_reply::<Value>("ollama", StatusCode::NOT_FOUND, b"model missing")
            .expect_err("404 is an error");
        let BackendError::Response { reason } = &err else {
            panic!("expected a response error, got {err:?}");
        };
        assert_eq!(reason, "ollama returned 404 Not Found: model missing");
    }

    #[test]
    fn too_many_requests_maps_to_rate_limit() {
        let err = decode_reply::<Value>("ollama", StatusCode::TOO_MANY_REQUESTS, b"")
            .expect_err("429 is an error");
        assert!(matches!(err, BackendError::RateLimited { retry_after: None }));
    }

    #[test]
    fn malformed_body_is_a_response_error() {
        let err = decode_reply::<Value>("ollama", StatusCode::OK, b"{not json")
            .expect_err("invalid json");
        assert!(matches!(err, BackendError::Response { .. }));
    }
}
