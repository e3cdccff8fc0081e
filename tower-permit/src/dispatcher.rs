use bytes::Bytes;
use http::HeaderValue;
use http::Method;
use http::Request;
use http::Response;
use http::Uri;
use http::header::CONTENT_TYPE;
use http::header::HeaderName;
use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry::metrics::Counter;
use serde::Serialize;
use serde::de::IgnoredAny;
use tower::BoxError;
use tower::Service;
use tower::ServiceExt;
use tracing::debug;
use tracing::error;
use tracing::warn;

use crate::DispatchError;
use crate::DispatchResponse;
use crate::OutboundRequest;

/// Header carrying the caller's signature token.
pub const SIGNATURE: HeaderName = HeaderName::from_static("signature");

const APPLICATION_JSON: &str = "application/json";

#[derive(Clone, Debug)]
struct DispatcherMetrics {
    dispatched: Counter<u64>,
    failures: Counter<u64>,
}

/// Sends signed JSON documents to a fixed endpoint through a `tower` transport.
///
/// The dispatcher holds no per-call state, so clones can be used from many
/// tasks at once. It does not rate limit; callers are expected to hold a
/// permit from an [`permit_gate::AdmissionGate`] before calling
/// [`Dispatcher::send`].
#[derive(Clone, Debug)]
pub struct Dispatcher<T> {
    endpoint: Uri,
    transport: T,
    instruments: DispatcherMetrics,
}

impl<T> Dispatcher<T> {
    pub fn new(endpoint: Uri, transport: T) -> Self {
        let meter = global::meter("dispatcher");
        let instruments = DispatcherMetrics {
            dispatched: meter.u64_counter("dispatched").build(),
            failures: meter.u64_counter("dispatch_failures").build(),
        };

        Self {
            endpoint,
            transport,
            instruments,
        }
    }

    pub fn endpoint(&self) -> &Uri {
        &self.endpoint
    }

    /// Builds the wire request for `outbound` without sending it.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Serialization`] if the payload is not well formed
    /// JSON or the signature is not a legal header value.
    pub fn prepare(&self, outbound: OutboundRequest) -> Result<Request<Bytes>, DispatchError> {
        self.build(outbound).inspect_err(|err| {
            error!(%err, "failed to serialize outbound request");
            self.record_failure(err);
        })
    }

    fn build(&self, outbound: OutboundRequest) -> Result<Request<Bytes>, DispatchError> {
        serde_json::from_slice::<IgnoredAny>(&outbound.payload)
            .map_err(|err| DispatchError::Serialization(format!("payload is not JSON: {err}")))?;

        let signature = HeaderValue::from_str(&outbound.signature).map_err(|err| {
            DispatchError::Serialization(format!("signature is not a valid header value: {err}"))
        })?;

        Request::builder()
            .method(Method::POST)
            .uri(self.endpoint.clone())
            .header(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON))
            .header(SIGNATURE, signature)
            .body(outbound.payload)
            .map_err(|err| DispatchError::Serialization(err.to_string()))
    }

    /// Serializes `payload` as JSON, counting failures like any other
    /// serialization error.
    pub(crate) fn encode_json<P>(
        &self,
        payload: &P,
        signature: impl Into<String>,
    ) -> Result<OutboundRequest, DispatchError>
    where
        P: Serialize + ?Sized,
    {
        OutboundRequest::from_json(payload, signature).inspect_err(|err| {
            error!(%err, "failed to serialize outbound request");
            self.record_failure(err);
        })
    }

    fn record_failure(&self, err: &DispatchError) {
        self.instruments
            .failures
            .add(1, &[KeyValue::new("kind", err.kind())]);
    }
}

impl<T> Dispatcher<T>
where
    T: Service<Request<Bytes>, Response = Response<Bytes>, Error = BoxError> + Clone,
{
    /// Sends a prepared request exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Transport`] carrying the cause if the transport fails.
    pub async fn send(&self, request: Request<Bytes>) -> Result<DispatchResponse, DispatchError> {
        let transport = self.transport.clone();
        let outcome = match transport.oneshot(request).await {
            Ok(response) => Ok(DispatchResponse::from(response)),
            Err(err) => {
                warn!(%err, endpoint = %self.endpoint, "transport failure");
                Err(DispatchError::Transport(err))
            }
        };

        match &outcome {
            Ok(response) => {
                self.instruments.dispatched.add(1, &[]);
                debug!(status = %response.status, "request dispatched");
            }
            Err(err) => self.record_failure(err),
        }
        outcome
    }

    /// Builds and sends a request for an already serialized payload.
    pub async fn dispatch(
        &self,
        payload: impl Into<Bytes>,
        signature: impl Into<String>,
    ) -> Result<DispatchResponse, DispatchError> {
        let request = self.prepare(OutboundRequest::new(payload, signature))?;
        self.send(request).await
    }

    /// Serializes `payload` as JSON, then builds and sends the request.
    pub async fn dispatch_json<P>(
        &self,
        payload: &P,
        signature: impl Into<String>,
    ) -> Result<DispatchResponse, DispatchError>
    where
        P: Serialize + ?Sized,
    {
        let request = self.prepare(self.encode_json(payload, signature)?)?;
        self.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use http::StatusCode;
    use tower::service_fn;

    use super::*;

    fn endpoint() -> Uri {
        Uri::from_static("http://documents.test/api/v3/lk/documents/create")
    }

    #[test]
    fn prepare_sets_method_uri_and_headers() {
        let dispatcher = Dispatcher::new(endpoint(), ());
        let request = dispatcher
            .prepare(OutboundRequest::new(r#"{"docId":1}"#, "signed-token"))
            .unwrap();

        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.uri(), &endpoint());
        assert_eq!(request.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(request.headers()["Signature"], "signed-token");
        assert_eq!(request.body(), &Bytes::from_static(br#"{"docId":1}"#));
    }

    #[test]
    fn prepare_rejects_malformed_payloads() {
        let dispatcher = Dispatcher::new(endpoint(), ());
        let err = dispatcher
            .prepare(OutboundRequest::new("{not json", "token"))
            .unwrap_err();
        assert!(matches!(err, DispatchError::Serialization(_)));

        let err = dispatcher
            .prepare(OutboundRequest::new(Bytes::new(), "token"))
            .unwrap_err();
        assert!(matches!(err, DispatchError::Serialization(_)));
    }

    #[test]
    fn prepare_rejects_signatures_that_cannot_be_headers() {
        let dispatcher = Dispatcher::new(endpoint(), ());
        let err = dispatcher
            .prepare(OutboundRequest::new("{}", "line\nbreak"))
            .unwrap_err();
        assert!(matches!(err, DispatchError::Serialization(msg) if msg.contains("signature")));
    }

    #[tokio::test]
    async fn transport_is_called_exactly_once_on_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        let transport = service_fn(move |_req: Request<Bytes>| {
            counted.fetch_add(1, Ordering::SeqCst);
            async { Err::<Response<Bytes>, BoxError>("connection refused".into()) }
        });

        let dispatcher = Dispatcher::new(endpoint(), transport);
        let err = dispatcher.dispatch("{}", "token").await.unwrap_err();

        assert!(matches!(err, DispatchError::Transport(ref cause) if cause.to_string() == "connection refused"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn responses_come_back_verbatim() {
        let transport = service_fn(|req: Request<Bytes>| async move {
            let echoed = req.into_body();
            Ok::<_, BoxError>(
                Response::builder()
                    .status(StatusCode::UNPROCESSABLE_ENTITY)
                    .body(echoed)
                    .unwrap(),
            )
        });

        let dispatcher = Dispatcher::new(endpoint(), transport);
        let response = dispatcher
            .dispatch_json(&serde_json::json!({ "docType": "LP_INTRODUCE_GOODS" }), "token")
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            response.body,
            Bytes::from_static(br#"{"docType":"LP_INTRODUCE_GOODS"}"#)
        );
    }
}
