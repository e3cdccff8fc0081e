use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use http::Request;
use http::Response;
use http::Uri;
use permit_gate::AdmissionGate;
use permit_gate::RateWindow;
use serde::Serialize;
use tower::BoxError;
use tower::Service;
use tracing::debug;
use tracing::info;

use crate::ClientConfig;
use crate::ConfigError;
use crate::DispatchError;
use crate::DispatchResponse;
use crate::Dispatcher;
use crate::Document;
use crate::HttpTransport;
use crate::OutboundRequest;

/// An [`AdmissionGate`] and a [`Dispatcher`] wired together.
///
/// Every submission is validated first, then waits for a permit, then is sent
/// exactly once. Malformed payloads never spend a permit.
#[derive(Debug, Clone)]
pub struct GatedClient<T = HttpTransport> {
    gate: Arc<AdmissionGate>,
    dispatcher: Dispatcher<T>,
}

impl GatedClient<HttpTransport> {
    /// Builds an HTTP client from `config`.
    ///
    /// Must be called from within a Tokio runtime, which drives the reset ticker.
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let window = config.window()?;
        let endpoint = config.endpoint_uri()?;
        let transport = HttpTransport::new(config.request_timeout()).map_err(ConfigError::Client)?;

        info!(
            %endpoint,
            limit = window.limit().get(),
            period = ?window.period(),
            "gated client ready"
        );
        Ok(Self::with_transport(window, endpoint, transport))
    }
}

impl<T> GatedClient<T> {
    /// Builds a client over any `tower` transport.
    ///
    /// Must be called from within a Tokio runtime, which drives the reset ticker.
    pub fn with_transport(window: RateWindow, endpoint: Uri, transport: T) -> Self {
        let gate = Arc::new(AdmissionGate::new(window));
        Self::from_parts(gate, Dispatcher::new(endpoint, transport))
    }

    /// Builds a client that shares `gate` with other callers.
    pub fn from_parts(gate: Arc<AdmissionGate>, dispatcher: Dispatcher<T>) -> Self {
        Self { gate, dispatcher }
    }

    pub fn gate(&self) -> &Arc<AdmissionGate> {
        &self.gate
    }

    pub fn dispatcher(&self) -> &Dispatcher<T> {
        &self.dispatcher
    }

    /// Shuts the shared gate down. Callers still waiting fail with
    /// [`DispatchError::Shutdown`]; requests already admitted run to completion.
    pub fn shutdown(&self) {
        self.gate.shutdown();
    }
}

impl<T> GatedClient<T>
where
    T: Service<Request<Bytes>, Response = Response<Bytes>, Error = BoxError> + Clone,
{
    /// Validates `outbound`, waits for admission, then sends it.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Serialization`] without consuming a permit if the
    /// request is malformed, [`DispatchError::Shutdown`] if the gate is shut down,
    /// and [`DispatchError::Transport`] if the send itself fails.
    pub async fn submit(&self, outbound: OutboundRequest) -> Result<DispatchResponse, DispatchError> {
        let request = self.dispatcher.prepare(outbound)?;
        self.gate.acquire().await?;
        debug!(granted = self.gate.granted(), "request admitted");
        self.dispatcher.send(request).await
    }

    /// Like [`GatedClient::submit`], but abandons the wait for admission once
    /// `cancel` completes. A request already admitted is always sent.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Cancelled`] if `cancel` won the race.
    pub async fn submit_or_cancel<F>(
        &self,
        outbound: OutboundRequest,
        cancel: F,
    ) -> Result<DispatchResponse, DispatchError>
    where
        F: Future,
    {
        let request = self.dispatcher.prepare(outbound)?;
        self.gate.acquire_or_cancel(cancel).await?;
        self.dispatcher.send(request).await
    }

    /// Serializes `payload` as JSON and submits it.
    pub async fn submit_json<P>(
        &self,
        payload: &P,
        signature: impl Into<String>,
    ) -> Result<DispatchResponse, DispatchError>
    where
        P: Serialize + ?Sized,
    {
        let outbound = self.dispatcher.encode_json(payload, signature)?;
        self.submit(outbound).await
    }

    pub async fn submit_document(
        &self,
        document: &Document,
        signature: impl Into<String>,
    ) -> Result<DispatchResponse, DispatchError> {
        self.submit_json(document, signature).await
    }
}
