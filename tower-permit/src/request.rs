use bytes::Bytes;
use http::Response;
use http::StatusCode;
use serde::Serialize;

use crate::DispatchError;

/// An opaque payload and the signature token that vouches for it.
///
/// Built per call and consumed by dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    pub payload: Bytes,
    pub signature: String,
}

impl OutboundRequest {
    pub fn new(payload: impl Into<Bytes>, signature: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            signature: signature.into(),
        }
    }

    /// Serializes `payload` as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Serialization`] if `payload` cannot be represented as JSON.
    pub fn from_json<P>(payload: &P, signature: impl Into<String>) -> Result<Self, DispatchError>
    where
        P: Serialize + ?Sized,
    {
        let body = serde_json::to_vec(payload)
            .map_err(|err| DispatchError::Serialization(err.to_string()))?;
        Ok(Self::new(body, signature))
    }
}

/// The endpoint's answer, passed back unmodified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl DispatchResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

impl From<Response<Bytes>> for DispatchResponse {
    fn from(response: Response<Bytes>) -> Self {
        let (parts, body) = response.into_parts();
        Self {
            status: parts.status,
            body,
        }
    }
}
