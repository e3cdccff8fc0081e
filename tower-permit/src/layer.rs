use std::sync::Arc;

use permit_gate::AdmissionGate;
use tower::Layer;

use crate::service::AdmissionService;

/// Applies admission control to requests.
#[derive(Debug, Clone)]
pub struct AdmissionLayer {
    gate: Arc<AdmissionGate>,
}

impl AdmissionLayer {
    /// Create an AdmissionLayer
    ///
    /// Every service produced by this layer draws from the same gate.
    pub fn new(gate: Arc<AdmissionGate>) -> Self {
        AdmissionLayer { gate }
    }
}

impl<S> Layer<S> for AdmissionLayer {
    type Service = AdmissionService<S>;

    fn layer(&self, service: S) -> Self::Service {
        AdmissionService::new(service, self.gate.clone())
    }
}
