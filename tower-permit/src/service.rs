use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::Context;
use std::task::Poll;

use permit_gate::AdmissionGate;
use permit_gate::GateError;
use tower::BoxError;
use tower::Service;

type Acquiring = Pin<Box<dyn Future<Output = Result<(), GateError>> + Send>>;

/// Holds every call back until the shared [`AdmissionGate`] grants a permit.
///
/// The permit is taken in `poll_ready`, so a service that is made ready and
/// then dropped without a call still spends one permit.
pub struct AdmissionService<S> {
    inner: S,
    gate: Arc<AdmissionGate>,
    acquiring: Option<Acquiring>,
    permit_acquired: bool,
}

impl<S: fmt::Debug> fmt::Debug for AdmissionService<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdmissionService")
            .field("inner", &self.inner)
            .field("gate", &self.gate)
            .field("permit_acquired", &self.permit_acquired)
            .finish()
    }
}

// Manually implement Clone because the pending acquisition cannot be cloned
impl<S: Clone> Clone for AdmissionService<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            gate: Arc::clone(&self.gate),
            // We start with a fresh acquisition state for the new clone
            acquiring: None,
            permit_acquired: false,
        }
    }
}

impl<S, Req> Service<Req> for AdmissionService<S>
where
    S: Service<Req, Error = BoxError>,
{
    type Response = S::Response;
    type Error = BoxError;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // Check inner service readiness FIRST to avoid spending permits
        match self.inner.poll_ready(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
            Poll::Ready(Ok(())) => {}
        }

        if self.permit_acquired {
            return Poll::Ready(Ok(()));
        }

        let gate = &self.gate;
        let acquiring = self.acquiring.get_or_insert_with(|| {
            let gate = Arc::clone(gate);
            Box::pin(async move { gate.acquire().await })
        });

        match acquiring.as_mut().poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(outcome) => {
                self.acquiring = None;
                match outcome {
                    Ok(()) => {
                        self.permit_acquired = true;
                        Poll::Ready(Ok(()))
                    }
                    Err(err) => Poll::Ready(Err(Box::new(err))),
                }
            }
        }
    }

    fn call(&mut self, req: Req) -> Self::Future {
        self.permit_acquired = false;
        self.inner.call(req)
    }
}

impl<S> AdmissionService<S> {
    pub fn new(inner: S, gate: Arc<AdmissionGate>) -> Self {
        Self {
            inner,
            gate,
            acquiring: None,
            permit_acquired: false,
        }
    }

    pub fn gate(&self) -> &Arc<AdmissionGate> {
        &self.gate
    }
}
