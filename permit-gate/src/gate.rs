use std::fmt;
use std::future::Future;
use std::sync::Arc;

use opentelemetry::global;
use opentelemetry::metrics::Counter;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio::sync::SemaphorePermit;
use tokio::sync::TryAcquireError;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio::time::MissedTickBehavior;
use tokio::time::interval_at;
use tracing::debug;
use tracing::info;

use crate::GateError;
use crate::RateWindow;

/// Observable state of an [`AdmissionGate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Fewer than `limit` permits have been granted in the current window.
    Open,
    /// Every permit of the current window has been granted; callers park.
    Saturated,
    /// Terminal. Every acquisition fails with [`GateError::Shutdown`].
    ShutDown,
}

#[derive(Clone, Debug)]
struct GateMetrics {
    admitted: Counter<u64>,
    parked: Counter<u64>,
    resets: Counter<u64>,
}

#[derive(Debug, Default)]
struct PermitCounter {
    granted: usize,
}

struct Shared {
    window: RateWindow,
    // Fair, so callers parked before a reset are served before later arrivals.
    permits: Semaphore,
    // Consuming a permit and refilling the pool both happen under this lock.
    counter: Mutex<PermitCounter>,
    instruments: GateMetrics,
}

impl Shared {
    fn consume(&self, permit: SemaphorePermit<'_>) {
        let mut counter = self.counter.lock();
        permit.forget();
        counter.granted += 1;
        let granted = counter.granted;
        drop(counter);

        self.instruments.admitted.add(1, &[]);
        debug!(
            granted,
            limit = self.window.limit().get(),
            "admission permit granted"
        );
    }

    fn reset(&self) {
        if self.permits.is_closed() {
            return;
        }
        let mut counter = self.counter.lock();
        let refill = counter.granted;
        counter.granted = 0;
        self.permits.add_permits(refill);
        drop(counter);

        self.instruments.resets.add(1, &[]);
        debug!(refill, "admission window reset");
    }

    fn granted(&self) -> usize {
        self.counter.lock().granted
    }
}

/// A fixed window admission gate.
///
/// At most `limit` callers are admitted between two consecutive resets. A
/// background ticker resets the window every `period`, whether or not any
/// calls were made. Callers that find the window exhausted park until the next
/// reset; they never spin.
///
/// The ticker is stopped by [`AdmissionGate::shutdown`], which also runs when
/// the gate is dropped. Share a gate between tasks with an `Arc`.
pub struct AdmissionGate {
    shared: Arc<Shared>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for AdmissionGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdmissionGate")
            .field("window", &self.shared.window)
            .field("granted", &self.shared.granted())
            .field("state", &self.state())
            .finish()
    }
}

impl AdmissionGate {
    /// Creates a gate and starts its reset ticker on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called from outside a Tokio runtime.
    pub fn new(window: RateWindow) -> Self {
        Self::with_handle(window, &Handle::current())
    }

    /// Creates a gate whose reset ticker runs on the given runtime.
    ///
    /// Useful when the callers are plain threads using
    /// [`AdmissionGate::acquire_blocking`].
    pub fn with_handle(window: RateWindow, handle: &Handle) -> Self {
        let meter = global::meter("admission_gate");
        let instruments = GateMetrics {
            admitted: meter.u64_counter("admitted").build(),
            parked: meter.u64_counter("parked").build(),
            resets: meter.u64_counter("resets").build(),
        };

        let shared = Arc::new(Shared {
            window,
            permits: Semaphore::new(window.limit().get()),
            counter: Mutex::new(PermitCounter::default()),
            instruments,
        });

        let start = Instant::now() + window.first_reset();
        let ticking = Arc::clone(&shared);
        let ticker = handle.spawn(async move {
            let mut interval = interval_at(start, ticking.window.period());
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                ticking.reset();
            }
        });

        info!(
            limit = window.limit().get(),
            period = ?window.period(),
            first_reset = ?window.first_reset(),
            "admission gate started"
        );

        Self {
            shared,
            ticker: Mutex::new(Some(ticker)),
        }
    }

    /// Waits until a permit is available and consumes it.
    ///
    /// Dropping the returned future before it completes cancels the wait
    /// without consuming anything.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Shutdown`] if the gate is shut down before a
    /// permit could be granted.
    pub async fn acquire(&self) -> Result<(), GateError> {
        let permit = match self.shared.permits.try_acquire() {
            Ok(permit) => permit,
            Err(TryAcquireError::Closed) => return Err(GateError::Shutdown),
            Err(TryAcquireError::NoPermits) => {
                self.shared.instruments.parked.add(1, &[]);
                self.shared
                    .permits
                    .acquire()
                    .await
                    .map_err(|_| GateError::Shutdown)?
            }
        };
        self.shared.consume(permit);
        Ok(())
    }

    /// Like [`AdmissionGate::acquire`], but gives up once `cancel` completes.
    ///
    /// A cancellation that is already complete wins over an available permit.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Cancelled`] if `cancel` finished first, and
    /// [`GateError::Shutdown`] if the gate was shut down.
    pub async fn acquire_or_cancel<F>(&self, cancel: F) -> Result<(), GateError>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            _ = cancel => {
                debug!("admission wait cancelled");
                Err(GateError::Cancelled)
            }
            admitted = self.acquire() => admitted,
        }
    }

    /// Blocks the current thread until a permit is available and consumes it.
    ///
    /// Meant for plain threads, such as those from `spawn_blocking`. The reset
    /// ticker must be running on a runtime that this thread does not block.
    pub fn acquire_blocking(&self) -> Result<(), GateError> {
        futures::executor::block_on(self.acquire())
    }

    /// Consumes a permit if one is available right now.
    ///
    /// Returns `Ok(false)` when the current window is exhausted.
    pub fn try_acquire(&self) -> Result<bool, GateError> {
        match self.shared.permits.try_acquire() {
            Ok(permit) => {
                self.shared.consume(permit);
                Ok(true)
            }
            Err(TryAcquireError::NoPermits) => Ok(false),
            Err(TryAcquireError::Closed) => Err(GateError::Shutdown),
        }
    }

    /// Starts a new window: the granted count drops to zero and parked callers wake.
    ///
    /// The ticker calls this once per period. It does nothing after shutdown.
    pub fn reset(&self) {
        self.shared.reset();
    }

    /// Stops the reset ticker and fails every parked and future acquisition
    /// with [`GateError::Shutdown`].
    ///
    /// Calling it again has no further effect.
    pub fn shutdown(&self) {
        // Held until the pool is closed, so a concurrent caller cannot return
        // while the gate still admits.
        let mut ticker = self.ticker.lock();
        let Some(handle) = ticker.take() else {
            return;
        };
        handle.abort();
        self.shared.permits.close();
        drop(ticker);
        info!(
            granted = self.shared.granted(),
            "admission gate shut down"
        );
    }

    pub fn state(&self) -> GateState {
        if self.shared.permits.is_closed() {
            GateState::ShutDown
        } else if self.shared.granted() >= self.shared.window.limit().get() {
            GateState::Saturated
        } else {
            GateState::Open
        }
    }

    /// Permits granted in the current window.
    pub fn granted(&self) -> usize {
        self.shared.granted()
    }

    /// Permits still available in the current window.
    pub fn available(&self) -> usize {
        self.shared.permits.available_permits()
    }

    pub fn window(&self) -> &RateWindow {
        &self.shared.window
    }
}

impl Drop for AdmissionGate {
    fn drop(&mut self) {
        self.shutdown();
    }
}
