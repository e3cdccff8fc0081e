//! # permit-gate
//!
//! `permit-gate` provides a fixed window admission gate for outbound calls.
//!
//! ## Core Philosophy
//!
//! A client talking to a rate limited endpoint must never send more than `limit`
//! requests per `period`. Callers that find the window exhausted should wait
//! rather than fail, and they should wait by parking, not by spinning on an
//! atomic counter.
//!
//! ## Key Concepts
//!
//! * **Fixed Window**: A background ticker resets the granted count every
//!   `period`, independent of traffic. Bursts across a boundary can reach
//!   twice the limit.
//! * **Fair Parking**: Permits live in a fair semaphore. Callers parked before
//!   a reset are admitted before callers arriving after it.
//! * **Scoped Lifetime**: The ticker belongs to the gate. [`AdmissionGate::shutdown`]
//!   (or dropping the gate) stops it and fails every waiter with
//!   [`GateError::Shutdown`].
//!
//! ## Example
//!
//! ```rust
//! use std::num::NonZeroUsize;
//! use std::time::Duration;
//!
//! use permit_gate::AdmissionGate;
//! use permit_gate::RateWindow;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let limit = NonZeroUsize::new(10).unwrap();
//! let window = RateWindow::new(limit, Duration::from_secs(1))?;
//! let gate = AdmissionGate::new(window);
//!
//! gate.acquire().await?;
//! // Permit granted: dispatch the request
//!
//! gate.shutdown();
//! # Ok(())
//! # }
//! ```

mod error;
mod gate;
mod window;

pub use error::GateError;
pub use error::WindowError;
pub use gate::AdmissionGate;
pub use gate::GateState;
pub use window::RateWindow;
