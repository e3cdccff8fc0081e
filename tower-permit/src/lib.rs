//! # Tower Permit
//!
//! `tower-permit` sends signed JSON documents to a remote endpoint without ever
//! exceeding a fixed number of requests per time window.
//!
//! ## Pieces
//!
//! 1. **[`Dispatcher`]**: stateless. Builds a `POST` with
//!    `Content-Type: application/json` and a `Signature` header, then hands it to
//!    a `tower` transport exactly once. No retries.
//! 2. **[`HttpTransport`]**: the default transport, a pooled `reqwest` client.
//! 3. **[`GatedClient`]**: validates a request, waits on a shared
//!    [`permit_gate::AdmissionGate`], then dispatches it.
//! 4. **[`AdmissionLayer`]**: the same gate as a `tower` layer, for callers who
//!    already have a service stack.
//!
//! ## Example
//!
//! ```no_run
//! use tower_permit::ClientConfig;
//! use tower_permit::GatedClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = GatedClient::new(&ClientConfig::from_env()?)?;
//!
//!     let response = client
//!         .submit_json(&serde_json::json!({ "docId": 1 }), "signed-token")
//!         .await?;
//!     println!("{}", response.status);
//!
//!     client.shutdown();
//!     Ok(())
//! }
//! ```

mod client;
pub mod config;
mod dispatcher;
mod document;
mod error;
mod layer;
mod request;
mod service;
mod transport;


pub use client::GatedClient;
pub use config::ClientConfig;
pub use dispatcher::Dispatcher;
pub use dispatcher::SIGNATURE;
pub use document::Description;
pub use document::Document;
pub use document::Product;
pub use error::ConfigError;
pub use error::DispatchError;
pub use layer::AdmissionLayer;
pub use permit_gate::AdmissionGate;
pub use permit_gate::GateError;
pub use permit_gate::GateState;
pub use permit_gate::RateWindow;
pub use request::DispatchResponse;
pub use request::OutboundRequest;
pub use service::AdmissionService;
pub use transport::HttpTransport;
