//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → request.rs (assign x-request-id)
//!     → server.rs (Axum router)
//!         /healthz            → liveness
//!         {relay prefix}/...  → forward::Forwarder::relay
//!         {dev prefix}/...    → forward::Forwarder::passthrough
//!     → Send to client (request id echoed)
//! ```

pub mod request;
pub mod server;

pub use request::{RequestId, RequestIdExt, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
