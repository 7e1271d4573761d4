//! ICD-10 lookup proxy.
//!
//! Re-exposes the ICD-10 coding API hosted at `ccs.whiteneuron.com` while
//! adding the request headers a browser is not allowed to set itself.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────┐
//!   Browser / CLI    │                  icd-proxy                   │
//!   ─────────────────┼─▶ http (request id, trace, timeout)          │
//!                    │      │                                       │
//!                    │      ├─ /api/proxy/* ─▶ forward::relay ──────┼──▶ upstream /api/*
//!                    │      └─ /api/*       ─▶ forward::passthrough─┼──▶ upstream /api/*
//!                    │                                              │
//!                    │  config (TOML, hot reload)  observability    │
//!                    │  lifecycle (signals, shutdown)               │
//!                    └──────────────────────────────────────────────┘
//! ```
//!
//! `client` is a typed consumer of the same API, used by the `icd-cli` binary.

pub mod client;
pub mod config;
pub mod forward;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
