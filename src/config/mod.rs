//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → compiled into the server's runtime state
//!
//! On file change (--watch):
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → server swaps its runtime state atomically
//! ```
//!
//! # Design Decisions
//! - All fields have defaults; an empty file reproduces the stock deployment
//! - Validation separates syntactic (serde) from semantic checks
//! - Listener address and route prefixes are fixed at startup

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    DevProxyConfig, HeaderProfileConfig, HeaderRuleConfig, ListenerConfig, LogFormat,
    ObservabilityConfig, ProxyConfig, RelayConfig, TimeoutConfig, UpstreamConfig,
};
pub use watcher::ConfigWatcher;
