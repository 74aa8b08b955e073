//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults
//!     → config file (TOML, optional) via loader.rs
//!     → environment (PROXY_ALLOWED_HOSTS, COOKIE_SECURE, PROXY_INSECURE_HTTPS, HOST, PORT)
//!     → CLI flags
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → shared via Arc with the handler
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{apply_env_overrides, read_config, ConfigError};
pub use schema::{
    ListenerConfig, LogFormat, ObservabilityConfig, ProxyConfig, ProxySettings,
    StaticFilesConfig, TlsConfig, UpstreamConfig,
};
pub use validation::{validate_config, ValidationError};
