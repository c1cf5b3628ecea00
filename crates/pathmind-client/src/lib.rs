//! pathmind-client: Backends for the PathMind assessment API.
//!
//! Implements the `AssessmentBackend` trait over HTTP, in memory, and as an
//! offline fallback wrapper, plus the configuration that selects between them.

pub mod config;
pub mod error;
pub mod fallback;
pub mod http;
pub mod mock;

pub use config::{create_backend, load_config, load_config_from, BackendConfig, PathmindConfig};
pub use error::BackendError;
pub use fallback::FallbackBackend;
pub use http::HttpBackend;
pub use mock::MockBackend;
