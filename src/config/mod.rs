//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → GatewayConfig (immutable)
//!     → route definitions handed to the locator factory
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → sent over the update channel
//!     → server recompiles routes, swaps the locator snapshot
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - A reload that fails to load keeps the current configuration

pub mod loader;
pub mod schema;
pub mod watcher;

pub use schema::GatewayConfig;
pub use schema::HttpClientConfig;
pub use schema::ListenerConfig;
pub use schema::ObservabilityConfig;
