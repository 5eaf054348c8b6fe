//! Stratum Config provides a registry of configs that can be injected in the rest of the
//! modules.
//!
//! Stratum Config is split into two major parts:
//! 1. ConfigProvider: Used to create the registry of all configs
//! 2. Config<T>: A wrapper type to be able to resolve and retrieve configs
//!
//! # Examples
//!
//! ```rust
//! use stratum_config::provider::ConfigProvider;
//!
//! struct AppConfig {
//!     host: String,
//!     port: u16,
//! }
//!
//! let mut config_provider = ConfigProvider::default();
//! config_provider
//!     .add_config(AppConfig {
//!         host: "localhost".to_string(),
//!         port: 8080_u16,
//!     })
//!     .unwrap();
//!
//! let retrieved_config = config_provider.get_config::<AppConfig>().unwrap().unwrap();
//! assert_eq!(retrieved_config.host, "localhost");
//! assert_eq!(retrieved_config.port, 8080);
//!
//! // Hand the registry to an injector, `Config<AppConfig>` can now be resolved
//! let provider = config_provider.into_provider();
//! ```

pub mod config;
pub mod errors;
pub mod provider;

pub use config::Config;
pub use errors::ConfigError;
pub use provider::ConfigProvider;
