//! Hierarchical dependency injection
//!
//! An [Injector] owns a set of records created from [Provider]s and optionally a parent injector.
//! Values are produced lazily, cached per injector and looked up through the parent chain
//! when a token has no local record.
//!
//! ```rust
//! use std::sync::Arc;
//! use stratum_di::{DependencyInfo, DynError, InjectionToken, Injector, Provider};
//!
//! static DB_URL: InjectionToken = InjectionToken::new("DB_URL");
//! static CONNECTION: InjectionToken = InjectionToken::new("CONNECTION");
//!
//! let root = Injector::create([Provider::value(&DB_URL, "mem://".to_string())], None).unwrap();
//! let child = Injector::create(
//!     [Provider::factory(
//!         &CONNECTION,
//!         vec![DependencyInfo::new(&DB_URL)],
//!         |mut args| -> Result<String, DynError> {
//!             let url: Arc<String> = args.next()?;
//!             Ok(format!("connected to {url}"))
//!         },
//!     )],
//!     Some(&root),
//! )
//! .unwrap();
//!
//! assert_eq!(*child.get::<String>(&CONNECTION).unwrap(), "connected to mem://");
//! ```

mod errors;
mod injector;
mod provider;
mod record;
mod resolver;
mod token;
mod types;

pub use errors::{InjectError, ProviderError};
pub use injector::Injector;
pub use provider::Provider;
pub use resolver::{Args, Constructible, Resolver};
pub use token::{InjectionToken, Token};
pub use types::{DependencyInfo, DynError, Injectable, Instance, InstanceList, TypeInfo};
