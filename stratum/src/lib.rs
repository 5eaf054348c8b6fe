//! Module composition on top of `stratum-di`
//!
//! An application is a tree of [Module]s. Bootstrapping walks the tree depth first and gives
//! every module its own injector, a child of its importer's injector, seeded with the providers
//! of its direct imports. [Application::start] then awaits the [APP_INITIALIZER]s of each module
//! and instantiates the modules one after the other.
//!
//! ```rust
//! use std::sync::Arc;
//! use stratum::{Application, Module, ModuleDescriptor};
//! use stratum_di::{Args, Constructible, DependencyInfo, DynError, InjectionToken, Provider};
//!
//! static DB_URL: InjectionToken = InjectionToken::new("DB_URL");
//!
//! struct DbModule;
//! impl Constructible for DbModule {
//!     fn construct(_: Args) -> Result<Self, DynError> {
//!         Ok(DbModule)
//!     }
//! }
//! impl Module for DbModule {
//!     fn descriptor() -> Option<ModuleDescriptor> {
//!         Some(ModuleDescriptor::new().add_provider(Provider::value(&DB_URL, "mem://")))
//!     }
//! }
//!
//! struct AppModule {
//!     url: Arc<&'static str>,
//! }
//! impl Constructible for AppModule {
//!     fn dependencies() -> Vec<DependencyInfo> {
//!         vec![DependencyInfo::new(&DB_URL)]
//!     }
//!
//!     fn construct(mut args: Args) -> Result<Self, DynError> {
//!         Ok(AppModule { url: args.next()? })
//!     }
//! }
//! impl Module for AppModule {
//!     fn descriptor() -> Option<ModuleDescriptor> {
//!         Some(ModuleDescriptor::new().add_import::<DbModule>())
//!     }
//! }
//!
//! let application = Application::bootstrap::<AppModule>().unwrap();
//! let main = futures::executor::block_on(application.start()).unwrap();
//! assert_eq!(*main.instance_of::<AppModule>().unwrap().url, "mem://");
//! ```

mod application;
mod errors;
mod graph;
mod module;

pub use application::{
    app_initializer, Application, ApplicationBuilder, ApplicationHandle, APP_INITIALIZER,
};
pub use errors::{ModuleError, StartError};
pub use module::{Import, Module, ModuleDescriptor, ModuleHandle, ModuleRef, ModuleType};
