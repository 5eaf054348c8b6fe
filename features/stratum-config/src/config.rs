use std::{ops::Deref, sync::Arc};

use stratum_di::{DependencyInfo, InjectError, Injectable, Instance, Resolver, TypeInfo};

use crate::{errors::ConfigError, provider::ConfigProvider};

/// A wrapper type to allow for config injections
///
/// This provides a simple way to retrieve configs from the config registry,
/// and inject them on a constructor or factory as a dependency
///
/// # Example
/// ```rust
/// use stratum_config::{config::Config, provider::ConfigProvider};
/// use stratum_di::{Args, Constructible, DependencyInfo, DynError, Injector, Resolver};
///
/// pub struct MyModuleConfig {
///     enabled: bool,
/// }
///
/// pub struct MyService {
///     enabled: bool,
/// }
///
/// impl Constructible for MyService {
///     fn dependencies() -> Vec<DependencyInfo> {
///         vec![Config::<MyModuleConfig>::dependency_info()]
///     }
///
///     fn construct(mut args: Args) -> Result<Self, DynError> {
///         let config: Config<MyModuleConfig> = args.next()?;
///         Ok(MyService { enabled: config.enabled })
///     }
/// }
///
/// let mut config_provider = ConfigProvider::new();
/// config_provider.add_config(MyModuleConfig { enabled: true }).unwrap();
///
/// let injector = Injector::create([config_provider.into_provider()], None).unwrap();
/// assert!(injector.instantiate::<MyService>().unwrap().enabled);
/// ```
pub struct Config<T> {
    inner: Arc<T>,
}
impl<T> Deref for Config<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
impl<T> Config<T> {
    pub fn inner(&self) -> Arc<T> {
        self.inner.clone()
    }

    pub fn into_inner(self) -> Arc<T> {
        self.inner
    }
}

impl<T: Injectable> Resolver for Config<T> {
    fn dependency_info() -> DependencyInfo {
        DependencyInfo::of::<ConfigProvider>()
    }

    fn extract(value: Option<Instance>, dependency: &DependencyInfo) -> Result<Self, InjectError> {
        let config_provider = Arc::<ConfigProvider>::extract(value, dependency)?;

        let config: Arc<T> = config_provider
            .get_config()
            .map_err(InjectError::other)?
            .ok_or_else(|| InjectError::other(ConfigError::Missing(TypeInfo::of::<T>())))?;

        Ok(Config { inner: config })
    }
}
