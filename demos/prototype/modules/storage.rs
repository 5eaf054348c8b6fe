use std::sync::Arc;

use stratum::{Module, ModuleDescriptor};
use stratum_config::Config;
use stratum_di::{
    Args, Constructible, DependencyInfo, DynError, InjectionToken, Provider, Resolver,
};

use super::health::health_service::{HealthCheck, HEALTH_CHECK};

pub static DB_URL: InjectionToken = InjectionToken::new("DB_URL");

pub struct StorageConfig {
    pub url: String,
}

pub struct StorageModule {
    pub url: Arc<String>,
}

impl Constructible for StorageModule {
    fn dependencies() -> Vec<DependencyInfo> {
        vec![DependencyInfo::new(&DB_URL)]
    }

    fn construct(mut args: Args) -> Result<Self, DynError> {
        Ok(StorageModule { url: args.next()? })
    }
}

impl Module for StorageModule {
    fn descriptor() -> Option<ModuleDescriptor> {
        Some(
            ModuleDescriptor::new()
                .with_id("storage")
                .add_provider(Provider::factory(
                    &DB_URL,
                    vec![Config::<StorageConfig>::dependency_info()],
                    |mut args| -> Result<String, DynError> {
                        let config: Config<StorageConfig> = args.next()?;
                        Ok(config.url.clone())
                    },
                ))
                .add_provider(
                    Provider::factory(
                        &HEALTH_CHECK,
                        vec![DependencyInfo::new(&DB_URL)],
                        |mut args| -> Result<HealthCheck, DynError> {
                            let url: Arc<String> = args.next()?;
                            Ok(HealthCheck::new("storage", move || {
                                if url.starts_with("mem://") {
                                    Ok(())
                                } else {
                                    Err(format!("unsupported storage url {url}"))
                                }
                            }))
                        },
                    )
                    .multi(),
                ),
        )
    }
}
