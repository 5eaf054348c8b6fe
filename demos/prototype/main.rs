use std::sync::Arc;

use futures::executor::block_on;
use modules::{
    health::{health_module::HealthModule, health_service::HealthService},
    storage::{StorageConfig, StorageModule, DB_URL},
};
use stratum::{Application, Module, ModuleDescriptor};
use stratum_config::ConfigProvider;
use stratum_di::{Args, Constructible, DependencyInfo, DynError};
use tracing_subscriber::EnvFilter;

mod modules;

/// The main module, imports storage and health
struct AppModule {
    db_url: Arc<String>,
}

impl Constructible for AppModule {
    fn dependencies() -> Vec<DependencyInfo> {
        vec![DependencyInfo::new(&DB_URL)]
    }

    fn construct(mut args: Args) -> Result<Self, DynError> {
        Ok(AppModule {
            db_url: args.next()?,
        })
    }
}

impl Module for AppModule {
    fn descriptor() -> Option<ModuleDescriptor> {
        Some(
            ModuleDescriptor::new()
                .with_id("app")
                .add_import::<StorageModule>()
                .add_import::<HealthModule>(),
        )
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()))
        .init();

    let mut config = ConfigProvider::new();
    if let Err(e) = config.add_config(StorageConfig {
        url: "mem://prototype".to_string(),
    }) {
        eprintln!("{e}");
        return;
    }

    let application = match Application::builder().config(config).bootstrap::<AppModule>() {
        Ok(application) => application,
        Err(e) => {
            eprintln!("Failed to load modules: {e}");
            return;
        }
    };

    for module in application.modules() {
        tracing::info!("Loaded {:?}", module);
    }

    match block_on(application.start()) {
        Ok(main) => {
            if let Some(app) = main.instance_of::<AppModule>() {
                tracing::info!("Application started with storage at {}", app.db_url);
            }
            for module in application.modules() {
                if let Some(storage) = module.instance_of::<StorageModule>() {
                    tracing::info!("Storage module connected to {}", storage.url);
                }
                if let Some(health) = module.instance_of::<HealthModule>() {
                    tracing::info!("Health module runs {} checks", health.service.len());
                }
            }
            if let Some(health) = application.declaring_module::<HealthService>() {
                tracing::info!("Health service is owned by {:?}", health.descriptor().id());
            }
        }
        Err(e) => eprintln!("Application ended with error: {}", e),
    }
}
