use std::sync::Arc;

use stratum::{app_initializer, Module, ModuleDescriptor};
use stratum_di::{Args, Constructible, DependencyInfo, DynError, Provider};

use super::health_service::HealthService;

/// Runs every registered health check before the application starts
pub struct HealthModule {
    pub service: Arc<HealthService>, // Modules export by making use of normal visibility rules
}

impl Constructible for HealthModule {
    fn dependencies() -> Vec<DependencyInfo> {
        vec![DependencyInfo::of::<HealthService>()]
    }

    fn construct(mut args: Args) -> Result<Self, DynError> {
        Ok(HealthModule {
            service: args.next()?,
        })
    }
}

impl Module for HealthModule {
    fn descriptor() -> Option<ModuleDescriptor> {
        Some(
            ModuleDescriptor::new()
                .with_id("health")
                .add_provider(Provider::constructible::<HealthService>())
                .add_provider(app_initializer(
                    vec![DependencyInfo::of::<HealthService>()],
                    |mut args| async move {
                        let service: Arc<HealthService> = args.next()?;
                        service.check_health()?;
                        tracing::info!("{} health checks passed", service.len());
                        Ok::<_, DynError>(())
                    },
                ))
                .add_declaration::<HealthService>(),
        )
    }
}
