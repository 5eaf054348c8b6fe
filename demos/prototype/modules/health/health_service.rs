use std::sync::Arc;

use stratum_di::{Args, Constructible, DependencyInfo, DynError, InjectionToken};

/// Multi token collecting the health checks of every module
pub static HEALTH_CHECK: InjectionToken = InjectionToken::new("HEALTH_CHECK");

#[derive(thiserror::Error, Debug)]
pub enum HealthError {
    #[error("Health check '{name}' failed: {reason}")]
    CheckFailed { name: &'static str, reason: String },
}

type Check = dyn Fn() -> Result<(), String> + Send + Sync;

pub struct HealthCheck {
    name: &'static str,
    check: Box<Check>,
}

impl HealthCheck {
    pub fn new(name: &'static str, check: impl Fn() -> Result<(), String> + Send + Sync + 'static) -> Self {
        HealthCheck {
            name,
            check: Box::new(check),
        }
    }
}

pub struct HealthService {
    health_checks: Vec<Arc<HealthCheck>>,
}

impl Constructible for HealthService {
    fn dependencies() -> Vec<DependencyInfo> {
        vec![DependencyInfo::new(&HEALTH_CHECK).optional()]
    }

    fn construct(mut args: Args) -> Result<Self, DynError> {
        let health_checks: Option<Vec<Arc<HealthCheck>>> = args.next()?;
        Ok(HealthService {
            health_checks: health_checks.unwrap_or_default(),
        })
    }
}

impl HealthService {
    pub fn check_health(&self) -> Result<(), HealthError> {
        for health_check in &self.health_checks {
            (health_check.check)().map_err(|reason| HealthError::CheckFailed {
                name: health_check.name,
                reason,
            })?;
            tracing::debug!("Health check '{}' passed", health_check.name);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.health_checks.len()
    }
}
