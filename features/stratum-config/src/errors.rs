use stratum_di::TypeInfo;

/// Errors when registering or retrieving a config
#[derive(thiserror::Error, Debug, Clone)]
pub enum ConfigError {
    /// The required config type is not known
    #[error("The config type '{0}' is not registered")]
    Missing(TypeInfo),
    /// The config type was registered before
    #[error("The config type '{0}' is already registered")]
    AlreadyRegistered(TypeInfo),
}
