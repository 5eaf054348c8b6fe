use stratum_di::{InjectError, ProviderError, Token, TypeInfo};
use thiserror::Error;

/// Errors while building the module graph
///
/// All of them are raised by [crate::Application::bootstrap], before any user code runs.
#[derive(Error, Debug, Clone)]
pub enum ModuleError {
    #[error("'{module}' has no module descriptor")]
    NotAModule { module: TypeInfo },
    #[error("'{module}' is imported twice by '{importer}'. If you must import it twice, move the second import to another module")]
    DuplicateImport { module: TypeInfo, importer: TypeInfo },
    #[error("Cannot redeclare '{declaration}' in '{module}', it is already declared in '{declared_in}'")]
    DuplicateDeclaration {
        declaration: Token,
        module: TypeInfo,
        declared_in: TypeInfo,
    },
    /// The providers visible to a module could not be registered
    #[error("Invalid providers in '{module}' - error: {source}")]
    Provider {
        module: TypeInfo,
        source: ProviderError,
    },
    /// The application level providers could not be registered
    #[error("Invalid application providers - error: {0}")]
    RootProvider(#[source] ProviderError),
}

/// Errors during [crate::Application::start]
#[derive(Error, Debug, Clone)]
pub enum StartError {
    #[error("An initializer of '{module}' failed - error: {source}")]
    Initializer {
        module: TypeInfo,
        source: InjectError,
    },
    #[error("Failed to instantiate '{module}' - error: {source}")]
    Instantiate {
        module: TypeInfo,
        source: InjectError,
    },
}

impl StartError {
    /// The module whose startup failed
    pub fn module(&self) -> TypeInfo {
        match self {
            StartError::Initializer { module, .. } | StartError::Instantiate { module, .. } => {
                *module
            }
        }
    }

    pub fn inject_error(&self) -> &InjectError {
        match self {
            StartError::Initializer { source, .. } | StartError::Instantiate { source, .. } => {
                source
            }
        }
    }
}
