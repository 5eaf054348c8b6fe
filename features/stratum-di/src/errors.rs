use std::sync::Arc;

use thiserror::Error;

use crate::{token::Token, types::DynError};

/// Errors while resolving a token
#[derive(Error, Debug, Clone)]
pub enum InjectError {
    /// No record exists locally, in any ancestor, and no default was supplied
    #[error("No provider for '{token}'")]
    NotFound { token: Token },
    /// A dependency chain revisited a token currently under construction
    #[error("Circular dependency detected while resolving '{token}'")]
    CircularDependency { token: Token },
    /// The token is produced by an async factory
    #[error("'{token}' is provided by an async factory, resolve it with an async method")]
    AsyncRequired { token: Token },
    /// The resolved value has a different type than requested
    #[error("Failed to downcast '{token}', required: '{required_type}' actual: '{actual_type}'")]
    DowncastFailed {
        token: Token,
        required_type: &'static str,
        actual_type: &'static str,
    },
    /// A producer read more arguments than it declared dependencies
    #[error("'{owner}' requested argument #{position} but declared fewer dependencies")]
    MissingArgument { owner: Token, position: usize },
    /// A constructor or factory returned an error
    #[error("Producer for '{token}' failed - error: {error}")]
    ProducerFailed { token: Token, error: Arc<DynError> },
    /// Generic error during Injection
    #[error("Error during injection: {0}")]
    Other(Arc<DynError>),
}

impl InjectError {
    /// Wraps an error returned by a producer
    ///
    /// Injection errors raised inside the producer are passed through untouched.
    pub(crate) fn from_producer(token: Token, error: DynError) -> Self {
        match error.downcast::<InjectError>() {
            Ok(inject_error) => *inject_error,
            Err(error) => InjectError::ProducerFailed {
                token,
                error: Arc::new(error),
            },
        }
    }

    pub fn other(error: impl Into<DynError>) -> Self {
        InjectError::Other(Arc::new(error.into()))
    }
}

/// Errors while registering providers, raised by [crate::Injector::create]
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// The provider matches none of the provider shapes
    #[error("Invalid provider for '{token}': {reason}")]
    InvalidProvider { token: Token, reason: &'static str },
    /// Multi and single providers were registered for the same token
    #[error("Cannot mix multi and single providers for '{token}'")]
    MultiProviderConflict { token: Token },
}
