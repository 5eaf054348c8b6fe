use crate::{
    errors::InjectError,
    token::Token,
    types::{DependencyInfo, DynError, Injectable, Instance},
};

pub mod arc;
pub mod multi;

/// Converts one resolved argument into a typed value
pub trait Resolver: Sized {
    /// The dependency edge this resolver declares when used by type
    fn dependency_info() -> DependencyInfo;

    /// Extracts `Self` from the resolved value, `None` if an optional dependency was not found
    fn extract(value: Option<Instance>, dependency: &DependencyInfo) -> Result<Self, InjectError>;
}

/// A type the injector can construct
///
/// This is the type descriptor consumed by the injector: dependencies are declared
/// explicitly and handed to [Constructible::construct] in the same order.
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use stratum_di::{Args, Constructible, DependencyInfo, DynError, Injector, Provider};
///
/// struct Db;
/// struct Repository {
///     db: Arc<Db>,
/// }
///
/// impl Constructible for Repository {
///     fn dependencies() -> Vec<DependencyInfo> {
///         vec![DependencyInfo::of::<Db>()]
///     }
///
///     fn construct(mut args: Args) -> Result<Self, DynError> {
///         Ok(Repository { db: args.next()? })
///     }
/// }
///
/// let injector = Injector::create(
///     [Provider::value(stratum_di::Token::of::<Db>(), Db), Provider::constructible::<Repository>()],
///     None,
/// )
/// .unwrap();
/// assert!(injector.resolve::<Repository>().is_ok());
/// ```
pub trait Constructible: Injectable + Sized {
    /// Returns the dependencies of the constructor, in argument order
    fn dependencies() -> Vec<DependencyInfo> {
        Vec::new()
    }

    /// Builds the value from its resolved dependencies
    fn construct(args: Args) -> Result<Self, DynError>;
}

/// Resolved dependencies handed positionally to a producer
pub struct Args {
    owner: Token,
    position: usize,
    values: std::vec::IntoIter<(DependencyInfo, Option<Instance>)>,
}

impl Args {
    pub(crate) fn new(owner: Token, values: Vec<(DependencyInfo, Option<Instance>)>) -> Self {
        Args {
            owner,
            position: 0,
            values: values.into_iter(),
        }
    }

    /// Takes the next argument
    pub fn next<R: Resolver>(&mut self) -> Result<R, InjectError> {
        let position = self.position;
        self.position += 1;

        let Some((dependency, value)) = self.values.next() else {
            return Err(InjectError::MissingArgument {
                owner: self.owner,
                position,
            });
        };

        R::extract(value, &dependency)
    }

    /// The token being produced
    pub fn owner(&self) -> Token {
        self.owner
    }
}

impl Resolver for Instance {
    fn dependency_info() -> DependencyInfo {
        DependencyInfo::of::<Instance>()
    }

    fn extract(value: Option<Instance>, dependency: &DependencyInfo) -> Result<Self, InjectError> {
        value.ok_or(InjectError::NotFound {
            token: dependency.token,
        })
    }
}
