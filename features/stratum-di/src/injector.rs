use std::{
    collections::HashMap,
    fmt::Debug,
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use futures::{future::BoxFuture, FutureExt};

use crate::{
    errors::{InjectError, ProviderError},
    provider::{Provider, Recipe},
    record::{Producer, Record, Slot},
    resolver::{arc::downcast, multi::downcast_all, Args, Constructible},
    token::Token,
    types::{DependencyInfo, DynError, Injectable, Instance},
};

/// What to do once the injector chain is exhausted
#[derive(Clone)]
enum Fallback {
    /// Fail with [InjectError::NotFound]
    Throw,
    /// Resolve to nothing
    Null,
    /// Resolve to a caller supplied value
    Value(Instance),
}

impl Fallback {
    fn of(dependency: &DependencyInfo) -> Self {
        if dependency.optional {
            Fallback::Null
        } else {
            Fallback::Throw
        }
    }
}

/// The ultimate ancestor of every injector
struct NullInjector;
impl NullInjector {
    fn get(token: Token, fallback: Fallback) -> Result<Option<Instance>, InjectError> {
        match fallback {
            Fallback::Throw => Err(InjectError::NotFound { token }),
            Fallback::Null => Ok(None),
            Fallback::Value(instance) => Ok(Some(instance)),
        }
    }
}

/// Outcome of looking a token up in the local records
enum Lookup {
    Missing,
    Ready(Instance),
    Produce {
        dependencies: Vec<DependencyInfo>,
        producer: Producer,
    },
}

/// A scoped injector
///
/// Owns a table of records and a reference to its parent. Values are produced
/// lazily on first use and cached for the lifetime of the injector. Tokens
/// missing locally are delegated to the parent, the root delegates to a null
/// injector which fails or returns the caller's default.
///
/// Dependencies of a record are always resolved starting at the injector owning
/// the record, so a child's bindings override the parent's for anything the child produces.
///
/// A record under construction is indistinguishable from a cycle. Two tasks resolving the
/// same unproduced token at once, e.g. while an async factory is pending, make the second
/// one fail with [InjectError::CircularDependency]. Resolve through one task at a time.
#[derive(Clone)]
pub struct Injector(Arc<InjectorInner>);
struct InjectorInner {
    parent: Option<Injector>,
    records: Mutex<HashMap<Token, Record>>,
}

impl Debug for Injector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let records = self.records();
        let mut map = f.debug_struct("Injector");
        for (token, record) in records.iter() {
            let state = match record.value {
                Slot::Empty => "empty",
                Slot::Circular => "circular",
                Slot::Ready(_) => "ready",
            };
            map.field(token.name(), &state);
        }
        map.field("has_parent", &self.0.parent.is_some());
        map.finish()
    }
}

impl Injector {
    /// Creates an injector from a list of providers and optionally a parent injector
    ///
    /// Fails if a provider matches no provider shape, or if multi and single
    /// providers are mixed on one token.
    pub fn create(
        providers: impl IntoIterator<Item = Provider>,
        parent: Option<&Injector>,
    ) -> Result<Injector, ProviderError> {
        let mut records = HashMap::new();

        // Every injector can provide itself
        records.insert(Token::of::<Injector>(), Record::injector());

        let mut provider_count = 0;
        for (index, provider) in providers.into_iter().enumerate() {
            let (token, multi, recipe) = provider.into_recipe()?;
            register(&mut records, index, token, multi, recipe)?;
            provider_count += 1;
        }

        tracing::debug!(
            "Created injector with {} providers ({} records)",
            provider_count,
            records.len()
        );

        Ok(Injector(Arc::new(InjectorInner {
            parent: parent.cloned(),
            records: Mutex::new(records),
        })))
    }

    pub fn parent(&self) -> Option<&Injector> {
        self.0.parent.as_ref()
    }

    /// Returns true if both handles point to the same injector
    pub fn ptr_eq(&self, other: &Injector) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn records(&self) -> MutexGuard<'_, HashMap<Token, Record>> {
        // Producers never run under the lock, so a poisoned map is still consistent
        self.0.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn register(
    records: &mut HashMap<Token, Record>,
    index: usize,
    token: Token,
    multi: bool,
    recipe: Recipe,
) -> Result<(), ProviderError> {
    if !multi {
        if records.get(&token).is_some_and(Record::is_multi) {
            return Err(ProviderError::MultiProviderConflict { token });
        }
        records.insert(token, Record::from(recipe));
        return Ok(());
    }

    // Each multi registration becomes one dependency slot of the aggregator
    let aggregator = records.entry(token).or_insert_with(Record::multi);
    if !aggregator.is_multi() {
        return Err(ProviderError::MultiProviderConflict { token });
    }

    let slot = Token::multi_slot(token, index);
    aggregator.dependencies.push(DependencyInfo::new(slot));
    records.insert(slot, Record::from(recipe));

    Ok(())
}

// Record state machine
impl Injector {
    /// Inspects the local record and marks it as under construction if needed
    fn begin(&self, token: Token, allow_async: bool) -> Result<Lookup, InjectError> {
        let mut records = self.records();
        let Some(record) = records.get_mut(&token) else {
            return Ok(Lookup::Missing);
        };

        match &record.value {
            Slot::Ready(instance) => return Ok(Lookup::Ready(instance.clone())),
            Slot::Circular => return Err(InjectError::CircularDependency { token }),
            Slot::Empty => {}
        }

        match record.producer {
            // Not cached, the record would keep its own injector alive
            Producer::Injector => return Ok(Lookup::Ready(Instance::new(self.clone()))),
            Producer::AsyncFactory(_) if !allow_async => {
                return Err(InjectError::AsyncRequired { token })
            }
            _ => {}
        }

        record.value = Slot::Circular;
        Ok(Lookup::Produce {
            dependencies: record.dependencies.clone(),
            producer: record.producer.clone(),
        })
    }

    /// Stores the produced value, or resets the record so it can be retried
    fn settle(&self, token: Token, result: &Result<Instance, InjectError>) {
        if let Some(record) = self.records().get_mut(&token) {
            record.value = match result {
                Ok(instance) => Slot::Ready(instance.clone()),
                Err(_) => Slot::Empty,
            };
        }
    }

    fn delegate(
        &self,
        token: Token,
        fallback: Fallback,
        self_only: bool,
    ) -> Result<Option<Instance>, InjectError> {
        match &self.0.parent {
            Some(parent) if !self_only => parent.resolve_token(token, fallback, false),
            _ => NullInjector::get(token, fallback),
        }
    }

    fn resolve_token(
        &self,
        token: Token,
        fallback: Fallback,
        self_only: bool,
    ) -> Result<Option<Instance>, InjectError> {
        let (dependencies, producer) = match self.begin(token, false)? {
            Lookup::Ready(instance) => return Ok(Some(instance)),
            Lookup::Missing => return self.delegate(token, fallback, self_only),
            Lookup::Produce {
                dependencies,
                producer,
            } => (dependencies, producer),
        };

        tracing::trace!("Producing {}", token);
        let result = self
            .resolve_dependencies(&dependencies)
            .and_then(|values| producer.produce(self, token, values));
        self.settle(token, &result);

        result.map(Some)
    }

    fn resolve_dependencies(
        &self,
        dependencies: &[DependencyInfo],
    ) -> Result<Vec<(DependencyInfo, Option<Instance>)>, InjectError> {
        dependencies
            .iter()
            .map(|dependency| {
                let value = self.resolve_token(
                    dependency.token,
                    Fallback::of(dependency),
                    dependency.self_only,
                )?;
                Ok((*dependency, value))
            })
            .collect()
    }

    fn resolve_token_async(
        &self,
        token: Token,
        fallback: Fallback,
        self_only: bool,
    ) -> BoxFuture<'_, Result<Option<Instance>, InjectError>> {
        async move {
            let (dependencies, producer) = match self.begin(token, true)? {
                Lookup::Ready(instance) => return Ok(Some(instance)),
                Lookup::Missing => {
                    return match &self.0.parent {
                        Some(parent) if !self_only => {
                            parent.resolve_token_async(token, fallback, false).await
                        }
                        _ => NullInjector::get(token, fallback),
                    }
                }
                Lookup::Produce {
                    dependencies,
                    producer,
                } => (dependencies, producer),
            };

            tracing::trace!("Producing {} asynchronously", token);
            let result = match self.resolve_dependencies_async(&dependencies).await {
                Ok(values) => producer.produce_async(self, token, values).await,
                Err(err) => Err(err),
            };
            self.settle(token, &result);

            result.map(Some)
        }
        .boxed()
    }

    /// Resolves dependencies one after the other, in declaration order
    async fn resolve_dependencies_async(
        &self,
        dependencies: &[DependencyInfo],
    ) -> Result<Vec<(DependencyInfo, Option<Instance>)>, InjectError> {
        let mut values = Vec::with_capacity(dependencies.len());
        for dependency in dependencies {
            let value = self
                .resolve_token_async(
                    dependency.token,
                    Fallback::of(dependency),
                    dependency.self_only,
                )
                .await?;
            values.push((*dependency, value));
        }
        Ok(values)
    }
}

// Synchronous API
impl Injector {
    /// Retrieves or produces the value of a token
    pub fn get_instance(&self, token: impl Into<Token>) -> Result<Instance, InjectError> {
        let token = token.into();
        self.resolve_token(token, Fallback::Throw, false)?
            .ok_or(InjectError::NotFound { token })
    }

    /// Retrieves or produces the value of a token, returning `default` if no injector provides it
    pub fn get_instance_or(
        &self,
        token: impl Into<Token>,
        default: Instance,
    ) -> Result<Instance, InjectError> {
        let token = token.into();
        self.resolve_token(token, Fallback::Value(default), false)?
            .ok_or(InjectError::NotFound { token })
    }

    /// Retrieves the value of a token as `T`
    pub fn get<T: Injectable>(&self, token: impl Into<Token>) -> Result<Arc<T>, InjectError> {
        let dependency = DependencyInfo::new(token);
        let instance = self.get_instance(dependency.token)?;
        downcast(&instance, &dependency)
    }

    /// Retrieves the value of a token as `T`, `None` if no injector provides it
    pub fn get_optional<T: Injectable>(
        &self,
        token: impl Into<Token>,
    ) -> Result<Option<Arc<T>>, InjectError> {
        let dependency = DependencyInfo::new(token).optional();
        self.resolve_token(dependency.token, Fallback::Null, false)?
            .map(|instance| downcast(&instance, &dependency))
            .transpose()
    }

    /// Retrieves every value registered for a multi token, in registration order
    pub fn get_all<T: Injectable>(&self, token: impl Into<Token>) -> Result<Vec<Arc<T>>, InjectError> {
        let dependency = DependencyInfo::new(token);
        let instance = self.get_instance(dependency.token)?;
        downcast_all(&instance, &dependency)
    }

    /// Retrieves the value registered under the type token of `T`
    pub fn resolve<T: Injectable>(&self) -> Result<Arc<T>, InjectError> {
        self.get(Token::of::<T>())
    }

    /// Constructs a new `T`, resolving its dependencies from this injector
    ///
    /// The result is not cached.
    pub fn instantiate<T: Constructible>(&self) -> Result<T, InjectError> {
        let owner = Token::of::<T>();
        let values = self.resolve_dependencies(&T::dependencies())?;
        T::construct(Args::new(owner, values)).map_err(|error| InjectError::from_producer(owner, error))
    }

    /// Invokes `func` with the given dependencies resolved from this injector
    pub fn invoke<R, E, F>(&self, dependencies: &[DependencyInfo], func: F) -> Result<R, InjectError>
    where
        E: Into<DynError>,
        F: FnOnce(Args) -> Result<R, E>,
    {
        let owner = Token::call::<F>();
        let values = self.resolve_dependencies(dependencies)?;
        func(Args::new(owner, values)).map_err(|error| InjectError::from_producer(owner, error.into()))
    }
}

// Asynchronous API
impl Injector {
    /// Retrieves or produces the value of a token, awaiting async factories
    pub async fn get_instance_async(&self, token: impl Into<Token>) -> Result<Instance, InjectError> {
        let token = token.into();
        self.resolve_token_async(token, Fallback::Throw, false)
            .await?
            .ok_or(InjectError::NotFound { token })
    }

    pub async fn get_instance_or_async(
        &self,
        token: impl Into<Token>,
        default: Instance,
    ) -> Result<Instance, InjectError> {
        let token = token.into();
        self.resolve_token_async(token, Fallback::Value(default), false)
            .await?
            .ok_or(InjectError::NotFound { token })
    }

    pub async fn get_async<T: Injectable>(
        &self,
        token: impl Into<Token>,
    ) -> Result<Arc<T>, InjectError> {
        let dependency = DependencyInfo::new(token);
        let instance = self.get_instance_async(dependency.token).await?;
        downcast(&instance, &dependency)
    }

    pub async fn get_optional_async<T: Injectable>(
        &self,
        token: impl Into<Token>,
    ) -> Result<Option<Arc<T>>, InjectError> {
        let dependency = DependencyInfo::new(token).optional();
        self.resolve_token_async(dependency.token, Fallback::Null, false)
            .await?
            .map(|instance| downcast(&instance, &dependency))
            .transpose()
    }

    /// Retrieves every value of a multi token, producing the slots one after the other
    pub async fn get_all_async<T: Injectable>(
        &self,
        token: impl Into<Token>,
    ) -> Result<Vec<Arc<T>>, InjectError> {
        let dependency = DependencyInfo::new(token);
        let instance = self.get_instance_async(dependency.token).await?;
        downcast_all(&instance, &dependency)
    }

    pub async fn resolve_async<T: Injectable>(&self) -> Result<Arc<T>, InjectError> {
        self.get_async(Token::of::<T>()).await
    }

    /// Constructs a new `T`, resolving its dependencies sequentially
    pub async fn instantiate_async<T: Constructible>(&self) -> Result<T, InjectError> {
        let owner = Token::of::<T>();
        let values = self.resolve_dependencies_async(&T::dependencies()).await?;
        T::construct(Args::new(owner, values)).map_err(|error| InjectError::from_producer(owner, error))
    }

    /// Invokes an async `func` once its dependencies are resolved
    pub async fn invoke_async<R, E, F, Fut>(
        &self,
        dependencies: &[DependencyInfo],
        func: F,
    ) -> Result<R, InjectError>
    where
        E: Into<DynError>,
        F: FnOnce(Args) -> Fut,
        Fut: Future<Output = Result<R, E>>,
    {
        let owner = Token::call::<F>();
        let values = self.resolve_dependencies_async(dependencies).await?;
        func(Args::new(owner, values))
            .await
            .map_err(|error| InjectError::from_producer(owner, error.into()))
    }
}
