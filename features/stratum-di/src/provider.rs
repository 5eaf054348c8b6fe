use std::{fmt::Debug, future::Future, sync::Arc};

use futures::{future::BoxFuture, FutureExt, TryFutureExt};

use crate::{
    errors::ProviderError,
    resolver::{Args, Constructible},
    token::Token,
    types::{DependencyInfo, DynError, Injectable, Instance, TypeInfo},
};

/// Type erased synchronous producer
pub(crate) type SyncProducer = Arc<dyn Fn(Args) -> Result<Instance, DynError> + Send + Sync>;

/// Type erased asynchronous producer
pub(crate) type AsyncProducer =
    Arc<dyn Fn(Args) -> BoxFuture<'static, Result<Instance, DynError>> + Send + Sync>;

/// How a provider produces its value
#[derive(Clone)]
pub(crate) enum Recipe {
    /// The token is a constructible type
    Type {
        dependencies: Vec<DependencyInfo>,
        construct: SyncProducer,
    },
    /// A precomputed value
    Value(Instance),
    /// A function invoked with resolved dependencies
    Factory {
        dependencies: Vec<DependencyInfo>,
        produce: SyncProducer,
    },
    /// A function invoked with resolved dependencies, returning a future
    AsyncFactory {
        dependencies: Vec<DependencyInfo>,
        produce: AsyncProducer,
    },
    /// Another constructible type built in place of the token
    Class {
        class: TypeInfo,
        dependencies: Vec<DependencyInfo>,
        construct: SyncProducer,
    },
    /// Whatever another token resolves to
    Alias(Token),
}

impl Debug for Recipe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.kind())
    }
}

impl Recipe {
    fn kind(&self) -> &'static str {
        match self {
            Recipe::Type { .. } => "type",
            Recipe::Value(_) => "value",
            Recipe::Factory { .. } => "factory",
            Recipe::AsyncFactory { .. } => "async factory",
            Recipe::Class { .. } => "class",
            Recipe::Alias(_) => "alias",
        }
    }
}

fn construct_erased<C: Constructible>(args: Args) -> Result<Instance, DynError> {
    C::construct(args).map(Instance::new)
}

/// A registered recipe for producing the value of a token
///
/// Either use one of the shorthand constructors, or describe the provider
/// starting from [Provider::for_token] and exactly one `use_*` call.
///
/// # Example
/// ```rust
/// use stratum_di::{DependencyInfo, InjectionToken, Provider};
///
/// static DB_URL: InjectionToken = InjectionToken::new("DB_URL");
/// static CONNECTION: InjectionToken = InjectionToken::new("CONNECTION");
///
/// let providers = [
///     Provider::value(&DB_URL, "mem://".to_string()),
///     Provider::for_token(&CONNECTION).use_factory(
///         vec![DependencyInfo::new(&DB_URL)],
///         |mut args| -> Result<String, stratum_di::DynError> {
///             let url: std::sync::Arc<String> = args.next()?;
///             Ok(format!("connected to {url}"))
///         },
///     ),
/// ];
/// ```
#[derive(Clone)]
pub struct Provider {
    token: Token,
    recipes: Vec<Recipe>,
    multi: bool,
}

impl Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kinds: Vec<_> = self.recipes.iter().map(Recipe::kind).collect();
        f.debug_struct("Provider")
            .field("token", &self.token)
            .field("recipes", &kinds)
            .field("multi", &self.multi)
            .finish()
    }
}

// Descriptor form
impl Provider {
    /// Starts describing a provider for `token`
    pub fn for_token(token: impl Into<Token>) -> Self {
        Provider {
            token: token.into(),
            recipes: Vec::new(),
            multi: false,
        }
    }

    pub fn use_value<T: Injectable>(self, value: T) -> Self {
        self.use_instance(Instance::new(value))
    }

    /// Provides an already type-erased value
    pub fn use_instance(mut self, instance: Instance) -> Self {
        self.recipes.push(Recipe::Value(instance));
        self
    }

    pub fn use_factory<T, E, F>(mut self, dependencies: Vec<DependencyInfo>, factory: F) -> Self
    where
        T: Injectable,
        E: Into<DynError>,
        F: Fn(Args) -> Result<T, E> + Send + Sync + 'static,
    {
        let produce: SyncProducer = Arc::new(move |args: Args| -> Result<Instance, DynError> {
            factory(args).map(Instance::new).map_err(Into::into)
        });
        self.recipes.push(Recipe::Factory {
            dependencies,
            produce,
        });
        self
    }

    pub fn use_factory_async<T, E, F, Fut>(
        mut self,
        dependencies: Vec<DependencyInfo>,
        factory: F,
    ) -> Self
    where
        T: Injectable,
        E: Into<DynError> + 'static,
        F: Fn(Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let produce: AsyncProducer = Arc::new(
            move |args: Args| -> BoxFuture<'static, Result<Instance, DynError>> {
                factory(args)
                    .map_ok(Instance::new)
                    .map_err(Into::into)
                    .boxed()
            },
        );
        self.recipes.push(Recipe::AsyncFactory {
            dependencies,
            produce,
        });
        self
    }

    pub fn use_class<C: Constructible>(mut self) -> Self {
        self.recipes.push(Recipe::Class {
            class: TypeInfo::of::<C>(),
            dependencies: C::dependencies(),
            construct: Arc::new(construct_erased::<C>),
        });
        self
    }

    /// Proxies resolution to `target`
    pub fn use_existing(mut self, target: impl Into<Token>) -> Self {
        self.recipes.push(Recipe::Alias(target.into()));
        self
    }

    /// Aggregates this provider with every other multi provider of the same token
    pub fn multi(mut self) -> Self {
        self.multi = true;
        self
    }
}

// Shorthands
impl Provider {
    /// The type is its own token
    pub fn constructible<T: Constructible>() -> Self {
        let mut provider = Provider::for_token(Token::of::<T>());
        provider.recipes.push(Recipe::Type {
            dependencies: T::dependencies(),
            construct: Arc::new(construct_erased::<T>),
        });
        provider
    }

    pub fn value<T: Injectable>(token: impl Into<Token>, value: T) -> Self {
        Provider::for_token(token).use_value(value)
    }

    pub fn factory<T, E, F>(token: impl Into<Token>, dependencies: Vec<DependencyInfo>, factory: F) -> Self
    where
        T: Injectable,
        E: Into<DynError>,
        F: Fn(Args) -> Result<T, E> + Send + Sync + 'static,
    {
        Provider::for_token(token).use_factory(dependencies, factory)
    }

    pub fn factory_async<T, E, F, Fut>(
        token: impl Into<Token>,
        dependencies: Vec<DependencyInfo>,
        factory: F,
    ) -> Self
    where
        T: Injectable,
        E: Into<DynError> + 'static,
        F: Fn(Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Provider::for_token(token).use_factory_async(dependencies, factory)
    }

    pub fn class<C: Constructible>(token: impl Into<Token>) -> Self {
        Provider::for_token(token).use_class::<C>()
    }

    pub fn alias(token: impl Into<Token>, target: impl Into<Token>) -> Self {
        Provider::for_token(token).use_existing(target)
    }
}

impl Provider {
    pub fn token(&self) -> Token {
        self.token
    }

    pub fn is_multi(&self) -> bool {
        self.multi
    }

    /// Validates the provider shape
    pub(crate) fn into_recipe(self) -> Result<(Token, bool, Recipe), ProviderError> {
        let Provider {
            token,
            mut recipes,
            multi,
        } = self;

        let recipe = match recipes.len() {
            0 => {
                return Err(ProviderError::InvalidProvider {
                    token,
                    reason: "no value, factory, class or alias was given",
                })
            }
            1 => recipes.remove(0),
            _ => {
                return Err(ProviderError::InvalidProvider {
                    token,
                    reason: "more than one of value, factory, class or alias was given",
                })
            }
        };

        if let Recipe::Alias(target) = &recipe {
            if *target == token {
                return Err(ProviderError::InvalidProvider {
                    token,
                    reason: "an alias cannot point at its own token",
                });
            }
        }

        Ok((token, multi, recipe))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::InjectionToken;

    static NAME: InjectionToken = InjectionToken::new("NAME");
    static OTHER: InjectionToken = InjectionToken::new("OTHER");

    #[test]
    fn provider_without_recipe_is_invalid() {
        let err = Provider::for_token(&NAME).into_recipe().unwrap_err();
        assert!(matches!(err, ProviderError::InvalidProvider { .. }));
    }

    #[test]
    fn provider_with_two_recipes_is_invalid() {
        let err = Provider::for_token(&NAME)
            .use_value(1_u32)
            .use_existing(&OTHER)
            .into_recipe()
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidProvider { .. }));
    }

    #[test]
    fn alias_to_itself_is_invalid() {
        let err = Provider::alias(&NAME, &NAME).into_recipe().unwrap_err();
        assert!(matches!(err, ProviderError::InvalidProvider { .. }));
    }

    #[test]
    fn shorthands_keep_token_and_multi_flag() {
        let provider = Provider::value(&NAME, "value").multi();
        assert_eq!(provider.token(), Token::from(&NAME));
        assert!(provider.is_multi());

        let (token, multi, recipe) = provider.into_recipe().unwrap();
        assert_eq!(token, Token::from(&NAME));
        assert!(multi);
        assert_eq!(recipe.kind(), "value");
    }
}
