use crate::{
    errors::InjectError,
    injector::Injector,
    provider::{AsyncProducer, Recipe, SyncProducer},
    resolver::Args,
    token::Token,
    types::{DependencyInfo, Instance, InstanceList},
};

/// Cached value of a record
pub(crate) enum Slot {
    /// Not produced yet
    Empty,
    /// Currently being produced
    Circular,
    /// Final value, never changes again
    Ready(Instance),
}

#[derive(Clone)]
pub(crate) enum Producer {
    Value(Instance),
    Construct(SyncProducer),
    Factory(SyncProducer),
    AsyncFactory(AsyncProducer),
    /// Returns the first dependency
    Alias,
    /// Collects all dependency slots into an [InstanceList]
    Multi,
    /// The owning injector
    Injector,
}

/// Binds a token to its producer and memoized value
pub(crate) struct Record {
    pub dependencies: Vec<DependencyInfo>,
    pub producer: Producer,
    pub value: Slot,
}

impl Record {
    pub fn injector() -> Self {
        Record {
            dependencies: Vec::new(),
            producer: Producer::Injector,
            value: Slot::Empty,
        }
    }

    pub fn multi() -> Self {
        Record {
            dependencies: Vec::new(),
            producer: Producer::Multi,
            value: Slot::Empty,
        }
    }

    pub fn is_multi(&self) -> bool {
        matches!(self.producer, Producer::Multi)
    }
}

impl From<Recipe> for Record {
    fn from(recipe: Recipe) -> Self {
        let (dependencies, producer, value) = match recipe {
            Recipe::Type {
                dependencies,
                construct,
            } => (dependencies, Producer::Construct(construct), Slot::Empty),
            Recipe::Value(instance) => (
                Vec::new(),
                Producer::Value(instance.clone()),
                Slot::Ready(instance),
            ),
            Recipe::Factory {
                dependencies,
                produce,
            } => (dependencies, Producer::Factory(produce), Slot::Empty),
            Recipe::AsyncFactory {
                dependencies,
                produce,
            } => (dependencies, Producer::AsyncFactory(produce), Slot::Empty),
            Recipe::Class {
                class,
                dependencies,
                construct,
            } => {
                tracing::trace!("Class provider constructs {}", class);
                (dependencies, Producer::Construct(construct), Slot::Empty)
            }
            Recipe::Alias(target) => (
                vec![DependencyInfo::new(target)],
                Producer::Alias,
                Slot::Empty,
            ),
        };

        Record {
            dependencies,
            producer,
            value,
        }
    }
}

impl Producer {
    /// Produces the value from resolved dependencies
    pub fn produce(
        &self,
        injector: &Injector,
        token: Token,
        values: Vec<(DependencyInfo, Option<Instance>)>,
    ) -> Result<Instance, InjectError> {
        match self {
            Producer::Value(instance) => Ok(instance.clone()),
            Producer::Construct(construct) => construct(Args::new(token, values))
                .map_err(|error| InjectError::from_producer(token, error)),
            Producer::Factory(produce) => produce(Args::new(token, values))
                .map_err(|error| InjectError::from_producer(token, error)),
            Producer::AsyncFactory(_) => Err(InjectError::AsyncRequired { token }),
            Producer::Alias => values
                .into_iter()
                .next()
                .and_then(|(_, value)| value)
                .ok_or(InjectError::NotFound { token }),
            Producer::Multi => {
                let list = values.into_iter().filter_map(|(_, value)| value).collect();
                Ok(Instance::new(InstanceList(list)))
            }
            Producer::Injector => Ok(Instance::new(injector.clone())),
        }
    }

    /// Produces the value from resolved dependencies, awaiting async factories
    pub async fn produce_async(
        &self,
        injector: &Injector,
        token: Token,
        values: Vec<(DependencyInfo, Option<Instance>)>,
    ) -> Result<Instance, InjectError> {
        match self {
            Producer::AsyncFactory(produce) => produce(Args::new(token, values))
                .await
                .map_err(|error| InjectError::from_producer(token, error)),
            other => other.produce(injector, token, values),
        }
    }
}
