use std::{
    any::{Any, TypeId},
    fmt::Debug,
    sync::Arc,
};

use crate::token::Token;

/// Error returned by user supplied constructors and factories
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// Values may be shared with any task of a multithreaded async runtime
/// So anything injectable needs to be Send + Sync + 'static
pub trait Injectable: Send + Sync + 'static {}
impl<T: Send + Sync + 'static> Injectable for T {}

/// A resolved value held by an injector record
#[derive(Clone)]
pub struct Instance {
    pub info: TypeInfo,
    pub instance: Arc<dyn Any + Send + Sync + 'static>,
}
impl Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Instance").field(&self.info.type_name).finish()
    }
}

impl Instance {
    pub fn new<ExistingInstance: Injectable>(instance: ExistingInstance) -> Self {
        Instance {
            info: TypeInfo::of::<ExistingInstance>(),
            instance: Arc::new(instance),
        }
    }

    /// Wraps an already shared value without allocating a new one
    pub fn from_arc<T: Injectable>(instance: Arc<T>) -> Self {
        Instance {
            info: TypeInfo::of::<T>(),
            instance,
        }
    }

    pub fn downcast<T: Injectable>(&self) -> Result<Arc<T>, &'static str> {
        match Arc::downcast::<T>(self.instance.clone()) {
            Ok(downcasted) => Ok(downcasted),
            Err(_) => Err(self.info.type_name),
        }
    }

    /// Returns true if both instances point to the same value
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.instance, &other.instance)
    }
}

/// The value of a multi token: every registered value in registration order
#[derive(Debug, Clone, Default)]
pub struct InstanceList(pub Vec<Instance>);

impl InstanceList {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Instance> {
        self.0.iter()
    }
}

/// One edge of a dependency list
///
/// Produced by a [crate::resolver::Constructible] type or handed explicitly to a factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DependencyInfo {
    /// The token to resolve
    pub token: Token,
    /// Resolve to nothing instead of failing when no provider exists
    pub optional: bool,
    /// Never delegate to the parent injector
    pub self_only: bool,
}

impl DependencyInfo {
    pub fn new(token: impl Into<Token>) -> Self {
        DependencyInfo {
            token: token.into(),
            optional: false,
            self_only: false,
        }
    }

    /// Dependency on the type token of `T`
    pub fn of<T: 'static + ?Sized>() -> Self {
        Self::new(Token::of::<T>())
    }

    pub fn optional(self) -> Self {
        DependencyInfo {
            optional: true,
            ..self
        }
    }

    pub fn self_only(self) -> Self {
        DependencyInfo {
            self_only: true,
            ..self
        }
    }
}

/// Type Name and Type Id
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct TypeInfo {
    pub type_name: &'static str,
    pub type_id: TypeId,
}
impl std::fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name)
    }
}
impl TypeInfo {
    pub fn of<T: 'static + ?Sized>() -> TypeInfo {
        TypeInfo {
            type_name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
        }
    }
}
