use std::{any::type_name, sync::Arc};

use crate::{
    errors::InjectError,
    injector::Injector,
    resolver::Resolver,
    types::{DependencyInfo, Injectable, Instance},
};

pub(crate) fn downcast<T: Injectable>(
    instance: &Instance,
    dependency: &DependencyInfo,
) -> Result<Arc<T>, InjectError> {
    instance
        .downcast::<T>()
        .map_err(|actual_type| InjectError::DowncastFailed {
            token: dependency.token,
            required_type: type_name::<T>(),
            actual_type,
        })
}

impl<T: Injectable> Resolver for Arc<T> {
    fn dependency_info() -> DependencyInfo {
        DependencyInfo::of::<T>()
    }

    fn extract(value: Option<Instance>, dependency: &DependencyInfo) -> Result<Self, InjectError> {
        match value {
            Some(instance) => downcast(&instance, dependency),
            None => Err(InjectError::NotFound {
                token: dependency.token,
            }),
        }
    }
}

impl<Resolvable: Resolver> Resolver for Option<Resolvable> {
    fn dependency_info() -> DependencyInfo {
        Resolvable::dependency_info().optional()
    }

    fn extract(value: Option<Instance>, dependency: &DependencyInfo) -> Result<Self, InjectError> {
        match value {
            // An optional dependency without provider resolves to nothing
            None => Ok(None),
            Some(instance) => Resolvable::extract(Some(instance), dependency).map(Some),
        }
    }
}

impl Resolver for Injector {
    fn dependency_info() -> DependencyInfo {
        DependencyInfo::of::<Injector>()
    }

    fn extract(value: Option<Instance>, dependency: &DependencyInfo) -> Result<Self, InjectError> {
        Arc::<Injector>::extract(value, dependency).map(|injector| Injector::clone(&injector))
    }
}
