use std::sync::Arc;

use crate::{
    errors::InjectError,
    resolver::{arc::downcast, Resolver},
    types::{DependencyInfo, Injectable, Instance, InstanceList},
};

/// Splits the value of a multi token into typed values, keeping registration order
pub(crate) fn downcast_all<T: Injectable>(
    instance: &Instance,
    dependency: &DependencyInfo,
) -> Result<Vec<Arc<T>>, InjectError> {
    let list = downcast::<InstanceList>(instance, dependency)?;
    list.iter()
        .map(|instance| downcast::<T>(instance, dependency))
        .collect()
}

impl<T: Injectable> Resolver for Vec<Arc<T>> {
    fn dependency_info() -> DependencyInfo {
        DependencyInfo::of::<T>()
    }

    fn extract(value: Option<Instance>, dependency: &DependencyInfo) -> Result<Self, InjectError> {
        match value {
            Some(instance) => downcast_all(&instance, dependency),
            None => Err(InjectError::NotFound {
                token: dependency.token,
            }),
        }
    }
}
