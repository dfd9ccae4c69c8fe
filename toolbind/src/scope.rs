//! Type-keyed provider chains used to inject ambient parameters.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::trace;

use crate::error::BoxError;

type Factory = dyn Fn() -> Result<Box<dyn Any + Send>, BoxError> + Send + Sync;

/// Errors raised by scope operations.
#[derive(Debug, Error)]
pub enum ScopeError {
    /// No scope in the chain provides the type.
    #[error("no provider for type: {type_name}")]
    NoProvider {
        /// Requested type.
        type_name: &'static str,
    },

    /// The scope already provides the type.
    #[error("type {type_name} is already provided in this scope")]
    DuplicateProvider {
        /// Provided type.
        type_name: &'static str,
    },

    /// The provider's factory failed.
    #[error("provider for {type_name} failed: {source}")]
    Provider {
        /// Requested type.
        type_name: &'static str,
        /// Factory error.
        #[source]
        source: BoxError,
    },
}

#[derive(Clone)]
struct Provider {
    type_name: &'static str,
    factory: Arc<Factory>,
}

impl Provider {
    fn produce(&self) -> Result<Box<dyn Any + Send>, ScopeError> {
        (self.factory)().map_err(|source| ScopeError::Provider {
            type_name: self.type_name,
            source,
        })
    }
}

/// A set of providers keyed by type, optionally chained to a parent.
///
/// Lookups walk from the scope towards the root and stop at the first scope
/// that provides the type, so a child shadows its ancestors. Children borrow
/// their parent and never modify it.
///
/// ```
/// use toolbind::Scope;
///
/// #[derive(Clone, Debug, PartialEq)]
/// struct Region(&'static str);
///
/// let root = Scope::new().with(Region("eu")).unwrap();
/// let mut request = root.child();
/// request.provide(Region("us")).unwrap();
///
/// assert_eq!(request.resolve::<Region>().unwrap(), Region("us"));
/// assert_eq!(root.resolve::<Region>().unwrap(), Region("eu"));
/// ```
#[derive(Default)]
pub struct Scope<'p> {
    providers: HashMap<TypeId, Provider>,
    parent: Option<&'p Scope<'p>>,
}

impl Scope<'static> {
    /// Creates an empty root scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<'p> Scope<'p> {
    /// Creates an empty scope chained to `self`.
    #[must_use]
    pub fn child(&self) -> Scope<'_> {
        Scope {
            providers: HashMap::new(),
            parent: Some(self),
        }
    }

    /// Provides a constant value. Every resolution yields a clone.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::DuplicateProvider`] if this scope already
    /// provides `T`. Ancestors are not consulted.
    pub fn provide<T>(&mut self, value: T) -> Result<(), ScopeError>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.insert::<T>(Arc::new(move || {
            Ok::<_, BoxError>(Box::new(value.clone()) as Box<dyn Any + Send>)
        }))
    }

    /// Provides a factory that runs on every resolution of `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::DuplicateProvider`] if this scope already
    /// provides `T`.
    pub fn provide_with<T, E, F>(&mut self, factory: F) -> Result<(), ScopeError>
    where
        T: Send + 'static,
        E: Into<BoxError>,
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        self.insert::<T>(Arc::new(move || {
            factory()
                .map(|value| Box::new(value) as Box<dyn Any + Send>)
                .map_err(Into::<BoxError>::into)
        }))
    }

    /// Builder form of [`Scope::provide`].
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::DuplicateProvider`] if `T` is already provided.
    pub fn with<T>(mut self, value: T) -> Result<Self, ScopeError>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.provide(value)?;
        Ok(self)
    }

    fn insert<T: 'static>(&mut self, factory: Arc<Factory>) -> Result<(), ScopeError> {
        let type_name = type_name::<T>();
        if self.providers.contains_key(&TypeId::of::<T>()) {
            return Err(ScopeError::DuplicateProvider { type_name });
        }
        self.providers
            .insert(TypeId::of::<T>(), Provider { type_name, factory });
        Ok(())
    }

    /// Returns `true` if this scope or an ancestor provides the type.
    #[must_use]
    pub fn contains(&self, id: TypeId) -> bool {
        self.lookup(id).is_some()
    }

    fn lookup(&self, id: TypeId) -> Option<&Provider> {
        let mut scope = Some(self);
        while let Some(current) = scope {
            if let Some(provider) = current.providers.get(&id) {
                return Some(provider);
            }
            scope = current.parent;
        }
        None
    }

    /// Resolves a value of type `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::NoProvider`] if no scope in the chain provides
    /// `T`, or [`ScopeError::Provider`] if the factory fails.
    pub fn resolve<T: 'static>(&self) -> Result<T, ScopeError> {
        let value = resolve_layered(None, self, TypeId::of::<T>(), type_name::<T>())?;
        value
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| ScopeError::NoProvider {
                type_name: type_name::<T>(),
            })
    }

    /// Number of providers owned by this scope, excluding ancestors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Returns `true` if this scope owns no providers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

/// Resolves `id` from the caller chain first, then from the bound chain.
pub(crate) fn resolve_layered(
    caller: Option<&Scope<'_>>,
    bound: &Scope<'_>,
    id: TypeId,
    type_name: &'static str,
) -> Result<Box<dyn Any + Send>, ScopeError> {
    let provider = caller
        .and_then(|scope| scope.lookup(id))
        .or_else(|| bound.lookup(id))
        .ok_or(ScopeError::NoProvider { type_name })?;
    trace!(type_name, "resolving injected value");
    provider.produce()
}

impl fmt::Debug for Scope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self
            .providers
            .values()
            .map(|provider| provider.type_name)
            .collect();
        names.sort_unstable();
        f.debug_struct("Scope")
            .field("providers", &names)
            .field("parent", &self.parent)
            .finish()
    }
}
