use crate::di::Container;
use crate::error::{MeshestraHttpError, Result};
use crate::handler::{HandlerFuture, InjectHandler};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// Read-side handle over a built [`Container`].
///
/// Cheap to clone. Handed to `boot`, `daemon` and every server option, and
/// captured by injected handlers so they can resolve their parameters on
/// each request.
#[derive(Clone)]
pub struct Resolver {
    container: Arc<Container>,
}

impl Resolver {
    pub fn new(container: Arc<Container>) -> Self {
        Self { container }
    }

    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    pub fn resolve<T: 'static + Send + Sync>(&self) -> Result<Arc<T>> {
        self.container.resolve::<T>()
    }

    /// Resolve every parameter of `handler` from the container and invoke it.
    pub fn call<H, Args>(&self, handler: &H) -> Result<HandlerFuture<H::Output>>
    where
        H: InjectHandler<Args>,
    {
        self.call_with_provider(handler, Provider::new())
    }

    /// Like [`Resolver::call`], but values held by `provider` take
    /// precedence over container bindings for this single call.
    pub fn call_with_provider<H, Args>(
        &self,
        handler: &H,
        provider: Provider,
    ) -> Result<HandlerFuture<H::Output>>
    where
        H: InjectHandler<Args>,
    {
        let scope = Scope {
            resolver: self,
            provider: &provider,
        };
        handler.call(&scope)
    }
}

impl From<Container> for Resolver {
    fn from(container: Container) -> Self {
        Self::new(Arc::new(container))
    }
}

/// Ad-hoc values available to a single resolution, e.g. the current request.
#[derive(Clone, Default)]
pub struct Provider {
    values: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Provider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<T: 'static + Send + Sync>(mut self, value: T) -> Self {
        self.values.insert(TypeId::of::<T>(), Arc::new(value));
        self
    }

    pub fn get<T: 'static + Send + Sync>(&self) -> Option<Arc<T>> {
        self.values
            .get(&TypeId::of::<T>())
            .and_then(|v| v.clone().downcast::<T>().ok())
    }
}

/// The view a handler parameter is resolved against.
pub struct Scope<'a> {
    resolver: &'a Resolver,
    provider: &'a Provider,
}

impl Scope<'_> {
    pub fn resolver(&self) -> &Resolver {
        self.resolver
    }

    /// Look the type up in the ad-hoc provider first, then in the container.
    pub fn resolve<T: 'static + Send + Sync>(&self) -> Result<Arc<T>> {
        match self.provider.get::<T>() {
            Some(value) => Ok(value),
            None => self.resolver.resolve::<T>(),
        }
    }

    /// Look the type up in the ad-hoc provider only.
    pub fn provided<T: 'static + Send + Sync>(&self) -> Result<Arc<T>> {
        self.provider
            .get::<T>()
            .ok_or_else(MeshestraHttpError::not_found::<T>)
    }
}
