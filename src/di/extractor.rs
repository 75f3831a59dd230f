use crate::di::{Resolver, Scope};
use crate::error::Result;
use std::sync::Arc;

/// A type that can be supplied as an injected handler parameter.
///
/// Every parameter of a handler wrapped by
/// [`Injector`](crate::handler::Injector) must implement this trait. The
/// value is resolved again for every request.
pub trait FromScope: Sized + Send + 'static {
    /// Whether resolving this type needs the request body buffered first.
    const READS_BODY: bool = false;

    fn from_scope(scope: &Scope<'_>) -> Result<Self>;
}

/// Handler parameter resolved from the DI container.
///
/// # Example
/// ```
/// use meshestra_http::Inject;
///
/// struct UserService;
///
/// impl UserService {
///     fn count(&self) -> usize {
///         3
///     }
/// }
///
/// async fn count_users(service: Inject<UserService>) -> usize {
///     service.count()
/// }
/// ```
pub struct Inject<T>(pub Arc<T>);

impl<T> Inject<T> {
    pub fn into_inner(self) -> Arc<T> {
        self.0
    }
}

impl<T: 'static + Send + Sync> FromScope for Inject<T> {
    fn from_scope(scope: &Scope<'_>) -> Result<Self> {
        scope.resolve::<T>().map(Inject)
    }
}

/// Deref implementation for convenient access to the inner service
impl<T> std::ops::Deref for Inject<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Clone implementation to allow sharing the Arc
impl<T> Clone for Inject<T> {
    fn clone(&self) -> Self {
        Inject(Arc::clone(&self.0))
    }
}

impl FromScope for Resolver {
    fn from_scope(scope: &Scope<'_>) -> Result<Self> {
        Ok(scope.resolver().clone())
    }
}

/// Optional parameters never fail resolution.
impl<T: FromScope> FromScope for Option<T> {
    const READS_BODY: bool = T::READS_BODY;

    fn from_scope(scope: &Scope<'_>) -> Result<Self> {
        Ok(T::from_scope(scope).ok())
    }
}
