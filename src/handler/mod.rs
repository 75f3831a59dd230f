//! Injected request handlers.
//!
//! Any async function whose parameters implement [`FromScope`] and whose
//! output implements [`IntoReply`] can be turned into an axum handler with
//! [`Injector::handler`]:
//!
//! ```rust
//! use meshestra_http::prelude::*;
//!
//! struct Greeter;
//!
//! impl Greeter {
//!     fn greet(&self, name: &str) -> String {
//!         format!("hello, {name}")
//!     }
//! }
//!
//! async fn greet(greeter: Inject<Greeter>, ctx: RequestContext) -> String {
//!     greeter.greet(ctx.param("name").unwrap_or("stranger"))
//! }
//!
//! let option = route_option(|_resolver, injector, server| {
//!     server.route("/greet/{name}", get(injector.handler(greet)));
//!     Ok(())
//! });
//! # drop(option);
//! ```

mod context;
mod reply;

pub use context::RequestContext;
pub use reply::{IntoReply, Reply};

use crate::config::HttpConfig;
use crate::di::{FromScope, Provider, Resolver, Scope};
use crate::error::Result;
use crate::exception::Fault;
use axum::{
    extract::Request,
    response::{IntoResponse, Response},
};
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;

/// Boxed future returned by a resolved handler call.
pub type HandlerFuture<R> = Pin<Box<dyn Future<Output = R> + Send>>;

/// A handler whose parameters are resolved at call time.
///
/// Implemented for async functions and closures taking up to twelve
/// [`FromScope`] parameters.
pub trait InjectHandler<Args>: Clone + Send + Sync + Sized + 'static {
    type Output: IntoReply;

    /// Whether any parameter needs the request body.
    const READS_BODY: bool;

    /// Resolve every parameter from `scope` and start the handler.
    fn call(&self, scope: &Scope<'_>) -> Result<HandlerFuture<Self::Output>>;
}

macro_rules! impl_inject_handler {
    ($($ty:ident),*) => {
        #[allow(non_snake_case, unused_variables)]
        impl<F, Fut, R, $($ty,)*> InjectHandler<($($ty,)*)> for F
        where
            F: Fn($($ty),*) -> Fut + Clone + Send + Sync + 'static,
            Fut: Future<Output = R> + Send + 'static,
            R: IntoReply,
            $($ty: FromScope,)*
        {
            type Output = R;

            const READS_BODY: bool = false $(|| <$ty as FromScope>::READS_BODY)*;

            fn call(&self, scope: &Scope<'_>) -> Result<HandlerFuture<R>> {
                $(let $ty = <$ty as FromScope>::from_scope(scope)?;)*
                Ok(Box::pin((self)($($ty),*)))
            }
        }
    };
}

impl_inject_handler!();
impl_inject_handler!(T1);
impl_inject_handler!(T1, T2);
impl_inject_handler!(T1, T2, T3);
impl_inject_handler!(T1, T2, T3, T4);
impl_inject_handler!(T1, T2, T3, T4, T5);
impl_inject_handler!(T1, T2, T3, T4, T5, T6);
impl_inject_handler!(T1, T2, T3, T4, T5, T6, T7);
impl_inject_handler!(T1, T2, T3, T4, T5, T6, T7, T8);
impl_inject_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9);
impl_inject_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10);
impl_inject_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11);
impl_inject_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12);

/// Turns injectable functions into axum handlers.
///
/// Handed to route options; see [`route_option`](crate::options::route_option).
#[derive(Clone)]
pub struct Injector {
    resolver: Resolver,
    body_limit: usize,
}

impl Injector {
    pub fn new(resolver: Resolver) -> Self {
        let body_limit = resolver
            .resolve::<HttpConfig>()
            .map(|config| config.body_limit)
            .unwrap_or(HttpConfig::DEFAULT_BODY_LIMIT);
        Self {
            resolver,
            body_limit,
        }
    }

    pub fn handler<H, Args>(&self, handler: H) -> InjectedHandler<H, Args>
    where
        H: InjectHandler<Args>,
    {
        InjectedHandler {
            handler,
            resolver: self.resolver.clone(),
            body_limit: self.body_limit,
            _args: PhantomData,
        }
    }
}

/// Marker for the [`axum::handler::Handler`] impl of [`InjectedHandler`].
#[doc(hidden)]
pub struct InjectedMarker;

/// The fixed-signature handler the router actually calls.
pub struct InjectedHandler<H, Args> {
    handler: H,
    resolver: Resolver,
    body_limit: usize,
    _args: PhantomData<fn() -> Args>,
}

impl<H: Clone, Args> Clone for InjectedHandler<H, Args> {
    fn clone(&self) -> Self {
        Self {
            handler: self.handler.clone(),
            resolver: self.resolver.clone(),
            body_limit: self.body_limit,
            _args: PhantomData,
        }
    }
}

impl<H, Args> InjectedHandler<H, Args>
where
    H: InjectHandler<Args>,
{
    /// Serve one request: resolve the handler parameters with the request
    /// context in scope, run the handler, and encode what it returned.
    pub async fn invoke(&self, request: Request) -> std::result::Result<Response, Fault> {
        let body_limit = H::READS_BODY.then_some(self.body_limit);
        let ctx = RequestContext::from_request(request, body_limit).await?;
        let pending = self
            .resolver
            .call_with_provider(&self.handler, Provider::new().with(ctx))?;
        pending
            .await
            .into_reply()
            .encode()
            .map_err(Fault::Handler)
    }
}

impl<H, Args, S> axum::handler::Handler<InjectedMarker, S> for InjectedHandler<H, Args>
where
    H: InjectHandler<Args>,
    Args: 'static,
    S: Send + Sync + 'static,
{
    type Future = Pin<Box<dyn Future<Output = Response> + Send>>;

    fn call(self, request: Request, _state: S) -> Self::Future {
        Box::pin(async move { self.invoke(request).await.into_response() })
    }
}
