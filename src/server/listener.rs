//! Strategies for obtaining the listener the server runs on.

use crate::config::HttpConfig;
use crate::di::Resolver;
use async_trait::async_trait;
use std::io;
use std::sync::{Mutex, PoisonError};
use tokio::net::TcpListener;

/// Produces the listener the HTTP server accepts connections on.
#[async_trait]
pub trait ListenerBuilder: Send + Sync {
    async fn build(&self, resolver: &Resolver) -> io::Result<TcpListener>;
}

/// Binds a fixed address.
#[derive(Debug, Clone)]
pub struct BindListener {
    addr: String,
}

impl BindListener {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

#[async_trait]
impl ListenerBuilder for BindListener {
    async fn build(&self, _resolver: &Resolver) -> io::Result<TcpListener> {
        TcpListener::bind(self.addr.as_str()).await
    }
}

/// Binds the address of the [`HttpConfig`] registered in the container. When
/// there is none, the config is read from the environment.
#[derive(Debug, Default, Clone)]
pub struct ConfiguredListener;

#[async_trait]
impl ListenerBuilder for ConfiguredListener {
    async fn build(&self, resolver: &Resolver) -> io::Result<TcpListener> {
        let addr = match resolver.resolve::<HttpConfig>() {
            Ok(config) => config.listen.clone(),
            Err(_) => {
                HttpConfig::from_env()
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?
                    .listen
            }
        };
        TcpListener::bind(addr.as_str()).await
    }
}

/// Adopts a socket that is already bound, e.g. one inherited from a parent
/// process. It can be built only once.
#[derive(Debug)]
pub struct InheritedListener {
    listener: Mutex<Option<std::net::TcpListener>>,
}

impl InheritedListener {
    pub fn new(listener: std::net::TcpListener) -> Self {
        Self {
            listener: Mutex::new(Some(listener)),
        }
    }
}

#[async_trait]
impl ListenerBuilder for InheritedListener {
    async fn build(&self, _resolver: &Resolver) -> io::Result<TcpListener> {
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| io::Error::other("inherited listener was already taken"))?;
        listener.set_nonblocking(true)?;
        TcpListener::from_std(listener)
    }
}
