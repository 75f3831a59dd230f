use crate::di::{FromScope, Scope};
use crate::error::{MeshestraHttpError, Result};
use axum::{
    body::Bytes,
    extract::{ConnectInfo, FromRequestParts, Query, RawPathParams, Request},
    http::{HeaderMap, Method, Uri, header::CONTENT_LENGTH},
};
use http_body_util::LengthLimitError;
use serde::de::DeserializeOwned;
use std::net::SocketAddr;

/// The request currently being served.
///
/// Available to injected handlers by declaring a `RequestContext`
/// parameter. The body is buffered before the handler runs, and only for
/// handlers that ask for the context.
#[derive(Debug, Clone)]
pub struct RequestContext {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    params: Vec<(String, String)>,
    remote_addr: Option<SocketAddr>,
    body: Bytes,
}

impl RequestContext {
    /// Split `request` into a context. With `body_limit` set the body is
    /// buffered up to that many bytes; otherwise it is left unread.
    pub(crate) async fn from_request(request: Request, body_limit: Option<usize>) -> Result<Self> {
        let (mut parts, body) = request.into_parts();

        let params = match RawPathParams::from_request_parts(&mut parts, &()).await {
            Ok(params) => params
                .iter()
                .map(|(key, value)| (key.to_owned(), value.to_owned()))
                .collect(),
            Err(_) => Vec::new(),
        };
        let remote_addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0);

        let body = match body_limit {
            Some(limit) => read_body(&parts.headers, body, limit).await?,
            None => Bytes::new(),
        };

        Ok(Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            params,
            remote_addr,
            body,
        })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Value of a matched route parameter, e.g. `id` for `/users/{id}`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn json<T: DeserializeOwned>(&self) -> std::result::Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    pub fn query<T: DeserializeOwned>(&self) -> Option<T> {
        Query::<T>::try_from_uri(&self.uri).ok().map(|q| q.0)
    }
}

async fn read_body(headers: &HeaderMap, body: axum::body::Body, limit: usize) -> Result<Bytes> {
    let declared = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > limit) {
        return Err(MeshestraHttpError::BodyTooLarge { limit });
    }

    axum::body::to_bytes(body, limit).await.map_err(|e| {
        let source = e.into_inner();
        if source.is::<LengthLimitError>() {
            MeshestraHttpError::BodyTooLarge { limit }
        } else {
            MeshestraHttpError::BodyRead {
                message: source.to_string(),
            }
        }
    })
}

impl FromScope for RequestContext {
    const READS_BODY: bool = true;

    fn from_scope(scope: &Scope<'_>) -> Result<Self> {
        scope
            .provided::<RequestContext>()
            .map(|ctx| ctx.as_ref().clone())
    }
}
