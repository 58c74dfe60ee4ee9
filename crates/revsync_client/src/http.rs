//! HTTP transport for the replication endpoints.
//!
//! [`HttpTransport`] turns a [`Request`] into an absolute URL under the
//! server's base URL and hands it to an [`HttpClient`], the seam where a
//! concrete HTTP library plugs in. [`LoopbackClient`] routes the same calls
//! to an in-process [`LoopbackServer`].

use crate::context::CallContext;
use crate::error::{ReplicationError, ReplicationResult};
use crate::transport::{Request, Response, Transport};
use parking_lot::RwLock;
use revsync_codec::WireFormat;
use revsync_protocol::Method;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;
use url::Url;

/// A fully resolved HTTP request.
#[derive(Debug, Clone, Copy)]
pub struct HttpRequest<'a> {
    /// Method.
    pub method: Method,
    /// Absolute URL including the query string.
    pub url: &'a Url,
    /// `Content-Type` and `Accept` value.
    pub content_type: &'a str,
    /// Body, if any.
    pub body: Option<&'a [u8]>,
    /// Context of the call. Clients poll it to abort an exchange in flight.
    pub ctx: &'a CallContext,
    /// Time left before the caller's deadline.
    pub timeout: Option<Duration>,
}

/// A raw HTTP reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    /// Status code.
    pub status: u16,
    /// `Content-Type` header, if sent.
    pub content_type: Option<String>,
    /// Body bytes.
    pub body: Vec<u8>,
}

/// Performs one HTTP exchange for [`HttpTransport`].
///
/// A client should give up as soon as `request.ctx` reports cancellation or
/// expiry, and keep the exchange within `request.timeout`. Connection-level
/// failures are returned as `Err` text; any received status is an `Ok` reply.
pub trait HttpClient: Send + Sync {
    /// Sends a request and returns the reply, or a connection-level failure.
    fn send(&self, request: HttpRequest<'_>) -> Result<HttpReply, String>;
}

/// Replication transport over an [`HttpClient`].
pub struct HttpTransport<C: HttpClient> {
    /// Base URL, always ending in `/`.
    base_url: Url,
    client: C,
    last_error: RwLock<Option<String>>,
}

impl<C: HttpClient> HttpTransport<C> {
    /// Creates a transport rooted at `base_url`.
    ///
    /// Request paths are resolved below the base URL's path, so a base of
    /// `https://host/prefix` sends to `https://host/prefix/_db/...`.
    pub fn new(mut base_url: Url, client: C) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            base_url,
            client,
            last_error: RwLock::new(None),
        }
    }

    /// Parses `base_url` and creates a transport rooted at it.
    pub fn connect(base_url: &str, client: C) -> ReplicationResult<Self> {
        Ok(Self::new(Url::parse(base_url)?, client))
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the last connection-level error message.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    /// Builds the absolute URL for a request.
    pub fn url_for(&self, request: &Request) -> ReplicationResult<Url> {
        let mut url = self
            .base_url
            .join(request.path().trim_start_matches('/'))?;
        if !request.query().is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in request.query() {
                pairs.append_pair(name, value);
            }
        }
        Ok(url)
    }
}

impl<C: HttpClient> Transport for HttpTransport<C> {
    fn request(&self, ctx: &CallContext, request: Request) -> ReplicationResult<Response> {
        ctx.check()?;

        let url = self.url_for(&request)?;
        trace!(method = request.method().as_str(), %url, "http request");

        let reply = self
            .client
            .send(HttpRequest {
                method: request.method(),
                url: &url,
                content_type: request.format().content_type(),
                body: request.body(),
                ctx,
                timeout: ctx.remaining(),
            })
            .map_err(|e| {
                *self.last_error.write() = Some(e.clone());
                // A client aborted by the context reports a generic failure.
                match ctx.check() {
                    Err(stopped) => stopped,
                    Ok(()) => ReplicationError::transport_retryable(e),
                }
            })?;

        *self.last_error.write() = None;
        // A reply that arrives after cancellation is discarded.
        ctx.check()?;

        let format = reply
            .content_type
            .as_deref()
            .and_then(WireFormat::from_content_type)
            .unwrap_or(request.format());
        Ok(Response::new(reply.status, format, reply.body))
    }
}

/// A request as seen by a [`LoopbackServer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopbackRequest {
    /// Method.
    pub method: Method,
    /// URL path as sent, percent-encoded, without the query string.
    pub path: String,
    /// Decoded query parameters.
    pub query: Vec<(String, String)>,
    /// `Content-Type` of the body.
    pub content_type: String,
    /// Body bytes.
    pub body: Vec<u8>,
}

impl LoopbackRequest {
    /// First value of a query parameter.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// An in-process server answering [`LoopbackClient`] requests.
pub trait LoopbackServer {
    /// Handles a request. `Err` simulates a connection failure.
    fn handle(&self, request: LoopbackRequest) -> Result<HttpReply, String>;
}

impl<S: LoopbackServer + ?Sized> LoopbackServer for Arc<S> {
    fn handle(&self, request: LoopbackRequest) -> Result<HttpReply, String> {
        (**self).handle(request)
    }
}

/// [`HttpClient`] that hands each request to a [`LoopbackServer`] in the
/// calling thread. Scheme and host of the URL are ignored.
pub struct LoopbackClient<S: LoopbackServer> {
    server: S,
}

impl<S: LoopbackServer + Send + Sync> LoopbackClient<S> {
    /// Creates a client bound to `server`.
    pub fn new(server: S) -> Self {
        Self { server }
    }

    /// Returns the server.
    pub fn server(&self) -> &S {
        &self.server
    }
}

impl<S: LoopbackServer + Send + Sync> HttpClient for LoopbackClient<S> {
    fn send(&self, request: HttpRequest<'_>) -> Result<HttpReply, String> {
        if request.ctx.check().is_err() {
            return Err("request aborted".to_string());
        }
        self.server.handle(LoopbackRequest {
            method: request.method,
            path: request.url.path().to_string(),
            query: request
                .url
                .query_pairs()
                .map(|(name, value)| (name.into_owned(), value.into_owned()))
                .collect(),
            content_type: request.content_type.to_string(),
            body: request.body.map(<[u8]>::to_vec).unwrap_or_default(),
        })
    }
}
