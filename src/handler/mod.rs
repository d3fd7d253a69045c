//! Host-agnostic request handling
//!
//! Minimal capability traits so instrumentation does not depend on a
//! particular server framework:
//! - [`Handler`]: anything that can serve a [`Request`] into a [`ResponseSink`]
//! - [`Instrument`]: wraps a handler with the standard HTTP metrics
//! - [`StatusCapture`]: observes the status written through a sink
//! - [`ScrapeHandler`]: serves the registry snapshot

mod capture;
mod instrument;
mod scrape;

use std::borrow::Cow;
use std::io;

use actix_web::http::header::{HeaderMap, HeaderName, HeaderValue};
use actix_web::http::{Method, StatusCode};
use bytes::Bytes;
use percent_encoding::percent_decode_str;

pub use capture::StatusCapture;
pub use instrument::Instrument;
pub use scrape::ScrapeHandler;

/// Inbound request as seen by a [`Handler`].
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
    body: Bytes,
}

impl Request {
    /// Build a request from a method and a target such as `/items?page=2`.
    ///
    /// The path is stored percent-decoded; the query string is kept as sent.
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (target, None),
        };
        let path = decode_path(path).into_owned();
        Self {
            method,
            path,
            query,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Decoded request path, without the query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

/// Percent-decode a raw request path.
///
/// Malformed escapes are kept verbatim and invalid UTF-8 is replaced, so this
/// never fails.
pub fn decode_path(raw: &str) -> Cow<'_, str> {
    percent_decode_str(raw).decode_utf8_lossy()
}

/// Outbound response writer.
///
/// Hosts that never receive a status before the first body write send
/// `200 OK`.
pub trait ResponseSink {
    fn set_status(&mut self, status: StatusCode);

    fn insert_header(&mut self, name: HeaderName, value: HeaderValue);

    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;
}

/// Request handler invoked once per inbound request, possibly concurrently.
pub trait Handler: Send + Sync {
    fn serve(&self, req: &Request, res: &mut dyn ResponseSink);
}

impl<F> Handler for F
where
    F: Fn(&Request, &mut dyn ResponseSink) + Send + Sync,
{
    fn serve(&self, req: &Request, res: &mut dyn ResponseSink) {
        self(req, res)
    }
}

impl<H: Handler + ?Sized> Handler for std::sync::Arc<H> {
    fn serve(&self, req: &Request, res: &mut dyn ResponseSink) {
        (**self).serve(req, res)
    }
}

/// Pin a closure to the [`Handler`] signature so its argument lifetimes are
/// inferred.
pub fn handler_fn<F>(f: F) -> F
where
    F: Fn(&Request, &mut dyn ResponseSink) + Send + Sync,
{
    f
}

/// In-memory response, mirroring the usual server semantics: the status is
/// committed by the first `set_status` or the first body write, later status
/// changes are ignored.
#[derive(Debug, Default)]
pub struct BufferedResponse {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl BufferedResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status that would be sent; `200 OK` when nothing set it.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    /// Status explicitly committed, if any.
    pub fn committed_status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl ResponseSink for BufferedResponse {
    fn set_status(&mut self, status: StatusCode) {
        if self.status.is_none() {
            self.status = Some(status);
        }
    }

    fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }
}
