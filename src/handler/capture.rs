use std::io;

use actix_web::http::StatusCode;
use actix_web::http::header::{HeaderName, HeaderValue};

use super::ResponseSink;

/// Response decorator that remembers the status the wrapped handler produced.
///
/// The status is captured once, at the first of: an explicit `set_status`,
/// or the first body write (implicit `200 OK`). Everything is forwarded to
/// the inner sink unchanged.
pub struct StatusCapture<'a> {
    inner: &'a mut dyn ResponseSink,
    status: Option<StatusCode>,
}

impl<'a> StatusCapture<'a> {
    pub fn new(inner: &'a mut dyn ResponseSink) -> Self {
        Self {
            inner,
            status: None,
        }
    }

    /// Captured status, `None` if the handler neither set a status nor wrote.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }
}

impl ResponseSink for StatusCapture<'_> {
    fn set_status(&mut self, status: StatusCode) {
        if self.status.is_none() {
            self.status = Some(status);
        }
        self.inner.set_status(status);
    }

    fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.inner.insert_header(name, value);
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        self.inner.write(buf)
    }
}
