use std::sync::Arc;

use super::{Handler, Request, ResponseSink, StatusCapture};
use crate::metrics::StandardInstruments;

/// Handler wrapper that records the standard HTTP metrics.
///
/// Per request: `http_requests_total` is incremented before the inner handler
/// runs, `http_request_duration_seconds` observes the wall time after it
/// returns, and `http_errors_total` is incremented when the captured status is
/// 400 or above. Labels use the decoded request path.
pub struct Instrument<H> {
    inner: H,
    instruments: Arc<StandardInstruments>,
}

impl<H> Instrument<H> {
    pub fn new(inner: H, instruments: Arc<StandardInstruments>) -> Self {
        Self { inner, instruments }
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }
}

impl<H: Handler> Handler for Instrument<H> {
    fn serve(&self, req: &Request, res: &mut dyn ResponseSink) {
        // 若内部 handler panic，observation 在 unwind 时仍会记录耗时
        let observation = self.instruments.begin(req.method().as_str(), req.path());

        let mut capture = StatusCapture::new(res);
        self.inner.serve(req, &mut capture);

        observation.finish(capture.status());
    }
}
