//! HTTP instrumentation middleware
//!
//! Records request count, duration and error responses through the standard
//! instruments. The observation starts before the inner service is called and
//! is finished with the response status when its future resolves.

use actix_service::{Service, Transform};
use actix_web::{
    Error,
    dev::{ServiceRequest, ServiceResponse},
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::rc::Rc;
use std::sync::Arc;

use crate::handler::decode_path;
use crate::metrics::StandardInstruments;

/// HTTP metrics middleware factory
#[derive(Clone)]
pub struct MetricsMiddleware {
    instruments: Arc<StandardInstruments>,
}

impl MetricsMiddleware {
    pub fn new(instruments: Arc<StandardInstruments>) -> Self {
        Self { instruments }
    }
}

impl<S, B> Transform<S, ServiceRequest> for MetricsMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = InstrumentedService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(InstrumentedService {
            service: Rc::new(service),
            instruments: Arc::clone(&self.instruments),
        }))
    }
}

pub struct InstrumentedService<S> {
    service: Rc<S>,
    instruments: Arc<StandardInstruments>,
}

impl<S, B> Service<ServiceRequest> for InstrumentedService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();

        // 解码后的字面路径作为 label，不做路由归类
        let observation = {
            let path = decode_path(req.path());
            self.instruments.begin(req.method().as_str(), &path)
        };

        Box::pin(async move {
            // Future 被取消时 observation 的 Drop 仍会记录耗时
            let result = srv.call(req).await;

            let status = match &result {
                Ok(response) => response.status(),
                Err(e) => e.as_response_error().status_code(),
            };
            observation.finish(Some(status));

            result
        })
    }
}
