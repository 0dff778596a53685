//! Request logging middleware.
//!
//! Each request runs inside a tracing span carrying a request id, taken from
//! the `x-request-id` header when the client sent one. The id is echoed back
//! on the response.

use actix_web::Error;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready};
use actix_web::http::header::{AUTHORIZATION, HeaderName, HeaderValue};
use futures_util::future::LocalBoxFuture;
use std::future::{Ready, ready};
use std::time::Instant;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

/// Header used to correlate a request across logs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request logger middleware factory.
pub struct RequestLogger;

impl<S, B> Transform<S, ServiceRequest> for RequestLogger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestLoggerMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestLoggerMiddleware { service }))
    }
}

/// Request logger middleware service.
pub struct RequestLoggerMiddleware<S> {
    service: S,
}

/// How the caller presented credentials; the token itself is never logged.
fn auth_kind(req: &ServiceRequest) -> &'static str {
    match req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        Some(v) if v.starts_with("Bearer ") => "bearer",
        Some(_) => "other",
        None => "none",
    }
}

impl<S, B> Service<ServiceRequest> for RequestLoggerMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start = Instant::now();
        let request_id = req
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty() && v.len() <= 64)
            .map(String::from)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let span = info_span!(
            target: "api",
            "request",
            request_id = %request_id,
            method = %req.method(),
            path = %req.path(),
        );

        {
            let _entered = span.enter();
            let remote_addr = req
                .connection_info()
                .realip_remote_addr()
                .unwrap_or("unknown")
                .to_string();
            info!(
                target: "api",
                query = %req.query_string(),
                remote_addr = %remote_addr,
                auth = auth_kind(&req),
                "→ Request started"
            );
        }

        let fut = self.service.call(req);

        Box::pin(
            async move {
                let mut res = fut.await?;
                let elapsed = start.elapsed();
                let status = res.status();

                if let Ok(value) = HeaderValue::from_str(&request_id) {
                    res.headers_mut()
                        .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
                }

                if status.is_success() || status.is_redirection() {
                    info!(
                        target: "api",
                        status = status.as_u16(),
                        duration_ms = elapsed.as_millis() as u64,
                        "← Request completed"
                    );
                } else if status.is_client_error() {
                    warn!(
                        target: "api",
                        status = status.as_u16(),
                        duration_ms = elapsed.as_millis() as u64,
                        "← Client error"
                    );
                } else {
                    warn!(
                        target: "api",
                        status = status.as_u16(),
                        duration_ms = elapsed.as_millis() as u64,
                        "← Server error"
                    );
                }

                Ok(res)
            }
            .instrument(span),
        )
    }
}
