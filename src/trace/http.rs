//! Middleware that adds a server span to a [`Service`] that handles HTTP requests.
//!
//! The span is started from the trace context found in the request headers, tagged with the
//! request attributes and stored in the request extensions as an [`opentelemetry::Context`], so
//! that downstream handlers can add their own tags. It is ended once the inner service answers,
//! fails or panics.

use std::{
    fmt::{self, Display},
    future::Future,
    panic::{self, AssertUnwindSafe},
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use http::{request::Parts, Request, Response};
use opentelemetry::{
    trace::{SpanKind, Status, TraceContextExt, Tracer},
    KeyValue,
};
use pin_project::pin_project;
use tower_layer::Layer;
use tower_service::Service;

use super::{
    config::{Config, ErrorPredicateFn, ResponseMeta},
    extractor, peer, tags,
};
use crate::util;

/// [`Layer`] that adds a server span to a [`Service`] that handles HTTP requests.
pub struct HttpLayer<T> {
    tracer: Arc<T>,
    config: Config,
}

impl<T> HttpLayer<T> {
    /// Spans are started with `tracer` using the default [`Config`].
    pub fn new(tracer: T) -> Self {
        Self::with_config(tracer, Config::default())
    }

    /// Spans are started with `tracer` and shaped by `config`.
    pub fn with_config(tracer: T, config: Config) -> Self {
        Self {
            tracer: Arc::new(tracer),
            config,
        }
    }
}

impl<T> Clone for HttpLayer<T> {
    fn clone(&self) -> Self {
        Self {
            tracer: Arc::clone(&self.tracer),
            config: self.config.clone(),
        }
    }
}

impl<T> fmt::Debug for HttpLayer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpLayer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S, T> Layer<S> for HttpLayer<T> {
    type Service = Http<S, T>;

    fn layer(&self, inner: S) -> Self::Service {
        Http {
            inner,
            tracer: Arc::clone(&self.tracer),
            config: self.config.clone(),
        }
    }
}

/// Middleware that adds a server span to a [`Service`] that handles HTTP requests.
pub struct Http<S, T> {
    inner: S,
    tracer: Arc<T>,
    config: Config,
}

impl<S: Clone, T> Clone for Http<S, T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            tracer: Arc::clone(&self.tracer),
            config: self.config.clone(),
        }
    }
}

impl<S: fmt::Debug, T> fmt::Debug for Http<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Http")
            .field("inner", &self.inner)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S, T, ReqBody, ResBody> Service<Request<ReqBody>> for Http<S, T>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Error: Display,
    T: Tracer,
    T::Span: Send + Sync + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = ResponseFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let (mut parts, body) = req.into_parts();
        let span_cx = make_request_context(&*self.tracer, &self.config, &mut parts);
        let req = Request::from_parts(parts, body);

        let inner = match panic::catch_unwind(AssertUnwindSafe(|| self.inner.call(req))) {
            Ok(inner) => inner,
            Err(payload) => {
                record_panic(&span_cx);
                panic::resume_unwind(payload)
            }
        };

        ResponseFuture {
            inner,
            span_cx: Some(span_cx),
            error_predicate: Arc::clone(&self.config.error_predicate),
        }
    }
}

/// Response future for [`Http`].
#[pin_project]
pub struct ResponseFuture<F> {
    #[pin]
    inner: F,
    span_cx: Option<opentelemetry::Context>,
    error_predicate: Arc<ErrorPredicateFn>,
}

impl<F, ResBody, E> Future for ResponseFuture<F>
where
    F: Future<Output = Result<Response<ResBody>, E>>,
    E: Display,
{
    type Output = Result<Response<ResBody>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let inner = this.inner;

        let output = match panic::catch_unwind(AssertUnwindSafe(|| inner.poll(cx))) {
            Ok(Poll::Ready(output)) => output,
            Ok(Poll::Pending) => return Poll::Pending,
            Err(payload) => {
                if let Some(span_cx) = this.span_cx.take() {
                    record_panic(&span_cx);
                }
                panic::resume_unwind(payload)
            }
        };

        if let Some(span_cx) = this.span_cx.take() {
            match &output {
                Ok(response) => record_response(&span_cx, &**this.error_predicate, response),
                Err(err) => record_error(&span_cx, err),
            }
        }
        Poll::Ready(output)
    }
}

/// Context holding the server span of `request`, as stored by [`Http`].
///
/// ```
/// use opentelemetry::{trace::TraceContextExt, KeyValue};
/// use tower_request_span::trace::request_context;
///
/// fn tag_user<B>(request: &http::Request<B>, user: &str) {
///     if let Some(cx) = request_context(request) {
///         cx.span().set_attribute(KeyValue::new("user.id", user.to_owned()));
///     }
/// }
/// ```
pub fn request_context<B>(request: &Request<B>) -> Option<&opentelemetry::Context> {
    request.extensions().get::<opentelemetry::Context>()
}

/// Starts the server span of a request and records the request tags.
fn make_request_context<T>(tracer: &T, config: &Config, parts: &mut Parts) -> opentelemetry::Context
where
    T: Tracer,
    T::Span: Send + Sync + 'static,
{
    let parent = extractor::extract_parent(config.propagator.as_deref(), &parts.headers);
    if !parent.span().span_context().is_valid() {
        tracing::trace!("no trace context in request headers, starting a root span");
    }

    let operation_name = (config.operation_name)(&*parts);
    let span = tracer
        .span_builder(operation_name)
        .with_kind(SpanKind::Server)
        .start_with_context(tracer, &parent);
    let span_cx = parent.with_span(span);

    let span = span_cx.span();
    span.set_attribute(KeyValue::new(
        tags::HTTP_METHOD,
        parts.method.as_str().to_owned(),
    ));

    let url = match &config.url_tag {
        Some(url_tag) => url_tag(&parts.uri),
        None => util::http::http_url(parts),
    };
    span.set_attribute(KeyValue::new(tags::HTTP_URL, url));

    if let Some(ip) = peer::peer_ip(parts) {
        span.set_attribute(peer::peer_tag(ip));
    }

    (config.span_observer)(&span, &*parts);

    let component_name = config
        .component_name
        .as_deref()
        .unwrap_or(tags::DEFAULT_COMPONENT_NAME);
    span.set_attribute(KeyValue::new(tags::COMPONENT, component_name.to_owned()));

    parts.extensions.insert(span_cx.clone());
    span_cx
}

/// Records fields associated to the response and ends the span.
fn record_response<B>(
    span_cx: &opentelemetry::Context,
    error_predicate: &ErrorPredicateFn,
    response: &Response<B>,
) {
    let span = span_cx.span();
    let status = response.status();

    if error_predicate(&ResponseMeta::new(response)) {
        span.set_attribute(KeyValue::new(tags::ERROR, true));
        span.set_status(Status::error(status.to_string()));
    }
    span.set_attribute(KeyValue::new(
        tags::HTTP_STATUS_CODE,
        i64::from(status.as_u16()),
    ));
    span.end();
}

/// Records the error returned by the inner service and ends the span.
fn record_error<E: Display>(span_cx: &opentelemetry::Context, err: &E) {
    tracing::debug!(error = %err, "request failed");

    let message = err.to_string();
    let span = span_cx.span();
    span.set_attribute(KeyValue::new(tags::HTTP_STATUS_CODE, 500_i64));
    span.set_attribute(KeyValue::new(tags::ERROR, true));
    span.set_attribute(KeyValue::new(tags::ERROR_MESSAGE, message.clone()));
    span.set_status(Status::error(message));
    span.end();
}

/// Marks the span as failed before the panic resumes.
fn record_panic(span_cx: &opentelemetry::Context) {
    tracing::debug!("request handler panicked");

    let span = span_cx.span();
    span.set_attribute(KeyValue::new(tags::HTTP_STATUS_CODE, 500_i64));
    span.set_attribute(KeyValue::new(tags::ERROR, true));
    span.set_status(Status::error("request handler panicked"));
    span.end();
}
