//! Behavior overrides for the [`Http`] middleware.
//!
//! [`Http`]: super::Http

use std::{fmt, sync::Arc};

use http::{request::Parts, HeaderMap, Response, StatusCode, Uri};
use opentelemetry::{propagation::TextMapPropagator, trace::SpanRef};

use super::operation_name;
use crate::error::ConfigError;

pub(crate) type OperationNameFn = dyn Fn(&Parts) -> String + Send + Sync;
pub(crate) type SpanObserverFn = dyn Fn(&SpanRef<'_>, &Parts) + Send + Sync;
pub(crate) type UrlTagFn = dyn Fn(&Uri) -> String + Send + Sync;
pub(crate) type ErrorPredicateFn = dyn Fn(&ResponseMeta<'_>) -> bool + Send + Sync;
pub(crate) type Propagator = dyn TextMapPropagator + Send + Sync;

/// Response seen by the error predicate.
#[derive(Clone, Copy, Debug)]
pub struct ResponseMeta<'a> {
    status: StatusCode,
    headers: &'a HeaderMap,
}

impl<'a> ResponseMeta<'a> {
    pub(crate) fn new<B>(response: &'a Response<B>) -> Self {
        Self {
            status: response.status(),
            headers: response.headers(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &'a HeaderMap {
        self.headers
    }
}

/// Configuration of the server span produced for each request.
///
/// Built once while assembling the service stack and shared read-only by every request. Each
/// setter consumes the configuration and returns the updated one, so a later call replaces the
/// value set by an earlier one.
///
/// ```
/// use tower_request_span::trace::{operation_name, Config};
///
/// let config = Config::default()
///     .operation_name(operation_name::from_method)
///     .url_tag(|uri| uri.path().to_owned())
///     .component_name("api-gateway")
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct Config {
    pub(crate) operation_name: Arc<OperationNameFn>,
    pub(crate) span_observer: Arc<SpanObserverFn>,
    pub(crate) url_tag: Option<Arc<UrlTagFn>>,
    pub(crate) error_predicate: Arc<ErrorPredicateFn>,
    pub(crate) component_name: Option<Arc<str>>,
    pub(crate) propagator: Option<Arc<Propagator>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            operation_name: Arc::new(operation_name::from_path),
            span_observer: Arc::new(ignore_span),
            url_tag: None,
            error_predicate: Arc::new(is_server_error),
            component_name: None,
            propagator: None,
        }
    }
}

fn ignore_span(_: &SpanRef<'_>, _: &Parts) {}

fn is_server_error(response: &ResponseMeta<'_>) -> bool {
    response.status().as_u16() >= 500
}

impl Config {
    /// Derive the span name from the request.
    ///
    /// See [`operation_name`] for the built-in choices.
    pub fn operation_name<F>(mut self, f: F) -> Self
    where
        F: Fn(&Parts) -> String + Send + Sync + 'static,
    {
        self.operation_name = Arc::new(f);
        self
    }

    /// Replace the `net/http` value of the `component` tag.
    pub fn component_name(mut self, name: impl Into<String>) -> Result<Self, ConfigError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ConfigError::EmptyComponentName);
        }
        self.component_name = Some(name.into());
        Ok(self)
    }

    /// Inspect the span once the built-in request tags are set.
    ///
    /// Tags set here may overwrite `http.method`, `http.url` and the peer address, but not
    /// `component`, `error` or `http.status_code` which are recorded afterwards.
    pub fn span_observer<F>(mut self, f: F) -> Self
    where
        F: Fn(&SpanRef<'_>, &Parts) + Send + Sync + 'static,
    {
        self.span_observer = Arc::new(f);
        self
    }

    /// Compute the `http.url` tag, e.g. to redact sensitive query parameters.
    pub fn url_tag<F>(mut self, f: F) -> Self
    where
        F: Fn(&Uri) -> String + Send + Sync + 'static,
    {
        self.url_tag = Some(Arc::new(f));
        self
    }

    /// Decide whether a response marks the span as failed.
    pub fn error_predicate<F>(mut self, f: F) -> Self
    where
        F: Fn(&ResponseMeta<'_>) -> bool + Send + Sync + 'static,
    {
        self.error_predicate = Arc::new(f);
        self
    }

    /// Read the incoming trace context with `propagator` instead of the global one.
    pub fn propagator<P>(mut self, propagator: P) -> Self
    where
        P: TextMapPropagator + Send + Sync + 'static,
    {
        self.propagator = Some(Arc::new(propagator));
        self
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("url_tag", &self.url_tag.is_some())
            .field("component_name", &self.component_name)
            .field("propagator", &self.propagator.is_some())
            .finish_non_exhaustive()
    }
}
