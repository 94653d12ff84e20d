//! Reads the incoming trace context out of the request headers.

use http::HeaderMap;
use opentelemetry::{propagation::TextMapPropagator, Context};

#[cfg(feature = "propagate")]
pub struct HeaderExtractor<'a>(pub &'a HeaderMap);

#[cfg(feature = "propagate")]
impl opentelemetry::propagation::Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(|header_value| header_value.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0
            .keys()
            .map(|header_name| header_name.as_str())
            .collect()
    }
}

/// Extracts the parent context carried by `headers`.
///
/// The result never inherits the ambient context of the calling task. Headers that are missing or
/// malformed yield a context without a remote span, so the new span becomes a root.
#[cfg(feature = "propagate")]
pub fn extract_parent(
    propagator: Option<&(dyn TextMapPropagator + Send + Sync)>,
    headers: &HeaderMap,
) -> Context {
    let extractor = HeaderExtractor(headers);
    match propagator {
        Some(propagator) => propagator.extract_with_context(&Context::new(), &extractor),
        None => opentelemetry::global::get_text_map_propagator(|propagator| {
            propagator.extract_with_context(&Context::new(), &extractor)
        }),
    }
}

#[cfg(not(feature = "propagate"))]
pub fn extract_parent(
    _propagator: Option<&(dyn TextMapPropagator + Send + Sync)>,
    _headers: &HeaderMap,
) -> Context {
    Context::new()
}
