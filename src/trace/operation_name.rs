//! Built-in ways to name the server span of a request.
//!
//! [`from_path`] and [`from_method`] are alternative defaults, pass either one to
//! [`Config::operation_name`].
//!
//! [`Config::operation_name`]: super::Config::operation_name

use http::request::Parts;

use crate::util::case::upper_camel_case;

/// Names the span after the request path, without a leading `api` segment.
///
/// `/api/v1//entities/` becomes `V1Entities` and
/// `/rest/kairosdbs/kairosdb/api/v1/datapoints/query` becomes
/// `RestKairosdbsKairosdbApiV1DatapointsQuery`. This is the default.
pub fn from_path(parts: &Parts) -> String {
    let path = parts.uri.path().replace("//", "/");
    let path = path.strip_prefix('/').unwrap_or(path.as_str());

    let mut segments = path.split('/').peekable();
    if segments.peek() == Some(&"api") {
        segments.next();
    }

    upper_camel_case(&segments.collect::<Vec<_>>().join("_"))
}

/// Names the span `HTTP {method}`, e.g. `HTTP GET`.
pub fn from_method(parts: &Parts) -> String {
    format!("HTTP {}", parts.method)
}
