//! Server-side request spans for HTTP services built on [`tower`].
//!
//! [`HttpLayer`] wraps a service and, for every request, starts an OpenTelemetry span of kind
//! server whose parent is the trace context carried by the request headers. The span is tagged
//! with `http.method`, `http.url`, the peer address (`peer.ipv4` or `peer.ipv6`), `component`,
//! `http.status_code` and, on failure, `error`. It is stored in the request extensions so that
//! handlers can enrich it, see [`request_context`].
//!
//! ```no_run
//! use opentelemetry::trace::TracerProvider;
//! use opentelemetry_sdk::trace::SdkTracerProvider;
//! use tower_request_span::trace::{Config, HttpLayer};
//!
//! let provider = SdkTracerProvider::builder().build();
//! let config = Config::default()
//!     .url_tag(|uri| uri.path().to_owned())
//!     .component_name("orders")
//!     .unwrap();
//! let layer = HttpLayer::with_config(provider.tracer("orders"), config);
//! # let _ = layer;
//! ```
//!
//! A handler that panics still produces a finished span, tagged as a `500` error, and the panic
//! keeps unwinding to the outer layers.
//!
//! [`tower`]: https://docs.rs/tower
//! [`HttpLayer`]: trace::HttpLayer
//! [`request_context`]: trace::request_context

pub mod error;
pub mod trace;
mod util;

#[doc(inline)]
pub use self::error::ConfigError;
