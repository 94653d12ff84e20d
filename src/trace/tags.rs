//! Keys of the tags recorded on server spans.

/// Library or subsystem that produced the span.
pub const COMPONENT: &str = "component";
pub const HTTP_METHOD: &str = "http.method";
pub const HTTP_URL: &str = "http.url";
pub const HTTP_STATUS_CODE: &str = "http.status_code";
pub const PEER_IPV4: &str = "peer.ipv4";
pub const PEER_IPV6: &str = "peer.ipv6";
/// Set to `true` when the request failed.
pub const ERROR: &str = "error";
pub const ERROR_MESSAGE: &str = "error.message";

/// Value of the [`COMPONENT`] tag when no component name is configured.
pub const DEFAULT_COMPONENT_NAME: &str = "net/http";
