use std::net::SocketAddr;

use http::{header, request::Parts};

/// Get the url scheme used by the client, `http` unless TLS was involved.
pub fn http_url_scheme(parts: &Parts) -> &'static str {
    // HTTP/2 requests carry the `:scheme` pseudo header in the URI.
    if parts.uri.scheme() == Some(&http::uri::Scheme::HTTPS) {
        return "https";
    }

    // Comments below are quoted from MDN.
    //
    // See: https://developer.mozilla.org/en-US/docs/Web/HTTP/Reference/Headers/X-Forwarded-Proto

    // The HTTP X-Forwarded-Proto (XFP) request header is a de-facto standard header
    // for identifying the protocol (HTTP or HTTPS) that a client used to connect to a proxy or
    // load balancer.
    let x_forwarded_proto = parts
        .headers
        .get("x-forwarded-proto")
        .and_then(|v| match v.to_str() {
            Ok(value) if value.eq_ignore_ascii_case("http") => Some("http"),
            Ok(value) if value.eq_ignore_ascii_case("https") => Some("https"),
            _ => None,
        });
    if let Some(x_forwarded_proto) = x_forwarded_proto {
        return x_forwarded_proto;
    }

    // A standardized version of this header is the HTTP Forwarded header, although it's much less
    // frequently used.
    parts
        .headers
        .get(header::FORWARDED)
        .and_then(|v| extract_proto_from_forwarded_header(v.as_bytes()))
        .unwrap_or("http")
}

fn extract_proto_from_forwarded_header(header_value: &[u8]) -> Option<&'static str> {
    for value_per_proxy in header_value.split(|c| *c == b',') {
        for directive in value_per_proxy.split(|c| *c == b';') {
            let directive = directive.trim_ascii().to_ascii_lowercase();

            if let Some(proto) = directive.strip_prefix(b"proto=") {
                return match proto {
                    b"http" => Some("http"),
                    b"https" => Some("https"),
                    _ => None,
                };
            }
        }
    }
    None
}

/// Host the request was sent to, from the `Host` header or the URI authority.
pub fn http_host(parts: &Parts) -> &str {
    parts
        .headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| parts.uri.authority().map(|authority| authority.as_str()))
        .unwrap_or_default()
}

/// Rebuilds `scheme://host/path` for the request, the query is left out.
pub fn http_url(parts: &Parts) -> String {
    format!(
        "{}://{}{}",
        http_url_scheme(parts),
        http_host(parts),
        parts.uri.path()
    )
}

cfg_if::cfg_if! {
    if #[cfg(feature = "axum")] {
        pub fn connect_info(parts: &Parts) -> Option<SocketAddr> {
            use axum::extract::ConnectInfo;
            parts.extensions.get::<ConnectInfo<SocketAddr>>().map(|ConnectInfo(addr)| *addr)
        }
    } else {
        pub fn connect_info(_parts: &Parts) -> Option<SocketAddr> {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_parts(request: http::request::Builder) -> Parts {
        request.body(()).unwrap().into_parts().0
    }

    #[test]
    fn check_forwarded_parser() {
        assert_eq!(
            extract_proto_from_forwarded_header(b"for=192.0.2.60;proto=http;by=203.0.113.43"),
            Some("http")
        );

        // Case insensitive
        assert_eq!(
            extract_proto_from_forwarded_header(b"Proto=httpS;by=203.0.113.43"),
            Some("https")
        );
    }

    #[test]
    fn url_without_query() {
        let parts = request_parts(
            http::Request::get("/hello?token=secret").header(header::HOST, "example.com:8080"),
        );
        assert_eq!(http_url(&parts), "http://example.com:8080/hello");
    }

    #[test]
    fn url_behind_tls_proxy() {
        let parts = request_parts(
            http::Request::get("/hello")
                .header(header::HOST, "example.com")
                .header("x-forwarded-proto", "HTTPS"),
        );
        assert_eq!(http_url(&parts), "https://example.com/hello");

        let parts = request_parts(
            http::Request::get("/hello")
                .header(header::HOST, "example.com")
                .header(header::FORWARDED, "for=192.0.2.60;proto=https"),
        );
        assert_eq!(http_url(&parts), "https://example.com/hello");
    }

    #[test]
    fn url_from_absolute_uri() {
        let parts = request_parts(http::Request::get("https://example.com/a/b?c=d"));
        assert_eq!(http_url(&parts), "https://example.com/a/b");
    }
}
