//! Peer address of the connection that sent the request.

use std::net::{IpAddr, SocketAddr};

use http::request::Parts;
use opentelemetry::KeyValue;

use super::tags;
use crate::util;

/// Remote address of the connection, formatted as `host:port`.
///
/// Servers that know the peer only as a string insert this into the request extensions, the
/// middleware reads it before looking for a [`SocketAddr`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteAddr(pub String);

/// Resolves the peer IP of the request from its extensions.
pub(crate) fn peer_ip(parts: &Parts) -> Option<IpAddr> {
    if let Some(RemoteAddr(addr)) = parts.extensions.get::<RemoteAddr>() {
        let ip = parse_remote_addr(addr);
        if ip.is_none() {
            tracing::trace!(remote_addr = %addr, "unparseable remote address");
        }
        return ip;
    }

    parts
        .extensions
        .get::<SocketAddr>()
        .copied()
        .or_else(|| util::http::connect_info(parts))
        .map(|addr| addr.ip())
}

/// Parses the host part of a `host:port` address.
///
/// The port is everything after the last colon, so `2001:db8::68:124` is read as host
/// `2001:db8::68` and port `124`.
pub(crate) fn parse_remote_addr(addr: &str) -> Option<IpAddr> {
    let host = match addr.rfind(':') {
        Some(idx) if idx > 0 => &addr[..idx],
        _ => addr,
    };
    let host = host
        .strip_prefix('[')
        .and_then(|host| host.strip_suffix(']'))
        .unwrap_or(host);
    host.parse().ok()
}

/// Tag describing `ip`, IPv4-mapped IPv6 addresses are reported as IPv4.
pub(crate) fn peer_tag(ip: IpAddr) -> KeyValue {
    match ip {
        IpAddr::V4(v4) => KeyValue::new(tags::PEER_IPV4, v4.to_string()),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => KeyValue::new(tags::PEER_IPV4, v4.to_string()),
            None => KeyValue::new(tags::PEER_IPV6, v6.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use opentelemetry::Value;

    use super::*;

    fn tag(addr: &str) -> Option<(String, Value)> {
        parse_remote_addr(addr)
            .map(peer_tag)
            .map(|kv| (kv.key.as_str().to_owned(), kv.value))
    }

    #[test]
    fn ipv4() {
        assert_eq!(
            tag("192.168.0.1:124"),
            Some(("peer.ipv4".to_owned(), Value::from("192.168.0.1")))
        );
    }

    #[test]
    fn ipv6() {
        assert_eq!(
            tag("2001:db8::68:124"),
            Some(("peer.ipv6".to_owned(), Value::from("2001:db8::68")))
        );
        assert_eq!(
            tag("[::1]:8080"),
            Some(("peer.ipv6".to_owned(), Value::from("::1")))
        );
    }

    #[test]
    fn ipv4_mapped() {
        assert_eq!(
            tag("[::ffff:10.0.0.1]:80"),
            Some(("peer.ipv4".to_owned(), Value::from("10.0.0.1")))
        );
    }

    #[test]
    fn without_port() {
        assert_eq!(
            parse_remote_addr("10.1.2.3"),
            Some(IpAddr::from([10, 1, 2, 3]))
        );
    }

    #[test]
    fn unparseable() {
        assert_eq!(parse_remote_addr("localhost:80"), None);
        assert_eq!(parse_remote_addr(":80"), None);
        assert_eq!(parse_remote_addr(""), None);
    }

    #[test]
    fn remote_addr_wins_over_socket_addr() {
        let mut parts = http::Request::get("/").body(()).unwrap().into_parts().0;
        parts
            .extensions
            .insert(SocketAddr::from(([127, 0, 0, 1], 9000)));
        assert_eq!(peer_ip(&parts), Some(IpAddr::from([127, 0, 0, 1])));

        parts
            .extensions
            .insert(RemoteAddr("192.168.0.1:124".to_owned()));
        assert_eq!(peer_ip(&parts), Some(IpAddr::from([192, 168, 0, 1])));
    }
}
