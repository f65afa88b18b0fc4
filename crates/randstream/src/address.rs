use core::fmt;
use std::net::SocketAddr;

/// Header consulted first when resolving a client address.
pub const REAL_IP_HEADER: &str = "X-Real-Ip";
/// Header consulted when [`REAL_IP_HEADER`] is absent.
pub const FORWARDED_FOR_HEADER: &str = "X-Forwarded-For";

/// The admission key identifying a client host.
///
/// Two connections with equal addresses are treated as the same client, so
/// clients behind a shared NAT or loopback collide on purpose.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct Address(String);

impl Address {
    /// Wraps an already-normalized host string.
    pub fn new(host: impl Into<String>) -> Self {
        Self(host.into())
    }

    /// Resolves the admission key for a request.
    ///
    /// Precedence is `X-Real-Ip`, then `X-Forwarded-For`, then the transport
    /// peer. A header that is missing or empty falls through to the next
    /// source. Header values keep everything before the first `:`, which
    /// drops a trailing port. The peer is a structured socket address, so
    /// only its IP is kept.
    ///
    /// # Example
    /// ```
    /// use randstream::Address;
    ///
    /// let peer = "9.9.9.9:1234".parse().unwrap();
    /// assert_eq!(Address::resolve(Some("1.2.3.4:9999"), None, peer).as_str(), "1.2.3.4");
    /// assert_eq!(Address::resolve(None, Some("5.6.7.8"), peer).as_str(), "5.6.7.8");
    /// assert_eq!(Address::resolve(None, None, peer).as_str(), "9.9.9.9");
    /// ```
    pub fn resolve(real_ip: Option<&str>, forwarded_for: Option<&str>, peer: SocketAddr) -> Self {
        let header = [real_ip, forwarded_for]
            .into_iter()
            .flatten()
            .find(|value| !value.is_empty());

        match header {
            Some(value) => Self(strip_port(value).to_owned()),
            None => Self(peer.ip().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Returns the part of `raw` before the first `:`.
///
/// This is the proxy-compatible normalization applied to header values. It is
/// only lossless for IPv4 hosts; an IPv6 literal is cut at its first group.
pub fn strip_port(raw: &str) -> &str {
    raw.split(':').next().unwrap_or(raw)
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(host: &str) -> Self {
        Self::new(host)
    }
}
