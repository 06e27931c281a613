//! Client key generation.

use std::net::IpAddr;

/// Namespace prepended to every client key.
const KEY_PREFIX: &str = "rate_limit";
/// Identity used when no client address is available.
const UNKNOWN_CLIENT: &str = "unknown";

/// A key that identifies one client's counter.
///
/// All requests sharing a key share one quota.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientKey(String);

impl ClientKey {
    /// Build a key from an arbitrary client identity.
    pub fn new(identity: &str) -> Self {
        Self(format!("{}:{}", KEY_PREFIX, identity))
    }

    /// Build a key from the client's network address.
    pub fn from_ip(ip: IpAddr) -> Self {
        Self::new(&ip.to_string())
    }

    /// The key shared by all clients whose address could not be determined.
    pub fn unknown() -> Self {
        Self::new(UNKNOWN_CLIENT)
    }

    /// The key as stored in the counter store.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ClientKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ClientKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
