//! Join link - the only contract between viewer and sender
//!
//! Format: `<origin>/mobile?id=<peer id>`. The id is an opaque,
//! case-sensitive rendezvous token.

use std::fmt;
use std::str::FromStr;

use aether_core::{AetherError, AetherResult, PeerId};

/// Path the sender page is served under
pub const JOIN_PATH: &str = "/mobile";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinLink {
    origin: String,
    id: PeerId,
}

impl JoinLink {
    /// `origin` is `scheme://host[:port]`; a trailing slash is dropped.
    pub fn new(origin: &str, id: PeerId) -> Self {
        JoinLink {
            origin: origin.trim_end_matches('/').to_string(),
            id,
        }
    }

    /// Replace the host (and port) while keeping the scheme. Used when the
    /// viewer's own address is not reachable from the phone.
    pub fn with_host(mut self, host: &str) -> Self {
        let host = host.trim().trim_end_matches('/');
        if host.is_empty() {
            return self;
        }
        self.origin = match self.origin.split_once("://") {
            Some((scheme, _)) => format!("{}://{}", scheme, host),
            None => host.to_string(),
        };
        self
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn id(&self) -> &PeerId {
        &self.id
    }

    pub fn into_id(self) -> PeerId {
        self.id
    }

    /// Parse a full join URL
    pub fn parse(url: &str) -> AetherResult<Self> {
        let url = url.trim();
        let (path, query) = url
            .split_once('?')
            .ok_or_else(|| AetherError::InvalidJoinLink(format!("missing query: {}", url)))?;
        let origin = path
            .trim_end_matches('/')
            .strip_suffix(JOIN_PATH)
            .ok_or_else(|| AetherError::InvalidJoinLink(format!("not a join path: {}", path)))?;

        let query = query.split('#').next().unwrap_or_default();
        let raw_id = query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == "id")
            .map(|(_, value)| value)
            .ok_or_else(|| AetherError::InvalidJoinLink(format!("missing id: {}", url)))?;

        let id = PeerId::new(raw_id)
            .map_err(|_| AetherError::InvalidJoinLink(format!("invalid id: {:?}", raw_id)))?;
        Ok(JoinLink::new(origin, id))
    }
}

impl fmt::Display for JoinLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}?id={}", self.origin, JOIN_PATH, self.id)
    }
}

impl FromStr for JoinLink {
    type Err = AetherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JoinLink::parse(s)
    }
}
