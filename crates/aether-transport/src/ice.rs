//! ICE server configuration
//!
//! Address discovery uses public STUN servers only. There is no TURN relay,
//! so peers that cannot connect directly surface a transport error.

use serde::{Deserialize, Serialize};

use aether_core::{AetherError, AetherResult};

/// Public STUN servers
pub const STUN_SERVERS: &[&str] = &[
    "stun:stun.l.google.com:19302",
    "stun:global.stun.twilio.com:3478",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceConfig {
    pub stun_servers: Vec<String>,
}

impl IceConfig {
    pub fn new(stun_servers: Vec<String>) -> Self {
        IceConfig { stun_servers }
    }

    /// Check every entry is a `stun:` / `stuns:` URL with a host
    pub fn validate(&self) -> AetherResult<()> {
        if self.stun_servers.is_empty() {
            return Err(AetherError::InvalidConfig("no STUN servers".into()));
        }
        for url in &self.stun_servers {
            let host = url
                .strip_prefix("stuns:")
                .or_else(|| url.strip_prefix("stun:"))
                .ok_or_else(|| AetherError::InvalidConfig(format!("not a STUN url: {}", url)))?;
            if host.is_empty() {
                return Err(AetherError::InvalidConfig(format!("missing host: {}", url)));
            }
        }
        Ok(())
    }
}

impl Default for IceConfig {
    fn default() -> Self {
        IceConfig {
            stun_servers: STUN_SERVERS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_servers_valid() {
        let ice = IceConfig::default();
        assert_eq!(ice.stun_servers.len(), 2);
        assert!(ice.validate().is_ok());
    }

    #[test]
    fn test_rejects_turn_and_empty() {
        assert!(IceConfig::new(vec![]).validate().is_err());
        assert!(IceConfig::new(vec!["turn:relay.example:3478".into()])
            .validate()
            .is_err());
        assert!(IceConfig::new(vec!["stun:".into()]).validate().is_err());
    }
}
