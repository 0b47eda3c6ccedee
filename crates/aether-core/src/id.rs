//! Identity types for the HUD
//!
//! Peer ids are short ephemeral rendezvous tokens shared out of band.
//! Call and stream ids are local handles minted by the transport.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::AetherError;

/// Length of generated peer ids
pub const GENERATED_PEER_ID_LEN: usize = 5;

/// Maximum accepted peer id length
pub const MAX_PEER_ID_LEN: usize = 64;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Rendezvous token - case-sensitive ASCII alphanumeric
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PeerId(String);

impl PeerId {
    /// Validate and wrap an id
    pub fn new(id: impl Into<String>) -> Result<Self, AetherError> {
        let id = id.into();
        if id.is_empty()
            || id.len() > MAX_PEER_ID_LEN
            || !id.bytes().all(|b| b.is_ascii_alphanumeric())
        {
            return Err(AetherError::InvalidPeerId(id));
        }
        Ok(PeerId(id))
    }

    /// Generate a fresh short id.
    /// Collisions are possible but negligible for a short-lived session.
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::thread_rng())
    }

    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let id = (0..GENERATED_PEER_ID_LEN)
            .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
            .collect();
        PeerId(id)
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Peer({})", self.0)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PeerId {
    type Err = AetherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PeerId::new(s)
    }
}

impl TryFrom<String> for PeerId {
    type Error = AetherError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        PeerId::new(value)
    }
}

impl From<PeerId> for String {
    fn from(id: PeerId) -> Self {
        id.0
    }
}

/// Call identity - one media call on a transport
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CallId(pub u64);

impl CallId {
    #[inline]
    pub fn new(id: u64) -> Self {
        CallId(id)
    }
}

impl fmt::Debug for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Call({:x})", self.0)
    }
}

/// Media stream identity
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StreamId(pub u64);

impl StreamId {
    #[inline]
    pub fn new(id: u64) -> Self {
        StreamId(id)
    }
}

impl fmt::Debug for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Stream({:x})", self.0)
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generated_peer_id_shape() {
        let id = PeerId::generate();
        assert_eq!(id.as_str().len(), GENERATED_PEER_ID_LEN);
        assert!(id
            .as_str()
            .bytes()
            .all(|b| b.is_ascii_digit() || b.is_ascii_lowercase()));
    }

    #[test]
    fn test_generated_peer_id_deterministic_with_seed() {
        let a = PeerId::generate_with(&mut StdRng::seed_from_u64(7));
        let b = PeerId::generate_with(&mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn test_peer_id_validation() {
        assert!(PeerId::new("a1B2c").is_ok());
        assert!(PeerId::new("").is_err());
        assert!(PeerId::new("ab-cd").is_err());
        assert!(PeerId::new("ab cd").is_err());
        assert!(PeerId::new("x".repeat(MAX_PEER_ID_LEN + 1)).is_err());
    }

    #[test]
    fn test_peer_id_case_sensitive() {
        let lower: PeerId = "abcde".parse().unwrap();
        let upper: PeerId = "ABCDE".parse().unwrap();
        assert_ne!(lower, upper);
    }

    #[test]
    fn test_peer_id_serde_rejects_invalid() {
        let ok: PeerId = serde_json::from_str("\"k3x9q\"").unwrap();
        assert_eq!(ok.as_str(), "k3x9q");
        assert!(serde_json::from_str::<PeerId>("\"no/slash\"").is_err());
    }

    proptest::proptest! {
        #[test]
        fn prop_alphanumeric_ids_accepted(id in "[A-Za-z0-9]{1,64}") {
            let peer = PeerId::new(id.clone()).unwrap();
            proptest::prop_assert_eq!(peer.as_str(), id.as_str());
        }

        #[test]
        fn prop_any_separator_rejected(
            head in "[a-z0-9]{0,10}",
            sep in "[-_ /.?=#]",
            tail in "[a-z0-9]{0,10}",
        ) {
            let id = [head.as_str(), sep.as_str(), tail.as_str()].concat();
            proptest::prop_assert!(PeerId::new(id).is_err());
        }
    }
}
