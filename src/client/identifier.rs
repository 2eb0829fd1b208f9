//! Client identifiers and the randomness they are drawn from.

use ring::rand::{SecureRandom, SystemRandom};

use crate::error::BinderError;

/// Number of random bytes in a client identifier.
pub const CLIENT_ID_BYTES: usize = 16;

/// A source of cryptographically strong random bytes.
///
/// Production code uses [`SystemRandomSource`]. Tests can inject a
/// deterministic source.
pub trait RandomSource: Send + Sync {
    /// Fill `dest` entirely with random bytes.
    fn fill(&self, dest: &mut [u8]) -> Result<(), BinderError>;
}

/// The operating system's random number generator.
#[derive(Debug, Clone)]
pub struct SystemRandomSource {
    rng: SystemRandom,
}

impl SystemRandomSource {
    /// Create a new system random source.
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
        }
    }
}

impl Default for SystemRandomSource {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for SystemRandomSource {
    fn fill(&self, dest: &mut [u8]) -> Result<(), BinderError> {
        self.rng.fill(dest).map_err(|_| BinderError::Randomness {
            message: "System random source unavailable".to_string(),
        })
    }
}

/// The identifier a client sends as the JSON-RPC `id` of every request.
///
/// Lowercase hex encoding of [`CLIENT_ID_BYTES`] random bytes. Fixed for
/// the lifetime of the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(String);

impl ClientId {
    /// Draw a new identifier from `source`.
    pub fn generate(source: &dyn RandomSource) -> Result<Self, BinderError> {
        let mut bytes = [0u8; CLIENT_ID_BYTES];
        source.fill(&mut bytes)?;
        Ok(Self(hex::encode(bytes)))
    }

    /// The hex-encoded identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ClientId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingRandom;

    impl RandomSource for CountingRandom {
        fn fill(&self, dest: &mut [u8]) -> Result<(), BinderError> {
            for (i, b) in dest.iter_mut().enumerate() {
                *b = (i as u8) * 0x11;
            }
            Ok(())
        }
    }

    struct BrokenRandom;

    impl RandomSource for BrokenRandom {
        fn fill(&self, _dest: &mut [u8]) -> Result<(), BinderError> {
            Err(BinderError::Randomness {
                message: "entropy pool empty".to_string(),
            })
        }
    }

    #[test]
    fn test_deterministic_identifier() {
        let id = ClientId::generate(&CountingRandom).unwrap();
        assert_eq!(id.as_str(), "00112233445566778899aabbccddeeff");
    }

    #[test]
    fn test_system_identifier_format() {
        let id = ClientId::generate(&SystemRandomSource::new()).unwrap();
        assert_eq!(id.as_str().len(), 2 * CLIENT_ID_BYTES);
        assert!(id
            .as_str()
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_system_identifiers_differ() {
        let source = SystemRandomSource::new();
        let a = ClientId::generate(&source).unwrap();
        let b = ClientId::generate(&source).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_random_failure_propagates() {
        let err = ClientId::generate(&BrokenRandom).unwrap_err();
        assert!(matches!(err, BinderError::Randomness { .. }));
    }
}
