//! Fixed-length signing and encryption key pairs.

use sodiumoxide::crypto::box_;
use sodiumoxide::crypto::sign;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::ensure_init;

/// An Ed25519 signing key pair: a 64-byte secret key and its 32-byte public
/// counterpart. The secret is zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SigningKeyPair {
    /// The 64-byte Ed25519 secret key (seed || public key, NaCl convention).
    pub secret: [u8; 64],
    /// The 32-byte Ed25519 public key.
    #[zeroize(skip)]
    pub public: [u8; 32],
}

impl SigningKeyPair {
    /// Generate a fresh signing key pair from the system CSPRNG.
    pub fn generate() -> Self {
        ensure_init();
        let (pk, sk) = sign::gen_keypair();
        Self {
            secret: sk.0,
            public: pk.0,
        }
    }

    /// Derive a signing key pair deterministically from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        ensure_init();
        let (pk, sk) = sign::keypair_from_seed(&sign::Seed(*seed));
        Self {
            secret: sk.0,
            public: pk.0,
        }
    }

    /// Reconstruct a key pair from raw, already-known secret/public bytes
    /// (e.g. published test vectors).
    pub fn from_bytes(secret: [u8; 64], public: [u8; 32]) -> Self {
        Self { secret, public }
    }
}

impl std::fmt::Debug for SigningKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKeyPair")
            .field("public", &hex(&self.public))
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// An X25519 encryption key pair: a 32-byte secret and 32-byte public key.
/// Generated fresh per session (ephemeral); the secret is zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKeyPair {
    /// The 32-byte X25519 secret key.
    pub secret: [u8; 32],
    /// The 32-byte X25519 public key.
    #[zeroize(skip)]
    pub public: [u8; 32],
}

impl EncryptionKeyPair {
    /// Generate a fresh ephemeral encryption key pair from the system CSPRNG.
    pub fn generate() -> Self {
        ensure_init();
        let (pk, sk) = box_::gen_keypair();
        Self {
            secret: sk.0,
            public: pk.0,
        }
    }

    /// Reconstruct a key pair from raw, already-known secret/public bytes
    /// (e.g. published test vectors).
    pub fn from_bytes(secret: [u8; 32], public: [u8; 32]) -> Self {
        Self { secret, public }
    }
}

impl std::fmt::Debug for EncryptionKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionKeyPair")
            .field("public", &hex(&self.public))
            .field("secret", &"<redacted>")
            .finish()
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
