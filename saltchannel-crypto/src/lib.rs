//! Cryptographic façade for Salt Channel v2.
//!
//! Wraps `sodiumoxide` (libsodium bindings) behind the small, fixed set of
//! operations the protocol actually needs:
//!
//! * [`sha512`]
//! * [`sign`] / [`sign_open`]
//! * [`box_beforenm`] / [`box_afternm`] / [`box_open_afternm`]
//!
//! All inputs and outputs are opaque, fixed-length byte strings. No operation
//! here is itself fallible for structural reasons — only signature
//! verification and AEAD decryption can fail, and they fail with a plain
//! error enum rather than panicking.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod key_pair;

pub use error::{BadEncryptedData, BadSignature};
pub use key_pair::{EncryptionKeyPair, SigningKeyPair};

use sodiumoxide::crypto::box_;
use sodiumoxide::crypto::hash::sha512;
use sodiumoxide::crypto::sign as nacl_sign;
use std::sync::Once;

static INIT: Once = Once::new();

/// Ensure libsodium's own global state is initialized exactly once.
///
/// Safe to call repeatedly; cheap after the first call.
fn ensure_init() {
    INIT.call_once(|| {
        sodiumoxide::init().expect("sodiumoxide::init failed");
    });
}

/// SHA-512 of `m`.
pub fn sha512(m: &[u8]) -> [u8; 64] {
    ensure_init();
    sha512::hash(m).0
}

/// Sign `m` with `sk`, returning `m || signature` (detached signature last,
/// 64 bytes). Note libsodium's own `crypto_sign` produces `signature || m`
/// internally; this façade reorders the bytes so callers always see the
/// signature trailing the message, matching the rest of this protocol's
/// `[...][signature:64]` packet layouts.
pub fn sign(m: &[u8], sk: &SigningKeyPair) -> Vec<u8> {
    ensure_init();
    let key = nacl_sign::SecretKey::from_slice(&sk.secret).expect("secret key is always 64 bytes");
    let signed = nacl_sign::sign(m, &key);
    let (sig, msg) = signed.split_at(nacl_sign::SIGNATUREBYTES);
    let mut out = Vec::with_capacity(signed.len());
    out.extend_from_slice(msg);
    out.extend_from_slice(sig);
    out
}

/// Open a signed message produced by [`sign`], verifying it against `pk`.
///
/// Returns the original message `m` with the signature stripped, or
/// [`BadSignature`] if verification fails.
pub fn sign_open(sm: &[u8], pk: &[u8; 32]) -> Result<Vec<u8>, BadSignature> {
    ensure_init();
    if sm.len() < nacl_sign::SIGNATUREBYTES {
        return Err(BadSignature);
    }
    let (msg, sig) = sm.split_at(sm.len() - nacl_sign::SIGNATUREBYTES);
    let mut reordered = Vec::with_capacity(sm.len());
    reordered.extend_from_slice(sig);
    reordered.extend_from_slice(msg);
    let key = nacl_sign::PublicKey::from_slice(pk).expect("public key is always 32 bytes");
    nacl_sign::verify(&reordered, &key).map_err(|()| BadSignature)
}

/// Precompute the shared key for a Curve25519 box between `peer_pk` and
/// `my_sk` (NaCl's `crypto_box_beforenm`).
pub fn box_beforenm(peer_pk: &[u8; 32], my_sk: &[u8; 32]) -> [u8; 32] {
    ensure_init();
    let pk = box_::PublicKey::from_slice(peer_pk).expect("public key is always 32 bytes");
    let sk = box_::SecretKey::from_slice(my_sk).expect("secret key is always 32 bytes");
    box_::precompute(&pk, &sk).0
}

/// Authenticated-encrypt `plaintext` under the precomputed `key`, using
/// `nonce`. Output is `plaintext.len() + 16` bytes (NaCl `crypto_box_afternm`).
pub fn box_afternm(plaintext: &[u8], nonce: &[u8; 24], key: &[u8; 32]) -> Vec<u8> {
    ensure_init();
    let n = box_::Nonce::from_slice(nonce).expect("nonce is always 24 bytes");
    let k = box_::PrecomputedKey::from_slice(key).expect("key is always 32 bytes");
    box_::seal_precomputed(plaintext, &n, &k)
}

/// Authenticated-decrypt `ciphertext` under the precomputed `key` and
/// `nonce`. Fails with [`BadEncryptedData`] if the authenticator does not
/// verify (`crypto_box_open_afternm`).
pub fn box_open_afternm(
    ciphertext: &[u8],
    nonce: &[u8; 24],
    key: &[u8; 32],
) -> Result<Vec<u8>, BadEncryptedData> {
    ensure_init();
    let n = box_::Nonce::from_slice(nonce).expect("nonce is always 24 bytes");
    let k = box_::PrecomputedKey::from_slice(key).expect("key is always 32 bytes");
    box_::open_precomputed(ciphertext, &n, &k).map_err(|()| BadEncryptedData)
}
