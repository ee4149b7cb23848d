//! The handshake transcript bound into `Signature1`/`Signature2` (§6).

use saltchannel_crypto::{sign, sign_open, SigningKeyPair};

use crate::error::Error;

fn build(prefix: &[u8; 8], m1_hash: &[u8; 64], m2_hash: &[u8; 64]) -> Vec<u8> {
    let mut transcript = Vec::with_capacity(8 + 64 + 64);
    transcript.extend_from_slice(prefix);
    transcript.extend_from_slice(m1_hash);
    transcript.extend_from_slice(m2_hash);
    transcript
}

/// Produce a detached 64-byte signature over `prefix || m1_hash || m2_hash`.
pub(crate) fn sign_detached(
    prefix: &[u8; 8],
    m1_hash: &[u8; 64],
    m2_hash: &[u8; 64],
    sig_keys: &SigningKeyPair,
) -> [u8; 64] {
    let signed = sign(&build(prefix, m1_hash, m2_hash), sig_keys);
    let mut signature = [0u8; 64];
    signature.copy_from_slice(&signed[signed.len() - 64..]);
    signature
}

/// Verify a detached 64-byte signature over `prefix || m1_hash || m2_hash`.
pub(crate) fn verify_detached(
    prefix: &[u8; 8],
    m1_hash: &[u8; 64],
    m2_hash: &[u8; 64],
    sig_pk: &[u8; 32],
    signature: &[u8; 64],
) -> Result<(), Error> {
    let mut signed_message = build(prefix, m1_hash, m2_hash);
    signed_message.extend_from_slice(signature);
    sign_open(&signed_message, sig_pk)?;
    Ok(())
}
