//! Errors raised by the crypto façade itself.
//!
//! These are deliberately unit structs: neither failure carries a reason
//! beyond "verification failed" — libsodium does not provide one, and
//! inventing one would just be guessing.

use std::fmt;

/// Signature verification failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BadSignature;

impl fmt::Display for BadSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "signature verification failed")
    }
}
impl std::error::Error for BadSignature {}

/// AEAD authenticator verification failed during `box_open_afternm`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BadEncryptedData;

impl fmt::Display for BadEncryptedData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ciphertext authentication failed")
    }
}
impl std::error::Error for BadEncryptedData {}
