//! Protocol-level errors (§7 of the spec: everything that isn't a raw
//! transport failure).

use std::fmt;

/// A protocol violation: malformed packet, failed verification, or a
/// handshake-level rejection. Every variant here is fatal to the session —
/// there is no recovery at this layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// The peer sent data that does not conform to the wire format: wrong
    /// packet type, out-of-range field, reserved-bit violation, or a
    /// length/count field that disagrees with the bytes actually present.
    BadPeer(String),
    /// A signature (`Signature1` or `Signature2`) failed to verify.
    BadSignature,
    /// An `EncryptedPacket` body failed AEAD authentication.
    BadEncryptedData,
    /// The server does not recognize the requested server signing key.
    NoSuchServer,
    /// The time checker's policy rejected a timestamp.
    TimeError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadPeer(reason) => write!(f, "bad peer: {reason}"),
            Self::BadSignature => write!(f, "bad peer: invalid signature"),
            Self::BadEncryptedData => write!(f, "bad peer: invalid ciphertext"),
            Self::NoSuchServer => write!(f, "no such server"),
            Self::TimeError(reason) => write!(f, "time error: {reason}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<saltchannel_crypto::BadSignature> for Error {
    fn from(_: saltchannel_crypto::BadSignature) -> Self {
        Self::BadSignature
    }
}

impl From<saltchannel_crypto::BadEncryptedData> for Error {
    fn from(_: saltchannel_crypto::BadEncryptedData) -> Self {
        Self::BadEncryptedData
    }
}

/// A session-level error: either the transport failed, or the peer
/// misbehaved at the protocol level.
///
/// Mirrors the reference implementation's split between `ComException`
/// (transport) and `BadPeer` (protocol) — kept as two variants of one enum
/// rather than an exception hierarchy, since Rust has no subtyping to model
/// `BadPeer` as a net-narrower `ComException`.
#[derive(Debug)]
pub enum SessionError<E> {
    /// The underlying transport failed to deliver or accept a message.
    Transport(E),
    /// A protocol-level error as described by [`Error`].
    Protocol(Error),
}

impl<E: fmt::Display> fmt::Display for SessionError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport error: {e}"),
            Self::Protocol(e) => write!(f, "{e}"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for SessionError<E> {}

impl<E> From<Error> for SessionError<E> {
    fn from(e: Error) -> Self {
        Self::Protocol(e)
    }
}
