//! # saltchannel — Salt Channel v2
//!
//! `saltchannel` is a modular implementation of the Salt Channel v2
//! protocol, wired together here for convenience out of two focused
//! sub-crates:
//!
//! | Sub-crate             | Role                                          |
//! |------------------------|-----------------------------------------------|
//! | `saltchannel-crypto`   | Ed25519/X25519/SHA-512 façade over `sodiumoxide` |
//! | `saltchannel-core`     | packet codec, handshake, encrypted channel, app channel |
//!
//! ## Quick start: client handshake over a length-prefixed stream
//!
//! ```rust,no_run
//! use saltchannel::core::{LengthPrefixed, client, time::{NullTimeKeeper, NullTimeChecker}};
//! use saltchannel::crypto::SigningKeyPair;
//! use std::net::TcpStream;
//!
//! # fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let stream = TcpStream::connect("127.0.0.1:2034")?;
//! let transport = LengthPrefixed::new(stream);
//! let sig_keys = SigningKeyPair::generate();
//! let mut app = client::handshake(
//!     transport,
//!     &sig_keys,
//!     None,
//!     &mut NullTimeKeeper,
//!     &mut NullTimeChecker,
//!     false,
//! )?;
//! app.write(&mut NullTimeKeeper, b"hello", true)?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Re-export of [`saltchannel_core`] — packet codec, handshake state
/// machines, encrypted channel, and application channel.
pub use saltchannel_core as core;

/// Re-export of [`saltchannel_crypto`] — signing, box, and hashing façade.
pub use saltchannel_crypto as crypto;

// ─── Convenience re-exports ─────────────────────────────────────────────────

pub use saltchannel_core::{AppChannel, EncryptedChannel, Error, Role, SessionError, Transport};
pub use saltchannel_crypto::{EncryptionKeyPair, SigningKeyPair};
