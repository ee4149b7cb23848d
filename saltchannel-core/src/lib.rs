//! Salt Channel v2 core: packet codec, handshake state machines, encrypted
//! record layer, and application message layer.
//!
//! This crate owns no transport and no cryptographic backend of its own —
//! see [`saltchannel_crypto`] for the crypto façade and [`transport::Transport`]
//! for the byte-transport seam. A typical user constructs a
//! [`transport::Transport`] implementation, then calls [`client::handshake`]
//! or [`server::accept`] to get a live [`app_channel::AppChannel`].

#![warn(missing_docs)]

pub mod app_channel;
pub mod channel;
pub mod client;
pub mod error;
pub mod nonce;
pub mod packet;
pub mod server;
mod transcript;
pub mod time;
pub mod transport;

pub use app_channel::AppChannel;
pub use channel::{EncryptedChannel, Role};
pub use error::{Error, SessionError};
pub use server::Accepted;
pub use transport::{LengthPrefixed, Transport};
