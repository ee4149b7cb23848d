//! Encrypted channel (C4, §4.4): nonce-sequenced AEAD over a [`Transport`].

use saltchannel_crypto::{box_afternm, box_open_afternm};
use zeroize::Zeroize;

use crate::error::{Error, SessionError};
use crate::nonce::NonceSequence;
use crate::packet::EncryptedPacket;
use crate::transport::Transport;

/// Which side of the handshake this channel belongs to. Determines the
/// read/write nonce starting points (§3): the client and the server start
/// on opposite counters so neither side ever reuses the other's nonce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// Write starts at 1, read starts at 2.
    Client,
    /// Write starts at 2, read starts at 1.
    Server,
}

/// A confidential, integrity-protected channel over a [`Transport`],
/// keyed by one shared session key derived during the handshake.
pub struct EncryptedChannel<T: Transport> {
    transport: T,
    key: [u8; 32],
    read_nonce: NonceSequence,
    write_nonce: NonceSequence,
    last_flag: bool,
    /// A transport message the session layer already read off the wire but
    /// decided belongs to this channel (the server's M2+M3 batching, and the
    /// client's symmetric read of that batch).
    pushback: Option<Vec<u8>>,
}

impl<T: Transport> Drop for EncryptedChannel<T> {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl<T: Transport> EncryptedChannel<T> {
    /// Construct a channel from a derived shared key and the transport it
    /// will read and write whole messages over.
    pub fn new(transport: T, key: [u8; 32], role: Role) -> Self {
        let (write_start, read_start) = match role {
            Role::Client => (1, 2),
            Role::Server => (2, 1),
        };
        Self {
            transport,
            key,
            read_nonce: NonceSequence::starting_at(read_start),
            write_nonce: NonceSequence::starting_at(write_start),
            last_flag: false,
            pushback: None,
        }
    }

    /// The `LastFlag` observed on the most recently decrypted record.
    pub fn last_flag(&self) -> bool {
        self.last_flag
    }

    /// Stash a transport message for the next [`EncryptedChannel::read`] to
    /// consume instead of reading the transport again.
    pub fn push_back(&mut self, message: Vec<u8>) {
        self.pushback = Some(message);
    }

    /// Decrypt and return the next record's plaintext.
    pub fn read(&mut self) -> Result<Vec<u8>, SessionError<T::Error>> {
        let raw = match self.pushback.take() {
            Some(message) => message,
            None => self
                .transport
                .read_message()
                .map_err(SessionError::Transport)?,
        };
        let packet = EncryptedPacket::decode(&raw).map_err(SessionError::Protocol)?;
        let nonce = self.read_nonce.current();
        let plaintext = box_open_afternm(&packet.body, &nonce, &self.key)
            .map_err(|e| SessionError::Protocol(Error::from(e)))?;
        self.read_nonce.advance();
        self.last_flag = packet.last_flag;
        Ok(plaintext)
    }

    /// Encrypt and send `messages` as one batched transport write.
    /// `last` sets `LastFlag` on the final message only.
    pub fn write(&mut self, messages: &[&[u8]], last: bool) -> Result<(), SessionError<T::Error>> {
        let mut wrapped = Vec::with_capacity(messages.len());
        for (i, message) in messages.iter().enumerate() {
            let nonce = self.write_nonce.current();
            let body = box_afternm(message, &nonce, &self.key);
            self.write_nonce.advance();
            let is_last = last && i == messages.len() - 1;
            wrapped.push(
                EncryptedPacket {
                    last_flag: is_last,
                    body,
                }
                .encode(),
            );
        }
        let refs: Vec<&[u8]> = wrapped.iter().map(Vec::as_slice).collect();
        self.transport
            .write_messages(&refs)
            .map_err(SessionError::Transport)
    }

    /// Encrypt `message` and batch it into one transport write together with
    /// a `raw` message that precedes it on the wire unencrypted. Used for the
    /// server's `buffer_m2` optimization: `M2` (plaintext) and the wrapped
    /// `M3` reach the wire as a single write (§4.7 step 5).
    pub fn write_with_leading_raw(
        &mut self,
        raw: &[u8],
        message: &[u8],
        last: bool,
    ) -> Result<(), SessionError<T::Error>> {
        let nonce = self.write_nonce.current();
        let body = box_afternm(message, &nonce, &self.key);
        self.write_nonce.advance();
        let wrapped = EncryptedPacket {
            last_flag: last,
            body,
        }
        .encode();
        self.transport
            .write_messages(&[raw, &wrapped])
            .map_err(SessionError::Transport)
    }
}
