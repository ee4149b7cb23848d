//! Pluggable message transport (§6).
//!
//! The core never touches a socket directly. Implement [`Transport`] over
//! TCP, a pipe, or an in-memory channel to hand this core whole messages;
//! framing on top of a raw byte stream is the implementation's job, not
//! this crate's — see [`LengthPrefixed`] for one ready-made adapter.

/// A full-duplex message transport: `write` sends one or more whole
/// messages, `read` receives exactly one.
///
/// Implementations are expected to deliver messages whole — the core never
/// reassembles partial reads itself.
pub trait Transport {
    /// The error type returned by read/write operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Send one message.
    fn write_message(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Send several messages as one batched operation, in order. Used by the
    /// encrypted channel and the M2+M3 / M4+app-data piggyback optimizations
    /// so they reach the wire as a single write where the transport supports
    /// it.
    fn write_messages(&mut self, messages: &[&[u8]]) -> Result<(), Self::Error> {
        for message in messages {
            self.write_message(message)?;
        }
        Ok(())
    }

    /// Receive the next whole message. Blocks until one is available.
    fn read_message(&mut self) -> Result<Vec<u8>, Self::Error>;
}

/// Wraps any `std::io::Read + std::io::Write` stream and frames messages
/// with a 4-byte little-endian length prefix.
///
/// This is the reference adapter for turning a raw byte stream (a TCP
/// socket, a pipe) into a [`Transport`]; it is not part of the protocol
/// itself, which is deliberately silent on framing (§1 Non-goals).
pub struct LengthPrefixed<S> {
    inner: S,
}

impl<S> LengthPrefixed<S> {
    /// Wrap an existing stream.
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    /// Unwrap back to the underlying stream.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: std::io::Read + std::io::Write> Transport for LengthPrefixed<S> {
    type Error = std::io::Error;

    fn write_message(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.inner.write_all(&(data.len() as u32).to_le_bytes())?;
        self.inner.write_all(data)?;
        self.inner.flush()
    }

    fn read_message(&mut self) -> Result<Vec<u8>, Self::Error> {
        let mut len_bytes = [0u8; 4];
        self.inner.read_exact(&mut len_bytes)?;
        let len = u32::from_le_bytes(len_bytes) as usize;
        let mut buf = vec![0u8; len];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }
}
