//! Application channel (C5, §4.5): per-message timestamps and single vs.
//! multi-message packing on top of the [`EncryptedChannel`].

use std::collections::VecDeque;

use crate::channel::EncryptedChannel;
use crate::error::{Error, SessionError};
use crate::packet::{AppPacket, MultiAppPacket, PacketType};
use crate::time::TimeKeeper;
use crate::transport::Transport;

/// Bidirectional application-data channel. Buffers decoded `MultiApp`
/// records so each [`AppChannel::read`] call yields exactly one message,
/// regardless of how many arrived batched together.
pub struct AppChannel<T: Transport> {
    channel: EncryptedChannel<T>,
    pending_reads: VecDeque<Vec<u8>>,
    last_flag: bool,
    /// An `M4` record the handshake deferred (client `buffer_m4`); piggybacked
    /// onto the first application write.
    buffered_m4: Option<Vec<u8>>,
}

impl<T: Transport> AppChannel<T> {
    /// Wrap an already-keyed [`EncryptedChannel`].
    pub fn new(channel: EncryptedChannel<T>) -> Self {
        Self {
            channel,
            pending_reads: VecDeque::new(),
            last_flag: false,
            buffered_m4: None,
        }
    }

    /// Defer an `M4` record's bytes so the next write piggybacks it ahead
    /// of the first application message (§4.6 step 5, `buffer_m4`).
    pub fn set_buffered_m4(&mut self, m4_bytes: Vec<u8>) {
        self.buffered_m4 = Some(m4_bytes);
    }

    /// Send a single pre-encoded record as its own encrypted write, bypassing
    /// app-packet framing. Used for handshake records (`M3`, unbuffered `M4`)
    /// that share this channel's key but are not application data.
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<(), SessionError<T::Error>> {
        self.channel.write(&[bytes], false)
    }

    /// Whether `LastFlag` was observed on the most recently read record.
    pub fn last_flag(&self) -> bool {
        self.last_flag
    }

    /// Send one application message. If a buffered `M4` is pending, it is
    /// sent first as a separate record in the same batched transport write;
    /// `last` applies only to the application record.
    pub fn write(
        &mut self,
        time_keeper: &mut dyn TimeKeeper,
        data: &[u8],
        last: bool,
    ) -> Result<(), SessionError<T::Error>> {
        let packet = AppPacket {
            time: time_keeper.now(),
            data: data.to_vec(),
        }
        .encode();
        match self.buffered_m4.take() {
            Some(m4_bytes) => self.channel.write(&[&m4_bytes, &packet], last),
            None => self.channel.write(&[&packet], last),
        }
    }

    /// Send several application messages. When `MultiAppPacket::should_use`
    /// allows it (at least two messages, within the wire's size caps), they
    /// are batched into one `MultiAppPacket`; otherwise one `AppPacket` per
    /// message is sent, batched into the same transport write.
    pub fn write_multi(
        &mut self,
        time_keeper: &mut dyn TimeKeeper,
        messages: &[&[u8]],
        last: bool,
    ) -> Result<(), SessionError<T::Error>> {
        let time = time_keeper.now();
        let records: Vec<Vec<u8>> = if MultiAppPacket::should_use(messages) {
            vec![MultiAppPacket {
                time,
                messages: messages.iter().map(|m| m.to_vec()).collect(),
            }
            .encode()
            .map_err(SessionError::Protocol)?]
        } else {
            messages
                .iter()
                .map(|message| {
                    AppPacket {
                        time,
                        data: message.to_vec(),
                    }
                    .encode()
                })
                .collect()
        };

        let m4_bytes = self.buffered_m4.take();
        let mut refs: Vec<&[u8]> = Vec::with_capacity(records.len() + 1);
        if let Some(m4) = &m4_bytes {
            refs.push(m4);
        }
        refs.extend(records.iter().map(Vec::as_slice));
        self.channel.write(&refs, last)
    }

    /// Receive the next application message, demultiplexing `MultiApp`
    /// records transparently.
    pub fn read(&mut self) -> Result<Vec<u8>, SessionError<T::Error>> {
        if let Some(message) = self.pending_reads.pop_front() {
            return Ok(message);
        }
        let plaintext = self.channel.read()?;
        self.last_flag = self.channel.last_flag();
        let type_byte = *plaintext
            .first()
            .ok_or_else(|| SessionError::Protocol(Error::BadPeer("empty app record".into())))?;
        match PacketType::from_byte(type_byte).map_err(SessionError::Protocol)? {
            PacketType::App => {
                let packet = AppPacket::decode(&plaintext).map_err(SessionError::Protocol)?;
                Ok(packet.data)
            }
            PacketType::MultiApp => {
                let packet = MultiAppPacket::decode(&plaintext).map_err(SessionError::Protocol)?;
                let mut messages: VecDeque<Vec<u8>> = packet.messages.into();
                let first = messages.pop_front().ok_or_else(|| {
                    SessionError::Protocol(Error::BadPeer("empty MultiApp record".into()))
                })?;
                self.pending_reads = messages;
                Ok(first)
            }
            other => Err(SessionError::Protocol(Error::BadPeer(format!(
                "unexpected application record type {}",
                other as u8
            )))),
        }
    }
}
