use std::io::{Read, Write};

use thiserror::Error;

use riftgate_serde::DecodeError;

use crate::types::ChannelId;

/// Largest body a single frame can declare; the 3-byte length field caps it.
/// Larger payloads must be split by the caller; this layer never fragments.
pub const MAX_BODY_LEN: usize = (1 << 24) - 1;

const HEADER_LEN: usize = 6;

/// Transport-layer commands, numbered 1..=5 on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuxCommand {
    Connect,
    Accept,
    Disconnect,
    Insert,
    Message,
}

impl MuxCommand {
    pub fn to_u8(self) -> u8 {
        match self {
            MuxCommand::Connect => 1,
            MuxCommand::Accept => 2,
            MuxCommand::Disconnect => 3,
            MuxCommand::Insert => 4,
            MuxCommand::Message => 5,
        }
    }

    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(MuxCommand::Connect),
            2 => Some(MuxCommand::Accept),
            3 => Some(MuxCommand::Disconnect),
            4 => Some(MuxCommand::Insert),
            5 => Some(MuxCommand::Message),
            _ => None,
        }
    }
}

/// Errors while reading or writing a frame. Every read-side variant is fatal
/// to the connection: the format has no resynchronization marker, so a
/// desynchronized stream cannot be recovered.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The peer closed the connection cleanly between frames.
    #[error("connection closed by peer")]
    Closed,

    /// The stream ended inside a frame header or declared body.
    #[error(transparent)]
    Truncated(#[from] DecodeError),

    /// A command byte outside 1..=5 (possible malformed or malicious frame).
    #[error("unknown mux command byte {byte:#04x} on channel {channel_id}")]
    UnknownCommand { byte: u8, channel_id: ChannelId },

    /// The caller handed a body larger than the 24-bit length field can carry.
    #[error("frame body of {len} bytes exceeds the 24-bit length limit")]
    BodyTooLarge { len: usize },

    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),
}

/// One transport-layer unit: 6-byte header (channel id, 24-bit body length,
/// command, all little-endian) plus a body carried only by `Message` frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub channel_id: ChannelId,
    pub command: MuxCommand,
    pub body: Vec<u8>,
}

impl Frame {
    pub fn connect(channel_id: ChannelId) -> Self {
        Self::control(channel_id, MuxCommand::Connect)
    }

    pub fn accept(channel_id: ChannelId) -> Self {
        Self::control(channel_id, MuxCommand::Accept)
    }

    pub fn disconnect(channel_id: ChannelId) -> Self {
        Self::control(channel_id, MuxCommand::Disconnect)
    }

    pub fn insert(channel_id: ChannelId) -> Self {
        Self::control(channel_id, MuxCommand::Insert)
    }

    pub fn message(channel_id: ChannelId, body: Vec<u8>) -> Self {
        Self {
            channel_id,
            command: MuxCommand::Message,
            body,
        }
    }

    fn control(channel_id: ChannelId, command: MuxCommand) -> Self {
        Self {
            channel_id,
            command,
            body: Vec::new(),
        }
    }

    /// Reads one frame with blocking reads. A clean shutdown before the first
    /// header byte is [`FrameError::Closed`]; any other shortfall is
    /// truncation and must terminate the connection.
    pub fn read_from<R: Read>(stream: &mut R) -> Result<Self, FrameError> {
        let mut header = [0u8; HEADER_LEN];
        let filled = fill(stream, &mut header)?;
        if filled == 0 {
            return Err(FrameError::Closed);
        }
        if filled < HEADER_LEN {
            return Err(DecodeError::TruncatedInput {
                needed: HEADER_LEN,
                available: filled,
            }
            .into());
        }

        let channel_id = u16::from_le_bytes([header[0], header[1]]);
        let body_len = u32::from_le_bytes([header[2], header[3], header[4], 0]) as usize;
        let command_byte = header[5];

        let command = MuxCommand::from_u8(command_byte).ok_or(FrameError::UnknownCommand {
            byte: command_byte,
            channel_id,
        })?;

        // Only Message carries a body; the other commands declare zero length.
        let mut body = Vec::new();
        if command == MuxCommand::Message && body_len > 0 {
            body = vec![0u8; body_len];
            let filled = fill(stream, &mut body)?;
            if filled < body_len {
                return Err(DecodeError::TruncatedInput {
                    needed: body_len,
                    available: filled,
                }
                .into());
            }
        }

        Ok(Self {
            channel_id,
            command,
            body,
        })
    }

    /// Exact inverse of [`Frame::read_from`]. Oversized bodies are rejected
    /// here rather than silently corrupting the length field.
    pub fn write_to<W: Write>(&self, stream: &mut W) -> Result<(), FrameError> {
        if self.body.len() > MAX_BODY_LEN {
            return Err(FrameError::BodyTooLarge {
                len: self.body.len(),
            });
        }
        debug_assert!(
            self.command == MuxCommand::Message || self.body.is_empty(),
            "only Message frames carry a body"
        );

        let mut header = [0u8; HEADER_LEN];
        header[0..2].copy_from_slice(&self.channel_id.to_le_bytes());
        let len_bytes = (self.body.len() as u32).to_le_bytes();
        header[2..5].copy_from_slice(&len_bytes[0..3]);
        header[5] = self.command.to_u8();

        stream.write_all(&header)?;
        if !self.body.is_empty() {
            stream.write_all(&self.body)?;
        }
        Ok(())
    }
}

/// Reads until the buffer is full or the stream hits EOF, returning how many
/// bytes were actually placed.
fn fill<R: Read>(stream: &mut R, buffer: &mut [u8]) -> Result<usize, FrameError> {
    let mut filled = 0;
    while filled < buffer.len() {
        match stream.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(count) => filled += count,
            Err(error) if error.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(FrameError::Io(error)),
        }
    }
    Ok(filled)
}
