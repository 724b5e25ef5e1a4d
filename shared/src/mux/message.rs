use thiserror::Error;

use riftgate_serde::{ArchiveReader, ArchiveWriter, DecodeError};

use crate::types::MessageTypeId;

/// One `(type id, payload)` unit inside a Message frame's body. The payload
/// is opaque at this layer; its meaning depends on the channel's bound
/// service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageUnit {
    pub type_id: MessageTypeId,
    pub payload: Vec<u8>,
}

impl MessageUnit {
    pub fn new(type_id: MessageTypeId, payload: Vec<u8>) -> Self {
        Self { type_id, payload }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    /// The declared body ended before the current unit completed. Fatal: the
    /// whole enclosing frame is dropped and the connection closed.
    #[error(transparent)]
    Truncated(#[from] DecodeError),
}

/// Parses a Message frame body as back-to-back units until it is exhausted.
/// An unmapped type id is not an error here; dispatch decides that, with the
/// payload already skipped by its declared length.
pub fn read_messages(body: &[u8]) -> Result<Vec<MessageUnit>, MessageError> {
    let mut reader = ArchiveReader::new(body);
    let mut units = Vec::new();

    while !reader.is_empty() {
        let type_id = reader.read_u8()?;
        let length = reader.read_varint()?;
        let payload = reader.read_bytes(length as usize)?.to_vec();
        units.push(MessageUnit { type_id, payload });
    }

    Ok(units)
}

/// Exact inverse of [`read_messages`].
pub fn write_messages(units: &[MessageUnit]) -> Vec<u8> {
    let mut writer = ArchiveWriter::new();
    for unit in units {
        writer.write_u8(unit.type_id);
        writer.write_varint(unit.payload.len() as u64);
        writer.write_bytes(&unit.payload);
    }
    writer.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_units_decode_in_order() {
        let body = write_messages(&[
            MessageUnit::new(5, vec![0xAA, 0xBB, 0xCC]),
            MessageUnit::new(7, vec![]),
        ]);

        let units = read_messages(&body).unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].type_id, 5);
        assert_eq!(units[0].payload, vec![0xAA, 0xBB, 0xCC]);
        assert_eq!(units[1].type_id, 7);
        assert!(units[1].payload.is_empty());
    }

    #[test]
    fn empty_body_is_zero_units() {
        assert!(read_messages(&[]).unwrap().is_empty());
    }

    #[test]
    fn unit_truncated_mid_payload() {
        let mut body = write_messages(&[MessageUnit::new(1, vec![1, 2, 3, 4])]);
        body.truncate(body.len() - 2);
        assert!(matches!(
            read_messages(&body),
            Err(MessageError::Truncated(_))
        ));
    }

    #[test]
    fn unit_truncated_before_length() {
        // type id present, varint length missing
        assert!(matches!(
            read_messages(&[9]),
            Err(MessageError::Truncated(_))
        ));
    }

    #[test]
    fn large_declared_length_is_truncation_not_panic() {
        // claims a 1 MiB payload with 1 byte present
        let mut body = vec![2];
        let mut writer = ArchiveWriter::new();
        writer.write_varint(1 << 20);
        body.extend_from_slice(&writer.into_bytes());
        body.push(0xFF);
        assert!(matches!(
            read_messages(&body),
            Err(MessageError::Truncated(_))
        ));
    }
}
