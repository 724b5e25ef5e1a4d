//! Bit-exact record codecs for mutable game objects.
//!
//! Every record type declares a flags word whose bit width is part of its
//! contract. Optional fields are explicit `Option`s on the record structs;
//! the flags word is derived from field presence at encode time and never
//! stored redundantly, so an encoder/decoder flag mismatch cannot exist.
//! Decoding reads the flags word first, then fields strictly in declared
//! order.

mod condition;
mod entity;
mod mission;
mod power;
mod property;
mod vector;

pub use condition::{Condition, ConditionAssetData};
pub use entity::{AbilitySlot, EntityCreate, EntityOwnership, Orientation};
pub use mission::{MissionState, MissionUpdate, Objective, ObjectiveProgress, ObjectiveState};
pub use power::{PowerActivation, PowerResult};
pub use property::{PropertyCollection, PropertyDelta, PropertyPair};
pub use vector::Vector3;

use thiserror::Error;

use riftgate_serde::{ArchiveReader, ArchiveWriter, DecodeError};

use crate::refs::{RefCategory, RefError, RefTables};
use crate::types::ReferenceId;

/// Errors raised by the record codecs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArchiveError {
    /// Stream problem. The enclosing message is dropped whole; no partial
    /// record state is ever surfaced.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// An id or index missing from its category table. Invalidates only this
    /// record; the connection and the rest of the body survive.
    #[error(transparent)]
    Ref(#[from] RefError),

    /// A received discriminant outside the declared range.
    #[error("invalid {field} value {value} in {record} record")]
    InvalidFieldValue {
        record: &'static str,
        field: &'static str,
        value: u64,
    },
}

impl ArchiveError {
    /// True when the error invalidates only the record, not the connection.
    pub fn is_record_local(&self) -> bool {
        matches!(
            self,
            ArchiveError::Ref(_) | ArchiveError::InvalidFieldValue { .. }
        )
    }
}

/// A record type with a bit-exact archive encoding. Decode of an encoded
/// record reproduces it exactly, given identical reference-table state on
/// both sides.
pub trait Archive: Sized {
    fn ser(&self, writer: &mut ArchiveWriter, tables: &RefTables) -> Result<(), ArchiveError>;
    fn de(reader: &mut ArchiveReader, tables: &RefTables) -> Result<Self, ArchiveError>;
}

/// Encodes one record, closing its boolean group at the record boundary.
pub fn encode<A: Archive>(record: &A, tables: &RefTables) -> Result<Vec<u8>, ArchiveError> {
    let mut writer = ArchiveWriter::new();
    record.ser(&mut writer, tables)?;
    Ok(writer.into_bytes())
}

/// Decodes one record from a complete payload. Stale buffered bits are
/// discarded at the boundary so they can never leak into a following record.
pub fn decode<A: Archive>(bytes: &[u8], tables: &RefTables) -> Result<A, ArchiveError> {
    let mut reader = ArchiveReader::new(bytes);
    let record = A::de(&mut reader, tables)?;
    reader.clear_bools();
    Ok(record)
}

pub(crate) fn write_ref(
    writer: &mut ArchiveWriter,
    tables: &RefTables,
    category: RefCategory,
    id: ReferenceId,
) -> Result<(), ArchiveError> {
    writer.write_varint(tables.index_of(id, category)?);
    Ok(())
}

pub(crate) fn read_ref(
    reader: &mut ArchiveReader,
    tables: &RefTables,
    category: RefCategory,
) -> Result<ReferenceId, ArchiveError> {
    let index = reader.read_varint()?;
    Ok(tables.id_at(index, category)?)
}
