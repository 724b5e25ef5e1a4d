use riftgate_serde::{ArchiveReader, ArchiveWriter};

use crate::refs::{RefCategory, RefTables};
use crate::replication::ReplicationPolicy;
use crate::types::{EntityId, ReferenceId};

use super::{read_ref, write_ref, Archive, ArchiveError};

/// One property id/value pair. Values travel as zigzag varints; their
/// interpretation (integer, boolean, packed float) belongs to the simulation
/// layer, not the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyPair {
    pub property_ref: ReferenceId,
    pub value: i64,
}

/// Count-prefixed set of property pairs. Embedded in entity and condition
/// records; always present there, never flag-gated.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PropertyCollection {
    pub properties: Vec<PropertyPair>,
}

impl PropertyCollection {
    pub fn new(properties: Vec<PropertyPair>) -> Self {
        Self { properties }
    }
}

impl Archive for PropertyCollection {
    fn ser(&self, writer: &mut ArchiveWriter, tables: &RefTables) -> Result<(), ArchiveError> {
        writer.write_varint(self.properties.len() as u64);
        for pair in &self.properties {
            write_ref(writer, tables, RefCategory::Property, pair.property_ref)?;
            writer.write_zigzag(pair.value);
        }
        Ok(())
    }

    fn de(reader: &mut ArchiveReader, tables: &RefTables) -> Result<Self, ArchiveError> {
        let count = reader.read_varint()?;
        let mut properties = Vec::new();
        for _ in 0..count {
            let property_ref = read_ref(reader, tables, RefCategory::Property)?;
            let value = reader.read_zigzag()?;
            properties.push(PropertyPair {
                property_ref,
                value,
            });
        }
        Ok(Self { properties })
    }
}

// Single property change addressed to one entity.

const VALUE_IS_ONE: u64 = 1 << 0;

const FLAG_BITS: u32 = 8;
const ALL_FLAGS: u64 = VALUE_IS_ONE;
const _: () = assert!(ALL_FLAGS < (1 << FLAG_BITS));

/// A property delta: one entity's property set to a new value. The common
/// `value == 1` case (toggles, counters bumped to one) costs no value bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyDelta {
    pub policy: ReplicationPolicy,
    pub entity_id: EntityId,
    pub property_ref: ReferenceId,
    pub value: i64,
}

impl Archive for PropertyDelta {
    fn ser(&self, writer: &mut ArchiveWriter, tables: &RefTables) -> Result<(), ArchiveError> {
        let mut flags = 0u64;
        if self.value == 1 {
            flags |= VALUE_IS_ONE;
        }

        writer.write_varint(u64::from(self.policy.bits()));
        writer.write_varint(flags);
        writer.write_varint(self.entity_id);
        write_ref(writer, tables, RefCategory::Property, self.property_ref)?;
        if flags & VALUE_IS_ONE == 0 {
            writer.write_zigzag(self.value);
        }
        Ok(())
    }

    fn de(reader: &mut ArchiveReader, tables: &RefTables) -> Result<Self, ArchiveError> {
        let policy = ReplicationPolicy::from_bits(reader.read_varint()? as u32);
        let flags = reader.read_varint()?;
        let entity_id = reader.read_varint()?;
        let property_ref = read_ref(reader, tables, RefCategory::Property)?;
        let value = if flags & VALUE_IS_ONE != 0 {
            1
        } else {
            reader.read_zigzag()?
        };

        Ok(Self {
            policy,
            entity_id,
            property_ref,
            value,
        })
    }
}
