use riftgate_serde::{ArchiveReader, ArchiveWriter, DecodeError};

use crate::refs::{RefCategory, RefTables};
use crate::replication::ReplicationPolicy;
use crate::types::{EntityId, ReferenceId};

use super::{read_ref, write_ref, Archive, ArchiveError, PropertyCollection, Vector3};

const POSITION_PRECISION: u8 = 3;
/// Angles are small magnitudes; they get the finest quantization the format
/// supports.
const ORIENTATION_PRECISION: u8 = 6;

/// Facing of an entity in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Orientation {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

impl Orientation {
    pub fn new(yaw: f32, pitch: f32, roll: f32) -> Self {
        Self { yaw, pitch, roll }
    }

    fn ser(&self, writer: &mut ArchiveWriter) {
        writer.write_fixed(self.yaw, ORIENTATION_PRECISION);
        writer.write_fixed(self.pitch, ORIENTATION_PRECISION);
        writer.write_fixed(self.roll, ORIENTATION_PRECISION);
    }

    fn de(reader: &mut ArchiveReader) -> Result<Self, DecodeError> {
        Ok(Self {
            yaw: reader.read_fixed(ORIENTATION_PRECISION)?,
            pitch: reader.read_fixed(ORIENTATION_PRECISION)?,
            roll: reader.read_fixed(ORIENTATION_PRECISION)?,
        })
    }
}

/// Owner entity and the inventory slot the owned entity occupies. The two
/// always travel together, co-gated by one flag bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityOwnership {
    pub owner_id: EntityId,
    pub inventory_slot: u64,
}

const HAS_OWNER: u64 = 1 << 0;

const FLAG_BITS: u32 = 8;
const ALL_FLAGS: u64 = HAS_OWNER;
const _: () = assert!(ALL_FLAGS < (1 << FLAG_BITS));

/// Full snapshot sent when an entity enters a recipient's interest. The five
/// state booleans share a single lazily materialized bit-buffer byte instead
/// of costing one byte each.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityCreate {
    pub entity_id: EntityId,
    pub entity_proto_ref: ReferenceId,
    pub policy: ReplicationPolicy,
    pub position: Vector3,
    pub orientation: Orientation,
    pub sleeping: bool,
    pub invulnerable: bool,
    pub untargetable: bool,
    pub no_collide: bool,
    pub hidden: bool,
    pub ownership: Option<EntityOwnership>,
    pub properties: PropertyCollection,
}

impl Archive for EntityCreate {
    fn ser(&self, writer: &mut ArchiveWriter, tables: &RefTables) -> Result<(), ArchiveError> {
        let mut flags = 0u64;
        if self.ownership.is_some() {
            flags |= HAS_OWNER;
        }

        writer.write_varint(self.entity_id);
        write_ref(writer, tables, RefCategory::Entity, self.entity_proto_ref)?;
        writer.write_varint(u64::from(self.policy.bits()));
        writer.write_varint(flags);
        self.position.ser(writer, POSITION_PRECISION);
        self.orientation.ser(writer);

        writer.write_bool(self.sleeping);
        writer.write_bool(self.invulnerable);
        writer.write_bool(self.untargetable);
        writer.write_bool(self.no_collide);
        writer.write_bool(self.hidden);

        if let Some(ownership) = self.ownership {
            writer.write_varint(ownership.owner_id);
            writer.write_varint(ownership.inventory_slot);
        }

        self.properties.ser(writer, tables)
    }

    fn de(reader: &mut ArchiveReader, tables: &RefTables) -> Result<Self, ArchiveError> {
        let entity_id = reader.read_varint()?;
        let entity_proto_ref = read_ref(reader, tables, RefCategory::Entity)?;
        let policy = ReplicationPolicy::from_bits(reader.read_varint()? as u32);
        let flags = reader.read_varint()?;
        let position = Vector3::de(reader, POSITION_PRECISION)?;
        let orientation = Orientation::de(reader)?;

        let sleeping = reader.read_bool()?;
        let invulnerable = reader.read_bool()?;
        let untargetable = reader.read_bool()?;
        let no_collide = reader.read_bool()?;
        let hidden = reader.read_bool()?;

        let ownership = if flags & HAS_OWNER != 0 {
            Some(EntityOwnership {
                owner_id: reader.read_varint()?,
                inventory_slot: reader.read_varint()?,
            })
        } else {
            None
        };

        let properties = PropertyCollection::de(reader, tables)?;

        Ok(Self {
            entity_id,
            entity_proto_ref,
            policy,
            position,
            orientation,
            sleeping,
            invulnerable,
            untargetable,
            no_collide,
            hidden,
            ownership,
            properties,
        })
    }
}

/// Binding of a power into one of an avatar's ability slots. The two state
/// booleans share a bit byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbilitySlot {
    pub entity_id: EntityId,
    pub power_proto_ref: ReferenceId,
    pub slot_index: u64,
    pub active: bool,
    pub toggled_on: bool,
}

impl Archive for AbilitySlot {
    fn ser(&self, writer: &mut ArchiveWriter, tables: &RefTables) -> Result<(), ArchiveError> {
        writer.write_varint(self.entity_id);
        write_ref(writer, tables, RefCategory::Power, self.power_proto_ref)?;
        writer.write_varint(self.slot_index);
        writer.write_bool(self.active);
        writer.write_bool(self.toggled_on);
        Ok(())
    }

    fn de(reader: &mut ArchiveReader, tables: &RefTables) -> Result<Self, ArchiveError> {
        Ok(Self {
            entity_id: reader.read_varint()?,
            power_proto_ref: read_ref(reader, tables, RefCategory::Power)?,
            slot_index: reader.read_varint()?,
            active: reader.read_bool()?,
            toggled_on: reader.read_bool()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{decode, encode, PropertyPair};

    fn tables() -> RefTables {
        let mut tables = RefTables::new();
        tables.insert(RefCategory::Entity, vec![0x9000, 0x9001]);
        tables.insert(RefCategory::Power, vec![0x5000, 0x5001]);
        tables.insert(RefCategory::Property, vec![0x100]);
        tables
    }

    fn snapshot() -> EntityCreate {
        EntityCreate {
            entity_id: 4242,
            entity_proto_ref: 0x9001,
            policy: ReplicationPolicy::PROXIMITY | ReplicationPolicy::DISCOVERY,
            position: Vector3::new(512.5, -64.0, 12.25),
            orientation: Orientation::new(1.5, 0.0, -0.75),
            sleeping: false,
            invulnerable: true,
            untargetable: false,
            no_collide: true,
            hidden: false,
            ownership: None,
            properties: PropertyCollection::new(vec![PropertyPair {
                property_ref: 0x100,
                value: 800,
            }]),
        }
    }

    #[test]
    fn snapshot_round_trips() {
        let tables = tables();
        let entity = snapshot();
        let bytes = encode(&entity, &tables).unwrap();
        let decoded: EntityCreate = decode(&bytes, &tables).unwrap();

        assert_eq!(decoded.entity_id, entity.entity_id);
        assert_eq!(decoded.entity_proto_ref, entity.entity_proto_ref);
        assert_eq!(decoded.policy, entity.policy);
        assert!(!decoded.sleeping);
        assert!(decoded.invulnerable);
        assert!(!decoded.untargetable);
        assert!(decoded.no_collide);
        assert!(!decoded.hidden);
        assert_eq!(decoded.ownership, None);
        assert_eq!(decoded.properties, entity.properties);
        assert_eq!(decoded.position.quantized(3), entity.position.quantized(3));
    }

    #[test]
    fn five_booleans_share_one_byte() {
        let tables = tables();
        let mut all_set = snapshot();
        all_set.sleeping = true;
        all_set.untargetable = true;
        all_set.hidden = true;
        let mut all_clear = snapshot();
        all_clear.invulnerable = false;
        all_clear.no_collide = false;

        // same wire size either way: the group byte is always emitted
        let set_bytes = encode(&all_set, &tables).unwrap();
        let clear_bytes = encode(&all_clear, &tables).unwrap();
        assert_eq!(set_bytes.len(), clear_bytes.len());
    }

    #[test]
    fn ownership_round_trips() {
        let tables = tables();
        let mut entity = snapshot();
        entity.ownership = Some(EntityOwnership {
            owner_id: 11,
            inventory_slot: 4,
        });

        let bytes = encode(&entity, &tables).unwrap();
        let decoded: EntityCreate = decode(&bytes, &tables).unwrap();
        assert_eq!(decoded.ownership, entity.ownership);
    }

    #[test]
    fn ability_slot_round_trips() {
        let tables = tables();
        let slot = AbilitySlot {
            entity_id: 4242,
            power_proto_ref: 0x5001,
            slot_index: 2,
            active: true,
            toggled_on: false,
        };
        let bytes = encode(&slot, &tables).unwrap();
        assert_eq!(decode::<AbilitySlot>(&bytes, &tables).unwrap(), slot);
    }

    #[test]
    fn unknown_entity_proto_fails_encode() {
        let tables = tables();
        let mut entity = snapshot();
        entity.entity_proto_ref = 0xFFFF_FFFF;
        assert!(encode(&entity, &tables).is_err());
    }
}
