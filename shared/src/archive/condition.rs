use riftgate_serde::{ArchiveReader, ArchiveWriter};

use crate::refs::{RefCategory, RefTables};
use crate::types::{EntityId, ReferenceId};

use super::{read_ref, write_ref, Archive, ArchiveError, PropertyCollection};

const NO_CREATOR_ID: u64 = 1 << 0;
const NO_ULTIMATE_CREATOR_ID: u64 = 1 << 1;
const ULTIMATE_CREATOR_IS_CREATOR: u64 = 1 << 2;
const NO_CONDITION_PROTO_REF: u64 = 1 << 3;
const NO_CREATOR_POWER_PROTO_REF: u64 = 1 << 4;
const HAS_INDEX: u64 = 1 << 5;
const HAS_ASSET_DATA: u64 = 1 << 6;
const HAS_PAUSE_TIME: u64 = 1 << 7;
const HAS_TIME_REMAINING: u64 = 1 << 8;
const HAS_UPDATE_INTERVAL: u64 = 1 << 9;

const FLAG_BITS: u32 = 16;
const ALL_FLAGS: u64 = NO_CREATOR_ID
    | NO_ULTIMATE_CREATOR_ID
    | ULTIMATE_CREATOR_IS_CREATOR
    | NO_CONDITION_PROTO_REF
    | NO_CREATOR_POWER_PROTO_REF
    | HAS_INDEX
    | HAS_ASSET_DATA
    | HAS_PAUSE_TIME
    | HAS_TIME_REMAINING
    | HAS_UPDATE_INTERVAL;
const _: () = assert!(ALL_FLAGS < (1 << FLAG_BITS));

/// Asset reference and its start timestamp. The two always travel together,
/// co-gated by a single flag bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConditionAssetData {
    pub asset_id: u64,
    pub start_time: u64,
}

/// A status condition applied to an entity (buff, debuff, damage-over-time).
///
/// The ultimate creator is usually the creator itself; that case costs one
/// flag bit instead of a varint.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub id: u64,
    pub creator_id: Option<EntityId>,
    pub ultimate_creator_id: Option<EntityId>,
    pub condition_proto_ref: Option<ReferenceId>,
    pub creator_power_proto_ref: Option<ReferenceId>,
    pub index: Option<u64>,
    pub asset_data: Option<ConditionAssetData>,
    pub pause_time: Option<u64>,
    pub time_remaining: Option<u64>,
    pub update_interval: Option<u64>,
    pub properties: PropertyCollection,
}

impl Condition {
    fn flags(&self) -> u64 {
        let mut flags = 0u64;
        if self.creator_id.is_none() {
            flags |= NO_CREATOR_ID;
        }
        match self.ultimate_creator_id {
            None => flags |= NO_ULTIMATE_CREATOR_ID,
            Some(_) if self.ultimate_creator_id == self.creator_id => {
                flags |= ULTIMATE_CREATOR_IS_CREATOR;
            }
            Some(_) => {}
        }
        if self.condition_proto_ref.is_none() {
            flags |= NO_CONDITION_PROTO_REF;
        }
        if self.creator_power_proto_ref.is_none() {
            flags |= NO_CREATOR_POWER_PROTO_REF;
        }
        if self.index.is_some() {
            flags |= HAS_INDEX;
        }
        if self.asset_data.is_some() {
            flags |= HAS_ASSET_DATA;
        }
        if self.pause_time.is_some() {
            flags |= HAS_PAUSE_TIME;
        }
        if self.time_remaining.is_some() {
            flags |= HAS_TIME_REMAINING;
        }
        if self.update_interval.is_some() {
            flags |= HAS_UPDATE_INTERVAL;
        }
        flags
    }
}

impl Archive for Condition {
    fn ser(&self, writer: &mut ArchiveWriter, tables: &RefTables) -> Result<(), ArchiveError> {
        let flags = self.flags();
        writer.write_varint(flags);
        writer.write_varint(self.id);

        if let Some(creator_id) = self.creator_id {
            writer.write_varint(creator_id);
        }
        if flags & (NO_ULTIMATE_CREATOR_ID | ULTIMATE_CREATOR_IS_CREATOR) == 0 {
            // flags() only leaves both bits clear when the value is present
            if let Some(ultimate_creator_id) = self.ultimate_creator_id {
                writer.write_varint(ultimate_creator_id);
            }
        }
        if let Some(condition_proto_ref) = self.condition_proto_ref {
            write_ref(writer, tables, RefCategory::All, condition_proto_ref)?;
        }
        if let Some(creator_power_proto_ref) = self.creator_power_proto_ref {
            write_ref(writer, tables, RefCategory::Power, creator_power_proto_ref)?;
        }
        if let Some(index) = self.index {
            writer.write_varint(index);
        }
        if let Some(asset_data) = self.asset_data {
            writer.write_varint(asset_data.asset_id);
            writer.write_varint(asset_data.start_time);
        }
        if let Some(pause_time) = self.pause_time {
            writer.write_varint(pause_time);
        }
        if let Some(time_remaining) = self.time_remaining {
            writer.write_varint(time_remaining);
        }
        if let Some(update_interval) = self.update_interval {
            writer.write_varint(update_interval);
        }

        self.properties.ser(writer, tables)
    }

    fn de(reader: &mut ArchiveReader, tables: &RefTables) -> Result<Self, ArchiveError> {
        let flags = reader.read_varint()?;
        let id = reader.read_varint()?;

        let creator_id = if flags & NO_CREATOR_ID != 0 {
            None
        } else {
            Some(reader.read_varint()?)
        };
        let ultimate_creator_id = if flags & NO_ULTIMATE_CREATOR_ID != 0 {
            None
        } else if flags & ULTIMATE_CREATOR_IS_CREATOR != 0 {
            creator_id
        } else {
            Some(reader.read_varint()?)
        };
        let condition_proto_ref = if flags & NO_CONDITION_PROTO_REF != 0 {
            None
        } else {
            Some(read_ref(reader, tables, RefCategory::All)?)
        };
        let creator_power_proto_ref = if flags & NO_CREATOR_POWER_PROTO_REF != 0 {
            None
        } else {
            Some(read_ref(reader, tables, RefCategory::Power)?)
        };
        let index = if flags & HAS_INDEX != 0 {
            Some(reader.read_varint()?)
        } else {
            None
        };
        let asset_data = if flags & HAS_ASSET_DATA != 0 {
            Some(ConditionAssetData {
                asset_id: reader.read_varint()?,
                start_time: reader.read_varint()?,
            })
        } else {
            None
        };
        let pause_time = if flags & HAS_PAUSE_TIME != 0 {
            Some(reader.read_varint()?)
        } else {
            None
        };
        let time_remaining = if flags & HAS_TIME_REMAINING != 0 {
            Some(reader.read_varint()?)
        } else {
            None
        };
        let update_interval = if flags & HAS_UPDATE_INTERVAL != 0 {
            Some(reader.read_varint()?)
        } else {
            None
        };

        let properties = PropertyCollection::de(reader, tables)?;

        Ok(Self {
            id,
            creator_id,
            ultimate_creator_id,
            condition_proto_ref,
            creator_power_proto_ref,
            index,
            asset_data,
            pause_time,
            time_remaining,
            update_interval,
            properties,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{decode, encode, PropertyPair};

    fn tables() -> RefTables {
        let mut tables = RefTables::new();
        tables.insert(RefCategory::All, vec![0x7000, 0x7001, 0x7002]);
        tables.insert(RefCategory::Power, vec![0x5000, 0x5001]);
        tables.insert(RefCategory::Property, vec![0x100, 0x200]);
        tables
    }

    fn bare_condition() -> Condition {
        Condition {
            id: 17,
            creator_id: None,
            ultimate_creator_id: None,
            condition_proto_ref: None,
            creator_power_proto_ref: None,
            index: None,
            asset_data: None,
            pause_time: None,
            time_remaining: None,
            update_interval: None,
            properties: PropertyCollection::default(),
        }
    }

    #[test]
    fn all_optionals_absent_encodes_fixed_fields_only() {
        let tables = tables();
        let condition = bare_condition();

        let bytes = encode(&condition, &tables).unwrap();
        let decoded: Condition = decode(&bytes, &tables).unwrap();
        assert_eq!(decoded, condition);
        assert_eq!(decoded.creator_id, None);
        assert_eq!(decoded.ultimate_creator_id, None);
        assert_eq!(decoded.condition_proto_ref, None);
        assert_eq!(decoded.creator_power_proto_ref, None);
        assert_eq!(decoded.index, None);
        assert_eq!(decoded.asset_data, None);
        assert_eq!(decoded.pause_time, None);
        assert_eq!(decoded.time_remaining, None);
        assert_eq!(decoded.update_interval, None);
        assert!(decoded.properties.properties.is_empty());
        // flags + id + empty property count and nothing else
        assert_eq!(bytes.len(), 3);
    }

    #[test]
    fn fully_populated_round_trips() {
        let tables = tables();
        let condition = Condition {
            id: 99,
            creator_id: Some(1000),
            ultimate_creator_id: Some(2000),
            condition_proto_ref: Some(0x7002),
            creator_power_proto_ref: Some(0x5001),
            index: Some(3),
            asset_data: Some(ConditionAssetData {
                asset_id: 0xABCD,
                start_time: 123_456,
            }),
            pause_time: Some(500),
            time_remaining: Some(10_000),
            update_interval: Some(250),
            properties: PropertyCollection::new(vec![PropertyPair {
                property_ref: 0x200,
                value: 12,
            }]),
        };

        let bytes = encode(&condition, &tables).unwrap();
        assert_eq!(decode::<Condition>(&bytes, &tables).unwrap(), condition);
    }

    #[test]
    fn ultimate_creator_sentinel_costs_nothing() {
        let tables = tables();
        let mut condition = bare_condition();
        condition.creator_id = Some(1000);
        condition.ultimate_creator_id = Some(1000);

        let bytes = encode(&condition, &tables).unwrap();
        let decoded: Condition = decode(&bytes, &tables).unwrap();
        assert_eq!(decoded.ultimate_creator_id, Some(1000));

        let mut distinct = condition.clone();
        distinct.ultimate_creator_id = Some(2000);
        let distinct_bytes = encode(&distinct, &tables).unwrap();
        assert!(bytes.len() < distinct_bytes.len());
    }

    #[test]
    fn unknown_proto_ref_invalidates_record_only() {
        let tables = tables();
        let mut condition = bare_condition();
        condition.condition_proto_ref = Some(0xBAD);

        let error = encode(&condition, &tables).unwrap_err();
        assert!(error.is_record_local());
    }

    #[test]
    fn truncated_stream_mid_record() {
        let tables = tables();
        let mut condition = bare_condition();
        condition.pause_time = Some(1 << 20);

        let mut bytes = encode(&condition, &tables).unwrap();
        bytes.truncate(bytes.len() - 2);
        let error = decode::<Condition>(&bytes, &tables).unwrap_err();
        assert!(matches!(error, ArchiveError::Decode(_)));
        assert!(!error.is_record_local());
    }
}
