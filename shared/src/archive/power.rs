use riftgate_serde::{ArchiveReader, ArchiveWriter};

use crate::refs::{RefCategory, RefTables};
use crate::replication::ReplicationPolicy;
use crate::types::{EntityId, ReferenceId};

use super::{read_ref, write_ref, Archive, ArchiveError, Vector3};

/// Positions in power records are quantized at 1/8 world unit.
const POSITION_PRECISION: u8 = 3;
/// Hit positions only need quarter-unit accuracy.
const HIT_POSITION_PRECISION: u8 = 2;

// PowerActivation flags

const TARGET_IS_USER: u64 = 1 << 0;
const HAS_TRIGGERING_POWER_REF: u64 = 1 << 1;
const HAS_TARGET_POSITION: u64 = 1 << 2;
const TARGET_POSITION_IS_USER_POSITION: u64 = 1 << 3;
const HAS_MOVEMENT_TIME: u64 = 1 << 4;
const HAS_VARIABLE_ACTIVATION_TIME: u64 = 1 << 5;
const HAS_POWER_RANDOM_SEED: u64 = 1 << 6;
const HAS_FX_RANDOM_SEED: u64 = 1 << 7;

const ACTIVATION_FLAG_BITS: u32 = 8;
const ACTIVATION_ALL_FLAGS: u64 = TARGET_IS_USER
    | HAS_TRIGGERING_POWER_REF
    | HAS_TARGET_POSITION
    | TARGET_POSITION_IS_USER_POSITION
    | HAS_MOVEMENT_TIME
    | HAS_VARIABLE_ACTIVATION_TIME
    | HAS_POWER_RANDOM_SEED
    | HAS_FX_RANDOM_SEED;
const _: () = assert!(ACTIVATION_ALL_FLAGS < (1 << ACTIVATION_FLAG_BITS));

/// An entity activating a power.
///
/// The target position is never sent absolute: it is either a per-axis delta
/// against the user position (both quantized first, reconstituted by addition
/// on decode) or implied equal to the user position by a flag.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerActivation {
    pub policy: ReplicationPolicy,
    pub user_id: EntityId,
    pub target_id: EntityId,
    pub power_proto_ref: ReferenceId,
    pub triggering_power_proto_ref: Option<ReferenceId>,
    pub user_position: Vector3,
    pub target_position: Option<Vector3>,
    pub movement_time: Option<u64>,
    pub variable_activation_time: Option<u64>,
    pub power_random_seed: Option<u32>,
    pub fx_random_seed: Option<u32>,
}

impl PowerActivation {
    fn flags(&self) -> u64 {
        let mut flags = 0u64;
        if self.target_id == self.user_id {
            flags |= TARGET_IS_USER;
        }
        if self.triggering_power_proto_ref.is_some() {
            flags |= HAS_TRIGGERING_POWER_REF;
        }
        if let Some(target_position) = &self.target_position {
            if target_position.quantized(POSITION_PRECISION)
                == self.user_position.quantized(POSITION_PRECISION)
            {
                flags |= TARGET_POSITION_IS_USER_POSITION;
            } else {
                flags |= HAS_TARGET_POSITION;
            }
        }
        if self.movement_time.is_some() {
            flags |= HAS_MOVEMENT_TIME;
        }
        if self.variable_activation_time.is_some() {
            flags |= HAS_VARIABLE_ACTIVATION_TIME;
        }
        if self.power_random_seed.is_some() {
            flags |= HAS_POWER_RANDOM_SEED;
        }
        if self.fx_random_seed.is_some() {
            flags |= HAS_FX_RANDOM_SEED;
        }
        flags
    }
}

impl Archive for PowerActivation {
    fn ser(&self, writer: &mut ArchiveWriter, tables: &RefTables) -> Result<(), ArchiveError> {
        let flags = self.flags();

        writer.write_varint(u64::from(self.policy.bits()));
        writer.write_varint(flags);
        writer.write_varint(self.user_id);
        if flags & TARGET_IS_USER == 0 {
            writer.write_varint(self.target_id);
        }
        write_ref(writer, tables, RefCategory::Power, self.power_proto_ref)?;
        if let Some(triggering) = self.triggering_power_proto_ref {
            write_ref(writer, tables, RefCategory::Power, triggering)?;
        }
        self.user_position.ser(writer, POSITION_PRECISION);
        if flags & HAS_TARGET_POSITION != 0 {
            // presence guaranteed by flags()
            if let Some(target_position) = &self.target_position {
                Vector3::ser_delta(
                    writer,
                    &self.user_position,
                    target_position,
                    POSITION_PRECISION,
                );
            }
        }
        if let Some(movement_time) = self.movement_time {
            writer.write_varint(movement_time);
        }
        if let Some(variable_activation_time) = self.variable_activation_time {
            writer.write_varint(variable_activation_time);
        }
        if let Some(power_random_seed) = self.power_random_seed {
            writer.write_varint(u64::from(power_random_seed));
        }
        if let Some(fx_random_seed) = self.fx_random_seed {
            writer.write_varint(u64::from(fx_random_seed));
        }
        Ok(())
    }

    fn de(reader: &mut ArchiveReader, tables: &RefTables) -> Result<Self, ArchiveError> {
        let policy = ReplicationPolicy::from_bits(reader.read_varint()? as u32);
        let flags = reader.read_varint()?;
        let user_id = reader.read_varint()?;
        let target_id = if flags & TARGET_IS_USER != 0 {
            user_id
        } else {
            reader.read_varint()?
        };
        let power_proto_ref = read_ref(reader, tables, RefCategory::Power)?;
        let triggering_power_proto_ref = if flags & HAS_TRIGGERING_POWER_REF != 0 {
            Some(read_ref(reader, tables, RefCategory::Power)?)
        } else {
            None
        };
        let user_position = Vector3::de(reader, POSITION_PRECISION)?;
        let target_position = if flags & HAS_TARGET_POSITION != 0 {
            Some(Vector3::de_delta(
                reader,
                &user_position,
                POSITION_PRECISION,
            )?)
        } else if flags & TARGET_POSITION_IS_USER_POSITION != 0 {
            Some(user_position)
        } else {
            None
        };
        let movement_time = if flags & HAS_MOVEMENT_TIME != 0 {
            Some(reader.read_varint()?)
        } else {
            None
        };
        let variable_activation_time = if flags & HAS_VARIABLE_ACTIVATION_TIME != 0 {
            Some(reader.read_varint()?)
        } else {
            None
        };
        let power_random_seed = if flags & HAS_POWER_RANDOM_SEED != 0 {
            Some(reader.read_varint()? as u32)
        } else {
            None
        };
        let fx_random_seed = if flags & HAS_FX_RANDOM_SEED != 0 {
            Some(reader.read_varint()? as u32)
        } else {
            None
        };

        Ok(Self {
            policy,
            user_id,
            target_id,
            power_proto_ref,
            triggering_power_proto_ref,
            user_position,
            target_position,
            movement_time,
            variable_activation_time,
            power_random_seed,
            fx_random_seed,
        })
    }
}

// PowerResult flags

const NO_POWER_OWNER_ID: u64 = 1 << 0;
const POWER_OWNER_IS_TARGET: u64 = 1 << 1;
const NO_ULTIMATE_OWNER_ID: u64 = 1 << 2;
const ULTIMATE_OWNER_IS_POWER_OWNER: u64 = 1 << 3;
const HAS_PHYSICAL_DAMAGE: u64 = 1 << 4;
const HAS_ENERGY_DAMAGE: u64 = 1 << 5;
const HAS_MENTAL_DAMAGE: u64 = 1 << 6;
const HAS_HEALING: u64 = 1 << 7;
const HAS_HIT_POSITION: u64 = 1 << 8;

const RESULT_FLAG_BITS: u32 = 16;
const RESULT_ALL_FLAGS: u64 = NO_POWER_OWNER_ID
    | POWER_OWNER_IS_TARGET
    | NO_ULTIMATE_OWNER_ID
    | ULTIMATE_OWNER_IS_POWER_OWNER
    | HAS_PHYSICAL_DAMAGE
    | HAS_ENERGY_DAMAGE
    | HAS_MENTAL_DAMAGE
    | HAS_HEALING
    | HAS_HIT_POSITION;
const _: () = assert!(RESULT_ALL_FLAGS < (1 << RESULT_FLAG_BITS));

/// Outcome of a power application against one target.
///
/// The owner-id chain is three-way: absent, sentinel (equals the target id /
/// equals the power owner), or explicit.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerResult {
    pub policy: ReplicationPolicy,
    pub power_proto_ref: ReferenceId,
    pub target_id: EntityId,
    pub power_owner_id: Option<EntityId>,
    pub ultimate_owner_id: Option<EntityId>,
    pub physical_damage: Option<u64>,
    pub energy_damage: Option<u64>,
    pub mental_damage: Option<u64>,
    pub healing: Option<u64>,
    pub hit_position: Option<Vector3>,
}

impl PowerResult {
    fn flags(&self) -> u64 {
        let mut flags = 0u64;
        match self.power_owner_id {
            None => flags |= NO_POWER_OWNER_ID,
            Some(owner) if owner == self.target_id => flags |= POWER_OWNER_IS_TARGET,
            Some(_) => {}
        }
        match self.ultimate_owner_id {
            None => flags |= NO_ULTIMATE_OWNER_ID,
            Some(_) if self.ultimate_owner_id == self.power_owner_id => {
                flags |= ULTIMATE_OWNER_IS_POWER_OWNER;
            }
            Some(_) => {}
        }
        if self.physical_damage.is_some() {
            flags |= HAS_PHYSICAL_DAMAGE;
        }
        if self.energy_damage.is_some() {
            flags |= HAS_ENERGY_DAMAGE;
        }
        if self.mental_damage.is_some() {
            flags |= HAS_MENTAL_DAMAGE;
        }
        if self.healing.is_some() {
            flags |= HAS_HEALING;
        }
        if self.hit_position.is_some() {
            flags |= HAS_HIT_POSITION;
        }
        flags
    }
}

impl Archive for PowerResult {
    fn ser(&self, writer: &mut ArchiveWriter, tables: &RefTables) -> Result<(), ArchiveError> {
        let flags = self.flags();

        writer.write_varint(u64::from(self.policy.bits()));
        writer.write_varint(flags);
        write_ref(writer, tables, RefCategory::Power, self.power_proto_ref)?;
        writer.write_varint(self.target_id);
        if flags & (NO_POWER_OWNER_ID | POWER_OWNER_IS_TARGET) == 0 {
            if let Some(power_owner_id) = self.power_owner_id {
                writer.write_varint(power_owner_id);
            }
        }
        if flags & (NO_ULTIMATE_OWNER_ID | ULTIMATE_OWNER_IS_POWER_OWNER) == 0 {
            if let Some(ultimate_owner_id) = self.ultimate_owner_id {
                writer.write_varint(ultimate_owner_id);
            }
        }
        if let Some(physical_damage) = self.physical_damage {
            writer.write_varint(physical_damage);
        }
        if let Some(energy_damage) = self.energy_damage {
            writer.write_varint(energy_damage);
        }
        if let Some(mental_damage) = self.mental_damage {
            writer.write_varint(mental_damage);
        }
        if let Some(healing) = self.healing {
            writer.write_varint(healing);
        }
        if let Some(hit_position) = &self.hit_position {
            hit_position.ser(writer, HIT_POSITION_PRECISION);
        }
        Ok(())
    }

    fn de(reader: &mut ArchiveReader, tables: &RefTables) -> Result<Self, ArchiveError> {
        let policy = ReplicationPolicy::from_bits(reader.read_varint()? as u32);
        let flags = reader.read_varint()?;
        let power_proto_ref = read_ref(reader, tables, RefCategory::Power)?;
        let target_id = reader.read_varint()?;
        let power_owner_id = if flags & NO_POWER_OWNER_ID != 0 {
            None
        } else if flags & POWER_OWNER_IS_TARGET != 0 {
            Some(target_id)
        } else {
            Some(reader.read_varint()?)
        };
        let ultimate_owner_id = if flags & NO_ULTIMATE_OWNER_ID != 0 {
            None
        } else if flags & ULTIMATE_OWNER_IS_POWER_OWNER != 0 {
            power_owner_id
        } else {
            Some(reader.read_varint()?)
        };
        let physical_damage = if flags & HAS_PHYSICAL_DAMAGE != 0 {
            Some(reader.read_varint()?)
        } else {
            None
        };
        let energy_damage = if flags & HAS_ENERGY_DAMAGE != 0 {
            Some(reader.read_varint()?)
        } else {
            None
        };
        let mental_damage = if flags & HAS_MENTAL_DAMAGE != 0 {
            Some(reader.read_varint()?)
        } else {
            None
        };
        let healing = if flags & HAS_HEALING != 0 {
            Some(reader.read_varint()?)
        } else {
            None
        };
        let hit_position = if flags & HAS_HIT_POSITION != 0 {
            Some(Vector3::de(reader, HIT_POSITION_PRECISION)?)
        } else {
            None
        };

        Ok(Self {
            policy,
            power_proto_ref,
            target_id,
            power_owner_id,
            ultimate_owner_id,
            physical_damage,
            energy_damage,
            mental_damage,
            healing,
            hit_position,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{decode, encode};

    fn tables() -> RefTables {
        let mut tables = RefTables::new();
        tables.insert(RefCategory::Power, vec![0x5000, 0x5001, 0x5002]);
        tables
    }

    fn base_activation() -> PowerActivation {
        PowerActivation {
            policy: ReplicationPolicy::PROXIMITY,
            user_id: 100,
            target_id: 100,
            power_proto_ref: 0x5000,
            triggering_power_proto_ref: None,
            user_position: Vector3::new(100.5, -200.25, 0.0),
            target_position: None,
            movement_time: None,
            variable_activation_time: None,
            power_random_seed: None,
            fx_random_seed: None,
        }
    }

    #[test]
    fn self_targeted_activation_round_trips() {
        let tables = tables();
        let activation = base_activation();
        let bytes = encode(&activation, &tables).unwrap();
        let decoded: PowerActivation = decode(&bytes, &tables).unwrap();
        assert_eq!(decoded.target_id, decoded.user_id);
        assert_eq!(decoded.target_position, None);
    }

    #[test]
    fn distinct_target_id_is_encoded() {
        let tables = tables();
        let mut activation = base_activation();
        activation.target_id = 250;

        let bytes = encode(&activation, &tables).unwrap();
        let decoded: PowerActivation = decode(&bytes, &tables).unwrap();
        assert_eq!(decoded.target_id, 250);
    }

    #[test]
    fn target_position_travels_as_delta() {
        let tables = tables();
        let mut activation = base_activation();
        activation.target_position = Some(Vector3::new(103.0, -198.0, 4.5));

        let bytes = encode(&activation, &tables).unwrap();
        let decoded: PowerActivation = decode(&bytes, &tables).unwrap();
        let decoded_target = decoded.target_position.unwrap();
        assert_eq!(
            decoded_target.quantized(POSITION_PRECISION),
            Vector3::new(103.0, -198.0, 4.5).quantized(POSITION_PRECISION)
        );
    }

    #[test]
    fn target_position_equal_to_user_costs_only_a_flag() {
        let tables = tables();
        let mut equal = base_activation();
        equal.target_position = Some(equal.user_position);

        let mut distinct = base_activation();
        distinct.target_position = Some(Vector3::new(120.0, -190.0, 8.0));

        let equal_bytes = encode(&equal, &tables).unwrap();
        let distinct_bytes = encode(&distinct, &tables).unwrap();
        assert!(equal_bytes.len() < distinct_bytes.len());

        let decoded: PowerActivation = decode(&equal_bytes, &tables).unwrap();
        assert_eq!(decoded.target_position, Some(decoded.user_position));
    }

    #[test]
    fn timing_and_seeds_round_trip() {
        let tables = tables();
        let mut activation = base_activation();
        activation.triggering_power_proto_ref = Some(0x5002);
        activation.movement_time = Some(350);
        activation.variable_activation_time = Some(1200);
        activation.power_random_seed = Some(0xDEADBEEF);
        activation.fx_random_seed = Some(42);

        let bytes = encode(&activation, &tables).unwrap();
        let decoded: PowerActivation = decode(&bytes, &tables).unwrap();
        assert_eq!(decoded.triggering_power_proto_ref, Some(0x5002));
        assert_eq!(decoded.movement_time, Some(350));
        assert_eq!(decoded.variable_activation_time, Some(1200));
        assert_eq!(decoded.power_random_seed, Some(0xDEADBEEF));
        assert_eq!(decoded.fx_random_seed, Some(42));
    }

    fn base_result() -> PowerResult {
        PowerResult {
            policy: ReplicationPolicy::PROXIMITY | ReplicationPolicy::PARTY,
            power_proto_ref: 0x5001,
            target_id: 77,
            power_owner_id: None,
            ultimate_owner_id: None,
            physical_damage: None,
            energy_damage: None,
            mental_damage: None,
            healing: None,
            hit_position: None,
        }
    }

    #[test]
    fn minimal_result_round_trips() {
        let tables = tables();
        let result = base_result();
        let bytes = encode(&result, &tables).unwrap();
        assert_eq!(decode::<PowerResult>(&bytes, &tables).unwrap(), result);
    }

    #[test]
    fn owner_equals_target_uses_sentinel() {
        let tables = tables();
        let mut sentinel = base_result();
        sentinel.power_owner_id = Some(77);

        let mut explicit = base_result();
        explicit.power_owner_id = Some(78);

        let sentinel_bytes = encode(&sentinel, &tables).unwrap();
        let explicit_bytes = encode(&explicit, &tables).unwrap();
        assert!(sentinel_bytes.len() < explicit_bytes.len());

        let decoded: PowerResult = decode(&sentinel_bytes, &tables).unwrap();
        assert_eq!(decoded.power_owner_id, Some(77));
    }

    #[test]
    fn owner_chain_round_trips() {
        let tables = tables();
        let mut result = base_result();
        result.power_owner_id = Some(500);
        result.ultimate_owner_id = Some(600);

        let bytes = encode(&result, &tables).unwrap();
        assert_eq!(decode::<PowerResult>(&bytes, &tables).unwrap(), result);

        result.ultimate_owner_id = Some(500);
        let sentinel_bytes = encode(&result, &tables).unwrap();
        assert!(sentinel_bytes.len() < bytes.len());
        assert_eq!(
            decode::<PowerResult>(&sentinel_bytes, &tables)
                .unwrap()
                .ultimate_owner_id,
            Some(500)
        );
    }

    #[test]
    fn damage_fields_gate_independently() {
        let tables = tables();
        let mut result = base_result();
        result.energy_damage = Some(340);
        result.healing = Some(12);
        result.hit_position = Some(Vector3::new(1.25, 2.5, -3.75));

        let bytes = encode(&result, &tables).unwrap();
        let decoded: PowerResult = decode(&bytes, &tables).unwrap();
        assert_eq!(decoded.physical_damage, None);
        assert_eq!(decoded.energy_damage, Some(340));
        assert_eq!(decoded.mental_damage, None);
        assert_eq!(decoded.healing, Some(12));
        assert_eq!(
            decoded.hit_position.unwrap().quantized(HIT_POSITION_PRECISION),
            Vector3::new(1.25, 2.5, -3.75).quantized(HIT_POSITION_PRECISION)
        );
    }
}
