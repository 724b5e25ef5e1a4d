use riftgate_serde::{ArchiveReader, ArchiveWriter};

use crate::refs::{RefCategory, RefTables};
use crate::types::{EntityId, ReferenceId};

use super::{read_ref, write_ref, Archive, ArchiveError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissionState {
    Inactive,
    Available,
    Active,
    Completed,
    Failed,
}

impl MissionState {
    fn to_u64(self) -> u64 {
        match self {
            MissionState::Inactive => 0,
            MissionState::Available => 1,
            MissionState::Active => 2,
            MissionState::Completed => 3,
            MissionState::Failed => 4,
        }
    }

    fn from_u64(value: u64) -> Result<Self, ArchiveError> {
        match value {
            0 => Ok(MissionState::Inactive),
            1 => Ok(MissionState::Available),
            2 => Ok(MissionState::Active),
            3 => Ok(MissionState::Completed),
            4 => Ok(MissionState::Failed),
            _ => Err(ArchiveError::InvalidFieldValue {
                record: "MissionUpdate",
                field: "state",
                value,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveState {
    Invalid,
    Available,
    Active,
    Completed,
    Failed,
}

impl ObjectiveState {
    fn to_u64(self) -> u64 {
        match self {
            ObjectiveState::Invalid => 0,
            ObjectiveState::Available => 1,
            ObjectiveState::Active => 2,
            ObjectiveState::Completed => 3,
            ObjectiveState::Failed => 4,
        }
    }

    fn from_u64(value: u64) -> Result<Self, ArchiveError> {
        match value {
            0 => Ok(ObjectiveState::Invalid),
            1 => Ok(ObjectiveState::Available),
            2 => Ok(ObjectiveState::Active),
            3 => Ok(ObjectiveState::Completed),
            4 => Ok(ObjectiveState::Failed),
            _ => Err(ArchiveError::InvalidFieldValue {
                record: "Objective",
                field: "state",
                value,
            }),
        }
    }
}

/// Completion counters for one objective, co-gated by a single flag bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectiveProgress {
    pub current: u64,
    pub required: u64,
}

const OBJECTIVE_HAS_PROGRESS: u64 = 1 << 0;
const OBJECTIVE_HAS_INTERACTED_ENTITIES: u64 = 1 << 1;

const OBJECTIVE_FLAG_BITS: u32 = 8;
const OBJECTIVE_ALL_FLAGS: u64 = OBJECTIVE_HAS_PROGRESS | OBJECTIVE_HAS_INTERACTED_ENTITIES;
const _: () = assert!(OBJECTIVE_ALL_FLAGS < (1 << OBJECTIVE_FLAG_BITS));

/// One objective inside a mission fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Objective {
    pub index: u64,
    pub state: ObjectiveState,
    pub progress: Option<ObjectiveProgress>,
    pub interacted_entities: Vec<EntityId>,
}

impl Archive for Objective {
    fn ser(&self, writer: &mut ArchiveWriter, _tables: &RefTables) -> Result<(), ArchiveError> {
        let mut flags = 0u64;
        if self.progress.is_some() {
            flags |= OBJECTIVE_HAS_PROGRESS;
        }
        if !self.interacted_entities.is_empty() {
            flags |= OBJECTIVE_HAS_INTERACTED_ENTITIES;
        }

        writer.write_varint(self.index);
        writer.write_varint(flags);
        writer.write_varint(self.state.to_u64());
        if let Some(progress) = self.progress {
            writer.write_varint(progress.current);
            writer.write_varint(progress.required);
        }
        if !self.interacted_entities.is_empty() {
            writer.write_varint(self.interacted_entities.len() as u64);
            for entity_id in &self.interacted_entities {
                writer.write_varint(*entity_id);
            }
        }
        Ok(())
    }

    fn de(reader: &mut ArchiveReader, _tables: &RefTables) -> Result<Self, ArchiveError> {
        let index = reader.read_varint()?;
        let flags = reader.read_varint()?;
        let state = ObjectiveState::from_u64(reader.read_varint()?)?;
        let progress = if flags & OBJECTIVE_HAS_PROGRESS != 0 {
            Some(ObjectiveProgress {
                current: reader.read_varint()?,
                required: reader.read_varint()?,
            })
        } else {
            None
        };
        let mut interacted_entities = Vec::new();
        if flags & OBJECTIVE_HAS_INTERACTED_ENTITIES != 0 {
            let count = reader.read_varint()?;
            for _ in 0..count {
                interacted_entities.push(reader.read_varint()?);
            }
        }

        Ok(Self {
            index,
            state,
            progress,
            interacted_entities,
        })
    }
}

const MISSION_HAS_EXPIRATION_TIME: u64 = 1 << 0;
const MISSION_HAS_RESET_COUNT: u64 = 1 << 1;

const MISSION_FLAG_BITS: u32 = 8;
const MISSION_ALL_FLAGS: u64 = MISSION_HAS_EXPIRATION_TIME | MISSION_HAS_RESET_COUNT;
const _: () = assert!(MISSION_ALL_FLAGS < (1 << MISSION_FLAG_BITS));

/// Mission/quest state fragment with its count-prefixed objectives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissionUpdate {
    pub mission_proto_ref: ReferenceId,
    pub state: MissionState,
    pub expiration_time: Option<u64>,
    pub reset_count: Option<u64>,
    pub objectives: Vec<Objective>,
}

impl Archive for MissionUpdate {
    fn ser(&self, writer: &mut ArchiveWriter, tables: &RefTables) -> Result<(), ArchiveError> {
        let mut flags = 0u64;
        if self.expiration_time.is_some() {
            flags |= MISSION_HAS_EXPIRATION_TIME;
        }
        if self.reset_count.is_some() {
            flags |= MISSION_HAS_RESET_COUNT;
        }

        write_ref(writer, tables, RefCategory::All, self.mission_proto_ref)?;
        writer.write_varint(flags);
        writer.write_varint(self.state.to_u64());
        if let Some(expiration_time) = self.expiration_time {
            writer.write_varint(expiration_time);
        }
        if let Some(reset_count) = self.reset_count {
            writer.write_varint(reset_count);
        }
        writer.write_varint(self.objectives.len() as u64);
        for objective in &self.objectives {
            objective.ser(writer, tables)?;
        }
        Ok(())
    }

    fn de(reader: &mut ArchiveReader, tables: &RefTables) -> Result<Self, ArchiveError> {
        let mission_proto_ref = read_ref(reader, tables, RefCategory::All)?;
        let flags = reader.read_varint()?;
        let state = MissionState::from_u64(reader.read_varint()?)?;
        let expiration_time = if flags & MISSION_HAS_EXPIRATION_TIME != 0 {
            Some(reader.read_varint()?)
        } else {
            None
        };
        let reset_count = if flags & MISSION_HAS_RESET_COUNT != 0 {
            Some(reader.read_varint()?)
        } else {
            None
        };
        let count = reader.read_varint()?;
        let mut objectives = Vec::new();
        for _ in 0..count {
            objectives.push(Objective::de(reader, tables)?);
        }

        Ok(Self {
            mission_proto_ref,
            state,
            expiration_time,
            reset_count,
            objectives,
        })
    }
}
