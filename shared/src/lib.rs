//! # Riftgate Shared
//! Wire formats shared between the riftgate server and client: mux framing,
//! message units, archive record codecs, reference tables, and replication
//! policy.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub use riftgate_serde::{
    zigzag_decode, zigzag_encode, ArchiveReader, ArchiveWriter, DecodeError, MAX_FIXED_PRECISION,
    MAX_VARINT_BYTES,
};

pub mod archive;
pub mod mux;

mod protocol;
mod refs;
mod replication;
mod types;

pub use archive::{
    decode, encode, AbilitySlot, Archive, ArchiveError, Condition, ConditionAssetData,
    EntityCreate, EntityOwnership, MissionState, MissionUpdate, Objective, ObjectiveProgress,
    ObjectiveState, Orientation, PowerActivation, PowerResult, PropertyCollection, PropertyDelta,
    PropertyPair, Vector3,
};
pub use mux::{
    read_messages, write_messages, Frame, FrameError, MessageError, MessageUnit, MuxCommand,
    CONTROL_CHANNEL, MAX_BODY_LEN,
};
pub use protocol::{
    MessageCatalog, Protocol, ProtocolError, ServiceKind, CHANNEL_BIND_TYPE_ID,
};
pub use refs::{RefCategory, RefError, RefTable, RefTables};
pub use replication::{filter_recipients, InterestProvider, ReplicationPolicy};
pub use types::{ChannelId, EntityId, MessageTypeId, ReferenceId};
