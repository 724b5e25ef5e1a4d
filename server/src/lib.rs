//! # Riftgate Server
//! Transport side of the riftgate game server: one blocking receive loop per
//! TCP connection, mux channel handshakes, service dispatch, and the
//! tick-synchronized inbound/outbound queues.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub mod shared {
    pub use riftgate_shared::{
        decode, encode, read_messages, write_messages, Archive, ArchiveError, ArchiveReader,
        ArchiveWriter, ChannelId, DecodeError, Frame, FrameError, MessageTypeId, MessageUnit,
        MuxCommand, Protocol, RefCategory, RefTables, ReplicationPolicy, ServiceKind,
        CHANNEL_BIND_TYPE_ID, CONTROL_CHANNEL,
    };
}

mod channel;
mod connection;
mod events;
mod key_generator;
mod queue;
mod server;
mod service;

pub use channel::ChannelState;
pub use connection::ConnectionHandle;
pub use events::{InboundEvent, ServerEvent};
pub use key_generator::{ConnectionId, KeyGenerator};
pub use queue::SwapQueue;
pub use server::Server;
pub use service::Service;
