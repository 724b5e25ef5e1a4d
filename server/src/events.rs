use std::sync::Arc;

use riftgate_shared::{ChannelId, MessageTypeId, ServiceKind};

use crate::connection::ConnectionHandle;
use crate::key_generator::ConnectionId;

/// Raw events produced by accept/receive threads and consumed by the tick
/// thread through the swap queue. Message payloads arrive already separated
/// into units; their archive decoding belongs to the bound service.
pub enum InboundEvent {
    Connected {
        handle: Arc<ConnectionHandle>,
    },
    ChannelBound {
        connection: ConnectionId,
        channel: ChannelId,
        service: ServiceKind,
    },
    ChannelClosed {
        connection: ConnectionId,
        channel: ChannelId,
    },
    Message {
        connection: ConnectionId,
        channel: ChannelId,
        type_id: MessageTypeId,
        payload: Vec<u8>,
    },
    Disconnected {
        connection: ConnectionId,
    },
}

/// Connection lifecycle events surfaced to the embedding application after
/// each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerEvent {
    Connected(ConnectionId),
    ChannelBound {
        connection: ConnectionId,
        channel: ChannelId,
        service: ServiceKind,
    },
    Disconnected(ConnectionId),
}
