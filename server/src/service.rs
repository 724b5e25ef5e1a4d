use riftgate_shared::{ChannelId, MessageTypeId, MessageUnit, ServiceKind};

use crate::key_generator::ConnectionId;

/// A logical service a channel can bind to.
///
/// The tick thread routes each decoded `(type id, payload)` unit from a bound
/// channel here, after checking the id against the service's catalog. Replies
/// are framed onto the same channel and flushed at the end of the tick.
/// Services run on the tick thread only, so implementations hold mutable
/// state without locking.
pub trait Service: Send {
    fn kind(&self) -> ServiceKind;

    fn handle_message(
        &mut self,
        connection: ConnectionId,
        channel: ChannelId,
        type_id: MessageTypeId,
        payload: &[u8],
    ) -> Vec<MessageUnit>;
}
