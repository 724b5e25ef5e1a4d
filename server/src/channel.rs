use riftgate_shared::ServiceKind;

/// Lifecycle of one mux channel.
///
/// `Connect` (or `Insert`, which requests establishment the same way) moves a
/// channel to `HandshakeAccepted` and is answered with `Accept` on the same
/// channel id. The first message payload recognized as a service-selection
/// handshake then binds the channel. `Disconnect` tears the channel down,
/// or the whole connection when it arrives on the control channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Unbound,
    HandshakeAccepted,
    Bound(ServiceKind),
}

impl ChannelState {
    pub fn is_bound(&self) -> bool {
        matches!(self, ChannelState::Bound(_))
    }

    pub fn service(&self) -> Option<ServiceKind> {
        match self {
            ChannelState::Bound(service) => Some(*service),
            _ => None,
        }
    }
}
