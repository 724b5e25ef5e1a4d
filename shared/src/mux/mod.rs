pub mod frame;
pub mod message;

pub use frame::{Frame, FrameError, MuxCommand, MAX_BODY_LEN};
pub use message::{read_messages, write_messages, MessageError, MessageUnit};

use crate::types::ChannelId;

/// By protocol convention, a `Disconnect` on this channel tears down the
/// entire connection rather than the single channel.
pub const CONTROL_CHANNEL: ChannelId = 1;
