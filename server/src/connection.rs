use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info, warn};

use riftgate_shared::{
    read_messages, ChannelId, Frame, FrameError, MuxCommand, ServiceKind, CHANNEL_BIND_TYPE_ID,
    CONTROL_CHANNEL,
};

use crate::channel::ChannelState;
use crate::events::InboundEvent;
use crate::key_generator::ConnectionId;
use crate::queue::SwapQueue;

/// Write-side handle to one connection, shared between its receive thread
/// (handshake replies) and the tick thread (end-of-tick flush). All writes go
/// through the per-connection lock, preserving per-connection frame order.
pub struct ConnectionHandle {
    id: ConnectionId,
    writer: Mutex<Box<dyn Write + Send>>,
    open: AtomicBool,
    socket: Option<TcpStream>,
}

impl ConnectionHandle {
    pub fn new(id: ConnectionId, writer: Box<dyn Write + Send>) -> Self {
        Self {
            id,
            writer: Mutex::new(writer),
            open: AtomicBool::new(true),
            socket: None,
        }
    }

    /// Handle backed by a real socket; keeps a clone so `close` can interrupt
    /// the receive thread's blocking read.
    pub fn from_socket(id: ConnectionId, socket: &TcpStream) -> std::io::Result<Self> {
        Ok(Self {
            id,
            writer: Mutex::new(Box::new(socket.try_clone()?)),
            open: AtomicBool::new(true),
            socket: Some(socket.try_clone()?),
        })
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub fn write_frame(&self, frame: &Frame) -> Result<(), FrameError> {
        self.write_frames(std::slice::from_ref(frame))
    }

    /// Writes a batch under a single lock acquisition.
    pub fn write_frames(&self, frames: &[Frame]) -> Result<(), FrameError> {
        let mut writer = self.lock_writer();
        for frame in frames {
            frame.write_to(&mut *writer)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Marks the connection closed and shuts the socket down so a blocked
    /// receive thread wakes with EOF. Idempotent.
    pub fn close(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            if let Some(socket) = &self.socket {
                let _ = socket.shutdown(Shutdown::Both);
            }
        }
    }

    fn lock_writer(&self) -> MutexGuard<'_, Box<dyn Write + Send>> {
        self.writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Blocking receive loop, one per connection. Decodes frames, drives each
/// channel's handshake, splits Message bodies into units, and hands decoded
/// tuples to the inbound queue. Runs until EOF, a socket error, a framing
/// error, or a control-channel Disconnect; always emits `Disconnected` last.
pub(crate) fn run_receive_loop<R: Read>(
    mut stream: R,
    handle: &Arc<ConnectionHandle>,
    inbound: &SwapQueue<InboundEvent>,
) {
    let connection = handle.id();
    let mut channels: HashMap<ChannelId, ChannelState> = HashMap::new();

    loop {
        let frame = match Frame::read_from(&mut stream) {
            Ok(frame) => frame,
            Err(FrameError::Closed) => {
                debug!("connection {}: closed by peer", connection);
                break;
            }
            Err(error) => {
                warn!("connection {}: fatal read error: {}", connection, error);
                break;
            }
        };

        match frame.command {
            MuxCommand::Connect | MuxCommand::Insert => {
                let state = channels
                    .entry(frame.channel_id)
                    .or_insert(ChannelState::Unbound);
                *state = ChannelState::HandshakeAccepted;
                if let Err(error) = handle.write_frame(&Frame::accept(frame.channel_id)) {
                    warn!(
                        "connection {}: failed to accept channel {}: {}",
                        connection, frame.channel_id, error
                    );
                    break;
                }
            }
            MuxCommand::Accept => {
                warn!(
                    "connection {}: unexpected Accept on channel {}",
                    connection, frame.channel_id
                );
            }
            MuxCommand::Disconnect => {
                if frame.channel_id == CONTROL_CHANNEL {
                    info!(
                        "connection {}: control-channel disconnect, closing connection",
                        connection
                    );
                    break;
                }
                if channels.remove(&frame.channel_id).is_some() {
                    inbound.push(InboundEvent::ChannelClosed {
                        connection,
                        channel: frame.channel_id,
                    });
                } else {
                    debug!(
                        "connection {}: disconnect for unknown channel {}",
                        connection, frame.channel_id
                    );
                }
            }
            MuxCommand::Message => {
                let units = match read_messages(&frame.body) {
                    Ok(units) => units,
                    Err(error) => {
                        warn!(
                            "connection {}: truncated message body on channel {}: {}",
                            connection, frame.channel_id, error
                        );
                        break;
                    }
                };

                let Some(state) = channels.get_mut(&frame.channel_id) else {
                    warn!(
                        "connection {}: message on unestablished channel {}",
                        connection, frame.channel_id
                    );
                    continue;
                };

                for unit in units {
                    match *state {
                        ChannelState::Unbound => {
                            warn!(
                                "connection {}: message on unbound channel {}",
                                connection, frame.channel_id
                            );
                        }
                        ChannelState::HandshakeAccepted => {
                            match parse_service_selection(unit.type_id, &unit.payload) {
                                Some(service) => {
                                    *state = ChannelState::Bound(service);
                                    inbound.push(InboundEvent::ChannelBound {
                                        connection,
                                        channel: frame.channel_id,
                                        service,
                                    });
                                }
                                None => {
                                    warn!(
                                        "connection {}: channel {} expected service selection, got type {}",
                                        connection, frame.channel_id, unit.type_id
                                    );
                                }
                            }
                        }
                        ChannelState::Bound(_) => {
                            inbound.push(InboundEvent::Message {
                                connection,
                                channel: frame.channel_id,
                                type_id: unit.type_id,
                                payload: unit.payload,
                            });
                        }
                    }
                }
            }
        }
    }

    handle.close();
    inbound.push(InboundEvent::Disconnected { connection });
}

fn parse_service_selection(type_id: u8, payload: &[u8]) -> Option<ServiceKind> {
    if type_id != CHANNEL_BIND_TYPE_ID || payload.len() != 1 {
        return None;
    }
    ServiceKind::from_u8(payload[0])
}
