use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use log::{info, warn};

use riftgate_shared::{write_messages, ChannelId, Frame, Protocol, ServiceKind};

use crate::connection::{run_receive_loop, ConnectionHandle};
use crate::events::{InboundEvent, ServerEvent};
use crate::key_generator::{ConnectionId, KeyGenerator};
use crate::queue::SwapQueue;
use crate::service::Service;

/// The transport server. Accept and receive loops run on their own OS
/// threads; dispatch, services, and outbound flushing all happen on whichever
/// single thread calls [`Server::tick`].
pub struct Server {
    protocol: Arc<Protocol>,
    inbound: Arc<SwapQueue<InboundEvent>>,
    current: Vec<InboundEvent>,
    services: HashMap<ServiceKind, Box<dyn Service>>,
    connections: HashMap<ConnectionId, Arc<ConnectionHandle>>,
    dispatch: HashMap<(ConnectionId, ChannelId), ServiceKind>,
    outbound: HashMap<ConnectionId, Vec<Frame>>,
}

impl Server {
    /// Requires a locked protocol: catalogs and reference tables must be
    /// complete before the first connection is accepted.
    pub fn new(protocol: Protocol) -> Self {
        if !protocol.is_locked() {
            panic!("Protocol must be locked before creating a Server!");
        }
        Self {
            protocol: Arc::new(protocol),
            inbound: Arc::new(SwapQueue::new()),
            current: Vec::new(),
            services: HashMap::new(),
            connections: HashMap::new(),
            dispatch: HashMap::new(),
            outbound: HashMap::new(),
        }
    }

    pub fn protocol(&self) -> &Arc<Protocol> {
        &self.protocol
    }

    /// Queue shared with accept/receive threads. Exposed so embedders can
    /// drive connections from their own transports.
    pub fn inbound_queue(&self) -> Arc<SwapQueue<InboundEvent>> {
        self.inbound.clone()
    }

    pub fn register_service(&mut self, service: Box<dyn Service>) {
        let kind = service.kind();
        if self.services.insert(kind, service).is_some() {
            panic!("Service for {:?} registered twice!", kind);
        }
    }

    /// Spawns the accept loop: one receive thread per accepted connection.
    pub fn listen(&mut self, listener: TcpListener) {
        let inbound = self.inbound.clone();
        thread::spawn(move || {
            let mut keys = KeyGenerator::new();
            for stream in listener.incoming() {
                let stream = match stream {
                    Ok(stream) => stream,
                    Err(error) => {
                        warn!("accept failed: {}", error);
                        continue;
                    }
                };
                let id = keys.generate();
                let handle = match ConnectionHandle::from_socket(id, &stream) {
                    Ok(handle) => Arc::new(handle),
                    Err(error) => {
                        warn!("connection {}: failed to clone socket: {}", id, error);
                        continue;
                    }
                };

                info!("connection {}: accepted", id);
                inbound.push(InboundEvent::Connected {
                    handle: handle.clone(),
                });

                let inbound = inbound.clone();
                let spawned = thread::Builder::new()
                    .name(format!("riftgate-recv-{}", id))
                    .spawn(move || run_receive_loop(stream, &handle, &inbound));
                if let Err(error) = spawned {
                    warn!("connection {}: failed to spawn receive thread: {}", id, error);
                }
            }
        });
    }

    /// One simulation tick: a single pending/current swap, a lock-free drain
    /// in arrival order, then a per-connection flush of everything produced.
    pub fn tick(&mut self) -> Vec<ServerEvent> {
        let mut events = Vec::new();

        let mut current = std::mem::take(&mut self.current);
        self.inbound.swap(&mut current);

        for event in current.drain(..) {
            match event {
                InboundEvent::Connected { handle } => {
                    let connection = handle.id();
                    self.connections.insert(connection, handle);
                    events.push(ServerEvent::Connected(connection));
                }
                InboundEvent::ChannelBound {
                    connection,
                    channel,
                    service,
                } => {
                    self.dispatch.insert((connection, channel), service);
                    events.push(ServerEvent::ChannelBound {
                        connection,
                        channel,
                        service,
                    });
                }
                InboundEvent::ChannelClosed {
                    connection,
                    channel,
                } => {
                    self.dispatch.remove(&(connection, channel));
                }
                InboundEvent::Message {
                    connection,
                    channel,
                    type_id,
                    payload,
                } => {
                    self.dispatch_message(connection, channel, type_id, &payload);
                }
                InboundEvent::Disconnected { connection } => {
                    self.teardown(connection);
                    events.push(ServerEvent::Disconnected(connection));
                }
            }
        }
        self.current = current;

        self.flush_outbound();
        events
    }

    /// Blocking tick loop at the protocol's fixed tick rate.
    pub fn run(&mut self) {
        let interval = self.protocol.tick_interval;
        loop {
            let started = Instant::now();
            self.tick();
            if let Some(remaining) = interval.checked_sub(started.elapsed()) {
                thread::sleep(remaining);
            }
        }
    }

    fn dispatch_message(
        &mut self,
        connection: ConnectionId,
        channel: ChannelId,
        type_id: u8,
        payload: &[u8],
    ) {
        let Some(kind) = self.dispatch.get(&(connection, channel)).copied() else {
            warn!(
                "connection {}: message for unbound channel {}",
                connection, channel
            );
            return;
        };

        // unmapped type id is recoverable: the unit was already length-skipped
        let known = self
            .protocol
            .catalog(kind)
            .map(|catalog| catalog.contains(type_id))
            .unwrap_or(false);
        if !known {
            warn!(
                "connection {}: unknown message type {} for {:?}, skipping",
                connection, type_id, kind
            );
            return;
        }

        let Some(service) = self.services.get_mut(&kind) else {
            warn!("no service registered for {:?}", kind);
            return;
        };

        let replies = service.handle_message(connection, channel, type_id, payload);
        if !replies.is_empty() {
            self.outbound
                .entry(connection)
                .or_default()
                .push(Frame::message(channel, write_messages(&replies)));
        }
    }

    /// Drops dispatch entries and queued-but-unflushed outbound frames for a
    /// connection that went away.
    fn teardown(&mut self, connection: ConnectionId) {
        if let Some(handle) = self.connections.remove(&connection) {
            handle.close();
        }
        self.dispatch
            .retain(|(dispatch_connection, _), _| *dispatch_connection != connection);
        self.outbound.remove(&connection);
        info!("connection {}: torn down", connection);
    }

    fn flush_outbound(&mut self) {
        for (connection, frames) in self.outbound.drain() {
            let Some(handle) = self.connections.get(&connection) else {
                continue;
            };
            if let Err(error) = handle.write_frames(&frames) {
                warn!("connection {}: flush failed: {}", connection, error);
                handle.close();
            }
        }
    }
}
