use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;

use crate::refs::{RefCategory, RefTables};
use crate::types::{MessageTypeId, ReferenceId};

/// Reserved message type id carried by the first unit on a freshly accepted
/// channel: its one-byte payload selects the service the channel binds to.
pub const CHANNEL_BIND_TYPE_ID: MessageTypeId = 0;

/// Protocol namespaces a channel can bind to. Each owns its own message
/// catalog; type ids are only meaningful within one namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    Frontend,
    GameInstance,
    Chat,
}

impl ServiceKind {
    pub fn to_u8(self) -> u8 {
        match self {
            ServiceKind::Frontend => 1,
            ServiceKind::GameInstance => 2,
            ServiceKind::Chat => 3,
        }
    }

    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(ServiceKind::Frontend),
            2 => Some(ServiceKind::GameInstance),
            3 => Some(ServiceKind::Chat),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The protocol was already locked; registration is startup-only.
    #[error("protocol already locked")]
    AlreadyLocked,

    /// Two registrations claimed the same type id in one namespace.
    #[error("type id {type_id} registered twice in {service:?} catalog (existing: {existing})")]
    DuplicateTypeId {
        service: ServiceKind,
        type_id: MessageTypeId,
        existing: &'static str,
    },
}

/// One namespace's `type id <-> logical name` table, both directions O(1).
#[derive(Default)]
pub struct MessageCatalog {
    names_by_id: HashMap<MessageTypeId, &'static str>,
    ids_by_name: HashMap<&'static str, MessageTypeId>,
}

impl MessageCatalog {
    pub fn name_of(&self, type_id: MessageTypeId) -> Option<&'static str> {
        self.names_by_id.get(&type_id).copied()
    }

    pub fn id_of(&self, name: &str) -> Option<MessageTypeId> {
        self.ids_by_name.get(name).copied()
    }

    pub fn contains(&self, type_id: MessageTypeId) -> bool {
        self.names_by_id.contains_key(&type_id)
    }
}

/// Immutable registry of everything both ends must agree on before the first
/// frame: message catalogs per namespace, reference tables per category, and
/// the tick interval. Built once at process start and locked before any
/// connection is accepted; reflection-style runtime lookup is deliberately
/// absent.
pub struct Protocol {
    catalogs: HashMap<ServiceKind, MessageCatalog>,
    ref_tables: RefTables,
    /// The duration between each simulation tick.
    pub tick_interval: Duration,
    locked: bool,
}

impl Default for Protocol {
    fn default() -> Self {
        Self {
            catalogs: HashMap::new(),
            ref_tables: RefTables::new(),
            tick_interval: Duration::from_millis(50),
            locked: false,
        }
    }
}

impl Protocol {
    pub fn builder() -> Self {
        Self::default()
    }

    pub fn add_message(
        &mut self,
        service: ServiceKind,
        type_id: MessageTypeId,
        name: &'static str,
    ) -> &mut Self {
        self.check_lock();
        let catalog = self.catalogs.entry(service).or_default();
        if let Some(existing) = catalog.names_by_id.get(&type_id) {
            panic!(
                "type id {} registered twice in {:?} catalog (existing: {})",
                type_id, service, existing
            );
        }
        catalog.names_by_id.insert(type_id, name);
        catalog.ids_by_name.insert(name, type_id);
        self
    }

    pub fn add_ref_table(
        &mut self,
        category: RefCategory,
        ordered: Vec<ReferenceId>,
    ) -> &mut Self {
        self.check_lock();
        self.ref_tables.insert(category, ordered);
        self
    }

    pub fn tick_interval(&mut self, duration: Duration) -> &mut Self {
        self.check_lock();
        self.tick_interval = duration;
        self
    }

    // Non-panicking registration variants

    pub fn try_add_message(
        &mut self,
        service: ServiceKind,
        type_id: MessageTypeId,
        name: &'static str,
    ) -> Result<&mut Self, ProtocolError> {
        self.try_check_lock()?;
        let catalog = self.catalogs.entry(service).or_default();
        if let Some(existing) = catalog.names_by_id.get(&type_id).copied() {
            return Err(ProtocolError::DuplicateTypeId {
                service,
                type_id,
                existing,
            });
        }
        catalog.names_by_id.insert(type_id, name);
        catalog.ids_by_name.insert(name, type_id);
        Ok(self)
    }

    pub fn try_add_ref_table(
        &mut self,
        category: RefCategory,
        ordered: Vec<ReferenceId>,
    ) -> Result<&mut Self, ProtocolError> {
        self.try_check_lock()?;
        self.ref_tables.insert(category, ordered);
        Ok(self)
    }

    pub fn lock(&mut self) {
        self.check_lock();
        self.locked = true;
    }

    pub fn try_lock(&mut self) -> Result<(), ProtocolError> {
        self.try_check_lock()?;
        self.locked = true;
        Ok(())
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Returns Err if the protocol is locked.
    pub fn try_check_lock(&self) -> Result<(), ProtocolError> {
        if self.locked {
            Err(ProtocolError::AlreadyLocked)
        } else {
            Ok(())
        }
    }

    fn check_lock(&self) {
        if self.locked {
            panic!("Protocol already locked!");
        }
    }

    pub fn catalog(&self, service: ServiceKind) -> Option<&MessageCatalog> {
        self.catalogs.get(&service)
    }

    pub fn ref_tables(&self) -> &RefTables {
        &self.ref_tables
    }

    pub fn build(&mut self) -> Self {
        std::mem::take(self)
    }
}
