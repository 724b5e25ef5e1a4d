/// Runtime id of a game entity, unique within a game instance.
pub type EntityId = u64;

/// Logical 64-bit identifier of a data-driven prototype, asset, or property.
/// Never sent raw on the wire; transmitted as its index in a category-scoped
/// reference table.
pub type ReferenceId = u64;

/// Id of one logical mux channel within a connection.
pub type ChannelId = u16;

/// Message type id, scoped to the bound service's catalog.
pub type MessageTypeId = u8;
