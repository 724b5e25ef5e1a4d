use std::ops::{BitOr, BitOrAssign};

use crate::types::EntityId;

/// Bitmask of named interest channels. A record carries one of these; a
/// recipient subscribes to a set of them. Delivery is the logical AND of the
/// two, evaluated once per (record, recipient) pair. No field-level
/// redaction happens at this layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct ReplicationPolicy(u32);

impl ReplicationPolicy {
    pub const NONE: Self = Self(0);
    pub const PROXIMITY: Self = Self(1 << 0);
    pub const OWNER: Self = Self(1 << 1);
    pub const PARTY: Self = Self(1 << 2);
    pub const DISCOVERY: Self = Self(1 << 3);
    pub const TRADE: Self = Self(1 << 4);

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// True when at least one of the record's channels is in the recipient's
    /// currently subscribed set.
    pub fn should_deliver(self, subscribed: Self) -> bool {
        self.0 & subscribed.0 != 0
    }
}

impl BitOr for ReplicationPolicy {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ReplicationPolicy {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Area-of-interest collaborator interface: per recipient, the currently
/// subscribed channel set. Maintained elsewhere; consumed read-only here.
pub trait InterestProvider {
    fn subscribed_channels(&self, recipient: EntityId) -> ReplicationPolicy;
}

/// Filters a recipient list down to those whose subscriptions intersect the
/// record's policy.
pub fn filter_recipients(
    policy: ReplicationPolicy,
    recipients: &[EntityId],
    provider: &dyn InterestProvider,
) -> Vec<EntityId> {
    recipients
        .iter()
        .copied()
        .filter(|recipient| policy.should_deliver(provider.subscribed_channels(*recipient)))
        .collect()
}
