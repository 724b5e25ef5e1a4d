use std::fmt;

/// Key of one accepted connection, unique for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Allocates connection ids monotonically. Owned by the accept loop, so no
/// synchronization is needed.
pub struct KeyGenerator {
    next_key: u64,
}

impl KeyGenerator {
    pub fn new() -> Self {
        Self { next_key: 1 }
    }

    pub fn generate(&mut self) -> ConnectionId {
        let key = self.next_key;
        self.next_key += 1;
        ConnectionId(key)
    }
}

impl Default for KeyGenerator {
    fn default() -> Self {
        Self::new()
    }
}
