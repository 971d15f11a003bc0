//! Key-value configuration port.
//!
//! Daemon configuration is injected as a provider rather than read from a
//! global, so environments and programs stay independently testable.

use std::collections::HashMap;

/// Well-known configuration keys.
pub mod keys {
    /// Echo workload output to the daemon's own stdout when `"true"`.
    pub const FORWARD: &str = "forward";
    /// Directory holding one root directory per program.
    pub const SERVERS_FOLDER: &str = "serversfolder";
    /// Directory holding the persisted program definitions.
    pub const PROGRAMS_FOLDER: &str = "programsfolder";
    /// Token introspection endpoint of the authorization service.
    pub const INFO_SERVER: &str = "infoserver";
    /// Bearer token the daemon presents to the authorization service.
    pub const AUTH_TOKEN: &str = "authtoken";
    /// Number of console lines retained per environment.
    pub const CONSOLE_BUFFER: &str = "consolebuffer";
}

/// Read-only configuration lookup.
pub trait ConfigProvider: Send + Sync {
    /// Raw value for `key`, if set.
    fn get(&self, key: &str) -> Option<String>;

    /// Interpret `key` as a boolean flag. Only `"true"` (any case) is true.
    fn flag(&self, key: &str) -> bool {
        self.get(key)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    }
}

/// In-memory provider for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticConfig {
    values: HashMap<String, String>,
}

impl StaticConfig {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value, builder style.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl ConfigProvider for StaticConfig {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}
