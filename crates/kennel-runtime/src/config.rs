//! Environment-variable configuration provider.
//!
//! Every `KENNEL_<KEY>` variable becomes the lowercase config key `<key>`, so
//! `KENNEL_SERVERSFOLDER=/srv/kennel` answers `get("serversfolder")`.

use kennel_core::ConfigProvider;
use std::collections::HashMap;
use tracing::debug;

/// Prefix that marks a variable as daemon configuration.
pub const ENV_PREFIX: &str = "KENNEL_";

/// [`ConfigProvider`] snapshotting `KENNEL_*` variables.
#[derive(Debug, Clone, Default)]
pub struct EnvConfigProvider {
    values: HashMap<String, String>,
}

impl EnvConfigProvider {
    /// Load `.env` from the working directory (if any), then snapshot the
    /// process environment.
    pub fn load() -> Self {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "Loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => debug!(error = %e, "Ignoring unreadable .env"),
        }
        Self::from_vars(std::env::vars())
    }

    /// Build from explicit `(name, value)` pairs. Names without the prefix
    /// are ignored.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let values = vars
            .into_iter()
            .filter_map(|(name, value)| {
                let key = name.as_ref().strip_prefix(ENV_PREFIX)?;
                (!key.is_empty()).then(|| (key.to_ascii_lowercase(), value.into()))
            })
            .collect();
        Self { values }
    }
}

impl ConfigProvider for EnvConfigProvider {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(&key.to_ascii_lowercase()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kennel_core::ports::keys;

    #[test]
    fn test_prefixed_vars_become_lowercase_keys() {
        let config = EnvConfigProvider::from_vars([
            ("KENNEL_SERVERSFOLDER", "/srv/kennel"),
            ("KENNEL_FORWARD", "true"),
            ("PATH", "/usr/bin"),
            ("KENNEL_", "ignored"),
        ]);

        assert_eq!(
            config.get(keys::SERVERS_FOLDER).as_deref(),
            Some("/srv/kennel")
        );
        assert!(config.flag(keys::FORWARD));
        assert_eq!(config.get("path"), None);
        assert_eq!(config.get(""), None);
    }

    #[test]
    fn test_lookup_ignores_key_case() {
        let config = EnvConfigProvider::from_vars([("KENNEL_AuthToken", "secret")]);
        assert_eq!(config.get("AUTHTOKEN").as_deref(), Some("secret"));
    }
}
