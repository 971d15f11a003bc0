//! CLI bootstrap - the composition root.
//!
//! This module is the ONLY place where infrastructure is wired together
//! for the CLI adapter:
//! - Configuration (via `EnvConfigProvider`)
//! - Program store and artifact fetcher (via kennel-runtime)
//! - Environment factory (via kennel-runtime)
//! - Program registry (via kennel-core)

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use kennel_core::ports::keys;
use kennel_core::{
    ConfigProvider, EnvironmentFactory, ProgramPorts, ProgramRegistry, ProgramStore,
    TokenIntrospector,
};
use kennel_runtime::{
    EnvConfigProvider, FileProgramStore, HttpFetcher, HttpTokenIntrospector,
    RuntimeEnvironmentFactory,
};
use tracing::{debug, info};

use crate::parser::Cli;

/// Default location of program roots, relative to the working directory.
pub const DEFAULT_SERVERS_DIR: &str = "servers";

/// Default location of definition documents, relative to the working directory.
pub const DEFAULT_PROGRAMS_DIR: &str = "programs";

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    /// Parent of every program root.
    pub servers_dir: PathBuf,
    /// Where definition documents are stored.
    pub programs_dir: PathBuf,
}

impl CliConfig {
    /// Resolve directories: command-line flags first, then configuration,
    /// then the defaults.
    pub fn resolve(cli: &Cli, config: &dyn ConfigProvider) -> Self {
        let pick = |flag: &Option<PathBuf>, key: &str, default: &str| {
            flag.clone()
                .or_else(|| config.get(key).map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from(default))
        };
        Self {
            servers_dir: pick(&cli.servers_dir, keys::SERVERS_FOLDER, DEFAULT_SERVERS_DIR),
            programs_dir: pick(&cli.programs_dir, keys::PROGRAMS_FOLDER, DEFAULT_PROGRAMS_DIR),
        }
    }
}

/// Fully composed application context for CLI commands.
pub struct CliContext {
    /// Every managed program.
    pub registry: ProgramRegistry,
    /// Token checks for remote front ends; `None` without `infoserver` and
    /// `authtoken`.
    pub introspector: Option<Arc<dyn TokenIntrospector>>,
    /// Resolved directories.
    pub config: CliConfig,
}

impl CliContext {
    /// Access the program registry.
    pub const fn registry(&self) -> &ProgramRegistry {
        &self.registry
    }
}

/// Wire a context around an already-built factory and store.
pub fn compose(
    config: CliConfig,
    factory: Arc<dyn EnvironmentFactory>,
    store: Arc<dyn ProgramStore>,
    introspector: Option<Arc<dyn TokenIntrospector>>,
) -> Result<CliContext> {
    let ports = ProgramPorts::new(store, Arc::new(HttpFetcher::new()));
    let registry = ProgramRegistry::new(config.servers_dir.clone(), factory, ports);
    let loaded = registry
        .load_all()
        .context("Failed to load program definitions")?;
    debug!(count = loaded, servers_dir = %config.servers_dir.display(), "Registry ready");

    Ok(CliContext {
        registry,
        introspector,
        config,
    })
}

/// Bootstrap the CLI application.
///
/// Loads configuration from the environment (and `.env`), builds the runtime
/// adapters and loads every stored program into the registry.
pub fn bootstrap(cli: &Cli) -> Result<CliContext> {
    let provider = EnvConfigProvider::load();
    let config = CliConfig::resolve(cli, &provider);

    let factory = Arc::new(RuntimeEnvironmentFactory::from_config(&provider));
    let store = Arc::new(FileProgramStore::new(config.programs_dir.clone()));
    let introspector = HttpTokenIntrospector::from_config(&provider)
        .map(|i| Arc::new(i) as Arc<dyn TokenIntrospector>);
    if introspector.is_some() {
        info!("Token introspection configured");
    }

    compose(config, factory, store, introspector)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use kennel_core::StaticConfig;
    use kennel_core::testing::{FakeEnvironmentFactory, MemoryProgramStore};
    use kennel_core::{ProgramDefinition, RunSpec};

    #[test]
    fn test_flags_override_configuration() {
        let cli = Cli::parse_from(["kenneld", "--servers-dir", "/flag/servers", "list"]);
        let config = StaticConfig::new()
            .with(keys::SERVERS_FOLDER, "/conf/servers")
            .with(keys::PROGRAMS_FOLDER, "/conf/programs");

        let resolved = CliConfig::resolve(&cli, &config);

        assert_eq!(resolved.servers_dir, PathBuf::from("/flag/servers"));
        assert_eq!(resolved.programs_dir, PathBuf::from("/conf/programs"));
    }

    #[test]
    fn test_defaults_without_configuration() {
        let cli = Cli {
            servers_dir: None,
            programs_dir: None,
            verbose: false,
            command: None,
        };
        let resolved = CliConfig::resolve(&cli, &StaticConfig::new());
        assert_eq!(resolved.servers_dir, PathBuf::from(DEFAULT_SERVERS_DIR));
        assert_eq!(resolved.programs_dir, PathBuf::from(DEFAULT_PROGRAMS_DIR));
    }

    #[test]
    fn test_compose_loads_stored_programs() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryProgramStore::with([(
            "alpha".to_string(),
            ProgramDefinition {
                run: RunSpec {
                    program: "true".to_string(),
                    ..RunSpec::default()
                },
                ..ProgramDefinition::default()
            },
        )]);
        let config = CliConfig {
            servers_dir: dir.path().join("servers"),
            programs_dir: dir.path().join("programs"),
        };

        let ctx = compose(
            config,
            Arc::new(FakeEnvironmentFactory::new()),
            Arc::new(store),
            None,
        )
        .unwrap();

        assert_eq!(ctx.registry().ids(), vec!["alpha"]);
        assert!(ctx.introspector.is_none());
    }
}
