//! In-memory environment for exercising programs and install steps without
//! spawning processes.
//!
//! Filesystem calls (`create`, `delete`) touch the real root directory so
//! install operations can be checked against a temp dir; everything process
//! related is simulated and recorded.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::domain::ProgramDefinition;
use crate::ports::{
    ArtifactFetcher, ConsoleListener, ConsoleSnapshot, Environment, EnvironmentError,
    EnvironmentFactory, EnvironmentKind, FetchError, ListenerId, ProcessStats, ProgramStore,
    StoreError, WaitOutcome,
};

/// PID reported while the simulated process is alive.
pub const FAKE_PID: u32 = 4242;

/// Scriptable [`Environment`] double.
pub struct FakeEnvironment {
    root: PathBuf,
    kind: EnvironmentKind,
    running: AtomicBool,
    started: AtomicBool,
    fail_spawn: AtomicBool,
    exit_code: AtomicI32,
    killed: AtomicI32,
    waited: AtomicI32,
    executed: Mutex<Vec<(String, Vec<String>)>>,
    inputs: Mutex<Vec<String>>,
    lines: Mutex<Vec<String>>,
    listeners: Mutex<Vec<(ListenerId, Box<dyn ConsoleListener>)>>,
}

impl FakeEnvironment {
    /// Standard-kind fake rooted at `root`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self::with_kind(root, EnvironmentKind::Standard)
    }

    pub fn with_kind(root: impl AsRef<Path>, kind: EnvironmentKind) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            kind,
            running: AtomicBool::new(false),
            started: AtomicBool::new(false),
            fail_spawn: AtomicBool::new(false),
            exit_code: AtomicI32::new(0),
            killed: AtomicI32::new(0),
            waited: AtomicI32::new(0),
            executed: Mutex::new(Vec::new()),
            inputs: Mutex::new(Vec::new()),
            lines: Mutex::new(Vec::new()),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Make the next spawns fail with `SpawnFailed`.
    pub fn fail_spawns(&self, fail: bool) {
        self.fail_spawn.store(fail, Ordering::SeqCst);
    }

    /// Exit code reported when a wait completes.
    pub fn set_exit_code(&self, code: i32) {
        self.exit_code.store(code, Ordering::SeqCst);
    }

    /// Pretend a process is (or is no longer) alive.
    pub fn set_running(&self, running: bool) {
        if running {
            self.started.store(true, Ordering::SeqCst);
        }
        self.running.store(running, Ordering::SeqCst);
    }

    /// Every spawned command with its arguments, in order.
    pub fn executed(&self) -> Vec<(String, Vec<String>)> {
        lock(&self.executed).clone()
    }

    /// Every line written to the main process.
    pub fn inputs(&self) -> Vec<String> {
        lock(&self.inputs).clone()
    }

    /// Every console line, in order.
    pub fn lines(&self) -> Vec<String> {
        lock(&self.lines).clone()
    }

    /// How many times `kill` found a live process.
    pub fn kill_count(&self) -> i32 {
        self.killed.load(Ordering::SeqCst)
    }

    /// How many waits on the main process were made.
    pub fn wait_count(&self) -> i32 {
        self.waited.load(Ordering::SeqCst)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl Environment for FakeEnvironment {
    fn kind(&self) -> EnvironmentKind {
        self.kind
    }

    fn root_directory(&self) -> &Path {
        &self.root
    }

    async fn create(&self) -> Result<(), EnvironmentError> {
        std::fs::create_dir_all(&self.root).map_err(|e| EnvironmentError::Filesystem {
            path: self.root.clone(),
            reason: e.to_string(),
        })
    }

    async fn delete(&self) -> Result<(), EnvironmentError> {
        match std::fs::remove_dir_all(&self.root) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                Err(EnvironmentError::Filesystem {
                    path: self.root.clone(),
                    reason: e.to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    async fn execute_async(&self, command: &str, args: &[String]) -> Result<(), EnvironmentError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(EnvironmentError::AlreadyRunning { pid: FAKE_PID });
        }
        if self.fail_spawn.load(Ordering::SeqCst) {
            return Err(EnvironmentError::SpawnFailed {
                command: command.to_string(),
                reason: "spawn disabled".to_string(),
            });
        }
        lock(&self.executed).push((command.to_string(), args.to_vec()));
        self.set_running(true);
        Ok(())
    }

    async fn execute_in_main_process(&self, input: &str) -> Result<(), EnvironmentError> {
        if !self.started.load(Ordering::SeqCst) {
            return Err(EnvironmentError::NotStarted);
        }
        if !self.running.load(Ordering::SeqCst) {
            return Err(EnvironmentError::NotRunning);
        }
        lock(&self.inputs).push(input.to_string());
        Ok(())
    }

    async fn kill(&self) -> Result<(), EnvironmentError> {
        if self.running.swap(false, Ordering::SeqCst) {
            self.killed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn pid(&self) -> Option<u32> {
        self.is_running().then_some(FAKE_PID)
    }

    async fn wait_for_main_process_for(
        &self,
        _timeout: Duration,
    ) -> Result<WaitOutcome, EnvironmentError> {
        self.waited.fetch_add(1, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
        Ok(WaitOutcome::Completed {
            exit_code: Some(self.exit_code.load(Ordering::SeqCst)),
        })
    }

    fn console(&self) -> ConsoleSnapshot {
        self.console_from(0)
    }

    fn console_from(&self, epoch: u64) -> ConsoleSnapshot {
        let lines = lock(&self.lines);
        let skip = usize::try_from(epoch).unwrap_or(usize::MAX);
        ConsoleSnapshot {
            lines: lines.iter().skip(skip).cloned().collect(),
            epoch: lines.len() as u64,
        }
    }

    fn add_listener(&self, listener: Box<dyn ConsoleListener>) -> ListenerId {
        let id = ListenerId::next();
        lock(&self.listeners).push((id, listener));
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        lock(&self.listeners).retain(|(existing, _)| *existing != id);
    }

    async fn stats(&self) -> Result<ProcessStats, EnvironmentError> {
        if !self.is_running() {
            return Err(EnvironmentError::NotRunning);
        }
        Ok(ProcessStats {
            memory: 64 * 1024 * 1024,
            cpu: 1.5,
        })
    }

    fn display_to_console(&self, line: &str) {
        lock(&self.lines).push(line.to_string());
        let framed = format!("{line}\n");
        lock(&self.listeners).retain(|(_, l)| l.send(framed.as_bytes()).is_ok());
    }
}

/// [`EnvironmentFactory`] handing out [`FakeEnvironment`]s and remembering them.
#[derive(Default)]
pub struct FakeEnvironmentFactory {
    built: Mutex<Vec<Arc<FakeEnvironment>>>,
}

impl FakeEnvironmentFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recently built environment rooted at `root`.
    pub fn environment_at(&self, root: &Path) -> Option<Arc<FakeEnvironment>> {
        lock(&self.built)
            .iter()
            .rev()
            .find(|env| env.root_directory() == root)
            .cloned()
    }
}

impl EnvironmentFactory for FakeEnvironmentFactory {
    fn build(&self, kind: EnvironmentKind, root: PathBuf) -> Arc<dyn Environment> {
        let env = Arc::new(FakeEnvironment::with_kind(root, kind));
        lock(&self.built).push(Arc::clone(&env));
        env
    }
}

/// [`ProgramStore`] keeping definitions in a map.
#[derive(Default)]
pub struct MemoryProgramStore {
    definitions: Mutex<BTreeMap<String, ProgramDefinition>>,
}

impl MemoryProgramStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `definitions`.
    pub fn with(definitions: impl IntoIterator<Item = (String, ProgramDefinition)>) -> Self {
        Self {
            definitions: Mutex::new(definitions.into_iter().collect()),
        }
    }
}

impl ProgramStore for MemoryProgramStore {
    fn ids(&self) -> Result<Vec<String>, StoreError> {
        Ok(lock(&self.definitions).keys().cloned().collect())
    }

    fn load(&self, id: &str) -> Result<ProgramDefinition, StoreError> {
        lock(&self.definitions)
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn save(&self, id: &str, definition: &ProgramDefinition) -> Result<(), StoreError> {
        lock(&self.definitions).insert(id.to_string(), definition.clone());
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<(), StoreError> {
        lock(&self.definitions).remove(id);
        Ok(())
    }
}

/// [`ArtifactFetcher`] that writes a fixed body for every URL.
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    body: Vec<u8>,
}

impl StaticFetcher {
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self { body: body.into() }
    }
}

#[async_trait]
impl ArtifactFetcher for StaticFetcher {
    async fn fetch(&self, _url: &str, destination: &Path) -> Result<u64, FetchError> {
        tokio::fs::write(destination, &self.body)
            .await
            .map_err(|e| FetchError::Write {
                path: destination.to_path_buf(),
                reason: e.to_string(),
            })?;
        Ok(self.body.len() as u64)
    }
}
