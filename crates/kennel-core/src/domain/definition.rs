//! Persisted program definitions.
//!
//! On disk a definition is a JSON document with a single `kennel` root key:
//!
//! ```json
//! {
//!   "kennel": {
//!     "data":    { "port": { "value": 25565, "type": "integer" } },
//!     "install": { "commands": [ { "type": "writefile", "target": "eula.txt", "text": "eula=true" } ] },
//!     "run":     { "stop": "stop", "program": "java", "arguments": ["-jar", "server.jar"] }
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use super::parameter::{ProgramData, resolved_values};
use crate::ports::EnvironmentKind;

/// Root key every definition document is namespaced under.
pub const DOCUMENT_ROOT_KEY: &str = "kennel";

/// Mode for saved definition files: owner and group read-write.
pub const DEFINITION_FILE_MODE: u32 = 0o664;

/// How the workload process is invoked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSpec {
    /// Console input that asks the workload to shut down.
    #[serde(default)]
    pub stop: String,

    /// Command lines run before the install steps.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pre: Vec<String>,

    /// Command lines run after the install steps succeed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub post: Vec<String>,

    /// Binary to execute.
    pub program: String,

    /// Argument template; `%name%` placeholders are filled from program data.
    #[serde(default)]
    pub arguments: Vec<String>,

    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub autostart: bool,
}

/// One declarative provisioning step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OperationSpec {
    /// Write literal text to a file under the root.
    WriteFile { target: String, text: String },
    /// Create a directory tree under the root.
    Mkdir { target: String },
    /// Rename a path under the root.
    Move { source: String, target: String },
    /// Run command lines in the environment, in order.
    Command { commands: Vec<String> },
    /// Download URLs into the root.
    Download { files: Vec<String> },
}

/// Ordered install steps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallSection {
    #[serde(default)]
    pub commands: Vec<OperationSpec>,
}

/// Environment selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentSpec {
    #[serde(rename = "type", default)]
    pub kind: EnvironmentKind,
}

/// Everything persisted about a program.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgramDefinition {
    #[serde(default)]
    pub data: ProgramData,

    #[serde(default)]
    pub install: InstallSection,

    pub run: RunSpec,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<EnvironmentSpec>,
}

#[derive(Serialize)]
struct DocumentRef<'a> {
    kennel: &'a ProgramDefinition,
}

#[derive(Deserialize)]
struct Document {
    kennel: ProgramDefinition,
}

impl ProgramDefinition {
    /// Environment variant this program wants; standard when unspecified.
    pub fn environment_kind(&self) -> EnvironmentKind {
        self.environment.map(|e| e.kind).unwrap_or_default()
    }

    /// Text value of every parameter, for `%name%` substitution.
    pub fn resolved_values(&self) -> BTreeMap<String, String> {
        resolved_values(&self.data)
    }

    /// Parse a `{"kennel": {...}}` document.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<Document>(json).map(|doc| doc.kennel)
    }

    /// Render the namespaced document as indented JSON.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&DocumentRef { kennel: self })
    }

    /// Read a definition file.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json).map_err(std::io::Error::other)
    }

    /// Write the namespaced document to `path` with mode 0664.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let json = self.to_json_pretty().map_err(std::io::Error::other)?;

        let mut options = OpenOptions::new();
        options.create(true).write(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(DEFINITION_FILE_MODE);
        }

        let mut file = options.open(path)?;
        file.write_all(json.as_bytes())?;

        // `mode` only applies on creation; fix up files that already existed.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(DEFINITION_FILE_MODE))?;
        }
        Ok(())
    }
}
