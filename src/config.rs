//! Validator settings.
//!
//! Every field has a default, so an absent or partial TOML file is fine.
//! Paths are relative to the project root.

use crate::error::FatalError;
use crate::lexical::DEFAULT_INDENT;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name looked up in the tools directory when no `--config` is given.
pub const CONFIG_FILE_NAME: &str = "modeguard.toml";

/// Placeholder substituted into probe templates.
pub const CATEGORY_PLACEHOLDER: &str = "{category}";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Indentation unit enforced by the lexical stage.
    pub indent: usize,
    /// Name of the mode configuration file at the project root.
    pub config_file_name: String,
    /// Directory holding the schema, baseline, and linter configs.
    pub tools_dir: PathBuf,
    /// Rules tree containing one companion directory per mode.
    pub rules_dir: PathBuf,
    /// Companion directory name is this prefix followed by the mode slug.
    pub companion_prefix: String,
    pub memory_glob: String,
    pub memory_file: String,
    pub forbidden_memory_names: Vec<String>,
    pub workflow_file: String,
    pub workflow_marker: String,
    /// Lifecycle markers every mode's instructions must contain, in order.
    pub required_markers: Vec<String>,
    /// Candidate path shapes probed per baseline category.
    pub probe_templates: Vec<String>,
    /// Concrete paths probed in addition to the templates.
    pub probe_paths: Vec<String>,
    /// Where `--summary` writes the JSON and Markdown snapshots.
    pub reports_dir: PathBuf,
    pub handoff_dir: PathBuf,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        ValidatorConfig {
            indent: DEFAULT_INDENT,
            config_file_name: ".roomodes".to_string(),
            tools_dir: PathBuf::from(".roo/mode-tools"),
            rules_dir: PathBuf::from(".roo/rules"),
            companion_prefix: "rules-".to_string(),
            memory_glob: "40-memory-*.md".to_string(),
            memory_file: "40-memory-io.md".to_string(),
            forbidden_memory_names: vec![
                "40-memory-integration.md".to_string(),
                "40-memory-reads.md".to_string(),
            ],
            workflow_file: "10-workflow.md".to_string(),
            workflow_marker: "Memory Consultation".to_string(),
            required_markers: [
                "MANDATORY MEMORY PROTOCOL",
                "PRE-FLIGHT:",
                "POST-FLIGHT:",
                "memory:search_nodes",
                "Write: Observation envelope",
                "Link: Relations",
                "Confirm: List entity IDs",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            probe_templates: vec![
                format!("src/{CATEGORY_PLACEHOLDER}/file.ts"),
                format!("lib/{CATEGORY_PLACEHOLDER}-service.ts"),
            ],
            probe_paths: Vec::new(),
            reports_dir: PathBuf::from(".roo/reports"),
            handoff_dir: PathBuf::from(".roo/handoff"),
        }
    }
}

impl ValidatorConfig {
    pub fn from_toml_str(s: &str, origin: &Path) -> Result<Self, FatalError> {
        toml::from_str(s).map_err(|e| FatalError::Config {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn load_from(path: &Path) -> Result<Self, FatalError> {
        let s = std::fs::read_to_string(path).map_err(|e| FatalError::io(path, e))?;
        Self::from_toml_str(&s, path)
    }

    /// Load `path` if given, else `<root>/<tools_dir>/modeguard.toml` if it
    /// exists, else the defaults.
    pub fn discover(root: &Path, path: Option<&Path>) -> Result<Self, FatalError> {
        if let Some(path) = path {
            return Self::load_from(path);
        }
        let conventional = root.join(Self::default().tools_dir).join(CONFIG_FILE_NAME);
        if conventional.is_file() {
            tracing::debug!(path = %conventional.display(), "loading validator config");
            Self::load_from(&conventional)
        } else {
            Ok(Self::default())
        }
    }

    pub fn tools_path(&self, root: &Path) -> PathBuf {
        root.join(&self.tools_dir)
    }

    pub fn rules_path(&self, root: &Path) -> PathBuf {
        root.join(&self.rules_dir)
    }

    pub fn reports_path(&self, root: &Path) -> PathBuf {
        root.join(&self.reports_dir)
    }

    pub fn handoff_path(&self, root: &Path) -> PathBuf {
        root.join(&self.handoff_dir)
    }

    pub fn companion_dir_name(&self, slug: &str) -> String {
        format!("{}{}", self.companion_prefix, slug)
    }
}
