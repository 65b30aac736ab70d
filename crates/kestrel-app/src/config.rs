use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::paths;
use crate::{Error, Result};

/// Per-agent model binding: which provider/model an agent name resolves to.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AgentModelBinding {
    pub provider: String,
    pub model: String,
    #[serde(default)]
    pub reasoning_effort: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

/// Provider-level settings that are not secrets (secrets live in the OS
/// keyring via `kestrel-auth`; this just remembers whether one was set).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub small_model: Option<String>,
    #[serde(default)]
    pub large_model: Option<String>,
    #[serde(default)]
    pub configured: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Options {
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub debug_lsp: bool,
    #[serde(default)]
    pub skip_permissions_requests: bool,
    #[serde(default)]
    pub compact_mode: bool,
}

/// The on-disk shape of `config.json`, at either layer (global or
/// project-local). Both layers deserialize into this same struct.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub agents: HashMap<String, AgentModelBinding>,
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    #[serde(default)]
    pub options: Options,
    #[serde(default)]
    pub project_initialized: bool,
    #[serde(default)]
    pub lsp: HashMap<String, LspDefinition>,
    #[serde(default)]
    pub mcp: HashMap<String, McpDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LspDefinition {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct McpDefinition {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl ConfigFile {
    fn load_from(path: &Path) -> Result<Option<Self>> {
        match std::fs::read_to_string(path) {
            Ok(raw) => {
                let file: ConfigFile = serde_json::from_str(&raw)?;
                Ok(Some(file))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Io(e)),
        }
    }

    /// Merge `other` (project-local) on top of `self` (global): project wins
    /// field-by-field; map entries from the project layer override the same
    /// key in the global layer; collections the project layer doesn't
    /// mention are inherited from global unchanged.
    fn merge_project_over(mut self, other: ConfigFile) -> Self {
        for (k, v) in other.agents {
            self.agents.insert(k, v);
        }
        for (k, v) in other.providers {
            self.providers.insert(k, v);
        }
        for (k, v) in other.lsp {
            self.lsp.insert(k, v);
        }
        for (k, v) in other.mcp {
            self.mcp.insert(k, v);
        }
        if other.options.debug {
            self.options.debug = true;
        }
        if other.options.debug_lsp {
            self.options.debug_lsp = true;
        }
        if other.options.skip_permissions_requests {
            self.options.skip_permissions_requests = true;
        }
        self.options.compact_mode = other.options.compact_mode || self.options.compact_mode;
        self.project_initialized = other.project_initialized || self.project_initialized;
        self
    }
}

/// Process-wide, mostly-immutable configuration. Constructed once per
/// process via [`Config::load`]; dynamic setters mutate the in-memory copy
/// and persist the change to the global config file.
#[derive(Debug, Clone)]
pub struct Config {
    pub cwd: PathBuf,
    pub data_directory: PathBuf,
    file: ConfigFile,
    project_config_path: Option<PathBuf>,
}

impl Config {
    /// Load layered config for a workspace rooted at `cwd`. `cli_debug`
    /// forces debug mode on regardless of what's on disk (the `-d` flag
    /// always wins over a persisted value).
    pub fn load(cwd: impl Into<PathBuf>, cli_debug: bool, cli_yolo: bool) -> Result<Self> {
        let cwd = cwd.into();
        let global_path = paths::global_config_path()?;
        let global = ConfigFile::load_from(&global_path)?.unwrap_or_default();

        let project_path = paths::project_config_path(&cwd);
        let merged = match ConfigFile::load_from(&project_path)? {
            Some(project) => global.merge_project_over(project),
            None => global,
        };

        let mut config = Self {
            cwd,
            data_directory: paths::ensure_user_data_dir()?,
            file: merged,
            project_config_path: Some(project_path),
        };

        if cli_debug {
            config.file.options.debug = true;
        }
        if cli_yolo {
            config.file.options.skip_permissions_requests = true;
        }

        Ok(config)
    }

    pub fn options(&self) -> &Options {
        &self.file.options
    }

    pub fn yolo_mode(&self) -> bool {
        self.file.options.skip_permissions_requests
    }

    /// Resolve the `(provider, model)` binding for a named agent, e.g.
    /// `"main"` or `"sub_agent"`.
    pub fn model_for(&self, agent_id: &str) -> Option<&AgentModelBinding> {
        self.file.agents.get(agent_id)
    }

    pub fn provider_config(&self, provider_id: &str) -> Option<&ProviderConfig> {
        self.file.providers.get(provider_id)
    }

    pub fn lsp_definitions(&self) -> &HashMap<String, LspDefinition> {
        &self.file.lsp
    }

    pub fn mcp_definitions(&self) -> &HashMap<String, McpDefinition> {
        &self.file.mcp
    }

    // -- Dynamic setters: persist to the global config file -----------------

    pub fn set_provider_configured(&mut self, provider_id: &str, configured: bool) -> Result<()> {
        self.file
            .providers
            .entry(provider_id.to_string())
            .or_default()
            .configured = configured;
        self.persist_global()
    }

    pub fn update_preferred_model(&mut self, agent_id: &str, binding: AgentModelBinding) -> Result<()> {
        self.file.agents.insert(agent_id.to_string(), binding);
        self.persist_global()
    }

    pub fn set_compact_mode(&mut self, compact: bool) -> Result<()> {
        self.file.options.compact_mode = compact;
        self.persist_global()
    }

    pub fn mark_project_initialized(&mut self) -> Result<()> {
        self.file.project_initialized = true;
        self.persist_global()
    }

    fn persist_global(&self) -> Result<()> {
        let dir = paths::ensure_user_config_dir()?;
        let path = dir.join("config.json");
        let serialized = serde_json::to_string_pretty(&self.file)?;
        std::fs::write(path, serialized)?;
        Ok(())
    }

    /// Best-effort path to the project-local config file for this run, if
    /// the workspace has/should have one.
    pub fn project_config_path(&self) -> Option<&Path> {
        self.project_config_path.as_deref()
    }
}
