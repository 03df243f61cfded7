//! Shell configuration
//!
//! Sources, lowest precedence first:
//! 1. built-in defaults
//! 2. TOML file (`--config PATH`, else `<config dir>/remsh/config.toml`)
//! 3. command-line flags (applied by the binary)
//!
//! ```toml
//! root = "/srv/sandbox"
//! home = "/home/op"
//! history_file = "/home/me/.remsh_history"
//! history_size = 500
//! color = false
//!
//! [aliases]
//! logs = "ls -l /var/log"
//! ```

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::shell::history::DEFAULT_HISTORY_SIZE;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShellConfig {
    /// Host directory served as the remote namespace (default: working directory)
    pub root: Option<PathBuf>,
    /// Remote home directory, the target of `~` and bare `cd`
    pub home: String,
    /// History file; `None` keeps history in memory only
    pub history_file: Option<PathBuf>,
    pub history_size: usize,
    /// Startup file replayed before the first prompt
    pub rc_file: Option<PathBuf>,
    pub color: bool,
    /// Aliases added to the built-in shorthands, replacing any of the same name
    pub aliases: HashMap<String, String>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        let home_dir = dirs::home_dir();
        Self {
            root: None,
            home: "/root".to_string(),
            history_file: home_dir.as_ref().map(|h| h.join(".remsh_history")),
            history_size: DEFAULT_HISTORY_SIZE,
            rc_file: home_dir.as_ref().map(|h| h.join(".remshrc")),
            color: true,
            aliases: HashMap::new(),
        }
    }
}

impl ShellConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// `<config dir>/remsh/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("remsh").join("config.toml"))
    }

    /// Load from `path`, or from the default location when `None`.
    ///
    /// An explicit path must exist. A missing default file yields the
    /// defaults; a malformed file is always an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) if p.is_file() => p,
                _ => return Ok(Self::default()),
            },
        };

        let text = fs::read_to_string(&path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        let config = Self::from_toml(&text)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        log::info!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Sandbox root, falling back to the process working directory.
    pub fn root_dir(&self) -> Result<PathBuf> {
        match &self.root {
            Some(root) => Ok(root.clone()),
            None => env::current_dir().context("cannot determine working directory"),
        }
    }
}
