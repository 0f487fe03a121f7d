use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing;

#[derive(Debug, Clone, Deserialize)]
pub struct CoreConfig {
    #[serde(default)]
    pub system: SystemConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logbook: LogbookConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

impl CoreConfig {
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join("config.toml");
        let mut cfg = if path.exists() {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            toml::from_str::<CoreConfig>(&text)
                .with_context(|| format!("parsing config file {}", path.display()))?
        } else {
            tracing::info!(
                "No config file found at {}. Using CoreConfig::default().",
                path.display()
            );
            CoreConfig::default()
        };
        cfg.resolve_paths(root);
        Ok(cfg)
    }

    fn resolve_paths(&mut self, root: &Path) {
        self.session.sessions_path = absolutize(root, &self.session.sessions_path);
        self.session.dom_saves_path = absolutize(root, &self.session.dom_saves_path);
        self.logbook.path = absolutize(root, &self.logbook.path);
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            system: SystemConfig::default(),
            session: SessionConfig::default(),
            logbook: LogbookConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    #[serde(default = "SystemConfig::default_name")]
    pub name: String,
    #[serde(default = "SystemConfig::default_version")]
    pub version: String,
}

impl SystemConfig {
    fn default_name() -> String {
        "olo".to_string()
    }

    fn default_version() -> String {
        "0.1.0".to_string()
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            name: Self::default_name(),
            version: Self::default_version(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Where stamp and project JSON files live.
    #[serde(default = "SessionConfig::default_sessions_path")]
    pub sessions_path: PathBuf,
    /// Saved DOM captures scanned by search.
    #[serde(default = "SessionConfig::default_dom_saves_path")]
    pub dom_saves_path: PathBuf,
}

impl SessionConfig {
    fn default_sessions_path() -> PathBuf {
        PathBuf::from("sessions")
    }

    fn default_dom_saves_path() -> PathBuf {
        PathBuf::from("sessions/dom-saves")
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sessions_path: Self::default_sessions_path(),
            dom_saves_path: Self::default_dom_saves_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogbookConfig {
    /// Directory holding `logbook.jsonl`.
    #[serde(default = "LogbookConfig::default_path")]
    pub path: PathBuf,
}

impl LogbookConfig {
    fn default_path() -> PathBuf {
        PathBuf::from(".")
    }
}

impl Default for LogbookConfig {
    fn default() -> Self {
        Self {
            path: Self::default_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Context characters on each side of a DOM-capture match.
    #[serde(default = "SearchConfig::default_dom_context_chars")]
    pub dom_context_chars: usize,
}

impl SearchConfig {
    fn default_dom_context_chars() -> usize {
        60
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            dom_context_chars: Self::default_dom_context_chars(),
        }
    }
}

fn absolutize(root: &Path, value: &Path) -> PathBuf {
    if value.is_absolute() {
        value.to_path_buf()
    } else {
        root.join(value)
    }
}
