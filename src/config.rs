use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::hooks::{AbortPolicy, HookCondition, HookKind, HookRegistry, HookTarget};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default = "default_lifecycles")]
    pub lifecycles: Vec<LifecycleConfig>,
}

/// Configuration for log output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    "lifecycle_hooks=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

/// A lifecycle declared in the config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleConfig {
    pub name: String,
    #[serde(default)]
    pub abort_policy: AbortPolicy,
    #[serde(default)]
    pub hooks: Vec<HookConfig>,
}

/// A late-bound hook declared in the config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookConfig {
    pub kind: HookKind,
    /// Symbol resolved against the running variant
    pub callback: String,
    /// Only run when this named check holds
    #[serde(default, rename = "if", skip_serializing_if = "Option::is_none")]
    pub if_check: Option<String>,
    /// Only run when this named check does not hold
    #[serde(default, rename = "unless", skip_serializing_if = "Option::is_none")]
    pub unless_check: Option<String>,
}

impl HookConfig {
    pub fn new(kind: HookKind, callback: &str) -> Self {
        Self {
            kind,
            callback: callback.to_string(),
            if_check: None,
            unless_check: None,
        }
    }

    fn condition(&self) -> Result<Option<HookCondition>> {
        match (&self.if_check, &self.unless_check) {
            (None, None) => Ok(None),
            (Some(check), None) => Ok(Some(HookCondition::if_named(check.as_str()))),
            (None, Some(check)) => Ok(Some(HookCondition::unless_named(check.as_str()))),
            (Some(_), Some(_)) => Err(anyhow::anyhow!(
                "Hook '{}' sets both `if` and `unless`",
                self.callback
            )),
        }
    }
}

/// The `execute` lifecycle: validate first, sync afterwards
fn default_lifecycles() -> Vec<LifecycleConfig> {
    vec![LifecycleConfig {
        name: "execute".to_string(),
        abort_policy: AbortPolicy::SkipAfterOnAbort,
        hooks: vec![
            HookConfig::new(HookKind::Before, "valid?"),
            HookConfig::new(HookKind::After, "sync_method"),
        ],
    }]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            lifecycles: default_lifecycles(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, self.to_toml()?)?;

        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;
        Ok(config_dir.join("lifecycle-hooks").join("config.toml"))
    }

    /// Register every declared lifecycle and hook on a fresh registry
    pub fn build_registry(&self) -> Result<HookRegistry> {
        let mut registry = HookRegistry::new();

        for lifecycle in &self.lifecycles {
            registry.define_lifecycle(&lifecycle.name, lifecycle.abort_policy)?;

            for hook in &lifecycle.hooks {
                let target = HookTarget::named(hook.callback.as_str());
                match hook.condition()? {
                    Some(condition) => {
                        registry.add_hook_if(&lifecycle.name, hook.kind, target, condition)?
                    }
                    None => registry.add_hook(&lifecycle.name, hook.kind, target)?,
                }
            }
        }

        Ok(registry)
    }
}
