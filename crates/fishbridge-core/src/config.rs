//! Bridge configuration, loaded from TOML.
//!
//! ```toml
//! engine_name = "fishbridge"
//! ponderhit_when_idle = "reject"
//! default_depth = 8
//! book_path = "books/performance.bin"
//!
//! [options]
//! Hash = 64
//! OwnBook = true
//! ```

use crate::engine::material::DEFAULT_DEPTH;
use crate::error::{BridgeError, BridgeResult};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// What `ponderhit` does while no ponder search is running
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PonderhitWhenIdle {
    /// Silently do nothing
    #[default]
    Ignore,
    /// Fail with `NotPondering`
    Reject,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Name reported by `info()`
    pub engine_name: String,

    pub ponderhit_when_idle: PonderhitWhenIdle,

    /// Depth the built-in engine searches when `go` carries no limit at all
    pub default_depth: u32,

    /// Polyglot book, overriding the `Book File` option
    pub book_path: Option<PathBuf>,

    /// Option values applied at construction, keyed by option name
    pub options: BTreeMap<String, toml::Value>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            engine_name: "fishbridge".to_string(),
            ponderhit_when_idle: PonderhitWhenIdle::default(),
            default_depth: DEFAULT_DEPTH,
            book_path: None,
            options: BTreeMap::new(),
        }
    }
}

impl BridgeConfig {
    pub fn from_toml_str(text: &str) -> BridgeResult<Self> {
        let config: BridgeConfig =
            toml::from_str(text).map_err(|e| BridgeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> BridgeResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::Config(format!("{}: {e}", path.display())))?;
        let config = Self::from_toml_str(&text)?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    fn validate(&self) -> BridgeResult<()> {
        if self.default_depth == 0 {
            return Err(BridgeError::Config(
                "default_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Option overrides rendered as the text the registry expects
    pub fn option_values(&self) -> impl Iterator<Item = (&str, String)> {
        self.options.iter().map(|(name, value)| {
            let text = match value {
                toml::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (name.as_str(), text)
        })
    }
}
