//! moviefs configuration.
//!
//! Loaded from `~/.config/moviefs/config.toml` when present. Every key is
//! optional; command-line flags override whatever the file says.
//!
//! ```toml
//! database = "~/.local/share/moviefs/movies.db"
//! path_base = "/srv/media/movies"
//! runtime_bucket = 15
//! facets = ["title", "actor", "year"]
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use moviefs_kernel::{DEFAULT_RUNTIME_BUCKET, FsOptions, STANDARD_FACETS};

/// Default location of the config file.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("moviefs").join("config.toml"))
}

/// Default location of the catalog database.
pub fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("moviefs")
        .join("movies.db")
}

fn expand(path: &Path) -> PathBuf {
    shellexpand::tilde(&path.to_string_lossy()).as_ref().into()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MovieFsConfig {
    /// SQLite catalog.
    pub database: PathBuf,
    /// Root of the real media library. Stored item paths are relative to it.
    pub path_base: PathBuf,
    /// Width of a `runtime/` bucket in minutes.
    pub runtime_bucket: u32,
    /// Facets to register, in order. All of them when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facets: Option<Vec<String>>,
}

impl Default for MovieFsConfig {
    fn default() -> Self {
        Self {
            database: default_database_path(),
            path_base: PathBuf::from("."),
            runtime_bucket: DEFAULT_RUNTIME_BUCKET,
            facets: None,
        }
    }
}

impl MovieFsConfig {
    /// Parse and validate TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(text).context("invalid config")?;
        config.database = expand(&config.database);
        config.path_base = expand(&config.path_base);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration.
    ///
    /// An explicitly given file must exist. The default file is optional and
    /// defaults apply when it is absent.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let (path, required) = match explicit {
            Some(path) => (Some(expand(path)), true),
            None => (default_config_path(), false),
        };
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !required && !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = Self::from_toml(&text)
            .with_context(|| format!("in config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Apply command-line overrides.
    pub fn with_overrides(mut self, database: Option<&Path>, path_base: Option<&Path>) -> Self {
        if let Some(database) = database {
            self.database = expand(database);
        }
        if let Some(path_base) = path_base {
            self.path_base = expand(path_base);
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.runtime_bucket == 0 {
            bail!("runtime_bucket must be greater than zero");
        }
        if let Some(facets) = &self.facets {
            for (i, name) in facets.iter().enumerate() {
                if !STANDARD_FACETS.contains(&name.as_str()) {
                    bail!(
                        "unknown facet {name:?} (known: {})",
                        STANDARD_FACETS.join(", ")
                    );
                }
                if facets[..i].contains(name) {
                    bail!("facet {name:?} listed twice");
                }
            }
        }
        Ok(())
    }

    /// Facet names to register, in order.
    pub fn facet_names(&self) -> Vec<String> {
        match &self.facets {
            Some(facets) => facets.clone(),
            None => STANDARD_FACETS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn fs_options(&self) -> FsOptions {
        FsOptions::new(&self.path_base).with_runtime_bucket(self.runtime_bucket)
    }
}
