//! TOML configuration: where the native description lives and which surfaces
//! to generate from it.
//!
//! ```toml
//! [catalog]
//! path = "wrapper/opencv_legacy.h"
//!
//! [[surface]]
//! name = "c"
//! target = "c"
//! output = "out/cv_surface.h"
//!
//! [surface.naming]
//! prefix_strip = "CV_"
//! prefix_add = "Cv"
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::catalog::SourceFormat;
use crate::emitter::{EmitOptions, EmitTarget};
use crate::error::{Error, Result};
use crate::naming::NamingRule;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogConfig {
    pub path: Option<PathBuf>,
    pub format: Option<SourceFormat>,
}

/// One `[[surface]]` entry: a naming rule plus emit options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SurfaceProfile {
    pub name: String,
    #[serde(default)]
    pub target: EmitTarget,
    /// Output file; standard output when absent.
    pub output: Option<PathBuf>,
    #[serde(default)]
    pub allow_empty: bool,
    pub header_guard: Option<String>,
    #[serde(default)]
    pub naming: NamingRule,
}

impl SurfaceProfile {
    pub fn new(name: impl Into<String>, target: EmitTarget, naming: NamingRule) -> Self {
        Self {
            name: name.into(),
            target,
            output: None,
            allow_empty: false,
            header_guard: None,
            naming,
        }
    }

    pub fn emit_options(&self) -> EmitOptions {
        EmitOptions {
            target: self.target,
            allow_empty: self.allow_empty,
            header_guard: self.header_guard.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SurfaceConfig {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(rename = "surface", default)]
    pub surfaces: Vec<SurfaceProfile>,
    /// Directory relative paths are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl SurfaceConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: SurfaceConfig =
            toml::from_str(text).map_err(|e| Error::Config(e.message().to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a config file; relative paths inside it are taken relative to the
    /// file's directory.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| Error::Io { path: path.to_path_buf(), source })?;
        let mut config = Self::from_toml_str(&text)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), config_message(e))))?;
        config.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        tracing::debug!(path = %path.display(), profiles = config.surfaces.len(), "loaded configuration");
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.surfaces.is_empty() {
            return Err(Error::Config("at least one [[surface]] profile is required".into()));
        }
        let mut names = HashSet::new();
        for profile in &self.surfaces {
            if profile.name.is_empty() {
                return Err(Error::Config("surface profile with an empty name".into()));
            }
            if !names.insert(profile.name.as_str()) {
                return Err(Error::Config(format!("surface profile `{}` defined twice", profile.name)));
            }
        }
        Ok(())
    }

    pub fn profile(&self, name: &str) -> Result<&SurfaceProfile> {
        self.surfaces
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| Error::Config(format!("no surface profile named `{name}`")))
    }

    /// Catalog path from the config, resolved against [`Self::base_dir`].
    pub fn catalog_path(&self) -> Option<PathBuf> {
        self.catalog.path.as_ref().map(|p| self.resolve_path(p))
    }

    pub fn output_path(&self, profile: &SurfaceProfile) -> Option<PathBuf> {
        profile.output.as_ref().map(|p| self.resolve_path(p))
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() { path.to_path_buf() } else { self.base_dir.join(path) }
    }
}

fn config_message(err: Error) -> String {
    match err {
        Error::Config(message) => message,
        other => other.to_string(),
    }
}
