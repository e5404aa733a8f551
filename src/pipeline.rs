//! Catalog → resolve → emit for one or many surface profiles.

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::catalog::{Catalog, SourceFormat};
use crate::config::{SurfaceConfig, SurfaceProfile};
use crate::emitter::Emitter;
use crate::error::{Error, Result};
use crate::resolver::resolve;

/// The finished text of one profile, not yet written anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSurface {
    pub profile: String,
    pub text: String,
    pub types: usize,
    pub constants: usize,
}

/// Read and parse a native description from disk. The format comes from
/// `format` when given, otherwise from the file extension.
pub fn load_catalog(path: &Path, format: Option<SourceFormat>) -> Result<Catalog> {
    let format = match format.or_else(|| SourceFormat::from_path(path)) {
        Some(format) => format,
        None => {
            return Err(Error::Config(format!(
                "cannot infer the description format of {}; pass it explicitly",
                path.display()
            )));
        }
    };
    let text = std::fs::read_to_string(path)
        .map_err(|source| Error::Io { path: path.to_path_buf(), source })?;
    tracing::debug!(path = %path.display(), %format, "reading native description");
    Catalog::load(format.source(&text))
}

pub fn generate(catalog: &Catalog, profile: &SurfaceProfile) -> Result<GeneratedSurface> {
    let _span = tracing::info_span!("surface", profile = profile.name.as_str()).entered();
    let surface = resolve(catalog, &profile.naming)?;
    if surface.is_empty() && profile.allow_empty {
        tracing::warn!("emitting an empty surface");
    }
    let text = Emitter::new(profile.emit_options()).emit(&surface)?;
    Ok(GeneratedSurface {
        profile: profile.name.clone(),
        text,
        types: surface.type_count(),
        constants: surface.constant_count(),
    })
}

/// Generate every profile independently. Runs in parallel; the catalog is
/// shared read-only and each profile resolves its own surface. Results keep
/// the order of `profiles`; the first failure fails the whole batch.
pub fn generate_all(catalog: &Catalog, profiles: &[SurfaceProfile]) -> Result<Vec<GeneratedSurface>> {
    profiles.par_iter().map(|profile| generate(catalog, profile)).collect()
}

/// Where a generated surface should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    File(PathBuf),
    Stdout,
}

/// Pair generated surfaces with their destinations from `config`.
pub fn destinations(config: &SurfaceConfig, generated: &[GeneratedSurface]) -> Result<Vec<Destination>> {
    generated
        .iter()
        .map(|g| {
            let profile = config.profile(&g.profile)?;
            Ok(config.output_path(profile).map(Destination::File).unwrap_or(Destination::Stdout))
        })
        .collect()
}

/// Write one surface to a file, creating parent directories as needed.
pub fn write_surface(path: &Path, surface: &GeneratedSurface) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|source| Error::Io { path: parent.to_path_buf(), source })?;
    }
    std::fs::write(path, &surface.text).map_err(|source| Error::Io { path: path.to_path_buf(), source })?;
    tracing::info!(path = %path.display(), profile = surface.profile.as_str(), "wrote surface");
    Ok(())
}
