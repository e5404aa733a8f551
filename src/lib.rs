pub mod catalog;
pub mod config;
pub mod emitter;
pub mod error;
pub mod exporter;
pub mod naming;
pub mod pipeline;
pub mod resolver;

// Re-export main types for convenience
pub use crate::catalog::{Catalog, CatalogBuilder, CatalogSource, Layout, NativeConstant, NativeSymbol, Radix, SourceFormat};
pub use crate::config::{SurfaceConfig, SurfaceProfile};
pub use crate::emitter::{EmitOptions, EmitTarget, Emitter};
pub use crate::error::{Error, NativeOrigin, Result};
pub use crate::exporter::{export, export_grouped, ConstantGroup, ExportedConstant};
pub use crate::naming::{CaseStyle, NamingRule};
pub use crate::resolver::{resolve, AliasEntry, AliasSource, BindingSurface};

/// Load, resolve and emit in one call.
pub fn generate_surface(source: CatalogSource<'_>, rule: &NamingRule, options: EmitOptions) -> Result<String> {
    let catalog = Catalog::load(source)?;
    let surface = resolve(&catalog, rule)?;
    Emitter::new(options).emit(&surface)
}
