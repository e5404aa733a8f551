//! Declaration emission.
//!
//! Pure formatting over a finished [`BindingSurface`]: opaque forward
//! declarations for types, grouped constant declarations for constants. Only
//! target identifiers appear in declarations; native layout never does.

use std::fmt::{self, Write as _};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::catalog::Radix;
use crate::error::{Error, Result};
use crate::exporter::{export_grouped, ConstantGroup, ExportedConstant};
use crate::resolver::BindingSurface;

const GENERATED_NOTICE: &str = "Generated by cvsurface. Do not edit.";

/// Output syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmitTarget {
    /// C header with `typedef struct T T;` forward declarations.
    #[default]
    C,
    /// Rust module with zero-sized `#[repr(C)]` opaque structs.
    Rust,
    /// JSON alias table recording native → target for every entry.
    Manifest,
}

impl FromStr for EmitTarget {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "c" => Ok(EmitTarget::C),
            "rust" => Ok(EmitTarget::Rust),
            "manifest" => Ok(EmitTarget::Manifest),
            other => Err(format!("unknown emit target `{other}` (expected c, rust or manifest)")),
        }
    }
}

impl fmt::Display for EmitTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmitTarget::C => f.write_str("c"),
            EmitTarget::Rust => f.write_str("rust"),
            EmitTarget::Manifest => f.write_str("manifest"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EmitOptions {
    pub target: EmitTarget,
    /// Permit emitting a surface with no entries. Off by default.
    pub allow_empty: bool,
    /// Include guard for the C target; defaults to `CVSURFACE_GENERATED_H`.
    pub header_guard: Option<String>,
}

impl EmitOptions {
    pub fn new(target: EmitTarget) -> Self {
        Self { target, ..Self::default() }
    }

    pub fn allow_empty(mut self, allow_empty: bool) -> Self {
        self.allow_empty = allow_empty;
        self
    }

    pub fn header_guard(mut self, guard: impl Into<String>) -> Self {
        self.header_guard = Some(guard.into());
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct Emitter {
    options: EmitOptions,
}

impl Emitter {
    pub fn new(options: EmitOptions) -> Self {
        Self { options }
    }

    /// Render `surface` in the configured target syntax.
    pub fn emit(&self, surface: &BindingSurface) -> Result<String> {
        if surface.is_empty() && !self.options.allow_empty {
            return Err(Error::EmptySurface);
        }
        let groups = export_grouped(surface);
        let text = match self.options.target {
            EmitTarget::C => self.emit_c(surface, &groups),
            EmitTarget::Rust => emit_rust(surface, &groups)?,
            EmitTarget::Manifest => emit_manifest(surface)?,
        };
        tracing::info!(
            target_syntax = %self.options.target,
            types = surface.type_count(),
            constants = surface.constant_count(),
            bytes = text.len(),
            "emitted declarations"
        );
        Ok(text)
    }

    fn emit_c(&self, surface: &BindingSurface, groups: &[ConstantGroup]) -> String {
        let guard = self.options.header_guard.as_deref().unwrap_or("CVSURFACE_GENERATED_H");
        let mut out = String::new();
        // Writing to a String cannot fail.
        let _ = writeln!(out, "/* {GENERATED_NOTICE} */");
        let _ = writeln!(out, "#ifndef {guard}");
        let _ = writeln!(out, "#define {guard}");

        if surface.type_count() > 0 {
            out.push('\n');
            for (target, _) in surface.types() {
                let _ = writeln!(out, "typedef struct {target} {target};");
            }
        }

        for group in groups {
            let _ = writeln!(out, "\n/* {} */", comment_text(&group.name));
            if group.fits_i32() {
                out.push_str("enum {\n");
                for constant in &group.constants {
                    let _ = writeln!(out, "    {} = {},", constant.target, literal(constant));
                }
                out.push_str("};\n");
            } else {
                for constant in &group.constants {
                    let _ = writeln!(out, "#define {} {}", constant.target, c_long_long(constant));
                }
            }
        }

        let _ = writeln!(out, "\n#endif /* {guard} */");
        out
    }
}

/// Group names come from the catalog verbatim; keep them inside one comment.
fn comment_text(name: &str) -> String {
    name.replace(['\n', '\r'], " ").replace("*/", "* /")
}

/// Native spelling of a value: hex stays hex, everything else is decimal.
fn literal(constant: &ExportedConstant) -> String {
    match constant.radix {
        Radix::Hex if constant.value >= 0 => format!("0x{:X}", constant.value),
        _ => constant.value.to_string(),
    }
}

fn c_long_long(constant: &ExportedConstant) -> String {
    if constant.value == i64::MIN {
        // `9223372036854775808LL` is not a valid C literal.
        return "(-9223372036854775807LL - 1)".to_string();
    }
    let text = format!("{}LL", literal(constant));
    if constant.value < 0 { format!("({text})") } else { text }
}

fn rust_ident(target: &str, surface: &BindingSurface) -> Result<()> {
    if syn::parse_str::<syn::Ident>(target).is_ok() {
        return Ok(());
    }
    let native = match surface.get(target) {
        Some(entry) => entry.source.native_origin(),
        None => return Ok(()),
    };
    Err(Error::InvalidTarget {
        target: target.to_string(),
        native,
        reason: "reserved Rust keyword".to_string(),
    })
}

fn emit_rust(surface: &BindingSurface, groups: &[ConstantGroup]) -> Result<String> {
    let mut out = String::new();
    let _ = writeln!(out, "// {GENERATED_NOTICE}");

    for (target, _) in surface.types() {
        rust_ident(target, surface)?;
        let _ = write!(
            out,
            "\n#[repr(C)]\n\
             #[allow(non_camel_case_types)]\n\
             pub struct {target} {{\n    \
                 _opaque: [u8; 0],\n    \
                 _marker: ::core::marker::PhantomData<(*mut u8, ::core::marker::PhantomPinned)>,\n\
             }}\n"
        );
    }

    for group in groups {
        let ty = if group.fits_i32() { "i32" } else { "i64" };
        let _ = writeln!(out, "\n// {}", comment_text(&group.name));
        for constant in &group.constants {
            rust_ident(&constant.target, surface)?;
            let _ = writeln!(out, "#[allow(non_upper_case_globals)]");
            let _ = writeln!(out, "pub const {}: {ty} = {};", constant.target, literal(constant));
        }
    }
    Ok(out)
}

#[derive(Serialize)]
struct Manifest<'a> {
    types: Vec<ManifestType<'a>>,
    constants: Vec<ManifestConstant<'a>>,
}

#[derive(Serialize)]
struct ManifestType<'a> {
    target: &'a str,
    native: &'a str,
    origin: &'a str,
}

#[derive(Serialize)]
struct ManifestConstant<'a> {
    target: &'a str,
    native: &'a str,
    group: &'a str,
    value: i64,
}

fn emit_manifest(surface: &BindingSurface) -> Result<String> {
    let manifest = Manifest {
        types: surface
            .types()
            .map(|(target, symbol)| ManifestType {
                target,
                native: &symbol.name,
                origin: &symbol.origin,
            })
            .collect(),
        constants: surface
            .constants()
            .map(|(target, constant)| ManifestConstant {
                target,
                native: &constant.name,
                group: &constant.group,
                value: constant.value,
            })
            .collect(),
    };
    let mut text = serde_json::to_string_pretty(&manifest)?;
    text.push('\n');
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, Layout};
    use crate::naming::NamingRule;
    use crate::resolver::resolve;

    fn sample() -> BindingSurface {
        let catalog = Catalog::builder()
            .add_type("ImgObsInfo", "opencv/cvaux.h")
            .add_type_with_layout("EHMMState", "opencv/cvaux.h", Layout { size: 4096, align: 16 })
            .add_constant("Event", "CV_EVENT_MOUSEMOVE", 0)
            .add_constant_with_radix("Event", "CV_EVENT_FLAG_ALTKEY", 0x20, Radix::Hex)
            .add_constant("LoadImage", "CV_LOAD_IMAGE_UNCHANGED", -1)
            .build()
            .unwrap();
        resolve(&catalog, &NamingRule::new().with_prefix_strip("CV_").with_prefix_add("Cv")).unwrap()
    }

    #[test]
    fn c_header_layout() {
        let text = Emitter::new(EmitOptions::new(EmitTarget::C).header_guard("CV_SURFACE_H"))
            .emit(&sample())
            .unwrap();
        let expected = "\
/* Generated by cvsurface. Do not edit. */
#ifndef CV_SURFACE_H
#define CV_SURFACE_H

typedef struct CvImgObsInfo CvImgObsInfo;
typedef struct CvEHMMState CvEHMMState;

/* Event */
enum {
    CvEVENT_MOUSEMOVE = 0,
    CvEVENT_FLAG_ALTKEY = 0x20,
};

/* LoadImage */
enum {
    CvLOAD_IMAGE_UNCHANGED = -1,
};

#endif /* CV_SURFACE_H */
";
        assert_eq!(text, expected);
    }

    #[test]
    fn wide_groups_become_defines() {
        let catalog = Catalog::builder()
            .add_constant_with_radix("Mask", "ALL", 0xFFFF_FFFF, Radix::Hex)
            .add_constant("Mask", "LOW", i64::MIN)
            .add_constant("Mask", "NEG", -5_000_000_000)
            .build()
            .unwrap();
        let surface = resolve(&catalog, &NamingRule::new()).unwrap();
        let text = Emitter::new(EmitOptions::new(EmitTarget::C)).emit(&surface).unwrap();
        assert!(text.contains("#define ALL 0xFFFFFFFFLL\n"), "{text}");
        assert!(text.contains("#define LOW (-9223372036854775807LL - 1)\n"), "{text}");
        assert!(text.contains("#define NEG (-5000000000LL)\n"), "{text}");
        assert!(!text.contains("enum"));

        let rust = Emitter::new(EmitOptions::new(EmitTarget::Rust)).emit(&surface).unwrap();
        assert!(rust.contains("pub const ALL: i64 = 0xFFFFFFFF;"), "{rust}");
        assert!(rust.contains("pub const LOW: i64 = -9223372036854775808;"), "{rust}");
    }

    #[test]
    fn rust_module_layout() {
        let text = Emitter::new(EmitOptions::new(EmitTarget::Rust)).emit(&sample()).unwrap();
        assert!(text.starts_with("// Generated by cvsurface. Do not edit.\n"));
        assert!(text.contains("#[repr(C)]\n#[allow(non_camel_case_types)]\npub struct CvImgObsInfo {\n    _opaque: [u8; 0],\n"));
        assert!(text.contains("// Event\n#[allow(non_upper_case_globals)]\npub const CvEVENT_MOUSEMOVE: i32 = 0;\n"));
        assert!(text.contains("pub const CvEVENT_FLAG_ALTKEY: i32 = 0x20;"));
        assert!(text.contains("pub const CvLOAD_IMAGE_UNCHANGED: i32 = -1;"));
        assert!(syn::parse_file(&text).is_ok(), "emitted Rust must parse:\n{text}");
    }

    #[test]
    fn layout_metadata_never_leaks() {
        for target in [EmitTarget::C, EmitTarget::Rust, EmitTarget::Manifest] {
            let text = Emitter::new(EmitOptions::new(target)).emit(&sample()).unwrap();
            assert!(!text.contains("4096"), "{target}: {text}");
            assert!(!text.contains("align"), "{target}: {text}");
        }
    }

    #[test]
    fn manifest_records_mapping() {
        let text = Emitter::new(EmitOptions::new(EmitTarget::Manifest)).emit(&sample()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["types"][0]["target"], "CvImgObsInfo");
        assert_eq!(value["types"][0]["native"], "ImgObsInfo");
        assert_eq!(value["types"][0]["origin"], "opencv/cvaux.h");
        assert_eq!(value["constants"][2]["native"], "CV_LOAD_IMAGE_UNCHANGED");
        assert_eq!(value["constants"][2]["value"], -1);
        assert_eq!(value["types"].as_array().map(Vec::len), Some(2));
        assert_eq!(value["constants"].as_array().map(Vec::len), Some(3));
    }

    #[test]
    fn empty_surface_is_rejected_unless_allowed() {
        let empty = BindingSurface::default();
        let err = Emitter::new(EmitOptions::new(EmitTarget::C)).emit(&empty).unwrap_err();
        assert!(matches!(err, Error::EmptySurface));

        let text = Emitter::new(EmitOptions::new(EmitTarget::C).allow_empty(true)).emit(&empty).unwrap();
        assert!(!text.contains("typedef"));
        assert!(text.contains("#endif"));
    }

    #[test]
    fn rust_keywords_are_invalid_targets() {
        let catalog = Catalog::builder().add_type("type", "").build().unwrap();
        let surface = resolve(&catalog, &NamingRule::new()).unwrap();
        assert!(Emitter::new(EmitOptions::new(EmitTarget::C)).emit(&surface).is_ok());
        let err = Emitter::new(EmitOptions::new(EmitTarget::Rust)).emit(&surface).unwrap_err();
        assert!(matches!(err, Error::InvalidTarget { .. }), "{err}");
    }

    #[test]
    fn emission_is_byte_identical_across_calls() {
        let surface = sample();
        for target in [EmitTarget::C, EmitTarget::Rust, EmitTarget::Manifest] {
            let emitter = Emitter::new(EmitOptions::new(target));
            assert_eq!(emitter.emit(&surface).unwrap(), emitter.emit(&surface).unwrap());
        }
    }
}
