use std::env;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use cvsurface::{resolve, BindingSurface, Catalog, CatalogSource, EmitOptions, EmitTarget, Emitter, NamingRule};

macro_rules! println_info {
    ($($tokens: tt)*) => {
        println!("cargo:warning=\r\x1b[32;1m   {}", format!($($tokens)*))
    }
}

const DESCRIPTION: &str = "wrapper/opencv_legacy.h";

fn main() {
    println!("cargo:rerun-if-changed={DESCRIPTION}");
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set"));
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR not set"));

    let text = fs::read_to_string(manifest_dir.join(DESCRIPTION))
        .unwrap_or_else(|e| panic!("Failed to read {DESCRIPTION}: {e}"));
    let catalog = Catalog::load(CatalogSource::Header(&text))
        .unwrap_or_else(|e| panic!("Invalid native description {DESCRIPTION}: {e}"));

    let rule = NamingRule::new().with_prefix_strip("CV_").with_prefix_add("Cv");
    let surface = resolve(&catalog, &rule).unwrap_or_else(|e| panic!("Failed to resolve surface: {e}"));
    if env::var_os("CVSURFACE_VERBOSE").is_some() {
        println_info!(
            "Resolved {} types and {} constants from {}",
            surface.type_count(),
            surface.constant_count(),
            DESCRIPTION
        );
    }

    let mut generated = Emitter::new(EmitOptions::new(EmitTarget::Rust))
        .emit(&surface)
        .unwrap_or_else(|e| panic!("Failed to emit surface: {e}"));
    generated.push_str(&name_tables(&surface));

    let out_path = out_dir.join("surface.rs");
    fs::write(&out_path, generated).expect("Failed to write generated surface");
}

/// Target names in emission order, so tests and callers can enumerate the surface.
fn name_tables(surface: &BindingSurface) -> String {
    let mut out = String::from("\n/// Every opaque type alias, in declaration order.\npub const TYPE_NAMES: &[&str] = &[\n");
    for (target, _) in surface.types() {
        let _ = writeln!(out, "    {target:?},");
    }
    out.push_str("];\n\n/// Every constant alias, grouped as declared.\npub const CONSTANT_NAMES: &[&str] = &[\n");
    for (target, _) in surface.constants() {
        let _ = writeln!(out, "    {target:?},");
    }
    out.push_str("];\n");
    out
}
