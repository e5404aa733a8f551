//! Native symbol catalog: the opaque structures and enumeration constants an
//! external library publishes, normalized into discovery order.

pub mod header;
pub mod json;

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, NativeOrigin, Result};

/// Size/alignment metadata some descriptions carry for a structure.
///
/// Kept only so a catalog can round-trip what it was given; nothing downstream
/// of the catalog ever reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub size: u64,
    pub align: u64,
}

/// One opaque structure owned by the external library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeSymbol {
    pub name: String,
    /// Header or subsystem that declares the structure (may be empty).
    pub origin: String,
    pub layout: Option<Layout>,
}

impl NativeSymbol {
    pub fn native_origin(&self) -> NativeOrigin {
        NativeOrigin::Type { name: self.name.clone(), origin: self.origin.clone() }
    }
}

/// Spelling of a constant's literal in the native description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Radix {
    #[default]
    Decimal,
    Hex,
}

/// One enumeration value defined by the external library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeConstant {
    pub name: String,
    pub group: String,
    pub value: i64,
    pub radix: Radix,
}

impl NativeConstant {
    pub fn native_origin(&self) -> NativeOrigin {
        NativeOrigin::Constant { name: self.name.clone(), group: self.group.clone() }
    }
}

/// Input formats a catalog can be loaded from.
#[derive(Debug, Clone, Copy)]
pub enum CatalogSource<'a> {
    /// C-header subset: `#include` origins, `struct` forward declarations and
    /// `enum Group { .. };` blocks with explicit values.
    Header(&'a str),
    /// JSON description, see [`json`].
    Json(&'a str),
}

/// Format selector used by configuration and the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Header,
    Json,
}

impl SourceFormat {
    /// Guess the format from a file extension.
    pub fn from_path(path: &std::path::Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "h" | "hpp" | "hh" => Some(SourceFormat::Header),
            "json" => Some(SourceFormat::Json),
            _ => None,
        }
    }

    pub fn source<'a>(self, text: &'a str) -> CatalogSource<'a> {
        match self {
            SourceFormat::Header => CatalogSource::Header(text),
            SourceFormat::Json => CatalogSource::Json(text),
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFormat::Header => f.write_str("header"),
            SourceFormat::Json => f.write_str("json"),
        }
    }
}

/// Immutable set of native facts, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    types: Vec<NativeSymbol>,
    constants: Vec<NativeConstant>,
}

impl Catalog {
    /// Parse and validate a native description.
    pub fn load(source: CatalogSource<'_>) -> Result<Self> {
        let catalog = match source {
            CatalogSource::Header(text) => header::parse(text)?,
            CatalogSource::Json(text) => json::parse(text)?,
        };
        tracing::debug!(
            types = catalog.types.len(),
            constants = catalog.constants.len(),
            "loaded native catalog"
        );
        Ok(catalog)
    }

    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    pub fn types(&self) -> &[NativeSymbol] {
        &self.types
    }

    pub fn constants(&self) -> &[NativeConstant] {
        &self.constants
    }

    /// Distinct group names in order of first appearance.
    pub fn groups(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.constants
            .iter()
            .map(|c| c.group.as_str())
            .filter(|g| seen.insert(*g))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty() && self.constants.is_empty()
    }
}

/// Incremental construction of a [`Catalog`]; validation happens in
/// [`CatalogBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct CatalogBuilder {
    types: Vec<NativeSymbol>,
    constants: Vec<NativeConstant>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_type(&mut self, name: impl Into<String>, origin: impl Into<String>) -> &mut Self {
        self.types.push(NativeSymbol { name: name.into(), origin: origin.into(), layout: None });
        self
    }

    pub fn add_type_with_layout(
        &mut self,
        name: impl Into<String>,
        origin: impl Into<String>,
        layout: Layout,
    ) -> &mut Self {
        self.types.push(NativeSymbol {
            name: name.into(),
            origin: origin.into(),
            layout: Some(layout),
        });
        self
    }

    pub fn add_constant(
        &mut self,
        group: impl Into<String>,
        name: impl Into<String>,
        value: i64,
    ) -> &mut Self {
        self.add_constant_with_radix(group, name, value, Radix::Decimal)
    }

    pub fn add_constant_with_radix(
        &mut self,
        group: impl Into<String>,
        name: impl Into<String>,
        value: i64,
        radix: Radix,
    ) -> &mut Self {
        self.constants.push(NativeConstant {
            name: name.into(),
            group: group.into(),
            value,
            radix,
        });
        self
    }

    /// Validate and freeze the collected entries.
    ///
    /// A structure name may appear more than once; that is only rejected
    /// later, when both entries resolve to one target identifier.
    pub fn build(&self) -> Result<Catalog> {
        for symbol in &self.types {
            if symbol.name.is_empty() {
                return Err(Error::malformed(match symbol.origin.as_str() {
                    "" => "empty structure name".to_string(),
                    origin => format!("empty structure name in {origin}"),
                }));
            }
        }

        let mut constants_seen: HashSet<(&str, &str)> = HashSet::new();
        for constant in &self.constants {
            if constant.group.is_empty() {
                return Err(Error::malformed(format!(
                    "constant `{}` has an empty group name",
                    constant.name
                )));
            }
            if constant.name.is_empty() {
                return Err(Error::malformed(format!(
                    "empty constant name in group `{}`",
                    constant.group
                )));
            }
            if !constants_seen.insert((constant.group.as_str(), constant.name.as_str())) {
                return Err(Error::malformed(format!(
                    "constant `{}` defined twice in group `{}`",
                    constant.name, constant.group
                )));
            }
        }

        Ok(Catalog { types: self.types.clone(), constants: self.constants.clone() })
    }
}

/// Parse an integer literal the way the native headers spell them: optional
/// `-`, decimal or `0x` hex digits, optional `u`/`l` suffixes.
///
/// Returns `None` for anything else, including values outside `i64`.
pub fn parse_literal(text: &str) -> Option<(i64, Radix)> {
    let text = text.trim();
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, text),
    };
    let body = body.trim_end_matches(['u', 'U', 'l', 'L']);
    let (digits, radix) = match body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        Some(hex) => (hex, Radix::Hex),
        None => (body, Radix::Decimal),
    };
    // `from_str_radix` would accept a sign here.
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return None;
    }
    let base = match radix {
        Radix::Decimal => 10,
        Radix::Hex => 16,
    };
    // Parse the magnitude as u64 so `-9223372036854775808` is representable.
    let magnitude = u64::from_str_radix(digits, base).ok()?;
    let value = if negative {
        if magnitude == i64::MIN.unsigned_abs() {
            i64::MIN
        } else {
            -i64::try_from(magnitude).ok()?
        }
    } else {
        i64::try_from(magnitude).ok()?
    };
    Some((value, radix))
}
