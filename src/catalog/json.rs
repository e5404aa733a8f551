//! JSON native descriptions.
//!
//! ```json
//! {
//!   "types": [
//!     { "name": "ImgObsInfo", "origin": "opencv/cvaux.h" },
//!     { "name": "Mat", "origin": "opencv/cxtypes.h", "layout": { "size": 48, "align": 8 } }
//!   ],
//!   "groups": [
//!     { "name": "Event", "constants": [
//!         { "name": "CV_EVENT_MOUSEMOVE", "value": 0 },
//!         { "name": "CV_EVENT_FLAG_ALTKEY", "value": "0x20" }
//!     ] }
//!   ]
//! }
//! ```
//!
//! Values may be JSON integers or strings holding a decimal or hex literal.

use serde::Deserialize;

use crate::catalog::{parse_literal, Catalog, CatalogBuilder, Layout, Radix};
use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Description {
    #[serde(default)]
    types: Vec<TypeEntry>,
    #[serde(default)]
    groups: Vec<GroupEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TypeEntry {
    name: String,
    #[serde(default)]
    origin: String,
    #[serde(default)]
    layout: Option<Layout>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GroupEntry {
    name: String,
    #[serde(default)]
    constants: Vec<ConstantEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConstantEntry {
    name: String,
    value: LiteralValue,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LiteralValue {
    Int(i64),
    Text(String),
}

/// Parse a JSON description into a validated [`Catalog`].
pub fn parse(source: &str) -> Result<Catalog> {
    let description: Description = serde_json::from_str(source).map_err(|e| Error::MalformedSource {
        line: Some(e.line()),
        message: format!("invalid JSON description: {e}"),
    })?;

    let mut builder = CatalogBuilder::new();
    for entry in description.types {
        match entry.layout {
            Some(layout) => builder.add_type_with_layout(entry.name, entry.origin, layout),
            None => builder.add_type(entry.name, entry.origin),
        };
    }
    for group in description.groups {
        for constant in group.constants {
            let (value, radix) = match constant.value {
                LiteralValue::Int(value) => (value, Radix::Decimal),
                LiteralValue::Text(text) => parse_literal(&text).ok_or_else(|| {
                    Error::malformed(format!(
                        "`{text}` is not a 64-bit integer literal (constant `{}` in group `{}`)",
                        constant.name, group.name
                    ))
                })?,
            };
            builder.add_constant_with_radix(group.name.clone(), constant.name, value, radix);
        }
    }
    builder.build()
}
