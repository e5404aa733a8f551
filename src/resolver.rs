//! Alias resolution: the single authority that decides target identifiers.

use std::collections::HashMap;

use crate::catalog::{Catalog, NativeConstant, NativeSymbol};
use crate::error::{Error, NativeOrigin, Result};
use crate::naming::{is_c_identifier, NamingRule};

/// What a target identifier stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasSource {
    Type(NativeSymbol),
    Constant(NativeConstant),
}

impl AliasSource {
    pub fn native_name(&self) -> &str {
        match self {
            AliasSource::Type(symbol) => &symbol.name,
            AliasSource::Constant(constant) => &constant.name,
        }
    }

    pub fn native_origin(&self) -> NativeOrigin {
        match self {
            AliasSource::Type(symbol) => symbol.native_origin(),
            AliasSource::Constant(constant) => constant.native_origin(),
        }
    }
}

/// One native entry paired with its target identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasEntry {
    pub target: String,
    pub source: AliasSource,
}

impl AliasEntry {
    pub fn as_type(&self) -> Option<&NativeSymbol> {
        match &self.source {
            AliasSource::Type(symbol) => Some(symbol),
            AliasSource::Constant(_) => None,
        }
    }

    pub fn as_constant(&self) -> Option<&NativeConstant> {
        match &self.source {
            AliasSource::Constant(constant) => Some(constant),
            AliasSource::Type(_) => None,
        }
    }
}

/// Resolved, ordered alias table. Types come first, then constants, each in
/// catalog discovery order. Every target identifier is unique.
///
/// There is no way to mutate a surface after [`resolve`] produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingSurface {
    entries: Vec<AliasEntry>,
    index: HashMap<String, usize>,
}

impl BindingSurface {
    pub fn entries(&self) -> &[AliasEntry] {
        &self.entries
    }

    pub fn types(&self) -> impl Iterator<Item = (&str, &NativeSymbol)> + '_ {
        self.entries.iter().filter_map(|e| e.as_type().map(|s| (e.target.as_str(), s)))
    }

    pub fn constants(&self) -> impl Iterator<Item = (&str, &NativeConstant)> + '_ {
        self.entries.iter().filter_map(|e| e.as_constant().map(|c| (e.target.as_str(), c)))
    }

    pub fn get(&self, target: &str) -> Option<&AliasEntry> {
        self.index.get(target).map(|&i| &self.entries[i])
    }

    /// Target identifier assigned to a native type, if any. When the same
    /// structure name exists in several origins only one can have resolved.
    pub fn target_of_type(&self, native: &str) -> Option<&str> {
        self.types().find(|(_, s)| s.name == native).map(|(t, _)| t)
    }

    pub fn target_of_constant(&self, group: &str, native: &str) -> Option<&str> {
        self.constants()
            .find(|(_, c)| c.group == group && c.name == native)
            .map(|(t, _)| t)
    }

    pub fn type_count(&self) -> usize {
        self.types().count()
    }

    pub fn constant_count(&self) -> usize {
        self.constants().count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, target: String, source: AliasSource) -> Result<()> {
        if !is_c_identifier(&target) {
            return Err(Error::InvalidTarget {
                reason: if target.is_empty() {
                    "the naming rule produced an empty identifier".to_string()
                } else {
                    "not a valid identifier".to_string()
                },
                target,
                native: source.native_origin(),
            });
        }
        if let Some(&existing) = self.index.get(&target) {
            return Err(Error::AliasCollision {
                target,
                first: self.entries[existing].source.native_origin(),
                second: source.native_origin(),
            });
        }
        tracing::debug!(alias = target.as_str(), native = source.native_name(), "resolved alias");
        self.index.insert(target.clone(), self.entries.len());
        self.entries.push(AliasEntry { target, source });
        Ok(())
    }
}

/// Assign every native type and constant of `catalog` a target identifier.
///
/// Fails on the first collision; nothing is ever renamed to make room.
pub fn resolve(catalog: &Catalog, rule: &NamingRule) -> Result<BindingSurface> {
    let mut surface = BindingSurface::default();
    for symbol in catalog.types() {
        surface.insert(rule.apply(&symbol.name), AliasSource::Type(symbol.clone()))?;
    }
    for constant in catalog.constants() {
        surface.insert(rule.apply(&constant.name), AliasSource::Constant(constant.clone()))?;
    }
    tracing::info!(
        types = catalog.types().len(),
        constants = catalog.constants().len(),
        prefix_strip = rule.prefix_strip.as_str(),
        prefix_add = rule.prefix_add.as_str(),
        "resolved binding surface"
    );
    Ok(surface)
}
