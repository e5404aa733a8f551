use serde::{Deserialize, Serialize};

/// Case transformation applied to the native stem before `prefix_add`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseStyle {
    /// Keep the native spelling.
    #[default]
    Preserve,
    Upper,
    Lower,
}

impl std::str::FromStr for CaseStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "preserve" => Ok(CaseStyle::Preserve),
            "upper" => Ok(CaseStyle::Upper),
            "lower" => Ok(CaseStyle::Lower),
            other => Err(format!("unknown case style `{other}` (expected preserve, upper or lower)")),
        }
    }
}

/// How native names become target identifiers.
///
/// `target = prefix_add + case(strip(native))`, where `strip` only removes
/// `prefix_strip` from names that actually start with it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NamingRule {
    pub prefix_strip: String,
    pub prefix_add: String,
    pub case_style: CaseStyle,
}

impl NamingRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix_strip(mut self, prefix: impl Into<String>) -> Self {
        self.prefix_strip = prefix.into();
        self
    }

    pub fn with_prefix_add(mut self, prefix: impl Into<String>) -> Self {
        self.prefix_add = prefix.into();
        self
    }

    pub fn with_case_style(mut self, case_style: CaseStyle) -> Self {
        self.case_style = case_style;
        self
    }

    /// Compute the candidate target identifier for a native name.
    pub fn apply(&self, native: &str) -> String {
        let stem = if self.prefix_strip.is_empty() {
            native
        } else {
            native.strip_prefix(self.prefix_strip.as_str()).unwrap_or(native)
        };
        let stem = match self.case_style {
            CaseStyle::Preserve => stem.to_string(),
            CaseStyle::Upper => stem.to_ascii_uppercase(),
            CaseStyle::Lower => stem.to_ascii_lowercase(),
        };
        let mut target = String::with_capacity(self.prefix_add.len() + stem.len());
        target.push_str(&self.prefix_add);
        target.push_str(&stem);
        target
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`, the identifier shape every emit target accepts.
pub fn is_c_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first == '_' || first.is_ascii_alphabetic() => {
            chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
        }
        _ => false,
    }
}
