//! Nested configuration trees collected from the user.
//!
//! A [`Configuration`] maps field names to [`ConfigNode`]s. A node may carry a
//! scalar `value`, nested children, or both:
//!
//! ```json
//! { "ASPECT_RATIO": { "value": 1.7777, "WIDTH": { "value": 1920 }, "HEIGHT": { "value": 1080 } } }
//! ```
//!
//! Leaves are addressed by dotted paths (`ASPECT_RATIO.WIDTH`). Every typed
//! accessor fails with [`Error::Configuration`] naming the path.

use std::collections::BTreeMap;
use std::fmt;

use cf_core::{Error, Result};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ConfigValue
// ---------------------------------------------------------------------------

/// Scalar carried by a configuration leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl ConfigValue {
    fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::Text(_) => "text",
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for ConfigValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<f64> for ConfigValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<u32> for ConfigValue {
    fn from(v: u32) -> Self {
        Self::Number(f64::from(v))
    }
}

impl From<i32> for ConfigValue {
    fn from(v: i32) -> Self {
        Self::Number(f64::from(v))
    }
}

impl From<&str> for ConfigValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

// ---------------------------------------------------------------------------
// ConfigNode
// ---------------------------------------------------------------------------

/// One named scope in a configuration tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<ConfigValue>,
    #[serde(flatten)]
    pub children: BTreeMap<String, ConfigNode>,
}

impl ConfigNode {
    /// A node carrying only a scalar value.
    pub fn leaf(value: impl Into<ConfigValue>) -> Self {
        Self {
            value: Some(value.into()),
            children: BTreeMap::new(),
        }
    }

    /// Builder: attach a child node.
    pub fn with_child(mut self, key: impl Into<String>, child: ConfigNode) -> Self {
        self.children.insert(key.into(), child);
        self
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Root of a configuration tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Configuration {
    fields: BTreeMap<String, ConfigNode>,
}

impl Configuration {
    /// An empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration tree from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::configuration("<root>", format!("invalid configuration: {e}")))
    }

    /// Builder: insert a top-level node.
    pub fn with(mut self, key: impl Into<String>, node: ConfigNode) -> Self {
        self.fields.insert(key.into(), node);
        self
    }

    /// Set the value at a dotted path, creating intermediate scopes.
    pub fn set(&mut self, path: &str, value: impl Into<ConfigValue>) -> &mut Self {
        let mut segments = path.split('.');
        let Some(first) = segments.next() else {
            return self;
        };
        let mut node = self.fields.entry(first.to_string()).or_default();
        for segment in segments {
            node = node.children.entry(segment.to_string()).or_default();
        }
        node.value = Some(value.into());
        self
    }

    /// Whether the configuration has no fields at all.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Look up the node at a dotted path.
    pub fn node(&self, path: &str) -> Option<&ConfigNode> {
        let mut segments = path.split('.');
        let mut node = self.fields.get(segments.next()?)?;
        for segment in segments {
            node = node.children.get(segment)?;
        }
        Some(node)
    }

    /// The scalar at a dotted path, or `None` when absent.
    pub fn get(&self, path: &str) -> Option<&ConfigValue> {
        self.node(path).and_then(|n| n.value.as_ref())
    }

    /// The scalar at a dotted path.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] if the path does not end in a value.
    pub fn value(&self, path: &str) -> Result<&ConfigValue> {
        self.get(path)
            .ok_or_else(|| Error::configuration(path, "required value is missing"))
    }

    /// The numeric scalar at a dotted path.
    pub fn number(&self, path: &str) -> Result<f64> {
        match self.value(path)? {
            ConfigValue::Number(n) if n.is_finite() => Ok(*n),
            ConfigValue::Number(n) => Err(Error::configuration(path, format!("{n} is not finite"))),
            other => Err(mismatch(path, "number", other)),
        }
    }

    /// The non-negative integer scalar at a dotted path.
    pub fn integer(&self, path: &str) -> Result<u32> {
        let n = self.number(path)?;
        if n < 0.0 || n.fract() != 0.0 || n > f64::from(u32::MAX) {
            return Err(Error::configuration(
                path,
                format!("expected a non-negative integer, found {n}"),
            ));
        }
        Ok(n as u32)
    }

    /// The text scalar at a dotted path.
    pub fn text(&self, path: &str) -> Result<&str> {
        match self.value(path)? {
            ConfigValue::Text(s) => Ok(s),
            other => Err(mismatch(path, "text", other)),
        }
    }

    /// Like [`number`](Self::number) but absent leaves yield `None`.
    pub fn optional_number(&self, path: &str) -> Result<Option<f64>> {
        match self.get(path) {
            None => Ok(None),
            Some(_) => self.number(path).map(Some),
        }
    }

    /// Like [`integer`](Self::integer) but absent leaves yield `None`.
    pub fn optional_integer(&self, path: &str) -> Result<Option<u32>> {
        match self.get(path) {
            None => Ok(None),
            Some(_) => self.integer(path).map(Some),
        }
    }

    /// Like [`text`](Self::text) but absent leaves yield `None`.
    pub fn optional_text(&self, path: &str) -> Result<Option<&str>> {
        match self.get(path) {
            None => Ok(None),
            Some(_) => self.text(path).map(Some),
        }
    }

    /// Dotted paths of every node that carries a value, in sorted order.
    pub fn leaf_paths(&self) -> Vec<String> {
        fn walk(prefix: &str, node: &ConfigNode, out: &mut Vec<String>) {
            if node.value.is_some() {
                out.push(prefix.to_string());
            }
            for (key, child) in &node.children {
                walk(&format!("{prefix}.{key}"), child, out);
            }
        }

        let mut out = Vec::new();
        for (key, node) in &self.fields {
            walk(key, node, &mut out);
        }
        out
    }
}

fn mismatch(path: &str, expected: &str, found: &ConfigValue) -> Error {
    Error::configuration(
        path,
        format!("expected {expected}, found {} `{found}`", found.kind()),
    )
}
