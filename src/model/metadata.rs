// src/model/metadata.rs
//! Declarative per-member metadata
//!
//! Metadata entries are named annotations with positional and named
//! construction arguments. An argument is reconstructible when its value is
//! fully known; `Computed` arguments only existed at the original declaration
//! and cannot be rebuilt on a synthesized member.

use crate::model::value::TypeRef;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Construction argument of a metadata entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetadataArg {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Type(TypeRef),
    List(Vec<MetadataArg>),
    /// Value computed once at declaration time; not recoverable
    Computed(String),
}

impl MetadataArg {
    pub fn is_reconstructible(&self) -> bool {
        match self {
            MetadataArg::Computed(_) => false,
            MetadataArg::List(items) => items.iter().all(MetadataArg::is_reconstructible),
            _ => true,
        }
    }
}

impl fmt::Display for MetadataArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataArg::Bool(b) => write!(f, "{}", b),
            MetadataArg::Int(i) => write!(f, "{}", i),
            MetadataArg::Float(x) => write!(f, "{}", x),
            MetadataArg::Str(s) => write!(f, "{:?}", s),
            MetadataArg::Type(t) => write!(f, "typeof({})", t),
            MetadataArg::List(items) => {
                let parts: Vec<String> = items.iter().map(|i| i.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            MetadataArg::Computed(desc) => write!(f, "<computed: {}>", desc),
        }
    }
}

impl From<bool> for MetadataArg {
    fn from(b: bool) -> Self {
        MetadataArg::Bool(b)
    }
}

impl From<i64> for MetadataArg {
    fn from(i: i64) -> Self {
        MetadataArg::Int(i)
    }
}

impl From<&str> for MetadataArg {
    fn from(s: &str) -> Self {
        MetadataArg::Str(s.to_string())
    }
}

impl From<String> for MetadataArg {
    fn from(s: String) -> Self {
        MetadataArg::Str(s)
    }
}

/// Metadata entry attached to a type or member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    /// Metadata name (e.g., "Transactional")
    pub name: String,

    /// Positional construction arguments
    pub args: Vec<MetadataArg>,

    /// Named properties set after construction
    pub named: Vec<(String, MetadataArg)>,

    /// Replication failure aborts synthesis regardless of policy
    pub mandatory: bool,
}

impl MetadataEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            named: Vec::new(),
            mandatory: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<MetadataArg>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn named(mut self, name: impl Into<String>, arg: impl Into<MetadataArg>) -> Self {
        self.named.push((name.into(), arg.into()));
        self
    }

    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    /// First argument that cannot be rebuilt, if any
    pub fn irreproducible_arg(&self) -> Option<&MetadataArg> {
        self.args
            .iter()
            .chain(self.named.iter().map(|(_, arg)| arg))
            .find(|arg| !arg.is_reconstructible())
    }
}

impl fmt::Display for MetadataEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}", self.name)?;
        if !self.args.is_empty() || !self.named.is_empty() {
            let mut parts: Vec<String> = self.args.iter().map(|a| a.to_string()).collect();
            parts.extend(self.named.iter().map(|(n, a)| format!("{} = {}", n, a)));
            write!(f, "({})", parts.join(", "))?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconstructible_args() {
        let entry = MetadataEntry::new("Cached")
            .arg(30i64)
            .named("Region", "users");
        assert!(entry.irreproducible_arg().is_none());

        let entry = MetadataEntry::new("Seeded").arg(MetadataArg::List(vec![
            MetadataArg::Int(1),
            MetadataArg::Computed("Random::new()".to_string()),
        ]));
        assert!(entry.irreproducible_arg().is_some());
    }

    #[test]
    fn test_display() {
        let entry = MetadataEntry::new("Route").arg("/users").named("Method", "GET");
        assert_eq!(entry.to_string(), "[Route(\"/users\", Method = \"GET\")]");
        assert_eq!(MetadataEntry::new("Pure").to_string(), "[Pure]");
    }
}
