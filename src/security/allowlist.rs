//! Namespace allowlist.
//!
//! # Responsibilities
//! - Parse the raw comma-separated allowlist into a set
//! - Answer tenancy questions for a single namespace
//!
//! # Design Decisions
//! - An empty set denies everything; a forgotten allowlist never opens access
//! - Membership is an exact, case-sensitive string match

use std::collections::BTreeSet;

/// The set of namespaces a deployment may act on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedNamespaces {
    names: BTreeSet<String>,
}

impl AllowedNamespaces {
    /// Split `raw` on commas, trim each entry and drop empty ones.
    pub fn parse(raw: &str) -> Self {
        let names = raw
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        Self { names }
    }

    /// Returns `false` for every namespace when the set is empty.
    pub fn is_allowed(&self, namespace: &str) -> bool {
        if self.names.is_empty() {
            return false;
        }
        self.names.contains(namespace)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Namespaces in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}
