use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a node within one strategy tree.
///
/// Taken verbatim from the source document when the document carries one,
/// otherwise derived deterministically from the node's position so that the
/// same tree always re-traverses to the same ids. Branch-tracker columns are
/// keyed by these ids, so they must survive recompilation unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn from_document(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive an id from a node's path in the tree (e.g. `"group@0/2"`).
    ///
    /// BLAKE3 keeps the derivation stable across builds and platforms;
    /// 12 hex chars are plenty inside a single tree.
    pub fn from_path(path: &str) -> Self {
        let hash = blake3::hash(path.as_bytes());
        Self(hash.to_hex()[..12].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
