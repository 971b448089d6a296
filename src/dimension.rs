//! # Dimension
//!
//! Name/value tag attached to every metric flushed by an accumulator

use serde::Serialize;
use std::hash::{Hash, Hasher};

/// A named tag carried by every metric an accumulator submits
///
/// Equality and hashing depend on the name only, so a `HashSet<Dimension>`
/// behaves as a name-keyed map. Derivation relies on this to reject
/// duplicate dimension names rather than silently overwrite them.
#[derive(Debug, Clone, Serialize)]
pub struct Dimension {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Value")]
    pub value: String,
}

impl Dimension {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

// Dimensions are unique by name
impl PartialEq for Dimension {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Dimension {}

impl Hash for Dimension {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}
