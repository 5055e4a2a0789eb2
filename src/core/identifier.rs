use std::fmt;

use serde::{Deserialize, Serialize};

use super::Value;

/// Ordered, immutable tuple of typed values naming one entity within one
/// projection. Equality, ordering and hashing are component-wise, so an
/// Identifier can key an ordered or hashed map directly.
///
/// Documents always hold their own copy; nothing hands out a shared alias
/// that a caller could mutate behind tracked state.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Identifier {
    components: Vec<Value>,
}

impl Identifier {
    pub fn new(components: Vec<Value>) -> Self {
        Self { components }
    }

    pub fn single(component: impl Into<Value>) -> Self {
        Self {
            components: vec![component.into()],
        }
    }

    pub fn components(&self) -> &[Value] {
        &self.components
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Component-wise prefix match, used by partial-key reads: an empty
    /// prefix matches everything.
    pub fn starts_with(&self, prefix: &[Value]) -> bool {
        prefix.len() <= self.components.len()
            && self.components[..prefix.len()] == *prefix
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        write!(f, "(")?;
        for component in &self.components {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}", component)?;
            first = false;
        }
        write!(f, ")")
    }
}

impl From<Vec<Value>> for Identifier {
    fn from(components: Vec<Value>) -> Self {
        Self::new(components)
    }
}
