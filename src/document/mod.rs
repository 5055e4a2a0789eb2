pub mod factory;

pub use factory::DocumentFactory;

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::core::Identifier;

/// The storage-shaped projection of an entity: identity, opaque payload
/// bytes, the registry tag used to decode it later, open-ended metadata and
/// write timestamps.
///
/// A Document never holds a live entity reference; it is what crosses the
/// boundary to the store and back.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    identifier: Option<Identifier>,
    payload: Vec<u8>,
    type_tag: String,
    metadata: HashMap<String, String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Document {
    pub fn new(type_tag: impl Into<String>, payload: Vec<u8>) -> Self {
        let now = Utc::now();
        Self {
            identifier: None,
            payload,
            type_tag: type_tag.into(),
            metadata: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn identifier(&self) -> Option<&Identifier> {
        self.identifier.as_ref()
    }

    pub fn has_identifier(&self) -> bool {
        self.identifier.is_some()
    }

    /// Stores its own copy so later mutation of the caller's value cannot
    /// corrupt tracked state.
    pub fn set_identifier(&mut self, identifier: &Identifier) {
        self.identifier = Some(identifier.clone());
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }

    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut HashMap<String, String> {
        &mut self.metadata
    }

    pub fn set_metadata(&mut self, metadata: HashMap<String, String>) {
        self.metadata = metadata;
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Refresh the update timestamp just before a write.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
