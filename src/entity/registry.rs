use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::core::{Result, StoreError};

use super::descriptor::EntityDescriptor;

/// Explicit map from short stable type tag to descriptor, passed by reference
/// to everything that encodes or decodes. Persisted data carries the tag, so
/// renaming a Rust type never invalidates stored rows.
///
/// Read-mostly: registration happens at bootstrap, lookups for the process
/// lifetime. Re-registering the same type is a benign overwrite (descriptors
/// built from the same registration code are interchangeable).
#[derive(Default)]
pub struct TypeRegistry {
    by_tag: RwLock<HashMap<String, Arc<EntityDescriptor>>>,
    by_type: RwLock<HashMap<TypeId, Arc<EntityDescriptor>>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, descriptor: Arc<EntityDescriptor>) -> Result<()> {
        self.by_tag
            .write()?
            .insert(descriptor.tag().to_string(), descriptor.clone());
        self.by_type.write()?.insert(descriptor.type_id(), descriptor);
        Ok(())
    }

    pub fn for_tag(&self, tag: &str) -> Result<Arc<EntityDescriptor>> {
        self.by_tag.read()?.get(tag).cloned().ok_or_else(|| {
            StoreError::Descriptor(format!("no descriptor registered for tag '{}'", tag))
        })
    }

    pub fn for_type_id(&self, type_id: TypeId) -> Result<Arc<EntityDescriptor>> {
        self.by_type.read()?.get(&type_id).cloned().ok_or_else(|| {
            StoreError::Descriptor("no descriptor registered for entity type".to_string())
        })
    }

    pub fn of<T: 'static>(&self) -> Result<Arc<EntityDescriptor>> {
        self.for_type_id(TypeId::of::<T>())
    }

    pub fn tags(&self) -> Result<Vec<String>> {
        let mut tags: Vec<String> = self.by_tag.read()?.keys().cloned().collect();
        tags.sort();
        Ok(tags)
    }
}
