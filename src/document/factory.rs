use std::any::TypeId;
use std::sync::Arc;

use crate::codec::ObjectCodec;
use crate::core::{Result, StoreError};
use crate::entity::{AnyEntity, TypeRegistry};
use crate::key::KeyDefinition;

use super::Document;

/// Converts entities to Documents and back, using a key definition for
/// identity and the registry + codec for the payload.
#[derive(Clone)]
pub struct DocumentFactory {
    registry: Arc<TypeRegistry>,
    codec: Arc<dyn ObjectCodec>,
}

impl DocumentFactory {
    pub fn new(registry: Arc<TypeRegistry>, codec: Arc<dyn ObjectCodec>) -> Self {
        Self { registry, codec }
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Encode the entity under this key definition's identity.
    pub fn as_document<T>(&self, entity: &T, key: &KeyDefinition) -> Result<Document>
    where
        T: Send + Sync + 'static,
    {
        let descriptor = self.registry.of::<T>()?;
        let payload = self.codec.encode(entity, &descriptor)?;
        self.build(entity, key, descriptor.tag(), payload)
    }

    /// Project an already-encoded entity into another view's Document shape,
    /// reusing the payload bytes instead of re-encoding per view.
    pub fn as_document_with_payload<T>(
        &self,
        entity: &T,
        key: &KeyDefinition,
        payload: Vec<u8>,
    ) -> Result<Document>
    where
        T: Send + Sync + 'static,
    {
        let descriptor = self.registry.of::<T>()?;
        self.build(entity, key, descriptor.tag(), payload)
    }

    /// Encode once; callers fan the returned bytes out across views via
    /// [`Self::as_document_with_payload`].
    pub fn encode_payload<T>(&self, entity: &T) -> Result<Vec<u8>>
    where
        T: Send + Sync + 'static,
    {
        let descriptor = self.registry.of::<T>()?;
        self.codec.encode(entity, &descriptor)
    }

    /// Decode a Document back into its entity via the persisted type tag.
    pub fn as_entity<T>(&self, document: &Document) -> Result<T>
    where
        T: Send + Sync + 'static,
    {
        let descriptor = self.registry.for_tag(document.type_tag())?;
        if descriptor.type_id() != TypeId::of::<T>() {
            return Err(StoreError::Descriptor(format!(
                "document tag '{}' decodes to {}, not the requested type",
                document.type_tag(),
                descriptor.type_name()
            )));
        }

        let decoded = self.codec.decode(document.payload(), &descriptor)?;
        decoded
            .downcast::<T>()
            .map(|entity| *entity)
            .map_err(|_| {
                StoreError::Descriptor(format!(
                    "decoded entity for tag '{}' has an unexpected runtime type",
                    document.type_tag()
                ))
            })
    }

    fn build<T>(
        &self,
        entity: &T,
        key: &KeyDefinition,
        tag: &str,
        payload: Vec<u8>,
    ) -> Result<Document>
    where
        T: Send + Sync + 'static,
    {
        let descriptor = self.registry.of::<T>()?;
        let identifier = key.identifier(entity as &AnyEntity, &descriptor)?;
        let mut document = Document::new(tag, payload);
        document.set_identifier(&identifier);
        Ok(document)
    }
}
