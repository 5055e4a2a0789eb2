pub mod messagepack;

pub use messagepack::MessagePackCodec;

use std::sync::Arc;

use crate::core::Result;
use crate::entity::{AnyEntity, EntityDescriptor};

/// Serializes entities to payload bytes and back.
///
/// Implementations must be deterministic for an unchanged entity: the engine
/// encodes once per operation and reuses the bytes across every view of that
/// entity.
pub trait ObjectCodec: Send + Sync {
    fn encode(&self, entity: &AnyEntity, descriptor: &EntityDescriptor) -> Result<Vec<u8>>;

    fn decode(&self, bytes: &[u8], descriptor: &EntityDescriptor) -> Result<Box<AnyEntity>>;
}

impl<C: ObjectCodec + ?Sized> ObjectCodec for Arc<C> {
    fn encode(&self, entity: &AnyEntity, descriptor: &EntityDescriptor) -> Result<Vec<u8>> {
        (**self).encode(entity, descriptor)
    }

    fn decode(&self, bytes: &[u8], descriptor: &EntityDescriptor) -> Result<Box<AnyEntity>> {
        (**self).decode(bytes, descriptor)
    }
}
