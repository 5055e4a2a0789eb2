use log::debug;

use crate::core::{Result, StoreError, Value};
use crate::entity::field::{AnyEntity, FieldKind};
use crate::entity::EntityDescriptor;

use super::ObjectCodec;

/// Default payload codec: MessagePack over descriptor-driven field walks.
///
/// Encoding writes `(name, value)` pairs in field-registration order, which
/// keeps the bytes deterministic for an unchanged entity. Decoding is
/// tolerant of unknown field names (skips them) and of opaque values the
/// target type cannot absorb.
#[derive(Debug, Default, Clone, Copy)]
pub struct MessagePackCodec;

impl MessagePackCodec {
    pub fn new() -> Self {
        Self
    }

    fn fields_of(
        &self,
        entity: &AnyEntity,
        descriptor: &EntityDescriptor,
    ) -> Result<Vec<(String, Value)>> {
        let mut pairs = Vec::with_capacity(descriptor.fields().len());

        for field in descriptor.fields() {
            match field.kind() {
                FieldKind::Scalar { get, .. } => {
                    let value = get(entity).unwrap_or(Value::Null);
                    pairs.push((field.name().to_string(), value));
                }
                FieldKind::Opaque { get, .. } => {
                    // No static codec; resolvable only from the runtime
                    // value. Unresolvable means skip, not fail.
                    match get(entity) {
                        Some(value) => pairs.push((field.name().to_string(), value)),
                        None => debug!(
                            "skipping unresolvable opaque field '{}' on '{}'",
                            field.name(),
                            descriptor.tag()
                        ),
                    }
                }
                FieldKind::Reference {
                    descriptor: child_descriptor,
                    get,
                    ..
                } => match get(entity) {
                    Some(child) => {
                        let nested = self.fields_of(child, child_descriptor)?;
                        pairs.push((field.name().to_string(), Value::Nested(nested)));
                    }
                    None => pairs.push((field.name().to_string(), Value::Null)),
                },
            }
        }

        Ok(pairs)
    }

    fn populate(
        &self,
        entity: &mut AnyEntity,
        descriptor: &EntityDescriptor,
        pairs: Vec<(String, Value)>,
    ) -> Result<()> {
        for (name, value) in pairs {
            let Some(field) = descriptor.field(&name) else {
                // Unknown field name, likely written by a newer schema.
                debug!("skipping unknown field '{}' for '{}'", name, descriptor.tag());
                continue;
            };

            match field.kind() {
                FieldKind::Scalar { data_type, set, .. } => {
                    let value = data_type.coerce(value)?;
                    set(&mut *entity, value)?;
                }
                FieldKind::Opaque { set, .. } => {
                    if let Err(err) = set(&mut *entity, value) {
                        debug!(
                            "skipping opaque field '{}' on '{}': {}",
                            name,
                            descriptor.tag(),
                            err
                        );
                    }
                }
                FieldKind::Reference {
                    descriptor: child_descriptor,
                    set,
                    ..
                } => match value {
                    Value::Null => {}
                    Value::Nested(nested) => {
                        let mut child = child_descriptor.new_instance();
                        self.populate(child.as_mut(), child_descriptor, nested)?;
                        set(&mut *entity, child)?;
                    }
                    other => {
                        return Err(StoreError::Codec(format!(
                            "reference field '{}' expected a nested value, got {}",
                            name,
                            other.type_name()
                        )));
                    }
                },
            }
        }

        Ok(())
    }
}

impl ObjectCodec for MessagePackCodec {
    fn encode(&self, entity: &AnyEntity, descriptor: &EntityDescriptor) -> Result<Vec<u8>> {
        let pairs = self.fields_of(entity, descriptor)?;
        rmp_serde::to_vec(&pairs)
            .map_err(|err| StoreError::Codec(format!("failed to encode payload: {}", err)))
    }

    fn decode(&self, bytes: &[u8], descriptor: &EntityDescriptor) -> Result<Box<AnyEntity>> {
        let pairs: Vec<(String, Value)> = rmp_serde::from_slice(bytes)
            .map_err(|err| StoreError::Codec(format!("failed to decode payload: {}", err)))?;

        // Start from the default instance so primitive fields the payload
        // never mentions keep their zero values.
        let mut entity = descriptor.new_instance();
        self.populate(entity.as_mut(), descriptor, pairs)?;
        Ok(entity)
    }
}
