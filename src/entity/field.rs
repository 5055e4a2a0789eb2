use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::core::{DataType, Result, Value};

use super::descriptor::EntityDescriptor;

/// Entities move through the engine type-erased; accessors registered per
/// concrete type downcast internally.
pub type AnyEntity = dyn Any + Send + Sync;

/// Reads one scalar field off an entity; `None` means the value is absent at
/// runtime (as opposed to the field not existing, which is structural).
pub type ScalarGetter = Arc<dyn Fn(&AnyEntity) -> Option<Value> + Send + Sync>;

/// Writes one scalar field back during decode.
pub type ScalarSetter = Arc<dyn Fn(&mut AnyEntity, Value) -> Result<()> + Send + Sync>;

/// Borrows a nested reference object off an entity.
pub type ReferenceGetter =
    Arc<dyn for<'a> Fn(&'a AnyEntity) -> Option<&'a AnyEntity> + Send + Sync>;

/// Installs a decoded reference object into its parent.
pub type ReferenceSetter =
    Arc<dyn Fn(&mut AnyEntity, Box<AnyEntity>) -> Result<()> + Send + Sync>;

/// What kind of field this is; fixed at registration time and never revisited.
#[derive(Clone)]
pub enum FieldKind {
    /// A field with a declared wire type.
    Scalar {
        data_type: DataType,
        get: ScalarGetter,
        set: ScalarSetter,
    },
    /// A generically-typed field with no declared wire type; the getter
    /// resolves it from the runtime value (or yields `None`, in which case
    /// the field is skipped on encode), and the setter may refuse a value it
    /// cannot apply, in which case it is skipped on decode.
    Opaque { get: ScalarGetter, set: ScalarSetter },
    /// A nested object described by its own descriptor, recursively.
    Reference {
        descriptor: Arc<EntityDescriptor>,
        get: ReferenceGetter,
        set: ReferenceSetter,
    },
}

#[derive(Clone)]
pub struct FieldDescriptor {
    name: String,
    kind: FieldKind,
}

impl FieldDescriptor {
    pub(crate) fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn is_reference(&self) -> bool {
        matches!(self.kind, FieldKind::Reference { .. })
    }

    /// Declared type for scalar fields; opaque and reference fields have none.
    pub fn data_type(&self) -> Option<DataType> {
        match &self.kind {
            FieldKind::Scalar { data_type, .. } => Some(*data_type),
            _ => None,
        }
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            FieldKind::Scalar { data_type, .. } => format!("scalar({})", data_type),
            FieldKind::Opaque { .. } => "opaque".to_string(),
            FieldKind::Reference { descriptor, .. } => {
                format!("reference({})", descriptor.tag())
            }
        };
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("kind", &kind)
            .finish()
    }
}
