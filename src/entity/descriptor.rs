use std::any::{Any, TypeId};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::core::{DataType, Result, StoreError, Value};

use super::field::{
    AnyEntity, FieldDescriptor, FieldKind, ReferenceGetter, ReferenceSetter, ScalarGetter,
    ScalarSetter,
};

type Instantiate = Arc<dyn Fn() -> Box<AnyEntity> + Send + Sync>;

/// Field map for one concrete entity type, built once by explicit
/// registration and shared for the process lifetime.
///
/// Fields keep their registration order; the payload codec writes them in
/// that order and relies on it for deterministic bytes.
pub struct EntityDescriptor {
    tag: String,
    type_id: TypeId,
    type_name: &'static str,
    fields: Vec<FieldDescriptor>,
    instantiate: Instantiate,
}

impl EntityDescriptor {
    pub fn builder<T>(tag: impl Into<String>) -> DescriptorBuilder<T>
    where
        T: Default + Send + Sync + 'static,
    {
        DescriptorBuilder {
            tag: tag.into(),
            fields: Vec::new(),
            _marker: std::marker::PhantomData,
        }
    }

    /// Short stable tag persisted as the Document's type discriminator.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Runtime type name, for diagnostics only; never persisted.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name() == name)
    }

    /// Fresh default instance for the decode path; primitive fields start at
    /// their zero values and keep them when the payload never mentions them.
    pub fn new_instance(&self) -> Box<AnyEntity> {
        (self.instantiate)()
    }
}

impl fmt::Debug for EntityDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityDescriptor")
            .field("tag", &self.tag)
            .field("type_name", &self.type_name)
            .field("fields", &self.fields)
            .finish()
    }
}

/// Typed registration surface; wraps per-field closures into their
/// type-erased form so the engine can navigate entities uniformly.
pub struct DescriptorBuilder<T> {
    tag: String,
    fields: Vec<FieldDescriptor>,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T> DescriptorBuilder<T>
where
    T: Default + Send + Sync + 'static,
{
    /// Register a scalar field with a declared wire type.
    pub fn scalar<G, S>(mut self, name: &str, data_type: DataType, get: G, set: S) -> Self
    where
        G: Fn(&T) -> Option<Value> + Send + Sync + 'static,
        S: Fn(&mut T, Value) -> Result<()> + Send + Sync + 'static,
    {
        let getter: ScalarGetter = Arc::new(move |entity| {
            entity.downcast_ref::<T>().and_then(|entity| get(entity))
        });
        let setter: ScalarSetter = Arc::new(move |entity, value| {
            let entity = downcast_mut::<T>(entity)?;
            set(entity, value)
        });
        self.fields.push(FieldDescriptor::new(
            name,
            FieldKind::Scalar {
                data_type,
                get: getter,
                set: setter,
            },
        ));
        self
    }

    /// Register a generically-typed field with no statically known wire type.
    /// The getter resolves the runtime value to JSON (or `None` to skip);
    /// the setter may refuse, which skips the field on decode.
    pub fn opaque<G, S>(mut self, name: &str, get: G, set: S) -> Self
    where
        G: Fn(&T) -> Option<serde_json::Value> + Send + Sync + 'static,
        S: Fn(&mut T, serde_json::Value) -> Result<()> + Send + Sync + 'static,
    {
        let getter: ScalarGetter = Arc::new(move |entity| {
            entity
                .downcast_ref::<T>()
                .and_then(|entity| get(entity))
                .map(Value::Json)
        });
        let setter: ScalarSetter = Arc::new(move |entity, value| {
            let entity = downcast_mut::<T>(entity)?;
            match value {
                Value::Json(json) => set(entity, json),
                Value::Null => Ok(()),
                other => Err(StoreError::Codec(format!(
                    "opaque field expected json, got {}",
                    other.type_name()
                ))),
            }
        });
        self.fields
            .push(FieldDescriptor::new(name, FieldKind::Opaque {
                get: getter,
                set: setter,
            }));
        self
    }

    /// Register a nested reference field described by a child descriptor.
    pub fn reference<R, G, S>(
        mut self,
        name: &str,
        descriptor: Arc<EntityDescriptor>,
        get: G,
        set: S,
    ) -> Self
    where
        R: Send + Sync + 'static,
        G: for<'a> Fn(&'a T) -> Option<&'a R> + Send + Sync + 'static,
        S: Fn(&mut T, R) -> Result<()> + Send + Sync + 'static,
    {
        let getter: ReferenceGetter = Arc::new(move |entity: &AnyEntity| {
            entity
                .downcast_ref::<T>()
                .and_then(|entity| get(entity))
                .map(|child| child as &AnyEntity)
        });
        let setter: ReferenceSetter = Arc::new(move |entity, child| {
            let entity = downcast_mut::<T>(entity)?;
            let child = child.downcast::<R>().map_err(|_| {
                StoreError::Descriptor(
                    "decoded reference has an unexpected runtime type".to_string(),
                )
            })?;
            set(entity, *child)
        });
        self.fields.push(FieldDescriptor::new(
            name,
            FieldKind::Reference {
                descriptor,
                get: getter,
                set: setter,
            },
        ));
        self
    }

    pub fn build(self) -> Result<Arc<EntityDescriptor>> {
        if self.tag.trim().is_empty() {
            return Err(StoreError::Descriptor(
                "entity descriptor requires a non-empty type tag".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name().to_string()) {
                return Err(StoreError::Descriptor(format!(
                    "duplicate field '{}' in descriptor '{}'",
                    field.name(),
                    self.tag
                )));
            }
        }

        Ok(Arc::new(EntityDescriptor {
            tag: self.tag,
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            fields: self.fields,
            instantiate: Arc::new(|| Box::new(T::default()) as Box<AnyEntity>),
        }))
    }
}

fn downcast_mut<T: Any>(entity: &mut AnyEntity) -> Result<&mut T> {
    entity.downcast_mut::<T>().ok_or_else(|| {
        StoreError::Descriptor(format!(
            "entity is not a {}",
            std::any::type_name::<T>()
        ))
    })
}
