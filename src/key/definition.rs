use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::core::{Identifier, Result, StoreError, Value};
use crate::entity::field::{AnyEntity, FieldKind, ReferenceGetter, ScalarGetter};
use crate::entity::EntityDescriptor;

use super::component::{ClusteringKeyComponent, KeyComponent};
use super::parser;

/// A property path resolved against a concrete entity type: the chain of
/// reference hops plus the scalar leaf accessor. Resolved once per
/// (entity type, path) and cached.
struct ResolvedPath {
    hops: Vec<ReferenceGetter>,
    leaf: ScalarGetter,
}

impl ResolvedPath {
    /// Walk the entity; `None` anywhere along the chain means the value is
    /// absent at runtime.
    fn extract(&self, entity: &AnyEntity) -> Option<Value> {
        let mut current = entity;
        for hop in &self.hops {
            current = hop(current)?;
        }
        (self.leaf)(current)
    }
}

/// An ordered partition-key component list plus an ordered clustering-key
/// component list and a uniqueness flag; the compiled form of a key spec.
///
/// Valid iff it has at least one partition component. Knows how to extract
/// an [`Identifier`] from an entity and how to render the column fragments
/// an external statement generator needs.
pub struct KeyDefinition {
    partition: Vec<KeyComponent>,
    clustering: Vec<ClusteringKeyComponent>,
    unique: bool,
    paths: RwLock<HashMap<(TypeId, String), Arc<ResolvedPath>>>,
}

impl KeyDefinition {
    pub fn new(partition: Vec<KeyComponent>, clustering: Vec<ClusteringKeyComponent>) -> Self {
        Self {
            partition,
            clustering,
            unique: false,
            paths: RwLock::new(HashMap::new()),
        }
    }

    /// Compile a textual key spec. See [`parser::parse`] for the grammar.
    pub fn parse(spec: &str) -> Result<Self> {
        parser::parse(spec)
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub(crate) fn set_unique(&mut self, unique: bool) {
        self.unique = unique;
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn partition_components(&self) -> &[KeyComponent] {
        &self.partition
    }

    pub fn clustering_components(&self) -> &[ClusteringKeyComponent] {
        &self.clustering
    }

    /// All components in identity-tuple order: partition first, then
    /// clustering.
    pub fn components(&self) -> impl Iterator<Item = &KeyComponent> {
        self.partition
            .iter()
            .chain(self.clustering.iter().map(|c| c.component()))
    }

    pub fn is_valid(&self) -> bool {
        !self.partition.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(StoreError::KeyDefinition(
                "a key definition requires at least one partition-key component".to_string(),
            ))
        }
    }

    /// Column list fragment, e.g. `alpha uuid,beta text`.
    pub fn column_spec(&self) -> String {
        self.components()
            .map(|c| format!("{} {}", c.column(), c.data_type()))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Primary-key clause, e.g. `primary key ((alpha,beta),gamma)`.
    pub fn primary_key_clause(&self) -> String {
        let partition = self
            .partition
            .iter()
            .map(|c| c.column().to_string())
            .collect::<Vec<_>>()
            .join(",");

        if self.clustering.is_empty() {
            return format!("primary key ({})", partition);
        }

        let clustering = self
            .clustering
            .iter()
            .map(|c| c.component().column().to_string())
            .collect::<Vec<_>>()
            .join(",");

        if self.partition.len() == 1 {
            format!("primary key ({},{})", partition, clustering)
        } else {
            format!("primary key (({}),{})", partition, clustering)
        }
    }

    /// Clustering-order clause, e.g. `with clustering order by (gamma desc)`;
    /// empty when there is no clustering key.
    pub fn clustering_order_clause(&self) -> String {
        if self.clustering.is_empty() {
            return String::new();
        }

        let order = self
            .clustering
            .iter()
            .map(|c| format!("{} {}", c.component().column(), c.order()))
            .collect::<Vec<_>>()
            .join(",");
        format!("with clustering order by ({})", order)
    }

    /// Extract the identity tuple for one entity.
    ///
    /// A property path that does not resolve against the descriptor chain is
    /// structural; a path that resolves but yields no value is data-level.
    /// Both error kinds accumulate every offending property before raising,
    /// so the message names all of them, not just the first.
    pub fn identifier(
        &self,
        entity: &AnyEntity,
        descriptor: &EntityDescriptor,
    ) -> Result<Identifier> {
        self.validate()?;

        let mut unresolved = Vec::new();
        let mut missing = Vec::new();
        let mut components = Vec::new();

        for component in self.components() {
            let path = match self.resolve_path(descriptor, component.property()) {
                Ok(path) => path,
                Err(_) => {
                    unresolved.push(component.property().to_string());
                    continue;
                }
            };

            match path.extract(entity) {
                Some(value) => {
                    let value = component.apply_transform(value);
                    components.push(component.data_type().coerce(value)?);
                }
                None => missing.push(component.property().to_string()),
            }
        }

        if !unresolved.is_empty() {
            return Err(StoreError::KeyDefinition(format!(
                "unresolvable key properties: {}",
                unresolved.join(", ")
            )));
        }
        if !missing.is_empty() {
            return Err(StoreError::InvalidIdentifier(missing));
        }

        Ok(Identifier::new(components))
    }

    /// Resolve (and memoize) one dotted property path against a descriptor
    /// chain. A duplicate racing population writes an equivalent entry, which
    /// is benign.
    fn resolve_path(
        &self,
        descriptor: &EntityDescriptor,
        property: &str,
    ) -> Result<Arc<ResolvedPath>> {
        let key = (descriptor.type_id(), property.to_string());

        if let Some(path) = self.paths.read()?.get(&key) {
            return Ok(path.clone());
        }

        let path = Arc::new(resolve_uncached(descriptor, property)?);
        self.paths.write()?.insert(key, path.clone());
        Ok(path)
    }
}

fn resolve_uncached(descriptor: &EntityDescriptor, property: &str) -> Result<ResolvedPath> {
    let structural = || {
        StoreError::KeyDefinition(format!(
            "property '{}' does not resolve on '{}'",
            property,
            descriptor.type_name()
        ))
    };

    let mut segments = property.split('.').peekable();
    let mut current = descriptor;
    let mut hops = Vec::new();

    while let Some(segment) = segments.next() {
        let field = current.field(segment).ok_or_else(structural)?;
        let is_last = segments.peek().is_none();

        match field.kind() {
            FieldKind::Scalar { get, .. } | FieldKind::Opaque { get, .. } if is_last => {
                return Ok(ResolvedPath {
                    hops,
                    leaf: get.clone(),
                });
            }
            FieldKind::Reference {
                descriptor: child,
                get,
                ..
            } if !is_last => {
                hops.push(get.clone());
                current = child.as_ref();
            }
            _ => return Err(structural()),
        }
    }

    Err(structural())
}

impl fmt::Display for KeyDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let partition = self
            .partition
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(", ");

        if self.partition.len() > 1 {
            write!(f, "({})", partition)?;
        } else {
            write!(f, "{}", partition)?;
        }

        for clustering in &self.clustering {
            write!(f, ", {}", clustering)?;
        }

        if self.unique {
            write!(f, " unique")?;
        }
        Ok(())
    }
}

impl fmt::Debug for KeyDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyDefinition")
            .field("partition", &self.partition)
            .field("clustering", &self.clustering)
            .field("unique", &self.unique)
            .finish()
    }
}
