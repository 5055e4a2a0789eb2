use std::fmt;
use std::sync::Arc;

use crate::core::{DataType, Value};

/// Optional per-component value rewrite applied after extraction, before type
/// validation (lowercasing an email column, truncating a timestamp to a day
/// bucket, and the like). Attached programmatically; the textual key grammar
/// has no transform syntax.
pub type ValueTransform = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Sort order of a clustering-key component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn marker(&self) -> char {
        match self {
            Self::Ascending => '+',
            Self::Descending => '-',
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "asc"),
            Self::Descending => write!(f, "desc"),
        }
    }
}

/// One partition-key component: a column, the (possibly dotted) entity
/// property feeding it, its declared type, and an optional value transform.
#[derive(Clone)]
pub struct KeyComponent {
    column: String,
    property: String,
    data_type: DataType,
    transform: Option<ValueTransform>,
}

impl KeyComponent {
    pub fn new(
        column: impl Into<String>,
        property: impl Into<String>,
        data_type: DataType,
    ) -> Self {
        Self {
            column: column.into(),
            property: property.into(),
            data_type,
            transform: None,
        }
    }

    /// Column and property share a name, the common case.
    pub fn named(column: impl Into<String> + Clone, data_type: DataType) -> Self {
        Self::new(column.clone(), column, data_type)
    }

    pub fn with_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(transform));
        self
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn apply_transform(&self, value: Value) -> Value {
        match &self.transform {
            Some(transform) => transform(value),
            None => value,
        }
    }

    fn fmt_spec(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.property != self.column {
            write!(f, "{} as ", self.property)?;
        }
        write!(f, "{}:{}", self.column, self.data_type)
    }
}

impl fmt::Display for KeyComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_spec(f)
    }
}

impl fmt::Debug for KeyComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyComponent")
            .field("column", &self.column)
            .field("property", &self.property)
            .field("data_type", &self.data_type)
            .field("has_transform", &self.transform.is_some())
            .finish()
    }
}

/// A clustering-key component: a key component plus a sort order.
#[derive(Debug, Clone)]
pub struct ClusteringKeyComponent {
    component: KeyComponent,
    order: SortOrder,
}

impl ClusteringKeyComponent {
    pub fn new(component: KeyComponent, order: SortOrder) -> Self {
        Self { component, order }
    }

    pub fn component(&self) -> &KeyComponent {
        &self.component
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }
}

impl fmt::Display for ClusteringKeyComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.order.marker(), self.component)
    }
}
