pub mod descriptor;
pub mod field;
pub mod registry;

pub use descriptor::{DescriptorBuilder, EntityDescriptor};
pub use field::{AnyEntity, FieldDescriptor, FieldKind};
pub use registry::TypeRegistry;
