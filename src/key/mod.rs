pub mod component;
pub mod definition;
pub mod parser;

pub use component::{ClusteringKeyComponent, KeyComponent, SortOrder, ValueTransform};
pub use definition::KeyDefinition;
pub use parser::parse;
