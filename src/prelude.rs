//! One-stop imports for application code.

pub use crate::codec::{MessagePackCodec, ObjectCodec};
pub use crate::core::{DataType, Identifier, Result, StoreError, Value};
pub use crate::document::{Document, DocumentFactory};
pub use crate::entity::{DescriptorBuilder, EntityDescriptor, TypeRegistry};
pub use crate::key::{ClusteringKeyComponent, KeyComponent, KeyDefinition, SortOrder};
pub use crate::memory::MemoryStore;
pub use crate::repository::{
    Repository, RepositoryBuilder, RepositoryConfig, RepositoryObserver, ViewSpec,
};
pub use crate::schema::{SchemaProvider, SchemaRegistry};
pub use crate::statement::{
    BatchKind, ExecutionResult, Page, Statement, StatementExecutor, StatementGenerator,
    StatementKind, ViewStatementGenerator,
};
pub use crate::work::{Change, ChangeSet, ChangeState, CommitStrategy, UnitOfWork, ViewBinding};
