// ============================================================================
// ViewStore Library
// ============================================================================

pub mod codec;
pub mod core;
pub mod document;
pub mod entity;
pub mod key;
pub mod memory;
pub mod prelude;
pub mod repository;
pub mod schema;
pub mod statement;
pub mod work;

// Re-export main types for convenience
pub use core::{DataType, Identifier, Result, StoreError, Value};
pub use document::{Document, DocumentFactory};
pub use key::KeyDefinition;
pub use repository::Repository;
pub use work::{CommitStrategy, UnitOfWork};

// ============================================================================
// High-level API
// ============================================================================

// A wide-column store keeps one canonical row per entity plus any number of
// denormalized views under alternate keys, with no cross-partition
// transactions to keep them in sync. This crate supplies the missing
// consistency layer:
//
// - describe each projection's key with a small textual DSL
//   (`"(tenant:uuid, id:uuid), -created:timestamp unique"`),
// - register each entity type's fields once with a descriptor builder
//   (no runtime reflection),
// - go through a `Repository` for CRUD; every operation runs as one unit of
//   work that existence-checks unique projections up front and then commits
//   all per-view statements through a configurable batch strategy.
//
// The store itself stays behind two narrow traits (`StatementGenerator`,
// `StatementExecutor`); `MemoryStore` is the built-in reference
// implementation used by the integration tests.
