use async_trait::async_trait;

use crate::core::{Identifier, Result, Value};
use crate::document::Document;

/// A statement handle: what to run against one view, produced by a
/// [`StatementGenerator`] and interpreted by a [`StatementExecutor`]. The
/// engine never looks inside one after generating it.
#[derive(Debug, Clone)]
pub struct Statement {
    view: String,
    kind: StatementKind,
}

#[derive(Debug, Clone)]
pub enum StatementKind {
    Insert { document: Document },
    Update { document: Document },
    Delete { identifier: Identifier },
    Exists { identifier: Identifier },
    Read { identifier: Identifier },
    ReadAll {
        page_size: usize,
        paging_token: Option<String>,
        params: Vec<Value>,
    },
}

impl Statement {
    pub fn new(view: impl Into<String>, kind: StatementKind) -> Self {
        Self {
            view: view.into(),
            kind,
        }
    }

    pub fn view(&self) -> &str {
        &self.view
    }

    pub fn kind(&self) -> &StatementKind {
        &self.kind
    }

    pub fn into_kind(self) -> StatementKind {
        self.kind
    }

    pub fn is_mutation(&self) -> bool {
        matches!(
            self.kind,
            StatementKind::Insert { .. } | StatementKind::Update { .. } | StatementKind::Delete { .. }
        )
    }
}

/// Builds statements for one view. One generator instance per view name.
pub trait StatementGenerator: Send + Sync {
    fn view(&self) -> &str;

    fn create(&self, document: &Document) -> Result<Statement>;

    fn update(&self, document: &Document) -> Result<Statement>;

    fn delete(&self, identifier: &Identifier) -> Result<Statement>;

    fn exists(&self, identifier: &Identifier) -> Result<Statement>;

    fn read(&self, identifier: &Identifier) -> Result<Statement>;

    fn read_all(
        &self,
        page_size: usize,
        paging_token: Option<&str>,
        params: &[Value],
    ) -> Result<Statement>;
}

/// How a group of mutating statements is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    /// Store-level atomic batch: all or none.
    Logged,
    /// Grouped for efficiency, no atomicity across partitions.
    Unlogged,
}

/// What came back from the store for one statement or batch.
#[derive(Debug, Clone)]
pub enum ExecutionResult {
    /// Single-row result; `None` means no matching row.
    Row(Option<Document>),
    /// Row set plus the opaque continuation token for the next page.
    Rows {
        documents: Vec<Document>,
        paging_token: Option<String>,
    },
    /// Whether a mutation or batch was applied.
    Applied(bool),
}

/// Runs statements against the real store. All I/O suspends here.
#[async_trait]
pub trait StatementExecutor: Send + Sync {
    async fn execute(&self, statement: Statement) -> Result<ExecutionResult>;

    async fn execute_batch(
        &self,
        statements: Vec<Statement>,
        kind: BatchKind,
    ) -> Result<ExecutionResult>;
}

/// Default generator: wraps arguments into [`Statement`] handles for a named
/// view. A store-specific integration would render its query language here
/// instead.
#[derive(Debug, Clone)]
pub struct ViewStatementGenerator {
    view: String,
}

impl ViewStatementGenerator {
    pub fn new(view: impl Into<String>) -> Self {
        Self { view: view.into() }
    }
}

impl StatementGenerator for ViewStatementGenerator {
    fn view(&self) -> &str {
        &self.view
    }

    fn create(&self, document: &Document) -> Result<Statement> {
        Ok(Statement::new(self.view.as_str(), StatementKind::Insert {
            document: document.clone(),
        }))
    }

    fn update(&self, document: &Document) -> Result<Statement> {
        Ok(Statement::new(self.view.as_str(), StatementKind::Update {
            document: document.clone(),
        }))
    }

    fn delete(&self, identifier: &Identifier) -> Result<Statement> {
        Ok(Statement::new(self.view.as_str(), StatementKind::Delete {
            identifier: identifier.clone(),
        }))
    }

    fn exists(&self, identifier: &Identifier) -> Result<Statement> {
        Ok(Statement::new(self.view.as_str(), StatementKind::Exists {
            identifier: identifier.clone(),
        }))
    }

    fn read(&self, identifier: &Identifier) -> Result<Statement> {
        Ok(Statement::new(self.view.as_str(), StatementKind::Read {
            identifier: identifier.clone(),
        }))
    }

    fn read_all(
        &self,
        page_size: usize,
        paging_token: Option<&str>,
        params: &[Value],
    ) -> Result<Statement> {
        Ok(Statement::new(self.view.as_str(), StatementKind::ReadAll {
            page_size,
            paging_token: paging_token.map(|token| token.to_string()),
            params: params.to_vec(),
        }))
    }
}

/// One page of decoded results plus the opaque cursor for the next page.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub cursor: Option<String>,
}

impl<T> Page<T> {
    pub fn has_more(&self) -> bool {
        self.cursor.is_some()
    }
}
