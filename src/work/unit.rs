use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use log::{debug, warn};

use crate::core::{Identifier, Result, StoreError};
use crate::document::Document;
use crate::statement::{
    BatchKind, ExecutionResult, Statement, StatementExecutor, StatementGenerator,
};

use super::change::{Change, ChangeSet, ChangeState};

/// How a unit of work hands its generated statements to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommitStrategy {
    /// One atomic multi-partition batch. Strongest, slowest.
    #[default]
    LoggedBatch,
    /// One grouped batch without cross-partition atomicity.
    UnloggedBatch,
    /// Every statement issued independently and concurrently; success means
    /// all requests acknowledged, with no cross-statement atomicity at all.
    Async,
}

impl fmt::Display for CommitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoggedBatch => write!(f, "logged-batch"),
            Self::UnloggedBatch => write!(f, "unlogged-batch"),
            Self::Async => write!(f, "async"),
        }
    }
}

/// A view this unit of work may write to: its statement generator and
/// whether identities in it must be unique.
#[derive(Clone)]
pub struct ViewBinding {
    generator: Arc<dyn StatementGenerator>,
    unique: bool,
}

impl ViewBinding {
    pub fn new(generator: Arc<dyn StatementGenerator>, unique: bool) -> Self {
        Self { generator, unique }
    }
}

/// Tracks the pending changes of one logical operation across all of an
/// entity's projections and commits them through the configured strategy.
///
/// Registration does no I/O. `commit` first issues every required existence
/// check concurrently and waits for all of them (a hard barrier, not a
/// pipeline), then translates each change into exactly one statement and
/// dispatches the lot.
pub struct UnitOfWork {
    executor: Arc<dyn StatementExecutor>,
    views: HashMap<String, ViewBinding>,
    changes: ChangeSet,
    strategy: CommitStrategy,
}

impl UnitOfWork {
    pub fn new(executor: Arc<dyn StatementExecutor>, strategy: CommitStrategy) -> Self {
        Self {
            executor,
            views: HashMap::new(),
            changes: ChangeSet::new(),
            strategy,
        }
    }

    pub fn bind_view(&mut self, view: impl Into<String>, binding: ViewBinding) {
        self.views.insert(view.into(), binding);
    }

    pub fn strategy(&self) -> CommitStrategy {
        self.strategy
    }

    pub fn register_new(&mut self, view: &str, document: Document) -> Result<()> {
        self.register(ChangeState::New, view, document)
    }

    pub fn register_dirty(&mut self, view: &str, document: Document) -> Result<()> {
        self.register(ChangeState::Dirty, view, document)
    }

    pub fn register_deleted(&mut self, view: &str, document: Document) -> Result<()> {
        self.register(ChangeState::Deleted, view, document)
    }

    pub fn register_clean(&mut self, view: &str, document: Document) -> Result<()> {
        self.register(ChangeState::Clean, view, document)
    }

    /// The previously registered CLEAN snapshot for one identity, the diff
    /// baseline for identity-changing updates.
    pub fn clean(&self, view: &str, identifier: &Identifier) -> Option<&Document> {
        self.changes.clean(view, identifier)
    }

    pub fn pending_len(&self) -> usize {
        self.changes.pending_len()
    }

    fn register(&mut self, state: ChangeState, view: &str, document: Document) -> Result<()> {
        if !self.views.contains_key(view) {
            return Err(StoreError::Configuration(format!(
                "view '{}' is not bound to this unit of work",
                view
            )));
        }
        self.changes.register(Change::new(state, view, document)?);
        Ok(())
    }

    fn binding(&self, view: &str) -> Result<&ViewBinding> {
        self.views.get(view).ok_or_else(|| {
            StoreError::Configuration(format!("view '{}' is not bound to this unit of work", view))
        })
    }

    /// Commit every pending change.
    ///
    /// Uniqueness violations surface as `DuplicateItem`/`ItemNotFound`;
    /// transport and batch failures are wrapped in `CommitFailed` with the
    /// original cause.
    pub async fn commit(&mut self) -> Result<()> {
        let mut pending = self.changes.take_pending();
        if pending.is_empty() {
            return Ok(());
        }

        debug!(
            "committing {} change(s) via {} strategy",
            pending.len(),
            self.strategy
        );

        self.enforce_uniqueness(&pending).await?;

        // Timestamp refresh happens at write time, not registration time.
        let mut statements = Vec::with_capacity(pending.len());
        for change in &mut pending {
            change.document_mut().touch();
            let binding = self.binding(change.view())?;
            let statement = match change.state() {
                ChangeState::New => binding.generator.create(change.document()),
                ChangeState::Dirty => binding.generator.update(change.document()),
                ChangeState::Deleted => binding.generator.delete(change.identifier()),
                ChangeState::Clean => continue,
            };
            statements.push(statement.map_err(StoreError::commit_failed)?);
        }

        match self.strategy {
            CommitStrategy::LoggedBatch => self.commit_batch(statements, BatchKind::Logged).await,
            CommitStrategy::UnloggedBatch => {
                self.commit_batch(statements, BatchKind::Unlogged).await
            }
            CommitStrategy::Async => self.commit_async(statements).await,
        }
    }

    /// No-op under the batch strategies: the store's batch is the unit of
    /// atomicity. Unsupported under the async strategy, where acknowledged
    /// writes cannot be recalled.
    pub fn rollback(&mut self) -> Result<()> {
        match self.strategy {
            CommitStrategy::LoggedBatch | CommitStrategy::UnloggedBatch => Ok(()),
            CommitStrategy::Async => {
                Err(StoreError::RollbackUnsupported(self.strategy.to_string()))
            }
        }
    }

    /// Issue every existence check concurrently and evaluate the uniqueness
    /// rules only after all of them resolved.
    async fn enforce_uniqueness(&self, pending: &[Change]) -> Result<()> {
        let mut checked = Vec::new();
        let mut futures = Vec::new();

        for (index, change) in pending.iter().enumerate() {
            let binding = self.binding(change.view())?;
            if !binding.unique {
                continue;
            }
            let statement = binding
                .generator
                .exists(change.identifier())
                .map_err(StoreError::commit_failed)?;
            let executor = self.executor.clone();
            checked.push(index);
            futures.push(async move { executor.execute(statement).await });
        }

        if futures.is_empty() {
            return Ok(());
        }

        let results = join_all(futures).await;

        for (index, result) in checked.into_iter().zip(results) {
            let change = &pending[index];
            let exists = match result.map_err(StoreError::commit_failed)? {
                ExecutionResult::Row(row) => row.is_some(),
                ExecutionResult::Applied(applied) => applied,
                ExecutionResult::Rows { documents, .. } => !documents.is_empty(),
            };

            match change.state() {
                ChangeState::New if exists => {
                    return Err(StoreError::DuplicateItem {
                        view: change.view().to_string(),
                        identifier: change.identifier().to_string(),
                    });
                }
                ChangeState::Dirty | ChangeState::Deleted if !exists => {
                    return Err(StoreError::ItemNotFound {
                        view: change.view().to_string(),
                        identifier: change.identifier().to_string(),
                    });
                }
                _ => {}
            }
        }

        Ok(())
    }

    async fn commit_batch(&self, statements: Vec<Statement>, kind: BatchKind) -> Result<()> {
        let result = self
            .executor
            .execute_batch(statements, kind)
            .await
            .map_err(StoreError::commit_failed)?;

        match result {
            ExecutionResult::Applied(true) => Ok(()),
            ExecutionResult::Applied(false) => Err(StoreError::commit_failed(
                StoreError::Execution("batch was not applied".to_string()),
            )),
            _ => Ok(()),
        }
    }

    /// Weakest mode: every statement goes out on its own. A partial failure
    /// leaves acknowledged writes in place; there is no compensation.
    async fn commit_async(&self, statements: Vec<Statement>) -> Result<()> {
        let futures = statements.into_iter().map(|statement| {
            let executor = self.executor.clone();
            async move {
                let view = statement.view().to_string();
                (view, executor.execute(statement).await)
            }
        });

        let mut first_failure = None;
        for (view, result) in join_all(futures).await {
            if let Err(err) = result {
                warn!("async commit write to view '{}' failed: {}", view, err);
                first_failure.get_or_insert(err);
            }
        }

        match first_failure {
            Some(err) => Err(StoreError::commit_failed(err)),
            None => Ok(()),
        }
    }
}
