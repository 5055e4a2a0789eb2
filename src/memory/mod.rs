//! In-memory wide-column store emulation.
//!
//! The reference [`StatementExecutor`]: one ordered map per view, conditional
//! inserts, update-as-write and delete-as-no-op semantics, and hex-encoded
//! offset cursors for paging. Logged batches validate every statement before
//! applying any of them; unlogged batches apply each statement independently.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::core::{Identifier, Result, StoreError, Value};
use crate::document::Document;
use crate::statement::{BatchKind, ExecutionResult, Statement, StatementKind};

type View = BTreeMap<Identifier, Document>;

#[derive(Default)]
pub struct MemoryStore {
    views: RwLock<HashMap<String, View>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Row count of one view; absent views are empty.
    pub async fn view_len(&self, view: &str) -> usize {
        self.views
            .read()
            .await
            .get(view)
            .map(|rows| rows.len())
            .unwrap_or(0)
    }

    /// Snapshot of one view's documents in key order.
    pub async fn view_documents(&self, view: &str) -> Vec<Document> {
        self.views
            .read()
            .await
            .get(view)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }

    fn apply(views: &mut HashMap<String, View>, statement: &Statement) -> Result<ExecutionResult> {
        let view = views.entry(statement.view().to_string()).or_default();

        match statement.kind() {
            StatementKind::Insert { document } => {
                let identifier = required_identifier(document)?;
                if view.contains_key(identifier) {
                    return Err(StoreError::Execution(format!(
                        "row {} already exists in view '{}'",
                        identifier,
                        statement.view()
                    )));
                }
                let mut stored = document.clone();
                stored.touch();
                view.insert(identifier.clone(), stored);
                Ok(ExecutionResult::Applied(true))
            }
            StatementKind::Update { document } => {
                // Wide-column semantics: an update is a write, present or not.
                let identifier = required_identifier(document)?;
                let mut stored = document.clone();
                stored.touch();
                view.insert(identifier.clone(), stored);
                Ok(ExecutionResult::Applied(true))
            }
            StatementKind::Delete { identifier } => {
                view.remove(identifier);
                Ok(ExecutionResult::Applied(true))
            }
            StatementKind::Exists { identifier } => {
                Ok(ExecutionResult::Row(view.get(identifier).cloned()))
            }
            StatementKind::Read { identifier } => {
                Ok(ExecutionResult::Row(view.get(identifier).cloned()))
            }
            StatementKind::ReadAll {
                page_size,
                paging_token,
                params,
            } => Self::read_page(view, *page_size, paging_token.as_deref(), params),
        }
    }

    fn read_page(
        view: &View,
        page_size: usize,
        paging_token: Option<&str>,
        params: &[Value],
    ) -> Result<ExecutionResult> {
        let offset = match paging_token {
            Some(token) => decode_paging_token(token)?,
            None => 0,
        };

        let matching: Vec<&Document> = view
            .iter()
            .filter(|(identifier, _)| identifier.starts_with(params))
            .map(|(_, document)| document)
            .collect();

        let documents: Vec<Document> = matching
            .iter()
            .skip(offset)
            .take(page_size)
            .map(|document| (*document).clone())
            .collect();

        let consumed = offset + documents.len();
        let paging_token = if consumed < matching.len() {
            Some(encode_paging_token(consumed))
        } else {
            None
        };

        Ok(ExecutionResult::Rows {
            documents,
            paging_token,
        })
    }
}

#[async_trait]
impl crate::statement::StatementExecutor for MemoryStore {
    async fn execute(&self, statement: Statement) -> Result<ExecutionResult> {
        let mut views = self.views.write().await;
        Self::apply(&mut views, &statement)
    }

    async fn execute_batch(
        &self,
        statements: Vec<Statement>,
        kind: BatchKind,
    ) -> Result<ExecutionResult> {
        let mut views = self.views.write().await;

        match kind {
            BatchKind::Logged => {
                // Validate the whole batch before touching anything: a logged
                // batch is all or none.
                for statement in &statements {
                    if let StatementKind::Insert { document } = statement.kind() {
                        let identifier = required_identifier(document)?;
                        let occupied = views
                            .get(statement.view())
                            .map(|view| view.contains_key(identifier))
                            .unwrap_or(false);
                        if occupied {
                            return Ok(ExecutionResult::Applied(false));
                        }
                    }
                }
                for statement in &statements {
                    Self::apply(&mut views, statement)?;
                }
                Ok(ExecutionResult::Applied(true))
            }
            BatchKind::Unlogged => {
                for statement in &statements {
                    Self::apply(&mut views, statement)?;
                }
                Ok(ExecutionResult::Applied(true))
            }
        }
    }
}

fn required_identifier(document: &Document) -> Result<&Identifier> {
    document.identifier().ok_or_else(|| {
        StoreError::Execution("document has no identifier assigned".to_string())
    })
}

/// Paging state is an offset serialized to bytes and hex-encoded; callers
/// treat it as an opaque cursor and hand it back verbatim.
fn encode_paging_token(offset: usize) -> String {
    hex::encode((offset as u64).to_be_bytes())
}

fn decode_paging_token(token: &str) -> Result<usize> {
    let bytes = hex::decode(token)
        .map_err(|err| StoreError::Execution(format!("malformed paging token: {}", err)))?;
    let bytes: [u8; 8] = bytes
        .try_into()
        .map_err(|_| StoreError::Execution("malformed paging token".to_string()))?;
    Ok(u64::from_be_bytes(bytes) as usize)
}
