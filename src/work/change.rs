use std::collections::HashMap;

use crate::core::{Identifier, Result, StoreError};
use crate::document::Document;

/// Lifecycle state of one tracked document within a unit of work. Terminal
/// for the duration of the unit; a later registration for the same
/// (view, identifier) replaces the earlier one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeState {
    Clean,
    New,
    Dirty,
    Deleted,
}

/// One tracked mutation (or clean snapshot) of one document in one view.
#[derive(Debug, Clone)]
pub struct Change {
    state: ChangeState,
    view: String,
    document: Document,
}

impl Change {
    pub fn new(state: ChangeState, view: impl Into<String>, document: Document) -> Result<Self> {
        if !document.has_identifier() {
            return Err(StoreError::Configuration(format!(
                "cannot track a document without an identifier (state {:?})",
                state
            )));
        }
        Ok(Self {
            state,
            view: view.into(),
            document,
        })
    }

    pub fn state(&self) -> ChangeState {
        self.state
    }

    pub fn view(&self) -> &str {
        &self.view
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn identifier(&self) -> &Identifier {
        // Enforced non-empty at construction.
        self.document
            .identifier()
            .expect("tracked document always has an identifier")
    }
}

type ChangeKey = (String, Identifier);

/// Per-(view, identifier) bookkeeping: at most one CLEAN snapshot and at most
/// one pending non-CLEAN change. Registering a second pending change for the
/// same key overwrites the first; a unit of work records one logical
/// operation, not a log.
#[derive(Debug, Default)]
pub struct ChangeSet {
    clean: HashMap<ChangeKey, Change>,
    pending: HashMap<ChangeKey, Change>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, change: Change) {
        let key = (change.view().to_string(), change.identifier().clone());
        match change.state() {
            ChangeState::Clean => {
                self.clean.insert(key, change);
            }
            _ => {
                self.pending.insert(key, change);
            }
        }
    }

    pub fn clean(&self, view: &str, identifier: &Identifier) -> Option<&Document> {
        self.clean
            .get(&(view.to_string(), identifier.clone()))
            .map(|change| change.document())
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drain the pending changes in a deterministic (view, identifier) order.
    pub fn take_pending(&mut self) -> Vec<Change> {
        let mut changes: Vec<Change> = self.pending.drain().map(|(_, change)| change).collect();
        changes.sort_by(|a, b| {
            a.view()
                .cmp(b.view())
                .then_with(|| a.identifier().cmp(b.identifier()))
        });
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;

    fn document(id: i64) -> Document {
        let mut document = Document::new("t", vec![1, 2, 3]);
        document.set_identifier(&Identifier::new(vec![Value::Integer(id)]));
        document
    }

    #[test]
    fn later_pending_registration_wins() {
        let mut changes = ChangeSet::new();
        changes.register(Change::new(ChangeState::New, "v", document(1)).unwrap());
        changes.register(Change::new(ChangeState::Deleted, "v", document(1)).unwrap());

        let pending = changes.take_pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].state(), ChangeState::Deleted);
    }

    #[test]
    fn clean_and_pending_coexist_for_one_key() {
        let mut changes = ChangeSet::new();
        changes.register(Change::new(ChangeState::Clean, "v", document(1)).unwrap());
        changes.register(Change::new(ChangeState::Dirty, "v", document(1)).unwrap());

        let id = Identifier::new(vec![Value::Integer(1)]);
        assert!(changes.clean("v", &id).is_some());
        assert_eq!(changes.pending_len(), 1);
    }

    #[test]
    fn untracked_document_without_identifier_is_rejected() {
        let bare = Document::new("t", Vec::new());
        assert!(Change::new(ChangeState::New, "v", bare).is_err());
    }
}
