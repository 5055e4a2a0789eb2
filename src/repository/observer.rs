use crate::core::Identifier;
use crate::document::Document;

/// Lifecycle hooks invoked synchronously around repository operations, in
/// registration order.
///
/// The mutating hooks may edit a Document's metadata; rewriting its
/// Identifier is a contract violation and fails the operation.
pub trait RepositoryObserver: Send + Sync {
    fn before_create(&self, _document: &mut Document) {}

    fn after_create(&self, _document: &Document) {}

    fn before_update(&self, _document: &mut Document) {}

    fn after_update(&self, _document: &Document) {}

    fn before_delete(&self, _document: &mut Document) {}

    fn after_delete(&self, _document: &Document) {}

    fn before_read(&self, _identifier: &Identifier) {}

    fn after_read(&self, _document: &mut Document) {}
}
