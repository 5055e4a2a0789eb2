pub mod config;
pub mod observer;

pub use config::{RepositoryConfig, ViewSpec};
pub use observer::RepositoryObserver;

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::future::join_all;
use log::debug;

use crate::codec::{MessagePackCodec, ObjectCodec};
use crate::core::{Identifier, Result, StoreError, Value};
use crate::document::{Document, DocumentFactory};
use crate::entity::TypeRegistry;
use crate::statement::{
    ExecutionResult, Page, StatementExecutor, StatementGenerator, ViewStatementGenerator,
};
use crate::work::{CommitStrategy, UnitOfWork, ViewBinding};

/// The façade over one entity type's projections: a primary table plus any
/// number of denormalized views, kept consistent by a unit of work per
/// operation.
///
/// ```no_run
/// # use std::sync::Arc;
/// # use viewstore::prelude::*;
/// # fn registry() -> Arc<TypeRegistry> { unimplemented!() }
/// # #[derive(Default)] struct Account;
/// # async fn demo() -> viewstore::Result<()> {
/// let repository: Repository<Account> = Repository::builder()
///     .registry(registry())
///     .executor(Arc::new(MemoryStore::new()))
///     .table("accounts", "id:uuid unique")?
///     .view("accounts_by_email", "email:text unique")?
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct Repository<T> {
    table: ViewSpec,
    views: Vec<ViewSpec>,
    factory: DocumentFactory,
    executor: Arc<dyn StatementExecutor>,
    generators: HashMap<String, Arc<dyn StatementGenerator>>,
    observers: Vec<Arc<dyn RepositoryObserver>>,
    config: RepositoryConfig,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Repository<T>
where
    T: Send + Sync + 'static,
{
    pub fn builder() -> RepositoryBuilder<T> {
        RepositoryBuilder::new()
    }

    pub fn table(&self) -> &ViewSpec {
        &self.table
    }

    pub fn views(&self) -> &[ViewSpec] {
        &self.views
    }

    /// Insert a new entity into the primary table and every view.
    ///
    /// The payload is encoded once and shared across projections. Unique
    /// projections are existence-checked before anything is written; a taken
    /// identity fails with `DuplicateItem`.
    pub async fn create(&self, entity: &T) -> Result<T> {
        let payload = self.factory.encode_payload(entity)?;
        let mut primary =
            self.factory
                .as_document_with_payload(entity, self.table.key(), payload.clone())?;
        self.notify_mut(&mut primary, |observer, document| {
            observer.before_create(document)
        })?;

        let mut unit = self.unit_of_work();
        for view in &self.views {
            let mut document =
                self.factory
                    .as_document_with_payload(entity, view.key(), payload.clone())?;
            document.set_metadata(primary.metadata().clone());
            unit.register_new(view.name(), document)?;
        }
        unit.register_new(self.table.name(), primary.clone())?;
        unit.commit().await?;

        for observer in &self.observers {
            observer.after_create(&primary);
        }
        self.factory.as_entity(&primary)
    }

    /// Read one entity by its primary identity.
    pub async fn read(&self, identifier: &Identifier) -> Result<T> {
        for observer in &self.observers {
            observer.before_read(identifier);
        }

        let mut document = self.read_document(identifier).await?;
        self.notify_mut(&mut document, |observer, document| {
            observer.after_read(document)
        })?;
        self.factory.as_entity(&document)
    }

    /// Update an entity across every projection.
    ///
    /// When `original` is not supplied, the stored Document is read by the
    /// updated entity's primary identity, registered CLEAN and decoded as the
    /// diff baseline; a primary-key-changing update therefore requires the
    /// caller to pass the original. Per projection, an identity change turns
    /// into delete-old + insert-new; anything else is an in-place update.
    pub async fn update(&self, updated: &T, original: Option<&T>) -> Result<T> {
        let mut unit = self.unit_of_work();

        let decoded_baseline;
        let baseline: &T = match original {
            Some(original) => original,
            None => {
                let identifier = self.primary_identifier(updated)?;
                let document = self.read_document(&identifier).await?;
                unit.register_clean(self.table.name(), document.clone())?;
                decoded_baseline = self.factory.as_entity(&document)?;
                &decoded_baseline
            }
        };

        let payload_new = self.factory.encode_payload(updated)?;
        let payload_old = self.factory.encode_payload(baseline)?;

        let mut primary_new = self.factory.as_document_with_payload(
            updated,
            self.table.key(),
            payload_new.clone(),
        )?;
        self.notify_mut(&mut primary_new, |observer, document| {
            observer.before_update(document)
        })?;

        for spec in self.projections() {
            let document_new = if spec.name() == self.table.name() {
                primary_new.clone()
            } else {
                let mut document = self.factory.as_document_with_payload(
                    updated,
                    spec.key(),
                    payload_new.clone(),
                )?;
                document.set_metadata(primary_new.metadata().clone());
                document
            };
            let document_old = self.factory.as_document_with_payload(
                baseline,
                spec.key(),
                payload_old.clone(),
            )?;

            if document_new.identifier() == document_old.identifier() {
                unit.register_dirty(spec.name(), document_new)?;
            } else {
                // The projection's key changed: it must move, not mutate.
                debug!(
                    "re-keying view '{}': {} -> {}",
                    spec.name(),
                    document_old
                        .identifier()
                        .map(|id| id.to_string())
                        .unwrap_or_default(),
                    document_new
                        .identifier()
                        .map(|id| id.to_string())
                        .unwrap_or_default()
                );
                unit.register_deleted(spec.name(), document_old)?;
                unit.register_new(spec.name(), document_new)?;
            }
        }

        unit.commit().await?;

        for observer in &self.observers {
            observer.after_update(&primary_new);
        }
        self.factory.as_entity(&primary_new)
    }

    /// Update the entity if its primary identity is stored, create it
    /// otherwise. The read and the write are two store round-trips; racing
    /// upserts for one identity behave like any two racing units of work.
    pub async fn upsert(&self, entity: &T) -> Result<T> {
        let identifier = self.primary_identifier(entity)?;
        if self.exists(&identifier).await? {
            self.update(entity, None).await
        } else {
            self.create(entity).await
        }
    }

    /// Remove an entity from the primary table and every view.
    pub async fn delete(&self, entity: &T) -> Result<()> {
        let payload = self.factory.encode_payload(entity)?;
        let mut primary =
            self.factory
                .as_document_with_payload(entity, self.table.key(), payload.clone())?;
        self.notify_mut(&mut primary, |observer, document| {
            observer.before_delete(document)
        })?;

        let mut unit = self.unit_of_work();
        for view in &self.views {
            let document =
                self.factory
                    .as_document_with_payload(entity, view.key(), payload.clone())?;
            unit.register_deleted(view.name(), document)?;
        }
        unit.register_deleted(self.table.name(), primary.clone())?;
        unit.commit().await?;

        for observer in &self.observers {
            observer.after_delete(&primary);
        }
        Ok(())
    }

    /// Read the entity, then delete it from every projection. Needed when
    /// the caller only has the primary identity but views are keyed by other
    /// fields.
    pub async fn delete_by_id(&self, identifier: &Identifier) -> Result<()> {
        let entity = self.read(identifier).await?;
        self.delete(&entity).await
    }

    pub async fn exists(&self, identifier: &Identifier) -> Result<bool> {
        let statement = self.generator(self.table.name())?.exists(identifier)?;
        match self.executor.execute(statement).await? {
            ExecutionResult::Row(row) => Ok(row.is_some()),
            ExecutionResult::Applied(applied) => Ok(applied),
            ExecutionResult::Rows { documents, .. } => Ok(!documents.is_empty()),
        }
    }

    /// Page through the primary table, optionally constrained to a partial
    /// key prefix. The cursor is an opaque store token, forwarded back
    /// verbatim to fetch the next page.
    pub async fn read_all(
        &self,
        limit: usize,
        cursor: Option<&str>,
        params: &[Value],
    ) -> Result<Page<T>> {
        let page_size = if limit == 0 {
            self.config.default_page_size
        } else {
            limit
        };

        let statement = self
            .generator(self.table.name())?
            .read_all(page_size, cursor, params)?;

        match self.executor.execute(statement).await? {
            ExecutionResult::Rows {
                documents,
                paging_token,
            } => {
                let mut items = Vec::with_capacity(documents.len());
                for mut document in documents {
                    self.notify_mut(&mut document, |observer, document| {
                        observer.after_read(document)
                    })?;
                    items.push(self.factory.as_entity(&document)?);
                }
                Ok(Page {
                    items,
                    cursor: paging_token,
                })
            }
            _ => Err(StoreError::Execution(
                "read_all returned an unexpected result shape".to_string(),
            )),
        }
    }

    /// Fan out one concurrent read per identifier and join the results,
    /// silently dropping identifiers that are not stored. Result order is
    /// unspecified.
    pub async fn read_in(&self, identifiers: &[Identifier]) -> Result<Vec<T>> {
        for identifier in identifiers {
            for observer in &self.observers {
                observer.before_read(identifier);
            }
        }

        let generator = self.generator(self.table.name())?;
        let mut futures = Vec::with_capacity(identifiers.len());
        for identifier in identifiers {
            let statement = generator.read(identifier)?;
            let executor = self.executor.clone();
            futures.push(async move { executor.execute(statement).await });
        }

        let mut entities = Vec::new();
        for result in join_all(futures).await {
            match result? {
                ExecutionResult::Row(Some(mut document)) => {
                    self.notify_mut(&mut document, |observer, document| {
                        observer.after_read(document)
                    })?;
                    entities.push(self.factory.as_entity(&document)?);
                }
                ExecutionResult::Row(None) => {}
                _ => {
                    return Err(StoreError::Execution(
                        "read returned an unexpected result shape".to_string(),
                    ));
                }
            }
        }
        Ok(entities)
    }

    /// The primary-table identity of an entity.
    pub fn primary_identifier(&self, entity: &T) -> Result<Identifier> {
        let descriptor = self.factory.registry().of::<T>()?;
        self.table.key().identifier(entity, &descriptor)
    }

    fn projections(&self) -> impl Iterator<Item = &ViewSpec> {
        std::iter::once(&self.table).chain(self.views.iter())
    }

    fn unit_of_work(&self) -> UnitOfWork {
        let mut unit = UnitOfWork::new(self.executor.clone(), self.config.commit_strategy);
        for spec in self.projections() {
            if let Some(generator) = self.generators.get(spec.name()) {
                unit.bind_view(spec.name(), ViewBinding::new(generator.clone(), spec.is_unique()));
            }
        }
        unit
    }

    fn generator(&self, view: &str) -> Result<&Arc<dyn StatementGenerator>> {
        self.generators.get(view).ok_or_else(|| {
            StoreError::Configuration(format!("no statement generator for view '{}'", view))
        })
    }

    async fn read_document(&self, identifier: &Identifier) -> Result<Document> {
        let statement = self.generator(self.table.name())?.read(identifier)?;
        match self.executor.execute(statement).await? {
            ExecutionResult::Row(Some(document)) => Ok(document),
            ExecutionResult::Row(None) => Err(StoreError::ItemNotFound {
                view: self.table.name().to_string(),
                identifier: identifier.to_string(),
            }),
            _ => Err(StoreError::Execution(
                "read returned an unexpected result shape".to_string(),
            )),
        }
    }

    /// Run one mutating hook across all observers, holding them to the
    /// contract that the Document's identity is theirs to read, not write.
    fn notify_mut<F>(&self, document: &mut Document, hook: F) -> Result<()>
    where
        F: Fn(&dyn RepositoryObserver, &mut Document),
    {
        let identifier_before = document.identifier().cloned();
        for observer in &self.observers {
            hook(observer.as_ref(), document);
        }
        if document.identifier().cloned() != identifier_before {
            return Err(StoreError::Configuration(
                "an observer changed a document identifier".to_string(),
            ));
        }
        Ok(())
    }
}

/// Assembles a [`Repository`] from its collaborators. The codec defaults to
/// MessagePack and every projection gets a [`ViewStatementGenerator`] unless
/// a custom one is installed.
pub struct RepositoryBuilder<T> {
    table: Option<ViewSpec>,
    views: Vec<ViewSpec>,
    registry: Option<Arc<TypeRegistry>>,
    codec: Option<Arc<dyn ObjectCodec>>,
    executor: Option<Arc<dyn StatementExecutor>>,
    generators: HashMap<String, Arc<dyn StatementGenerator>>,
    observers: Vec<Arc<dyn RepositoryObserver>>,
    config: RepositoryConfig,
    _marker: PhantomData<fn() -> T>,
}

impl<T> RepositoryBuilder<T>
where
    T: Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            table: None,
            views: Vec::new(),
            registry: None,
            codec: None,
            executor: None,
            generators: HashMap::new(),
            observers: Vec::new(),
            config: RepositoryConfig::default(),
            _marker: PhantomData,
        }
    }

    /// Set the primary table and its key spec
    pub fn table(mut self, name: &str, key_spec: &str) -> Result<Self> {
        self.table = Some(ViewSpec::parse(name, key_spec)?);
        Ok(self)
    }

    /// Add a denormalized view and its key spec
    pub fn view(mut self, name: &str, key_spec: &str) -> Result<Self> {
        self.views.push(ViewSpec::parse(name, key_spec)?);
        Ok(self)
    }

    /// Add a pre-built projection spec (for programmatic keys with
    /// transforms)
    pub fn view_spec(mut self, spec: ViewSpec) -> Self {
        self.views.push(spec);
        self
    }

    /// Set the type registry
    pub fn registry(mut self, registry: Arc<TypeRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Override the payload codec
    pub fn codec(mut self, codec: Arc<dyn ObjectCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Set the statement executor
    pub fn executor(mut self, executor: Arc<dyn StatementExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Install a custom statement generator for one view
    pub fn generator(mut self, view: &str, generator: Arc<dyn StatementGenerator>) -> Self {
        self.generators.insert(view.to_string(), generator);
        self
    }

    /// Register a lifecycle observer
    pub fn observer(mut self, observer: Arc<dyn RepositoryObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Replace the repository configuration
    pub fn config(mut self, config: RepositoryConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the commit strategy
    pub fn commit_strategy(mut self, strategy: CommitStrategy) -> Self {
        self.config.commit_strategy = strategy;
        self
    }

    pub fn build(mut self) -> Result<Repository<T>> {
        let table = self.table.ok_or_else(|| {
            StoreError::Configuration("repository requires a primary table".to_string())
        })?;
        let registry = self.registry.ok_or_else(|| {
            StoreError::Configuration("repository requires a type registry".to_string())
        })?;
        let executor = self.executor.ok_or_else(|| {
            StoreError::Configuration("repository requires a statement executor".to_string())
        })?;

        // The registry must know the entity type before the first operation.
        registry.of::<T>()?;

        let codec = self
            .codec
            .unwrap_or_else(|| Arc::new(MessagePackCodec::new()));

        for spec in std::iter::once(&table).chain(self.views.iter()) {
            spec.key().validate()?;
            self.generators
                .entry(spec.name().to_string())
                .or_insert_with(|| Arc::new(ViewStatementGenerator::new(spec.name())));
        }

        Ok(Repository {
            table,
            views: self.views,
            factory: DocumentFactory::new(registry, codec),
            executor,
            generators: self.generators,
            observers: self.observers,
            config: self.config,
            _marker: PhantomData,
        })
    }
}

impl<T> Default for RepositoryBuilder<T>
where
    T: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
