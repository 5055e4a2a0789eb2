use crate::core::Result;
use crate::key::KeyDefinition;
use crate::work::CommitStrategy;

/// One projection of an entity: the primary table or a denormalized view,
/// with its own key shape.
pub struct ViewSpec {
    name: String,
    key: KeyDefinition,
}

impl ViewSpec {
    pub fn new(name: impl Into<String>, key: KeyDefinition) -> Self {
        Self {
            name: name.into(),
            key,
        }
    }

    /// Build a view spec from a textual key spec.
    pub fn parse(name: impl Into<String>, key_spec: &str) -> Result<Self> {
        Ok(Self::new(name, KeyDefinition::parse(key_spec)?))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key(&self) -> &KeyDefinition {
        &self.key
    }

    pub fn is_unique(&self) -> bool {
        self.key.is_unique()
    }
}

/// Tunables for one repository instance.
#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    /// How commits hand statements to the store.
    pub commit_strategy: CommitStrategy,

    /// Default page size for `read_all` when the caller passes zero.
    pub default_page_size: usize,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            commit_strategy: CommitStrategy::LoggedBatch,
            default_page_size: 100,
        }
    }
}

impl RepositoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the commit strategy
    pub fn commit_strategy(mut self, strategy: CommitStrategy) -> Self {
        self.commit_strategy = strategy;
        self
    }

    /// Set the default page size
    pub fn default_page_size(mut self, page_size: usize) -> Self {
        self.default_page_size = page_size;
        self
    }
}
