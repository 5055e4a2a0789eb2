use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Key definition error: {0}")]
    KeyDefinition(String),

    #[error("Invalid identifier: missing value for {}", .0.join(", "))]
    InvalidIdentifier(Vec<String>),

    #[error("Duplicate item '{identifier}' in view '{view}'")]
    DuplicateItem { view: String, identifier: String },

    #[error("Item '{identifier}' not found in view '{view}'")]
    ItemNotFound { view: String, identifier: String },

    #[error("Unit of work commit failed: {cause}")]
    CommitFailed { cause: Box<StoreError> },

    #[error("Rollback is not supported for the {0} commit strategy")]
    RollbackUnsupported(String),

    #[error("Descriptor error: {0}")]
    Descriptor(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Execution error: {0}")]
    Execution(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Execution(err.to_string())
    }
}

impl StoreError {
    /// Wrap a failure raised between the existence barrier and batch
    /// execution, keeping the original cause attached.
    pub fn commit_failed(cause: StoreError) -> Self {
        Self::CommitFailed {
            cause: Box::new(cause),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ItemNotFound { .. })
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateItem { .. })
    }
}
