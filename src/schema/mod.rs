//! Explicit schema lifecycle.
//!
//! No global singleton: whoever bootstraps the store constructs a
//! [`SchemaRegistry`], registers one provider per projection and drives
//! creation/teardown from there, passing the registry by reference to
//! anything that needs it.

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};

use crate::core::Result;

/// Creates and drops the physical schema for one projection. DDL rendering
/// belongs to the store integration, not to the core.
#[async_trait]
pub trait SchemaProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn create(&self) -> Result<()>;

    async fn drop(&self) -> Result<()>;
}

#[derive(Default)]
pub struct SchemaRegistry {
    providers: Vec<Arc<dyn SchemaProvider>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn SchemaProvider>) {
        self.providers.push(provider);
    }

    pub fn providers(&self) -> &[Arc<dyn SchemaProvider>] {
        &self.providers
    }

    /// Create every registered projection, failing on the first error.
    pub async fn create_all(&self) -> Result<()> {
        for provider in &self.providers {
            debug!("creating schema for '{}'", provider.name());
            provider.create().await?;
        }
        Ok(())
    }

    /// Drop every registered projection, best effort: a failing drop is
    /// logged and the teardown continues; the first error is returned at the
    /// end.
    pub async fn drop_all(&self) -> Result<()> {
        let mut first_failure = None;
        for provider in &self.providers {
            if let Err(err) = SchemaProvider::drop(provider.as_ref()).await {
                warn!("failed to drop schema for '{}': {}", provider.name(), err);
                first_failure.get_or_insert(err);
            }
        }
        match first_failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
