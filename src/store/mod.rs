//! Record persistence.
//!
//! [`RecordStore`] is the seam between the HTTP handlers and the document
//! backend. Every method is one atomic operation on a single document of the
//! collection named by the resource descriptor.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Document, ResourceDescriptor};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// A stored document together with its store-managed metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(flatten)]
    pub data: Document,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate key error: {collection}.{field} already holds this value")]
    DuplicateKey {
        collection: &'static str,
        field: &'static str,
    },

    #[error("{0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("stored document is malformed: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    /// All records of the collection, ordered by the descriptor's sort.
    async fn find_all(&self, resource: &'static ResourceDescriptor)
        -> Result<Vec<Record>, StoreError>;

    async fn find_by_id(
        &self,
        resource: &'static ResourceDescriptor,
        id: Uuid,
    ) -> Result<Option<Record>, StoreError>;

    /// Stores a validated document under a fresh id.
    async fn insert(
        &self,
        resource: &'static ResourceDescriptor,
        data: Document,
    ) -> Result<Record, StoreError>;

    /// Overwrites the fields present in `patch`, leaving the rest untouched.
    async fn update_by_id(
        &self,
        resource: &'static ResourceDescriptor,
        id: Uuid,
        patch: Document,
    ) -> Result<Option<Record>, StoreError>;

    /// Removes the record, returning it if it existed.
    async fn delete_by_id(
        &self,
        resource: &'static ResourceDescriptor,
        id: Uuid,
    ) -> Result<Option<Record>, StoreError>;
}
