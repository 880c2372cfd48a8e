use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use super::{Record, RecordStore, StoreError};
use crate::models::{Document, ResourceDescriptor, SortDirection};

const RETURNING: &str = "RETURNING id, data, created_at, updated_at";

/// PostgreSQL backend. Each collection is a table of JSONB documents; unique
/// fields are enforced by expression indexes named `<collection>_<field>_key`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

#[derive(FromRow)]
struct RecordRow {
    id: Uuid,
    data: Json<Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RecordRow> for Record {
    type Error = StoreError;

    fn try_from(row: RecordRow) -> Result<Self, Self::Error> {
        match row.data.0 {
            Value::Object(data) => Ok(Record {
                id: row.id,
                data,
                created_at: row.created_at,
                updated_at: row.updated_at,
            }),
            other => Err(StoreError::Corrupt(format!(
                "record {} holds {} instead of an object",
                row.id, other
            ))),
        }
    }
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a pool and brings the schema up to date.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        tracing::info!("Successfully connected to database");

        sqlx::migrate!().run(&pool).await?;
        tracing::info!("Migrations run successfully");

        Ok(Self::new(pool))
    }
}

fn order_clause(resource: &ResourceDescriptor) -> String {
    match resource.sort {
        // Missing dates sort lowest in both directions.
        Some(sort) => {
            let direction = match sort.direction {
                SortDirection::Ascending => "ASC NULLS FIRST",
                SortDirection::Descending => "DESC NULLS LAST",
            };
            format!(
                "ORDER BY (data->>'{}')::timestamptz {direction}, created_at",
                sort.field
            )
        }
        None => "ORDER BY created_at, id".to_string(),
    }
}

fn constraint_name(resource: &ResourceDescriptor, field: &str) -> String {
    format!("{}_{}_key", resource.collection, field)
}

/// Declared unique field guarded by `constraint`, if any. Other unique
/// constraints (the primary key, for one) are not duplicate-key conditions.
fn unique_field_for_constraint(
    resource: &'static ResourceDescriptor,
    constraint: Option<&str>,
) -> Option<&'static str> {
    let constraint = constraint?;
    resource
        .unique
        .iter()
        .find(|unique| constraint == constraint_name(resource, unique.name))
        .map(|unique| unique.name)
}

/// Maps a unique violation back to the declared field it guards.
fn map_write_error(resource: &'static ResourceDescriptor, err: sqlx::Error) -> StoreError {
    let field = match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            unique_field_for_constraint(resource, db.constraint())
        }
        _ => None,
    };

    match field {
        Some(field) => StoreError::DuplicateKey {
            collection: resource.collection,
            field,
        },
        None => StoreError::Database(err),
    }
}

#[async_trait]
impl RecordStore for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn find_all(
        &self,
        resource: &'static ResourceDescriptor,
    ) -> Result<Vec<Record>, StoreError> {
        let sql = format!(
            "SELECT id, data, created_at, updated_at FROM {} {}",
            resource.collection,
            order_clause(resource)
        );
        let rows: Vec<RecordRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        rows.into_iter().map(Record::try_from).collect()
    }

    async fn find_by_id(
        &self,
        resource: &'static ResourceDescriptor,
        id: Uuid,
    ) -> Result<Option<Record>, StoreError> {
        let sql = format!(
            "SELECT id, data, created_at, updated_at FROM {} WHERE id = $1",
            resource.collection
        );
        let row: Option<RecordRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Record::try_from).transpose()
    }

    async fn insert(
        &self,
        resource: &'static ResourceDescriptor,
        data: Document,
    ) -> Result<Record, StoreError> {
        let sql = format!(
            "INSERT INTO {} (id, data) VALUES ($1, $2) {RETURNING}",
            resource.collection
        );
        let row: RecordRow = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(Json(Value::Object(data)))
            .fetch_one(&self.pool)
            .await
            .map_err(|err| map_write_error(resource, err))?;
        Record::try_from(row)
    }

    async fn update_by_id(
        &self,
        resource: &'static ResourceDescriptor,
        id: Uuid,
        patch: Document,
    ) -> Result<Option<Record>, StoreError> {
        let sql = format!(
            "UPDATE {} SET data = data || $2, updated_at = now() WHERE id = $1 {RETURNING}",
            resource.collection
        );
        let row: Option<RecordRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(Json(Value::Object(patch)))
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| map_write_error(resource, err))?;
        row.map(Record::try_from).transpose()
    }

    async fn delete_by_id(
        &self,
        resource: &'static ResourceDescriptor,
        id: Uuid,
    ) -> Result<Option<Record>, StoreError> {
        let sql = format!("DELETE FROM {} WHERE id = $1 {RETURNING}", resource.collection);
        let row: Option<RecordRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Record::try_from).transpose()
    }
}
