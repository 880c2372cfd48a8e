use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Record, RecordStore, StoreError};
use crate::models::{Document, ResourceDescriptor, SortDirection};
use crate::validation::parse_date;

/// In-process store. Collections keep insertion order; unique fields are
/// checked while holding the write lock.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<&'static str, Vec<Record>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn check_unique(
    resource: &'static ResourceDescriptor,
    records: &[Record],
    candidate: &Document,
    skip: Option<Uuid>,
) -> Result<(), StoreError> {
    for unique in resource.unique {
        let value = match candidate.get(unique.name) {
            None | Some(Value::Null) => continue,
            Some(value) => value,
        };
        let taken = records
            .iter()
            .filter(|record| Some(record.id) != skip)
            .any(|record| record.data.get(unique.name) == Some(value));
        if taken {
            return Err(StoreError::DuplicateKey {
                collection: resource.collection,
                field: unique.name,
            });
        }
    }
    Ok(())
}

fn sort_key(record: &Record, field: &str) -> Option<DateTime<Utc>> {
    record
        .data
        .get(field)
        .and_then(Value::as_str)
        .and_then(parse_date)
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn find_all(
        &self,
        resource: &'static ResourceDescriptor,
    ) -> Result<Vec<Record>, StoreError> {
        let collections = self.collections.read().await;
        let mut records = collections
            .get(resource.collection)
            .cloned()
            .unwrap_or_default();
        drop(collections);

        if let Some(sort) = resource.sort {
            records.sort_by(|a, b| {
                let ordering: Ordering = sort_key(a, sort.field).cmp(&sort_key(b, sort.field));
                match sort.direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                }
            });
        }
        Ok(records)
    }

    async fn find_by_id(
        &self,
        resource: &'static ResourceDescriptor,
        id: Uuid,
    ) -> Result<Option<Record>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(resource.collection)
            .and_then(|records| records.iter().find(|record| record.id == id))
            .cloned())
    }

    async fn insert(
        &self,
        resource: &'static ResourceDescriptor,
        data: Document,
    ) -> Result<Record, StoreError> {
        let mut collections = self.collections.write().await;
        let records = collections.entry(resource.collection).or_default();
        check_unique(resource, records, &data, None)?;

        let now = Utc::now();
        let record = Record {
            id: Uuid::new_v4(),
            data,
            created_at: now,
            updated_at: now,
        };
        records.push(record.clone());
        Ok(record)
    }

    async fn update_by_id(
        &self,
        resource: &'static ResourceDescriptor,
        id: Uuid,
        patch: Document,
    ) -> Result<Option<Record>, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(records) = collections.get_mut(resource.collection) else {
            return Ok(None);
        };
        let Some(position) = records.iter().position(|record| record.id == id) else {
            return Ok(None);
        };

        let mut merged = records[position].data.clone();
        merged.extend(patch);
        check_unique(resource, records, &merged, Some(id))?;

        let record = &mut records[position];
        record.data = merged;
        record.updated_at = Utc::now();
        Ok(Some(record.clone()))
    }

    async fn delete_by_id(
        &self,
        resource: &'static ResourceDescriptor,
        id: Uuid,
    ) -> Result<Option<Record>, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(records) = collections.get_mut(resource.collection) else {
            return Ok(None);
        };
        Ok(records
            .iter()
            .position(|record| record.id == id)
            .map(|position| records.remove(position)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ACTIVITY, EVENT, VOLUNTEER};
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_distinct_ids() {
        let store = MemoryStore::new();
        let a = store
            .insert(&EVENT, doc(json!({"name": "A"})))
            .await
            .expect("insert a");
        let b = store
            .insert(&EVENT, doc(json!({"name": "B"})))
            .await
            .expect("insert b");

        assert_ne!(a.id, b.id);
        assert_eq!(a.created_at, a.updated_at);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let store = MemoryStore::new();
        store
            .insert(&VOLUNTEER, doc(json!({"name": "A", "email": "x@y.z"})))
            .await
            .expect("first insert");

        let err = store
            .insert(&VOLUNTEER, doc(json!({"name": "B", "email": "x@y.z"})))
            .await
            .expect_err("duplicate");

        assert!(matches!(
            err,
            StoreError::DuplicateKey {
                field: "email",
                ..
            }
        ));
        assert_eq!(store.find_all(&VOLUNTEER).await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn test_update_may_keep_own_unique_value() {
        let store = MemoryStore::new();
        let a = store
            .insert(&VOLUNTEER, doc(json!({"name": "A", "email": "a@y.z"})))
            .await
            .expect("insert a");
        store
            .insert(&VOLUNTEER, doc(json!({"name": "B", "email": "b@y.z"})))
            .await
            .expect("insert b");

        let updated = store
            .update_by_id(&VOLUNTEER, a.id, doc(json!({"email": "a@y.z", "phone": "1"})))
            .await
            .expect("update")
            .expect("present");
        assert_eq!(updated.data["phone"], json!("1"));
        assert_eq!(updated.data["name"], json!("A"));

        let err = store
            .update_by_id(&VOLUNTEER, a.id, doc(json!({"email": "b@y.z"})))
            .await
            .expect_err("collides with b");
        assert!(matches!(err, StoreError::DuplicateKey { .. }));
    }

    #[tokio::test]
    async fn test_missing_ids_yield_none() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();

        assert!(store.find_by_id(&EVENT, id).await.expect("find").is_none());
        assert!(store
            .update_by_id(&EVENT, id, Document::new())
            .await
            .expect("update")
            .is_none());
        assert!(store.delete_by_id(&EVENT, id).await.expect("delete").is_none());
    }

    #[tokio::test]
    async fn test_sort_orders() {
        let store = MemoryStore::new();
        for day in ["2024-01-03", "2024-01-01", "2024-01-02"] {
            let date = format!("{day}T00:00:00.000Z");
            store
                .insert(&EVENT, doc(json!({"name": day, "date": date})))
                .await
                .expect("insert event");
            store
                .insert(&ACTIVITY, doc(json!({"name": day, "date": date})))
                .await
                .expect("insert activity");
        }

        let names = |records: Vec<Record>| {
            records
                .into_iter()
                .map(|record| record.data["name"].as_str().unwrap_or_default().to_string())
                .collect::<Vec<_>>()
        };

        assert_eq!(
            names(store.find_all(&EVENT).await.expect("events")),
            ["2024-01-01", "2024-01-02", "2024-01-03"]
        );
        assert_eq!(
            names(store.find_all(&ACTIVITY).await.expect("activities")),
            ["2024-01-03", "2024-01-02", "2024-01-01"]
        );
    }

    #[tokio::test]
    async fn test_delete_removes_record() {
        let store = MemoryStore::new();
        let record = store
            .insert(&EVENT, doc(json!({"name": "A"})))
            .await
            .expect("insert");

        let removed = store
            .delete_by_id(&EVENT, record.id)
            .await
            .expect("delete")
            .expect("present");
        assert_eq!(removed.id, record.id);
        assert!(store
            .find_by_id(&EVENT, record.id)
            .await
            .expect("find")
            .is_none());
    }
}
