//! In-memory storage implementation for the document store.
//!
//! This module provides a relational backend that keeps every relation as a HashMap of rows
//! behind an async-safe read-write lock.

use std::{collections::HashMap, sync::Arc};
use async_trait::async_trait;
use mea::rwlock::RwLock;
use serde_json::Value;

use divan_core::{
    backend::{SchemaOp, StoreBackend, StoreBackendBuilder},
    descriptor::CollectionDescriptor,
    document::{StoredDocument, WriteResult},
    error::{DivanError, DivanResult},
    query::Expr,
    token,
};

#[derive(Debug, Clone)]
struct Row {
    rev: String,
    doc: Value,
}

/// document id -> row
#[derive(Debug, Clone, Default)]
struct Relation {
    rows: HashMap<String, Row>,
}

type StoreMap = HashMap<String, Relation>;

/// Thread-safe in-memory relational backend.
///
/// Each collection is a relation keyed by document id. Ids and revisions default to fresh
/// tokens from [`divan_core::token`], the same way a relational engine fills column defaults.
///
/// # Thread Safety
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, allowing it to be
/// safely shared across async tasks. Multiple clones of the same instance share the same
/// underlying data. Every write holds the lock for its whole duration, so single-row guards and
/// schema batches are atomic.
///
/// # Example
///
/// ```ignore
/// use divan_memory::InMemoryStore;
/// use divan_core::{backend::{SchemaOp, StoreBackend}, descriptor::CollectionDescriptor};
/// use serde_json::json;
///
/// let store = InMemoryStore::new();
/// let users = CollectionDescriptor::new("users");
///
/// store.apply_schema(vec![SchemaOp::CreateRelation(users.clone())]).await?;
/// let written = store.insert_row(&users, None, json!({"name": "Alice"})).await?;
/// assert!(store.fetch_row(&users, &written.id).await?.is_some());
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// relation name -> relation
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new store with no relations.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    /// Creates a builder for constructing an `InMemoryStore`.
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    /// Names of all relations, sorted.
    pub async fn relation_names(&self) -> Vec<String> {
        let mut names = self.store.read().await.keys().cloned().collect::<Vec<_>>();
        names.sort();
        names
    }

    /// Number of rows in the relation called `name`, or `None` if it does not exist.
    pub async fn row_count(&self, name: &str) -> Option<usize> {
        self.store
            .read()
            .await
            .get(name)
            .map(|relation| relation.rows.len())
    }
}

fn relation<'a>(store: &'a StoreMap, descriptor: &CollectionDescriptor) -> DivanResult<&'a Relation> {
    store
        .get(descriptor.name())
        .ok_or_else(|| DivanError::CollectionNotFound(descriptor.name().to_string()))
}

fn relation_mut<'a>(store: &'a mut StoreMap, descriptor: &CollectionDescriptor) -> DivanResult<&'a mut Relation> {
    store
        .get_mut(descriptor.name())
        .ok_or_else(|| DivanError::CollectionNotFound(descriptor.name().to_string()))
}

fn insert(store: &mut StoreMap, descriptor: &CollectionDescriptor, id: Option<String>, doc: Value) -> DivanResult<WriteResult> {
    let relation = relation_mut(store, descriptor)?;
    let id = id.unwrap_or_else(token::generate);

    if relation.rows.contains_key(&id) {
        return Err(DivanError::ConflictingId(id, descriptor.name().to_string()));
    }

    let rev = token::generate();
    relation.rows.insert(id.clone(), Row { rev: rev.clone(), doc });

    Ok(WriteResult { id, rev })
}

fn apply(store: &mut StoreMap, op: SchemaOp) -> DivanResult<()> {
    match op {
        SchemaOp::CreateRelation(descriptor) => {
            if store.contains_key(descriptor.name()) {
                return Err(DivanError::CollectionExists(descriptor.name().to_string()));
            }

            store.insert(descriptor.name().to_string(), Relation::default());
        }
        SchemaOp::DropRelation(descriptor) => {
            if store.remove(descriptor.name()).is_none() {
                return Err(DivanError::CollectionNotFound(descriptor.name().to_string()));
            }
        }
        SchemaOp::InsertRow { relation, id, doc } => {
            insert(store, &relation, Some(id), doc)?;
        }
        SchemaOp::DeleteRow { relation, id } => {
            if relation_mut(store, &relation)?.rows.remove(&id).is_none() {
                return Err(DivanError::DocumentNotFound(id, relation.name().to_string()));
            }
        }
    }

    Ok(())
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn insert_row(&self, relation: &CollectionDescriptor, id: Option<String>, doc: Value) -> DivanResult<WriteResult> {
        let mut store = self.store.write().await;

        insert(&mut store, relation, id, doc)
    }

    async fn fetch_row(&self, relation: &CollectionDescriptor, id: &str) -> DivanResult<Option<StoredDocument>> {
        let store = self.store.read().await;

        match self::relation(&store, relation)?.rows.get(id) {
            Some(row) => Ok(Some(StoredDocument::from_row(id.to_string(), row.rev.clone(), row.doc.clone())?)),
            None => Ok(None),
        }
    }

    async fn fetch_rev(&self, relation: &CollectionDescriptor, id: &str) -> DivanResult<Option<String>> {
        let store = self.store.read().await;

        Ok(
            self::relation(&store, relation)?
                .rows
                .get(id)
                .map(|row| row.rev.clone())
        )
    }

    async fn update_row(&self, relation: &CollectionDescriptor, id: &str, rev: &str, doc: Value) -> DivanResult<Option<WriteResult>> {
        let mut store = self.store.write().await;

        let row = match relation_mut(&mut store, relation)?.rows.get_mut(id) {
            Some(row) if row.rev == rev => row,
            _ => return Ok(None),
        };

        row.rev = token::generate();
        row.doc = doc;

        Ok(Some(WriteResult::new(id, row.rev.clone())))
    }

    async fn delete_row(&self, relation: &CollectionDescriptor, id: &str, rev: &str) -> DivanResult<bool> {
        let mut store = self.store.write().await;
        let rows = &mut relation_mut(&mut store, relation)?.rows;

        if rows.get(id).is_some_and(|row| row.rev == rev) {
            rows.remove(id);
            return Ok(true);
        }

        Ok(false)
    }

    async fn query_rows(&self, relation: &CollectionDescriptor, filter: &Expr) -> DivanResult<Vec<StoredDocument>> {
        let store = self.store.read().await;

        self::relation(&store, relation)?
            .rows
            .iter()
            .filter(|(_, row)| row.doc.as_object().is_some_and(|doc| filter.matches(doc)))
            .map(|(id, row)| StoredDocument::from_row(id.clone(), row.rev.clone(), row.doc.clone()))
            .collect()
    }

    async fn relation_exists(&self, name: &str) -> DivanResult<bool> {
        Ok(self.store.read().await.contains_key(name))
    }

    async fn apply_schema(&self, ops: Vec<SchemaOp>) -> DivanResult<()> {
        let mut store = self.store.write().await;

        // Work on a copy and publish it only once every step succeeded.
        let mut staged = store.clone();
        for op in ops {
            apply(&mut staged, op)?;
        }
        *store = staged;

        Ok(())
    }
}

/// Builder for constructing [`InMemoryStore`] instances.
///
/// # Example
///
/// ```ignore
/// use divan_memory::InMemoryStore;
/// use divan_core::backend::StoreBackendBuilder;
///
/// let store = InMemoryStore::builder().build().await?;
/// ```
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    /// Builds and returns a new [`InMemoryStore`] instance.
    ///
    /// This always succeeds and returns a freshly initialized store.
    async fn build(self) -> DivanResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use divan_core::query::Filter;

    use super::*;

    async fn store_with(names: &[&str]) -> InMemoryStore {
        let store = InMemoryStore::new();
        store
            .apply_schema(
                names
                    .iter()
                    .map(|name| SchemaOp::CreateRelation(CollectionDescriptor::new(*name)))
                    .collect(),
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn assigns_ids_and_revisions() {
        let store = store_with(&["users"]).await;
        let users = CollectionDescriptor::new("users");

        let a = store.insert_row(&users, None, json!({"n": 1})).await.unwrap();
        let b = store.insert_row(&users, None, json!({"n": 2})).await.unwrap();

        assert_ne!(a.id, b.id);
        assert_ne!(a.rev, b.rev);
        assert_eq!(store.fetch_rev(&users, &a.id).await.unwrap(), Some(a.rev));
    }

    #[tokio::test]
    async fn rejects_duplicate_ids() {
        let store = store_with(&["users"]).await;
        let users = CollectionDescriptor::new("users");

        store.insert_row(&users, Some("ann".into()), json!({})).await.unwrap();

        assert_eq!(
            store.insert_row(&users, Some("ann".into()), json!({})).await,
            Err(DivanError::ConflictingId("ann".into(), "users".into())),
        );
    }

    #[tokio::test]
    async fn missing_relation_is_collection_not_found() {
        let store = InMemoryStore::new();
        let ghosts = CollectionDescriptor::new("ghosts");

        assert_eq!(
            store.fetch_row(&ghosts, "x").await,
            Err(DivanError::CollectionNotFound("ghosts".into())),
        );
        assert!(store.query_rows(&ghosts, &Filter::eq("type", "collection")).await.is_err());
    }

    #[tokio::test]
    async fn guarded_update_and_delete() {
        let store = store_with(&["users"]).await;
        let users = CollectionDescriptor::new("users");
        let written = store.insert_row(&users, None, json!({"n": 1})).await.unwrap();

        assert_eq!(store.update_row(&users, &written.id, "stale", json!({"n": 2})).await, Ok(None));

        let updated = store
            .update_row(&users, &written.id, &written.rev, json!({"n": 2}))
            .await
            .unwrap()
            .unwrap();
        assert_ne!(updated.rev, written.rev);

        assert!(!store.delete_row(&users, &written.id, &written.rev).await.unwrap());
        assert!(store.delete_row(&users, &written.id, &updated.rev).await.unwrap());
        assert_eq!(store.fetch_row(&users, &written.id).await, Ok(None));
    }

    #[tokio::test]
    async fn query_filters_on_top_level_fields() {
        let store = store_with(&["divan"]).await;
        let registry = CollectionDescriptor::registry();

        store.insert_row(&registry, None, json!({"type": "collection", "name": "users"})).await.unwrap();
        store.insert_row(&registry, None, json!({"type": "other"})).await.unwrap();

        let rows = store.query_rows(&registry, &Filter::eq("type", "collection")).await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].body["name"], "users");
    }

    #[tokio::test]
    async fn failed_batches_leave_no_trace() {
        let store = store_with(&["divan"]).await;
        let registry = CollectionDescriptor::registry();
        store.insert_row(&registry, Some("collection/users".into()), json!({})).await.unwrap();

        let result = store
            .apply_schema(vec![
                SchemaOp::CreateRelation(CollectionDescriptor::new("users")),
                SchemaOp::InsertRow {
                    relation: registry.clone(),
                    id: "collection/users".into(),
                    doc: json!({"type": "collection"}),
                },
            ])
            .await;

        assert_eq!(result, Err(DivanError::ConflictingId("collection/users".into(), "divan".into())));
        assert!(!store.relation_exists("users").await.unwrap());
        assert_eq!(store.relation_names().await, vec!["divan"]);
        assert_eq!(store.row_count("divan").await, Some(1));
    }

    #[tokio::test]
    async fn lists_relations_in_name_order() {
        let store = store_with(&["users", "audit-log", "divan"]).await;

        assert_eq!(store.relation_names().await, vec!["audit-log", "divan", "users"]);

        store
            .apply_schema(vec![SchemaOp::DropRelation(CollectionDescriptor::new("users"))])
            .await
            .unwrap();
        assert_eq!(store.relation_names().await, vec!["audit-log", "divan"]);
        assert_eq!(store.row_count("users").await, None);
    }

    #[tokio::test]
    async fn drop_relation_requires_existence() {
        let store = InMemoryStore::new();

        assert_eq!(
            store.apply_schema(vec![SchemaOp::DropRelation(CollectionDescriptor::new("users"))]).await,
            Err(DivanError::CollectionNotFound("users".into())),
        );
    }
}
