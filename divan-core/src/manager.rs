//! Collection creation and destruction.
//!
//! A collection exists twice: as a backing relation and as a descriptor document in the
//! registry. [`CollectionManager`] creates and drops both in one schema batch, so neither can
//! exist without the other.

use serde_json::to_value;
use tracing::info;

use crate::{
    backend::{SchemaOp, StoreBackend},
    descriptor::CollectionDescriptor,
    error::DivanResult,
    registry::Registry,
};

#[derive(Debug)]
pub struct CollectionManager<'a, B: StoreBackend> {
    backend: &'a B,
    registry: Registry<'a, B>,
}

impl<'a, B: StoreBackend> CollectionManager<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self { backend, registry: Registry::new(backend) }
    }

    /// Creates the backing relation for `descriptor` and registers it.
    ///
    /// # Errors
    ///
    /// - [`DivanError::InvalidName`](crate::error::DivanError::InvalidName) if the name or document
    ///   column fails validation. Nothing is created.
    /// - [`DivanError::CollectionExists`](crate::error::DivanError::CollectionExists) if the
    ///   relation name is taken.
    /// - Any error from the registry insert. The relation is rolled back with it.
    pub async fn create(&self, descriptor: &CollectionDescriptor) -> DivanResult<()> {
        descriptor.validate()?;

        self.backend
            .apply_schema(vec![
                SchemaOp::CreateRelation(descriptor.clone()),
                SchemaOp::InsertRow {
                    relation: self.registry.descriptor().clone(),
                    id: descriptor.registry_id(),
                    doc: to_value(descriptor)?,
                },
            ])
            .await?;

        info!(
            target: "divan::manager",
            collection = %descriptor.name(),
            doc_field = %descriptor.doc_field(),
            "Created collection"
        );

        Ok(())
    }

    /// Drops the backing relation of `descriptor` and removes its registry entry.
    ///
    /// Every document in the collection is lost.
    ///
    /// # Errors
    ///
    /// - [`DivanError::CollectionNotFound`](crate::error::DivanError::CollectionNotFound) if the
    ///   relation does not exist.
    /// - [`DivanError::DocumentNotFound`](crate::error::DivanError::DocumentNotFound) if the
    ///   registry entry is missing. The relation is left in place.
    pub async fn delete(&self, descriptor: &CollectionDescriptor) -> DivanResult<()> {
        descriptor.validate()?;

        self.backend
            .apply_schema(vec![
                SchemaOp::DropRelation(descriptor.clone()),
                SchemaOp::DeleteRow {
                    relation: self.registry.descriptor().clone(),
                    id: descriptor.registry_id(),
                },
            ])
            .await?;

        info!(target: "divan::manager", collection = %descriptor.name(), "Deleted collection");

        Ok(())
    }
}
