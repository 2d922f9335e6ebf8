//! The collection registry.
//!
//! The registry is an ordinary collection with a fixed name ([`REGISTRY_COLLECTION`]) holding one
//! descriptor document per live user collection, keyed `collection/<name>`. It is created once
//! by [`Registry::bootstrap`] and scanned in full whenever the server rebuilds its config cache.

use std::collections::HashMap;

use tracing::info;

use crate::{
    backend::{SchemaOp, StoreBackend},
    descriptor::{COLLECTION_TYPE, CollectionDescriptor, REGISTRY_COLLECTION},
    error::{DivanError, DivanResult},
    query::Filter,
};

/// Collection name to descriptor, as loaded from the registry.
pub type CollectionMap = HashMap<String, CollectionDescriptor>;

/// Read access to the registry collection of a backend.
#[derive(Debug)]
pub struct Registry<'a, B: StoreBackend> {
    descriptor: CollectionDescriptor,
    backend: &'a B,
}

impl<'a, B: StoreBackend> Registry<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self { descriptor: CollectionDescriptor::registry(), backend }
    }

    /// Descriptor of the registry relation.
    pub fn descriptor(&self) -> &CollectionDescriptor {
        &self.descriptor
    }

    /// Creates the registry relation if it does not exist yet.
    ///
    /// Only the relation is created: the registry never describes itself.
    ///
    /// Returns `true` if the relation was created by this call.
    pub async fn bootstrap(&self) -> DivanResult<bool> {
        if self.backend.relation_exists(REGISTRY_COLLECTION).await? {
            info!(target: "divan::registry", "Registry already present, skipping bootstrap");
            return Ok(false);
        }

        match self
            .backend
            .apply_schema(vec![SchemaOp::CreateRelation(self.descriptor.clone())])
            .await
        {
            Ok(()) => {
                info!(target: "divan::registry", registry = REGISTRY_COLLECTION, "Created registry");
                Ok(true)
            }
            // Lost a race with another bootstrapping process.
            Err(DivanError::CollectionExists(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Loads every collection descriptor in the registry.
    ///
    /// # Errors
    ///
    /// Returns [`DivanError::Initialization`] if the registry relation is missing, or
    /// [`DivanError::Serialization`] if a registry document is not a valid descriptor.
    pub async fn list(&self) -> DivanResult<CollectionMap> {
        let rows = match self
            .backend
            .query_rows(&self.descriptor, &Filter::eq("type", COLLECTION_TYPE))
            .await
        {
            Err(DivanError::CollectionNotFound(_)) => {
                return Err(DivanError::Initialization(format!(
                    "{REGISTRY_COLLECTION} registry missing! Try starting with bootstrap enabled or create the relation manually."
                )));
            }
            other => other?,
        };

        rows.into_iter()
            .map(|row| {
                row.deserialize::<CollectionDescriptor>()
                    .map(|descriptor| (descriptor.name().to_string(), descriptor))
            })
            .collect()
    }
}
