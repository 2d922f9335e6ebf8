//! Convenient re-exports of commonly used types from divan.
//!
//! ```ignore
//! use divan::prelude::*;
//! ```

pub use divan_core::{
    backend::{SchemaOp, StoreBackend, StoreBackendBuilder},
    collection::Collection,
    config::DivanConfig,
    descriptor::CollectionDescriptor,
    document::{DocumentBody, StoredDocument, WriteResult},
    error::{DivanError, DivanResult},
    query::{Expr, Filter, QueryVisitor},
    server::Divan,
};
