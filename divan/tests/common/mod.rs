#![allow(dead_code)]

use divan::{
    backend::StoreBackendBuilder,
    memory::InMemoryStore,
    server::Divan,
    sqlite::SqliteStore,
};

/// A bootstrapped server over a fresh in-memory store.
pub async fn memory() -> Divan<InMemoryStore> {
    let divan = Divan::new(InMemoryStore::new());
    divan.start(true).await.unwrap();
    divan
}

/// A bootstrapped server over a fresh in-memory SQLite database.
pub async fn sqlite() -> Divan<SqliteStore> {
    let backend = SqliteStore::builder(":memory:").build().await.unwrap();
    let divan = Divan::new(backend);
    divan.start(true).await.unwrap();
    divan
}

/// Runs each listed `async fn(Divan<B>)` against every backend.
macro_rules! backend_tests {
    ($($name:ident),* $(,)?) => {
        mod memory {
            $(
                #[tokio::test]
                async fn $name() {
                    super::$name(super::common::memory().await).await;
                }
            )*
        }

        mod sqlite {
            $(
                #[tokio::test]
                async fn $name() {
                    super::$name(super::common::sqlite().await).await;
                }
            )*
        }
    };
}
