//! A small fixed-size connection pool that runs statements on the blocking thread pool.

use std::sync::{Arc, Mutex, PoisonError};

use mea::semaphore::Semaphore;
use rusqlite::Connection;

use divan_core::error::{DivanError, DivanResult};

/// A set of interchangeable connections.
///
/// The semaphore counts idle connections, so a task holding a permit is guaranteed to find
/// one in `idle`.
struct Slots {
    permits: Arc<Semaphore>,
    idle: Mutex<Vec<Connection>>,
}

impl Slots {
    fn new(connections: Vec<Connection>) -> Arc<Self> {
        Arc::new(Self {
            permits: Arc::new(Semaphore::new(connections.len())),
            idle: Mutex::new(connections),
        })
    }

    fn take(&self) -> Option<Connection> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).pop()
    }

    fn put(&self, conn: Connection) {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).push(conn);
    }

    async fn run<F, T>(self: Arc<Self>, f: F) -> DivanResult<T>
    where
        F: FnOnce(&mut Connection) -> DivanResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = self.permits.clone().acquire_owned(1).await;
        let Some(mut conn) = self.take() else {
            return Err(DivanError::StorageUnavailable("connection pool exhausted".into()));
        };

        let slots = Arc::clone(&self);
        let outcome = tokio::task::spawn_blocking(move || {
            let result = f(&mut conn);
            slots.put(conn);
            result
        })
        .await;

        match outcome {
            Ok(result) => result,
            Err(err) => {
                // The connection went down with the task; shrink the pool to match.
                permit.forget();
                Err(DivanError::StorageUnavailable(err.to_string()))
            }
        }
    }
}

/// One writer connection plus optional read-only connections.
///
/// SQLite admits a single writer at a time, so writes queue on the writer. Reads go to their
/// own connections when the database is a file in WAL mode, and share the writer otherwise.
pub(crate) struct ConnectionPool {
    writer: Arc<Slots>,
    readers: Option<Arc<Slots>>,
}

impl ConnectionPool {
    pub(crate) fn new(writer: Connection, readers: Vec<Connection>) -> Self {
        Self {
            writer: Slots::new(vec![writer]),
            readers: (!readers.is_empty()).then(|| Slots::new(readers)),
        }
    }

    /// Runs `f` on the writer connection.
    pub(crate) async fn write<F, T>(&self, f: F) -> DivanResult<T>
    where
        F: FnOnce(&mut Connection) -> DivanResult<T> + Send + 'static,
        T: Send + 'static,
    {
        Arc::clone(&self.writer).run(f).await
    }

    /// Runs `f` on a reader connection, or on the writer if there are none.
    pub(crate) async fn read<F, T>(&self, f: F) -> DivanResult<T>
    where
        F: FnOnce(&mut Connection) -> DivanResult<T> + Send + 'static,
        T: Send + 'static,
    {
        Arc::clone(self.readers.as_ref().unwrap_or(&self.writer)).run(f).await
    }

    pub(crate) fn reader_count(&self) -> usize {
        self.readers
            .as_ref()
            .map_or(0, |readers| readers.permits.available_permits())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn in_memory_pool_shares_the_writer() {
        let pool = ConnectionPool::new(Connection::open_in_memory().unwrap(), vec![]);

        pool.write(|conn| {
            conn.execute_batch("CREATE TABLE t (x INTEGER); INSERT INTO t VALUES (7);")
                .map_err(|e| DivanError::StorageUnavailable(e.to_string()))
        })
        .await
        .unwrap();

        let x: i64 = pool
            .read(|conn| {
                conn.query_row("SELECT x FROM t", [], |row| row.get(0))
                    .map_err(|e| DivanError::StorageUnavailable(e.to_string()))
            })
            .await
            .unwrap();

        assert_eq!(x, 7);
        assert_eq!(pool.reader_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn readers_run_side_by_side() {
        let readers = (0..2).map(|_| Connection::open_in_memory().unwrap()).collect();
        let pool = Arc::new(ConnectionPool::new(Connection::open_in_memory().unwrap(), readers));
        let (tx, rx) = std::sync::mpsc::channel::<()>();

        // The first read blocks until the second one has run, which needs a second reader.
        let first = {
            let pool = Arc::clone(&pool);
            tokio::spawn(async move {
                pool.read(move |_| {
                    rx.recv_timeout(Duration::from_secs(5))
                        .map_err(|e| DivanError::StorageUnavailable(e.to_string()))
                })
                .await
            })
        };
        pool.read(move |_| tx.send(()).map_err(|e| DivanError::StorageUnavailable(e.to_string())))
            .await
            .unwrap();

        first.await.unwrap().unwrap();
        assert_eq!(pool.reader_count(), 2);
    }
}
