//! Database traits the storage layer is written against.
//!
//! The engine is agnostic to the backing store: anything offering typed
//! tables, point reads/writes and atomic write transactions satisfies it.

use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;

pub trait KeyT: Serialize + DeserializeOwned + Send + Sync + Ord + Clone + Debug + 'static {}
pub trait ValueT: Serialize + DeserializeOwned + Send + Sync + Clone + Debug + 'static {}

impl<K: Serialize + DeserializeOwned + Send + Sync + Ord + Clone + Debug + 'static> KeyT for K {}
impl<V: Serialize + DeserializeOwned + Send + Sync + Clone + Debug + 'static> ValueT for V {}

/// A typed table (column family) of the store.
pub trait Table: Send + Sync + Debug + 'static {
    type Key: KeyT;
    type Value: ValueT;

    const NAME: &'static str;
}

/// Interface to a DB read transaction.
pub trait DbTx {
    /// Returns the value for the given key from the table, if it exists.
    fn get<T: Table>(&self, key: &T::Key) -> eyre::Result<Option<T::Value>>;

    /// Returns true if the table contains a value for the specified key.
    fn contains_key<T: Table>(&self, key: &T::Key) -> eyre::Result<bool> {
        Ok(self.get::<T>(key)?.is_some())
    }
}

/// Interface to a DB write transaction.
///
/// A write transaction is the engine's batch: queued writes become visible
/// together on [`commit`], or not at all.
///
/// [`commit`]: DbTxMut::commit
pub trait DbTxMut: DbTx {
    /// Queue the given key/value into the table, replacing any existing entry.
    fn insert<T: Table>(&mut self, key: &T::Key, value: &T::Value) -> eyre::Result<()>;

    /// Queue removal of the entry for the given key.
    fn remove<T: Table>(&mut self, key: &T::Key) -> eyre::Result<()>;

    /// Commit queued writes to durable storage atomically.
    fn commit(self) -> eyre::Result<()>;
}

pub trait Database: Send + Sync + Clone + Unpin + 'static {
    type TX<'txn>: DbTx + Send + Debug + 'txn
    where
        Self: 'txn;
    type TXMut<'txn>: DbTxMut + Send + Debug + 'txn
    where
        Self: 'txn;

    /// Return a read txn object.
    fn read_txn(&self) -> eyre::Result<Self::TX<'_>>;

    /// Return a write txn object.
    fn write_txn(&self) -> eyre::Result<Self::TXMut<'_>>;

    /// Returns true if the table contains a value for the specified key.
    fn contains_key<T: Table>(&self, key: &T::Key) -> eyre::Result<bool>;

    /// Returns the value for the given key from the table, if it exists.
    fn get<T: Table>(&self, key: &T::Key) -> eyre::Result<Option<T::Value>>;

    /// Insert a single key-value pair. Creates and commits a transaction;
    /// use [`Database::write_txn`] for multi-write batches.
    fn insert<T: Table>(&self, key: &T::Key, value: &T::Value) -> eyre::Result<()>;

    /// Remove a single entry. Creates and commits a transaction; use
    /// [`Database::write_txn`] for multi-write batches.
    fn remove<T: Table>(&self, key: &T::Key) -> eyre::Result<()>;

    /// Returns true if the table holds no entries.
    fn is_empty<T: Table>(&self) -> bool;
}
