//! Impermanent storage in memory - the provided [`Database`] backend and the
//! workhorse of the test suite.

use dashmap::DashMap;
use lamina_types::{decode, encode, encode_key, Database, DbTx, DbTxMut, Table};
use parking_lot::RwLock;
use std::{collections::BTreeMap, fmt::Debug, sync::Arc};

type StoreType = Arc<DashMap<&'static str, Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>>>;

fn get<T: Table>(store: &StoreType, key: &T::Key) -> eyre::Result<Option<T::Value>> {
    if let Some(table) = store.get(T::NAME) {
        let key_bytes = encode_key(key);
        if let Some(val_bytes) = table.read().get(&key_bytes) {
            return Ok(Some(decode(val_bytes)));
        }
    }
    Ok(None)
}

#[derive(Clone, Debug)]
pub struct MemDbTx {
    store: StoreType,
    commit_lock: Arc<RwLock<()>>,
}

impl DbTx for MemDbTx {
    fn get<T: Table>(&self, key: &T::Key) -> eyre::Result<Option<T::Value>> {
        let _committed = self.commit_lock.read();
        get::<T>(&self.store, key)
    }
}

/// A single buffered write.
#[derive(Clone, Debug)]
enum WriteOp {
    Put { table: &'static str, key: Vec<u8>, value: Vec<u8> },
    Delete { table: &'static str, key: Vec<u8> },
}

/// Write transaction buffering its operations until commit.
///
/// Readers never observe a partially applied transaction: commit applies the
/// whole buffer under the database-wide commit lock.
#[derive(Clone, Debug)]
pub struct MemDbTxMut {
    store: StoreType,
    commit_lock: Arc<RwLock<()>>,
    ops: Vec<WriteOp>,
}

impl DbTx for MemDbTxMut {
    fn get<T: Table>(&self, key: &T::Key) -> eyre::Result<Option<T::Value>> {
        let _committed = self.commit_lock.read();
        get::<T>(&self.store, key)
    }
}

impl DbTxMut for MemDbTxMut {
    fn insert<T: Table>(&mut self, key: &T::Key, value: &T::Value) -> eyre::Result<()> {
        if !self.store.contains_key(T::NAME) {
            return Err(eyre::eyre!("invalid table {}", T::NAME));
        }
        self.ops.push(WriteOp::Put {
            table: T::NAME,
            key: encode_key(key),
            value: encode(value),
        });
        Ok(())
    }

    fn remove<T: Table>(&mut self, key: &T::Key) -> eyre::Result<()> {
        if !self.store.contains_key(T::NAME) {
            return Err(eyre::eyre!("invalid table {}", T::NAME));
        }
        self.ops.push(WriteOp::Delete { table: T::NAME, key: encode_key(key) });
        Ok(())
    }

    fn commit(self) -> eyre::Result<()> {
        let _exclusive = self.commit_lock.write();
        for op in self.ops {
            match op {
                WriteOp::Put { table, key, value } => {
                    let table =
                        self.store.get(table).ok_or_else(|| eyre::eyre!("invalid table {table}"))?;
                    table.write().insert(key, value);
                }
                WriteOp::Delete { table, key } => {
                    let table =
                        self.store.get(table).ok_or_else(|| eyre::eyre!("invalid table {table}"))?;
                    table.write().remove(&key);
                }
            }
        }
        Ok(())
    }
}

/// Implement the [`Database`] trait with an in-memory store.
///
/// No persistence. Point reads take the commit lock shared, commits take it
/// exclusive, so a batch becomes visible all at once.
#[derive(Clone, Debug, Default)]
pub struct MemDatabase {
    store: StoreType,
    commit_lock: Arc<RwLock<()>>,
}

impl MemDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table. Reads of unregistered tables resolve to nothing and
    /// writes to them fail.
    pub fn open_table<T: Table>(&self) {
        self.store.insert(T::NAME, Arc::new(RwLock::new(BTreeMap::new())));
    }
}

impl Database for MemDatabase {
    type TX<'txn>
        = MemDbTx
    where
        Self: 'txn;

    type TXMut<'txn>
        = MemDbTxMut
    where
        Self: 'txn;

    fn read_txn(&self) -> eyre::Result<Self::TX<'_>> {
        Ok(MemDbTx { store: self.store.clone(), commit_lock: self.commit_lock.clone() })
    }

    fn write_txn(&self) -> eyre::Result<Self::TXMut<'_>> {
        Ok(MemDbTxMut {
            store: self.store.clone(),
            commit_lock: self.commit_lock.clone(),
            ops: Vec::new(),
        })
    }

    fn contains_key<T: Table>(&self, key: &T::Key) -> eyre::Result<bool> {
        let _committed = self.commit_lock.read();
        if let Some(table) = self.store.get(T::NAME) {
            return Ok(table.read().contains_key(&encode_key(key)));
        }
        Ok(false)
    }

    fn get<T: Table>(&self, key: &T::Key) -> eyre::Result<Option<T::Value>> {
        let _committed = self.commit_lock.read();
        get::<T>(&self.store, key)
    }

    fn insert<T: Table>(&self, key: &T::Key, value: &T::Value) -> eyre::Result<()> {
        let mut txn = self.write_txn()?;
        txn.insert::<T>(key, value)?;
        txn.commit()
    }

    fn remove<T: Table>(&self, key: &T::Key) -> eyre::Result<()> {
        let mut txn = self.write_txn()?;
        txn.remove::<T>(key)?;
        txn.commit()
    }

    fn is_empty<T: Table>(&self) -> bool {
        self.store.get(T::NAME).map(|table| table.read().is_empty()).unwrap_or(true)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Debug)]
    pub struct TestTable {}
    impl Table for TestTable {
        type Key = u64;
        type Value = String;

        const NAME: &'static str = "TestTable";
    }

    fn open_db() -> MemDatabase {
        let db = MemDatabase::new();
        db.open_table::<TestTable>();
        db
    }

    #[test]
    fn test_memdb_get() {
        let db = open_db();
        db.insert::<TestTable>(&123456789, &"123456789".to_string()).expect("insert");
        assert_eq!(
            Some("123456789".to_string()),
            db.get::<TestTable>(&123456789).expect("get")
        );
        assert_eq!(None, db.get::<TestTable>(&0).expect("get"));
    }

    #[test]
    fn test_memdb_contains_key() {
        let db = open_db();
        db.insert::<TestTable>(&123456789, &"123456789".to_string()).expect("insert");
        assert!(db.contains_key::<TestTable>(&123456789).expect("contains"));
        assert!(!db.contains_key::<TestTable>(&0).expect("contains"));
    }

    #[test]
    fn test_memdb_remove() {
        let db = open_db();
        db.insert::<TestTable>(&123456789, &"123456789".to_string()).expect("insert");
        assert!(db.get::<TestTable>(&123456789).expect("get").is_some());

        db.remove::<TestTable>(&123456789).expect("remove");
        assert!(db.get::<TestTable>(&123456789).expect("get").is_none());
    }

    #[test]
    fn test_memdb_is_empty() {
        let db = open_db();
        assert!(db.is_empty::<TestTable>());
        db.insert::<TestTable>(&1, &"1".to_string()).expect("insert");
        assert!(!db.is_empty::<TestTable>());
    }

    #[test]
    fn test_memdb_batch_invisible_until_commit() {
        let db = open_db();
        let mut txn = db.write_txn().expect("txn");
        for (key, value) in (0..10u64).map(|i| (i, i.to_string())) {
            txn.insert::<TestTable>(&key, &value).expect("buffered insert");
        }
        assert!(db.get::<TestTable>(&3).expect("get").is_none());

        txn.commit().expect("commit");
        for (key, value) in (0..10u64).map(|i| (i, i.to_string())) {
            assert_eq!(Some(value), db.get::<TestTable>(&key).expect("get"));
        }
    }

    #[test]
    fn test_memdb_dropped_batch_writes_nothing() {
        let db = open_db();
        let mut txn = db.write_txn().expect("txn");
        txn.insert::<TestTable>(&7, &"7".to_string()).expect("buffered insert");
        drop(txn);
        assert!(db.get::<TestTable>(&7).expect("get").is_none());
    }

    #[test]
    fn test_memdb_unknown_table_write_fails() {
        #[derive(Debug)]
        struct Unregistered {}
        impl Table for Unregistered {
            type Key = u64;
            type Value = String;
            const NAME: &'static str = "Unregistered";
        }

        let db = MemDatabase::new();
        let mut txn = db.write_txn().expect("txn");
        assert!(txn.insert::<Unregistered>(&1, &"1".to_string()).is_err());
        assert!(db.get::<Unregistered>(&1).expect("get").is_none());
    }
}
