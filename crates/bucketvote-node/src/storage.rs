//! Persistent vote storage using RocksDB.
//!
//! Key layout: `vote:<hex session>:<user, 20 digits>:<hex item>`. Hex keeps
//! the `:` separator unambiguous for arbitrary keys, and the fixed-width user
//! id makes one user's records a contiguous prefix inside a session.

use bucketvote_core::{Allocation, Error, ItemTotal, Result, UserId, VoteRecord, VoteStore};
use rocksdb::{Options, WriteBatch, DB};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Number of locks serializing writes per (user, session).
const LOCK_STRIPES: usize = 64;

/// Storage backend for vote records.
pub struct Storage {
    db: DB,
    stripes: Vec<Mutex<()>>,
}

fn storage_err(e: impl std::fmt::Display) -> Error {
    Error::Storage(e.to_string())
}

fn session_prefix(session_key: &str) -> String {
    format!("vote:{}:", hex::encode(session_key))
}

fn user_prefix(session_key: &str, user_id: UserId) -> String {
    format!("{}{:020}:", session_prefix(session_key), user_id)
}

fn record_key(session_key: &str, user_id: UserId, item_key: &str) -> String {
    format!("{}{}", user_prefix(session_key, user_id), hex::encode(item_key))
}

impl Storage {
    /// Open or create storage at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> crate::error::Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path)?;
        let stripes = (0..LOCK_STRIPES).map(|_| Mutex::new(())).collect();
        Ok(Self { db, stripes })
    }

    /// Serialize mutations of one user's votes in one session.
    fn lock_user(&self, user_id: UserId, session_key: &str) -> Result<MutexGuard<'_, ()>> {
        let mut hasher = DefaultHasher::new();
        (user_id, session_key).hash(&mut hasher);
        let stripe = (hasher.finish() % LOCK_STRIPES as u64) as usize;
        self.stripes[stripe]
            .lock()
            .map_err(|_| Error::Storage("vote lock poisoned".into()))
    }

    /// All records under a key prefix, with their raw keys.
    fn scan(&self, prefix: &str) -> Result<Vec<(Box<[u8]>, VoteRecord)>> {
        let prefix = prefix.as_bytes();
        let mut records = Vec::new();

        let iter = self.db.prefix_iterator(prefix);
        for item in iter {
            let (key, value) = item.map_err(storage_err)?;
            if key.starts_with(prefix) {
                let record: VoteRecord = serde_json::from_slice(&value).map_err(storage_err)?;
                records.push((key, record));
            } else {
                break;
            }
        }

        Ok(records)
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        self.db.write(batch).map_err(storage_err)
    }
}

impl VoteStore for Storage {
    fn current_vote(&self, user_id: UserId, session_key: &str, item_key: &str) -> Result<u64> {
        let key = record_key(session_key, user_id, item_key);
        match self.db.get(key.as_bytes()).map_err(storage_err)? {
            Some(data) => {
                let record: VoteRecord = serde_json::from_slice(&data).map_err(storage_err)?;
                Ok(record.vote)
            }
            None => Ok(0),
        }
    }

    fn totals(&self, session_key: &str) -> Result<Vec<ItemTotal>> {
        let records = self.scan(&session_prefix(session_key))?;
        Ok(ItemTotal::aggregate(
            records
                .iter()
                .map(|(_, record)| (record.item_key.as_str(), record.vote)),
        ))
    }

    fn records_for_user(&self, user_id: UserId, session_key: &str) -> Result<Vec<VoteRecord>> {
        let mut records: Vec<VoteRecord> = self
            .scan(&user_prefix(session_key, user_id))?
            .into_iter()
            .map(|(_, record)| record)
            .collect();
        records.sort_by(|a, b| a.item_key.cmp(&b.item_key));
        Ok(records)
    }

    fn upsert_batch(
        &self,
        user_id: UserId,
        session_key: &str,
        allocation: &Allocation,
    ) -> Result<()> {
        if allocation.is_empty() {
            return Ok(());
        }

        let mut batch = WriteBatch::default();
        for (item_key, vote) in allocation.iter() {
            let record = VoteRecord::new(user_id, session_key, item_key, vote);
            let value = serde_json::to_vec(&record).map_err(storage_err)?;
            batch.put(record_key(session_key, user_id, item_key).as_bytes(), value);
        }

        let _guard = self.lock_user(user_id, session_key)?;
        self.write(batch)
    }

    fn delete_all_for_user(&self, user_id: UserId, session_key: &str) -> Result<()> {
        let _guard = self.lock_user(user_id, session_key)?;

        let mut batch = WriteBatch::default();
        for (key, _) in self.scan(&user_prefix(session_key, user_id))? {
            batch.delete(key);
        }
        self.write(batch)
    }

    fn delete_items_everywhere(&self, session_key: &str, item_keys: &[String]) -> Result<usize> {
        let mut batch = WriteBatch::default();
        let mut removed = 0;
        for (key, record) in self.scan(&session_prefix(session_key))? {
            if item_keys.contains(&record.item_key) {
                batch.delete(key);
                removed += 1;
            }
        }

        self.write(batch)?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn storage_roundtrip() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();

        storage.upsert(1, "Main Page", "feature 1.2", 7).unwrap();
        assert_eq!(storage.current_vote(1, "Main Page", "feature 1.2").unwrap(), 7);
        assert_eq!(storage.current_vote(2, "Main Page", "feature 1.2").unwrap(), 0);

        storage.upsert(1, "Main Page", "feature 1.2", 0).unwrap();
        assert_eq!(storage.current_vote(1, "Main Page", "feature 1.2").unwrap(), 0);
        assert_eq!(storage.records_for_user(1, "Main Page").unwrap().len(), 1);
    }

    #[test]
    fn survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let storage = Storage::open(dir.path()).unwrap();
            storage.upsert(3, "pg1", "A", 4).unwrap();
        }

        let storage = Storage::open(dir.path()).unwrap();
        assert_eq!(storage.current_vote(3, "pg1", "A").unwrap(), 4);
    }

    #[test]
    fn totals_sorted_with_tie_break() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();

        storage.upsert(1, "pg1", "A", 4).unwrap();
        storage.upsert(2, "pg1", "A", 3).unwrap();
        storage.upsert(1, "pg1", "B", 7).unwrap();
        storage.upsert(1, "pg1", "C", 9).unwrap();
        storage.upsert(1, "pg10", "A", 50).unwrap();

        assert_eq!(
            storage.totals("pg1").unwrap(),
            vec![
                ItemTotal::new("C", 9),
                ItemTotal::new("A", 7),
                ItemTotal::new("B", 7),
            ]
        );
    }

    #[test]
    fn sessions_sharing_a_prefix_stay_separate() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();

        storage.upsert(1, "a", "x", 1).unwrap();
        storage.upsert(1, "a:b", "x", 2).unwrap();
        storage.upsert(1, "ab", "x", 3).unwrap();

        assert_eq!(storage.totals("a").unwrap(), vec![ItemTotal::new("x", 1)]);
        storage.delete_all_for_user(1, "a").unwrap();
        assert_eq!(storage.current_vote(1, "a:b", "x").unwrap(), 2);
        assert_eq!(storage.current_vote(1, "ab", "x").unwrap(), 3);
    }

    #[test]
    fn batch_upsert_and_withdrawal() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();

        let allocation: Allocation = [("A", 5), ("B", 3), ("C", 2)].into_iter().collect();
        storage.upsert_batch(1, "pg1", &allocation).unwrap();
        storage.upsert(2, "pg1", "A", 10).unwrap();
        assert_eq!(storage.records_for_user(1, "pg1").unwrap().len(), 3);

        storage.delete_all_for_user(1, "pg1").unwrap();
        assert!(storage.records_for_user(1, "pg1").unwrap().is_empty());
        assert_eq!(storage.current_vote(2, "pg1", "A").unwrap(), 10);

        storage.upsert_batch(1, "pg1", &Allocation::new()).unwrap();
        assert!(storage.records_for_user(1, "pg1").unwrap().is_empty());
    }

    #[test]
    fn delete_items_everywhere() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();

        storage.upsert(1, "pg1", "A", 4).unwrap();
        storage.upsert(2, "pg1", "A", 6).unwrap();
        storage.upsert(2, "pg1", "B", 4).unwrap();
        storage.upsert(2, "pg2", "A", 10).unwrap();

        assert_eq!(storage.delete_item_everywhere("pg1", "A").unwrap(), 2);
        assert_eq!(storage.totals("pg1").unwrap(), vec![ItemTotal::new("B", 4)]);
        assert_eq!(storage.current_vote(2, "pg2", "A").unwrap(), 10);
        assert_eq!(storage.delete_item_everywhere("pg1", "missing").unwrap(), 0);
    }
}
