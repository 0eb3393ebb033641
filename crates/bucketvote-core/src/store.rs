//! Vote storage contract and an in-memory implementation.

use crate::error::{Error, Result};
use crate::models::{Allocation, ItemTotal, UserId, VoteRecord};
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Persistence for vote records keyed by `(user, session, item)`.
///
/// Implementations must apply each batch method as a single atomic change:
/// readers and concurrent writers observe either all of it or none of it.
pub trait VoteStore: Send + Sync {
    /// The user's vote for an item, 0 when no record exists.
    fn current_vote(&self, user_id: UserId, session_key: &str, item_key: &str) -> Result<u64>;

    /// Votes per item summed over all users, highest first, ties by item key.
    fn totals(&self, session_key: &str) -> Result<Vec<ItemTotal>>;

    /// All of one user's records for a session, ordered by item key.
    fn records_for_user(&self, user_id: UserId, session_key: &str) -> Result<Vec<VoteRecord>>;

    /// Create or overwrite one record per allocated item, atomically.
    fn upsert_batch(&self, user_id: UserId, session_key: &str, allocation: &Allocation)
        -> Result<()>;

    /// Remove every record the user holds in the session.
    fn delete_all_for_user(&self, user_id: UserId, session_key: &str) -> Result<()>;

    /// Remove the records of all users for the given items, atomically.
    /// Returns how many records were removed.
    fn delete_items_everywhere(&self, session_key: &str, item_keys: &[String]) -> Result<usize>;

    /// Create or overwrite a single record.
    fn upsert(&self, user_id: UserId, session_key: &str, item_key: &str, vote: u64) -> Result<()> {
        let allocation: Allocation = [(item_key, vote)].into_iter().collect();
        self.upsert_batch(user_id, session_key, &allocation)
    }

    /// Remove the records of all users for one item.
    fn delete_item_everywhere(&self, session_key: &str, item_key: &str) -> Result<usize> {
        self.delete_items_everywhere(session_key, &[item_key.to_string()])
    }
}

type Table = BTreeMap<(String, UserId, String), u64>;

/// Vote store held in process memory.
///
/// Rows are keyed `(session, user, item)` so per-session and per-user scans
/// are range reads.
#[derive(Debug, Default)]
pub struct MemoryVoteStore {
    table: RwLock<Table>,
}

impl MemoryVoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records across all sessions.
    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read()?.is_empty())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Table>> {
        self.table
            .read()
            .map_err(|_| Error::Storage("vote table lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Table>> {
        self.table
            .write()
            .map_err(|_| Error::Storage("vote table lock poisoned".into()))
    }
}

fn user_range<'a>(
    table: &'a Table,
    user_id: UserId,
    session_key: &'a str,
) -> impl Iterator<Item = (&'a (String, UserId, String), &'a u64)> + 'a {
    let start = (session_key.to_string(), user_id, String::new());
    table
        .range(start..)
        .take_while(move |((session, user, _), _)| session == session_key && *user == user_id)
}

impl VoteStore for MemoryVoteStore {
    fn current_vote(&self, user_id: UserId, session_key: &str, item_key: &str) -> Result<u64> {
        let key = (session_key.to_string(), user_id, item_key.to_string());
        Ok(self.read()?.get(&key).copied().unwrap_or(0))
    }

    fn totals(&self, session_key: &str) -> Result<Vec<ItemTotal>> {
        let table = self.read()?;
        let start = (session_key.to_string(), 0, String::new());
        let votes = table
            .range(start..)
            .take_while(|((session, _, _), _)| session == session_key)
            .map(|((_, _, item), vote)| (item.as_str(), *vote));
        Ok(ItemTotal::aggregate(votes))
    }

    fn records_for_user(&self, user_id: UserId, session_key: &str) -> Result<Vec<VoteRecord>> {
        let table = self.read()?;
        Ok(user_range(&table, user_id, session_key)
            .map(|((session, user, item), vote)| VoteRecord::new(*user, session, item, *vote))
            .collect())
    }

    fn upsert_batch(
        &self,
        user_id: UserId,
        session_key: &str,
        allocation: &Allocation,
    ) -> Result<()> {
        let mut table = self.write()?;
        for (item_key, vote) in allocation.iter() {
            table.insert(
                (session_key.to_string(), user_id, item_key.to_string()),
                vote,
            );
        }
        Ok(())
    }

    fn delete_all_for_user(&self, user_id: UserId, session_key: &str) -> Result<()> {
        let mut table = self.write()?;
        let keys: Vec<_> = user_range(&table, user_id, session_key)
            .map(|(key, _)| key.clone())
            .collect();
        for key in keys {
            table.remove(&key);
        }
        Ok(())
    }

    fn delete_items_everywhere(&self, session_key: &str, item_keys: &[String]) -> Result<usize> {
        let mut table = self.write()?;
        let before = table.len();
        table.retain(|(session, _, item), _| session != session_key || !item_keys.contains(item));
        Ok(before - table.len())
    }
}
