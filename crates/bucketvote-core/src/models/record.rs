//! Vote records and the values derived from them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Host-assigned user identifier.
pub type UserId = u64;

/// User id of a viewer who is not logged in.
pub const ANONYMOUS: UserId = 0;

/// A single user's vote for one item in one session.
///
/// At most one record exists per `(user_id, session_key, item_key)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoteRecord {
    pub user_id: UserId,
    pub session_key: String,
    pub item_key: String,
    pub vote: u64,
}

impl VoteRecord {
    pub fn new(user_id: UserId, session_key: &str, item_key: &str, vote: u64) -> Self {
        Self {
            user_id,
            session_key: session_key.to_string(),
            item_key: item_key.to_string(),
            vote,
        }
    }
}

/// Votes for one item summed across all users of a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemTotal {
    pub item_key: String,
    pub total: u64,
}

impl ItemTotal {
    pub fn new(item_key: impl Into<String>, total: u64) -> Self {
        Self {
            item_key: item_key.into(),
            total,
        }
    }

    /// Sort totals descending, equal totals by item key ascending.
    pub fn sort(totals: &mut [ItemTotal]) {
        totals.sort_by(|a, b| {
            b.total
                .cmp(&a.total)
                .then_with(|| a.item_key.cmp(&b.item_key))
        });
    }

    /// Sum per-item votes into sorted totals.
    pub fn aggregate<'a, I>(votes: I) -> Vec<ItemTotal>
    where
        I: IntoIterator<Item = (&'a str, u64)>,
    {
        let mut sums: BTreeMap<&str, u64> = BTreeMap::new();
        for (item, vote) in votes {
            let sum = sums.entry(item).or_default();
            *sum = sum.saturating_add(vote);
        }

        let mut totals: Vec<ItemTotal> = sums
            .into_iter()
            .map(|(item, total)| ItemTotal::new(item, total))
            .collect();
        Self::sort(&mut totals);
        totals
    }
}

/// Integer votes per item, as produced by scaling a submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Allocation {
    votes: BTreeMap<String, u64>,
}

impl Allocation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the votes for an item, replacing any earlier value.
    pub fn insert(&mut self, item_key: impl Into<String>, vote: u64) {
        self.votes.insert(item_key.into(), vote);
    }

    pub fn get(&self, item_key: &str) -> Option<u64> {
        self.votes.get(item_key).copied()
    }

    /// Iterate items in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.votes.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.votes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }

    /// Sum of all allocated votes.
    pub fn total(&self) -> u64 {
        self.votes.values().fold(0, |acc, v| acc.saturating_add(*v))
    }
}

impl<K: Into<String>> FromIterator<(K, u64)> for Allocation {
    fn from_iter<T: IntoIterator<Item = (K, u64)>>(iter: T) -> Self {
        Self {
            votes: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
