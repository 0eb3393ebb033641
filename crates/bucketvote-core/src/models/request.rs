//! Typed views of what a request carries.

use crate::error::Result;
use crate::form::decode_item_key;
use crate::models::{UserId, ANONYMOUS};
use serde::{Deserialize, Serialize};

/// One `item_<encoded key>` field of a vote submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedItem {
    /// Base64 form of the item key, as found in the field name
    pub encoded_key: String,

    /// Field value exactly as posted
    pub raw_value: String,
}

impl SubmittedItem {
    pub fn new(encoded_key: impl Into<String>, raw_value: impl Into<String>) -> Self {
        Self {
            encoded_key: encoded_key.into(),
            raw_value: raw_value.into(),
        }
    }

    /// Decode the item key.
    pub fn item_key(&self) -> Result<String> {
        decode_item_key(&self.encoded_key)
    }
}

/// Raw votes posted with `voteaction=vote`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionBatch {
    /// Value of the `_votekey` field; empty when missing
    pub session_key: String,

    /// Item fields in the order they were posted
    pub items: Vec<SubmittedItem>,
}

impl SubmissionBatch {
    pub fn new(session_key: impl Into<String>) -> Self {
        Self {
            session_key: session_key.into(),
            items: Vec::new(),
        }
    }

    /// Add an item by its plain key.
    pub fn with_item(mut self, item_key: &str, raw_value: &str) -> Self {
        self.items.push(SubmittedItem::new(
            crate::form::encode_item_key(item_key),
            raw_value,
        ));
        self
    }
}

/// Items flagged with `delete_<encoded key>` on an admin post.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionRequest {
    pub encoded_keys: Vec<String>,
}

impl DeletionRequest {
    /// Decode every key. Fails on the first malformed one.
    pub fn item_keys(&self) -> Result<Vec<String>> {
        self.encoded_keys
            .iter()
            .map(|encoded| decode_item_key(encoded))
            .collect()
    }
}

/// The viewer of the current request, as identified by the host.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: UserId,
    pub groups: Vec<String>,
}

impl Viewer {
    pub fn new(user_id: UserId, groups: Vec<String>) -> Self {
        Self { user_id, groups }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id != ANONYMOUS
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }
}
