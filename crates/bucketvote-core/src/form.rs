//! Form field codec.
//!
//! Votes are posted as form fields. Item keys may contain characters that
//! some transports rewrite inside field names (spaces and periods become
//! underscores), so they always travel base64-encoded:
//!
//! | Field | Meaning |
//! |-------|---------|
//! | `voteaction` | `vote` or `admin` |
//! | `_votekey` | session key the form was rendered for |
//! | `item_<b64>` | raw vote for the item |
//! | `delete_<b64>` | present when an admin ticks the item for deletion |

use crate::error::{Error, Result};
use crate::models::{DeletionRequest, SubmissionBatch, SubmittedItem};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

pub const ACTION_FIELD: &str = "voteaction";
pub const SESSION_KEY_FIELD: &str = "_votekey";
pub const ITEM_PREFIX: &str = "item_";
pub const DELETE_PREFIX: &str = "delete_";

/// What a posted form asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormAction {
    Vote(SubmissionBatch),
    Admin(DeletionRequest),
}

/// Encode an item key for use in a field name.
pub fn encode_item_key(item_key: &str) -> String {
    STANDARD.encode(item_key.as_bytes())
}

/// Decode an item key taken from a field name.
///
/// Keys are arbitrary bytes on the wire. Bytes that are not UTF-8 are
/// replaced with U+FFFD instead of failing the whole form.
pub fn decode_item_key(encoded: &str) -> Result<String> {
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| Error::Validation(format!("Malformed vote field {encoded:?}: {e}")))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Input field name for an item.
pub fn item_field_name(item_key: &str) -> String {
    format!("{ITEM_PREFIX}{}", encode_item_key(item_key))
}

/// Deletion checkbox name for an item.
pub fn delete_field_name(item_key: &str) -> String {
    format!("{DELETE_PREFIX}{}", encode_item_key(item_key))
}

/// Interpret posted fields.
///
/// Returns `None` when the form carries no recognised `voteaction`. Keys are
/// not decoded here; malformed keys surface when the action is processed.
pub fn parse_form<I, K, V>(fields: I) -> Option<FormAction>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut action = None;
    let mut session_key = String::new();
    let mut items = Vec::new();
    let mut deletions = Vec::new();

    for (name, value) in fields {
        let (name, value) = (name.as_ref(), value.as_ref());
        if name == ACTION_FIELD {
            action = Some(value.to_string());
        } else if name == SESSION_KEY_FIELD {
            session_key = value.to_string();
        } else if let Some(encoded) = name.strip_prefix(ITEM_PREFIX) {
            items.push(SubmittedItem::new(encoded, value));
        } else if let Some(encoded) = name.strip_prefix(DELETE_PREFIX) {
            deletions.push(encoded.to_string());
        }
    }

    match action.as_deref() {
        Some("vote") => Some(FormAction::Vote(SubmissionBatch { session_key, items })),
        Some("admin") => Some(FormAction::Admin(DeletionRequest {
            encoded_keys: deletions,
        })),
        _ => None,
    }
}
