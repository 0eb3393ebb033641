//! Aggregated totals and item deletion for session administrators.

use crate::error::{Error, Result};
use crate::models::{DeletionRequest, ItemTotal, Viewer};
use crate::store::VoteStore;
use tracing::{info, warn};

/// Group allowed to see totals and delete items unless configured otherwise.
pub const DEFAULT_ADMIN_GROUP: &str = "sysop";

/// Read-only totals plus group-gated deletion.
pub struct AdminAggregator<'a, S: VoteStore + ?Sized> {
    store: &'a S,
    admin_group: &'a str,
}

impl<'a, S: VoteStore + ?Sized> AdminAggregator<'a, S> {
    pub fn new(store: &'a S, admin_group: &'a str) -> Self {
        Self { store, admin_group }
    }

    pub fn admin_group(&self) -> &str {
        self.admin_group
    }

    /// Whether the viewer belongs to the admin group.
    pub fn is_authorized(&self, viewer: &Viewer) -> bool {
        viewer.in_group(self.admin_group)
    }

    /// Votes per item across all users, highest first.
    pub fn summary(&self, session_key: &str) -> Result<Vec<ItemTotal>> {
        self.store.totals(session_key)
    }

    /// Delete every requested item for all users of the session.
    ///
    /// Authorization is checked once for the whole request and every key is
    /// decoded before anything is removed, so a rejected request deletes
    /// nothing. Returns the number of records removed.
    pub fn handle_deletion(
        &self,
        request: &DeletionRequest,
        session_key: &str,
        viewer: &Viewer,
    ) -> Result<usize> {
        if !self.is_authorized(viewer) {
            warn!(
                user_id = viewer.user_id,
                session = session_key,
                "deletion attempted without admin group membership"
            );
            return Err(Error::Unauthorized(format!(
                "deleting votes requires membership in {:?}",
                self.admin_group
            )));
        }

        let item_keys = request.item_keys()?;
        if item_keys.is_empty() {
            return Ok(0);
        }

        let removed = self.store.delete_items_everywhere(session_key, &item_keys)?;
        info!(
            user_id = viewer.user_id,
            session = session_key,
            items = ?item_keys,
            removed,
            "deleted items"
        );
        Ok(removed)
    }
}
