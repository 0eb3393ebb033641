//! Data types for bucket voting.
//!
//! # Persisted
//!
//! - [`VoteRecord`] - one user's allocation to one item in one session
//!
//! # Per request
//!
//! - [`SessionContext`] - session key, budget and lock state for the page being served
//! - [`SubmissionBatch`] - raw votes posted by a voter
//! - [`DeletionRequest`] - items an admin asked to remove
//! - [`Viewer`] - identity and groups supplied by the host
//!
//! # Derived
//!
//! - [`Allocation`] - budget-normalized votes produced by scaling
//! - [`ItemTotal`] - votes per item summed across users

mod record;
mod request;
mod session;

pub use record::{Allocation, ItemTotal, UserId, VoteRecord, ANONYMOUS};
pub use request::{DeletionRequest, SubmissionBatch, SubmittedItem, Viewer};
pub use session::{DirectiveAttributes, SessionContext, DEFAULT_BUDGET};
