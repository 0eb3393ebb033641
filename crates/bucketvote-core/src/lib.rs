//! Bucket Voting - budgeted vote distribution
//!
//! Logged-in users spread a fixed budget of votes across the candidate items
//! of a session. Whatever numbers they type are scaled proportionally to the
//! budget and stored per (user, session, item). Members of an admin group see
//! per-item totals and can delete items.
//!
//! # Architecture
//!
//! - **Models**: records, session context, typed requests
//! - **Scaling**: raw values to a budget-normalized allocation
//! - **Store**: the [`VoteStore`] contract and an in-memory store
//! - **Processor**: validation and batch-atomic application of submissions
//! - **Admin**: totals and group-gated deletion
//! - **Form**: field names and base64 item keys
//! - **Directives**: per-render entry points for the page host
//!
//! # Example
//!
//! ```
//! use bucketvote_core::{
//!     DirectiveAttributes, FormAction, MemoryVoteStore, PageVoting, SubmissionBatch,
//!     VoteDirectives, VoteStore, Viewer, DEFAULT_ADMIN_GROUP,
//! };
//!
//! let store = MemoryVoteStore::new();
//! let batch = SubmissionBatch::new("Roadmap").with_item("A", "1").with_item("B", "1");
//!
//! let mut page = PageVoting::new(&store, DEFAULT_ADMIN_GROUP, "Roadmap", Viewer::new(42, vec![]))
//!     .with_form(Some(FormAction::Vote(batch)));
//! page.vote_start(&DirectiveAttributes::new()).unwrap();
//!
//! assert_eq!(store.current_vote(42, "Roadmap", "A").unwrap(), 5);
//! ```

pub mod admin;
pub mod directives;
pub mod error;
pub mod form;
pub mod models;
pub mod processor;
pub mod scaling;
pub mod store;

pub use admin::{AdminAggregator, DEFAULT_ADMIN_GROUP};
pub use directives::{
    AdminSummary, PageVoting, StartFragment, SubmitControl, SummaryRow, VoteDirectives, VoteField,
};
pub use error::{Error, Result};
pub use form::{parse_form, FormAction};
pub use models::{
    Allocation, DeletionRequest, DirectiveAttributes, ItemTotal, SessionContext, SubmissionBatch,
    SubmittedItem, UserId, Viewer, VoteRecord, ANONYMOUS, DEFAULT_BUDGET,
};
pub use processor::{SubmissionOutcome, SubmissionProcessor};
pub use scaling::{scale, RawVotes, Scaled};
pub use store::{MemoryVoteStore, VoteStore};
