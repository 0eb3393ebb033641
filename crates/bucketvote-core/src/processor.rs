//! Vote submission processing.
//!
//! A submission moves through `AwaitingSubmission -> Validating ->
//! {Applying, Rejected}`. Checks run in a fixed order and nothing is written
//! unless every check passes:
//!
//! 1. Locked session: silently ignored
//! 2. Posted session key differs from the rendered one: tampering, fatal
//! 3. Anonymous viewer: authentication required
//! 4. Any malformed key or value: validation error
//! 5. All values zero: full withdrawal
//! 6. Otherwise: scale and upsert the whole allocation as one batch

use crate::error::{Error, Result};
use crate::models::{Allocation, SessionContext, SubmissionBatch, UserId, ANONYMOUS};
use crate::scaling::{scale, RawVotes, Scaled};
use crate::store::VoteStore;
use tracing::{debug, info, warn};

/// How an accepted submission changed the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// The session is locked; nothing changed.
    Locked,
    /// Every value was zero; the voter's records were removed.
    Withdrawn,
    /// The scaled votes were stored.
    Applied(Allocation),
}

/// Applies vote submissions to a store.
pub struct SubmissionProcessor<'a, S: VoteStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: VoteStore + ?Sized> SubmissionProcessor<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Validate, scale and persist one submission.
    pub fn process(
        &self,
        context: &SessionContext,
        user_id: UserId,
        batch: &SubmissionBatch,
    ) -> Result<SubmissionOutcome> {
        if context.is_locked() {
            debug!(session = context.session_key(), "ignoring submission to locked session");
            return Ok(SubmissionOutcome::Locked);
        }

        if batch.session_key.is_empty() || batch.session_key != context.session_key() {
            warn!(
                expected = context.session_key(),
                submitted = %batch.session_key,
                "session key mismatch on submission"
            );
            return Err(Error::SessionKeyMismatch {
                expected: context.session_key().to_string(),
                submitted: batch.session_key.clone(),
            });
        }

        if user_id == ANONYMOUS {
            debug!(session = context.session_key(), "anonymous submission rejected");
            return Err(Error::AuthenticationRequired);
        }

        let raw = validate(batch).inspect_err(|e| {
            debug!(user_id, session = context.session_key(), error = %e, "submission rejected");
        })?;

        match scale(&raw, context.budget())? {
            Scaled::Withdrawal => {
                self.store.delete_all_for_user(user_id, context.session_key())?;
                info!(user_id, session = context.session_key(), "votes withdrawn");
                Ok(SubmissionOutcome::Withdrawn)
            }
            Scaled::Allocation(allocation) => {
                self.store
                    .upsert_batch(user_id, context.session_key(), &allocation)?;
                info!(
                    user_id,
                    session = context.session_key(),
                    items = allocation.len(),
                    allocated = allocation.total(),
                    budget = context.budget().get(),
                    "votes applied"
                );
                Ok(SubmissionOutcome::Applied(allocation))
            }
        }
    }
}

fn validate(batch: &SubmissionBatch) -> Result<RawVotes> {
    let mut raw = RawVotes::new();
    for item in &batch.items {
        raw.insert_raw(item.item_key()?, &item.raw_value)?;
    }
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SubmittedItem, DEFAULT_BUDGET};
    use crate::store::MemoryVoteStore;
    use std::num::NonZeroU32;

    fn context() -> SessionContext {
        SessionContext::new("pg1", DEFAULT_BUDGET, false)
    }

    fn batch(pairs: &[(&str, &str)]) -> SubmissionBatch {
        pairs
            .iter()
            .fold(SubmissionBatch::new("pg1"), |b, (k, v)| b.with_item(k, v))
    }

    #[test]
    fn applies_scaled_votes() {
        let store = MemoryVoteStore::new();
        let processor = SubmissionProcessor::new(&store);

        let outcome = processor
            .process(&context(), 1, &batch(&[("A", "1"), ("B", "1"), ("C", "1")]))
            .unwrap();

        let SubmissionOutcome::Applied(allocation) = outcome else {
            panic!("expected votes to be applied");
        };
        assert_eq!(allocation.total(), 9);
        for item in ["A", "B", "C"] {
            assert_eq!(store.current_vote(1, "pg1", item).unwrap(), 3);
        }
    }

    #[test]
    fn resubmission_overwrites() {
        let store = MemoryVoteStore::new();
        let processor = SubmissionProcessor::new(&store);

        processor
            .process(&context(), 1, &batch(&[("A", "5"), ("B", "5")]))
            .unwrap();
        processor
            .process(&context(), 1, &batch(&[("A", "10"), ("B", "0")]))
            .unwrap();

        assert_eq!(store.current_vote(1, "pg1", "A").unwrap(), 10);
        assert_eq!(store.current_vote(1, "pg1", "B").unwrap(), 0);
        assert_eq!(store.len().unwrap(), 2);
    }

    #[test]
    fn same_batch_twice_is_idempotent() {
        let store = MemoryVoteStore::new();
        store.upsert(2, "pg1", "A", 10).unwrap();
        let processor = SubmissionProcessor::new(&store);
        // B scales to zero
        let submission = batch(&[("A", "7"), ("B", "0"), ("C", "3")]);

        processor.process(&context(), 1, &submission).unwrap();
        let first = store.records_for_user(1, "pg1").unwrap();
        let totals = store.totals("pg1").unwrap();

        processor.process(&context(), 1, &submission).unwrap();
        assert_eq!(store.records_for_user(1, "pg1").unwrap(), first);
        assert_eq!(store.totals("pg1").unwrap(), totals);
        assert_eq!(store.current_vote(1, "pg1", "B").unwrap(), 0);
    }

    #[test]
    fn tiny_positive_value_does_not_withdraw() {
        let store = MemoryVoteStore::new();
        store.upsert(1, "pg1", "Old", 10).unwrap();
        let processor = SubmissionProcessor::new(&store);

        let err = processor
            .process(&context(), 1, &batch(&[("A", "0.00000000000000000000000000001")]))
            .unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(store.current_vote(1, "pg1", "Old").unwrap(), 10);
    }

    #[test]
    fn binary_item_key_is_accepted() {
        let store = MemoryVoteStore::new();
        let processor = SubmissionProcessor::new(&store);

        let mut submission = batch(&[("A", "1")]);
        // ff 41
        submission.items.push(SubmittedItem::new("/0E=", "1"));
        processor.process(&context(), 1, &submission).unwrap();

        assert_eq!(store.current_vote(1, "pg1", "A").unwrap(), 5);
        assert_eq!(store.current_vote(1, "pg1", "\u{FFFD}A").unwrap(), 5);
    }

    #[test]
    fn zero_sum_withdraws_everything() {
        let store = MemoryVoteStore::new();
        store.upsert(1, "pg1", "A", 6).unwrap();
        store.upsert(1, "pg1", "Z", 4).unwrap();
        store.upsert(2, "pg1", "A", 10).unwrap();
        let processor = SubmissionProcessor::new(&store);

        let outcome = processor
            .process(&context(), 1, &batch(&[("A", "0"), ("B", "")]))
            .unwrap();

        assert_eq!(outcome, SubmissionOutcome::Withdrawn);
        assert!(store.records_for_user(1, "pg1").unwrap().is_empty());
        assert_eq!(store.current_vote(2, "pg1", "A").unwrap(), 10);

        // Withdrawing again is harmless
        let again = processor
            .process(&context(), 1, &batch(&[("A", "0")]))
            .unwrap();
        assert_eq!(again, SubmissionOutcome::Withdrawn);
    }

    #[test]
    fn locked_session_is_silent_noop() {
        let store = MemoryVoteStore::new();
        let processor = SubmissionProcessor::new(&store);
        let locked = SessionContext::new("pg1", DEFAULT_BUDGET, true);

        // Even a tampered, anonymous, invalid batch is ignored
        let mut tampered = batch(&[("A", "-4")]);
        tampered.session_key = "elsewhere".into();
        let outcome = processor.process(&locked, 0, &tampered).unwrap();

        assert_eq!(outcome, SubmissionOutcome::Locked);
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn session_key_mismatch_is_fatal() {
        let store = MemoryVoteStore::new();
        let processor = SubmissionProcessor::new(&store);

        let mut other = batch(&[("A", "5")]);
        other.session_key = "pg2".into();
        let err = processor.process(&context(), 1, &other).unwrap_err();
        assert!(matches!(err, Error::SessionKeyMismatch { .. }));
        assert!(err.is_fatal());

        let mut empty = batch(&[("A", "5")]);
        empty.session_key.clear();
        assert!(matches!(
            processor.process(&context(), 1, &empty),
            Err(Error::SessionKeyMismatch { .. })
        ));
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn anonymous_rejected() {
        let store = MemoryVoteStore::new();
        let processor = SubmissionProcessor::new(&store);

        let err = processor
            .process(&context(), 0, &batch(&[("A", "5")]))
            .unwrap_err();
        assert_eq!(err, Error::AuthenticationRequired);
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn invalid_value_rejects_whole_batch() {
        let store = MemoryVoteStore::new();
        store.upsert(1, "pg1", "A", 2).unwrap();
        let processor = SubmissionProcessor::new(&store);

        let err = processor
            .process(&context(), 1, &batch(&[("A", "5"), ("B", "-1"), ("C", "3")]))
            .unwrap_err();

        assert!(err.is_user_visible());
        assert_eq!(store.current_vote(1, "pg1", "A").unwrap(), 2);
        assert_eq!(store.current_vote(1, "pg1", "C").unwrap(), 0);
    }

    #[test]
    fn malformed_key_rejects_whole_batch() {
        let store = MemoryVoteStore::new();
        let processor = SubmissionProcessor::new(&store);

        let mut bad = batch(&[("A", "5")]);
        bad.items.push(SubmittedItem::new("not*base64", "3"));
        let err = processor.process(&context(), 1, &bad).unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn custom_budget() {
        let store = MemoryVoteStore::new();
        let processor = SubmissionProcessor::new(&store);
        let ctx = SessionContext::new("pg1", NonZeroU32::new(100).unwrap(), false);

        processor
            .process(&ctx, 3, &batch(&[("A", "1"), ("B", "3")]))
            .unwrap();

        assert_eq!(store.current_vote(3, "pg1", "A").unwrap(), 25);
        assert_eq!(store.current_vote(3, "pg1", "B").unwrap(), 75);
    }
}
