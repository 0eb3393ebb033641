//! Directive entry points used by the page host.
//!
//! A page that hosts a vote uses five directives, in order:
//!
//! - `vote_start` opens the session and handles any posted form
//! - `vote` shows one item's input (any number of times)
//! - `vote_number` shows the budget
//! - `vote_admin_summary` shows totals to admins
//! - `vote_end` closes the form with a submit control
//!
//! Each render owns one [`PageVoting`], which carries the session context
//! from `vote_start` to the directives that follow. Directives return typed
//! fragments; turning them into markup is up to the host.

use crate::admin::AdminAggregator;
use crate::error::{Error, Result};
use crate::form::{delete_field_name, item_field_name, FormAction};
use crate::models::{Allocation, DirectiveAttributes, SessionContext, Viewer};
use crate::processor::{SubmissionOutcome, SubmissionProcessor};
use crate::store::VoteStore;
use serde::Serialize;

/// Label of the submit control when the page author gives none.
pub const DEFAULT_BUTTON_LABEL: &str = "Submit Votes";

/// Output of `vote_start`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StartFragment {
    pub session_key: String,
    pub budget: u32,
    pub locked: bool,

    /// Message to show the voter when their submission was refused
    pub notice: Option<String>,

    /// Votes stored by this request's submission
    pub applied: Option<Allocation>,

    /// True when this request withdrew the viewer's votes
    pub withdrawn: bool,

    /// Records removed by this request's admin deletion
    pub deleted: Option<usize>,
}

/// Output of `vote_end` for an open session.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SubmitControl {
    pub action: &'static str,
    pub session_key: String,
    pub label: String,
}

/// Output of `vote`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct VoteField {
    pub item_key: String,
    pub field_name: String,
    pub current: u64,
    pub locked: bool,
}

/// One row of the admin summary.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SummaryRow {
    pub item_key: String,
    pub total: u64,
    pub delete_field: String,
}

/// Output of `vote_admin_summary` for admins.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AdminSummary {
    pub session_key: String,
    pub rows: Vec<SummaryRow>,
}

/// One method per directive a page can use.
pub trait VoteDirectives {
    /// Open the voting session and handle a posted form, if any.
    fn vote_start(&mut self, attrs: &DirectiveAttributes) -> Result<StartFragment>;

    /// Close the form. `None` when the session is locked.
    fn vote_end(&self, attrs: &DirectiveAttributes, body: &str) -> Result<Option<SubmitControl>>;

    /// The number of votes each user distributes.
    fn vote_number(&self) -> Result<u32>;

    /// The viewer's current vote for the item named by the `key` attribute.
    fn vote(&self, attrs: &DirectiveAttributes) -> Result<VoteField>;

    /// Totals for admins, `None` for everyone else.
    fn vote_admin_summary(&self) -> Result<Option<AdminSummary>>;
}

/// Directive state for a single page render.
pub struct PageVoting<'a, S: VoteStore + ?Sized> {
    store: &'a S,
    admin_group: &'a str,
    session_key: String,
    viewer: Viewer,
    form: Option<FormAction>,
    context: Option<SessionContext>,
}

impl<'a, S: VoteStore + ?Sized> PageVoting<'a, S> {
    /// Prepare a render of the page identified by `session_key`.
    pub fn new(store: &'a S, admin_group: &'a str, session_key: impl Into<String>, viewer: Viewer) -> Self {
        Self {
            store,
            admin_group,
            session_key: session_key.into(),
            viewer,
            form: None,
            context: None,
        }
    }

    /// Attach the form posted with this request.
    pub fn with_form(mut self, form: Option<FormAction>) -> Self {
        self.form = form;
        self
    }

    /// The active session, if `vote_start` has run.
    pub fn context(&self) -> Option<&SessionContext> {
        self.context.as_ref()
    }

    fn require_context(&self, directive: &str) -> Result<&SessionContext> {
        self.context.as_ref().ok_or_else(|| {
            Error::Usage(format!(
                "Calling {directive} without a previous vote-start is not allowed"
            ))
        })
    }

    fn admin(&self) -> AdminAggregator<'a, S> {
        AdminAggregator::new(self.store, self.admin_group)
    }
}

impl<S: VoteStore + ?Sized> VoteDirectives for PageVoting<'_, S> {
    fn vote_start(&mut self, attrs: &DirectiveAttributes) -> Result<StartFragment> {
        let context = SessionContext::from_attributes(self.session_key.clone(), attrs);

        let mut fragment = StartFragment {
            session_key: context.session_key().to_string(),
            budget: context.budget().get(),
            locked: context.is_locked(),
            notice: None,
            applied: None,
            withdrawn: false,
            deleted: None,
        };

        // A posted form is handled by the first vote-start only
        let result = match self.form.take() {
            Some(FormAction::Vote(batch)) => SubmissionProcessor::new(self.store)
                .process(&context, self.viewer.user_id, &batch)
                .map(|outcome| match outcome {
                    SubmissionOutcome::Applied(allocation) => fragment.applied = Some(allocation),
                    SubmissionOutcome::Withdrawn => fragment.withdrawn = true,
                    SubmissionOutcome::Locked => {}
                }),
            Some(FormAction::Admin(request)) => self
                .admin()
                .handle_deletion(&request, context.session_key(), &self.viewer)
                .map(|removed| fragment.deleted = Some(removed)),
            None => Ok(()),
        };

        match result {
            Ok(()) => {}
            Err(e) if e.is_user_visible() => fragment.notice = Some(e.to_string()),
            Err(e) => return Err(e),
        }

        self.context = Some(context);
        Ok(fragment)
    }

    fn vote_end(&self, attrs: &DirectiveAttributes, body: &str) -> Result<Option<SubmitControl>> {
        let context = self.require_context("vote-end")?;
        if context.is_locked() {
            return Ok(None);
        }

        let label = match attrs.get("text") {
            Some(text) => text.to_string(),
            None if !body.is_empty() => body.to_string(),
            None => DEFAULT_BUTTON_LABEL.to_string(),
        };

        Ok(Some(SubmitControl {
            action: "vote",
            session_key: context.session_key().to_string(),
            label,
        }))
    }

    fn vote_number(&self) -> Result<u32> {
        Ok(self.require_context("vote-number")?.budget().get())
    }

    fn vote(&self, attrs: &DirectiveAttributes) -> Result<VoteField> {
        let context = self.require_context("vote")?;
        let item_key = match attrs.get("key") {
            Some(key) if !key.is_empty() => key,
            _ => {
                return Err(Error::Usage(
                    "A vote directive must have a key attribute that uniquely describes it, e.g. key=\"enh1234\""
                        .to_string(),
                ))
            }
        };

        let current = self
            .store
            .current_vote(self.viewer.user_id, context.session_key(), item_key)?;

        Ok(VoteField {
            item_key: item_key.to_string(),
            field_name: item_field_name(item_key),
            current,
            locked: context.is_locked(),
        })
    }

    fn vote_admin_summary(&self) -> Result<Option<AdminSummary>> {
        let context = self.require_context("vote-admin-summary")?;
        let admin = self.admin();
        if !admin.is_authorized(&self.viewer) {
            return Ok(None);
        }

        let rows = admin
            .summary(context.session_key())?
            .into_iter()
            .map(|total| SummaryRow {
                delete_field: delete_field_name(&total.item_key),
                item_key: total.item_key,
                total: total.total,
            })
            .collect();

        Ok(Some(AdminSummary {
            session_key: context.session_key().to_string(),
            rows,
        }))
    }
}
