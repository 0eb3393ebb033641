//! Per-request voting session state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::num::NonZeroU32;

/// Budget used when `numvotes` is absent or unusable.
pub const DEFAULT_BUDGET: NonZeroU32 = match NonZeroU32::new(10) {
    Some(budget) => budget,
    None => unreachable!(),
};

/// Attributes given to a directive by the page author.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectiveAttributes(BTreeMap<String, String>);

impl DirectiveAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.0.insert(name.to_string(), value.to_string());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for DirectiveAttributes {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// State shared by every directive of one page render.
///
/// Built once by the session-start directive and passed explicitly to the
/// submission processor and admin aggregator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionContext {
    session_key: String,
    budget: NonZeroU32,
    locked: bool,
}

impl SessionContext {
    pub fn new(session_key: impl Into<String>, budget: NonZeroU32, locked: bool) -> Self {
        Self {
            session_key: session_key.into(),
            budget,
            locked,
        }
    }

    /// Build the context from session-start attributes.
    ///
    /// `locked` is only set by the literal `"true"`. `numvotes` falls back to
    /// [`DEFAULT_BUDGET`] when missing, non-numeric, zero or negative.
    pub fn from_attributes(session_key: impl Into<String>, attrs: &DirectiveAttributes) -> Self {
        let locked = attrs.get("locked") == Some("true");
        let budget = attrs
            .get("numvotes")
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .and_then(|n| u32::try_from(n).ok())
            .and_then(NonZeroU32::new)
            .unwrap_or(DEFAULT_BUDGET);

        Self::new(session_key, budget, locked)
    }

    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    pub fn budget(&self) -> NonZeroU32 {
        self.budget
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }
}
