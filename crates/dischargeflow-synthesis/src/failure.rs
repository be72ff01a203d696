//! Injected failures for demos and tests

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};

/// When a template collaborator should fail instead of answering
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FailureMode {
    /// Every call succeeds
    #[default]
    Never,
    /// Every call fails with this message
    Always(String),
    /// Calls with these 1-based numbers fail
    OnCalls(BTreeSet<usize>),
}

impl FailureMode {
    /// Fail on the listed 1-based call numbers
    pub fn on_calls(calls: impl IntoIterator<Item = usize>) -> Self {
        Self::OnCalls(calls.into_iter().collect())
    }

    /// Failure message for call number `call`, if it should fail
    pub fn check(&self, call: usize) -> Option<String> {
        match self {
            Self::Never => None,
            Self::Always(message) => Some(message.clone()),
            Self::OnCalls(calls) if calls.contains(&call) => Some(format!("injected failure on call {call}")),
            Self::OnCalls(_) => None,
        }
    }
}

/// 1-based call numbering shared by both collaborators
#[derive(Debug, Default)]
pub(crate) struct CallCounter(AtomicUsize);

impl CallCounter {
    pub(crate) fn next(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}
