//! Scripted content collaborators for tests and the simulator

use crate::api::{CollaboratorError, ContentSynthesizer, DraftGenerator};
use async_trait::async_trait;
use dischargeflow_records::Patient;
use parking_lot::Mutex;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

type Reply = Result<String, CollaboratorError>;

/// Reply source shared by both collaborators
struct Script {
    queue: Mutex<VecDeque<Reply>>,
    flaky: Option<(Mutex<StdRng>, f64)>,
    fail_all: Option<String>,
    delay: Duration,
    calls: AtomicUsize,
}

impl Script {
    fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            flaky: None,
            fail_all: None,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    async fn next(&self, fail: fn(String) -> CollaboratorError, fallback: impl FnOnce(usize) -> String) -> Reply {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if let Some(message) = &self.fail_all {
            return Err(fail(message.clone()));
        }
        if let Some(reply) = self.queue.lock().pop_front() {
            return reply;
        }
        if let Some((rng, rate)) = &self.flaky {
            let mut rng = rng.lock();
            if rng.gen_bool(*rate) {
                // Blank output is a failure too, mix it in.
                return if rng.gen_bool(0.25) {
                    Ok(String::new())
                } else {
                    Err(fail(format!("simulated outage on call {call}")))
                };
            }
        }
        Ok(fallback(call))
    }
}

/// `ContentSynthesizer` that replays queued replies, then answers with
/// generated notes
pub struct ScriptedSynthesizer {
    script: Script,
}

impl ScriptedSynthesizer {
    /// Synthesizer answering with canned notes
    pub fn new() -> Self {
        Self { script: Script::new() }
    }

    /// Queue replies returned in order before falling back to the default
    #[must_use]
    pub fn with_replies(self, replies: impl IntoIterator<Item = Reply>) -> Self {
        self.script.queue.lock().extend(replies);
        self
    }

    /// Fail every call with `message`
    pub fn failing(message: &str) -> Self {
        let mut synthesizer = Self::new();
        synthesizer.script.fail_all = Some(message.to_string());
        synthesizer
    }

    /// Fail a seeded share of calls once the queue is drained
    #[must_use]
    pub fn with_failure_rate(mut self, seed: u64, rate: f64) -> Self {
        self.script.flaky = Some((Mutex::new(StdRng::seed_from_u64(seed)), rate.clamp(0.0, 1.0)));
        self
    }

    /// Sleep before every reply
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.script.delay = delay;
        self
    }

    /// Queue a reply
    pub fn push(&self, reply: Reply) {
        self.script.queue.lock().push_back(reply);
    }

    /// Calls received so far
    pub fn calls(&self) -> usize {
        self.script.calls.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentSynthesizer for ScriptedSynthesizer {
    async fn synthesize(&self, patient: &Patient) -> Result<String, CollaboratorError> {
        let name = patient.display_name().to_string();
        self.script
            .next(CollaboratorError::Synthesis, |call| {
                format!("Clinical notes for {name} (synthesis {call})")
            })
            .await
    }
}

/// `DraftGenerator` that replays queued replies and records every edit
/// request it receives
pub struct ScriptedDrafter {
    script: Script,
    edit_requests: Mutex<Vec<String>>,
}

impl ScriptedDrafter {
    /// Drafter answering with canned drafts
    pub fn new() -> Self {
        Self {
            script: Script::new(),
            edit_requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue these replies ahead of the default
    #[must_use]
    pub fn with_replies(self, replies: impl IntoIterator<Item = Reply>) -> Self {
        self.script.queue.lock().extend(replies);
        self
    }

    /// Succeed with each draft text in order
    pub fn with_drafts<I, S>(drafts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new().with_replies(drafts.into_iter().map(|d| Ok(d.into())))
    }

    /// Fail every call with this message
    pub fn failing(message: &str) -> Self {
        let mut drafter = Self::new();
        drafter.script.fail_all = Some(message.to_string());
        drafter
    }

    /// Fail or go blank at `rate`, seeded
    #[must_use]
    pub fn with_failure_rate(mut self, seed: u64, rate: f64) -> Self {
        self.script.flaky = Some((Mutex::new(StdRng::seed_from_u64(seed)), rate.clamp(0.0, 1.0)));
        self
    }

    /// Sleep before every reply
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.script.delay = delay;
        self
    }

    /// Queue a reply
    pub fn push(&self, reply: Reply) {
        self.script.queue.lock().push_back(reply);
    }

    /// Calls made so far
    pub fn calls(&self) -> usize {
        self.script.calls.load(Ordering::SeqCst)
    }

    /// Edit request passed to each call, empty for first drafts
    pub fn edit_requests(&self) -> Vec<String> {
        self.edit_requests.lock().clone()
    }
}

impl Default for ScriptedDrafter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DraftGenerator for ScriptedDrafter {
    async fn draft(&self, _notes: &str, patient: &Patient, edit_request: &str) -> Result<String, CollaboratorError> {
        self.edit_requests.lock().push(edit_request.to_string());
        let name = patient.display_name().to_string();
        self.script
            .next(CollaboratorError::Draft, |call| {
                format!("Discharge summary for {name}, revision {call}")
            })
            .await
    }
}
