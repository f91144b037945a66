//! Ask flow: one user question through the API into exactly one terminal state.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{AskRequest, SphereApi};

/// Ephemeral page state owned by the controller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub draft_message: String,
    pub pending_request: bool,
    pub last_answer: Option<String>,
    pub last_error: Option<String>,
}

/// What the response panel should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presentation {
    Idle,
    Pending,
    Resolved(String),
    Rejected(String),
}

impl SessionState {
    pub fn presentation(&self) -> Presentation {
        if self.pending_request {
            return Presentation::Pending;
        }
        match (&self.last_error, &self.last_answer) {
            (Some(err), _) => Presentation::Rejected(err.clone()),
            (None, Some(answer)) => Presentation::Resolved(answer.clone()),
            (None, None) => Presentation::Idle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Empty input or a request already in flight; nothing was sent.
    Skipped,
    Resolved,
    Rejected,
}

pub struct AskController<A> {
    api: Arc<A>,
    state: watch::Sender<SessionState>,
    fallback_error: String,
}

impl<A: SphereApi> AskController<A> {
    pub fn new(api: Arc<A>, fallback_error: impl Into<String>) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        AskController {
            api,
            state,
            fallback_error: fallback_error.into(),
        }
    }

    /// Every state change is published here for the rendering layer.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn presentation(&self) -> Presentation {
        self.state.borrow().presentation()
    }

    /// User edited the input. A visible error goes away; pending is left alone.
    pub fn set_draft(&self, text: impl Into<String>) {
        let text = text.into();
        self.state.send_modify(|s| {
            s.draft_message = text;
            s.last_error = None;
        });
    }

    /// User dismissed the answer. Purely local.
    pub fn clear_response(&self) {
        self.state.send_if_modified(|s| s.last_answer.take().is_some());
    }

    pub async fn submit_draft(&self) -> SubmitOutcome {
        let draft = self.state.borrow().draft_message.clone();
        self.submit(&draft).await
    }

    pub async fn submit(&self, text: &str) -> SubmitOutcome {
        if text.trim().is_empty() {
            return SubmitOutcome::Skipped;
        }

        // Guard and transition happen under the same lock
        let started = self.state.send_if_modified(|s| {
            if s.pending_request {
                return false;
            }
            s.pending_request = true;
            s.last_answer = None;
            s.last_error = None;
            true
        });
        if !started {
            debug!("ask already pending, ignoring submit");
            return SubmitOutcome::Skipped;
        }

        let guard = PendingGuard::new(&self.state);
        info!(chars = text.chars().count(), "submitting question");
        let reply = self.api.ask(&AskRequest::new(text)).await;
        guard.settle();

        match reply {
            Ok(envelope) if envelope.is_success => match envelope.result {
                Some(result) => {
                    info!(keywords = ?result.keyword, "answer received");
                    self.state.send_modify(|s| {
                        s.last_answer = Some(result.answer);
                        s.draft_message.clear();
                        s.pending_request = false;
                    });
                    SubmitOutcome::Resolved
                }
                None => {
                    warn!(code = %envelope.code, "success envelope without result");
                    self.reject(self.fallback_error.clone())
                }
            },
            Ok(envelope) => {
                info!(code = %envelope.code, message = %envelope.message, "question rejected");
                let message = if envelope.message.trim().is_empty() {
                    self.fallback_error.clone()
                } else {
                    envelope.message
                };
                self.reject(message)
            }
            Err(err) => {
                warn!(error = %err, "ask request failed");
                let message = err
                    .user_message()
                    .map(str::to_string)
                    .unwrap_or_else(|| self.fallback_error.clone());
                self.reject(message)
            }
        }
    }

    fn reject(&self, message: String) -> SubmitOutcome {
        self.state.send_modify(|s| {
            s.last_error = Some(message);
            s.pending_request = false;
        });
        SubmitOutcome::Rejected
    }
}

/// Clears `pending_request` if a submit is dropped before its reply arrives.
struct PendingGuard<'a> {
    state: &'a watch::Sender<SessionState>,
    armed: bool,
}

impl<'a> PendingGuard<'a> {
    fn new(state: &'a watch::Sender<SessionState>) -> Self {
        PendingGuard { state, armed: true }
    }

    fn settle(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            debug!("ask dropped before reply, clearing pending");
            self.state.send_modify(|s| s.pending_request = false);
        }
    }
}
