//! Interactive MFA challenges
//!
//! Resolution code never talks to a UI directly. It calls an injected
//! [`InteractiveChallengeHandler`] on a blocking thread and waits for the
//! answer, so the handler is free to marshal the question to whichever
//! thread owns user interaction.

use crate::error::{ToolkitError, ToolkitResult};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// What the user is being asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeContext {
    /// Profile being resolved
    pub profile: String,
    /// MFA device serial number or ARN
    pub device: String,
}

impl ChallengeContext {
    pub fn new(profile: impl Into<String>, device: impl Into<String>) -> Self {
        Self {
            profile: profile.into(),
            device: device.into(),
        }
    }

    /// Prompt text suitable for a dialog or terminal
    pub fn prompt_text(&self) -> String {
        format!("Enter MFA code for {} (profile '{}')", self.device, self.profile)
    }
}

/// Answer to a challenge
#[derive(Clone, PartialEq, Eq)]
pub enum ChallengeResponse {
    /// One-time code entered by the user
    Code(String),
    /// The user dismissed the prompt
    Cancelled,
}

impl fmt::Debug for ChallengeResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(_) => f.write_str("Code([REDACTED])"),
            Self::Cancelled => f.write_str("Cancelled"),
        }
    }
}

/// Capability for asking a human for an MFA code
///
/// `challenge` blocks until the user answers. It is always called from a
/// blocking worker thread, never from an async task, and may be called from
/// any thread.
pub trait InteractiveChallengeHandler: Send + Sync {
    fn challenge(&self, context: &ChallengeContext) -> ChallengeResponse;
}

impl<F> InteractiveChallengeHandler for F
where
    F: Fn(&ChallengeContext) -> ChallengeResponse + Send + Sync,
{
    fn challenge(&self, context: &ChallengeContext) -> ChallengeResponse {
        self(context)
    }
}

/// Shared handle to a challenge handler
pub type SharedChallengeHandler = Arc<dyn InteractiveChallengeHandler>;

/// Run a challenge to completion from async code
///
/// The handler runs on the blocking pool; the caller awaits the hand-off.
/// Cancellation, empty answers and a failed prompt all map to
/// `ChallengeCancelled`.
pub async fn run_challenge(
    handler: SharedChallengeHandler,
    context: ChallengeContext,
) -> ToolkitResult<String> {
    let profile = context.profile.clone();
    debug!(profile = %profile, device = %context.device, "Requesting MFA code");

    // A handler that panics has not answered, which counts as a cancel
    let response = match tokio::task::spawn_blocking(move || handler.challenge(&context)).await {
        Ok(response) => response,
        Err(e) => {
            warn!(profile = %profile, error = %e, "MFA prompt failed");
            ChallengeResponse::Cancelled
        }
    };

    match response {
        ChallengeResponse::Code(code) if !code.trim().is_empty() => Ok(code.trim().to_string()),
        _ => {
            debug!(profile = %profile, "MFA challenge cancelled");
            Err(ToolkitError::challenge_cancelled(profile))
        }
    }
}

/// Handler that always gives the same answer
///
/// Useful for headless runs and tests; counts how often it was asked.
#[derive(Debug)]
pub struct StaticChallengeHandler {
    response: ChallengeResponse,
    calls: AtomicUsize,
}

impl StaticChallengeHandler {
    /// Answer every challenge with `code`
    pub fn with_code(code: impl Into<String>) -> Self {
        Self {
            response: ChallengeResponse::Code(code.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Decline every challenge
    pub fn cancelled() -> Self {
        Self {
            response: ChallengeResponse::Cancelled,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of times the handler was invoked
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl InteractiveChallengeHandler for StaticChallengeHandler {
    fn challenge(&self, _context: &ChallengeContext) -> ChallengeResponse {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response.clone()
    }
}

/// A pending question delivered to the interaction owner
#[derive(Debug)]
pub struct ChallengeRequest {
    context: ChallengeContext,
    reply: oneshot::Sender<ChallengeResponse>,
}

impl ChallengeRequest {
    pub fn context(&self) -> &ChallengeContext {
        &self.context
    }

    /// Send the answer back to the waiting resolver
    pub fn respond(self, response: ChallengeResponse) {
        // The resolver may have given up already; nothing to do then.
        let _ = self.reply.send(response);
    }
}

/// Handler that forwards challenges to another thread or task
///
/// The receiving side (typically the UI thread) pulls [`ChallengeRequest`]s
/// from the channel and answers them. Dropping a request without answering
/// counts as cancellation, as does a closed channel.
#[derive(Debug, Clone)]
pub struct ChannelChallengeHandler {
    sender: mpsc::Sender<ChallengeRequest>,
}

/// Create a channel-backed handler and the receiver the UI side drains
pub fn challenge_channel(capacity: usize) -> (ChannelChallengeHandler, mpsc::Receiver<ChallengeRequest>) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (ChannelChallengeHandler { sender }, receiver)
}

impl InteractiveChallengeHandler for ChannelChallengeHandler {
    fn challenge(&self, context: &ChallengeContext) -> ChallengeResponse {
        let (reply, answer) = oneshot::channel();
        let request = ChallengeRequest {
            context: context.clone(),
            reply,
        };
        if self.sender.blocking_send(request).is_err() {
            return ChallengeResponse::Cancelled;
        }
        answer.blocking_recv().unwrap_or(ChallengeResponse::Cancelled)
    }
}
