//! Waiter - Block until an asynchronous remote operation settles
//!
//! Control-plane calls such as "deploy this certificate" return before the
//! work is done. A [`WaitSpec`] declares which remote state labels mean
//! "still working", which mean "done", and which mean "failed"; the waiter
//! then polls a caller-supplied function at a fixed cadence until one of
//! those outcomes is reached or the deadline passes.
//!
//! ```text
//! Pending --(label in pending_states)--> Pending
//! Pending --(label in target_states)---> Done
//! Pending --(failure / error / timeout)-> Failed
//! ```

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::time::Duration;

use log::debug;
use tokio::time::{Instant, sleep, timeout_at};

use crate::provider::{ErrorKind, ProviderError, ProviderResult};

/// State label reported by [`wait_for_absence`] once the resource is gone
pub const ABSENT_STATE: &str = "absent";

/// Decides whether a remote state label means the operation failed
pub type FailurePredicate = fn(&str) -> bool;

/// Default failure predicate: the label mentions "failed"
pub fn contains_failed(state: &str) -> bool {
    state.contains("failed")
}

/// What to do with a label that is neither pending, target nor failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownStatePolicy {
    /// Treat the label as forward progress and keep polling until the deadline
    #[default]
    KeepPolling,
    /// Stop with [`WaitError::UnexpectedState`]
    Fail,
}

/// Classification of a single state label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateClass {
    Target,
    Failure,
    Pending,
    Unknown,
}

/// Configuration for one wait; built per operation and dropped afterwards
#[derive(Debug, Clone)]
pub struct WaitSpec {
    pub pending_states: HashSet<String>,
    pub target_states: HashSet<String>,
    pub timeout: Duration,
    /// Delay between consecutive polls
    pub delay: Duration,
    /// Lower bound on the delay between consecutive polls
    pub min_poll_interval: Duration,
    pub is_failure: FailurePredicate,
    pub unknown_states: UnknownStatePolicy,
}

impl WaitSpec {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);
    pub const DEFAULT_DELAY: Duration = Duration::from_secs(10);

    pub fn new<P, T>(pending: P, target: T) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        Self {
            pending_states: pending.into_iter().map(Into::into).collect(),
            target_states: target.into_iter().map(Into::into).collect(),
            timeout: Self::DEFAULT_TIMEOUT,
            delay: Self::DEFAULT_DELAY,
            min_poll_interval: Self::DEFAULT_DELAY,
            is_failure: contains_failed,
            unknown_states: UnknownStatePolicy::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_min_poll_interval(mut self, interval: Duration) -> Self {
        self.min_poll_interval = interval;
        self
    }

    pub fn with_failure_predicate(mut self, is_failure: FailurePredicate) -> Self {
        self.is_failure = is_failure;
        self
    }

    pub fn with_unknown_states(mut self, policy: UnknownStatePolicy) -> Self {
        self.unknown_states = policy;
        self
    }

    /// Time between two polls
    pub fn poll_interval(&self) -> Duration {
        self.delay.max(self.min_poll_interval)
    }

    /// Target labels in a stable order, for messages
    pub fn sorted_targets(&self) -> Vec<String> {
        let mut targets: Vec<String> = self.target_states.iter().cloned().collect();
        targets.sort();
        targets
    }

    /// Classify a state label. Target wins over failure, failure over pending.
    pub fn classify_state(&self, state: &str) -> StateClass {
        if self.target_states.contains(state) {
            StateClass::Target
        } else if (self.is_failure)(state) {
            StateClass::Failure
        } else if self.pending_states.contains(state) {
            StateClass::Pending
        } else {
            StateClass::Unknown
        }
    }

    /// Turn the outcome of one poll into a [`PollResult`]
    pub fn evaluate<T>(&self, outcome: ProviderResult<(T, String)>) -> PollResult<T> {
        let (value, state) = match outcome {
            Ok(observed) => observed,
            Err(e) => {
                return match e.kind {
                    ErrorKind::NotReady => PollResult::Pending {
                        reason: e.message,
                        value: None,
                    },
                    ErrorKind::NotFound => PollResult::Failed(WaitError::Disappeared(e)),
                    _ => PollResult::Failed(WaitError::Poll(e)),
                };
            }
        };

        match self.classify_state(&state) {
            StateClass::Target => PollResult::Done(value),
            StateClass::Failure => PollResult::Failed(WaitError::RemoteFailure { state, value }),
            StateClass::Pending => PollResult::Pending {
                reason: state,
                value: Some(value),
            },
            StateClass::Unknown => match self.unknown_states {
                UnknownStatePolicy::KeepPolling => PollResult::Pending {
                    reason: state,
                    value: Some(value),
                },
                UnknownStatePolicy::Fail => PollResult::Failed(WaitError::UnexpectedState {
                    state,
                    expected: self.sorted_targets(),
                    value,
                }),
            },
        }
    }
}

/// Outcome of a single poll
#[derive(Debug)]
pub enum PollResult<T> {
    /// Keep polling. `value` is the last observed record, if the poll produced one.
    Pending { reason: String, value: Option<T> },
    Done(T),
    Failed(WaitError<T>),
}

/// Why a wait stopped without reaching a target state
#[derive(Debug)]
pub enum WaitError<T> {
    /// Deadline passed while the resource was still pending
    Timeout {
        timeout: Duration,
        target: Vec<String>,
        last_state: Option<String>,
        last_value: Option<T>,
    },
    /// The remote side reports that the operation failed
    RemoteFailure { state: String, value: T },
    /// Label outside every declared set under [`UnknownStatePolicy::Fail`]
    UnexpectedState {
        state: String,
        expected: Vec<String>,
        value: T,
    },
    /// The resource vanished while waiting for it to settle
    Disappeared(ProviderError),
    /// The poll function itself failed
    Poll(ProviderError),
}

impl<T> fmt::Display for WaitError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitError::Timeout {
                timeout,
                target,
                last_state,
                ..
            } => write!(
                f,
                "timeout while waiting for state to become '{}' (last state: '{}', timeout: {:?})",
                target.join(", "),
                last_state.as_deref().unwrap_or(""),
                timeout
            ),
            WaitError::RemoteFailure { state, .. } => {
                write!(f, "remote operation failed with state '{}'", state)
            }
            WaitError::UnexpectedState {
                state, expected, ..
            } => write!(
                f,
                "unexpected state '{}', wanted target '{}'",
                state,
                expected.join(", ")
            ),
            WaitError::Disappeared(e) => write!(f, "resource does not exist anymore: {}", e),
            WaitError::Poll(e) => write!(f, "{}", e),
        }
    }
}

impl<T: fmt::Debug> std::error::Error for WaitError<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WaitError::Disappeared(e) | WaitError::Poll(e) => Some(e),
            _ => None,
        }
    }
}

impl<T: fmt::Debug> From<WaitError<T>> for ProviderError {
    fn from(e: WaitError<T>) -> Self {
        let message = e.to_string();
        match e {
            WaitError::Timeout { last_value, .. } => match last_value {
                Some(v) => ProviderError::new(
                    ErrorKind::Timeout,
                    format!("{} (last observed: {:?})", message, v),
                ),
                None => ProviderError::new(ErrorKind::Timeout, message),
            },
            WaitError::RemoteFailure { value, .. } => ProviderError::new(
                ErrorKind::RemoteFailure,
                format!("{} ({:?})", message, value),
            ),
            WaitError::UnexpectedState { .. } => {
                ProviderError::new(ErrorKind::RemoteFailure, message)
            }
            WaitError::Disappeared(cause) => {
                ProviderError::new(ErrorKind::NotFound, message).with_cause(cause)
            }
            WaitError::Poll(cause) => cause,
        }
    }
}

/// Poll until the resource reaches a target state.
///
/// The first poll runs immediately, later ones every [`WaitSpec::poll_interval`].
/// A poll still running at the deadline is dropped and the wait times out.
/// A NotFound poll error means the resource disappeared and is fatal.
pub async fn wait_for_state<T, F, Fut>(spec: &WaitSpec, mut poll: F) -> Result<T, WaitError<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProviderResult<(T, String)>>,
{
    let deadline = Instant::now() + spec.timeout;
    let interval = spec.poll_interval();
    let mut last_state = None;
    let mut last_value = None;
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        let Ok(outcome) = timeout_at(deadline, poll()).await else {
            debug!("Poll {} still running at the deadline", attempt);
            break;
        };

        match spec.evaluate(outcome) {
            PollResult::Done(value) => {
                debug!("Reached target state after {} poll(s)", attempt);
                return Ok(value);
            }
            PollResult::Failed(e) => return Err(e),
            PollResult::Pending { reason, value } => {
                debug!(
                    "Waiting for state to become {:?}, currently '{}' (poll {})",
                    spec.sorted_targets(),
                    reason,
                    attempt
                );
                last_state = Some(reason);
                if value.is_some() {
                    last_value = value;
                }
            }
        }

        let now = Instant::now();
        if now >= deadline {
            break;
        }
        sleep(interval.min(deadline - now)).await;
    }

    Err(WaitError::Timeout {
        timeout: spec.timeout,
        target: spec.sorted_targets(),
        last_state,
        last_value,
    })
}

/// Poll until the resource is gone.
///
/// A NotFound poll error, or a label in the target set, completes the wait.
/// Returns the last observed record when completion came from a label.
pub async fn wait_for_absence<T, F, Fut>(
    spec: &WaitSpec,
    mut poll: F,
) -> Result<Option<T>, WaitError<Option<T>>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProviderResult<(T, String)>>,
{
    let mut spec = spec.clone();
    spec.target_states.insert(ABSENT_STATE.to_string());

    wait_for_state(&spec, || {
        let observed = poll();
        async move {
            match observed.await {
                Ok((value, state)) => Ok((Some(value), state)),
                Err(e) if e.is_not_found() => {
                    debug!("Resource no longer found: {}", e);
                    Ok((None, ABSENT_STATE.to_string()))
                }
                Err(e) => Err(e),
            }
        }
    })
    .await
}
