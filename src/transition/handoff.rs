//! Launching the next scene once the transition is nearly done.
//!
//! The launch runs on a background thread so the frame loop never blocks.
//! A [`HandoffTask`] retries a bounded number of times, reports its
//! outcome over a channel, and can be cancelled while it is backing off.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, bounded};
use tracing::{debug, info, warn};

use crate::error::HandoffError;

/// One attempt at starting the next scene.
pub trait Launcher: Send + Sync {
    /// Start the scene without waiting for it. Returns a short description
    /// of what was started.
    fn launch(&self) -> Result<String, HandoffError>;
}

impl<F> Launcher for F
where
    F: Fn() -> Result<String, HandoffError> + Send + Sync,
{
    fn launch(&self) -> Result<String, HandoffError> {
        self()
    }
}

/// Starts the first existing executable from a candidate list.
#[derive(Clone, Debug)]
pub struct CommandLauncher {
    candidates: Vec<PathBuf>,
    args: Vec<String>,
}

impl CommandLauncher {
    pub fn new(candidates: Vec<PathBuf>, args: Vec<String>) -> Self {
        Self { candidates, args }
    }

    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }

    fn find(&self) -> Option<&Path> {
        self.candidates
            .iter()
            .map(PathBuf::as_path)
            .find(|path| path.is_file())
    }
}

impl Launcher for CommandLauncher {
    fn launch(&self) -> Result<String, HandoffError> {
        let path = self.find().ok_or(HandoffError::NotFound {
            searched: self.candidates.len(),
        })?;
        let child = Command::new(path)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| HandoffError::Spawn {
                path: path.to_path_buf(),
                source,
            })?;
        // Not waited on: the next scene outlives this process.
        Ok(format!("{} (pid {})", path.display(), child.id()))
    }
}

/// How many times to try, and how long to wait between tries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Longest the task can take if every attempt fails fast.
    pub fn worst_case(&self) -> Duration {
        self.backoff * self.attempts.saturating_sub(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

/// How a hand-off ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandoffOutcome {
    /// `attempt` is 1-based; `detail` comes from the launcher.
    Launched { attempt: u32, detail: String },
    /// Every attempt failed; `reason` is the last error.
    Failed { attempts: u32, reason: String },
    Cancelled,
}

/// A launch running on its own thread.
pub struct HandoffTask {
    outcome_rx: Receiver<HandoffOutcome>,
    cancel_tx: Sender<()>,
    worker: Option<JoinHandle<()>>,
    outcome: Option<HandoffOutcome>,
}

impl HandoffTask {
    pub fn spawn(launcher: Arc<dyn Launcher>, policy: RetryPolicy) -> Result<Self, HandoffError> {
        let (outcome_tx, outcome_rx) = bounded(1);
        let (cancel_tx, cancel_rx) = bounded(1);

        let worker = thread::Builder::new()
            .name("handoff".into())
            .spawn(move || {
                let outcome = run_attempts(launcher.as_ref(), policy, &cancel_rx);
                // The receiver may already be gone if the task was dropped.
                let _ = outcome_tx.send(outcome);
            })
            .map_err(HandoffError::Worker)?;

        Ok(Self {
            outcome_rx,
            cancel_tx,
            worker: Some(worker),
            outcome: None,
        })
    }

    /// Non-blocking check for the outcome.
    pub fn poll(&mut self) -> Option<&HandoffOutcome> {
        if self.outcome.is_none() {
            match self.outcome_rx.try_recv() {
                Ok(outcome) => self.finish(outcome),
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => {
                    warn!("hand-off worker exited without reporting");
                    self.finish(HandoffOutcome::Failed {
                        attempts: 0,
                        reason: "worker exited".into(),
                    });
                }
            }
        }
        self.outcome.as_ref()
    }

    /// Block up to `timeout` for the outcome.
    ///
    /// On timeout the remaining retries are cancelled; an attempt already in
    /// progress still runs to completion on the detached worker.
    pub fn wait(mut self, timeout: Duration) -> Option<HandoffOutcome> {
        if self.outcome.is_none() {
            match self.outcome_rx.recv_timeout(timeout) {
                Ok(outcome) => self.finish(outcome),
                Err(RecvTimeoutError::Timeout) => {
                    warn!(?timeout, "hand-off still running, cancelling remaining retries");
                    self.cancel();
                    return None;
                }
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
        self.outcome.take()
    }

    /// Ask the worker to stop at its next backoff. An attempt already in
    /// progress still completes.
    pub fn cancel(&self) {
        let _ = self.cancel_tx.try_send(());
    }

    fn finish(&mut self, outcome: HandoffOutcome) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        self.outcome = Some(outcome);
    }
}

fn run_attempts(
    launcher: &dyn Launcher,
    policy: RetryPolicy,
    cancel: &Receiver<()>,
) -> HandoffOutcome {
    let attempts = policy.attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        if cancel.try_recv().is_ok() {
            return HandoffOutcome::Cancelled;
        }
        match launcher.launch() {
            Ok(detail) => {
                info!(attempt, %detail, "next scene launched");
                return HandoffOutcome::Launched { attempt, detail };
            }
            Err(err) => {
                warn!(attempt, attempts, error = %err, "hand-off attempt failed");
                last_error = err.to_string();
            }
        }
        if attempt == attempts {
            break;
        }
        match cancel.recv_timeout(policy.backoff) {
            Ok(()) => return HandoffOutcome::Cancelled,
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                debug!("hand-off owner dropped, finishing retries");
                thread::sleep(policy.backoff);
            }
        }
    }

    warn!(attempts, reason = %last_error, "giving up on hand-off");
    HandoffOutcome::Failed {
        attempts,
        reason: last_error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            backoff: Duration::from_millis(5),
        }
    }

    struct FlakyLauncher {
        calls: AtomicU32,
        succeed_on: u32,
    }

    impl Launcher for FlakyLauncher {
        fn launch(&self) -> Result<String, HandoffError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call >= self.succeed_on {
                Ok(format!("call {call}"))
            } else {
                Err(HandoffError::NotFound { searched: 2 })
            }
        }
    }

    #[test]
    fn first_success_stops_retrying() {
        let launcher = Arc::new(FlakyLauncher {
            calls: AtomicU32::new(0),
            succeed_on: 2,
        });
        let task = HandoffTask::spawn(launcher.clone(), quick(3)).unwrap();
        let outcome = task.wait(Duration::from_secs(5)).unwrap();
        assert_eq!(
            outcome,
            HandoffOutcome::Launched {
                attempt: 2,
                detail: "call 2".into()
            }
        );
        assert_eq!(launcher.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn gives_up_after_attempt_budget() {
        let launcher = Arc::new(FlakyLauncher {
            calls: AtomicU32::new(0),
            succeed_on: u32::MAX,
        });
        let task = HandoffTask::spawn(launcher.clone(), quick(3)).unwrap();
        match task.wait(Duration::from_secs(5)) {
            Some(HandoffOutcome::Failed { attempts, reason }) => {
                assert_eq!(attempts, 3);
                assert!(reason.contains("not found"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(launcher.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn cancel_during_backoff() {
        let launcher = Arc::new(FlakyLauncher {
            calls: AtomicU32::new(0),
            succeed_on: u32::MAX,
        });
        let policy = RetryPolicy {
            attempts: 5,
            backoff: Duration::from_secs(10),
        };
        let task = HandoffTask::spawn(launcher.clone(), policy).unwrap();
        task.cancel();
        let outcome = task.wait(Duration::from_secs(5));
        assert_eq!(outcome, Some(HandoffOutcome::Cancelled));
        assert!(launcher.calls.load(Ordering::SeqCst) <= 1);
    }

    #[test]
    fn wait_timeout_cancels_remaining_retries() {
        let launcher = Arc::new(FlakyLauncher {
            calls: AtomicU32::new(0),
            succeed_on: u32::MAX,
        });
        let policy = RetryPolicy {
            attempts: 5,
            backoff: Duration::from_millis(200),
        };
        let task = HandoffTask::spawn(launcher.clone(), policy).unwrap();
        assert_eq!(task.wait(Duration::from_millis(20)), None);

        // Without the cancel the worker would be on its third attempt by now.
        thread::sleep(Duration::from_millis(600));
        assert!(launcher.calls.load(Ordering::SeqCst) <= 1);
    }

    #[test]
    fn closures_are_launchers() {
        let launcher: Arc<dyn Launcher> =
            Arc::new(|| Ok::<_, HandoffError>("closure".to_string()));
        let mut task = HandoffTask::spawn(launcher, quick(1)).unwrap();
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while task.poll().is_none() && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(matches!(
            task.poll(),
            Some(HandoffOutcome::Launched { attempt: 1, .. })
        ));
    }

    #[test]
    fn missing_command_is_not_found() {
        let launcher = CommandLauncher::new(
            vec![PathBuf::from("./definitely/not/here"), PathBuf::from("/nope")],
            Vec::new(),
        );
        assert!(matches!(
            launcher.launch(),
            Err(HandoffError::NotFound { searched: 2 })
        ));
    }

    #[test]
    fn worst_case_counts_backoffs_between_attempts() {
        assert_eq!(
            RetryPolicy::default().worst_case(),
            Duration::from_millis(1000)
        );
    }
}
