//! Per-agent script lifecycle.

use crate::engine::{ScriptEngine, ScriptOutcome};
use crate::host::{ScriptBindings, ScriptHost};
use crate::token::CancellationToken;
use log::{debug, info, warn};
use meadow_protocol::ScriptToRun;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Called on the worker thread when a script run finishes, with the script
/// id and its outcome.
pub type OutcomeCallback = Arc<dyn Fn(Uuid, &ScriptOutcome) + Send + Sync>;

struct RunningScript {
    script_id: Uuid,
    token: Arc<CancellationToken>,
    // None briefly between slot insertion and thread spawn.
    handle: Option<JoinHandle<()>>,
}

#[derive(Default)]
struct RunnerState {
    running: Option<RunningScript>,
    most_recent_completed_script_id: Option<Uuid>,
}

/// Manages at most one running script per agent.
///
/// `start_script` supersedes any in-flight script: it requests a cooperative
/// stop, waits up to the grace period for the worker to unwind, force-stops
/// if it has not, and then always starts the new script. The running slot is
/// written and cleared under one lock, and a finishing worker clears it only
/// if it still refers to that worker's script id.
pub struct ScriptRunner {
    engine: Arc<dyn ScriptEngine>,
    cancel_grace: Duration,
    cancel_poll: Duration,
    state: Arc<Mutex<RunnerState>>,
    on_outcome: Option<OutcomeCallback>,
}

impl ScriptRunner {
    pub fn new(engine: Arc<dyn ScriptEngine>, cancel_grace: Duration, cancel_poll: Duration) -> Self {
        Self {
            engine,
            cancel_grace,
            cancel_poll,
            state: Arc::new(Mutex::new(RunnerState::default())),
            on_outcome: None,
        }
    }

    /// Register a callback invoked on the worker thread after every run.
    pub fn with_on_outcome(mut self, on_outcome: OutcomeCallback) -> Self {
        self.on_outcome = Some(on_outcome);
        self
    }

    pub fn has_running_script(&self) -> bool {
        self.state.lock().running.is_some()
    }

    pub fn running_script_id(&self) -> Option<Uuid> {
        self.state.lock().running.as_ref().map(|r| r.script_id)
    }

    pub fn most_recent_completed_script_id(&self) -> Option<Uuid> {
        self.state.lock().most_recent_completed_script_id
    }

    /// Ask the current script, if any, to unwind cooperatively.
    pub fn request_stop_current(&self) {
        if let Some(running) = self.state.lock().running.as_ref() {
            running.token.request_stop();
        }
    }

    /// Supersede any running script and start a new one on a fresh worker
    /// thread.
    ///
    /// `token` must be the same token the host checks; it is fresh for this
    /// run and is never reused.
    pub async fn start_script(
        &self,
        script: ScriptToRun,
        bindings: ScriptBindings,
        host: Arc<dyn ScriptHost>,
        token: Arc<CancellationToken>,
    ) {
        self.stop_current_and_wait().await;

        let script_id = script.script_id;
        {
            self.state.lock().running = Some(RunningScript {
                script_id,
                token: token.clone(),
                handle: None,
            });
        }

        let engine = self.engine.clone();
        let state = self.state.clone();
        let on_outcome = self.on_outcome.clone();
        let worker_token = token.clone();
        debug!("script starting (script_id={script_id})");
        let handle = std::thread::spawn(move || {
            let outcome = engine.run(&script, &bindings, host, worker_token);
            match &outcome {
                ScriptOutcome::Completed => debug!("script completed (script_id={script_id})"),
                ScriptOutcome::Cancelled => debug!("script cancelled (script_id={script_id})"),
                ScriptOutcome::Failed(message) => warn!(
                    "script failed (script_id={script_id}): {message}\nsource:\n{}",
                    script.source
                ),
            }
            {
                let mut state = state.lock();
                state.most_recent_completed_script_id = Some(script_id);
                if state
                    .running
                    .as_ref()
                    .is_some_and(|running| running.script_id == script_id)
                {
                    state.running = None;
                }
            }
            if let Some(on_outcome) = on_outcome {
                on_outcome(script_id, &outcome);
            }
        });

        let mut state = self.state.lock();
        if let Some(running) = state.running.as_mut() {
            if running.script_id == script_id {
                running.handle = Some(handle);
            }
        }
    }

    /// Stop any running script and wait for it to unwind: request a
    /// cooperative stop, poll up to the grace period, then force-stop.
    /// On return the running slot is free.
    pub async fn stop_current_and_wait(&self) {
        let previous = {
            let state = self.state.lock();
            state
                .running
                .as_ref()
                .map(|running| (running.script_id, running.token.clone()))
        };
        let Some((previous_id, previous_token)) = previous else {
            return;
        };

        info!("superseding running script (script_id={previous_id})");
        previous_token.request_stop();
        let deadline = Instant::now() + self.cancel_grace;
        loop {
            let finished = {
                let state = self.state.lock();
                match state.running.as_ref() {
                    Some(running) if running.script_id == previous_id => running
                        .handle
                        .as_ref()
                        .is_some_and(|handle| handle.is_finished()),
                    _ => true,
                }
            };
            if finished {
                return;
            }
            if Instant::now() >= deadline {
                warn!("script did not unwind within grace period, force-stopping (script_id={previous_id})");
                previous_token.force_stop();
                // The worker is abandoned; its fenced host can no longer
                // touch the world. Clear the slot so the new script owns it.
                let mut state = self.state.lock();
                if state
                    .running
                    .as_ref()
                    .is_some_and(|running| running.script_id == previous_id)
                {
                    state.running = None;
                }
                return;
            }
            tokio::time::sleep(self.cancel_poll).await;
        }
    }
}
