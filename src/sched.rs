// sched.rs - Event scheduler: armed offsets against a single epoch

//! Arms an ordered collection of `(offset, Command)` pairs against one
//! epoch captured when scheduling starts, and dispatches them from a
//! worker thread. A fired event is a tagged variant handed to a
//! [`Dispatch`] implementation, not a captured closure.
//!
//! Cancellation is synchronous and total: `cancel_all` takes the same
//! lock the worker holds while dispatching, so once it returns no
//! previously armed command can fire, even one in flight at cancellation
//! time. It is idempotent and safe to call at any point.

use std::cmp::Ordering as CmpOrdering;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::audio::{AssetKind, CueVariant};

/// What a fired event does. Paired visual and audio commands are armed at
/// the same offset and fire within the same dispatch tick.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    RevealMain {
        line: usize,
    },
    RevealDot {
        line: usize,
        dot: usize,
    },
    RevealStatus {
        line: usize,
    },
    PlayCue {
        asset: AssetKind,
        time_offset: f64,
        duration: f64,
        volume: f32,
        variant: CueVariant,
    },
    RevealPrompt,
    ReturnReady,
}

/// Receiver of fired commands.
pub trait Dispatch: Send + Sync {
    fn dispatch(&self, command: &Command);
}

/// Handle set over one armed schedule.
pub struct EventScheduler {
    /// True once cancelled; the worker checks it under this lock before
    /// every dispatch.
    gate: Arc<Mutex<bool>>,
    wake: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl EventScheduler {
    /// Arm every entry relative to an epoch captured now. Entries sharing
    /// an offset fire in registration order.
    pub fn schedule_all(mut entries: Vec<(f64, Command)>, dispatch: Arc<dyn Dispatch>) -> Self {
        // Stable sort preserves registration order for equal offsets.
        entries.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(CmpOrdering::Equal));

        let gate = Arc::new(Mutex::new(false));
        let (wake_tx, wake_rx) = mpsc::channel();
        let worker_gate = Arc::clone(&gate);
        let worker = thread::spawn(move || run_schedule(entries, dispatch, worker_gate, wake_rx));

        EventScheduler {
            gate,
            wake: Some(wake_tx),
            worker: Some(worker),
        }
    }

    /// Cancel every outstanding command. Idempotent; once this returns no
    /// previously armed command fires.
    pub fn cancel_all(&mut self) {
        {
            let mut cancelled = self.gate.lock();
            *cancelled = true;
        }
        // Dropping the wake sender interrupts the worker's sleep.
        self.wake.take();
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for EventScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

fn run_schedule(
    entries: Vec<(f64, Command)>,
    dispatch: Arc<dyn Dispatch>,
    gate: Arc<Mutex<bool>>,
    wake: Receiver<()>,
) {
    let epoch = Instant::now();

    for (offset, command) in entries {
        let due = Duration::from_secs_f64(offset.max(0.0));

        loop {
            let elapsed = epoch.elapsed();
            if elapsed >= due {
                break;
            }
            match wake.recv_timeout(due - elapsed) {
                Err(RecvTimeoutError::Timeout) => break,
                // A wake (or a dropped sender) means cancellation is in
                // progress; confirm under the gate.
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    if *gate.lock() {
                        return;
                    }
                }
            }
        }

        let cancelled = gate.lock();
        if *cancelled {
            return;
        }
        dispatch.dispatch(&command);
    }
}
