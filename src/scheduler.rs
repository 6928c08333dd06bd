use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{BackdropError, Result};

/// Frame callback receiving a timestamp in milliseconds.
pub type FrameCallback = Box<dyn FnMut(f64)>;

/// Shared flag that stops a frame loop from rescheduling itself.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Drives a frame callback at the host's display cadence until cancelled.
pub trait FrameScheduler {
    fn start(&mut self, callback: FrameCallback, token: CancellationToken) -> Result<()>;
}

struct Registration {
    callback: FrameCallback,
    token: CancellationToken,
}

/// Scheduler pumped by an outer event loop, one frame per `pump`.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    slot: Rc<RefCell<Option<Registration>>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.slot
            .borrow()
            .as_ref()
            .is_some_and(|registration| !registration.token.is_cancelled())
    }

    /// Runs one frame. Returns `false` once the loop is stopped.
    pub fn pump(&self, timestamp_ms: f64) -> bool {
        let mut slot = self.slot.borrow_mut();
        let Some(registration) = slot.as_mut() else {
            return false;
        };
        if registration.token.is_cancelled() {
            *slot = None;
            return false;
        }
        (registration.callback)(timestamp_ms);
        true
    }
}

impl FrameScheduler for ManualScheduler {
    fn start(&mut self, callback: FrameCallback, token: CancellationToken) -> Result<()> {
        let mut slot = self.slot.borrow_mut();
        if slot.is_some() {
            return Err(BackdropError::Scheduler(
                "scheduler already drives a frame loop".to_string(),
            ));
        }
        *slot = Some(Registration { callback, token });
        Ok(())
    }
}

/// Runs a fixed number of frames synchronously at a constant step.
#[derive(Debug, Clone, Copy)]
pub struct FixedStepScheduler {
    frames: u64,
    step_ms: f64,
    executed: u64,
}

impl FixedStepScheduler {
    pub fn new(frames: u64, step_ms: f64) -> Self {
        Self {
            frames,
            step_ms,
            executed: 0,
        }
    }

    pub fn executed(&self) -> u64 {
        self.executed
    }
}

impl FrameScheduler for FixedStepScheduler {
    fn start(&mut self, mut callback: FrameCallback, token: CancellationToken) -> Result<()> {
        for frame in 0..self.frames {
            if token.is_cancelled() {
                break;
            }
            callback(frame as f64 * self.step_ms);
            self.executed += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn manual_scheduler_stops_after_cancel() {
        let mut scheduler = ManualScheduler::new();
        let seen = Rc::new(Cell::new(0));
        let counter = Rc::clone(&seen);
        let token = CancellationToken::new();
        scheduler
            .start(Box::new(move |_| counter.set(counter.get() + 1)), token.clone())
            .unwrap();

        assert!(scheduler.pump(0.0));
        assert!(scheduler.pump(16.0));
        token.cancel();
        assert!(!scheduler.pump(32.0));
        assert!(!scheduler.is_running());
        assert_eq!(seen.get(), 2);
    }

    #[test]
    fn manual_scheduler_refuses_second_loop() {
        let mut scheduler = ManualScheduler::new();
        scheduler
            .start(Box::new(|_| {}), CancellationToken::new())
            .unwrap();
        assert!(scheduler
            .start(Box::new(|_| {}), CancellationToken::new())
            .is_err());
    }

    #[test]
    fn fixed_step_passes_increasing_timestamps() {
        let stamps = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&stamps);
        let mut scheduler = FixedStepScheduler::new(4, 16.0);
        scheduler
            .start(
                Box::new(move |t| sink.borrow_mut().push(t)),
                CancellationToken::new(),
            )
            .unwrap();
        assert_eq!(*stamps.borrow(), vec![0.0, 16.0, 32.0, 48.0]);
        assert_eq!(scheduler.executed(), 4);
    }

    #[test]
    fn fixed_step_honours_cancelled_token() {
        let token = CancellationToken::new();
        token.cancel();
        let mut scheduler = FixedStepScheduler::new(10, 16.0);
        scheduler.start(Box::new(|_| {}), token).unwrap();
        assert_eq!(scheduler.executed(), 0);
    }
}
