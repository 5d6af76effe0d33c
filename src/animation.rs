//! Fixed-rate animation scheduler.
//!
//! [`run`] calls a frame callback once per period on the calling thread until
//! [`LoopControl::stop`] is called from elsewhere. Ticks are scheduled on
//! absolute deadlines; a frame that runs late pushes the schedule forward
//! instead of rendering a burst of catch-up frames.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
struct Status {
    paused: bool,
    abort: bool,
    refresh: bool,
}

/// Shared run status of one animation loop
#[derive(Debug, Default)]
pub struct LoopControl {
    status: Mutex<Status>,
    wake: Condvar,
}

/// One scheduled frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Time since the previous frame; zero for the first frame and after a pause
    pub elapsed: Duration,
    /// A refresh was requested since the previous frame
    pub refresh: bool,
}

impl LoopControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_paused(&self, paused: bool) {
        self.status.lock().paused = paused;
        self.wake.notify_all();
    }

    pub fn is_paused(&self) -> bool {
        self.status.lock().paused
    }

    /// Ask for the next frame to be a refresh; wakes a paused loop for one frame
    pub fn request_refresh(&self) {
        self.status.lock().refresh = true;
        self.wake.notify_all();
    }

    /// Make [`run`] return after the current frame
    pub fn stop(&self) {
        self.status.lock().abort = true;
        self.wake.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        self.status.lock().abort
    }
}

/// Frames per second to frame period
pub fn period(fps: u32) -> Duration {
    Duration::from_secs(1) / fps.max(1)
}

/// Call `frame` every `period` until stopped or until it fails.
///
/// Returns `Ok(())` once [`LoopControl::stop`] has been called. A frame error
/// is returned as is; the caller may recover and call `run` again. A refresh
/// taken by the failed frame stays pending for the next one.
pub fn run<E>(
    control: &LoopControl,
    period: Duration,
    mut frame: impl FnMut(Tick) -> Result<(), E>,
) -> Result<(), E> {
    let mut last_frame: Option<Instant> = None;
    let mut next_tick = Instant::now();

    loop {
        let refresh = {
            let mut status = control.status.lock();
            loop {
                if status.abort {
                    return Ok(());
                }
                if status.paused {
                    if status.refresh {
                        break;
                    }
                    control.wake.wait(&mut status);
                    last_frame = None;
                    next_tick = Instant::now();
                    continue;
                }
                if Instant::now() >= next_tick {
                    break;
                }
                control.wake.wait_until(&mut status, next_tick);
            }
            std::mem::take(&mut status.refresh)
        };

        let now = Instant::now();
        let elapsed = last_frame.map_or(Duration::ZERO, |t| now.duration_since(t));
        last_frame = Some(now);

        if let Err(err) = frame(Tick { elapsed, refresh }) {
            if refresh {
                control.status.lock().refresh = true;
            }
            return Err(err);
        }

        next_tick += period;
        let now = Instant::now();
        if next_tick < now {
            next_tick = now + period;
        }
    }
}
