//! Per-device render thread.
//!
//! Each frame the active renderers draw onto a scratch [`RenderTarget`]. The
//! result is compared key by key with the target mirroring what the device
//! shows, and only keys that changed are sent, one "set LEDs" call per block
//! and one commit for the frame. Then the two targets trade places.
//!
//! Device errors end the scheduler run. Recoverable ones are handled by
//! resyncing the device a bounded number of times before the run resumes.
//! When errors come close together the device is assumed slow, and the pause
//! before each commit grows. It never shrinks back.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use keyleds_keyboard::{BlockId, KeyColor, KeyboardError, LedDevice};
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

use crate::animation::{self, LoopControl, Tick};
use crate::color::RgbaColor;
use crate::effect::Renderer;
use crate::key_db::Key;
use crate::render::RenderTarget;

/// Active renderers, drawn in order
pub type RendererList = Vec<Box<dyn Renderer>>;

// === Configuration ===

/// Render loop tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderLoopConfig {
    pub fps: u32,
    /// Errors closer than this to the previous one slow the commit down
    pub error_grace: Duration,
    pub commit_delay_step: Duration,
    pub commit_delay_max: Duration,
    pub resync_attempts: u32,
    /// Pause before resync attempt `n` is `n * resync_backoff`
    pub resync_backoff: Duration,
}

impl Default for RenderLoopConfig {
    fn default() -> Self {
        Self {
            fps: 32,
            error_grace: Duration::from_secs(60),
            commit_delay_step: Duration::from_micros(1000),
            commit_delay_max: Duration::from_micros(8000),
            resync_attempts: 5,
            resync_backoff: Duration::from_millis(100),
        }
    }
}

// === Frame state ===

/// Where a block's keys sit in the render targets
#[derive(Debug, Clone)]
struct BlockSlots {
    id: BlockId,
    start: usize,
    keys: Vec<u8>,
}

/// Everything the render thread owns
struct Frame<D> {
    device: D,
    blocks: Vec<BlockSlots>,
    /// What the device currently shows
    state: RenderTarget,
    /// This frame's canvas
    buffer: RenderTarget,
    renderers: Arc<Mutex<RendererList>>,
    directives: Vec<KeyColor>,
    commit_delay: Duration,
    last_error: Option<Instant>,
    config: RenderLoopConfig,
}

impl<D: LedDevice> Frame<D> {
    fn new(device: D, renderers: Arc<Mutex<RendererList>>, config: RenderLoopConfig) -> Self {
        let mut start = 0;
        let blocks: Vec<BlockSlots> = device
            .blocks()
            .iter()
            .map(|block| {
                let slots = BlockSlots {
                    id: block.id(),
                    start,
                    keys: block.keys().to_vec(),
                };
                start += block.keys().len();
                slots
            })
            .collect();

        Self {
            device,
            blocks,
            state: RenderTarget::new(start),
            buffer: RenderTarget::new(start),
            renderers,
            directives: Vec::new(),
            commit_delay: Duration::ZERO,
            last_error: None,
            config,
        }
    }

    /// Load the device's current colors into both targets
    fn read_device_state(&mut self) -> Result<(), KeyboardError> {
        for block in &self.blocks {
            let colors = self.device.get_colors(block.id)?;
            for (offset, &key) in block.keys.iter().enumerate() {
                let color = colors
                    .iter()
                    .find(|c| c.id == key)
                    .map_or(RgbaColor::BLACK, |c| {
                        RgbaColor::opaque(c.red, c.green, c.blue)
                    });
                self.state.set(block.start + offset, color);
            }
        }
        self.buffer.copy_from(&self.state);
        Ok(())
    }

    /// One frame: render, diff, send, commit, swap
    fn render(&mut self, tick: Tick) -> Result<(), KeyboardError> {
        {
            let mut renderers = self.renderers.lock();
            if renderers.is_empty() {
                return Ok(());
            }
            for renderer in renderers.iter_mut() {
                renderer.render(tick.elapsed, &mut self.buffer);
            }
        }

        self.device.flush()?;

        let mut changed = false;
        for block in &self.blocks {
            self.directives.clear();
            for (offset, &key) in block.keys.iter().enumerate() {
                let index = block.start + offset;
                let new = self.buffer[index];
                if tick.refresh || new != self.state[index] {
                    self.directives
                        .push(KeyColor::new(key, new.red, new.green, new.blue));
                }
            }
            if !self.directives.is_empty() {
                self.device.set_colors(block.id, &self.directives)?;
                changed = true;
            }
        }

        if changed {
            if !self.commit_delay.is_zero() {
                thread::sleep(self.commit_delay);
            }
            self.device.commit_colors()?;
        }

        self.state.swap(&mut self.buffer);
        Ok(())
    }

    /// Decide whether the loop may go on after `err`, resyncing the device.
    ///
    /// Returns the error back when it is fatal or when every resync failed.
    fn recover(&mut self, err: KeyboardError) -> Result<(), KeyboardError> {
        if !err.is_recoverable() {
            return Err(err);
        }
        warn!(
            "Error on device {}: {}, re-syncing device",
            self.device.path(),
            err
        );

        let now = Instant::now();
        if let Some(last) = self.last_error {
            if now.duration_since(last) < self.config.error_grace
                && self.commit_delay < self.config.commit_delay_max
            {
                self.commit_delay =
                    (self.commit_delay + self.config.commit_delay_step).min(self.config.commit_delay_max);
                warn!(
                    "Device {} seems slow, commit delay raised to {}us",
                    self.device.path(),
                    self.commit_delay.as_micros()
                );
            }
        }
        self.last_error = Some(now);

        for attempt in 0..self.config.resync_attempts {
            let pause = self.config.resync_backoff * attempt;
            if !pause.is_zero() {
                thread::sleep(pause);
            }
            if self.device.resync() {
                debug!("Device {} back after {} resync(s)", self.device.path(), attempt + 1);
                return Ok(());
            }
        }
        Err(err)
    }

    /// Thread body
    fn run(&mut self, control: &LoopControl) -> Result<(), KeyboardError> {
        self.read_device_state()?;
        let period = animation::period(self.config.fps);
        loop {
            match animation::run(control, period, |tick| self.render(tick)) {
                Ok(()) => return Ok(()),
                Err(err) => self.recover(err)?,
            }
        }
    }
}

// === Handle ===

/// What a finished render thread hands back
pub struct LoopExit<D> {
    pub device: D,
    pub result: Result<(), KeyboardError>,
}

/// Render thread of one device
pub struct RenderLoop<D: LedDevice + 'static> {
    path: String,
    control: Arc<LoopControl>,
    renderers: Arc<Mutex<RendererList>>,
    thread: Option<JoinHandle<LoopExit<D>>>,
}

impl<D: LedDevice + 'static> RenderLoop<D> {
    /// Move `device` into a new render thread and start animating.
    pub fn spawn(device: D, config: RenderLoopConfig) -> std::io::Result<Self> {
        Self::spawn_with(device, config, RendererList::new())
    }

    /// Same as [`spawn`](Self::spawn), with renderers already in place
    pub fn spawn_with(
        device: D,
        config: RenderLoopConfig,
        renderers: RendererList,
    ) -> std::io::Result<Self> {
        let path = device.path().to_string();
        let control = Arc::new(LoopControl::new());
        let renderers = Arc::new(Mutex::new(renderers));

        let thread_control = Arc::clone(&control);
        let thread_renderers = Arc::clone(&renderers);
        let thread = thread::Builder::new()
            .name(format!("render-{}", path.rsplit('/').next().unwrap_or(&path)))
            .spawn(move || {
                let mut frame = Frame::new(device, thread_renderers, config);
                let result = frame.run(&thread_control);
                match &result {
                    Ok(()) => debug!("Render loop for {} stopped", frame.device.path()),
                    Err(e) if e.is_expected() => {
                        debug!("Render loop for {} ended: {}", frame.device.path(), e)
                    }
                    Err(e) => error!("Render loop for {} failed: {}", frame.device.path(), e),
                }
                LoopExit {
                    device: frame.device,
                    result,
                }
            })?;

        info!("Render loop started for {}", path);
        Ok(Self {
            path,
            control,
            renderers,
            thread: Some(thread),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Lock the renderer list; the render thread waits while it is held
    pub fn renderers(&self) -> MutexGuard<'_, RendererList> {
        self.renderers.lock()
    }

    pub fn set_paused(&self, paused: bool) {
        self.control.set_paused(paused);
    }

    pub fn is_paused(&self) -> bool {
        self.control.is_paused()
    }

    /// Send every key on the next frame, even a paused one
    pub fn force_refresh(&self) {
        self.control.request_refresh();
    }

    /// Whether the thread is still animating
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Pass a key event to every active renderer
    pub fn key_event(&self, key: &Key, pressed: bool) {
        for renderer in self.renderers.lock().iter_mut() {
            renderer.handle_key_event(key, pressed);
        }
    }

    pub fn context_change(&self, context: &std::collections::BTreeMap<String, String>) {
        for renderer in self.renderers.lock().iter_mut() {
            renderer.handle_context_change(context);
        }
    }

    pub fn generic_event(&self, event: &std::collections::BTreeMap<String, String>) {
        for renderer in self.renderers.lock().iter_mut() {
            renderer.handle_generic_event(event);
        }
    }

    /// Stop the thread and take the device back.
    ///
    /// Returns `None` if the render thread panicked.
    pub fn stop(mut self) -> Option<LoopExit<D>> {
        self.join()
    }

    fn join(&mut self) -> Option<LoopExit<D>> {
        let thread = self.thread.take()?;
        self.control.stop();
        match thread.join() {
            Ok(exit) => {
                info!("Render loop stopped for {}", self.path);
                Some(exit)
            }
            Err(_) => {
                error!("Render thread for {} panicked", self.path);
                None
            }
        }
    }
}

impl<D: LedDevice + 'static> Drop for RenderLoop<D> {
    fn drop(&mut self) {
        self.join();
    }
}
