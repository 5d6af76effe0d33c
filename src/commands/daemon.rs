//! The render daemon: one render loop per device until interrupted.

use super::{setup_interrupt_handler, CommandContext, CommandResult};
use anyhow::Result;
use keyledsd::config::EffectConfig;
use keyledsd::effect::{effect_registry, EffectContext};
use keyledsd::key_db::{KeyDatabase, KeyGroup};
use keyledsd::render_loop::{RenderLoop, RendererList};
use keyleds_keyboard::Keyboard;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};

/// How often the main thread checks for Ctrl+C and dead loops
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Instantiate the configured effects for one device, bottom first.
///
/// An effect that cannot be built is logged and left out; the rest of the
/// stack still runs.
fn build_effects(
    keys: &KeyDatabase,
    groups: &[KeyGroup],
    effects: &[EffectConfig],
) -> RendererList {
    let registry = effect_registry();
    let mut renderers = RendererList::with_capacity(effects.len());
    for entry in effects {
        let settings = entry.settings();
        let ctx = EffectContext::new(keys, groups, &settings);
        match registry.create(&entry.effect, &ctx) {
            Ok(renderer) => renderers.push(renderer),
            Err(e) => error!("Effect '{}' skipped: {}", entry.effect, e),
        }
    }
    renderers
}

/// Open a device and start animating it
fn start(ctx: &CommandContext, path: &str) -> Result<RenderLoop<Keyboard>> {
    let keyboard = ctx.open(path)?;
    let keys = KeyDatabase::from_blocks(keyboard.blocks());
    let (groups, unknown) = keys.groups(&ctx.config.groups);
    for name in unknown {
        warn!("{}: no key named '{}' for key groups", path, name);
    }

    let renderers = build_effects(&keys, &groups, &ctx.config.effects);
    info!("{}: {} keys, {} effects", path, keys.len(), renderers.len());
    Ok(RenderLoop::spawn_with(keyboard, ctx.config.render_loop(), renderers)?)
}

/// Run until Ctrl+C or until every render loop has ended
pub fn run(ctx: &CommandContext) -> CommandResult {
    let running = setup_interrupt_handler();

    let mut loops = Vec::new();
    for path in ctx.device_paths()? {
        match start(ctx, &path) {
            Ok(render_loop) => loops.push(render_loop),
            Err(e) => warn!("{}: not used: {}", path, e),
        }
    }
    if loops.is_empty() {
        eprintln!("No device found");
        return Ok(());
    }

    println!("Animating {} device(s). Press Ctrl+C to stop.", loops.len());
    while running.load(Ordering::SeqCst) {
        if !loops.iter().any(RenderLoop::is_running) {
            warn!("Every render loop has ended");
            break;
        }
        thread::sleep(POLL_INTERVAL);
    }

    info!("Stopping {} render loop(s)", loops.len());
    for render_loop in loops {
        let path = render_loop.path().to_string();
        match render_loop.stop() {
            Some(exit) => {
                if let Err(e) = exit.result {
                    info!("{}: ended with {}", path, e);
                }
            }
            None => error!("{}: render thread lost", path),
        }
    }
    Ok(())
}
