//! Color pulsing in and out.

use std::time::Duration;

use tracing::warn;

use super::{easing, EffectContext, EffectError, Renderer};
use crate::color::RgbaColor;
use crate::render::{blend, RenderTarget};

const DEFAULT_PERIOD: Duration = Duration::from_secs(10);
const MIN_PERIOD: Duration = Duration::from_secs(1);

/// Fades `color` in and out over `period`, following `easing` both ways.
///
/// The color's alpha is the peak opacity. With `group` set only that group
/// breathes; otherwise every key does.
pub struct Breathe {
    period: Duration,
    time: Duration,
    peak: u8,
    curve: fn(f64) -> f64,
    keys: Option<Vec<usize>>,
    colors: RenderTarget,
}

impl Breathe {
    pub fn new(ctx: &EffectContext) -> Result<Self, EffectError> {
        let color = ctx.color("color")?.unwrap_or(RgbaColor::WHITE);
        let period = ctx.duration("period")?.unwrap_or(DEFAULT_PERIOD);
        if period < MIN_PERIOD {
            return Err(EffectError::Invalid(format!(
                "minimum breathe period is {}ms",
                MIN_PERIOD.as_millis()
            )));
        }

        let easing_name = ctx.get("easing").unwrap_or("EaseInOut");
        let curve = easing(easing_name).ok_or_else(|| EffectError::InvalidValue {
            key: "easing".to_string(),
            value: easing_name.to_string(),
        })?;

        let keys = ctx.get("group").and_then(|name| match ctx.group(name) {
            Some(group) => Some(group.indices().to_vec()),
            None => {
                warn!("breathe: no key group named '{}', using all keys", name);
                None
            }
        });

        let mut colors = ctx.render_target();
        colors.fill(color.with_alpha(0));

        Ok(Self {
            period,
            time: Duration::ZERO,
            peak: color.alpha,
            curve,
            keys,
            colors,
        })
    }

    /// Opacity at the current point of the cycle
    fn alpha(&self) -> u8 {
        let t = self.time.as_secs_f64() / self.period.as_secs_f64();
        // Up during the first half, down during the second
        let phase = if t < 0.5 { t * 2.0 } else { 2.0 - t * 2.0 };
        let level = (self.curve)(phase).clamp(0.0, 1.0);
        (f64::from(self.peak) * level).round() as u8
    }
}

impl Renderer for Breathe {
    fn render(&mut self, elapsed: Duration, target: &mut RenderTarget) {
        self.time += elapsed;
        while self.time >= self.period {
            self.time -= self.period;
        }

        let alpha = self.alpha();
        match &self.keys {
            Some(keys) => {
                for &index in keys {
                    if let Some(entry) = self.colors.as_mut_slice().get_mut(index) {
                        entry.alpha = alpha;
                    }
                }
            }
            None => {
                for entry in self.colors.as_mut_slice() {
                    entry.alpha = alpha;
                }
            }
        }
        blend(target, &self.colors);
    }
}
