//! Color wave traveling along the keys.

use std::time::Duration;

use tracing::warn;

use super::{EffectContext, EffectError, Renderer};
use crate::color::{hsv_to_rgb, RgbaColor};
use crate::render::{blend, RenderTarget};

/// Color table resolution, also the phase resolution
const ACCURACY: usize = 1024;

const DEFAULT_PERIOD: Duration = Duration::from_secs(10);
/// Wave length in thousandths of the key row
const DEFAULT_LENGTH: f32 = 1000.0;

/// Cycles a color table along the keys, in key order.
///
/// Colors come from every `color*` entry, interpolated in turn and back to
/// the first. Without any the table is a full hue circle. `length` is the
/// distance between two crests, in thousandths of the key range.
pub struct Wave {
    period: Duration,
    time: Duration,
    table: Vec<RgbaColor>,
    /// (slot index, phase shift) per animated key
    phases: Vec<(usize, usize)>,
    colors: RenderTarget,
}

impl Wave {
    pub fn new(ctx: &EffectContext) -> Result<Self, EffectError> {
        let period = ctx.duration("period")?.unwrap_or(DEFAULT_PERIOD);
        if period.is_zero() {
            return Err(EffectError::Invalid("wave period must not be zero".into()));
        }
        let length = ctx.number("length")?.unwrap_or(DEFAULT_LENGTH);
        if length <= 0.0 {
            return Err(EffectError::Invalid("wave length must be positive".into()));
        }

        let mut stops = Vec::new();
        for (name, value) in ctx.config {
            if name.starts_with("color") {
                stops.push(RgbaColor::parse(value).ok_or_else(|| {
                    EffectError::InvalidValue {
                        key: name.clone(),
                        value: value.clone(),
                    }
                })?);
            }
        }
        let table = if stops.is_empty() {
            hue_table()
        } else {
            color_table(&stops)
        };

        let slots: Vec<usize> = match ctx.get("group") {
            Some(name) => match ctx.group(name) {
                Some(group) => group.indices().to_vec(),
                None => {
                    warn!("wave: no key group named '{}', using all keys", name);
                    (0..ctx.keys.len()).collect()
                }
            },
            None => (0..ctx.keys.len()).collect(),
        };
        let phases = compute_phases(&slots, ctx.keys.len(), length);

        Ok(Self {
            period,
            time: Duration::ZERO,
            table,
            phases,
            colors: ctx.render_target(),
        })
    }
}

/// Phase shift of each key from its position in the key order
fn compute_phases(slots: &[usize], total: usize, length: f32) -> Vec<(usize, usize)> {
    let frequency = 1000.0 / length;
    slots
        .iter()
        .map(|&index| {
            let position = index as f32 / total.max(1) as f32;
            let phase = (frequency * position).rem_euclid(1.0);
            (index, ((phase * ACCURACY as f32) as usize).min(ACCURACY - 1))
        })
        .collect()
}

fn hue_table() -> Vec<RgbaColor> {
    (0..ACCURACY)
        .map(|i| {
            let (r, g, b) = hsv_to_rgb(i as f32 * 360.0 / ACCURACY as f32, 1.0, 1.0);
            RgbaColor::opaque(r, g, b)
        })
        .collect()
}

/// Even gradient through every stop, wrapping back to the first
fn color_table(stops: &[RgbaColor]) -> Vec<RgbaColor> {
    let mut table = vec![RgbaColor::TRANSPARENT; ACCURACY];
    for (range, &from) in stops.iter().enumerate() {
        let to = stops[(range + 1) % stops.len()];
        let first = range * ACCURACY / stops.len();
        let last = (range + 1) * ACCURACY / stops.len();
        for (offset, entry) in table[first..last].iter_mut().enumerate() {
            *entry = RgbaColor::lerp(from, to, offset as f32 / (last - first) as f32);
        }
    }
    table
}

impl Renderer for Wave {
    fn render(&mut self, elapsed: Duration, target: &mut RenderTarget) {
        self.time += elapsed;
        while self.time >= self.period {
            self.time -= self.period;
        }
        let t = ((self.time.as_secs_f64() / self.period.as_secs_f64()) * ACCURACY as f64) as usize
            % ACCURACY;

        for &(index, phase) in &self.phases {
            let at = (t + ACCURACY - phase) % ACCURACY;
            self.colors.set(index, self.table[at]);
        }
        blend(target, &self.colors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::tests::{config, keys};

    #[test]
    fn test_color_table_wraps() {
        let red = RgbaColor::opaque(255, 0, 0);
        let blue = RgbaColor::opaque(0, 0, 255);
        let table = color_table(&[red, blue]);
        assert_eq!(table.len(), ACCURACY);
        assert_eq!(table[0], red);
        assert_eq!(table[ACCURACY / 2], blue);
        // Second half heads back towards red
        assert!(table[ACCURACY - 1].red > 200);
    }

    #[test]
    fn test_phases_follow_key_order() {
        let phases = compute_phases(&[0, 1, 2, 3], 4, 1000.0);
        assert_eq!(phases, vec![(0, 0), (1, 256), (2, 512), (3, 768)]);
        // Half the length: two crests over the keys
        let phases = compute_phases(&[0, 2], 4, 500.0);
        assert_eq!(phases, vec![(0, 0), (2, 0)]);
    }

    #[test]
    fn test_hue_gradient_by_default() {
        let db = keys();
        let cfg = config(&[]);
        let mut wave = Wave::new(&EffectContext::new(&db, &[], &cfg)).unwrap();
        let mut target = RenderTarget::new(db.len());
        wave.render(Duration::ZERO, &mut target);
        assert_eq!(target[0], RgbaColor::opaque(255, 0, 0));
        // Later keys lag behind on the hue circle
        assert_ne!(target[3], target[0]);
        assert!(target.iter().all(|c| c.alpha == 255));
    }

    #[test]
    fn test_wave_moves_over_time() {
        let db = keys();
        let cfg = config(&[("color1", "red"), ("color2", "blue"), ("period", "1s")]);
        let mut wave = Wave::new(&EffectContext::new(&db, &[], &cfg)).unwrap();
        let mut target = RenderTarget::new(db.len());
        wave.render(Duration::ZERO, &mut target);
        let before = target[0];
        wave.render(Duration::from_millis(500), &mut target);
        assert_eq!(before, RgbaColor::opaque(255, 0, 0));
        assert_eq!(target[0], RgbaColor::opaque(0, 0, 255));
        // A full period brings it back
        wave.render(Duration::from_millis(500), &mut target);
        assert_eq!(target[0], before);
    }

    #[test]
    fn test_invalid_settings() {
        let db = keys();
        for pairs in [
            &[("length", "0")][..],
            &[("period", "0ms")][..],
            &[("color1", "nope")][..],
        ] {
            let cfg = config(pairs);
            assert!(Wave::new(&EffectContext::new(&db, &[], &cfg)).is_err());
        }
    }
}
