//! Highlight keys as they are pressed.

use std::time::Duration;

use super::{EffectContext, EffectError, Renderer};
use crate::color::RgbaColor;
use crate::key_db::Key;
use crate::render::{blend, RenderTarget};

const DEFAULT_SUSTAIN: Duration = Duration::from_millis(750);
const DEFAULT_DECAY: Duration = Duration::from_millis(500);

struct Press {
    index: usize,
    age: Duration,
}

/// Lights each pressed key with `color` for `sustain`, then fades it out
/// over `decay`.
pub struct Feedback {
    color: RgbaColor,
    sustain: Duration,
    decay: Duration,
    presses: Vec<Press>,
    colors: RenderTarget,
}

impl Feedback {
    pub fn new(ctx: &EffectContext) -> Result<Self, EffectError> {
        Ok(Self {
            color: ctx.color("color")?.unwrap_or(RgbaColor::WHITE),
            sustain: ctx.duration("sustain")?.unwrap_or(DEFAULT_SUSTAIN),
            decay: ctx.duration("decay")?.unwrap_or(DEFAULT_DECAY),
            presses: Vec::new(),
            colors: ctx.render_target(),
        })
    }

    fn color_at(&self, age: Duration) -> RgbaColor {
        let lifetime = self.sustain + self.decay;
        if age <= self.sustain {
            self.color
        } else if age < lifetime {
            let left = (lifetime - age).as_secs_f64() / self.decay.as_secs_f64();
            self.color
                .with_alpha((f64::from(self.color.alpha) * left) as u8)
        } else {
            RgbaColor::TRANSPARENT
        }
    }
}

impl Renderer for Feedback {
    fn render(&mut self, elapsed: Duration, target: &mut RenderTarget) {
        let lifetime = self.sustain + self.decay;
        for i in 0..self.presses.len() {
            self.presses[i].age += elapsed;
            let color = self.color_at(self.presses[i].age);
            self.colors.set(self.presses[i].index, color);
        }
        self.presses.retain(|p| p.age < lifetime);
        blend(target, &self.colors);
    }

    fn handle_key_event(&mut self, key: &Key, _pressed: bool) {
        match self.presses.iter_mut().find(|p| p.index == key.index) {
            Some(press) => press.age = Duration::ZERO,
            None => self.presses.push(Press {
                index: key.index,
                age: Duration::ZERO,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::tests::{config, keys};

    fn feedback() -> (crate::key_db::KeyDatabase, Feedback) {
        let db = keys();
        let cfg = config(&[("color", "#00ff00"), ("sustain", "100ms"), ("decay", "100ms")]);
        let effect = Feedback::new(&EffectContext::new(&db, &[], &cfg)).unwrap();
        (db, effect)
    }

    #[test]
    fn test_press_lights_then_fades() {
        let (db, mut effect) = feedback();
        let key = db.get(1).unwrap();
        let mut target = RenderTarget::new(db.len());

        effect.handle_key_event(key, true);
        effect.render(Duration::from_millis(50), &mut target);
        assert_eq!(target[1], RgbaColor::opaque(0, 255, 0));
        assert_eq!(target[0], RgbaColor::TRANSPARENT);

        // Half way through the decay
        effect.render(Duration::from_millis(100), &mut target);
        let alpha = effect.colors[1].alpha;
        assert!((120..=135).contains(&alpha), "alpha {alpha}");

        // Gone, and forgotten
        effect.render(Duration::from_millis(100), &mut target);
        assert_eq!(effect.colors[1], RgbaColor::TRANSPARENT);
        assert!(effect.presses.is_empty());
    }

    #[test]
    fn test_repeat_press_restarts() {
        let (db, mut effect) = feedback();
        let key = db.get(2).unwrap();
        let mut target = RenderTarget::new(db.len());

        effect.handle_key_event(key, true);
        effect.render(Duration::from_millis(150), &mut target);
        effect.handle_key_event(key, false);
        assert_eq!(effect.presses.len(), 1);
        effect.render(Duration::from_millis(10), &mut target);
        assert_eq!(effect.colors[2], RgbaColor::opaque(0, 255, 0));
    }
}
