//! Built-in lighting effects.
//!
//! An effect is a [`Renderer`]: the render loop calls it once per frame with
//! the time elapsed since the previous frame and the frame's canvas. Effects
//! are created by name through the [`EffectRegistry`] from a string
//! configuration map, for instance:
//!
//! ```toml
//! [[effects]]
//! effect = "breathe"
//! color = "#ff000080"
//! period = "4s"
//! easing = "EaseInOut"
//! ```

mod breathe;
mod feedback;
mod fill;
mod wave;

pub use breathe::Breathe;
pub use feedback::Feedback;
pub use fill::Fill;
pub use wave::Wave;

use keyframe::functions as ease;
use keyframe::EasingFunction;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

use crate::color::RgbaColor;
use crate::key_db::{Key, KeyDatabase, KeyGroup};
use crate::render::RenderTarget;

// ── Renderer ─────────────────────────────────────────────────────────

/// One active effect.
///
/// Callbacks run on the render thread or under the renderer-list lock, never
/// concurrently with `render`.
pub trait Renderer: Send {
    /// Draw this frame onto `target`
    fn render(&mut self, elapsed: Duration, target: &mut RenderTarget);

    /// A key was pressed or released
    fn handle_key_event(&mut self, _key: &Key, _pressed: bool) {}

    /// The desktop context changed (active window, session state...)
    fn handle_context_change(&mut self, _context: &BTreeMap<String, String>) {}

    /// Free-form event sent by another component
    fn handle_generic_event(&mut self, _event: &BTreeMap<String, String>) {}
}

// ── Errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum EffectError {
    #[error("unknown effect '{0}'")]
    UnknownEffect(String),

    #[error("invalid value '{value}' for '{key}'")]
    InvalidValue { key: String, value: String },

    #[error("{0}")]
    Invalid(String),
}

// ── Construction context ─────────────────────────────────────────────

/// What an effect gets to look at when it is created.
#[derive(Debug, Clone, Copy)]
pub struct EffectContext<'a> {
    pub keys: &'a KeyDatabase,
    pub groups: &'a [KeyGroup],
    pub config: &'a BTreeMap<String, String>,
}

impl<'a> EffectContext<'a> {
    pub fn new(
        keys: &'a KeyDatabase,
        groups: &'a [KeyGroup],
        config: &'a BTreeMap<String, String>,
    ) -> Self {
        Self {
            keys,
            groups,
            config,
        }
    }

    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.config.get(key).map(String::as_str)
    }

    /// Fresh transparent canvas sized for the device
    pub fn render_target(&self) -> RenderTarget {
        RenderTarget::new(self.keys.len())
    }

    pub fn group(&self, name: &str) -> Option<&'a KeyGroup> {
        self.groups.iter().find(|g| g.name() == name)
    }

    pub fn color(&self, key: &str) -> Result<Option<RgbaColor>, EffectError> {
        self.parse(key, RgbaColor::parse)
    }

    pub fn duration(&self, key: &str) -> Result<Option<Duration>, EffectError> {
        self.parse(key, parse_duration)
    }

    pub fn number(&self, key: &str) -> Result<Option<f32>, EffectError> {
        self.parse(key, |s| s.trim().parse().ok())
    }

    fn parse<T>(
        &self,
        key: &str,
        parser: impl FnOnce(&str) -> Option<T>,
    ) -> Result<Option<T>, EffectError> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => parser(value).map(Some).ok_or_else(|| EffectError::InvalidValue {
                key: key.to_string(),
                value: value.to_string(),
            }),
        }
    }
}

/// Parse "500ms", "1.5s", "2m" or a bare number of milliseconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    let split = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(split);
    let value: f64 = number.parse().ok()?;
    let millis = match unit.trim() {
        "" | "ms" => value,
        "s" => value * 1000.0,
        "m" | "min" => value * 60_000.0,
        _ => return None,
    };
    Duration::try_from_secs_f64(millis / 1000.0).ok()
}

/// Easing curve by name, mapping 0.0-1.0 onto 0.0-1.0.
pub fn easing(name: &str) -> Option<fn(f64) -> f64> {
    let curve: fn(f64) -> f64 = match name {
        "Linear" => |t| t,
        "EaseIn" | "EaseInQuad" => |t| ease::EaseIn.y(t),
        "EaseOut" | "EaseOutQuad" => |t| ease::EaseOut.y(t),
        "EaseInOut" => |t| ease::EaseInOut.y(t),
        "EaseInCubic" => |t| ease::EaseInCubic.y(t),
        "EaseOutCubic" => |t| ease::EaseOutCubic.y(t),
        "EaseInOutCubic" => |t| ease::EaseInOutCubic.y(t),
        "EaseInQuart" => |t| ease::EaseInQuart.y(t),
        "EaseOutQuart" => |t| ease::EaseOutQuart.y(t),
        "EaseInOutQuart" => |t| ease::EaseInOutQuart.y(t),
        "EaseInQuint" => |t| ease::EaseInQuint.y(t),
        "EaseOutQuint" => |t| ease::EaseOutQuint.y(t),
        "EaseInOutQuint" => |t| ease::EaseInOutQuint.y(t),
        _ => return None,
    };
    Some(curve)
}

// ── Registry ─────────────────────────────────────────────────────────

/// Builds one effect instance
pub type EffectConstructor = fn(&EffectContext) -> Result<Box<dyn Renderer>, EffectError>;

/// Effect constructors by name
pub struct EffectRegistry {
    effects: BTreeMap<&'static str, EffectConstructor>,
}

impl EffectRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            effects: BTreeMap::new(),
        }
    }

    /// Create a registry with the built-in effects
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("fill", |ctx| Ok(Box::new(Fill::new(ctx)?)));
        registry.register("breathe", |ctx| Ok(Box::new(Breathe::new(ctx)?)));
        registry.register("wave", |ctx| Ok(Box::new(Wave::new(ctx)?)));
        registry.register("feedback", |ctx| Ok(Box::new(Feedback::new(ctx)?)));
        registry
    }

    /// Register a constructor; replaces any previous one with that name
    pub fn register(&mut self, name: &'static str, constructor: EffectConstructor) {
        self.effects.insert(name, constructor);
    }

    pub fn create(
        &self,
        name: &str,
        context: &EffectContext,
    ) -> Result<Box<dyn Renderer>, EffectError> {
        let constructor = self
            .effects
            .get(name)
            .ok_or_else(|| EffectError::UnknownEffect(name.to_string()))?;
        constructor(context)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.effects.contains_key(name)
    }

    /// List all effect names.
    pub fn names(&self) -> Vec<&'static str> {
        self.effects.keys().copied().collect()
    }
}

impl Default for EffectRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

static REGISTRY: std::sync::OnceLock<EffectRegistry> = std::sync::OnceLock::new();

/// Global registry, holding the built-in effects
pub fn effect_registry() -> &'static EffectRegistry {
    REGISTRY.get_or_init(EffectRegistry::with_builtins)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use keyleds_keyboard::{BlockId, KeyBlock, RgbColor};

    /// Six keys: ESC, A, B, C on the keys block, then two logo LEDs
    pub(crate) fn keys() -> KeyDatabase {
        KeyDatabase::from_blocks(&[
            KeyBlock::new(BlockId::KEYS, vec![0x29, 0x04, 0x05, 0x06], RgbColor::WHITE),
            KeyBlock::new(BlockId::LOGO, vec![0x01, 0x02], RgbColor::WHITE),
        ])
    }

    pub(crate) fn config(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration("1.5s"), Some(Duration::from_millis(1500)));
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration(" 250 "), Some(Duration::from_millis(250)));
        assert_eq!(parse_duration("10 s"), Some(Duration::from_secs(10)));
        assert_eq!(parse_duration("fast"), None);
        assert_eq!(parse_duration("3h"), None);
    }

    #[test]
    fn test_easing_lookup() {
        let linear = easing("Linear").unwrap();
        assert_eq!(linear(0.25), 0.25);
        let curve = easing("EaseInOut").unwrap();
        assert!(curve(0.0) < 0.01);
        assert!(curve(1.0) > 0.99);
        assert!(curve(0.25) < 0.25);
        assert!(easing("Bounce").is_none());
    }

    #[test]
    fn test_context_values() {
        let db = keys();
        let cfg = config(&[("color", "red"), ("period", "nope"), ("length", "400")]);
        let ctx = EffectContext::new(&db, &[], &cfg);
        assert_eq!(
            ctx.color("color").unwrap(),
            Some(RgbaColor::opaque(255, 0, 0))
        );
        assert_eq!(ctx.color("missing").unwrap(), None);
        assert!(matches!(
            ctx.duration("period"),
            Err(EffectError::InvalidValue { .. })
        ));
        assert_eq!(ctx.number("length").unwrap(), Some(400.0));
        assert_eq!(ctx.render_target().len(), 6);
    }

    #[test]
    fn test_registry_with_builtins() {
        let registry = effect_registry();
        assert_eq!(registry.names(), vec!["breathe", "feedback", "fill", "wave"]);

        let db = keys();
        let cfg = config(&[("color", "blue")]);
        let ctx = EffectContext::new(&db, &[], &cfg);
        let mut effect = registry.create("fill", &ctx).unwrap();
        let mut target = ctx.render_target();
        effect.render(Duration::ZERO, &mut target);
        assert!(target.iter().all(|c| *c == RgbaColor::opaque(0, 0, 255)));

        assert!(matches!(
            registry.create("sparkle", &ctx),
            Err(EffectError::UnknownEffect(_))
        ));
    }

    #[test]
    fn test_register_custom_effect() {
        struct Black;
        impl Renderer for Black {
            fn render(&mut self, _elapsed: Duration, target: &mut RenderTarget) {
                target.fill(RgbaColor::BLACK);
            }
        }

        let mut registry = EffectRegistry::new();
        assert!(!registry.contains("black"));
        registry.register("black", |_| Ok(Box::new(Black)));
        assert!(registry.contains("black"));
    }
}
