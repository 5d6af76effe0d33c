// keyledsd - per-key LED animation for Logitech HID++ keyboards
// Colors, render targets, effects and the per-device render loop

pub mod animation;
pub mod color;
pub mod config;
pub mod effect;
pub mod key_db;
pub mod render;
pub mod render_loop;

pub use color::RgbaColor;
pub use config::Config;
pub use effect::{effect_registry, EffectRegistry, Renderer};
pub use key_db::{Key, KeyDatabase, KeyGroup};
pub use render::RenderTarget;
pub use render_loop::{RenderLoop, RenderLoopConfig};
