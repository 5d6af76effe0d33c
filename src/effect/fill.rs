//! Solid colors, per group.
//!
//! `color` fills every key; every other entry maps a group name to a color.
//! Fully opaque results are copied over the canvas, anything else is blended.

use std::time::Duration;

use tracing::warn;

use super::{EffectContext, EffectError, Renderer};
use crate::color::RgbaColor;
use crate::render::{blend, RenderTarget};

pub struct Fill {
    colors: RenderTarget,
    overwrite: bool,
}

impl Fill {
    pub fn new(ctx: &EffectContext) -> Result<Self, EffectError> {
        let mut colors = ctx.render_target();
        colors.fill(ctx.color("color")?.unwrap_or(RgbaColor::TRANSPARENT));

        for (name, value) in ctx.config {
            if name == "color" || name == "effect" {
                continue;
            }
            let Some(group) = ctx.group(name) else {
                warn!("fill: no key group named '{}'", name);
                continue;
            };
            let color = RgbaColor::parse(value).ok_or_else(|| EffectError::InvalidValue {
                key: name.clone(),
                value: value.clone(),
            })?;
            for &index in group.indices() {
                colors.set(index, color);
            }
        }

        let overwrite = colors.iter().all(|c| c.alpha == u8::MAX);
        Ok(Self { colors, overwrite })
    }
}

impl Renderer for Fill {
    fn render(&mut self, _elapsed: Duration, target: &mut RenderTarget) {
        if self.overwrite {
            target.copy_from(&self.colors);
        } else {
            blend(target, &self.colors);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::tests::{config, keys};
    use crate::key_db::KeyGroup;

    #[test]
    fn test_opaque_fill_overwrites() {
        let db = keys();
        let cfg = config(&[("color", "#102030")]);
        let mut fill = Fill::new(&EffectContext::new(&db, &[], &cfg)).unwrap();
        let mut target = RenderTarget::new(db.len());
        target.fill(RgbaColor::WHITE);
        fill.render(Duration::ZERO, &mut target);
        assert!(target.iter().all(|c| *c == RgbaColor::opaque(0x10, 0x20, 0x30)));
    }

    #[test]
    fn test_group_colors_blend_over_canvas() {
        let db = keys();
        let groups = [KeyGroup::new("logo", vec![4, 5])];
        let cfg = config(&[("logo", "red"), ("nokeys", "blue")]);
        let mut fill = Fill::new(&EffectContext::new(&db, &groups, &cfg)).unwrap();

        let mut target = RenderTarget::new(db.len());
        target.fill(RgbaColor::WHITE);
        fill.render(Duration::ZERO, &mut target);
        assert_eq!(target[0], RgbaColor::WHITE);
        assert_eq!(target[4], RgbaColor::opaque(255, 0, 0));
        assert_eq!(target[5], RgbaColor::opaque(255, 0, 0));
    }

    #[test]
    fn test_bad_group_color_is_an_error() {
        let db = keys();
        let groups = [KeyGroup::new("logo", vec![4, 5])];
        let cfg = config(&[("logo", "sparkly")]);
        assert!(matches!(
            Fill::new(&EffectContext::new(&db, &groups, &cfg)),
            Err(EffectError::InvalidValue { .. })
        ));
    }
}
