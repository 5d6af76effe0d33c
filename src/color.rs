// Color values and conversion utilities

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// One render target entry: red, green, blue and alpha, in memory order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, FromBytes, IntoBytes, KnownLayout, Immutable,
)]
#[repr(C)]
pub struct RgbaColor {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

impl RgbaColor {
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);
    pub const BLACK: Self = Self::opaque(0, 0, 0);
    pub const WHITE: Self = Self::opaque(255, 255, 255);

    pub const fn new(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    pub const fn opaque(red: u8, green: u8, blue: u8) -> Self {
        Self::new(red, green, blue, 255)
    }

    /// Same color with another alpha
    pub fn with_alpha(self, alpha: u8) -> Self {
        Self { alpha, ..self }
    }

    /// Channel-wise linear interpolation, alpha included.
    pub fn lerp(a: RgbaColor, b: RgbaColor, t: f32) -> RgbaColor {
        let t = t.clamp(0.0, 1.0);
        let mix = |x: u8, y: u8| (x as f32 * (1.0 - t) + y as f32 * t) as u8;
        RgbaColor::new(
            mix(a.red, b.red),
            mix(a.green, b.green),
            mix(a.blue, b.blue),
            mix(a.alpha, b.alpha),
        )
    }

    /// Parse a color string: "#RRGGBB", "#RRGGBBAA", "red", "green", etc.
    ///
    /// Named colors and six-digit hex are fully opaque.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            if !hex.is_ascii() {
                return None;
            }
            let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
            return match hex.len() {
                6 => Some(Self::opaque(channel(0)?, channel(2)?, channel(4)?)),
                8 => Some(Self::new(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
                _ => None,
            };
        }
        match s.to_ascii_lowercase().as_str() {
            "black" => Some(Self::BLACK),
            "red" => Some(Self::opaque(255, 0, 0)),
            "green" => Some(Self::opaque(0, 255, 0)),
            "blue" => Some(Self::opaque(0, 0, 255)),
            "yellow" => Some(Self::opaque(255, 255, 0)),
            "cyan" => Some(Self::opaque(0, 255, 255)),
            "magenta" | "pink" => Some(Self::opaque(255, 0, 255)),
            "white" => Some(Self::WHITE),
            "orange" => Some(Self::opaque(255, 165, 0)),
            "purple" => Some(Self::opaque(128, 0, 255)),
            "transparent" => Some(Self::TRANSPARENT),
            _ => None,
        }
    }
}

impl std::fmt::Display for RgbaColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.red, self.green, self.blue)?;
        if self.alpha != 255 {
            write!(f, "{:02x}", self.alpha)?;
        }
        Ok(())
    }
}

/// Convert HSV to RGB
/// h: hue in degrees, wrapped into 0-360
/// s: saturation (0-1)
/// v: value/brightness (0-1)
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (u8, u8, u8) {
    let h = h.rem_euclid(360.0);
    let s = s.clamp(0.0, 1.0);
    let v = v.clamp(0.0, 1.0);
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = if h < 60.0 {
        (c, x, 0.0)
    } else if h < 120.0 {
        (x, c, 0.0)
    } else if h < 180.0 {
        (0.0, c, x)
    } else if h < 240.0 {
        (0.0, x, c)
    } else if h < 300.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    (
        ((r + m) * 255.0).round() as u8,
        ((g + m) * 255.0).round() as u8,
        ((b + m) * 255.0).round() as u8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hsv_to_rgb() {
        // Red
        assert_eq!(hsv_to_rgb(0.0, 1.0, 1.0), (255, 0, 0));
        // Green
        assert_eq!(hsv_to_rgb(120.0, 1.0, 1.0), (0, 255, 0));
        // Blue
        assert_eq!(hsv_to_rgb(240.0, 1.0, 1.0), (0, 0, 255));
        assert_eq!(hsv_to_rgb(-120.0, 1.0, 1.0), (0, 0, 255));
        assert_eq!(hsv_to_rgb(480.0, 1.0, 1.0), (0, 255, 0));
        // White (no saturation)
        assert_eq!(hsv_to_rgb(0.0, 0.0, 1.0), (255, 255, 255));
        // Black (no value)
        assert_eq!(hsv_to_rgb(0.0, 1.0, 0.0), (0, 0, 0));
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(
            RgbaColor::parse("#ff8000"),
            Some(RgbaColor::opaque(255, 128, 0))
        );
        assert_eq!(
            RgbaColor::parse("#FF800040"),
            Some(RgbaColor::new(255, 128, 0, 0x40))
        );
        assert_eq!(RgbaColor::parse("#ff80"), None);
        assert_eq!(RgbaColor::parse("#gg0000"), None);
        assert_eq!(RgbaColor::parse("#ééé"), None);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(RgbaColor::parse("Red"), Some(RgbaColor::opaque(255, 0, 0)));
        assert_eq!(RgbaColor::parse(" white "), Some(RgbaColor::WHITE));
        assert_eq!(RgbaColor::parse("transparent"), Some(RgbaColor::TRANSPARENT));
        assert_eq!(RgbaColor::parse("chartreuse"), None);
    }

    #[test]
    fn test_display_roundtrips_through_parse() {
        for color in [
            RgbaColor::opaque(1, 2, 3),
            RgbaColor::new(0xaa, 0xbb, 0xcc, 0x10),
        ] {
            assert_eq!(RgbaColor::parse(&color.to_string()), Some(color));
        }
    }

    #[test]
    fn test_lerp() {
        let a = RgbaColor::new(0, 0, 0, 0);
        let b = RgbaColor::new(200, 100, 50, 255);
        assert_eq!(RgbaColor::lerp(a, b, 0.0), a);
        assert_eq!(RgbaColor::lerp(a, b, 1.0), b);
        assert_eq!(RgbaColor::lerp(a, b, 0.5), RgbaColor::new(100, 50, 25, 127));
    }
}
