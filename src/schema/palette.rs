//! Color scheme catalog and hex color handling.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub const BLACK: Rgb = Rgb([0, 0, 0]);
    pub const WHITE: Rgb = Rgb([255, 255, 255]);

    /// Parse a `#RRGGBB` (or `RRGGBB`) hex string.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
        Some(Rgb([channel(0)?, channel(2)?, channel(4)?]))
    }

    /// Linear interpolation towards `other`; `t` is clamped to [0, 1].
    #[inline]
    pub fn lerp(self, other: Rgb, t: f32) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Rgb([
            mix(self.0[0], other.0[0]),
            mix(self.0[1], other.0[1]),
            mix(self.0[2], other.0[2]),
        ])
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.0[0], self.0[1], self.0[2])
    }
}

/// An (alive, dead) color pair drawn from [`COLOR_SCHEMES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColorScheme {
    /// Hex color for live cells (intensity 1.0).
    pub alive: &'static str,
    /// Hex color for dead cells (intensity 0.0).
    pub dead: &'static str,
}

impl ColorScheme {
    /// Alive color as RGB. Catalog entries are always valid hex.
    pub fn alive_rgb(&self) -> Rgb {
        Rgb::from_hex(self.alive).unwrap_or(Rgb::WHITE)
    }

    /// Dead color as RGB.
    pub fn dead_rgb(&self) -> Rgb {
        Rgb::from_hex(self.dead).unwrap_or(Rgb::BLACK)
    }

    /// Color for a normalized intensity: dead at 0.0, alive at 1.0.
    #[inline]
    pub fn gradient(&self, intensity: f32) -> Rgb {
        self.dead_rgb().lerp(self.alive_rgb(), intensity)
    }
}

/// Fixed, ordered catalog of color schemes. Order is part of the
/// seed-to-scheme mapping and must not change.
#[rustfmt::skip]
pub const COLOR_SCHEMES: [ColorScheme; 17] = [
    ColorScheme { alive: "#02343F", dead: "#F0EDCC" },
    ColorScheme { alive: "#331B3F", dead: "#ACC7B4" },
    ColorScheme { alive: "#000000", dead: "#FFFFFF" },
    ColorScheme { alive: "#0A174E", dead: "#F5D042" },
    ColorScheme { alive: "#07553B", dead: "#CED46A" },
    ColorScheme { alive: "#50586C", dead: "#DCE2F0" },
    ColorScheme { alive: "#815854", dead: "#F9EBDE" },
    ColorScheme { alive: "#1E4174", dead: "#DDA94B" },
    ColorScheme { alive: "#A4193D", dead: "#FFDFB9" },
    ColorScheme { alive: "#FFDFDE", dead: "#6A7BA2" },
    ColorScheme { alive: "#3B1877", dead: "#DA5A2A" },
    ColorScheme { alive: "#5F4B8B", dead: "#E69A8D" },
    ColorScheme { alive: "#00203F", dead: "#ADEFD1" },
    ColorScheme { alive: "#606060", dead: "#D6ED17" },
    ColorScheme { alive: "#2C5F2D", dead: "#97BC62" },
    ColorScheme { alive: "#00539C", dead: "#EEA47F" },
    ColorScheme { alive: "#101820", dead: "#FEE715" },
];
