//! Hex color decoding.

use serde::{Deserialize, Serialize};

/// Normalized RGB color, channels in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };
    pub const BLACK: Rgb = Rgb {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Decode a `#RRGGBB` string (hash optional) into normalized channels.
    ///
    /// Empty input decodes to opaque white. Input is not validated: channel
    /// substrings are clamped to the input length, and anything that fails to
    /// parse as hex comes back as NaN rather than an error.
    pub fn from_hex(hex: &str) -> Rgb {
        if hex.is_empty() {
            return Rgb::WHITE;
        }
        // The white fallback is for the empty string only; a lone "#" strips
        // down to empty hex and parses as NaN channels.
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        Rgb {
            r: parse_channel(hex, 0),
            g: parse_channel(hex, 2),
            b: parse_channel(hex, 4),
        }
    }
}

fn parse_channel(hex: &str, start: usize) -> f32 {
    let start = start.min(hex.len());
    let end = (start + 2).min(hex.len());
    // `get` rejects slices that split a multi-byte character
    let Some(digits) = hex.get(start..end) else {
        return f32::NAN;
    };
    match u8::from_str_radix(digits, 16) {
        Ok(v) => v as f32 / 255.0,
        Err(_) => f32::NAN,
    }
}
