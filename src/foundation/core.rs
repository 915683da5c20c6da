use std::fmt;
use std::str::FromStr;

use crate::foundation::error::{CaplayError, CaplayResult};

pub use kurbo::{Point, Vec2};

/// Layer extent in document points.
#[derive(Clone, Copy, Debug, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Size {
    pub w: f64,
    pub h: f64,
}

impl Size {
    pub fn new(w: f64, h: f64) -> Self {
        Self { w, h }
    }

    pub fn midpoint(self) -> Vec2 {
        Vec2::new(self.w / 2.0, self.h / 2.0)
    }
}

/// Canvas/project dimensions supplied by the editor shell. Used for
/// default placement of synthesized image children.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub fn center(self) -> Vec2 {
        Vec2::new(f64::from(self.width) / 2.0, f64::from(self.height) / 2.0)
    }
}

/// sRGB color held in its canonical hex form (`#RRGGBB` or `#RRGGBBAA`).
///
/// The alpha nibbles are only present when the document carried an
/// explicit fourth channel; a separate per-layer opacity attribute is
/// modeled elsewhere and never baked in here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: Option<u8>,
}

impl Color {
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: None }
    }

    pub fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a: Some(a) }
    }

    pub fn to_hex(self) -> String {
        match self.a {
            Some(a) => format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, a),
            None => format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b),
        }
    }

    pub fn from_hex(s: &str) -> CaplayResult<Self> {
        let hex = s.trim().trim_start_matches('#');
        let channel = |i: usize| -> CaplayResult<u8> {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| CaplayError::model(format!("invalid hex color '{s}'")))
        };
        match hex.len() {
            6 => Ok(Self {
                r: channel(0)?,
                g: channel(2)?,
                b: channel(4)?,
                a: None,
            }),
            8 => Ok(Self {
                r: channel(0)?,
                g: channel(2)?,
                b: channel(4)?,
                a: Some(channel(6)?),
            }),
            _ => Err(CaplayError::model(format!("invalid hex color '{s}'"))),
        }
    }

    /// Per-channel lerp in 0..255 RGB space (not gamma-correct).
    pub fn lerp(a: Self, b: Self, t: f64) -> Self {
        Self {
            r: super::math::lerp_u8(a.r, b.r, t),
            g: super::math::lerp_u8(a.g, b.g, t),
            b: super::math::lerp_u8(a.b, b.b, t),
            a: match (a.a, b.a) {
                (Some(x), Some(y)) => Some(super::math::lerp_u8(x, y, t)),
                (x, y) => x.or(y),
            },
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Color {
    type Err = CaplayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl serde::Serialize for Color {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Color {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// One stop of a gradient ramp: color plus unit location.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GradientStop {
    pub color: Color,
    pub location: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trips_with_and_without_alpha() {
        let c = Color::rgb(0xFF, 0x00, 0x33);
        assert_eq!(c.to_hex(), "#FF0033");
        assert_eq!(Color::from_hex("#FF0033").unwrap(), c);

        let ca = Color::rgba(0x12, 0x34, 0x56, 0x78);
        assert_eq!(ca.to_hex(), "#12345678");
        assert_eq!(Color::from_hex("12345678").unwrap(), ca);
    }

    #[test]
    fn invalid_hex_is_rejected() {
        assert!(Color::from_hex("#12").is_err());
        assert!(Color::from_hex("#GGGGGG").is_err());
    }

    #[test]
    fn lerp_is_per_channel() {
        let a = Color::rgb(0, 0, 0);
        let b = Color::rgb(255, 100, 50);
        let mid = Color::lerp(a, b, 0.5);
        assert_eq!(mid.r, 128);
        assert_eq!(mid.g, 50);
        assert_eq!(mid.b, 25);
    }
}
