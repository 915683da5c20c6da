//! CAML color components: space-separated unit floats in the text,
//! hex strings in the model.

use crate::codec::fmt_scalar;
use crate::foundation::core::Color;
use crate::foundation::error::{CaplayError, CaplayResult};

/// Parse `"r g b"` or `"r g b a"` (components in 0..1) into a color.
/// A fourth component bakes into the hex alpha nibbles.
pub fn parse_components(s: &str) -> CaplayResult<Color> {
    let parts: Vec<f64> = s
        .split_whitespace()
        .map(|p| {
            p.parse::<f64>()
                .map_err(|_| CaplayError::codec(format!("invalid color component '{p}'")))
        })
        .collect::<CaplayResult<_>>()?;

    let channel = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    match parts.as_slice() {
        [r, g, b] => Ok(Color::rgb(channel(*r), channel(*g), channel(*b))),
        [r, g, b, a] => Ok(Color::rgba(
            channel(*r),
            channel(*g),
            channel(*b),
            channel(*a),
        )),
        _ => Err(CaplayError::codec(format!(
            "expected 3 or 4 color components, got {}",
            parts.len()
        ))),
    }
}

/// Mirror of [`parse_components`]: the alpha component is only written
/// when the hex carries one.
pub fn write_components(color: Color) -> String {
    let unit = |c: u8| fmt_scalar(f64::from(c) / 255.0);
    match color.a {
        Some(a) => format!(
            "{} {} {} {}",
            unit(color.r),
            unit(color.g),
            unit(color.b),
            unit(a)
        ),
        None => format!("{} {} {}", unit(color.r), unit(color.g), unit(color.b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triplet_maps_to_hex() {
        assert_eq!(parse_components("1 0 0").unwrap().to_hex(), "#FF0000");
        assert_eq!(
            parse_components("0 0.5 1").unwrap().to_hex(),
            "#0080FF"
        );
    }

    #[test]
    fn quad_keeps_alpha_in_the_hex() {
        assert_eq!(
            parse_components("1 1 1 0.5").unwrap().to_hex(),
            "#FFFFFF80"
        );
    }

    #[test]
    fn components_round_trip() {
        for s in ["1 0 0", "0 0 0", "1 1 1 1"] {
            let color = parse_components(s).unwrap();
            let back = parse_components(&write_components(color)).unwrap();
            assert_eq!(color, back);
        }
    }

    #[test]
    fn out_of_range_and_garbage_are_handled() {
        assert_eq!(parse_components("2 -1 0").unwrap().to_hex(), "#FF0000");
        assert!(parse_components("1 0").is_err());
        assert!(parse_components("red green blue").is_err());
    }
}
