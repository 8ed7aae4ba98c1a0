//! RGBA color type used for particle fills and pixel masks.
//!
//! Colors are stored as straight (non-premultiplied) 8-bit channels, the same
//! layout a canvas pixel readback produces. Serializes as a hex string
//! (`"#rrggbb"` when opaque, `"#rrggbbaa"` otherwise).

use crate::error::EngineError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// 8-bit RGBA color with straight alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);
    pub const WHITE: Rgba = Rgba::new(255, 255, 255, 255);
    pub const BLACK: Rgba = Rgba::new(0, 0, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color from RGB channels.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parses `"#rrggbb"` or `"#rrggbbaa"` (leading `#` optional, case insensitive).
    ///
    /// Returns `EngineError::InvalidColor` for any other shape.
    pub fn from_hex(hex: &str) -> Result<Rgba, EngineError> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 && hex.len() != 8 {
            return Err(EngineError::InvalidColor(format!(
                "expected 6 or 8 hex digits, got {}",
                hex.len()
            )));
        }
        let channel = |range: std::ops::Range<usize>, name: &str| {
            hex.get(range)
                .ok_or_else(|| EngineError::InvalidColor(format!("non-ascii {name} component")))
                .and_then(|s| {
                    u8::from_str_radix(s, 16).map_err(|e| {
                        EngineError::InvalidColor(format!("invalid {name} component: {e}"))
                    })
                })
        };
        let r = channel(0..2, "red")?;
        let g = channel(2..4, "green")?;
        let b = channel(4..6, "blue")?;
        let a = if hex.len() == 8 {
            channel(6..8, "alpha")?
        } else {
            255
        };
        Ok(Rgba { r, g, b, a })
    }

    /// Hex string, omitting the alpha pair when fully opaque.
    pub fn to_hex(self) -> String {
        let Rgba { r, g, b, a } = self;
        if a == 255 {
            format!("#{r:02x}{g:02x}{b:02x}")
        } else {
            format!("#{r:02x}{g:02x}{b:02x}{a:02x}")
        }
    }

    /// Mean of the three color channels in [0, 255].
    ///
    /// This is the brightness measure used for palette banding; it is not a
    /// perceptual luminance.
    pub fn luminance(self) -> f64 {
        (self.r as f64 + self.g as f64 + self.b as f64) / 3.0
    }

    /// Returns the color with its alpha scaled by `factor` (clamped to [0, 1]).
    pub fn fade(self, factor: f64) -> Rgba {
        let factor = if factor.is_nan() {
            0.0
        } else {
            factor.clamp(0.0, 1.0)
        };
        Rgba {
            a: (self.a as f64 * factor).round() as u8,
            ..self
        }
    }

    /// Composites `self` over `dst` (source-over, straight alpha).
    pub fn over(self, dst: Rgba) -> Rgba {
        let sa = self.a as f64 / 255.0;
        let da = dst.a as f64 / 255.0;
        let out_a = sa + da * (1.0 - sa);
        if out_a <= 0.0 {
            return Rgba::TRANSPARENT;
        }
        let mix = |s: u8, d: u8| {
            let v = (s as f64 * sa + d as f64 * da * (1.0 - sa)) / out_a;
            v.round().clamp(0.0, 255.0) as u8
        };
        Rgba {
            r: mix(self.r, dst.r),
            g: mix(self.g, dst.g),
            b: mix(self.b, dst.b),
            a: (out_a * 255.0).round() as u8,
        }
    }
}

impl Serialize for Rgba {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Rgba {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Rgba::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_hex_parses_opaque_color() {
        let c = Rgba::from_hex("#daa520").unwrap();
        assert_eq!(c, Rgba::rgb(218, 165, 32));
    }

    #[test]
    fn from_hex_parses_alpha_and_ignores_case() {
        let c = Rgba::from_hex("EF3333D9").unwrap();
        assert_eq!(c, Rgba::new(239, 51, 51, 217));
    }

    #[test]
    fn from_hex_rejects_wrong_length() {
        assert!(matches!(
            Rgba::from_hex("#fff"),
            Err(EngineError::InvalidColor(_))
        ));
    }

    #[test]
    fn from_hex_rejects_non_hex_digits() {
        let err = Rgba::from_hex("#gg0000").unwrap_err();
        assert!(err.to_string().contains("red"), "got: {err}");
    }

    #[test]
    fn from_hex_rejects_multibyte_input_without_panicking() {
        assert!(Rgba::from_hex("ééé").is_err());
    }

    #[test]
    fn to_hex_omits_alpha_when_opaque() {
        assert_eq!(Rgba::rgb(31, 36, 45).to_hex(), "#1f242d");
        assert_eq!(Rgba::new(31, 36, 45, 128).to_hex(), "#1f242d80");
    }

    #[test]
    fn luminance_is_channel_mean() {
        assert_eq!(Rgba::rgb(30, 60, 90).luminance(), 60.0);
        assert_eq!(Rgba::WHITE.luminance(), 255.0);
    }

    #[test]
    fn fade_scales_alpha_and_clamps() {
        assert_eq!(Rgba::WHITE.fade(0.5).a, 128);
        assert_eq!(Rgba::WHITE.fade(2.0).a, 255);
        assert_eq!(Rgba::WHITE.fade(-1.0).a, 0);
        assert_eq!(Rgba::WHITE.fade(f64::NAN).a, 0);
    }

    #[test]
    fn over_opaque_source_replaces_destination() {
        let red = Rgba::rgb(255, 0, 0);
        assert_eq!(red.over(Rgba::rgb(0, 0, 255)), red);
    }

    #[test]
    fn over_transparent_source_keeps_destination() {
        let blue = Rgba::rgb(0, 0, 255);
        assert_eq!(Rgba::TRANSPARENT.over(blue), blue);
    }

    #[test]
    fn over_half_alpha_mixes_channels() {
        let out = Rgba::new(255, 255, 255, 128).over(Rgba::BLACK);
        assert_eq!(out.a, 255);
        assert!((126..=130).contains(&out.r), "r = {}", out.r);
    }

    #[test]
    fn serde_uses_hex_strings() {
        let c = Rgba::new(1, 2, 3, 4);
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, "\"#01020304\"");
        let back: Rgba = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn hex_round_trip_is_lossless(r: u8, g: u8, b: u8, a: u8) {
                let c = Rgba::new(r, g, b, a);
                prop_assert_eq!(Rgba::from_hex(&c.to_hex()).unwrap(), c);
            }

            #[test]
            fn over_never_reduces_destination_alpha(r: u8, a: u8, da: u8) {
                let out = Rgba::new(r, r, r, a).over(Rgba::new(0, 0, 0, da));
                prop_assert!(out.a >= da.max(a).saturating_sub(1));
            }
        }
    }
}
