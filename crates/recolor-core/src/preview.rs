//! Display colors for swatches and gradients.

use serde::Serialize;

use crate::group::{BaseColor, ColorGroup, TINT_MAX};
use crate::timeline::Timeline;

/// An 8-bit sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Rgb8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb8 {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `#rrggbb`
    pub fn hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Components in `[0, 1]`, for base colors picked by the user.
    pub fn to_unit(self) -> [f32; 3] {
        [self.r, self.g, self.b].map(|c| f32::from(c) / 255.0)
    }

    /// Components in `[0, 10]`, for tints picked by the user.
    pub fn to_tint(self) -> [f32; 3] {
        self.to_unit().map(|c| c * TINT_MAX)
    }
}

impl std::fmt::Display for Rgb8 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.hex())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("'{0}' is not a #rrggbb color")]
pub struct ParseColorError(String);

impl std::str::FromStr for Rgb8 {
    type Err = ParseColorError;

    /// Parses `#rrggbb`; the `#` is optional.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let digits = text.trim().strip_prefix('#').unwrap_or(text.trim());
        let invalid = || ParseColorError(text.to_owned());
        if digits.len() != 6 || !digits.is_ascii() {
            return Err(invalid());
        }
        let byte = |at: usize| {
            u8::from_str_radix(&digits[at..at + 2], 16).map_err(|_| invalid())
        };
        Ok(Self::new(byte(0)?, byte(2)?, byte(4)?))
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_byte(value: f32) -> u8 {
    // Truncates; NaN maps to 0.
    (value.clamp(0.0, 1.0) * 255.0) as u8
}

/// Swatch of a `[0, 1]` color. Out-of-range components are clamped.
pub fn color_swatch(rgb: [f32; 3]) -> Rgb8 {
    let [r, g, b] = rgb.map(to_byte);
    Rgb8 { r, g, b }
}

/// Swatch of a `[0, 10]` tint. Tints brighter than white are scaled down by
/// their largest component first, keeping the hue.
pub fn tint_swatch(rgb: [f32; 3]) -> Rgb8 {
    let max = rgb.iter().copied().fold(0.0_f32, f32::max);
    if max > 1.0 {
        color_swatch(rgb.map(|c| c / max))
    } else {
        color_swatch(rgb)
    }
}

/// One stop of a base color gradient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GradientStop {
    pub time: f32,
    pub color: Rgb8,
}

/// Gradient of a group's base color over its keyframes.
///
/// Color sequences give one stop per tick. Scalar channels give one stop per
/// distinct base tick time, or a single stop at `0` when all three are
/// constant.
pub fn gradient_stops(group: &ColorGroup) -> Vec<GradientStop> {
    match group.base() {
        BaseColor::Sequence(sequence) => sequence
            .sequence()
            .ticks
            .iter()
            .map(|tick| GradientStop {
                time: tick.time,
                color: color_swatch(tick.rgb),
            })
            .collect(),
        BaseColor::Channels(channels) => {
            let times = Timeline::merge(channels.iter().flat_map(|c| c.channel().tick_times()));
            times
                .times()
                .iter()
                .map(|&time| GradientStop {
                    time,
                    color: color_swatch(channels.each_ref().map(|c| c.evaluate(time).value)),
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::GroupId;
    use crate::session::Session;

    const FIXTURE: &str = include_str!("../fixtures/sample_ffx.xml");

    #[test]
    fn test_color_swatch_truncates_and_clamps() {
        assert_eq!(color_swatch([1.0, 0.5, 0.0]), Rgb8::new(255, 127, 0));
        assert_eq!(color_swatch([2.0, -1.0, f32::NAN]), Rgb8::new(255, 0, 0));
    }

    #[test]
    fn test_tint_swatch_normalizes_bright_tints() {
        assert_eq!(tint_swatch([2.5, 1.0, 0.5]), Rgb8::new(255, 102, 51));
        assert_eq!(tint_swatch([0.5, 0.5, 0.5]), Rgb8::new(127, 127, 127));
    }

    #[test]
    fn test_hex_and_conversions() {
        let color = Rgb8::new(255, 0, 51);
        assert_eq!(color.hex(), "#ff0033");
        assert_eq!(color.to_string(), "#ff0033");
        assert_eq!(color.to_unit(), [1.0, 0.0, 0.2]);
        let tint = color.to_tint();
        assert!((tint[0] - 10.0).abs() < 0.001);
        assert!((tint[2] - 2.0).abs() < 0.001);
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!("#ff0033".parse::<Rgb8>().unwrap(), Rgb8::new(255, 0, 51));
        assert_eq!("00FF80".parse::<Rgb8>().unwrap(), Rgb8::new(0, 255, 128));
        for bad in ["#ff00", "#gg0000", "#ff00330", "#ÿÿÿ", ""] {
            assert!(bad.parse::<Rgb8>().is_err(), "{bad}");
        }
    }

    #[test]
    fn test_gradient_stops() {
        let session = Session::load(FIXTURE.as_bytes()).unwrap();

        let stops = gradient_stops(session.group(GroupId(2)).unwrap());
        assert_eq!(
            stops,
            vec![
                GradientStop {
                    time: 0.25,
                    color: Rgb8::new(255, 0, 0)
                },
                GradientStop {
                    time: 0.75,
                    color: Rgb8::new(0, 0, 255)
                },
            ]
        );

        let stops = gradient_stops(session.group(GroupId(1)).unwrap());
        let times: Vec<_> = stops.iter().map(|s| s.time).collect();
        assert_eq!(times, vec![0.0, 1.0, 2.0]);
        assert_eq!(stops[0].color, Rgb8::new(255, 0, 191));

        let stops = gradient_stops(session.group(GroupId(3)).unwrap());
        assert_eq!(stops.len(), 1);
        assert_eq!(stops[0].time, 0.0);
        assert_eq!(stops[0].color, Rgb8::new(25, 51, 76));
    }
}
