//! Color value objects.
//!
//! Colors decompose into a `(keyword, values)` pair and render as the bare
//! space-joined token sequence the engine's option syntax expects, e.g.
//! `rgb 0.2 0.4 0.6`. The option encoder wraps them in braces when they
//! appear as an option value.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::handle::{HandleRef, Handleable, RawHandle};

/// A device or named color in one of the engine's color spaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    /// Grayscale, 0.0 (black) to 1.0 (white).
    Gray(f64),
    /// RGB with unit-range channels. Use [`Color::rgb`] for 0-255 input.
    Rgb { red: f64, green: f64, blue: f64 },
    /// CMYK with unit-range channels.
    Cmyk {
        cyan: f64,
        magenta: f64,
        yellow: f64,
        black: f64,
    },
    /// CIE L*a*b*: lightness 0-100, a/b roughly -128 to 127.
    Lab { lightness: f64, a: f64, b: f64 },
    /// A named spot color already registered with the engine.
    Spot { handle: RawHandle, tint: f64 },
    /// A CSS color name or hex value passed through verbatim.
    Web(String),
}

impl Color {
    /// RGB from the familiar 0-255 channel values.
    pub fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Color::Rgb {
            red: f64::from(red) / 255.0,
            green: f64::from(green) / 255.0,
            blue: f64::from(blue) / 255.0,
        }
    }

    /// CMYK from unit-range channels.
    pub fn cmyk(cyan: f64, magenta: f64, yellow: f64, black: f64) -> Self {
        Color::Cmyk {
            cyan,
            magenta,
            yellow,
            black,
        }
    }

    /// Grayscale from a unit-range value.
    pub fn gray(value: f64) -> Self {
        Color::Gray(value)
    }

    /// CIE L*a*b* color.
    pub fn lab(lightness: f64, a: f64, b: f64) -> Self {
        Color::Lab { lightness, a, b }
    }

    /// A CSS color name or hex value passed through verbatim.
    pub fn web(value: impl Into<String>) -> Self {
        Color::Web(value.into())
    }

    /// Parse a `#rgb` or `#rrggbb` hex string into an RGB color.
    pub fn from_hex(hex: &str) -> Result<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        let channel = |s: &str| u8::from_str_radix(s, 16);
        let parsed = match digits.len() {
            3 => {
                let mut it = digits.chars().map(|c| {
                    let s: String = [c, c].iter().collect();
                    channel(&s)
                });
                (it.next(), it.next(), it.next())
            }
            // get() rather than slicing: a byte length of 6 does not
            // guarantee char boundaries at 2 and 4.
            6 => (
                digits.get(0..2).map(channel),
                digits.get(2..4).map(channel),
                digits.get(4..6).map(channel),
            ),
            _ => return Err(Error::InvalidColor(hex.to_string())),
        };
        match parsed {
            (Some(Ok(r)), Some(Ok(g)), Some(Ok(b))) => Ok(Color::rgb(r, g, b)),
            _ => Err(Error::InvalidColor(hex.to_string())),
        }
    }

    /// The engine keyword introducing the value sequence, if any.
    pub fn keyword(&self) -> Option<&'static str> {
        match self {
            Color::Gray(_) => Some("gray"),
            Color::Rgb { .. } => Some("rgb"),
            Color::Cmyk { .. } => Some("cmyk"),
            Color::Lab { .. } => Some("lab"),
            Color::Spot { .. } => Some("spot"),
            Color::Web(_) => None,
        }
    }

    /// The bare numeric or textual tokens following the keyword.
    pub fn values(&self) -> Vec<String> {
        match self {
            Color::Gray(value) => vec![value.to_string()],
            Color::Rgb { red, green, blue } => {
                vec![red.to_string(), green.to_string(), blue.to_string()]
            }
            Color::Cmyk {
                cyan,
                magenta,
                yellow,
                black,
            } => vec![
                cyan.to_string(),
                magenta.to_string(),
                yellow.to_string(),
                black.to_string(),
            ],
            Color::Lab { lightness, a, b } => {
                vec![lightness.to_string(), a.to_string(), b.to_string()]
            }
            Color::Spot { handle, tint } => vec![handle.to_string(), tint.to_string()],
            Color::Web(value) => vec![value.clone()],
        }
    }

    /// Render the bare `keyword v1 v2 ...` form.
    pub fn encode(&self) -> String {
        let values = self.values().join(" ");
        match self.keyword() {
            Some(keyword) => format!("{keyword} {values}"),
            None => values,
        }
    }

    /// Decompose into the `(colorspace, components)` pair the engine's
    /// direct color-setting primitive takes. Web colors have no device
    /// components and are only valid inside option lists.
    pub fn components(&self) -> Result<(&'static str, [f64; 4])> {
        match *self {
            Color::Gray(value) => Ok(("gray", [value, 0.0, 0.0, 0.0])),
            Color::Rgb { red, green, blue } => Ok(("rgb", [red, green, blue, 0.0])),
            Color::Cmyk {
                cyan,
                magenta,
                yellow,
                black,
            } => Ok(("cmyk", [cyan, magenta, yellow, black])),
            Color::Lab { lightness, a, b } => Ok(("lab", [lightness, a, b, 0.0])),
            Color::Spot { handle, tint } => Ok(("spot", [f64::from(handle), tint, 0.0, 0.0])),
            Color::Web(ref value) => Err(Error::InvalidColor(format!(
                "web color '{value}' cannot be used outside an option list"
            ))),
        }
    }
}

/// A named spot color registered with the engine.
///
/// Obtained from the builder; produces [`Color::Spot`] values at a chosen
/// tint. The engine owns the underlying handle until the document ends.
#[derive(Debug, Clone)]
pub struct SpotColor {
    name: String,
    handle: HandleRef,
}

impl SpotColor {
    pub(crate) fn new(name: impl Into<String>, handle: HandleRef) -> Self {
        Self {
            name: name.into(),
            handle,
        }
    }

    /// The ink name this spot color was registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// This spot color at the given tint, 0.0 (none) to 1.0 (full).
    pub fn tint(&self, tint: f64) -> Color {
        Color::Spot {
            handle: self.handle.get(),
            tint,
        }
    }
}

impl Handleable for SpotColor {
    fn handle_ref(&self) -> &HandleRef {
        &self.handle
    }
}

/// How a color is applied by the painting operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaintMode {
    /// Color for area fills.
    Fill,
    /// Color for path strokes.
    Stroke,
    /// Both at once.
    FillStroke,
}

impl PaintMode {
    /// The engine keyword for this mode.
    pub fn as_str(self) -> &'static str {
        match self {
            PaintMode::Fill => "fill",
            PaintMode::Stroke => "stroke",
            PaintMode::FillStroke => "fillstroke",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_scales_channels() {
        let color = Color::rgb(51, 102, 153);
        assert_eq!(color.encode(), "rgb 0.2 0.4 0.6");
    }

    #[test]
    fn test_other_spaces_pass_through() {
        assert_eq!(Color::gray(0.5).encode(), "gray 0.5");
        assert_eq!(Color::cmyk(0.0, 0.25, 1.0, 0.1).encode(), "cmyk 0 0.25 1 0.1");
        assert_eq!(Color::lab(54.0, 81.0, 70.0).encode(), "lab 54 81 70");
        assert_eq!(
            Color::Spot {
                handle: 5,
                tint: 0.8
            }
            .encode(),
            "spot 5 0.8"
        );
    }

    #[test]
    fn test_web_color_is_verbatim() {
        let color = Color::web("cornflowerblue");
        assert_eq!(color.keyword(), None);
        assert_eq!(color.encode(), "cornflowerblue");
    }

    #[test]
    fn test_components() {
        let (space, values) = Color::rgb(255, 0, 0).components().unwrap();
        assert_eq!(space, "rgb");
        assert_eq!(values, [1.0, 0.0, 0.0, 0.0]);

        let (space, values) = Color::Spot {
            handle: 3,
            tint: 0.5,
        }
        .components()
        .unwrap();
        assert_eq!(space, "spot");
        assert_eq!(values, [3.0, 0.5, 0.0, 0.0]);

        assert!(Color::web("red").components().is_err());
    }

    #[test]
    fn test_from_hex() {
        assert_eq!(Color::from_hex("#336699").unwrap(), Color::rgb(51, 102, 153));
        assert_eq!(Color::from_hex("336699").unwrap(), Color::rgb(51, 102, 153));
        assert_eq!(Color::from_hex("#fff").unwrap(), Color::rgb(255, 255, 255));
        assert!(Color::from_hex("#12345").is_err());
        assert!(Color::from_hex("#zzzzzz").is_err());
        // Multibyte characters must come back as errors, not slice panics,
        // even when the byte length looks right.
        assert!(matches!(
            Color::from_hex("aßb99"),
            Err(Error::InvalidColor(_))
        ));
        assert!(Color::from_hex("#é9").is_err());
    }
}
