// src/core/color.rs

use crate::models::Color;
use thiserror::Error;

/// Errors raised while parsing a color.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ColorError {
    /// Not a name and not a well-formed hex value.
    #[error("'{0}' is not a known color name or a #rgb, #rrggbb or #rrggbbaa value.")]
    Unrecognized(String),
}

const NAMED_COLORS: &[(&str, Color)] = &[
    ("black", Color::rgb(0, 0, 0)),
    ("white", Color::rgb(255, 255, 255)),
    ("red", Color::rgb(255, 0, 0)),
    ("green", Color::rgb(0, 128, 0)),
    ("lime", Color::rgb(0, 255, 0)),
    ("blue", Color::rgb(0, 0, 255)),
    ("yellow", Color::rgb(255, 255, 0)),
    ("orange", Color::rgb(255, 165, 0)),
    ("purple", Color::rgb(128, 0, 128)),
    ("magenta", Color::rgb(255, 0, 255)),
    ("cyan", Color::rgb(0, 255, 255)),
    ("teal", Color::rgb(0, 128, 128)),
    ("navy", Color::rgb(0, 0, 128)),
    ("maroon", Color::rgb(128, 0, 0)),
    ("olive", Color::rgb(128, 128, 0)),
    ("gray", Color::rgb(128, 128, 128)),
    ("grey", Color::rgb(128, 128, 128)),
    ("silver", Color::rgb(192, 192, 192)),
    ("darkred", Color::rgb(139, 0, 0)),
    ("darkgreen", Color::rgb(0, 100, 0)),
    ("darkblue", Color::rgb(0, 0, 139)),
    ("darkorange", Color::rgb(255, 140, 0)),
    ("crimson", Color::rgb(220, 20, 60)),
    ("gold", Color::rgb(255, 215, 0)),
    ("transparent", Color { r: 0, g: 0, b: 0, a: 0 }),
];

/// Parses `#rgb`, `#rrggbb`, `#rrggbbaa` or a color name (case-insensitive).
pub fn parse_color(input: &str) -> Result<Color, ColorError> {
    let trimmed = input.trim();
    let unrecognized = || ColorError::Unrecognized(trimmed.to_string());

    let Some(hex_digits) = trimmed.strip_prefix('#') else {
        let lowered = trimmed.to_ascii_lowercase();
        return NAMED_COLORS
            .iter()
            .find(|(name, _)| *name == lowered)
            .map(|(_, color)| *color)
            .ok_or_else(unrecognized);
    };

    let expanded: String = match hex_digits.len() {
        3 => hex_digits.chars().flat_map(|c| [c, c]).chain("ff".chars()).collect(),
        6 => format!("{}ff", hex_digits),
        8 => hex_digits.to_string(),
        _ => return Err(unrecognized()),
    };

    let bytes = hex::decode(&expanded).map_err(|_| unrecognized())?;
    match bytes.as_slice() {
        [r, g, b, a] => Ok(Color {
            r: *r,
            g: *g,
            b: *b,
            a: *a,
        }),
        _ => Err(unrecognized()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_forms() {
        assert_eq!(parse_color("#224488"), Ok(Color::rgb(0x22, 0x44, 0x88)));
        assert_eq!(parse_color("#fa0"), Ok(Color::rgb(0xff, 0xaa, 0x00)));
        assert_eq!(
            parse_color("#224488cc"),
            Ok(Color {
                r: 0x22,
                g: 0x44,
                b: 0x88,
                a: 0xcc
            })
        );
    }

    #[test]
    fn test_parse_names_case_insensitively() {
        assert_eq!(parse_color("White"), Ok(Color::WHITE));
        assert_eq!(parse_color(" navy "), Ok(Color::rgb(0, 0, 128)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_color("#12345").is_err());
        assert!(parse_color("#zzzzzz").is_err());
        assert!(parse_color("chartreuse-ish").is_err());
    }

    #[test]
    fn test_display_round_trips_through_serde() {
        let color = parse_color("#10203040").unwrap();
        assert_eq!(color.to_string(), "#10203040");
        let json = serde_json::to_string(&color).unwrap();
        assert_eq!(json, "\"#10203040\"");
    }
}
