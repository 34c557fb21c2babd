use crate::config::Tui;
use ratatui::style::Color;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Palette {
    pub highlight: Color,
    pub border: Color,
    pub help: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            highlight: Color::Cyan,
            border: Color::Gray,
            help: Color::Yellow,
        }
    }
}

impl Palette {
    /// Unknown color names keep the default for that slot.
    pub fn from_settings(tui: &Tui) -> Self {
        let d = Palette::default();
        Self {
            highlight: tui.highlight.as_deref().and_then(parse_color).unwrap_or(d.highlight),
            border: tui.border.as_deref().and_then(parse_color).unwrap_or(d.border),
            help: tui.help.as_deref().and_then(parse_color).unwrap_or(d.help),
        }
    }
}

/// Accepts color names, `#rrggbb`, and `rgb(r, g, b)`.
pub fn parse_color(s: &str) -> Option<Color> {
    let k = s.trim().to_ascii_lowercase();
    if let Some(rest) = k.strip_prefix("rgb(") {
        return parse_rgb_tuple(rest);
    }
    k.parse::<Color>().ok()
}

fn parse_rgb_tuple(rest: &str) -> Option<Color> {
    let t = rest.strip_suffix(')')?;
    let parts: Vec<_> = t.split(',').map(|p| p.trim()).collect();
    if parts.len() != 3 {
        return None;
    }
    let r = parts[0].parse::<u8>().ok()?;
    let g = parts[1].parse::<u8>().ok()?;
    let b = parts[2].parse::<u8>().ok()?;
    Some(Color::Rgb(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_hex_and_tuples() {
        assert_eq!(parse_color("Magenta"), Some(Color::Magenta));
        assert_eq!(parse_color("#102030"), Some(Color::Rgb(0x10, 0x20, 0x30)));
        assert_eq!(parse_color("rgb(1, 2, 3)"), Some(Color::Rgb(1, 2, 3)));
        assert_eq!(parse_color("rgb(1,2)"), None);
        assert_eq!(parse_color("not-a-color"), None);
    }

    #[test]
    fn unknown_names_keep_defaults() {
        let tui = Tui {
            highlight: Some("green".into()),
            border: Some("???".into()),
            ..Tui::default()
        };
        let p = Palette::from_settings(&tui);
        assert_eq!(p.highlight, Color::Green);
        assert_eq!(p.border, Palette::default().border);
    }
}
