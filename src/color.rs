//! Styles and the level palette shared by the color formatters.

use crate::level::Level;
use yansi::{Color, Paint, Style};

pub const MESSAGE: Style = Style::new().fg(Color::Cyan);
pub const KEY: Style = Style::new().fg(Color::Blue);
pub const VALUE: Style = Style::new().fg(Color::Cyan);
/// Muted style for structured values and the source location.
pub const MUTED: Style = Style::new().fg(Color::BrightBlack);

/// Style for the level name: bold, colored by severity.
///
/// Levels between the named ones fall back to gray below `INFO` and red
/// otherwise.
pub fn level_style(level: Level) -> Style {
    let color = match level {
        Level::DEBUG => Color::BrightBlack,
        Level::INFO => Color::Green,
        Level::WARN => Color::Yellow,
        Level::ERROR => Color::Red,
        other if other < Level::INFO => Color::BrightBlack,
        _ => Color::Red,
    };
    Style::new().fg(color).bold()
}

/// `text` wrapped in the escape codes of `style`.
pub fn paint(style: Style, text: &str) -> String {
    text.paint(style).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_levels_have_fixed_colors() {
        assert_eq!(level_style(Level::DEBUG), Style::new().fg(Color::BrightBlack).bold());
        assert_eq!(level_style(Level::INFO), Style::new().fg(Color::Green).bold());
        assert_eq!(level_style(Level::WARN), Style::new().fg(Color::Yellow).bold());
        assert_eq!(level_style(Level::ERROR), Style::new().fg(Color::Red).bold());
    }

    #[test]
    fn custom_levels_fall_back_monotonically() {
        assert_eq!(level_style(Level(-8)), level_style(Level::DEBUG));
        assert_eq!(level_style(Level(-1)), level_style(Level::DEBUG));
        assert_eq!(level_style(Level(2)), level_style(Level::ERROR));
        assert_eq!(level_style(Level(12)), level_style(Level::ERROR));
    }

    #[test]
    fn paint_wraps_and_resets() {
        let out = paint(MESSAGE, "boot");
        assert!(out.starts_with("\x1b["));
        assert!(out.contains("boot"));
        assert!(out.ends_with("\x1b[0m"));
        let stripped = strip_ansi_escapes::strip(out.as_bytes());
        assert_eq!(stripped, b"boot");
    }
}
