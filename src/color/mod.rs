use crate::environment::Shell;
use crate::utils::width::visible_width;
use regex::Regex;
use std::collections::HashMap;
use std::env;
use std::sync::OnceLock;

/// A color as written in the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    /// One of the 16 standard colors (0-7 normal, 8-15 bright).
    Ansi(u8),
    Rgb(u8, u8, u8),
}

const NAMED: [&str; 8] = ["black", "red", "green", "yellow", "blue", "magenta", "cyan", "white"];

pub const TRANSPARENT: &str = "transparent";

/// Turns text plus a style into shell-ready escape sequences.
#[derive(Debug, Clone)]
pub struct Writer {
    shell: Shell,
    plain: bool,
    truecolor: bool,
    palette: HashMap<String, String>,
}

impl Writer {
    pub fn new(shell: Shell, plain: bool, palette: HashMap<String, String>) -> Self {
        Self {
            shell,
            plain: plain || !should_use_colors(),
            truecolor: supports_rgb_colors(),
            palette,
        }
    }

    /// A writer that never emits escapes.
    pub fn plain(shell: Shell) -> Self {
        Self {
            shell,
            plain: true,
            truecolor: true,
            palette: HashMap::new(),
        }
    }

    /// A true-color writer that ignores `NO_COLOR` and `TERM`.
    pub fn colored(shell: Shell) -> Self {
        Self {
            shell,
            plain: false,
            truecolor: true,
            palette: HashMap::new(),
        }
    }

    pub fn with_truecolor(mut self, truecolor: bool) -> Self {
        self.truecolor = truecolor;
        self
    }

    pub fn is_plain(&self) -> bool {
        self.plain
    }

    pub fn shell(&self) -> Shell {
        self.shell
    }

    pub fn resolve(&self, color: &str) -> Option<Color> {
        let color = color.trim();
        if let Some(name) = color.strip_prefix("p:") {
            let mapped = self.palette.get(name)?;
            // Palette entries may not point at other palette entries.
            return if mapped.starts_with("p:") { None } else { parse_color(mapped) };
        }
        parse_color(color)
    }

    /// Color `text` with the given foreground and background.
    pub fn write(&self, foreground: &str, background: &str, text: &str) -> String {
        let text = self.escape_text(text);
        if self.plain || text.is_empty() {
            return text;
        }

        let mut codes = Vec::new();
        if let Some(fg) = self.resolve(foreground) {
            codes.push(self.sgr(fg, false));
        }
        if let Some(bg) = self.resolve(background) {
            codes.push(self.sgr(bg, true));
        }
        if codes.is_empty() {
            return text;
        }

        format!(
            "{}{}{}",
            self.wrap(&format!("\x1b[{}m", codes.join(";"))),
            text,
            self.wrap("\x1b[0m")
        )
    }

    /// Visible width of text produced by this writer. Only the wrappers
    /// `wrap` emits are removed, so literal `%{` or `\[` in text still count.
    pub fn measure(&self, text: &str) -> usize {
        match self.shell {
            Shell::Zsh => visible_width(&zsh_wrapped().replace_all(text, "").replace("%%", "%")),
            Shell::Bash => visible_width(&bash_wrapped().replace_all(text, "")),
            _ => visible_width(text),
        }
    }

    fn escape_text(&self, text: &str) -> String {
        match self.shell {
            Shell::Zsh => text.replace('%', "%%"),
            _ => text.to_string(),
        }
    }

    /// Mark escapes as zero-width for line editors that need it.
    fn wrap(&self, sequence: &str) -> String {
        match self.shell {
            Shell::Zsh => format!("%{{{}%}}", sequence),
            Shell::Bash => format!("\\[{}\\]", sequence),
            _ => sequence.to_string(),
        }
    }

    fn sgr(&self, color: Color, background: bool) -> String {
        match color {
            Color::Ansi(index) => {
                let base = match (background, index >= 8) {
                    (false, false) => 30,
                    (false, true) => 90,
                    (true, false) => 40,
                    (true, true) => 100,
                };
                (base + u16::from(index % 8)).to_string()
            }
            Color::Rgb(r, g, b) => {
                let layer = if background { 48 } else { 38 };
                if self.truecolor {
                    format!("{};2;{};{};{}", layer, r, g, b)
                } else {
                    format!("{};5;{}", layer, rgb_to_8bit((r, g, b)))
                }
            }
        }
    }
}

fn zsh_wrapped() -> &'static Regex {
    static WRAPPED: OnceLock<Regex> = OnceLock::new();
    WRAPPED.get_or_init(|| Regex::new(r"%\{\x1b[^%]*%\}").expect("zsh wrapper pattern is valid"))
}

fn bash_wrapped() -> &'static Regex {
    static WRAPPED: OnceLock<Regex> = OnceLock::new();
    WRAPPED.get_or_init(|| Regex::new(r"\\\[\x1b[^\\]*\\\]").expect("bash wrapper pattern is valid"))
}

pub fn parse_color(color: &str) -> Option<Color> {
    if color.is_empty() || color == TRANSPARENT {
        return None;
    }

    if let Some(hex) = color.strip_prefix('#') {
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        return Some(Color::Rgb(r, g, b));
    }

    let lower = color.to_ascii_lowercase();
    let (bright, name) = match lower.strip_prefix("light") {
        Some(rest) => (true, rest.trim_start_matches(|c| c == '-' || c == '_')),
        None => (false, lower.as_str()),
    };
    NAMED
        .iter()
        .position(|named| *named == name)
        .map(|index| Color::Ansi(index as u8 + if bright { 8 } else { 0 }))
}

fn should_use_colors() -> bool {
    env::var_os("NO_COLOR").is_none() && env::var("TERM").map_or(true, |term| term != "dumb")
}

fn supports_rgb_colors() -> bool {
    env::var("COLORTERM").map_or(false, |ct| ct.contains("truecolor") || ct.contains("24bit"))
        || env::var("TERM").map_or(false, |term| {
            term.contains("direct") || term == "xterm-kitty" || term == "alacritty" || term == "wezterm"
        })
}

fn rgb_to_8bit((r, g, b): (u8, u8, u8)) -> u8 {
    // 216 color cube + grayscale ramp
    if r == g && g == b {
        if r < 8 {
            16
        } else if r > 248 {
            231
        } else {
            232 + ((r - 8) / 10).min(23)
        }
    } else {
        let scale = |c: u8| (u16::from(c) * 5 / 255) as u8;
        16 + 36 * scale(r) + 6 * scale(g) + scale(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_color_forms() {
        assert_eq!(parse_color("#ff8000"), Some(Color::Rgb(255, 128, 0)));
        assert_eq!(parse_color("red"), Some(Color::Ansi(1)));
        assert_eq!(parse_color("lightBlue"), Some(Color::Ansi(12)));
        assert_eq!(parse_color("transparent"), None);
        assert_eq!(parse_color("#12"), None);
    }

    #[test]
    fn test_rgb_downgrade() {
        assert_eq!(rgb_to_8bit((0, 0, 0)), 16);
        assert_eq!(rgb_to_8bit((255, 0, 0)), 196);
    }

    #[test]
    fn test_zsh_escapes_are_zero_width() {
        let writer = Writer {
            shell: Shell::Zsh,
            plain: false,
            truecolor: true,
            palette: HashMap::new(),
        };
        let text = writer.write("#ffffff", "#000000", "100%");
        assert!(text.starts_with("%{\x1b["));
        assert!(text.contains("100%%"));
        assert_eq!(writer.measure(&text), 4);
    }

    #[test]
    fn test_literal_wrapper_characters_are_measured() {
        let zsh = Writer::colored(Shell::Zsh);
        let text = zsh.write("#ffffff", "#000000", "a%{b");
        assert!(text.contains("a%%{b"));
        assert_eq!(zsh.measure(&text), 4);

        let bash = Writer::colored(Shell::Bash);
        let text = bash.write("#ffffff", "", "x\\[y\\]");
        assert!(text.starts_with("\\[\x1b["));
        assert_eq!(bash.measure(&text), 6);
    }

    #[test]
    fn test_palette_lookup() {
        let palette = HashMap::from([("accent".to_string(), "#010203".to_string())]);
        let writer = Writer::plain(Shell::Generic);
        let writer = Writer { palette, ..writer };
        assert_eq!(writer.resolve("p:accent"), Some(Color::Rgb(1, 2, 3)));
        assert_eq!(writer.resolve("p:missing"), None);
    }
}
