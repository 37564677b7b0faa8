//! ANSI escape sequence parsing and HTML conversion.
//!
//! Only SGR (`ESC [ ... m`) sequences affect output; every other escape
//! sequence (cursor movement, erase, OSC titles/links) is dropped, as are
//! control characters other than tab and newline. Malformed or truncated
//! sequences are skipped rather than reported.

use std::fmt::Write as _;

/// Solarized palette for the 16 base colours (normal 0-7, bright 8-15).
const PALETTE_16: [&str; 16] = [
    "#262626", "#d70000", "#5f8700", "#af8700", "#0087ff", "#af005f", "#00afaf", "#e4e4e4",
    "#1c1c1c", "#d75f00", "#585858", "#626262", "#808080", "#5f5faf", "#8a8a8a", "#ffffd7",
];

/// Foreground used when reversing a default-coloured span on a dark page.
const DEFAULT_FG: &str = "#e4e4e4";
const DEFAULT_BG: &str = "#262626";

const ESC: char = '\u{1b}';
const BEL: char = '\u{07}';

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Color {
    #[default]
    Default,
    /// 256-colour palette index; 0-15 map onto [`PALETTE_16`].
    Indexed(u8),
    Rgb(u8, u8, u8),
}

impl Color {
    fn css(self) -> Option<String> {
        match self {
            Self::Default => None,
            Self::Indexed(i) => Some(indexed_css(i)),
            Self::Rgb(r, g, b) => Some(format!("#{r:02x}{g:02x}{b:02x}")),
        }
    }
}

fn indexed_css(index: u8) -> String {
    match index {
        0..=15 => PALETTE_16[index as usize].to_string(),
        16..=231 => {
            const LEVELS: [u8; 6] = [0, 95, 135, 175, 215, 255];
            let i = index - 16;
            let (r, g, b) = (i / 36, (i / 6) % 6, i % 6);
            format!(
                "#{:02x}{:02x}{:02x}",
                LEVELS[r as usize], LEVELS[g as usize], LEVELS[b as usize]
            )
        }
        232..=255 => {
            let v = 8 + 10 * (index - 232);
            format!("#{v:02x}{v:02x}{v:02x}")
        }
    }
}

/// Text attributes accumulated from SGR sequences.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Style {
    pub bold: bool,
    pub dim: bool,
    pub italic: bool,
    pub underline: bool,
    pub blink: bool,
    pub reverse: bool,
    pub strike: bool,
    pub fg: Color,
    pub bg: Color,
}

impl Style {
    pub fn bold() -> Self {
        Self {
            bold: true,
            ..Self::default()
        }
    }

    pub fn italic() -> Self {
        Self {
            italic: true,
            ..Self::default()
        }
    }

    pub fn dim() -> Self {
        Self {
            dim: true,
            ..Self::default()
        }
    }

    pub fn fg(color: Color) -> Self {
        Self {
            fg: color,
            ..Self::default()
        }
    }

    pub fn is_plain(&self) -> bool {
        *self == Self::default()
    }

    /// Overlay the attributes set in `other` on top of `self`.
    pub fn combine(self, other: Style) -> Style {
        Style {
            bold: self.bold || other.bold,
            dim: self.dim || other.dim,
            italic: self.italic || other.italic,
            underline: self.underline || other.underline,
            blink: self.blink || other.blink,
            reverse: self.reverse || other.reverse,
            strike: self.strike || other.strike,
            fg: if other.fg == Color::Default { self.fg } else { other.fg },
            bg: if other.bg == Color::Default { self.bg } else { other.bg },
        }
    }

    /// Inline CSS declarations for this style (empty when plain).
    pub fn css(&self) -> String {
        let mut decls: Vec<String> = Vec::new();
        if self.bold {
            decls.push("font-weight: bold".into());
        }
        if self.dim {
            decls.push("opacity: 0.7".into());
        }
        if self.italic {
            decls.push("font-style: italic".into());
        }

        let mut decorations = Vec::new();
        if self.underline {
            decorations.push("underline");
        }
        if self.strike {
            decorations.push("line-through");
        }
        if self.blink {
            decorations.push("blink");
        }
        if !decorations.is_empty() {
            decls.push(format!("text-decoration: {}", decorations.join(" ")));
        }

        let (fg, bg) = if self.reverse {
            (
                Some(self.bg.css().unwrap_or_else(|| DEFAULT_BG.into())),
                Some(self.fg.css().unwrap_or_else(|| DEFAULT_FG.into())),
            )
        } else {
            (self.fg.css(), self.bg.css())
        };
        if let Some(fg) = fg {
            decls.push(format!("color: {fg}"));
        }
        if let Some(bg) = bg {
            decls.push(format!("background-color: {bg}"));
        }

        decls.join("; ")
    }

    /// Apply one SGR parameter list (already split on `;`).
    pub fn apply_sgr(&mut self, params: &[u16]) {
        if params.is_empty() {
            *self = Style::default();
            return;
        }

        let mut i = 0;
        while i < params.len() {
            match params[i] {
                0 => *self = Style::default(),
                1 => self.bold = true,
                2 => self.dim = true,
                3 => self.italic = true,
                4 => self.underline = true,
                5 | 6 => self.blink = true,
                7 => self.reverse = true,
                9 => self.strike = true,
                21 | 22 => {
                    self.bold = false;
                    self.dim = false;
                }
                23 => self.italic = false,
                24 => self.underline = false,
                25 => self.blink = false,
                27 => self.reverse = false,
                29 => self.strike = false,
                code @ 30..=37 => self.fg = Color::Indexed((code - 30) as u8),
                39 => self.fg = Color::Default,
                code @ 40..=47 => self.bg = Color::Indexed((code - 40) as u8),
                49 => self.bg = Color::Default,
                code @ 90..=97 => self.fg = Color::Indexed((code - 90 + 8) as u8),
                code @ 100..=107 => self.bg = Color::Indexed((code - 100 + 8) as u8),
                38 | 48 => {
                    let (color, consumed) = extended_color(&params[i + 1..]);
                    if let Some(color) = color {
                        if params[i] == 38 {
                            self.fg = color;
                        } else {
                            self.bg = color;
                        }
                    }
                    i += consumed;
                }
                _ => {}
            }
            i += 1;
        }
    }
}

/// Parse the tail of a `38;...` / `48;...` sequence. Returns the colour (if
/// well-formed) and how many parameters were consumed.
fn extended_color(rest: &[u16]) -> (Option<Color>, usize) {
    match rest {
        [5, index, ..] => (u8::try_from(*index).ok().map(Color::Indexed), 2),
        [2, r, g, b, ..] => {
            let rgb = (u8::try_from(*r), u8::try_from(*g), u8::try_from(*b));
            match rgb {
                (Ok(r), Ok(g), Ok(b)) => (Some(Color::Rgb(r, g, b)), 4),
                _ => (None, 4),
            }
        }
        [5] | [2, ..] => (None, rest.len()),
        _ => (None, 0),
    }
}

/// A run of text sharing one style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub style: Style,
}

impl Span {
    pub fn new(text: impl Into<String>, style: Style) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, Style::default())
    }
}

/// Append `c` to `spans`, extending the last span when the style matches.
pub(crate) fn push_char(spans: &mut Vec<Span>, c: char, style: Style) {
    match spans.last_mut() {
        Some(last) if last.style == style => last.text.push(c),
        _ => spans.push(Span::new(c.to_string(), style)),
    }
}

/// Split ANSI-decorated text into styled spans, starting from the default
/// style.
pub fn parse(input: &str) -> Vec<Span> {
    parse_with(input, Style::default())
}

/// Like [`parse`], but starting from `base`.
pub fn parse_with(input: &str, base: Style) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut style = base;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            ESC => match chars.peek() {
                Some('[') => {
                    chars.next();
                    let mut body = String::new();
                    let mut final_byte = None;
                    for next in chars.by_ref() {
                        if ('\u{40}'..='\u{7e}').contains(&next) {
                            final_byte = Some(next);
                            break;
                        }
                        body.push(next);
                    }
                    if final_byte == Some('m') {
                        if let Some(params) = parse_params(&body) {
                            style.apply_sgr(&params);
                        }
                    }
                }
                Some(']') => {
                    // OSC: runs until BEL or ST (ESC \).
                    chars.next();
                    while let Some(next) = chars.next() {
                        if next == BEL {
                            break;
                        }
                        if next == ESC && chars.peek() == Some(&'\\') {
                            chars.next();
                            break;
                        }
                    }
                }
                Some(_) => {
                    chars.next();
                }
                None => {}
            },
            '\t' | '\n' => push_char(&mut spans, c, style),
            c if c.is_control() => {}
            c => push_char(&mut spans, c, style),
        }
    }

    spans
}

/// `None` when the parameter string is not a valid SGR list (e.g. private
/// `?` sequences); such sequences are ignored.
fn parse_params(body: &str) -> Option<Vec<u16>> {
    if body.is_empty() {
        return Some(Vec::new());
    }
    body.split([';', ':'])
        .map(|p| if p.is_empty() { Ok(0) } else { p.parse::<u16>() })
        .collect::<Result<Vec<_>, _>>()
        .ok()
}

/// Escape text for inclusion in HTML element content or attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

/// Render spans as escaped HTML with inline-styled `<span>`s.
pub fn spans_to_html(spans: &[Span]) -> String {
    let mut html = String::new();
    for span in spans {
        if span.text.is_empty() {
            continue;
        }
        let text = escape_html(&span.text);
        if span.style.is_plain() {
            html.push_str(&text);
        } else {
            let _ = write!(html, "<span style=\"{}\">{text}</span>", span.style.css());
        }
    }
    html
}

/// Converts terminal-coloured text to HTML fragments.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnsiConverter;

impl AnsiConverter {
    pub fn new() -> Self {
        Self
    }

    /// Convert one fragment. Styles do not leak between calls.
    pub fn convert(&self, text: &str) -> String {
        spans_to_html(&parse(text))
    }

    /// The printable text with every escape sequence removed.
    pub fn visible_text(&self, text: &str) -> String {
        parse(text).into_iter().map(|s| s.text).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
