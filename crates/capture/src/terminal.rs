//! Fixed-width virtual terminal for structured progress blocks.
//!
//! Blocks are laid out into styled lines exactly as a terminal of
//! [`DEFAULT_WIDTH`] columns would show them (box-drawn panels and tables,
//! wrapped markdown), then exported as HTML that keeps the line structure.

use std::sync::OnceLock;

use ragstream_core::progress::Block;
use regex::Regex;

use crate::ansi::{self, push_char, spans_to_html, Color, Span, Style};

/// Column count of the virtual terminal.
pub const DEFAULT_WIDTH: usize = 100;

/// One rendered terminal row.
pub type Line = Vec<Span>;

/// Display width of a character in terminal cells.
///
/// East Asian wide and fullwidth characters take two cells; combining marks
/// and zero-width characters take none.
pub fn char_width(c: char) -> usize {
    let cp = c as u32;
    match cp {
        0x0300..=0x036F | 0x200B..=0x200F | 0xFE00..=0xFE0F => 0,
        0x1100..=0x115F
        | 0x2E80..=0x303E
        | 0x3041..=0x33FF
        | 0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0xA000..=0xA4CF
        | 0xAC00..=0xD7A3
        | 0xF900..=0xFAFF
        | 0xFE30..=0xFE4F
        | 0xFF00..=0xFF60
        | 0xFFE0..=0xFFE6
        | 0x1F300..=0x1F64F
        | 0x1F900..=0x1F9FF
        | 0x20000..=0x3FFFD => 2,
        _ => 1,
    }
}

pub fn str_width(text: &str) -> usize {
    text.chars().map(char_width).sum()
}

fn line_width(line: &[Span]) -> usize {
    line.iter().map(|s| str_width(&s.text)).sum()
}

/// Greedy word wrap of styled text into lines at most `width` cells wide.
///
/// Breaks at the last space when one is available, otherwise mid-word (CJK
/// text has no spaces). Embedded newlines always start a new line.
pub fn wrap(spans: &[Span], width: usize) -> Vec<Line> {
    let width = width.max(1);
    let mut cells: Vec<(char, Style)> = Vec::new();
    for span in spans {
        cells.extend(span.text.chars().map(|c| (c, span.style)));
    }

    let mut lines = Vec::new();
    for paragraph in cells.split(|(c, _)| *c == '\n') {
        let mut current: Vec<(char, Style)> = Vec::new();
        let mut current_width = 0;
        let mut last_space: Option<usize> = None;

        for &(c, style) in paragraph {
            let c = if c == '\t' { ' ' } else { c };
            let w = char_width(c);

            if current_width + w > width && !current.is_empty() {
                match last_space {
                    Some(at) if c != ' ' => {
                        let rest = current.split_off(at + 1);
                        current.pop();
                        lines.push(to_line(&current));
                        current = rest;
                    }
                    _ => {
                        lines.push(to_line(&current));
                        current.clear();
                    }
                }
                current_width = current.iter().map(|(c, _)| char_width(*c)).sum();
                last_space = None;
                if c == ' ' && current.is_empty() {
                    continue;
                }
            }

            if c == ' ' {
                last_space = Some(current.len());
            }
            current.push((c, style));
            current_width += w;
        }
        lines.push(to_line(&current));
    }
    lines
}

fn to_line(cells: &[(char, Style)]) -> Line {
    let mut line = Vec::new();
    for &(c, style) in cells {
        push_char(&mut line, c, style);
    }
    line
}

/// Pad `line` with spaces up to `width` cells.
fn pad(mut line: Line, width: usize) -> Line {
    let used = line_width(&line);
    if used < width {
        line.push(Span::plain(" ".repeat(width - used)));
    }
    line
}

/// Center `text` within `width` cells, filling both sides with `fill`.
fn centered(text: &[Span], width: usize, fill: char, fill_style: Style) -> Line {
    let used = line_width(text);
    let total = width.saturating_sub(used);
    let left = total / 2;
    let right = total - left;
    let mut line = vec![Span::new(fill.to_string().repeat(left), fill_style)];
    line.extend(text.iter().cloned());
    line.push(Span::new(fill.to_string().repeat(right), fill_style));
    line
}

/// A terminal that renders [`Block`]s at a fixed width.
#[derive(Debug, Clone, Copy)]
pub struct VirtualTerminal {
    width: usize,
}

impl Default for VirtualTerminal {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH)
    }
}

impl VirtualTerminal {
    pub fn new(width: usize) -> Self {
        Self {
            width: width.max(8),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Lay out a block into terminal lines.
    pub fn render(&self, block: &Block) -> Vec<Line> {
        match block {
            Block::Panel { title, body } => self.render_panel(title.as_deref(), body),
            Block::Table {
                title,
                columns,
                rows,
            } => self.render_table(title.as_deref(), columns, rows),
            Block::Markdown { text } => self.render_markdown(text),
        }
    }

    /// Render a block and export it as HTML, one terminal row per text line.
    pub fn export_html(&self, block: &Block) -> String {
        self.render(block)
            .iter()
            .map(|line| spans_to_html(line))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn render_panel(&self, title: Option<&str>, body: &str) -> Vec<Line> {
        let inner = self.width - 4;
        let border = Style::default();
        let mut lines = Vec::new();

        let top_fill = match title {
            Some(title) if !title.trim().is_empty() => {
                let mut label = vec![Span::plain(" ")];
                label.extend(ansi::parse(title.trim()));
                label.push(Span::plain(" "));
                centered(&label, self.width - 2, '─', border)
            }
            _ => vec![Span::new("─".repeat(self.width - 2), border)],
        };
        let mut top = vec![Span::new("╭", border)];
        top.extend(top_fill);
        top.push(Span::new("╮", border));
        lines.push(top);

        for row in wrap(&ansi::parse(body.trim_end_matches('\n')), inner) {
            let mut line = vec![Span::new("│ ", border)];
            line.extend(pad(row, inner));
            line.push(Span::new(" │", border));
            lines.push(line);
        }

        lines.push(vec![Span::new(
            format!("╰{}╯", "─".repeat(self.width - 2)),
            border,
        )]);
        lines
    }

    fn render_table(&self, title: Option<&str>, columns: &[String], rows: &[Vec<String>]) -> Vec<Line> {
        let ncols = columns
            .len()
            .max(rows.iter().map(Vec::len).max().unwrap_or(0));
        if ncols == 0 {
            return title
                .map(|t| vec![ansi::parse_with(t, Style::italic())])
                .unwrap_or_default();
        }

        let cell_text = |row: &[String], i: usize| -> String {
            row.get(i).map(|s| s.replace('\n', " ")).unwrap_or_default()
        };

        let mut widths: Vec<usize> = (0..ncols)
            .map(|i| {
                let header = str_width(&ansi::AnsiConverter.visible_text(&cell_text(columns, i)));
                let body = rows
                    .iter()
                    .map(|r| str_width(&ansi::AnsiConverter.visible_text(&cell_text(r, i))))
                    .max()
                    .unwrap_or(0);
                header.max(body).max(1)
            })
            .collect();

        // Shrink the widest columns until the grid fits.
        let overhead = 3 * ncols + 1;
        while widths.iter().sum::<usize>() + overhead > self.width {
            let Some((widest, w)) = widths.iter().copied().enumerate().max_by_key(|(_, w)| *w) else {
                break;
            };
            if w <= 1 {
                break;
            }
            widths[widest] = w - 1;
        }
        let table_width: usize = widths.iter().sum::<usize>() + overhead;

        let rule = |left: &str, fill: &str, mid: &str, right: &str| -> Line {
            let segments: Vec<String> = widths.iter().map(|w| fill.repeat(w + 2)).collect();
            vec![Span::plain(format!("{left}{}{right}", segments.join(mid)))]
        };

        let grid_row = |cells: &[String], base: Style, sep: &str| -> Vec<Line> {
            let wrapped: Vec<Vec<Line>> = widths
                .iter()
                .enumerate()
                .map(|(i, w)| wrap(&ansi::parse_with(&cell_text(cells, i), base), *w))
                .collect();
            let height = wrapped.iter().map(Vec::len).max().unwrap_or(1);
            (0..height)
                .map(|row| {
                    let mut line = vec![Span::plain(sep)];
                    for (i, w) in widths.iter().enumerate() {
                        let cell = wrapped[i].get(row).cloned().unwrap_or_default();
                        line.push(Span::plain(" "));
                        line.extend(pad(cell, *w));
                        line.push(Span::plain(format!(" {sep}")));
                    }
                    line
                })
                .collect()
        };

        let mut lines = Vec::new();
        if let Some(title) = title.filter(|t| !t.trim().is_empty()) {
            lines.push(centered(
                &ansi::parse_with(title.trim(), Style::italic()),
                table_width,
                ' ',
                Style::default(),
            ));
        }
        lines.push(rule("┏", "━", "┳", "┓"));
        lines.extend(grid_row(columns, Style::bold(), "┃"));
        lines.push(rule("┡", "━", "╇", "┩"));
        for row in rows {
            lines.extend(grid_row(row, Style::default(), "│"));
        }
        lines.push(rule("└", "─", "┴", "┘"));
        lines
    }

    fn render_markdown(&self, text: &str) -> Vec<Line> {
        let code_style = Style::fg(Color::Indexed(6));
        let mut lines: Vec<Line> = Vec::new();
        let mut paragraph: Vec<&str> = Vec::new();
        let mut in_code = false;

        let flush_paragraph = |paragraph: &mut Vec<&str>, lines: &mut Vec<Line>| {
            if paragraph.is_empty() {
                return;
            }
            let joined = paragraph.join(" ");
            lines.extend(wrap(&inline_markdown(&joined, Style::default()), self.width));
            paragraph.clear();
        };

        for raw in text.lines() {
            let trimmed = raw.trim();

            if trimmed.starts_with("```") {
                flush_paragraph(&mut paragraph, &mut lines);
                in_code = !in_code;
                continue;
            }
            if in_code {
                let code = vec![Span::new(format!("    {raw}"), code_style)];
                lines.extend(wrap(&code, self.width));
                continue;
            }

            if trimmed.is_empty() {
                flush_paragraph(&mut paragraph, &mut lines);
                if lines.last().is_some_and(|l| !l.is_empty()) {
                    lines.push(Vec::new());
                }
                continue;
            }

            if let Some((level, heading)) = heading(trimmed) {
                flush_paragraph(&mut paragraph, &mut lines);
                let style = Style {
                    bold: true,
                    underline: level <= 2,
                    ..Style::default()
                };
                let spans = inline_markdown(heading, style);
                if level == 1 {
                    for row in wrap(&spans, self.width) {
                        lines.push(centered(&row, self.width, ' ', Style::default()));
                    }
                } else {
                    lines.extend(wrap(&spans, self.width));
                }
                continue;
            }

            if trimmed.chars().all(|c| c == '-' || c == '*' || c == '_') && trimmed.len() >= 3 {
                flush_paragraph(&mut paragraph, &mut lines);
                lines.push(vec![Span::new("─".repeat(self.width), Style::dim())]);
                continue;
            }

            if let Some((marker, item)) = list_item(trimmed) {
                flush_paragraph(&mut paragraph, &mut lines);
                let indent = str_width(&marker);
                let body = wrap(&inline_markdown(item, Style::default()), self.width - indent);
                for (i, row) in body.into_iter().enumerate() {
                    let lead = if i == 0 { marker.clone() } else { " ".repeat(indent) };
                    let mut line = vec![Span::plain(lead)];
                    line.extend(row);
                    lines.push(line);
                }
                continue;
            }

            if let Some(quote) = trimmed.strip_prefix('>') {
                flush_paragraph(&mut paragraph, &mut lines);
                let quote_style = Style {
                    italic: true,
                    dim: true,
                    ..Style::default()
                };
                for row in wrap(&inline_markdown(quote.trim(), quote_style), self.width - 2) {
                    let mut line = vec![Span::new("▌ ", Style::dim())];
                    line.extend(row);
                    lines.push(line);
                }
                continue;
            }

            paragraph.push(trimmed);
        }
        flush_paragraph(&mut paragraph, &mut lines);

        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        lines
    }
}

fn heading(line: &str) -> Option<(usize, &str)> {
    let level = line.chars().take_while(|c| *c == '#').count();
    if (1..=6).contains(&level) {
        let rest = &line[level..];
        if rest.starts_with(' ') {
            return Some((level, rest.trim()));
        }
    }
    None
}

fn list_item(line: &str) -> Option<(String, &str)> {
    for bullet in ["- ", "* ", "+ "] {
        if let Some(rest) = line.strip_prefix(bullet) {
            return Some((" • ".to_string(), rest.trim()));
        }
    }
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        if let Some(rest) = line[digits..].strip_prefix(". ") {
            return Some((format!(" {}. ", &line[..digits]), rest.trim()));
        }
    }
    None
}

fn inline_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\*\*(?P<bold>[^*]+)\*\*|`(?P<code>[^`]+)`|\*(?P<italic>[^*]+)\*|\b_(?P<uitalic>[^_]+)_\b")
            .expect("inline markdown pattern is valid")
    })
}

/// Apply inline emphasis (`**bold**`, `*italic*`, `_italic_`, `` `code` ``).
fn inline_markdown(text: &str, base: Style) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut last = 0;
    for caps in inline_pattern().captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() > last {
            spans.extend(ansi::parse_with(&text[last..whole.start()], base));
        }
        let (inner, style) = if let Some(m) = caps.name("bold") {
            (m.as_str(), Style::bold())
        } else if let Some(m) = caps.name("code") {
            (m.as_str(), Style::fg(Color::Indexed(6)))
        } else if let Some(m) = caps.name("italic").or_else(|| caps.name("uitalic")) {
            (m.as_str(), Style::italic())
        } else {
            (whole.as_str(), Style::default())
        };
        spans.extend(ansi::parse_with(inner, base.combine(style)));
        last = whole.end();
    }
    if last < text.len() {
        spans.extend(ansi::parse_with(&text[last..], base));
    }
    spans
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
