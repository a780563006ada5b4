//! Restricted markdown used for answers.
//!
//! Only a handful of constructs are recognized, one line at a time:
//!
//! - `#`, `##`, `###` headers
//! - `- ` and `* ` bullets
//! - `**bold**` and `` `code` `` inside any line
//! - blank lines as spacers
//!
//! Everything else is a plain paragraph. [`parse`] produces [`Block`]s for
//! the egui view, [`render_html`] produces markup for export.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static INLINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*|`([^`]+?)`").expect("INLINE regex"));

/// Inline run of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span {
    Text(String),
    Bold(String),
    Code(String),
}

/// One rendered line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, spans: Vec<Span> },
    Bullet(Vec<Span>),
    Spacer,
    Paragraph(Vec<Span>),
}

/// Splits `text` into blocks, one per line.
pub fn parse(text: &str) -> Vec<Block> {
    text.lines().map(parse_line).collect()
}

fn parse_line(line: &str) -> Block {
    let line = line.trim();
    if line.is_empty() {
        return Block::Spacer;
    }
    if let Some((level, rest)) = heading(line) {
        return Block::Heading { level, spans: parse_inline(rest) };
    }
    if let Some(rest) = bullet(line) {
        return Block::Bullet(parse_inline(rest));
    }
    Block::Paragraph(parse_inline(line))
}

fn heading(line: &str) -> Option<(u8, &str)> {
    // Longest marker first so "### x" is not read as "# ## x".
    [("### ", 3), ("## ", 2), ("# ", 1)]
        .into_iter()
        .find_map(|(marker, level)| line.strip_prefix(marker).map(|rest| (level, rest)))
}

fn bullet(line: &str) -> Option<&str> {
    line.strip_prefix("- ").or_else(|| line.strip_prefix("* "))
}

/// Splits a line into text, bold and code runs.
pub fn parse_inline(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut last = 0;

    for caps in INLINE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() > last {
            spans.push(Span::Text(text[last..whole.start()].to_string()));
        }
        if let Some(bold) = caps.get(1) {
            spans.push(Span::Bold(bold.as_str().to_string()));
        } else if let Some(code) = caps.get(2) {
            spans.push(Span::Code(code.as_str().to_string()));
        }
        last = whole.end();
    }

    if last < text.len() {
        spans.push(Span::Text(text[last..].to_string()));
    }
    spans
}

/// Renders `text` as HTML.
///
/// Each line is HTML-escaped before the bold and code markers are turned
/// into tags, so `<strong>` and `<code>` are the only markup that can come
/// out of model text.
pub fn render_html(text: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut in_list = false;

    for line in text.lines() {
        let line = line.trim();
        let is_bullet = bullet(line).is_some();
        if in_list && !is_bullet {
            out.push("</ul>".to_string());
            in_list = false;
        }

        if line.is_empty() {
            out.push("<br>".to_string());
        } else if let Some((level, rest)) = heading(line) {
            out.push(format!("<h{level}>{}</h{level}>", inline_html(rest)));
        } else if let Some(rest) = bullet(line) {
            if !in_list {
                out.push("<ul>".to_string());
                in_list = true;
            }
            out.push(format!("<li>{}</li>", inline_html(rest)));
        } else {
            out.push(format!("<p>{}</p>", inline_html(line)));
        }
    }

    if in_list {
        out.push("</ul>".to_string());
    }
    out.join("\n")
}

fn inline_html(text: &str) -> String {
    let escaped = escaper::encode_minimal(text);
    INLINE
        .replace_all(&escaped, |caps: &Captures| match (caps.get(1), caps.get(2)) {
            (Some(bold), _) => format!("<strong>{}</strong>", bold.as_str()),
            (None, Some(code)) => format!("<code>{}</code>", code.as_str()),
            (None, None) => caps[0].to_string(),
        })
        .into_owned()
}

/// Plain-text version of a message, markers stripped, for the clipboard.
pub fn to_plain_text(text: &str) -> String {
    text.lines()
        .map(|line| {
            let spans = parse_inline(line);
            spans
                .into_iter()
                .map(|span| match span {
                    Span::Text(t) | Span::Bold(t) | Span::Code(t) => t,
                })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}
