//! Clause markup to HTML.
//!
//! Clause text uses a small markup subset:
//!
//! - `## Heading` and `### Subheading` lines;
//! - `**bold**` spans;
//! - `- item` bullet lines, grouped into one list;
//! - paragraphs separated by blank lines.
//!
//! Everything else is paragraph text. Text is HTML-escaped before any markup
//! is applied, and `{{placeholder}}` tokens pass through untouched so they can
//! be substituted afterwards.

use std::sync::OnceLock;

use regex::Regex;

static BOLD_RE: OnceLock<Regex> = OnceLock::new();

fn bold_regex() -> &'static Regex {
    BOLD_RE.get_or_init(|| {
        Regex::new(r"\*\*(.+?)\*\*")
            .unwrap_or_else(|error| panic!("bold markup regex failed to compile: {error}"))
    })
}

/// Escape text for inclusion in HTML element content or attributes.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn render_inline(text: &str) -> String {
    bold_regex()
        .replace_all(&escape_html(text), "<strong>$1</strong>")
        .into_owned()
}

#[derive(Default)]
struct Blocks {
    rendered: Vec<String>,
    paragraph: Vec<String>,
    list: Vec<String>,
}

impl Blocks {
    fn flush_paragraph(&mut self) {
        if self.paragraph.is_empty() {
            return;
        }
        let text = self.paragraph.join(" ");
        self.paragraph.clear();
        self.rendered.push(format!("<p>{}</p>", render_inline(&text)));
    }

    fn flush_list(&mut self) {
        if self.list.is_empty() {
            return;
        }
        let items: Vec<String> = self
            .list
            .drain(..)
            .map(|item| format!("<li>{}</li>", render_inline(&item)))
            .collect();
        self.rendered
            .push(format!("<ul>\n{}\n</ul>", items.join("\n")));
    }

    fn flush(&mut self) {
        self.flush_paragraph();
        self.flush_list();
    }

    fn heading(&mut self, level: u8, text: &str) {
        self.flush();
        self.rendered
            .push(format!("<h{level}>{}</h{level}>", render_inline(text.trim())));
    }

    fn finish(mut self) -> String {
        self.flush();
        self.rendered.join("\n")
    }
}

/// Render clause markup to HTML.
///
/// Blank or whitespace-only input renders to an empty string.
///
/// # Examples
/// ```
/// use futureproof_backend::domain::clauses::render_markup;
///
/// let html = render_markup("## Title\n\nSome **bold** text.");
/// assert_eq!(html, "<h2>Title</h2>\n<p>Some <strong>bold</strong> text.</p>");
/// ```
#[must_use]
pub fn render_markup(source: &str) -> String {
    let mut blocks = Blocks::default();

    for raw_line in source.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            blocks.flush();
        } else if let Some(text) = line.strip_prefix("### ") {
            blocks.heading(3, text);
        } else if let Some(text) = line.strip_prefix("## ") {
            blocks.heading(2, text);
        } else if let Some(item) = line.strip_prefix("- ") {
            blocks.flush_paragraph();
            blocks.list.push(item.trim().to_owned());
        } else {
            blocks.flush_list();
            blocks.paragraph.push(line.to_owned());
        }
    }

    blocks.finish()
}
