//! Minimal markdown for tooltip bodies: fenced and inline code, bold, dash
//! lists and line breaks. Input is HTML-escaped before any markup is added.

use once_cell::sync::Lazy;
use regex::Regex;

static FENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```(\w+)?\n(.*?)```").unwrap());
static INLINE_CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]+)`").unwrap());
static BOLD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*([^*]+)\*\*").unwrap());
static LIST_ITEM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*- (.+)$").unwrap());
static BREAK_BEFORE_UL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<br>\s*<ul>").unwrap());
static BREAK_AFTER_UL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"</ul>\s*<br>").unwrap());
static BREAK_BEFORE_LI_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<br>\s*<li>").unwrap());
static BREAK_AFTER_LI_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"</li>\s*<br>").unwrap());

pub fn render_markdown(text: &str) -> String {
    let html = escape_html(text);
    let html = FENCE_RE.replace_all(&html, |caps: &regex::Captures<'_>| {
        let code = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
        format!("<pre><code>{code}</code></pre>")
    });
    let html = INLINE_CODE_RE.replace_all(&html, "<code>$1</code>");
    let html = BOLD_RE.replace_all(&html, "<strong>$1</strong>");

    let mut lines: Vec<String> = Vec::new();
    let mut in_list = false;
    for line in html.split('\n') {
        if let Some(caps) = LIST_ITEM_RE.captures(line) {
            if !in_list {
                lines.push("<ul>".to_string());
                in_list = true;
            }
            let item = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            lines.push(format!("<li>{item}</li>"));
        } else {
            if in_list {
                lines.push("</ul>".to_string());
                in_list = false;
            }
            lines.push(line.to_string());
        }
    }
    if in_list {
        lines.push("</ul>".to_string());
    }

    let html = join_with_breaks(&lines);
    let html = BREAK_BEFORE_UL_RE.replace_all(&html, "<ul>");
    let html = BREAK_AFTER_UL_RE.replace_all(&html, "</ul>");
    let html = BREAK_BEFORE_LI_RE.replace_all(&html, "<li>");
    let html = BREAK_AFTER_LI_RE.replace_all(&html, "</li>");
    html.into_owned()
}

/// Newlines become `<br>` unless the next line starts with a tag.
fn join_with_breaks(lines: &[String]) -> String {
    let mut out = String::new();
    for (idx, line) in lines.iter().enumerate() {
        if idx > 0 {
            if line.starts_with('<') {
                out.push('\n');
            } else {
                out.push_str("<br>");
            }
        }
        out.push_str(line);
    }
    out
}

pub fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#039;")
}
