//! Detection of graph images embedded in reply text
//!
//! The server appends the path of a generated chart to its reply, e.g.
//! `"Members by state /static/graphs/q1.png"`. The path is pulled out so it
//! can be shown on its own line instead of inline with the prose.

use regex::Regex;
use std::sync::OnceLock;

static GRAPH_REGEX: OnceLock<Regex> = OnceLock::new();

fn graph_regex() -> &'static Regex {
    GRAPH_REGEX.get_or_init(|| {
        Regex::new(r"(?i)/static/graphs/[A-Za-z0-9_\-./]+?\.(?:png|jpe?g|gif|svg|webp)\b")
            .expect("Failed to compile graph image regex")
    })
}

/// Find the first embedded graph image path in `text`
pub fn find_image(text: &str) -> Option<&str> {
    graph_regex().find(text).map(|m| m.as_str())
}

/// Remove every embedded graph image path along with one separating space.
/// Text without an image path is returned unchanged; otherwise only the
/// trailing whitespace and leading blank lines left behind are trimmed.
pub fn strip_images(text: &str) -> String {
    if find_image(text).is_none() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for m in graph_regex().find_iter(text) {
        out.push_str(&text[last..m.start()]);
        last = m.end();

        if out.ends_with(' ') {
            out.pop();
        } else if text[last..].starts_with(' ') {
            last += 1;
        }
    }
    out.push_str(&text[last..]);

    out.trim_end()
        .trim_start_matches(|c: char| c == '\n' || c == '\r')
        .to_string()
}

/// Split reply text into display text and the first image path, if any
pub fn split_image(text: &str) -> (String, Option<String>) {
    match find_image(text) {
        Some(path) => (strip_images(text), Some(path.to_string())),
        None => (text.to_string(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_trailing_image() {
        let (text, image) = split_image("Hi there /static/graphs/q1.png");
        assert_eq!(text, "Hi there");
        assert_eq!(image.as_deref(), Some("/static/graphs/q1.png"));
    }

    #[test]
    fn test_split_image_mid_sentence() {
        let (text, image) = split_image("See /static/graphs/latest_plot.png for details.");
        assert_eq!(text, "See for details.");
        assert_eq!(image.as_deref(), Some("/static/graphs/latest_plot.png"));
    }

    #[test]
    fn test_no_image_leaves_text_untouched() {
        let (text, image) = split_image("  plain reply\n\nsecond paragraph ");
        assert_eq!(text, "  plain reply\n\nsecond paragraph ");
        assert!(image.is_none());
    }

    #[test]
    fn test_other_extensions_and_case() {
        assert_eq!(find_image("x /static/graphs/a-b.JPEG y"), Some("/static/graphs/a-b.JPEG"));
        assert_eq!(find_image("/static/graphs/pie.svg"), Some("/static/graphs/pie.svg"));
        assert!(find_image("/static/other/a.png").is_none());
        assert!(find_image("/static/graphs/notes.txt").is_none());
    }

    #[test]
    fn test_strip_without_image_is_identity() {
        let text = "Line 1:\n    - item  one\n  indented\n";
        assert_eq!(strip_images(text), text);
    }

    #[test]
    fn test_strip_keeps_table_spacing() {
        let (text, image) = split_image("Result:\n  a  |  b\n  1  |  2\n/static/graphs/q1.png");
        assert_eq!(text, "Result:\n  a  |  b\n  1  |  2");
        assert_eq!(image.as_deref(), Some("/static/graphs/q1.png"));
    }

    #[test]
    fn test_strip_leading_image() {
        assert_eq!(strip_images("/static/graphs/q1.png Members  by state"), "Members  by state");
        assert_eq!(strip_images("/static/graphs/q1.png"), "");
    }

    #[test]
    fn test_strip_keeps_line_breaks() {
        let out = strip_images("line one /static/graphs/a.png\nline two");
        assert_eq!(out, "line one\nline two");
    }
}
