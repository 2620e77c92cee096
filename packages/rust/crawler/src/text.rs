//! Visible-text extraction from HTML.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Node};

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex is valid"));

/// Elements whose text never reaches the page reader.
const HIDDEN_ELEMENTS: [&str; 2] = ["script", "style"];

/// Reduce an HTML document to its visible text, whitespace-collapsed.
pub fn html_to_text(html: &str) -> String {
    let doc = Html::parse_document(html);

    let mut pieces: Vec<&str> = Vec::new();
    for node in doc.tree.nodes() {
        let Node::Text(text) = node.value() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            matches!(ancestor.value(), Node::Element(el) if HIDDEN_ELEMENTS.contains(&el.name()))
        });
        if hidden {
            continue;
        }

        let trimmed = text.trim();
        if !trimmed.is_empty() {
            pieces.push(trimmed);
        }
    }

    WHITESPACE
        .replace_all(&pieces.join("\n"), " ")
        .trim()
        .to_string()
}

/// Cut `text` to `max_chars` characters, appending `...` when anything was dropped.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripts_and_styles_are_dropped() {
        let html = r#"<html><head><title>Acme</title><script>alert("x")</script></head>
            <body><style>.a { color: red }</style><nav>Home | About</nav>
            <p>Industrial   anvils
            since 1921.</p></body></html>"#;
        assert_eq!(html_to_text(html), "Acme Home | About Industrial anvils since 1921.");
    }

    #[test]
    fn comments_are_not_text() {
        let html = "<body><!-- hidden note --><p>Shown</p></body>";
        assert_eq!(html_to_text(html), "Shown");
    }

    #[test]
    fn empty_document_gives_empty_text() {
        assert_eq!(html_to_text(""), "");
        assert_eq!(html_to_text("<html><body>   </body></html>"), "");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo...");
        assert_eq!(truncate_chars("short", 5), "short");
        assert_eq!(truncate_chars("short", 50), "short");
    }
}
