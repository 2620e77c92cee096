//! Frequency-based content digests.
//!
//! Reduces page text to the sentences that mention its most frequent
//! non-stop-word terms, and lists the top keywords for prompt population.
//! This is a relevance filter rather than a semantic summary: sentence order
//! is preserved and a sentence with none of the frequent terms is dropped.

mod stopwords;

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use categorizer_shared::{ContentDigest, PageDigest, PageType, WebsiteContent};

pub use stopwords::is_stop_word;

/// Number of keywords listed per page.
pub const TOP_KEYWORDS: usize = 10;

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+(?:['’]\w+)*").expect("word regex is valid"));

// ---------------------------------------------------------------------------
// Tokenizing
// ---------------------------------------------------------------------------

/// Split text into sentences at runs of `.`, `!` or `?` followed by whitespace.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !is_terminator(c) {
            continue;
        }

        let mut end = i + c.len_utf8();
        while let Some(&(j, next)) = chars.peek() {
            if !is_terminator(next) {
                break;
            }
            end = j + next.len_utf8();
            chars.next();
        }

        if chars.peek().is_none_or(|&(_, next)| next.is_whitespace()) {
            push_trimmed(&mut sentences, &text[start..end]);
            start = end;
        }
    }

    push_trimmed(&mut sentences, &text[start..]);
    sentences
}

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

fn push_trimmed<'a>(out: &mut Vec<&'a str>, piece: &'a str) {
    let piece = piece.trim();
    if !piece.is_empty() {
        out.push(piece);
    }
}

/// Lowercased word tokens that are not stop-words.
fn content_terms(text: &str) -> impl Iterator<Item = String> + '_ {
    WORD.find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .filter(|w| !is_stop_word(w))
}

/// The `n` most frequent terms, ties broken by first appearance.
fn most_common(terms: impl Iterator<Item = String>, n: usize) -> Vec<String> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for (position, term) in terms.enumerate() {
        counts.entry(term).or_insert((0, position)).0 += 1;
    }

    let mut ranked: Vec<(String, usize, usize)> = counts
        .into_iter()
        .map(|(term, (count, first))| (term, count, first))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    ranked.into_iter().take(n).map(|(term, _, _)| term).collect()
}

// ---------------------------------------------------------------------------
// Digest
// ---------------------------------------------------------------------------

/// Keep the sentences that mention any of the `max_words` most frequent
/// terms, in original order, then cap the result at `max_words` words.
pub fn extract_key_content(text: &str, max_words: usize) -> String {
    let sentences = split_sentences(text);
    let frequent = most_common(sentences.iter().flat_map(|s| content_terms(s)), max_words);
    let frequent_set: HashSet<&str> = frequent.iter().map(String::as_str).collect();

    let kept: Vec<&str> = sentences
        .iter()
        .copied()
        .filter(|sentence| {
            let lower = sentence.to_lowercase();
            WORD.find_iter(&lower)
                .any(|m| frequent_set.contains(m.as_str()))
                || frequent.iter().any(|term| lower.contains(term.as_str()))
        })
        .collect();

    debug!(
        sentences = sentences.len(),
        kept = kept.len(),
        terms = frequent.len(),
        "key content extracted"
    );

    truncate_words(&kept.join(" "), max_words)
}

/// The `n` most frequent alphanumeric, non-stop-word terms in `text`.
///
/// Contractions and possessives count toward their stem: "company's" is "company".
pub fn top_keywords(text: &str, n: usize) -> Vec<String> {
    let terms = WORD
        .find_iter(text)
        .filter_map(|m| m.as_str().split(['\'', '’']).next())
        .map(str::to_lowercase)
        .filter(|w| !w.is_empty() && w.chars().all(char::is_alphanumeric) && !is_stop_word(w));
    most_common(terms, n)
}

fn truncate_words(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() > max_words {
        words[..max_words].join(" ")
    } else {
        text.to_string()
    }
}

/// Summarize one page.
pub fn digest_page(text: &str, max_words: usize) -> PageDigest {
    PageDigest {
        summary: extract_key_content(text, max_words),
        top_keywords: top_keywords(text, TOP_KEYWORDS),
    }
}

/// Build the digest the request builder consumes.
pub fn build_digest(content: &WebsiteContent, max_words: usize) -> ContentDigest {
    let home = content.text(PageType::Home);
    let about = content.text(PageType::About);

    ContentDigest {
        home: digest_page(home, max_words),
        about: digest_page(about, max_words),
        combined_keywords: top_keywords(&format!("{home} {about}"), TOP_KEYWORDS),
        product_exists: content.product_exists,
        source: content.source,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use categorizer_shared::ContentSource;

    use super::*;

    #[test]
    fn sentences_split_on_terminators() {
        let text = "Acme makes anvils. Do you need one?  Yes!! Version 2.0 ships soon";
        assert_eq!(
            split_sentences(text),
            vec![
                "Acme makes anvils.",
                "Do you need one?",
                "Yes!!",
                "Version 2.0 ships soon"
            ]
        );
    }

    #[test]
    fn stop_word_only_sentences_are_dropped() {
        let text = "Acme builds anvils. It is what it is. Anvils are heavy.";
        assert_eq!(
            extract_key_content(text, 50_000),
            "Acme builds anvils. Anvils are heavy."
        );
    }

    #[test]
    fn digest_is_capped_at_max_words() {
        let text = "Anvils anvils anvils. Hammers and anvils. Forges for anvils.";
        let digest = extract_key_content(text, 4);
        assert_eq!(digest.split_whitespace().count(), 4);
        assert!(digest.starts_with("Anvils anvils anvils."));
    }

    #[test]
    fn only_the_most_frequent_terms_keep_sentences() {
        // "anvils" dominates; with a one-term budget only its sentences survive.
        let text = "Anvils everywhere. Anvils again. Teapots.";
        let digest = extract_key_content(text, 1);
        assert_eq!(digest, "Anvils");
    }

    #[test]
    fn keywords_by_frequency_then_first_seen() {
        let text = "Cloud software for cloud teams. Software, cloud, and data!";
        assert_eq!(top_keywords(text, 3), vec!["cloud", "software", "teams"]);
    }

    #[test]
    fn keywords_skip_stop_words_and_punctuation() {
        let keywords = top_keywords("The the THE and... of -- ?? widgets", 10);
        assert_eq!(keywords, vec!["widgets"]);
    }

    #[test]
    fn possessives_count_toward_their_stem() {
        let text = "The company's products. Our company serves schools. Schools' budgets.";
        assert_eq!(top_keywords(text, 2), vec!["company", "schools"]);
    }

    #[test]
    fn empty_text_gives_empty_digest() {
        assert_eq!(digest_page("", 100), PageDigest::default());
    }

    #[test]
    fn combined_keywords_span_both_pages() {
        let mut pages = BTreeMap::new();
        pages.insert(PageType::Home, "Campus bookstore. Textbooks and apparel.".to_string());
        pages.insert(PageType::About, "Our bookstore serves students. Bookstore hours.".to_string());
        let content = WebsiteContent {
            pages,
            product_exists: true,
            source: ContentSource::Website,
        };

        let digest = build_digest(&content, 50_000);
        assert_eq!(digest.combined_keywords[0], "bookstore");
        assert_eq!(digest.home.top_keywords[0], "campus");
        assert!(digest.product_exists);
        assert_eq!(digest.source, ContentSource::Website);
    }

    #[test]
    fn missing_about_page_digests_to_empty() {
        let mut pages = BTreeMap::new();
        pages.insert(PageType::Home, "Widgets for sale.".to_string());
        let content = WebsiteContent {
            pages,
            product_exists: false,
            source: ContentSource::Website,
        };

        let digest = build_digest(&content, 50_000);
        assert!(digest.about.summary.is_empty());
        assert!(digest.about.top_keywords.is_empty());
        assert_eq!(digest.combined_keywords, vec!["widgets", "sale"]);
    }
}
