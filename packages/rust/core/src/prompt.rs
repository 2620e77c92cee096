//! Classification request construction.
//!
//! Pure: the same digest, profile, and knowledge base always produce the same
//! prompt, and decoding parameters come straight from configuration.

use categorizer_genai::{ChatMessage, ChatRequest};
use categorizer_shared::{
    CompanyProfile, ContentDigest, GenerationConfig, KnowledgeBase, NOT_AVAILABLE,
};

/// Seed message for interactive classification.
pub const GUIDANCE_PROMPT: &str =
    "You are a helpful AI assistant tasked with categorizing businesses based on their website content.";

/// Static instructions and output format appended to every prompt.
const CLASSIFICATION_GUIDANCE: &str = include_str!("../templates/classification_guidance.md");

/// Build the streaming chat request for one business.
pub fn build_request(
    digest: &ContentDigest,
    profile: &CompanyProfile,
    knowledge_base: &KnowledgeBase,
    config: &GenerationConfig,
    chat_history: Vec<ChatMessage>,
) -> ChatRequest {
    ChatRequest {
        message: build_prompt(digest, profile, knowledge_base),
        chat_history,
        max_tokens: config.max_tokens,
        temperature: config.temperature,
        frequency_penalty: config.frequency_penalty,
        top_p: config.top_p,
        top_k: config.top_k,
    }
}

/// Render the full prompt text.
pub fn build_prompt(
    digest: &ContentDigest,
    profile: &CompanyProfile,
    knowledge_base: &KnowledgeBase,
) -> String {
    let categories = knowledge_base.categories().collect::<Vec<_>>().join(", ");

    format!(
        "Content source: {source}\n\
         \n\
         Customer: {customer}\n\
         \n\
         ## Company Information\n\
         {company}\n\
         \n\
         ## Acceptable Business Industries\n\
         {categories}\n\
         \n\
         ## Vertical Summaries\n\
         {verticals}\n\
         {CLASSIFICATION_GUIDANCE}",
        source = digest.source,
        customer = profile.customer,
        company = company_information(digest, profile),
        verticals = format_verticals(knowledge_base),
    )
}

fn company_information(digest: &ContentDigest, profile: &CompanyProfile) -> String {
    let mut lines = vec![
        format!("1. Customer: {}", profile.customer),
        format!("2. City: {}", profile.city),
        format!("3. Country: {}", profile.country),
        format!("4. State/Province: {}", profile.state),
        format!("5. Web Address: {}", profile.web_address),
        format!("6. Homepage summary: {}", or_not_available(&digest.home.summary)),
        format!("7. Homepage top keywords: {}", keyword_list(&digest.home.top_keywords)),
        format!("8. About page summary: {}", or_not_available(&digest.about.summary)),
        format!("9. About page top keywords: {}", keyword_list(&digest.about.top_keywords)),
        format!("10. Combined top keywords: {}", keyword_list(&digest.combined_keywords)),
        format!(
            "11. Product page exists: {}",
            if digest.product_exists { "Yes" } else { "No" }
        ),
    ];

    if !profile.current_category.trim().is_empty() {
        lines.push(format!("12. Current category: {}", profile.current_category.trim()));
    }

    lines.join("\n")
}

fn or_not_available(text: &str) -> &str {
    if text.trim().is_empty() { NOT_AVAILABLE } else { text }
}

fn keyword_list(keywords: &[String]) -> String {
    if keywords.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        keywords.join(", ")
    }
}

/// Render every vertical's summary, criteria, and keyword tiers.
pub fn format_verticals(knowledge_base: &KnowledgeBase) -> String {
    let mut out = String::new();
    for vertical in knowledge_base.verticals() {
        out.push_str(&format!("### -- {}: -- ###\n", vertical.name));
        out.push_str(&format!("\n## Vertical Summary: ##\n{}\n", vertical.summary.trim()));
        out.push_str(&format!(
            "## Qualifying Criteria: ##\n{}\n\n",
            vertical.qualifying_criteria.trim()
        ));
        out.push_str("## Keywords: ##\n");
        for (tier, keywords) in vertical.keywords.labelled() {
            out.push_str(&format!("**{tier}**: {}\n", keywords.join(", ")));
        }
        out.push('\n');
    }
    out
}
