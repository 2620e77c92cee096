//! Labelled-field extraction from model output.
//!
//! Values outside the accepted vocabulary are corrected to sentinels and
//! logged rather than rejected, so extraction never fails.

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use categorizer_shared::{
    ClassificationResult, Confidence, KnowledgeBase, NEEDS_FURTHER_REVIEW, NOT_AVAILABLE,
};

/// Output labels the prompt asks the model to fill in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    PrimaryCategory,
    SecondaryCategory,
    Confidence,
    ConfidenceJustification,
    Explanation,
    CurrentCategoryEvaluation,
}

impl Field {
    pub fn label(&self) -> &'static str {
        match self {
            Self::PrimaryCategory => "PRIMARY_CATEGORY",
            Self::SecondaryCategory => "SECONDARY_CATEGORY",
            Self::Confidence => "CONFIDENCE",
            Self::ConfidenceJustification => "CONFIDENCE_JUSTIFICATION",
            Self::Explanation => "EXPLANATION",
            Self::CurrentCategoryEvaluation => "CURRENT_CATEGORY_EVALUATION",
        }
    }

    fn pattern(&self) -> &'static Regex {
        match self {
            Self::PrimaryCategory => &PRIMARY_CATEGORY,
            Self::SecondaryCategory => &SECONDARY_CATEGORY,
            Self::Confidence => &CONFIDENCE,
            Self::ConfidenceJustification => &CONFIDENCE_JUSTIFICATION,
            Self::Explanation => &EXPLANATION,
            Self::CurrentCategoryEvaluation => &CURRENT_CATEGORY_EVALUATION,
        }
    }
}

fn label_regex(label: &str) -> Regex {
    Regex::new(&format!(r"(?i)\b{label}:\s*([^\n]*)")).expect("label regex is valid")
}

static PRIMARY_CATEGORY: LazyLock<Regex> =
    LazyLock::new(|| label_regex(Field::PrimaryCategory.label()));
static SECONDARY_CATEGORY: LazyLock<Regex> =
    LazyLock::new(|| label_regex(Field::SecondaryCategory.label()));
static CONFIDENCE: LazyLock<Regex> = LazyLock::new(|| label_regex(Field::Confidence.label()));
static CONFIDENCE_JUSTIFICATION: LazyLock<Regex> =
    LazyLock::new(|| label_regex(Field::ConfidenceJustification.label()));
static EXPLANATION: LazyLock<Regex> = LazyLock::new(|| label_regex(Field::Explanation.label()));
static CURRENT_CATEGORY_EVALUATION: LazyLock<Regex> =
    LazyLock::new(|| label_regex(Field::CurrentCategoryEvaluation.label()));

/// The value after the first occurrence of `field`'s label, or `N/A`.
///
/// Surrounding whitespace and markdown emphasis are stripped.
pub fn extract_field(response: &str, field: Field) -> String {
    field
        .pattern()
        .captures(response)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().trim_matches('*').trim().to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Parse a full model response into a validated result.
pub fn extract_classification(
    response: &str,
    knowledge_base: &KnowledgeBase,
) -> ClassificationResult {
    let primary = extract_field(response, Field::PrimaryCategory);
    let primary_category = if knowledge_base.is_category(&primary) {
        primary
    } else {
        warn!(value = %primary, "primary category not in taxonomy");
        NEEDS_FURTHER_REVIEW.to_string()
    };

    let secondary = extract_field(response, Field::SecondaryCategory);
    let secondary_category = if knowledge_base.is_category(&secondary) {
        secondary
    } else {
        if secondary != NOT_AVAILABLE {
            warn!(value = %secondary, "secondary category not in taxonomy");
        }
        NOT_AVAILABLE.to_string()
    };

    let confidence_label = extract_field(response, Field::Confidence);
    let confidence = Confidence::from_label(&confidence_label).unwrap_or_else(|| {
        warn!(value = %confidence_label, "unrecognized confidence level");
        Confidence::NotAvailable
    });

    ClassificationResult {
        primary_category,
        secondary_category,
        confidence,
        explanation: extract_field(response, Field::Explanation),
        confidence_justification: extract_field(response, Field::ConfidenceJustification),
        current_category_evaluation: extract_field(response, Field::CurrentCategoryEvaluation),
    }
}
