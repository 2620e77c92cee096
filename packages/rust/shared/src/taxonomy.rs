//! The closed category taxonomy and its vertical descriptions.
//!
//! The knowledge base ships inside the binary (`data/verticals.toml`) and is
//! parsed once on first use. It is read-only for the life of the process.

use std::sync::LazyLock;

use serde::Deserialize;

use crate::error::{ClassificationError, Result};

/// Embedded vertical definitions.
const VERTICALS_TOML: &str = include_str!("../data/verticals.toml");

static KNOWLEDGE_BASE: LazyLock<KnowledgeBase> = LazyLock::new(|| {
    KnowledgeBase::from_toml(VERTICALS_TOML).expect("embedded verticals.toml is valid")
});

/// The process-wide knowledge base.
pub fn knowledge_base() -> &'static KnowledgeBase {
    &KNOWLEDGE_BASE
}

/// Keyword tiers guiding how strongly a term points at a vertical.
#[derive(Debug, Clone, Deserialize)]
pub struct KeywordTiers {
    pub tier1: Vec<String>,
    pub tier2: Vec<String>,
    pub tier3: Vec<String>,
    /// Terms suggesting the business is *not* in this vertical.
    pub negative: Vec<String>,
}

impl KeywordTiers {
    /// Tiers in prompt order, labelled.
    pub fn labelled(&self) -> [(&'static str, &[String]); 4] {
        [
            ("TIER1", &self.tier1),
            ("TIER2", &self.tier2),
            ("TIER3", &self.tier3),
            ("NEGATIVE", &self.negative),
        ]
    }
}

/// One taxonomy entry's full description.
#[derive(Debug, Clone, Deserialize)]
pub struct Vertical {
    pub name: String,
    pub summary: String,
    pub qualifying_criteria: String,
    pub keywords: KeywordTiers,
}

#[derive(Deserialize)]
struct KnowledgeBaseFile {
    vertical: Vec<Vertical>,
}

/// All verticals, in taxonomy order.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    verticals: Vec<Vertical>,
}

impl KnowledgeBase {
    /// Parse a knowledge base from its TOML form.
    pub fn from_toml(content: &str) -> Result<Self> {
        let file: KnowledgeBaseFile = toml::from_str(content)
            .map_err(|e| ClassificationError::config(format!("invalid verticals file: {e}")))?;

        if file.vertical.is_empty() {
            return Err(ClassificationError::config("verticals file defines no verticals"));
        }

        Ok(Self {
            verticals: file.vertical,
        })
    }

    pub fn verticals(&self) -> &[Vertical] {
        &self.verticals
    }

    /// Category names, in taxonomy order.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.verticals.iter().map(|v| v.name.as_str())
    }

    /// Exact, case-sensitive membership in the closed taxonomy.
    pub fn is_category(&self, name: &str) -> bool {
        self.categories().any(|c| c == name)
    }
}
