//! Shared types, error model, configuration, and the vertical knowledge base.
//!
//! This crate is the foundation depended on by all other categorizer crates.
//! It provides:
//! - [`ClassificationError`] — the unified error type
//! - Domain types ([`SiteMap`], [`WebsiteContent`], [`ContentDigest`], [`ClassificationResult`])
//! - Configuration ([`AppConfig`], [`ScrapeConfig`], [`GenerationConfig`], config loading)
//! - The closed taxonomy ([`KnowledgeBase`], [`Vertical`])

pub mod config;
pub mod error;
pub mod taxonomy;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, GenAiConfig, GenerationConfig, ScrapeConfig, ScrapingConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{ClassificationError, Result};
pub use taxonomy::{KeywordTiers, KnowledgeBase, Vertical, knowledge_base};
pub use types::{
    ClassificationResult, CompanyProfile, Confidence, ContentDigest, ContentSource,
    NEEDS_FURTHER_REVIEW, NOT_AVAILABLE, PageContent, PageDigest, PageType, SiteMap,
    WebsiteContent,
};
