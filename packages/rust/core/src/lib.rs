//! Classification pipeline orchestration for the categorizer.
//!
//! This crate ties together discovery, fetching, digesting, and the
//! generation service into the two end-to-end workflows: interactive
//! single-item classification ([`Classifier::classify`]) and batch CSV
//! processing ([`run_batch`]).

pub mod acquire;
pub mod batch;
pub mod classify;
pub mod extract;
pub mod input;
pub mod prompt;

pub use acquire::ContentAcquirer;
pub use batch::{
    BatchOptions, BatchProgress, BatchStage, BatchSummary, OUTPUT_COLUMNS, SilentProgress,
    run_batch,
};
pub use classify::{ClassifyEvent, Classifier, Verdict};
pub use extract::{Field, extract_classification, extract_field};
pub use input::{extract_url_from_input, normalize_url};
pub use prompt::{GUIDANCE_PROMPT, build_prompt, build_request};
