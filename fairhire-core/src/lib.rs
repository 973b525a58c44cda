//! # fairhire-core: counterfactual bias audit for LLM hiring decisions
//!
//! Pairs candidate profiles with compatible job postings, injects every value
//! of a protected attribute into each pairing, asks an external decision
//! generator to hire or reject each variant, and measures how much the
//! decisions and feedback move with the injected attribute.
//!
//! Data flow: `catalog` + `sampler` + `expander` produce expanded rows, the
//! `executor` drives a `generator` over them, `store` persists one artifact per
//! protected group, and `metrics` turns those artifacts into report rows.

// Foundation
pub mod config;
pub mod error;
pub mod persistence;
pub mod types;

// Inputs
pub mod catalog;
pub mod dataset;
pub mod filter;
pub mod sampler;

// Generation
pub mod executor;
pub mod expander;
pub mod generator;
pub mod recovery;

// Results & evaluation
pub mod embeddings;
pub mod metrics;
pub mod store;

pub mod pipeline;

// Re-exports
pub use catalog::AttributeCatalog;
pub use config::{AuditConfig, load_config};
pub use embeddings::{Embedder, EmbeddingSimilarity, LocalEmbedder, SimilarityScorer};
pub use error::{GeneratorError, PipelineError, PipelineResult};
pub use executor::BatchExecutor;
pub use generator::{DecisionGenerator, OpenAiCompatGenerator};
pub use metrics::{MetricsAggregator, ReportRow};
pub use pipeline::{Pipeline, evaluate, prepare_pairings};
pub use recovery::{Decision, RawResult, recover_response};
pub use sampler::Sampler;
pub use store::ResultStore;
pub use types::{CandidateProfile, ExpandedRow, GenerationRequest, JobPosting, Lang, Pairing, ProtectedGroup};
