//! Configuration for the audit pipeline.
//!
//! Uses `figment` for layered configuration: defaults -> user config file ->
//! workspace `fairhire.toml` -> explicit config file -> `FAIRHIRE_` environment.
//! Every knob the sampler and executor need travels in these structs; nothing
//! is read from process-wide state after loading.

use crate::error::PipelineError;
use crate::types::Lang;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level audit configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// Re-run groups whose output artifact already exists.
    #[serde(default)]
    pub force_run: bool,
}

impl AuditConfig {
    /// Reject values that would make a run loop forever or do nothing.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.generation.batch_size == 0 {
            return Err(PipelineError::fatal_config("generation.batch_size must be > 0"));
        }
        if self.generation.retry.max_attempts == 0 {
            return Err(PipelineError::fatal_config(
                "generation.retry.max_attempts must be > 0",
            ));
        }
        if self.sampling.jobs_per_candidate == 0 {
            return Err(PipelineError::fatal_config(
                "sampling.jobs_per_candidate must be > 0",
            ));
        }
        if self.sampling.per_category_cap == 0 {
            return Err(PipelineError::fatal_config(
                "sampling.per_category_cap must be > 0",
            ));
        }
        Ok(())
    }
}

/// Stratified candidate sampling parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Target number of pairings (candidates x jobs_per_candidate).
    #[serde(default = "default_target_total")]
    pub target_total: usize,
    #[serde(default = "default_jobs_per_candidate")]
    pub jobs_per_candidate: usize,
    /// Maximum candidates drawn from one position category per pass.
    #[serde(default = "default_per_category_cap")]
    pub per_category_cap: usize,
    /// Number of names injected for the `name` group (split evenly by gender).
    #[serde(default = "default_name_sample")]
    pub name_sample: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            target_total: default_target_total(),
            jobs_per_candidate: default_jobs_per_candidate(),
            per_category_cap: default_per_category_cap(),
            name_sample: default_name_sample(),
        }
    }
}

fn default_seed() -> u64 {
    42
}

fn default_target_total() -> usize {
    450
}

fn default_jobs_per_candidate() -> usize {
    3
}

fn default_per_category_cap() -> usize {
    5
}

fn default_name_sample() -> usize {
    10
}

/// Batch execution parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Rows per chunk; also the generator's permitted concurrency.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub retry: RetryConfig,
    /// Log progress every this many generated rows.
    #[serde(default = "default_progress_every")]
    pub progress_every: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            retry: RetryConfig::default(),
            progress_every: default_progress_every(),
        }
    }
}

fn default_batch_size() -> usize {
    32
}

fn default_progress_every() -> usize {
    500
}

/// Retry policy for transient generator faults.
///
/// The default is a fixed delay: a multiplier of 1.0 keeps every wait at
/// `initial_backoff_ms`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total invocation attempts per chunk, the first one included.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_backoff_ms")]
    pub max_backoff_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_backoff_ms(),
            max_backoff_ms: default_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryConfig {
    /// A policy that never waits between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
            backoff_multiplier: 1.0,
        }
    }
}

fn default_max_attempts() -> u32 {
    10
}

fn default_backoff_ms() -> u64 {
    30_000
}

fn default_backoff_multiplier() -> f64 {
    1.0
}

/// OpenAI-compatible decision generator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            temperature: 0.0,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

/// Locations of inputs and artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root of per-group artifacts: `<results_root>/<lang>/<group>.csv`.
    #[serde(default = "default_results_root")]
    pub results_root: PathBuf,
    /// Root of second-pass artifacts.
    #[serde(default = "default_verified_root")]
    pub verified_root: PathBuf,
    /// Directory holding attribute lists and name files.
    #[serde(default = "default_protected_groups_dir")]
    pub protected_groups_dir: PathBuf,
    #[serde(default)]
    pub candidates: Option<PathBuf>,
    #[serde(default)]
    pub jobs: Option<PathBuf>,
    /// JSON object mapping candidate id to compatible job ids.
    #[serde(default)]
    pub match_table: Option<PathBuf>,
    /// Cumulative fairness report.
    #[serde(default = "default_report")]
    pub report: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            results_root: default_results_root(),
            verified_root: default_verified_root(),
            protected_groups_dir: default_protected_groups_dir(),
            candidates: None,
            jobs: None,
            match_table: None,
            report: default_report(),
        }
    }
}

fn default_results_root() -> PathBuf {
    PathBuf::from("results")
}

fn default_verified_root() -> PathBuf {
    PathBuf::from("results_verified")
}

fn default_protected_groups_dir() -> PathBuf {
    PathBuf::from("protected_groups")
}

fn default_report() -> PathBuf {
    PathBuf::from("results/report.csv")
}

/// Fairness metric settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Dimensions of the local hashed embedder.
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: usize,
    /// Positive-outcome keyword for English decisions.
    #[serde(default = "default_positive_en")]
    pub positive_keyword_en: String,
    /// Positive-outcome keyword for Ukrainian decisions.
    #[serde(default = "default_positive_uk")]
    pub positive_keyword_uk: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            embedding_dimensions: default_embedding_dimensions(),
            positive_keyword_en: default_positive_en(),
            positive_keyword_uk: default_positive_uk(),
        }
    }
}

impl MetricsConfig {
    pub fn positive_keyword(&self, lang: Lang) -> &str {
        match lang {
            Lang::En => &self.positive_keyword_en,
            Lang::Uk => &self.positive_keyword_uk,
        }
    }
}

fn default_embedding_dimensions() -> usize {
    256
}

fn default_positive_en() -> String {
    "hire".to_string()
}

fn default_positive_uk() -> String {
    "найняти".to_string()
}

/// Load configuration by merging defaults, config files and environment.
///
/// Later layers win: user config (`~/.config/fairhire/config.toml`), then
/// `<workspace>/fairhire.toml`, then `explicit_file`, then `FAIRHIRE_*`
/// variables (`FAIRHIRE_GENERATION__BATCH_SIZE=16`).
pub fn load_config(
    workspace: Option<&Path>,
    explicit_file: Option<&Path>,
) -> Result<AuditConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(AuditConfig::default()));

    if let Some(dirs) = directories::ProjectDirs::from("dev", "fairhire", "fairhire") {
        let user_config = dirs.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = ws.join("fairhire.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    if let Some(path) = explicit_file {
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(Env::prefixed("FAIRHIRE_").split("__"));

    figment.extract().map_err(Box::new)
}
