//! End-to-end orchestration: data preparation, first pass, verification pass
//! and evaluation.
//!
//! Groups are processed one after another. A group whose artifact already
//! exists is skipped unless `force_run` is set; a fault aborts the group in
//! progress and leaves completed groups untouched.

use crate::catalog::{self, AttributeCatalog};
use crate::config::AuditConfig;
use crate::dataset;
use crate::error::{PipelineError, PipelineResult};
use crate::executor::BatchExecutor;
use crate::expander;
use crate::filter::KeywordLeakageFilter;
use crate::generator::DecisionGenerator;
use crate::metrics::{MetricsAggregator, REPORT_COLUMNS, ReportRow};
use crate::persistence;
use crate::sampler::{PositionStrategy, Sampler};
use crate::store::ResultStore;
use crate::types::{ExpandedRow, GenerationRequest, Lang, Pairing, ProtectedGroup};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Load the corpus named in `config.paths`, drop leaking profiles, then
/// sample and pair candidates for `lang`.
pub fn prepare_pairings(config: &AuditConfig, lang: Lang) -> PipelineResult<Vec<Pairing>> {
    let paths = &config.paths;
    let required = |p: &Option<PathBuf>, key: &str| {
        p.clone()
            .ok_or_else(|| PipelineError::fatal_config(format!("paths.{key} is not set")))
    };
    let candidates = dataset::load_candidates(&required(&paths.candidates, "candidates")?)?;
    let jobs = dataset::index_jobs(dataset::load_jobs(&required(&paths.jobs, "jobs")?)?);
    let matches = dataset::load_match_table(&required(&paths.match_table, "match_table")?)?;

    let names = catalog::load_all_names(&paths.protected_groups_dir, lang)?;
    let filter = KeywordLeakageFilter::new(lang).with_names(names);
    let pool = dataset::filter_candidates(candidates, &filter);
    let sampler = Sampler::new(&config.sampling, PositionStrategy::for_lang(lang));
    let pairings = sampler.build_pairings(&pool, &matches, &jobs)?;
    info!(lang = %lang, pairings = pairings.len(), "Prepared pairings");
    Ok(pairings)
}

/// Runs the generation passes for one language.
pub struct Pipeline {
    config: AuditConfig,
    lang: Lang,
    catalog: AttributeCatalog,
    generator: Arc<dyn DecisionGenerator>,
    executor: BatchExecutor,
}

impl Pipeline {
    pub fn new(
        config: AuditConfig,
        catalog: AttributeCatalog,
        generator: Arc<dyn DecisionGenerator>,
    ) -> PipelineResult<Self> {
        config.validate()?;
        let executor = BatchExecutor::new(&config.generation);
        Ok(Self {
            lang: catalog.lang(),
            config,
            catalog,
            generator,
            executor,
        })
    }

    pub fn lang(&self) -> Lang {
        self.lang
    }

    /// First pass over every protected group.
    pub async fn run(&self, pairings: &[Pairing]) -> PipelineResult<BTreeMap<ProtectedGroup, PathBuf>> {
        self.run_groups(&ProtectedGroup::ALL, pairings).await
    }

    /// First pass over `groups`. Returns the artifact path of every group that
    /// is complete afterwards, skipped ones included.
    pub async fn run_groups(
        &self,
        groups: &[ProtectedGroup],
        pairings: &[Pairing],
    ) -> PipelineResult<BTreeMap<ProtectedGroup, PathBuf>> {
        let store = ResultStore::new(&self.config.paths.results_root);
        let mut done = BTreeMap::new();
        for &group in groups {
            if self.skip(&store, group) {
                done.insert(group, store.group_path(self.lang, group));
                continue;
            }
            let rows = expander::expand_with_catalog(pairings, group, &self.catalog)?;
            let requests: Vec<GenerationRequest> = rows.iter().map(ExpandedRow::to_request).collect();
            let path = self.execute_group(&store, group, &rows, &requests).await?;
            done.insert(group, path);
        }
        Ok(done)
    }

    /// Second pass: re-submit every first-pass decision under `prior_root`
    /// for confirmation, writing to `paths.verified_root`.
    pub async fn verify(&self, prior_root: &Path) -> PipelineResult<BTreeMap<ProtectedGroup, PathBuf>> {
        self.verify_groups(&ProtectedGroup::ALL, prior_root).await
    }

    pub async fn verify_groups(
        &self,
        groups: &[ProtectedGroup],
        prior_root: &Path,
    ) -> PipelineResult<BTreeMap<ProtectedGroup, PathBuf>> {
        let prior = ResultStore::new(prior_root);
        let store = ResultStore::new(&self.config.paths.verified_root);
        let mut done = BTreeMap::new();
        for &group in groups {
            if !prior.exists(self.lang, group) {
                return Err(PipelineError::fatal_config(format!(
                    "no first-pass results for '{group}' at {}",
                    prior.group_path(self.lang, group).display()
                )));
            }
            if self.skip(&store, group) {
                done.insert(group, store.group_path(self.lang, group));
                continue;
            }
            let records = prior.read_group(self.lang, group)?;
            let rows: Vec<ExpandedRow> = records.iter().map(|r| r.row.clone()).collect();
            let requests: Vec<GenerationRequest> =
                records.iter().map(|r| r.to_verification_request()).collect();
            let path = self.execute_group(&store, group, &rows, &requests).await?;
            done.insert(group, path);
        }
        Ok(done)
    }

    fn skip(&self, store: &ResultStore, group: ProtectedGroup) -> bool {
        if store.exists(self.lang, group) && !self.config.force_run {
            info!(
                group = %group,
                lang = %self.lang,
                path = %store.group_path(self.lang, group).display(),
                "Artifact exists, skipping group"
            );
            return true;
        }
        false
    }

    async fn execute_group(
        &self,
        store: &ResultStore,
        group: ProtectedGroup,
        rows: &[ExpandedRow],
        requests: &[GenerationRequest],
    ) -> PipelineResult<PathBuf> {
        info!(
            group = %group,
            lang = %self.lang,
            rows = rows.len(),
            batch_size = self.executor.batch_size(),
            generator = self.generator.name(),
            "Processing group"
        );
        let checkpoint = store.checkpoint_path(self.lang, group);
        let results = self
            .executor
            .execute(self.generator.as_ref(), requests, Some(&checkpoint))
            .await
            .inspect_err(|e| {
                warn!(
                    group = %group,
                    checkpoint = %checkpoint.display(),
                    error = %e,
                    "Group aborted, partial results kept in checkpoint"
                )
            })?;
        let path = store.write_group(self.lang, group, rows, &results)?;
        persistence::remove_if_exists(&checkpoint)?;
        Ok(path)
    }
}

/// Compute a report row for every completed group under `store` and append
/// them to `report`.
pub fn evaluate(
    store: &ResultStore,
    lang: Lang,
    experiment_id: &str,
    aggregator: &MetricsAggregator,
    report: &Path,
) -> PipelineResult<Vec<ReportRow>> {
    let mut rows = Vec::new();
    for group in ProtectedGroup::ALL {
        if !store.exists(lang, group) {
            warn!(group = %group, lang = %lang, "No artifact to evaluate");
            continue;
        }
        let records = store.read_group(lang, group)?;
        rows.push(aggregator.aggregate(group.id(), lang, experiment_id, &records));
    }

    if !rows.is_empty() {
        let cells: Vec<Vec<String>> = rows.iter().map(ReportRow::to_record).collect();
        crate::store::append_report(report, &REPORT_COLUMNS, &cells)?;
    }
    Ok(rows)
}
