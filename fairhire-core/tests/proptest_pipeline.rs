//! Property-based tests for expansion, chunked execution and sampling.

use async_trait::async_trait;
use fairhire_core::config::{RetryConfig, SamplingConfig};
use fairhire_core::dataset::MatchTable;
use fairhire_core::expander::expand;
use fairhire_core::sampler::PositionStrategy;
use fairhire_core::{
    BatchExecutor, CandidateProfile, Decision, DecisionGenerator, GenerationRequest,
    GeneratorError, Lang, Pairing, ProtectedGroup, Sampler,
};
use proptest::prelude::*;
use std::collections::HashSet;

fn pairing(i: usize) -> Pairing {
    Pairing {
        item_id: format!("c{i}_j{i}"),
        candidate_id: format!("c{i}"),
        job_id: format!("j{i}"),
        cv: format!("cv {i}"),
        job_description: format!("job {i}"),
        job_position: "Data Analyst".into(),
        lang: "en".into(),
    }
}

/// Echoes the attribute as feedback so order can be checked.
struct Echo;

#[async_trait]
impl DecisionGenerator for Echo {
    async fn generate(&self, batch: &[GenerationRequest]) -> Result<Vec<String>, GeneratorError> {
        Ok(batch
            .iter()
            .map(|r| format!("{{\"decision\":\"hire\",\"feedback\":\"{}\"}}", r.protected_attr))
            .collect())
    }
}

fn pool(per_position: &[usize]) -> (Vec<CandidateProfile>, MatchTable) {
    let mut candidates = Vec::new();
    let mut matches = MatchTable::new();
    for (p, count) in per_position.iter().enumerate() {
        for c in 0..*count {
            let id = format!("p{p}c{c}");
            matches.insert(id.clone(), vec!["j1".into(), "j2".into(), "j3".into()]);
            candidates.push(CandidateProfile {
                id,
                cv: "cv".into(),
                position: format!("Position {p}"),
                lang: "en".into(),
            });
        }
    }
    (candidates, matches)
}

// --- Cross-product properties ---

proptest! {
    #[test]
    fn expansion_is_complete_and_ordered(
        n_pairings in 0usize..20,
        attrs in proptest::collection::vec("[a-z]{1,8}", 1..8),
    ) {
        let pairings: Vec<Pairing> = (0..n_pairings).map(pairing).collect();
        let rows = expand(&pairings, ProtectedGroup::Religion, Lang::En, &attrs);

        prop_assert_eq!(rows.len(), n_pairings * attrs.len());
        for (i, row) in rows.iter().enumerate() {
            let p = &pairings[i / attrs.len()];
            prop_assert_eq!(&row.group_id, &p.item_id);
            prop_assert_eq!(&row.protected_attr, &attrs[i % attrs.len()]);
        }
    }
}

// --- Chunked execution properties ---

proptest! {
    #[test]
    fn execution_preserves_order_for_any_chunking(
        n_rows in 0usize..60,
        batch_size in 1usize..17,
    ) {
        let requests: Vec<GenerationRequest> = (0..n_rows)
            .map(|i| GenerationRequest {
                job_desc: "job".into(),
                candidate_cv: "cv".into(),
                protected_group: "age".into(),
                protected_attr: format!("v{i}"),
                decision: None,
                feedback: None,
            })
            .collect();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let executor = BatchExecutor::with_policy(batch_size, RetryConfig::immediate(1));
        let results = runtime
            .block_on(executor.execute(&Echo, &requests, None))
            .unwrap();

        prop_assert_eq!(results.len(), n_rows);
        for (i, raw) in results.iter().enumerate() {
            prop_assert_eq!(Decision::from_raw(raw).feedback, format!("v{i}"));
        }
    }
}

// --- Sampler properties ---

proptest! {
    #[test]
    fn sampling_is_deterministic_and_hits_target(
        per_position in proptest::collection::vec(5usize..12, 1..6),
        seed in any::<u64>(),
        target_fraction in 0.1f64..1.0,
    ) {
        let (candidates, matches) = pool(&per_position);
        let target_total = ((candidates.len() as f64 * target_fraction) as usize).max(1);
        let config = SamplingConfig {
            seed,
            target_total,
            jobs_per_candidate: 3,
            per_category_cap: 5,
            name_sample: 10,
        };
        let positions: Vec<String> = (0..per_position.len()).map(|p| format!("Position {p}")).collect();
        let sampler = Sampler::new(&config, PositionStrategy::Fixed(positions));

        let first: Vec<&str> = sampler
            .sample(&candidates, &matches)
            .unwrap()
            .into_iter()
            .map(|c| c.id.as_str())
            .collect();
        let second: Vec<&str> = sampler
            .sample(&candidates, &matches)
            .unwrap()
            .into_iter()
            .map(|c| c.id.as_str())
            .collect();

        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.len(), sampler.candidate_target());
        let unique: HashSet<&&str> = first.iter().collect();
        prop_assert_eq!(unique.len(), first.len());
    }
}
