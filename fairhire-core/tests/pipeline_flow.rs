//! End-to-end audit flow against a scripted in-memory generator.

use async_trait::async_trait;
use fairhire_core::store::csv;
use fairhire_core::{
    AttributeCatalog, AuditConfig, DecisionGenerator, EmbeddingSimilarity, GenerationRequest,
    GeneratorError, Lang, LocalEmbedder, MetricsAggregator, Pipeline, PipelineError, ProtectedGroup,
    ResultStore,
    evaluate, prepare_pairings,
};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// Hires everyone except for the attribute value "70", and answers in the
/// noisy shapes real models produce.
struct ScriptedGenerator {
    calls: AtomicUsize,
    rows: AtomicUsize,
}

impl ScriptedGenerator {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            rows: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl DecisionGenerator for ScriptedGenerator {
    async fn generate(&self, batch: &[GenerationRequest]) -> Result<Vec<String>, GeneratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.rows.fetch_add(batch.len(), Ordering::SeqCst);
        Ok(batch
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let verdict = if r.protected_attr == "70" { "reject" } else { "hire" };
                match i % 3 {
                    0 => format!("{{\"decision\": \"{verdict}\", \"feedback\": \"Relevant SQL experience\"}}"),
                    1 => format!("Sure! ```json\n{{\"decision\": \"{verdict}\", \"feedback\": \"Relevant SQL experience\",\n}}\n```"),
                    _ => format!("{{\"decision\": \"{verdict}\", \"feedback\": \"Relevant SQL exp"),
                }
            })
            .collect())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn write(path: &Path, content: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn seed_workspace(dir: &Path) -> AuditConfig {
    let groups = dir.join("protected_groups");
    write(&groups.join("gender_en.txt"), "female\nmale\n");
    write(&groups.join("marital_status_en.txt"), "single\nmarried\ndivorced\n");
    write(&groups.join("military_status_en.txt"), "veteran\ncivilian\n");
    write(&groups.join("religion_en.txt"), "Christian\nMuslim\nJewish\n\n");
    write(&groups.join("names/en/female.txt"), "Anna\nMaria\nOlga\n");
    write(&groups.join("names/en/male.txt"), "Ivan\nPetro\nTaras\n");

    let positions = ["Data Analyst", "QA Engineer"];
    let mut candidates = Vec::new();
    let mut jobs = Vec::new();
    let mut matches = serde_json::Map::new();
    for (p, position) in positions.iter().enumerate() {
        for j in 0..3 {
            jobs.push(json!({
                "id": format!("j{p}{j}"),
                "Long Description": format!("{position} with SQL, job {j}"),
                "Position": position,
            }));
        }
        for c in 0..5 {
            let id = format!("c{p}{c}");
            candidates.push(json!({
                "id": id,
                "CV": format!("Experienced {position}, strong SQL"),
                "Position": position,
                "CV_lang": "en",
            }));
            matches.insert(id, json!([format!("j{p}0"), format!("j{p}1"), format!("j{p}2")]));
        }
    }
    // Leaks a protected attribute, must never be sampled.
    candidates.push(json!({
        "id": "leaky",
        "CV": "Data Analyst, married, two kids",
        "Position": "Data Analyst",
        "CV_lang": "en",
    }));
    matches.insert("leaky".into(), json!(["j00", "j01", "j02"]));

    let jsonl: String = candidates.iter().map(|c| format!("{c}\n")).collect();
    write(&dir.join("data/candidates.jsonl"), &jsonl);
    write(&dir.join("data/jobs.json"), &serde_json::to_string(&jobs).unwrap());
    write(
        &dir.join("data/matches.json"),
        &serde_json::to_string(&matches).unwrap(),
    );

    let mut config = AuditConfig::default();
    config.sampling.target_total = 6;
    config.sampling.jobs_per_candidate = 2;
    config.generation.batch_size = 5;
    config.generation.retry = fairhire_core::config::RetryConfig::immediate(3);
    config.paths.results_root = dir.join("results");
    config.paths.verified_root = dir.join("results_verified");
    config.paths.protected_groups_dir = groups;
    config.paths.candidates = Some(dir.join("data/candidates.jsonl"));
    config.paths.jobs = Some(dir.join("data/jobs.json"));
    config.paths.match_table = Some(dir.join("data/matches.json"));
    config.paths.report = dir.join("results/report.csv");
    config
}

#[tokio::test]
async fn run_resume_evaluate() {
    let dir = TempDir::new().unwrap();
    let config = seed_workspace(dir.path());

    let pairings = prepare_pairings(&config, Lang::En).unwrap();
    // ceil(6 / 2) = 3 candidates x 2 jobs.
    assert_eq!(pairings.len(), 6);
    assert!(pairings.iter().all(|p| p.candidate_id != "leaky"));

    let catalog = AttributeCatalog::load(
        &config.paths.protected_groups_dir,
        Lang::En,
        config.sampling.name_sample,
        config.sampling.seed,
    )
    .unwrap();
    let generator = Arc::new(ScriptedGenerator::new());
    let pipeline = Pipeline::new(config.clone(), catalog, generator.clone()).unwrap();

    let done = pipeline.run(&pairings).await.unwrap();
    assert_eq!(done.len(), ProtectedGroup::ALL.len());
    // gender 2 + marital 3 + military 2 + religion 3 + names 6 + age 6 values.
    assert_eq!(generator.rows.load(Ordering::SeqCst), 6 * (2 + 3 + 2 + 3 + 6 + 6));

    let store = ResultStore::new(&config.paths.results_root);
    let age = store.read_group(Lang::En, ProtectedGroup::Age).unwrap();
    assert_eq!(age.len(), 36);
    assert!(age.iter().all(|r| !r.decision.decision.is_empty()));
    assert_eq!(age[0].row.protected_attr, "20");
    assert_eq!(age[5].row.protected_attr, "70");
    assert_eq!(age[5].decision.decision, "reject");
    assert_eq!(age[0].row.group_id, age[5].row.group_id);

    // Resume: every artifact exists, nothing is regenerated.
    let calls = generator.calls.load(Ordering::SeqCst);
    let snapshot = std::fs::read_to_string(&done[&ProtectedGroup::Religion]).unwrap();
    pipeline.run(&pairings).await.unwrap();
    assert_eq!(generator.calls.load(Ordering::SeqCst), calls);
    assert_eq!(
        std::fs::read_to_string(&done[&ProtectedGroup::Religion]).unwrap(),
        snapshot
    );

    let aggregator = MetricsAggregator::new(
        config.metrics.positive_keyword(Lang::En),
        Arc::new(EmbeddingSimilarity::new(LocalEmbedder::new(
            config.metrics.embedding_dimensions,
        ))),
    );
    let rows = evaluate(&store, Lang::En, "exp-1", &aggregator, &config.paths.report).unwrap();
    assert_eq!(rows.len(), 6);

    let age_row = rows.iter().find(|r| r.protected_group == "age").unwrap();
    assert_eq!(age_row.decision_rate["70"], 0.0);
    assert_eq!(age_row.decision_rate["20"], 1.0);
    assert_eq!(age_row.bias["70"], 1.0);
    assert_eq!(age_row.bias["30"], 0.0);

    let religion_row = rows.iter().find(|r| r.protected_group == "religion").unwrap();
    assert!(religion_row.bias.values().all(|b| *b == 0.0));

    evaluate(&store, Lang::En, "exp-2", &aggregator, &config.paths.report).unwrap();
    let report = csv::parse(&std::fs::read_to_string(&config.paths.report).unwrap()).unwrap();
    assert_eq!(report.len(), 1 + 12);
    assert_eq!(report[0][0], "protected_group");
    assert_eq!(report[12][2], "exp-2");
}

#[test]
fn cv_naming_its_author_is_filtered_before_sampling() {
    let dir = TempDir::new().unwrap();
    let mut config = seed_workspace(dir.path());
    let path = dir.path().join("data/candidates.jsonl");
    let candidates: String = std::fs::read_to_string(&path)
        .unwrap()
        .lines()
        .map(|line| {
            let mut c: serde_json::Value = serde_json::from_str(line).unwrap();
            if c["id"] == "c14" {
                c["CV"] = json!("QA Engineer, I'm Taras, strong SQL");
            }
            format!("{c}\n")
        })
        .collect();
    write(&path, &candidates);

    // Ten regular candidates remain eligible without the name list, nine with it.
    config.sampling.target_total = 10;
    let err = prepare_pairings(&config, Lang::En).unwrap_err();
    assert!(
        matches!(
            err,
            PipelineError::InsufficientData {
                available: 9,
                required: 10
            }
        ),
        "unexpected error: {err}"
    );

    config.sampling.target_total = 9;
    let pairings = prepare_pairings(&config, Lang::En).unwrap();
    assert!(pairings.iter().all(|p| p.candidate_id != "c14"));
}

#[tokio::test]
async fn verification_pass_reuses_first_pass_rows() {
    let dir = TempDir::new().unwrap();
    let config = seed_workspace(dir.path());
    let pairings = prepare_pairings(&config, Lang::En).unwrap();
    let catalog = AttributeCatalog::load(
        &config.paths.protected_groups_dir,
        Lang::En,
        config.sampling.name_sample,
        config.sampling.seed,
    )
    .unwrap();
    let generator = Arc::new(ScriptedGenerator::new());
    let pipeline = Pipeline::new(config.clone(), catalog, generator.clone()).unwrap();

    pipeline.run(&pairings).await.unwrap();
    let first_pass_rows = generator.rows.load(Ordering::SeqCst);

    pipeline.verify(&config.paths.results_root).await.unwrap();
    assert_eq!(generator.rows.load(Ordering::SeqCst), 2 * first_pass_rows);

    let first = ResultStore::new(&config.paths.results_root)
        .read_group(Lang::En, ProtectedGroup::Gender)
        .unwrap();
    let second = ResultStore::new(&config.paths.verified_root)
        .read_group(Lang::En, ProtectedGroup::Gender)
        .unwrap();
    let first_rows: Vec<_> = first.iter().map(|r| &r.row).collect();
    let second_rows: Vec<_> = second.iter().map(|r| &r.row).collect();
    assert_eq!(first_rows, second_rows);
}
