//! CLI subcommand handlers.

use crate::Commands;
use crate::ConfigAction;
use fairhire_core::{
    AttributeCatalog, AuditConfig, EmbeddingSimilarity, Lang, LocalEmbedder, MetricsAggregator,
    OpenAiCompatGenerator, Pipeline, ProtectedGroup, ResultStore,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Handle a CLI subcommand.
pub async fn handle_command(
    command: Commands,
    config: AuditConfig,
    lang: Lang,
    workspace: &Path,
) -> anyhow::Result<()> {
    match command {
        Commands::Sample { output } => handle_sample(&config, lang, output.as_deref()),
        Commands::Run { groups, model } => handle_run(config, lang, &groups, model).await,
        Commands::Verify {
            prior,
            groups,
            model,
        } => handle_verify(config, lang, prior, &groups, model).await,
        Commands::Evaluate { root, experiment } => handle_evaluate(&config, lang, root, experiment),
        Commands::Config { action } => handle_config(action, &config, workspace),
    }
}

fn handle_sample(config: &AuditConfig, lang: Lang, output: Option<&Path>) -> anyhow::Result<()> {
    let pairings = fairhire_core::prepare_pairings(config, lang)?;
    let json = serde_json::to_string_pretty(&pairings)?;
    match output {
        Some(path) => {
            fairhire_core::persistence::atomic_write(path, json.as_bytes())?;
            println!("Wrote {} pairings to {}", pairings.len(), path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

async fn handle_run(
    config: AuditConfig,
    lang: Lang,
    groups: &[ProtectedGroup],
    model: Option<String>,
) -> anyhow::Result<()> {
    let pipeline = build_pipeline(config.clone(), lang, model)?;
    let pairings = fairhire_core::prepare_pairings(&config, lang)?;
    let groups = selected(groups);
    tracing::info!(lang = %lang, pairings = pairings.len(), groups = groups.len(), "Starting first pass");
    let done = pipeline.run_groups(&groups, &pairings).await?;
    print_artifacts("Completed", &done);
    Ok(())
}

async fn handle_verify(
    config: AuditConfig,
    lang: Lang,
    prior: Option<PathBuf>,
    groups: &[ProtectedGroup],
    model: Option<String>,
) -> anyhow::Result<()> {
    let prior = prior.unwrap_or_else(|| config.paths.results_root.clone());
    let pipeline = build_pipeline(config, lang, model)?;
    tracing::info!(lang = %lang, prior = %prior.display(), "Starting verification pass");
    let done = pipeline.verify_groups(&selected(groups), &prior).await?;
    print_artifacts("Verified", &done);
    Ok(())
}

fn handle_evaluate(
    config: &AuditConfig,
    lang: Lang,
    root: Option<PathBuf>,
    experiment: Option<String>,
) -> anyhow::Result<()> {
    let store = ResultStore::new(root.unwrap_or_else(|| config.paths.results_root.clone()));
    let experiment = experiment.unwrap_or_else(|| default_experiment_id(&config.generator.model));
    let aggregator = MetricsAggregator::new(
        config.metrics.positive_keyword(lang),
        Arc::new(EmbeddingSimilarity::new(LocalEmbedder::new(
            config.metrics.embedding_dimensions,
        ))),
    );

    let rows = fairhire_core::evaluate(&store, lang, &experiment, &aggregator, &config.paths.report)?;
    if rows.is_empty() {
        println!("No artifacts found under {}", store.root().display());
        return Ok(());
    }
    for row in &rows {
        println!("{} ({})", row.protected_group, row.lang);
        if let Some(sim) = row.similarity {
            println!(
                "  feedback similarity  min {:.4}  median {:.4}  max {:.4}",
                sim.min, sim.median, sim.max
            );
        }
        for (attr, rate) in &row.decision_rate {
            let bias = row.bias.get(attr).copied().unwrap_or_default();
            println!("  {attr:<24} rate {rate:.4}  bias {bias:.4}");
        }
    }
    println!(
        "Appended {} rows to {}",
        rows.len(),
        config.paths.report.display()
    );
    Ok(())
}

fn handle_config(action: ConfigAction, config: &AuditConfig, workspace: &Path) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_path = workspace.join("fairhire.toml");
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }
            let toml_str = toml::to_string_pretty(&AuditConfig::default())?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            println!("{}", toml::to_string_pretty(config)?);
            Ok(())
        }
    }
}

fn build_pipeline(
    mut config: AuditConfig,
    lang: Lang,
    model: Option<String>,
) -> anyhow::Result<Pipeline> {
    if let Some(model) = model {
        config.generator.model = model;
    }
    let catalog = AttributeCatalog::load(
        &config.paths.protected_groups_dir,
        lang,
        config.sampling.name_sample,
        config.sampling.seed,
    )?;
    let generator = Arc::new(OpenAiCompatGenerator::new(&config.generator, lang)?);
    Ok(Pipeline::new(config, catalog, generator)?)
}

/// Every group when none were named on the command line.
fn selected(groups: &[ProtectedGroup]) -> Vec<ProtectedGroup> {
    if groups.is_empty() {
        ProtectedGroup::ALL.to_vec()
    } else {
        groups.to_vec()
    }
}

fn default_experiment_id(model: &str) -> String {
    format!("{model}-{}", chrono::Utc::now().format("%Y%m%dT%H%M%S"))
}

fn print_artifacts(verb: &str, done: &BTreeMap<ProtectedGroup, PathBuf>) {
    for (group, path) in done {
        println!("{verb} {group:<16} {}", path.display());
    }
}
