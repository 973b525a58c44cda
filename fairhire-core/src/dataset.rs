//! Corpus loading: candidate profiles, job postings and the candidate->job match table.

use crate::error::{PipelineError, PipelineResult};
use crate::filter::LeakageFilter;
use crate::types::{CandidateProfile, JobPosting};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::Path;

/// Candidate id -> compatible job ids, in table order.
pub type MatchTable = HashMap<String, Vec<String>>;

/// Load records from a JSON array, a single JSON object, or JSON Lines.
pub fn load_records<T: DeserializeOwned>(path: &Path) -> PipelineResult<Vec<T>> {
    let content = std::fs::read_to_string(path)?;
    let trimmed = content.trim_start();

    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed)
            .map_err(|e| PipelineError::artifact(path.display(), e.to_string()));
    }

    let mut items = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let item = serde_json::from_str(line).map_err(|e| {
            PipelineError::artifact(path.display(), format!("line {}: {e}", line_no + 1))
        })?;
        items.push(item);
    }
    Ok(items)
}

pub fn load_candidates(path: &Path) -> PipelineResult<Vec<CandidateProfile>> {
    load_records(path)
}

pub fn load_jobs(path: &Path) -> PipelineResult<Vec<JobPosting>> {
    load_records(path)
}

pub fn load_match_table(path: &Path) -> PipelineResult<MatchTable> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| PipelineError::artifact(path.display(), e.to_string()))
}

/// Drop profiles whose CV already reveals a protected attribute.
pub fn filter_candidates(
    candidates: Vec<CandidateProfile>,
    filter: &dyn LeakageFilter,
) -> Vec<CandidateProfile> {
    let before = candidates.len();
    let kept: Vec<CandidateProfile> = candidates
        .into_iter()
        .filter(|c| {
            let rules = filter.matched_rules(&c.cv);
            if !rules.is_empty() {
                tracing::debug!(candidate = %c.id, rules = ?rules, "Dropping leaking profile");
            }
            rules.is_empty()
        })
        .collect();
    tracing::info!(
        before,
        after = kept.len(),
        "Filtered candidates with protected-attribute leakage"
    );
    kept
}

/// Job postings indexed by id.
pub fn index_jobs(jobs: Vec<JobPosting>) -> HashMap<String, JobPosting> {
    jobs.into_iter().map(|j| (j.id.clone(), j)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::KeywordLeakageFilter;
    use crate::types::Lang;
    use tempfile::TempDir;

    #[test]
    fn test_load_json_array_and_jsonl() {
        let dir = TempDir::new().unwrap();
        let array = dir.path().join("jobs.json");
        std::fs::write(
            &array,
            r#"[{"id":"j1","Long Description":"Build APIs","Position":"Python Developer"}]"#,
        )
        .unwrap();
        let jobs = load_jobs(&array).unwrap();
        assert_eq!(jobs[0].position, "Python Developer");

        let lines = dir.path().join("candidates.jsonl");
        std::fs::write(
            &lines,
            "{\"id\":\"c1\",\"CV\":\"a\",\"Position\":\"QA Engineer\",\"CV_lang\":\"en\"}\n\n{\"id\":\"c2\",\"CV\":\"b\",\"Position\":\"QA Engineer\",\"CV_lang\":\"en\"}\n",
        )
        .unwrap();
        let candidates = load_candidates(&lines).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[1].id, "c2");
    }

    #[test]
    fn test_bad_jsonl_line_reports_position() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.jsonl");
        std::fs::write(&path, "{\"id\":\"j1\",\"Long Description\":\"x\",\"Position\":\"y\"}\n{oops\n").unwrap();
        let err = load_jobs(&path).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_match_table() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("groups.json");
        std::fs::write(&path, r#"{"c1": ["j1", "j2", "j3"], "c2": []}"#).unwrap();
        let table = load_match_table(&path).unwrap();
        assert_eq!(table["c1"], vec!["j1", "j2", "j3"]);
        assert!(table["c2"].is_empty());
    }

    #[test]
    fn test_filter_candidates() {
        let make = |id: &str, cv: &str| CandidateProfile {
            id: id.into(),
            cv: cv.into(),
            position: "QA Engineer".into(),
            lang: "en".into(),
        };
        let kept = filter_candidates(
            vec![make("c1", "I am 40 years old"), make("c2", "Selenium, Cypress")],
            &KeywordLeakageFilter::new(Lang::En),
        );
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "c2");
    }
}
