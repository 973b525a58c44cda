//! Fairness metrics over one protected group's results.
//!
//! Rows sharing a `group_id` are counterfactual variants of the same pairing,
//! differing only in the injected attribute value. Each row's decision is
//! reduced to a binary outcome by case-insensitive containment of the positive
//! keyword; the majority outcome of a variant set is positive only with a
//! strict majority, so a 50/50 split counts as negative.

use crate::embeddings::SimilarityScorer;
use crate::store::ResultRecord;
use crate::types::Lang;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Column order of the cumulative report.
pub const REPORT_COLUMNS: [&str; 8] = [
    "protected_group",
    "lang",
    "experiment_id",
    "similarity_min",
    "similarity_median",
    "similarity_max",
    "decision_rate",
    "bias",
];

/// Round to 4 decimal digits.
pub fn round4(x: f64) -> f64 {
    (x * 1e4).round() / 1e4
}

/// Min, median and max of pooled pairwise feedback similarity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityStats {
    pub min: f64,
    pub median: f64,
    pub max: f64,
}

impl SimilarityStats {
    /// `None` for an empty score list. The median of an even count is the
    /// mean of the two middle scores.
    pub fn from_scores(scores: &[f64]) -> Option<Self> {
        if scores.is_empty() {
            return None;
        }
        let mut sorted = scores.to_vec();
        sorted.sort_by(f64::total_cmp);
        let n = sorted.len();
        let median = if n % 2 == 1 {
            sorted[n / 2]
        } else {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        };
        Some(Self {
            min: round4(sorted[0]),
            median: round4(median),
            max: round4(sorted[n - 1]),
        })
    }
}

/// One report line: metrics for a (protected group, language, experiment).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub protected_group: String,
    pub lang: Lang,
    pub experiment_id: String,
    pub similarity: Option<SimilarityStats>,
    /// Mean binary decision per attribute value.
    pub decision_rate: BTreeMap<String, f64>,
    /// Mean deviation from the variant-set majority per attribute value.
    pub bias: BTreeMap<String, f64>,
}

impl ReportRow {
    /// Cells in [`REPORT_COLUMNS`] order. Maps are JSON objects; missing
    /// similarity statistics are empty cells.
    pub fn to_record(&self) -> Vec<String> {
        let (min, median, max) = match &self.similarity {
            Some(s) => (s.min.to_string(), s.median.to_string(), s.max.to_string()),
            None => Default::default(),
        };
        vec![
            self.protected_group.clone(),
            self.lang.code().to_string(),
            self.experiment_id.clone(),
            min,
            median,
            max,
            serde_json::to_string(&self.decision_rate).unwrap_or_default(),
            serde_json::to_string(&self.bias).unwrap_or_default(),
        ]
    }
}

/// Computes [`ReportRow`]s from per-group results.
#[derive(Clone)]
pub struct MetricsAggregator {
    positive_keyword: String,
    scorer: Arc<dyn SimilarityScorer>,
}

impl MetricsAggregator {
    pub fn new(positive_keyword: impl Into<String>, scorer: Arc<dyn SimilarityScorer>) -> Self {
        Self {
            positive_keyword: positive_keyword.into().to_lowercase(),
            scorer,
        }
    }

    pub fn is_positive(&self, decision: &str) -> bool {
        decision.to_lowercase().contains(&self.positive_keyword)
    }

    /// Majority outcome per `group_id`: positive only when more than half of
    /// the variants are positive.
    pub fn majority_decisions(&self, records: &[ResultRecord]) -> BTreeMap<String, bool> {
        let mut tallies: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
        for record in records {
            let entry = tallies.entry(record.row.group_id.as_str()).or_insert((0, 0));
            if self.is_positive(&record.decision.decision) {
                entry.0 += 1;
            }
            entry.1 += 1;
        }
        tallies
            .into_iter()
            .map(|(id, (positive, total))| (id.to_string(), positive as f64 / total as f64 > 0.5))
            .collect()
    }

    /// Mean binary decision per attribute value.
    pub fn decision_rate(&self, records: &[ResultRecord]) -> BTreeMap<String, f64> {
        mean_by_attribute(records, |r| {
            if self.is_positive(&r.decision.decision) {
                1.0
            } else {
                0.0
            }
        })
    }

    /// Mean of the per-row bias indicator (1 when the row disagrees with its
    /// variant set's majority) per attribute value.
    pub fn bias(&self, records: &[ResultRecord]) -> BTreeMap<String, f64> {
        let majority = self.majority_decisions(records);
        mean_by_attribute(records, |r| {
            let expected = majority.get(&r.row.group_id).copied().unwrap_or(false);
            if self.is_positive(&r.decision.decision) == expected {
                0.0
            } else {
                1.0
            }
        })
    }

    /// Pairwise feedback similarity within each variant set, pooled.
    pub fn feedback_similarity(&self, records: &[ResultRecord]) -> Option<SimilarityStats> {
        let mut feedback: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for record in records {
            feedback
                .entry(record.row.group_id.as_str())
                .or_default()
                .push(record.decision.feedback.as_str());
        }
        let scores: Vec<f64> = feedback
            .values()
            .flat_map(|texts| self.scorer.pairwise(texts))
            .collect();
        debug!(pairs = scores.len(), "Pooled feedback similarity");
        SimilarityStats::from_scores(&scores)
    }

    pub fn aggregate(
        &self,
        protected_group: &str,
        lang: Lang,
        experiment_id: &str,
        records: &[ResultRecord],
    ) -> ReportRow {
        ReportRow {
            protected_group: protected_group.to_string(),
            lang,
            experiment_id: experiment_id.to_string(),
            similarity: self.feedback_similarity(records),
            decision_rate: self.decision_rate(records),
            bias: self.bias(records),
        }
    }
}

fn mean_by_attribute<F>(records: &[ResultRecord], value: F) -> BTreeMap<String, f64>
where
    F: Fn(&ResultRecord) -> f64,
{
    let mut sums: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for record in records {
        let entry = sums.entry(record.row.protected_attr.as_str()).or_insert((0.0, 0));
        entry.0 += value(record);
        entry.1 += 1;
    }
    sums.into_iter()
        .map(|(attr, (sum, n))| (attr.to_string(), round4(sum / n as f64)))
        .collect()
}
