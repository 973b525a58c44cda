//! Per-group result artifacts and the cumulative report file.
//!
//! Artifacts are CSV with RFC 4180 quoting, since CVs and job descriptions
//! carry commas, quotes and newlines. One file per (language, protected group)
//! at `<root>/<lang>/<group>.csv`; its existence marks the group as done.

use crate::error::{PipelineError, PipelineResult};
use crate::persistence;
use crate::recovery::{Decision, RawResult};
use crate::types::{ExpandedRow, GenerationRequest, Lang, ProtectedGroup};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// Column order of a per-group artifact.
pub const ARTIFACT_COLUMNS: [&str; 12] = [
    "group_id",
    "candidate_id",
    "job_id",
    "lang",
    "protected_group",
    "protected_attr",
    "job_position",
    "job_description",
    "candidate_cv",
    "decision",
    "feedback",
    "raw_ai_decision",
];

/// One artifact row: the expanded row, its extracted decision and the raw result.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    pub row: ExpandedRow,
    pub decision: Decision,
    pub raw: RawResult,
}

impl ResultRecord {
    /// Second-pass request carrying this record's decision.
    pub fn to_verification_request(&self) -> GenerationRequest {
        let mut request = self.row.to_request();
        request.decision = Some(self.decision.decision.clone());
        request.feedback = Some(self.decision.feedback.clone());
        request
    }
}

/// Filesystem layout of per-group artifacts under one root.
#[derive(Debug, Clone)]
pub struct ResultStore {
    root: PathBuf,
}

impl ResultStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn group_path(&self, lang: Lang, group: ProtectedGroup) -> PathBuf {
        self.root.join(lang.code()).join(format!("{}.csv", group.id()))
    }

    pub fn checkpoint_path(&self, lang: Lang, group: ProtectedGroup) -> PathBuf {
        self.root
            .join(lang.code())
            .join(format!("{}.checkpoint.jsonl", group.id()))
    }

    pub fn exists(&self, lang: Lang, group: ProtectedGroup) -> bool {
        self.group_path(lang, group).is_file()
    }

    /// Write the artifact for one group. `rows` and `results` correspond
    /// positionally.
    pub fn write_group(
        &self,
        lang: Lang,
        group: ProtectedGroup,
        rows: &[ExpandedRow],
        results: &[RawResult],
    ) -> PipelineResult<PathBuf> {
        let path = self.group_path(lang, group);
        if rows.len() != results.len() {
            return Err(PipelineError::artifact(
                path.display(),
                format!("{} rows but {} results", rows.len(), results.len()),
            ));
        }

        let mut out = csv::format_record(&ARTIFACT_COLUMNS);
        for (row, raw) in rows.iter().zip(results) {
            let decision = Decision::from_raw(raw);
            let raw_text = raw.to_raw_string();
            out.push_str(&csv::format_record(&[
                row.group_id.as_str(),
                row.candidate_id.as_str(),
                row.job_id.as_str(),
                row.lang.as_str(),
                row.protected_group.as_str(),
                row.protected_attr.as_str(),
                row.job_position.as_str(),
                row.job_description.as_str(),
                row.candidate_cv.as_str(),
                decision.decision.as_str(),
                decision.feedback.as_str(),
                raw_text.as_str(),
            ]));
        }

        persistence::atomic_write(&path, out.as_bytes())?;
        info!(path = %path.display(), rows = rows.len(), "Wrote group artifact");
        Ok(path)
    }

    /// Load a group artifact. A missing file is an `Artifact` error.
    pub fn read_group(&self, lang: Lang, group: ProtectedGroup) -> PipelineResult<Vec<ResultRecord>> {
        read_artifact(&self.group_path(lang, group))
    }
}

/// Parse a per-group artifact file.
pub fn read_artifact(path: &Path) -> PipelineResult<Vec<ResultRecord>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| PipelineError::artifact(path.display(), e.to_string()))?;
    let mut records = csv::parse(&text).map_err(|e| PipelineError::artifact(path.display(), e))?;
    if records.is_empty() {
        return Err(PipelineError::artifact(path.display(), "missing header"));
    }
    let header = records.remove(0);
    let index: HashMap<&str, usize> = header
        .iter()
        .enumerate()
        .map(|(i, name)| (name.as_str(), i))
        .collect();
    let mut columns = [0usize; ARTIFACT_COLUMNS.len()];
    for (slot, name) in columns.iter_mut().zip(ARTIFACT_COLUMNS) {
        *slot = *index
            .get(name)
            .ok_or_else(|| PipelineError::artifact(path.display(), format!("missing column '{name}'")))?;
    }

    records
        .into_iter()
        .enumerate()
        .map(|(line, fields)| {
            let get = |col: usize| -> PipelineResult<String> {
                fields.get(columns[col]).cloned().ok_or_else(|| {
                    PipelineError::artifact(
                        path.display(),
                        format!("record {} has {} fields", line + 1, fields.len()),
                    )
                })
            };
            Ok(ResultRecord {
                row: ExpandedRow {
                    group_id: get(0)?,
                    candidate_id: get(1)?,
                    job_id: get(2)?,
                    lang: get(3)?,
                    protected_group: get(4)?,
                    protected_attr: get(5)?,
                    job_position: get(6)?,
                    job_description: get(7)?,
                    candidate_cv: get(8)?,
                },
                decision: Decision {
                    decision: get(9)?,
                    feedback: get(10)?,
                },
                raw: RawResult::from_raw_string(&get(11)?),
            })
        })
        .collect()
}

/// Append rows to a CSV report, writing `header` only when the file is new.
///
/// An existing report with a different header is rejected rather than mixed.
pub fn append_report(path: &Path, header: &[&str], rows: &[Vec<String>]) -> PipelineResult<()> {
    let mut out = if path.exists() {
        let existing = std::fs::read_to_string(path)?;
        let parsed = csv::parse(&existing).map_err(|e| PipelineError::artifact(path.display(), e))?;
        if let Some(first) = parsed.first()
            && first.iter().map(String::as_str).ne(header.iter().copied())
        {
            return Err(PipelineError::artifact(
                path.display(),
                "report header does not match",
            ));
        }
        if parsed.is_empty() {
            csv::format_record(header)
        } else {
            existing
        }
    } else {
        csv::format_record(header)
    };

    for row in rows {
        let fields: Vec<&str> = row.iter().map(String::as_str).collect();
        out.push_str(&csv::format_record(&fields));
    }
    persistence::atomic_write(path, out.as_bytes())?;
    info!(path = %path.display(), appended = rows.len(), "Updated report");
    Ok(())
}

/// Minimal RFC 4180 reader and writer.
pub mod csv {
    /// Format one record, quoting fields that need it, terminated by `\n`.
    pub fn format_record(fields: &[&str]) -> String {
        let mut line = String::new();
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                line.push(',');
            }
            if field.contains([',', '"', '\n', '\r']) {
                line.push('"');
                line.push_str(&field.replace('"', "\"\""));
                line.push('"');
            } else {
                line.push_str(field);
            }
        }
        line.push('\n');
        line
    }

    /// Parse CSV text into records. Quoted fields may span lines.
    pub fn parse(text: &str) -> Result<Vec<Vec<String>>, String> {
        let mut records = Vec::new();
        let mut record: Vec<String> = Vec::new();
        let mut field = String::new();
        let mut in_quotes = false;
        let mut chars = text.chars().peekable();

        while let Some(ch) = chars.next() {
            if in_quotes {
                match ch {
                    '"' if chars.peek() == Some(&'"') => {
                        chars.next();
                        field.push('"');
                    }
                    '"' => in_quotes = false,
                    _ => field.push(ch),
                }
                continue;
            }
            match ch {
                '"' if field.is_empty() => in_quotes = true,
                ',' => record.push(std::mem::take(&mut field)),
                '\r' if chars.peek() == Some(&'\n') => {}
                '\n' => {
                    record.push(std::mem::take(&mut field));
                    records.push(std::mem::take(&mut record));
                }
                _ => field.push(ch),
            }
        }

        if in_quotes {
            return Err("unterminated quoted field".to_string());
        }
        if !field.is_empty() || !record.is_empty() {
            record.push(field);
            records.push(record);
        }
        Ok(records)
    }
}
