//! Recovery of structured decisions from raw generator text.
//!
//! The generator is asked for a single JSON object but routinely wraps it in
//! commentary or code fences, leaves a trailing comma, or stops mid-string.
//! `recover_response` tries a short list of repairs and otherwise keeps the
//! text verbatim; it never fails.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One accumulated generator result: a parsed object or the verbatim text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawResult {
    Structured(Map<String, Value>),
    Text(String),
}

impl RawResult {
    pub fn is_structured(&self) -> bool {
        matches!(self, RawResult::Structured(_))
    }

    /// Text written to the `raw_ai_decision` column.
    pub fn to_raw_string(&self) -> String {
        match self {
            RawResult::Structured(map) => {
                serde_json::to_string(map).unwrap_or_else(|_| String::new())
            }
            RawResult::Text(text) => text.clone(),
        }
    }

    /// Inverse of `to_raw_string`, used when reloading an artifact.
    pub fn from_raw_string(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => RawResult::Structured(map),
            _ => RawResult::Text(raw.to_string()),
        }
    }
}

/// Decision label and feedback extracted from a raw result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub decision: String,
    pub feedback: String,
}

impl Decision {
    /// Missing keys become empty strings. Unstructured text is kept as the
    /// feedback with an empty decision.
    pub fn from_raw(raw: &RawResult) -> Self {
        match raw {
            RawResult::Structured(map) => Self {
                decision: field_text(map.get("decision")),
                feedback: field_text(map.get("feedback")),
            },
            RawResult::Text(text) => Self {
                decision: String::new(),
                feedback: text.clone(),
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.decision.is_empty()
    }
}

fn field_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Parse a raw response, repairing the known malformations.
///
/// Tried in order: the trimmed text; the text without code fences; the span
/// from the first `{` to the last `}`; that span without trailing commas; and,
/// when no closing brace exists, the tail from the first `{` closed with `"}`.
/// Only JSON objects are accepted.
pub fn recover_response(raw: &str) -> RawResult {
    for candidate in repair_candidates(raw) {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&candidate) {
            return RawResult::Structured(map);
        }
    }
    RawResult::Text(raw.to_string())
}

fn repair_candidates(raw: &str) -> Vec<String> {
    let mut out = vec![raw.trim().to_string()];

    let unfenced = raw.replace("```json", "").replace("```", "");
    let unfenced = unfenced.trim();
    out.push(unfenced.to_string());

    if let Some(start) = unfenced.find('{') {
        match unfenced.rfind('}') {
            Some(end) if end > start => {
                let bounded = &unfenced[start..=end];
                out.push(bounded.to_string());
                out.push(strip_trailing_commas(bounded));
            }
            _ => out.push(format!("{}\"}}", &unfenced[start..])),
        }
    }
    out
}

/// Drop commas that directly precede a closing brace or bracket.
fn strip_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    for (i, &ch) in chars.iter().enumerate() {
        if ch == ',' {
            let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
            if matches!(next, Some('}') | Some(']')) {
                continue;
            }
        }
        out.push(ch);
    }
    out
}
