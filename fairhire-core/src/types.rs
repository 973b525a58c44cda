//! Core data model: profiles, postings, pairings and counterfactual rows.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Language of a corpus and of everything rendered from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    En,
    Uk,
}

impl Lang {
    pub fn code(&self) -> &'static str {
        match self {
            Lang::En => "en",
            Lang::Uk => "uk",
        }
    }

    /// Suffix of the attribute list files for this language.
    pub fn file_suffix(&self) -> &'static str {
        match self {
            Lang::En => "en",
            Lang::Uk => "ukr",
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.code())
    }
}

impl FromStr for Lang {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Lang::En),
            "uk" | "ua" | "ukrainian" => Ok(Lang::Uk),
            other => Err(format!("unsupported language '{other}'")),
        }
    }
}

/// A protected-attribute category whose values are injected into pairings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtectedGroup {
    Gender,
    MaritalStatus,
    MilitaryStatus,
    Religion,
    Name,
    Age,
}

impl ProtectedGroup {
    /// Every group, in the order a full run processes them.
    pub const ALL: [ProtectedGroup; 6] = [
        ProtectedGroup::Gender,
        ProtectedGroup::MaritalStatus,
        ProtectedGroup::MilitaryStatus,
        ProtectedGroup::Religion,
        ProtectedGroup::Name,
        ProtectedGroup::Age,
    ];

    /// Stable identifier, used for file names.
    pub fn id(&self) -> &'static str {
        match self {
            ProtectedGroup::Gender => "gender",
            ProtectedGroup::MaritalStatus => "marital_status",
            ProtectedGroup::MilitaryStatus => "military_status",
            ProtectedGroup::Religion => "religion",
            ProtectedGroup::Name => "name",
            ProtectedGroup::Age => "age",
        }
    }

    /// Label shown to the generator and written to the `protected_group` column.
    pub fn label(&self, lang: Lang) -> &'static str {
        match lang {
            Lang::En => self.id(),
            Lang::Uk => match self {
                ProtectedGroup::Gender => "стать",
                ProtectedGroup::MaritalStatus => "сімейний статус",
                ProtectedGroup::MilitaryStatus => "військовий статус",
                ProtectedGroup::Religion => "релігія",
                ProtectedGroup::Name => "ім'я",
                ProtectedGroup::Age => "вік",
            },
        }
    }
}

impl fmt::Display for ProtectedGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.id())
    }
}

impl FromStr for ProtectedGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProtectedGroup::ALL
            .into_iter()
            .find(|g| g.id() == s || g.label(Lang::Uk) == s)
            .ok_or_else(|| format!("unknown protected group '{s}'"))
    }
}

/// A candidate profile as published in the source corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub id: String,
    #[serde(rename = "CV")]
    pub cv: String,
    #[serde(rename = "Position")]
    pub position: String,
    #[serde(rename = "CV_lang", default)]
    pub lang: String,
}

/// A job posting as published in the source corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: String,
    #[serde(rename = "Long Description")]
    pub description: String,
    #[serde(rename = "Position")]
    pub position: String,
}

/// One (candidate, job) pairing with both texts joined in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pairing {
    pub item_id: String,
    pub candidate_id: String,
    pub job_id: String,
    pub cv: String,
    pub job_description: String,
    pub job_position: String,
    pub lang: String,
}

impl Pairing {
    pub fn compose_item_id(candidate_id: &str, job_id: &str) -> String {
        format!("{candidate_id}_{job_id}")
    }
}

/// One pairing with one protected-attribute value injected.
///
/// `group_id` is the originating pairing's `item_id` and is shared by every
/// variant derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpandedRow {
    pub group_id: String,
    pub candidate_id: String,
    pub job_id: String,
    pub lang: String,
    pub protected_group: String,
    pub protected_attr: String,
    pub job_position: String,
    pub job_description: String,
    pub candidate_cv: String,
}

impl ExpandedRow {
    /// First-pass request for this row.
    pub fn to_request(&self) -> GenerationRequest {
        GenerationRequest {
            job_desc: self.job_description.clone(),
            candidate_cv: self.candidate_cv.clone(),
            protected_group: self.protected_group.clone(),
            protected_attr: self.protected_attr.clone(),
            decision: None,
            feedback: None,
        }
    }
}

/// The unit handed to the decision generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub job_desc: String,
    pub candidate_cv: String,
    pub protected_group: String,
    pub protected_attr: String,
    /// Prior decision, present only for second-pass verification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

impl GenerationRequest {
    pub fn is_verification(&self) -> bool {
        self.decision.is_some() || self.feedback.is_some()
    }
}
