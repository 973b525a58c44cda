//! Protected-attribute leakage detection for candidate texts.
//!
//! Profiles that already mention a protected attribute would contaminate the
//! counterfactual comparison, so they are removed before sampling.

use crate::types::Lang;
use regex::Regex;
use std::collections::HashSet;

/// Predicate telling whether a text already reveals a protected attribute.
pub trait LeakageFilter: Send + Sync {
    /// Names of the rules that fire on `text`.
    fn matched_rules(&self, text: &str) -> Vec<String>;

    fn leaks(&self, text: &str) -> bool {
        !self.matched_rules(text).is_empty()
    }
}

/// Regex and name-list based leakage detector.
pub struct KeywordLeakageFilter {
    patterns: Vec<(String, Regex)>,
    names: HashSet<String>,
}

impl KeywordLeakageFilter {
    pub fn new(lang: Lang) -> Self {
        let pattern_defs: Vec<(&str, &str)> = match lang {
            Lang::En => vec![
                ("marital_status", r"(?i)marital status|married"),
                ("military_status", r"military"),
                ("religion", r"religion"),
                ("age", r"I am \d{1,3} years"),
                ("gender", r"female|male"),
            ],
            Lang::Uk => vec![
                ("marital_status", r"сімейний статус|заміжн|одружен"),
                ("military_status", r"військ"),
                ("religion", r"релігія"),
                ("age", r"(?i)мені \d{1,3} років"),
                ("gender", r"(?i)жінк|чоловік"),
            ],
        };
        let patterns = pattern_defs
            .into_iter()
            .filter_map(|(name, pat)| Regex::new(pat).ok().map(|re| (name.to_string(), re)))
            .collect();
        Self {
            patterns,
            names: HashSet::new(),
        }
    }

    /// Also flag texts containing any of these names as a whole word.
    pub fn with_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names.extend(names.into_iter().map(Into::into));
        self
    }

    fn contains_name(&self, text: &str) -> bool {
        !self.names.is_empty()
            && text
                .split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '-'))
                .any(|word| self.names.contains(word))
    }
}

impl LeakageFilter for KeywordLeakageFilter {
    fn matched_rules(&self, text: &str) -> Vec<String> {
        let mut hits: Vec<String> = self
            .patterns
            .iter()
            .filter(|(_, re)| re.is_match(text))
            .map(|(name, _)| name.clone())
            .collect();
        if self.contains_name(text) {
            hits.push("name".to_string());
        }
        hits
    }

    fn leaks(&self, text: &str) -> bool {
        self.patterns.iter().any(|(_, re)| re.is_match(text)) || self.contains_name(text)
    }
}
