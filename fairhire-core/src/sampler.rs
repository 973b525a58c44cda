//! Stratified candidate sampling and (candidate, job) pairing.
//!
//! Candidates are drawn category by category (position labels) with a per-pass
//! cap, cycling over the categories until the candidate target is met or no
//! category yields anything new. All shuffles are seeded, so the same pool,
//! match table and seed always give the same pairings in the same order.

use crate::config::SamplingConfig;
use crate::dataset::MatchTable;
use crate::error::{PipelineError, PipelineResult};
use crate::types::{CandidateProfile, JobPosting, Lang, Pairing};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::{HashMap, HashSet};

/// Position categories used for English corpora.
pub const PRIMARY_POSITIONS: [&str; 30] = [
    "QA Engineer",
    "Project Manager",
    "Front-end developer",
    "Manual QA Engineer",
    "UI/UX Designer",
    "Java Developer",
    "IT Recruiter",
    "Python Developer",
    "Business Analyst",
    ".NET Developer",
    "Data Analyst",
    "iOS Developer",
    "Full Stack Web Developer",
    "React Developer",
    "Graphic Designer",
    "Software Engineer",
    "DevOps engineer",
    "Marketing Manager",
    "Product manager",
    "HR manager",
    "Sales Manager",
    "PHP Developer",
    "Android Developer",
    "Node.js developer",
    "Data Scientist",
    "JavaScript Developer",
    "Automation QA Engineer",
    "3D Artist",
    "Product Designer",
    "Web Developer",
];

/// How position categories are enumerated.
#[derive(Debug, Clone, PartialEq)]
pub enum PositionStrategy {
    /// Iterate this list, matching position labels exactly.
    Fixed(Vec<String>),
    /// Iterate the pool's own lower-cased labels, most frequent first.
    FrequencyRanked,
}

impl PositionStrategy {
    pub fn for_lang(lang: Lang) -> Self {
        match lang {
            Lang::En => Self::Fixed(PRIMARY_POSITIONS.iter().map(|p| p.to_string()).collect()),
            Lang::Uk => Self::FrequencyRanked,
        }
    }

    fn key(&self, position: &str) -> String {
        match self {
            Self::Fixed(_) => position.to_string(),
            Self::FrequencyRanked => position.trim().to_lowercase(),
        }
    }
}

/// Selects a stratified subset of candidates and pairs each with its jobs.
#[derive(Debug, Clone)]
pub struct Sampler {
    seed: u64,
    target_total: usize,
    jobs_per_candidate: usize,
    per_category_cap: usize,
    strategy: PositionStrategy,
}

impl Sampler {
    pub fn new(config: &SamplingConfig, strategy: PositionStrategy) -> Self {
        Self {
            seed: config.seed,
            target_total: config.target_total,
            jobs_per_candidate: config.jobs_per_candidate.max(1),
            per_category_cap: config.per_category_cap.max(1),
            strategy,
        }
    }

    /// Number of candidates needed to reach `target_total` pairings.
    pub fn candidate_target(&self) -> usize {
        self.target_total.div_ceil(self.jobs_per_candidate)
    }

    /// Pick candidates from `pool`, returned in pool order.
    pub fn sample<'a>(
        &self,
        pool: &'a [CandidateProfile],
        matches: &MatchTable,
    ) -> PipelineResult<Vec<&'a CandidateProfile>> {
        let eligible: Vec<&CandidateProfile> = pool
            .iter()
            .filter(|c| {
                matches
                    .get(&c.id)
                    .is_some_and(|jobs| jobs.len() >= self.jobs_per_candidate)
            })
            .collect();

        if eligible.len() < self.target_total {
            return Err(PipelineError::InsufficientData {
                available: eligible.len(),
                required: self.target_total,
            });
        }

        let by_category = self.group_by_category(&eligible);
        let categories = self.categories(&eligible);
        let target = self.candidate_target();

        let mut selected: Vec<&str> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();

        'passes: loop {
            let mut added_this_pass = 0;
            for category in &categories {
                let Some(ids) = by_category.get(category) else {
                    continue;
                };
                if ids.len() < self.per_category_cap {
                    continue;
                }

                let mut shuffled = ids.clone();
                let mut rng = StdRng::seed_from_u64(self.seed);
                shuffled.shuffle(&mut rng);

                let mut taken = 0;
                for id in shuffled {
                    if seen.insert(id) {
                        selected.push(id);
                        taken += 1;
                        added_this_pass += 1;
                    }
                    if selected.len() >= target || taken >= self.per_category_cap {
                        break;
                    }
                }
                if selected.len() >= target {
                    break 'passes;
                }
            }
            if added_this_pass == 0 {
                tracing::warn!(
                    selected = selected.len(),
                    target,
                    "Position categories exhausted before reaching sample target"
                );
                break;
            }
        }

        tracing::info!(
            selected = selected.len(),
            eligible = eligible.len(),
            "Sampled candidates"
        );
        Ok(eligible
            .into_iter()
            .filter(|c| seen.contains(c.id.as_str()))
            .collect())
    }

    /// Pair every sampled candidate with its first `jobs_per_candidate`
    /// compatible jobs after a seeded shuffle.
    pub fn pair(
        &self,
        sampled: &[&CandidateProfile],
        matches: &MatchTable,
        jobs: &HashMap<String, JobPosting>,
    ) -> PipelineResult<Vec<Pairing>> {
        let mut pairings = Vec::with_capacity(sampled.len() * self.jobs_per_candidate);
        for candidate in sampled {
            let Some(job_ids) = matches.get(&candidate.id) else {
                continue;
            };
            let mut job_ids = job_ids.clone();
            let mut rng = StdRng::seed_from_u64(self.seed);
            job_ids.shuffle(&mut rng);

            for job_id in job_ids.iter().take(self.jobs_per_candidate) {
                let job = jobs.get(job_id).ok_or_else(|| {
                    PipelineError::dataset(format!(
                        "job '{job_id}' matched to candidate '{}' has no posting",
                        candidate.id
                    ))
                })?;
                pairings.push(Pairing {
                    item_id: Pairing::compose_item_id(&candidate.id, job_id),
                    candidate_id: candidate.id.clone(),
                    job_id: job_id.clone(),
                    cv: candidate.cv.clone(),
                    job_description: job.description.clone(),
                    job_position: job.position.clone(),
                    lang: candidate.lang.clone(),
                });
            }
        }
        Ok(pairings)
    }

    /// Sample then pair in one step.
    pub fn build_pairings(
        &self,
        pool: &[CandidateProfile],
        matches: &MatchTable,
        jobs: &HashMap<String, JobPosting>,
    ) -> PipelineResult<Vec<Pairing>> {
        let sampled = self.sample(pool, matches)?;
        self.pair(&sampled, matches, jobs)
    }

    fn group_by_category<'a>(
        &self,
        eligible: &[&'a CandidateProfile],
    ) -> HashMap<String, Vec<&'a str>> {
        let mut groups: HashMap<String, Vec<&'a str>> = HashMap::new();
        for candidate in eligible {
            let ids = groups.entry(self.strategy.key(&candidate.position)).or_default();
            if !ids.contains(&candidate.id.as_str()) {
                ids.push(candidate.id.as_str());
            }
        }
        groups
    }

    fn categories(&self, eligible: &[&CandidateProfile]) -> Vec<String> {
        match &self.strategy {
            PositionStrategy::Fixed(list) => list.clone(),
            PositionStrategy::FrequencyRanked => {
                // (count, first index) so ties keep pool order.
                let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
                for (idx, candidate) in eligible.iter().enumerate() {
                    let entry = counts
                        .entry(self.strategy.key(&candidate.position))
                        .or_insert((0, idx));
                    entry.0 += 1;
                }
                let mut ranked: Vec<(String, (usize, usize))> = counts.into_iter().collect();
                ranked.sort_by(|a, b| b.1.0.cmp(&a.1.0).then(a.1.1.cmp(&b.1.1)));
                ranked.into_iter().map(|(k, _)| k).collect()
            }
        }
    }
}
