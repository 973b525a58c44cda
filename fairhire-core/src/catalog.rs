//! Attribute catalog: the ordered values injected for each protected group.

use crate::error::{PipelineError, PipelineResult};
use crate::types::{Lang, ProtectedGroup};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::path::Path;

/// Fixed age band injected for the `age` group.
pub const AGE_BAND: [u32; 6] = [20, 30, 40, 50, 60, 70];

/// Supplies the attribute values to inject for each protected group.
#[derive(Debug, Clone)]
pub struct AttributeCatalog {
    lang: Lang,
    values: HashMap<ProtectedGroup, Vec<String>>,
}

impl AttributeCatalog {
    /// Build a catalog from explicit lists. `age` is filled in when absent.
    pub fn from_lists(lang: Lang, lists: HashMap<ProtectedGroup, Vec<String>>) -> Self {
        let mut values = lists;
        values
            .entry(ProtectedGroup::Age)
            .or_insert_with(age_values);
        Self { lang, values }
    }

    /// Load every group's values from `dir`.
    ///
    /// Layout: `<dir>/<group>_<suffix>.txt` for the fixed-list groups and
    /// `<dir>/names/<lang>/{female,male}.txt` for names.
    pub fn load(dir: &Path, lang: Lang, name_sample: usize, seed: u64) -> PipelineResult<Self> {
        let mut values = HashMap::new();
        for group in [
            ProtectedGroup::Gender,
            ProtectedGroup::MaritalStatus,
            ProtectedGroup::MilitaryStatus,
            ProtectedGroup::Religion,
        ] {
            let path = dir.join(format!("{}_{}.txt", group.id(), lang.file_suffix()));
            values.insert(group, read_value_list(&path)?);
        }

        let (female, male) = read_name_lists(dir, lang)?;
        values.insert(
            ProtectedGroup::Name,
            sample_names(female, male, name_sample, seed),
        );
        values.insert(ProtectedGroup::Age, age_values());

        tracing::debug!(lang = %lang, dir = %dir.display(), "Loaded attribute catalog");
        Ok(Self { lang, values })
    }

    pub fn lang(&self) -> Lang {
        self.lang
    }

    /// Ordered attribute values for `group`.
    pub fn attributes(&self, group: ProtectedGroup) -> PipelineResult<&[String]> {
        self.values
            .get(&group)
            .map(Vec::as_slice)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                PipelineError::fatal_config(format!(
                    "no attribute values for group '{group}' ({})",
                    self.lang
                ))
            })
    }
}

fn age_values() -> Vec<String> {
    AGE_BAND.iter().map(|a| a.to_string()).collect()
}

/// Every listed name for `lang`, female then male. Used to detect CVs that
/// already name their author.
pub fn load_all_names(dir: &Path, lang: Lang) -> PipelineResult<Vec<String>> {
    let (mut female, male) = read_name_lists(dir, lang)?;
    female.extend(male);
    Ok(female)
}

fn read_name_lists(dir: &Path, lang: Lang) -> PipelineResult<(Vec<String>, Vec<String>)> {
    let names_dir = dir.join("names").join(lang.code());
    let female = read_name_file(&names_dir.join("female.txt"))?;
    let male = read_name_file(&names_dir.join("male.txt"))?;
    Ok((female, male))
}

/// Shuffle each name list with `seed` and take the same count from each,
/// female first. The count is `n / 2`, capped by the shorter list.
pub fn sample_names(
    mut female: Vec<String>,
    mut male: Vec<String>,
    n: usize,
    seed: u64,
) -> Vec<String> {
    let half = (n / 2).min(female.len()).min(male.len());
    if half < n / 2 {
        tracing::warn!(
            requested = n / 2,
            female = female.len(),
            male = male.len(),
            "Name lists too short, sampling {half} per list"
        );
    }
    let mut out = Vec::with_capacity(half * 2);
    for names in [&mut female, &mut male] {
        let mut rng = StdRng::seed_from_u64(seed);
        names.shuffle(&mut rng);
        out.extend(names.iter().take(half).cloned());
    }
    out
}

fn read_value_list(path: &Path) -> PipelineResult<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        PipelineError::fatal_config(format!(
            "cannot read attribute list {}: {e}",
            path.display()
        ))
    })?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

/// Name files carry one name per line, optionally followed by other columns.
fn read_name_file(path: &Path) -> PipelineResult<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        PipelineError::fatal_config(format!("cannot read name list {}: {e}", path.display()))
    })?;
    Ok(content
        .lines()
        .filter_map(|l| l.split_whitespace().next())
        .map(str::to_string)
        .collect())
}
