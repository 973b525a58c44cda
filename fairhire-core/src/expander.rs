//! Counterfactual expansion: one row per (pairing, attribute value).

use crate::catalog::AttributeCatalog;
use crate::error::PipelineResult;
use crate::types::{ExpandedRow, Lang, Pairing, ProtectedGroup};

/// Cross product of `pairings` and `attributes`, pairing-major.
///
/// Every row derived from a pairing carries that pairing's `item_id` as its
/// `group_id`.
pub fn expand(
    pairings: &[Pairing],
    group: ProtectedGroup,
    lang: Lang,
    attributes: &[String],
) -> Vec<ExpandedRow> {
    let label = group.label(lang);
    let mut rows = Vec::with_capacity(pairings.len() * attributes.len());
    for pairing in pairings {
        for attr in attributes {
            rows.push(ExpandedRow {
                group_id: pairing.item_id.clone(),
                candidate_id: pairing.candidate_id.clone(),
                job_id: pairing.job_id.clone(),
                lang: pairing.lang.clone(),
                protected_group: label.to_string(),
                protected_attr: attr.clone(),
                job_position: pairing.job_position.clone(),
                job_description: pairing.job_description.clone(),
                candidate_cv: pairing.cv.clone(),
            });
        }
    }
    rows
}

/// Expand using the catalog's values for `group`.
pub fn expand_with_catalog(
    pairings: &[Pairing],
    group: ProtectedGroup,
    catalog: &AttributeCatalog,
) -> PipelineResult<Vec<ExpandedRow>> {
    let attributes = catalog.attributes(group)?;
    Ok(expand(pairings, group, catalog.lang(), attributes))
}
