//! Indicator attachment with classification

use super::classifier::Classifier;
use super::types::IndicatorStatus;
use crate::command::Runtime;
use crate::error::SostenutoError;
use crate::indicators::{Indicator, IndicatorKind};
use crate::score::{LeafId, Score, Tag, Wrapper, WrapperId};
use log::{debug, error};

/// Attach `indicator` to `leaf`, classifying it when it is persistent.
///
/// Synthetic wrappers of the same kind already on the leaf are removed in the
/// same call, before the new wrapper is installed.
pub fn attach_indicator(
    score: &mut Score,
    leaf: LeafId,
    indicator: Indicator,
    tag: Tag,
    runtime: &Runtime,
) -> Result<Wrapper, SostenutoError> {
    score.checked_leaf(leaf)?;
    let Some(kind) = indicator.kind() else {
        return Ok(score.attach(leaf, indicator, tag));
    };
    remove_synthetic_wrappers(score, leaf, kind)?;
    let status = Classifier::new(score, runtime)
        .classify(leaf, kind, Some(&indicator))?
        .map(|classification| classification.status);
    let mut wrapper = score.attach(leaf, indicator, tag);
    if let Some(status) = status {
        debug!("leaf {}: {}", leaf, status.tag_word(kind));
        set_status(score, wrapper.id, status);
        wrapper.status = Some(status);
    }
    Ok(wrapper)
}

/// Remove synthesized REAPPLIED and DEFAULT wrappers of `kind` from `leaf`.
///
/// More than one synthetic REAPPLIED wrapper of one kind on one leaf means
/// segment chaining went wrong upstream; every offender is logged and a
/// [`SostenutoError::ReappliedConflict`] is returned before anything is
/// removed.
pub fn remove_synthetic_wrappers(
    score: &mut Score,
    leaf: LeafId,
    kind: IndicatorKind,
) -> Result<Vec<Wrapper>, SostenutoError> {
    let synthetic: Vec<&Wrapper> = score
        .wrappers_on(leaf)
        .into_iter()
        .filter(|w| w.synthetic && w.indicator.kind() == Some(kind))
        .collect();
    let reapplied: Vec<&Wrapper> = synthetic
        .iter()
        .copied()
        .filter(|w| w.status == Some(IndicatorStatus::Reapplied))
        .collect();
    if reapplied.len() > 1 {
        for wrapper in &reapplied {
            error!("conflicting reapplied wrapper: {}", wrapper);
        }
        let wrappers = reapplied
            .iter()
            .map(|w| w.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(SostenutoError::ReappliedConflict {
            leaf: leaf.0,
            kind,
            count: reapplied.len(),
            wrappers,
        });
    }
    let ids: Vec<WrapperId> = synthetic.iter().map(|w| w.id).collect();
    Ok(ids.into_iter().filter_map(|id| score.detach(id)).collect())
}

pub(crate) fn set_status(score: &mut Score, id: WrapperId, status: IndicatorStatus) {
    if let Some(wrapper) = score.wrapper_mut(id) {
        wrapper.status = Some(status);
    }
}
