//! Segment-wide reconciliation and momento capture

use super::attach::{remove_synthetic_wrappers, set_status};
use super::classifier::Classifier;
use crate::command::Runtime;
use crate::error::SostenutoError;
use crate::indicators::IndicatorKind;
use crate::metadata::{Manifests, Momento, SegmentMetadata};
use crate::score::{ContextLevel, LeafId, Score, Tag, Wrapper, WrapperId};
use log::{debug, warn};
use std::collections::BTreeMap;

/// Reconcile every persistent indicator in `score`.
///
/// # Passes
/// 1. Warn about momentos naming contexts absent from the score.
/// 2. On the first leaf of every context, for every kind owned at that
///    context's level: drop stale synthetic wrappers, then synthesize a
///    REAPPLIED or DEFAULT wrapper when no explicit indicator is attached.
/// 3. Classify every explicit persistent wrapper in time order.
///
/// Returns the synthesized wrappers.
pub fn reconcile(score: &mut Score, runtime: &Runtime) -> Result<Vec<Wrapper>, SostenutoError> {
    if let Some(metadata) = &runtime.previous_metadata {
        let known: Vec<String> = [ContextLevel::Voice, ContextLevel::Staff, ContextLevel::Score]
            .iter()
            .flat_map(|level| score.contexts(*level))
            .collect();
        for context in metadata.contexts() {
            if !known.contains(context) {
                warn!("momentos for {} name a context absent from this segment", context);
            }
        }
    }

    let mut synthesized = Vec::new();
    for kind in IndicatorKind::ALL {
        let level = kind.level();
        for context in score.contexts(level) {
            let Some(leaf) = score.first_leaf_in(&context, level) else {
                continue;
            };
            remove_synthetic_wrappers(score, leaf, kind)?;
            let has_explicit = score
                .wrappers_on(leaf)
                .iter()
                .any(|w| !w.deactivate && w.indicator.kind() == Some(kind));
            if has_explicit {
                continue;
            }
            let classification = Classifier::new(score, runtime).classify(leaf, kind, None)?;
            if let Some(classification) = classification {
                debug!(
                    "{}: {} on leaf {}",
                    context,
                    classification.status.tag_word(kind),
                    leaf
                );
                let wrapper = score.attach(leaf, classification.indicator, Tag::default());
                if let Some(installed) = score.wrapper_mut(wrapper.id) {
                    installed.synthetic = true;
                    installed.status = Some(classification.status);
                    synthesized.push(installed.clone());
                }
            }
        }
    }

    let mut explicit: Vec<(WrapperId, LeafId, IndicatorKind)> = score
        .wrappers()
        .iter()
        .filter(|w| !w.synthetic)
        .filter_map(|w| w.indicator.kind().map(|kind| (w.id, w.leaf, kind)))
        .collect();
    explicit.sort_by(|a, b| {
        score
            .leaf(a.1)
            .start_offset
            .cmp(&score.leaf(b.1).start_offset)
            .then(a.0.cmp(&b.0))
    });
    for (id, leaf, kind) in explicit {
        let status = match score.wrapper(id) {
            Some(wrapper) => {
                let indicator = wrapper.indicator.clone();
                Classifier::new(score, runtime)
                    .classify(leaf, kind, Some(&indicator))?
                    .map(|c| c.status)
            }
            None => None,
        };
        if let Some(status) = status {
            set_status(score, id, status);
        }
    }
    Ok(synthesized)
}

/// Capture the persistent indicators in effect at the end of `score`.
///
/// The latest active wrapper of each kind wins per context. Momentos from
/// `previous` are carried forward for every (context, kind) the segment
/// leaves untouched.
pub fn collect_momentos(
    score: &Score,
    previous: Option<&SegmentMetadata>,
) -> BTreeMap<String, Vec<Momento>> {
    let mut latest: BTreeMap<String, BTreeMap<IndicatorKind, &Wrapper>> = BTreeMap::new();
    for wrapper in score.wrappers() {
        if wrapper.deactivate {
            continue;
        }
        let (Some(kind), Some(context)) = (wrapper.indicator.kind(), &wrapper.context) else {
            continue;
        };
        let slot = latest.entry(context.clone()).or_default().entry(kind);
        let offset = score.leaf(wrapper.leaf).start_offset;
        slot.and_modify(|current| {
            let current_offset = score.leaf(current.leaf).start_offset;
            if (offset, wrapper.id) > (current_offset, current.id) {
                *current = wrapper;
            }
        })
        .or_insert(wrapper);
    }

    let mut momentos: BTreeMap<String, Vec<Momento>> = BTreeMap::new();
    if let Some(previous) = previous {
        for (context, records) in &previous.persistent_indicators {
            for kind in IndicatorKind::ALL {
                let touched = latest
                    .get(context)
                    .map_or(false, |kinds| kinds.contains_key(&kind));
                if touched {
                    continue;
                }
                if let Some(momento) = records.iter().rev().find(|m| m.kind == kind) {
                    momentos.entry(context.clone()).or_default().push(momento.clone());
                }
            }
        }
    }
    for (context, kinds) in latest {
        for (kind, wrapper) in kinds {
            let Some(value) = wrapper.indicator.persistent_value() else {
                continue;
            };
            momentos.entry(context.clone()).or_default().push(Momento {
                context: context.clone(),
                kind,
                value,
                manifest: Manifests::manifest_name(kind).map(str::to_string),
                edition: None,
            });
        }
    }
    for records in momentos.values_mut() {
        records.sort_by_key(|m| m.kind);
    }
    momentos
}

/// Count wrappers by classification status.
pub fn status_counts(score: &Score) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();
    for status in score.wrappers().iter().filter_map(|w| w.status) {
        *counts.entry(status.name()).or_insert(0) += 1;
    }
    counts
}
