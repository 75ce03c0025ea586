//! Persistent-indicator classification
//!
//! Decides whether an attachment is DEFAULT, EXPLICIT, REAPPLIED or REDUNDANT
//! from the leaf's position in its owning context, the indicators already
//! attached earlier in this segment, the previous segment's momentos and the
//! score-template defaults.

use super::types::{Classification, IndicatorStatus};
use crate::command::Runtime;
use crate::error::SostenutoError;
use crate::indicators::{Indicator, IndicatorKind};
use crate::score::{ContextLevel, LeafId, Score, Wrapper};

/// Read-only view over a score and its runtime used to classify attachments.
pub struct Classifier<'a> {
    score: &'a Score,
    runtime: &'a Runtime,
}

impl<'a> Classifier<'a> {
    pub fn new(score: &'a Score, runtime: &'a Runtime) -> Self {
        Self { score, runtime }
    }

    /// Classify the `kind` indicator at `leaf`.
    ///
    /// `explicit` is the indicator being attached, or `None` when asking what
    /// (if anything) should be synthesized at the leaf. Returns `None` when
    /// nothing is attached and nothing is carried or defaulted.
    ///
    /// # Rules
    /// - Not the context's first leaf: compare the explicit indicator with the
    ///   latest same-kind indicator earlier in the segment (falling back to
    ///   the carried momento, then the template default).
    /// - First leaf: compare with the previous segment's momento; with no
    ///   explicit indicator the momento is REAPPLIED, else the default is
    ///   DEFAULT.
    /// - Sforzando dynamics, and dynamics following a hairpin start, are
    ///   always EXPLICIT.
    pub fn classify(
        &self,
        leaf: LeafId,
        kind: IndicatorKind,
        explicit: Option<&Indicator>,
    ) -> Result<Option<Classification>, SostenutoError> {
        self.score.checked_leaf(leaf)?;
        if let Some(indicator) = explicit {
            if indicator.kind() != Some(kind) {
                return Err(SostenutoError::SpecifierError(format!(
                    "{} is not a {} indicator",
                    indicator.type_name(),
                    kind
                )));
            }
        }
        let level = kind.level();
        let context = self.score.context_name(leaf, level);

        if !self.score.is_first_leaf(leaf, level) {
            let Some(indicator) = explicit else {
                return Ok(None);
            };
            let previous = match self.previous_in_segment(leaf, kind, &context) {
                Some(wrapper) => Some(wrapper.indicator.clone()),
                None => match self.carried(&context, kind)? {
                    Some(carried) => Some(carried),
                    None => self.default(&context, kind),
                },
            };
            return Ok(Some(Classification {
                status: compare(indicator, previous.as_ref()),
                indicator: indicator.clone(),
            }));
        }

        let carried = self.carried(&context, kind)?;
        let classification = match (explicit, carried) {
            (None, Some(carried)) => Some(Classification {
                status: IndicatorStatus::Reapplied,
                indicator: carried,
            }),
            (Some(indicator), carried) => Some(Classification {
                status: compare(indicator, carried.as_ref()),
                indicator: indicator.clone(),
            }),
            (None, None) => self.default(&context, kind).map(|indicator| Classification {
                status: IndicatorStatus::Default,
                indicator,
            }),
        };
        Ok(classification)
    }

    /// Indicator carried from the previous segment for `context`.
    pub fn carried(
        &self,
        context: &str,
        kind: IndicatorKind,
    ) -> Result<Option<Indicator>, SostenutoError> {
        let Some(metadata) = &self.runtime.previous_metadata else {
            return Ok(None);
        };
        match metadata.latest(context, kind) {
            Some(momento) => Ok(Some(momento.to_indicator(&self.runtime.config.manifests)?)),
            None => Ok(None),
        }
    }

    fn default(&self, context: &str, kind: IndicatorKind) -> Option<Indicator> {
        self.runtime.config.defaults.get(context, kind).cloned()
    }

    /// Latest same-kind wrapper in `context` strictly before `leaf`.
    ///
    /// Hairpin starts count for dynamics: they change the effective dynamic.
    fn previous_in_segment(
        &self,
        leaf: LeafId,
        kind: IndicatorKind,
        context: &str,
    ) -> Option<&'a Wrapper> {
        let offset = self.score.leaf(leaf).start_offset;
        let score = self.score;
        score
            .wrappers()
            .iter()
            .filter(|w| !w.deactivate)
            .filter(|w| score.leaf(w.leaf).start_offset < offset)
            .filter(|w| match w.indicator.kind() {
                Some(k) => k == kind && w.context.as_deref() == Some(context),
                None => {
                    kind == IndicatorKind::Dynamic
                        && matches!(w.indicator, Indicator::StartHairpin(_))
                        && score.context_name(w.leaf, ContextLevel::Voice) == context
                }
            })
            .max_by(|a, b| {
                score
                    .leaf(a.leaf)
                    .start_offset
                    .cmp(&score.leaf(b.leaf).start_offset)
                    .then(a.id.cmp(&b.id))
            })
    }
}

fn compare(explicit: &Indicator, previous: Option<&Indicator>) -> IndicatorStatus {
    if let Indicator::Dynamic(dynamic) = explicit {
        if dynamic.is_sforzando() {
            return IndicatorStatus::Explicit;
        }
    }
    match previous {
        Some(previous) if !previous.is_trend() && explicit.same_value(previous) => {
            IndicatorStatus::Redundant
        }
        _ => IndicatorStatus::Explicit,
    }
}
