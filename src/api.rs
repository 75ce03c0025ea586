//! # Public API
//!
//! Factory functions that build [`Command`]s over the two engines, and the
//! in-memory segment run.
//!
//! ## Spanner Factories
//!
//! - [`hairpin()`] - Hairpin descriptor distributed piecewise
//! - [`text_spanner()`] - Text-spanner descriptor distributed piecewise
//! - [`trill_spanner()`] - Trill spanner distributed piecewise
//!
//! ## Indicator Factories
//!
//! - [`clef()`], [`dynamic()`], [`instrument()`], [`margin_markup()`],
//!   [`metronome_mark()`], [`staff_lines()`], [`persistent_override()`]
//!
//! Indicator commands attach to the first leaf of their selection by
//! default; spanner commands treat the whole selection as one piece.
//! Override either with [`Command::with_selector`].
//!
//! ## Typical Usage
//!
//! ```rust
//! use sostenuto::{build_segment, clef, hairpin, Node, PiecewiseOptions, Runtime, Score, Selector};
//!
//! let mut score = Score::new();
//! score.add_voice("Cello_Staff", "Cello_Voice", "c4 d e f g a b c'")?;
//! let runtime = Runtime::for_score(&score);
//!
//! let nodes: Vec<Node> = vec![
//!     clef("bass")?.into(),
//!     hairpin("p < f", PiecewiseOptions::default())?
//!         .with_selector(Selector::group())
//!         .into(),
//! ];
//! let metadata = build_segment(&mut score, &nodes, &runtime)?;
//!
//! let cello = &metadata.persistent_indicators["Cello_Staff"];
//! assert_eq!(cello[0].value, "bass");
//! # Ok::<(), sostenuto::SostenutoError>(())
//! ```

use crate::command::{whole_score, Command, Node, Operation, Runtime};
use crate::descriptor::{
    parse_hairpin_descriptor, parse_text_spanner_descriptor, TextSpannerOptions,
};
use crate::error::SostenutoError;
use crate::indicators::*;
use crate::metadata::SegmentMetadata;
use crate::piecewise::{iterate_pieces, PieceIndex, PiecewiseOptions};
use crate::reconcile::{attach_indicator, collect_momentos, reconcile};
use crate::score::{LeafId, Piece, Score, Tag, Wrapper};
use crate::selector::Selector;
use crate::specifier::{SpannerFamily, Specifier};
use log::debug;

/// Distributes specifiers over the selected pieces.
#[derive(Debug, Clone, PartialEq)]
pub struct PiecewiseCommand {
    pub specifiers: Vec<Specifier>,
    pub options: PiecewiseOptions,
}

impl Operation for PiecewiseCommand {
    fn execute(
        &self,
        score: &mut Score,
        selection: &[Piece],
        runtime: &Runtime,
    ) -> Result<Vec<Wrapper>, SostenutoError> {
        let mut wrappers = Vec::new();
        for pieces in pieces_by_voice(score, selection)? {
            wrappers.extend(iterate_pieces(
                score,
                &pieces,
                &self.specifiers,
                &self.options,
                runtime,
            )?);
        }
        Ok(wrappers)
    }
}

/// Split `selection` into one piece list per voice, voices in order of
/// first appearance. Runs spanning several voices are cut into one run per
/// voice.
fn pieces_by_voice(
    score: &Score,
    selection: &[Piece],
) -> Result<Vec<Vec<Piece>>, SostenutoError> {
    let mut voices: Vec<(String, Vec<Piece>)> = Vec::new();
    for piece in selection {
        let parts = match piece {
            Piece::Leaf(leaf) => vec![(score.checked_leaf(*leaf)?.voice.clone(), piece.clone())],
            Piece::Leaves(leaves) => {
                let mut runs: Vec<(String, Vec<LeafId>)> = Vec::new();
                for leaf in leaves {
                    let voice = &score.checked_leaf(*leaf)?.voice;
                    match runs.iter().position(|(v, _)| v == voice) {
                        Some(i) => runs[i].1.push(*leaf),
                        None => runs.push((voice.clone(), vec![*leaf])),
                    }
                }
                runs
                    .into_iter()
                    .map(|(voice, run)| (voice, Piece::Leaves(run)))
                    .collect::<Vec<_>>()
            }
        };
        for (voice, part) in parts {
            match voices.iter().position(|(v, _)| *v == voice) {
                Some(i) => voices[i].1.push(part),
                None => voices.push((voice, vec![part])),
            }
        }
    }
    Ok(voices.into_iter().map(|(_, pieces)| pieces).collect())
}

/// Attaches `indicators` cyclically to the first leaf of each selected piece.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorCommand {
    pub indicators: Vec<Indicator>,
    pub provenance: String,
}

impl Operation for IndicatorCommand {
    fn execute(
        &self,
        score: &mut Score,
        selection: &[Piece],
        runtime: &Runtime,
    ) -> Result<Vec<Wrapper>, SostenutoError> {
        if self.indicators.is_empty() {
            return Ok(Vec::new());
        }
        let tag = Tag::new(&self.provenance)?;
        let mut wrappers = Vec::new();
        for (i, piece) in selection.iter().enumerate() {
            let Some(leaf) = piece.first() else {
                continue;
            };
            let indicator = self.indicators[i % self.indicators.len()].clone();
            wrappers.push(attach_indicator(score, leaf, indicator, tag.clone(), runtime)?);
        }
        Ok(wrappers)
    }
}

fn piecewise_command(
    specifiers: Vec<Specifier>,
    options: PiecewiseOptions,
    provenance: &str,
) -> Command {
    Command::new(PiecewiseCommand {
        specifiers,
        options: options.with_provenance(provenance),
    })
    .with_selector(Selector::group())
}

/// Attach one indicator to the first selected leaf.
pub fn indicator_command(indicator: Indicator, provenance: &str) -> Command {
    Command::new(IndicatorCommand {
        indicators: vec![indicator],
        provenance: provenance.to_string(),
    })
    .with_selector(Selector::leaf(PieceIndex::FromStart(0)))
}

fn unknown(descriptor: &str, what: &str) -> SostenutoError {
    SostenutoError::ParseError {
        descriptor: descriptor.to_string(),
        message: format!("unknown {}", what),
    }
}

/// Hairpin command from a descriptor such as `"p < f"`.
///
/// # Example
/// ```rust
/// use sostenuto::{hairpin, PiecewiseOptions};
///
/// let command = hairpin("o< mf >o !", PiecewiseOptions::default())?;
/// assert!(hairpin("p < < f", PiecewiseOptions::default()).is_err());
/// # Ok::<(), sostenuto::SostenutoError>(())
/// ```
pub fn hairpin(descriptor: &str, options: PiecewiseOptions) -> Result<Command, SostenutoError> {
    let specifiers = parse_hairpin_descriptor(descriptor)?;
    Ok(piecewise_command(specifiers, options, "hairpin"))
}

/// Text-spanner command from a descriptor such as `"pont. => ord."`.
pub fn text_spanner(
    descriptor: &str,
    text_options: &TextSpannerOptions,
    options: PiecewiseOptions,
) -> Result<Command, SostenutoError> {
    let specifiers = parse_text_spanner_descriptor(descriptor, text_options)?;
    Ok(piecewise_command(specifiers, options, "text_spanner"))
}

/// Trill-spanner command, optionally pitched (`pitch` is the auxiliary note).
pub fn trill_spanner(
    pitch: Option<&str>,
    options: PiecewiseOptions,
) -> Result<Command, SostenutoError> {
    let start = StartTrillSpan {
        pitch: pitch.map(str::to_string),
        tweaks: Vec::new(),
    };
    let specifier = Specifier::new(SpannerFamily::Trill)
        .with_spanner_start(Indicator::StartTrillSpan(start))?
        .with_spanner_stop(Indicator::StopTrillSpan(StopTrillSpan::default()))?;
    Ok(piecewise_command(vec![specifier], options, "trill_spanner"))
}

pub fn clef(name: &str) -> Result<Command, SostenutoError> {
    let clef = Clef::parse(name).ok_or_else(|| unknown(name, "clef"))?;
    Ok(indicator_command(Indicator::Clef(clef), "clef"))
}

pub fn dynamic(name: &str) -> Result<Command, SostenutoError> {
    let dynamic = Dynamic::parse(name).ok_or_else(|| unknown(name, "dynamic"))?;
    Ok(indicator_command(Indicator::Dynamic(dynamic), "dynamic"))
}

pub fn instrument(instrument: Instrument) -> Command {
    indicator_command(Indicator::Instrument(instrument), "instrument")
}

/// Margin markup identified by `key`; `text` follows the label rules of
/// text-spanner descriptors (`\name` references predefined markup).
pub fn margin_markup(key: &str, text: &str) -> Command {
    let markup = MarginMarkup {
        key: key.to_string(),
        markup: Markup::label(text),
    };
    indicator_command(Indicator::MarginMarkup(markup), "margin_markup")
}

/// `"4=60"`, `"accelerando"` or `"ritardando"`.
pub fn metronome_mark(text: &str) -> Result<Command, SostenutoError> {
    let indicator = match text.trim() {
        "accelerando" => Indicator::Accelerando,
        "ritardando" => Indicator::Ritardando,
        other => Indicator::MetronomeMark(
            MetronomeMark::parse(other).ok_or_else(|| unknown(text, "metronome mark"))?,
        ),
    };
    Ok(indicator_command(indicator, "metronome_mark"))
}

pub fn staff_lines(line_count: u8) -> Command {
    indicator_command(Indicator::StaffLines(StaffLines { line_count }), "staff_lines")
}

/// `"Grob.attribute=value"`.
pub fn persistent_override(text: &str) -> Result<Command, SostenutoError> {
    let value = PersistentOverride::parse(text).ok_or_else(|| unknown(text, "override"))?;
    Ok(indicator_command(
        Indicator::PersistentOverride(value),
        "persistent_override",
    ))
}

/// Run `nodes` over every leaf of `score`, reconcile persistent indicators
/// and capture the metadata handed to the next segment.
///
/// # Pipeline
/// 1. Call each node, in order, with the whole score as one piece
/// 2. Reconcile: synthesize REAPPLIED / DEFAULT wrappers, classify the rest
/// 3. Collect momentos, carrying forward untouched ones
///
/// # Errors
/// The first error from any node or from reconciliation.
pub fn build_segment(
    score: &mut Score,
    nodes: &[Node],
    runtime: &Runtime,
) -> Result<SegmentMetadata, SostenutoError> {
    let argument = whole_score(score);
    for node in nodes {
        node.call(score, &argument, runtime)?;
    }
    let synthesized = reconcile(score, runtime)?;
    debug!(
        "segment built: {} wrappers, {} synthesized",
        score.wrappers().len(),
        synthesized.len()
    );
    Ok(SegmentMetadata {
        segment_name: None,
        first_measure_number: Some(score.first_measure_number()),
        measure_count: Some(score.measure_count()),
        persistent_indicators: collect_momentos(score, runtime.previous_metadata.as_ref()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::IndicatorStatus;

    #[test]
    fn test_factories_reject_bad_values() {
        assert!(matches!(clef("sideways"), Err(SostenutoError::ParseError { .. })));
        assert!(dynamic("loud").is_err());
        assert!(metronome_mark("fast").is_err());
        assert!(persistent_override("nonsense").is_err());
        assert!(metronome_mark("accelerando").is_ok());
        let options = TextSpannerOptions::default();
        assert!(text_spanner("T", &options, PiecewiseOptions::default()).is_err());
    }

    #[test]
    fn test_indicator_command_attaches_to_first_leaf() {
        let mut score = Score::new();
        let leaves = score.add_voice("Staff", "Voice", "c'4 d' e'").unwrap();
        let runtime = Runtime::for_score(&score);
        let argument = whole_score(&score);
        let wrappers = clef("alto").unwrap().call(&mut score, &argument, &runtime).unwrap();
        assert_eq!(wrappers.len(), 1);
        assert_eq!(wrappers[0].leaf, leaves[0]);
        assert_eq!(wrappers[0].tag.to_string(), "clef");
        assert_eq!(wrappers[0].status, Some(IndicatorStatus::Explicit));
    }

    #[test]
    fn test_trill_spanner_over_whole_selection() {
        let mut score = Score::new();
        let leaves = score.add_voice("Staff", "Voice", "c'4 d' e'").unwrap();
        let runtime = Runtime::for_score(&score);
        let argument = whole_score(&score);
        let command = trill_spanner(Some("d'"), PiecewiseOptions::default()).unwrap();
        let wrappers = command.call(&mut score, &argument, &runtime).unwrap();
        assert_eq!(wrappers.len(), 2);
        assert_eq!(wrappers[0].leaf, leaves[0]);
        assert_eq!(wrappers[0].tag.to_string(), "trill_spanner(1)");
        assert_eq!(wrappers[1].leaf, leaves[2]);
        assert_eq!(wrappers[1].indicator.type_name(), "StopTrillSpan");
    }

    #[test]
    fn test_hairpin_over_two_voices_runs_per_voice() {
        let mut score = Score::new();
        let upper = score.add_voice("Violin_Staff", "Violin_Voice", "c''4 d'' e'' f''").unwrap();
        let lower = score.add_voice("Cello_Staff", "Cello_Voice", "c4 d e f").unwrap();
        let runtime = Runtime::for_score(&score);
        let command = hairpin("p < f", PiecewiseOptions::default()).unwrap();
        build_segment(&mut score, &[Node::from(command)], &runtime).unwrap();

        let placed = |type_name: &str| -> Vec<(LeafId, String)> {
            score
                .wrappers()
                .iter()
                .filter(|w| w.indicator.type_name() == type_name)
                .map(|w| (w.leaf, w.indicator.to_string()))
                .collect()
        };
        assert_eq!(
            placed("Dynamic"),
            vec![
                (upper[0], "\\p".to_string()),
                (upper[3], "\\f".to_string()),
                (lower[0], "\\p".to_string()),
                (lower[3], "\\f".to_string()),
            ]
        );
        let starts: Vec<LeafId> = placed("StartHairpin").iter().map(|(leaf, _)| *leaf).collect();
        assert_eq!(starts, vec![upper[0], lower[0]]);
    }
}
