//! # Selectors
//!
//! Selectors are data: a closed algebra evaluated against a score.
//!
//! ## Type Hierarchy
//! ```text
//! Selector
//!   ├── Scope { voice, measures }   leaves of one voice and/or measure range
//!   ├── Index(PieceIndex)           one leaf of the input
//!   └── Pipeline(Vec<SelectorStep>)
//!         ├── Leaves / PitchedLeaves
//!         ├── Group(Grouping)       All | Leaves | Measures | Runs | Partition
//!         └── Item(PieceIndex)      one piece of the current selection
//! ```
//!
//! Every selector takes a list of pieces and returns a list of pieces; the
//! input's leaves are read in order with duplicates dropped.

use crate::command::Runtime;
use crate::error::SostenutoError;
use crate::piecewise::PieceIndex;
use crate::score::{lookup_measure_number, LeafId, Piece, Score};

/// How a flat leaf list is grouped into pieces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grouping {
    /// Everything in one piece.
    All,
    /// One single-leaf piece per leaf.
    Leaves,
    /// One piece per measure.
    Measures,
    /// Maximal runs of time-adjacent pitched leaves in one voice.
    Runs,
    /// Consecutive parts of `counts` leaves; leftover leaves join the last part.
    Partition { counts: Vec<usize>, cyclic: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorStep {
    Leaves,
    PitchedLeaves,
    Group(Grouping),
    Item(PieceIndex),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Scope {
        voice: Option<String>,
        /// Inclusive measure-number range.
        measures: Option<(u32, u32)>,
    },
    Index(PieceIndex),
    Pipeline(Vec<SelectorStep>),
}

impl Selector {
    /// All leaves as one piece.
    pub fn group() -> Self {
        Selector::Pipeline(vec![SelectorStep::Group(Grouping::All)])
    }

    pub fn leaves() -> Self {
        Selector::Pipeline(vec![SelectorStep::Leaves])
    }

    pub fn pitched_leaves() -> Self {
        Selector::Pipeline(vec![SelectorStep::PitchedLeaves])
    }

    pub fn leaf(index: PieceIndex) -> Self {
        Selector::Index(index)
    }

    pub fn runs() -> Self {
        Selector::Pipeline(vec![SelectorStep::Group(Grouping::Runs)])
    }

    pub fn measures() -> Self {
        Selector::Pipeline(vec![SelectorStep::Group(Grouping::Measures)])
    }

    pub fn voice(name: &str) -> Self {
        Selector::Scope {
            voice: Some(name.to_string()),
            measures: None,
        }
    }

    /// Append a step to a pipeline.
    ///
    /// Scopes and indices do not compose: wrap them in a
    /// [`Map`](crate::Map) whose children select within each element.
    pub fn then(self, step: SelectorStep) -> Result<Self, SostenutoError> {
        match self {
            Selector::Pipeline(mut steps) => {
                steps.push(step);
                Ok(Selector::Pipeline(steps))
            }
            other => Err(SostenutoError::SelectionError(format!(
                "cannot append a step to {:?}",
                other
            ))),
        }
    }

    pub fn select(
        &self,
        score: &Score,
        input: &[Piece],
        runtime: &Runtime,
    ) -> Result<Vec<Piece>, SostenutoError> {
        score.check_pieces(input)?;
        match self {
            Selector::Scope { voice, measures } => {
                let leaves: Vec<LeafId> = flatten(input)
                    .into_iter()
                    .filter(|id| {
                        let leaf = score.leaf(*id);
                        let in_voice = voice.as_ref().map_or(true, |v| &leaf.voice == v);
                        let in_measures = measures.map_or(true, |(first, last)| {
                            measure_of(score, runtime, *id)
                                .map_or(false, |n| first <= n && n <= last)
                        });
                        in_voice && in_measures
                    })
                    .collect();
                if leaves.is_empty() {
                    return Ok(Vec::new());
                }
                Ok(vec![Piece::Leaves(leaves)])
            }
            Selector::Index(index) => {
                let leaves = flatten(input);
                let i = index.resolve(leaves.len()).ok_or_else(|| {
                    SostenutoError::SelectionError(format!(
                        "leaf index {:?} out of range for {} leaves",
                        index,
                        leaves.len()
                    ))
                })?;
                Ok(vec![Piece::Leaf(leaves[i])])
            }
            Selector::Pipeline(steps) => {
                let mut pieces = input.to_vec();
                for step in steps {
                    pieces = apply_step(step, score, &pieces, runtime)?;
                }
                Ok(pieces)
            }
        }
    }
}

/// Leaves of `pieces` in order, first occurrence only.
pub fn flatten(pieces: &[Piece]) -> Vec<LeafId> {
    let mut leaves: Vec<LeafId> = Vec::new();
    for piece in pieces {
        for leaf in piece.leaves() {
            if !leaves.contains(&leaf) {
                leaves.push(leaf);
            }
        }
    }
    leaves
}

fn measure_of(score: &Score, runtime: &Runtime, leaf: LeafId) -> Option<u32> {
    let offset = score.leaf(leaf).start_offset;
    if runtime.offset_to_measure_number.is_empty() {
        score.measure_number(offset)
    } else {
        lookup_measure_number(&runtime.offset_to_measure_number, offset)
    }
}

fn apply_step(
    step: &SelectorStep,
    score: &Score,
    pieces: &[Piece],
    runtime: &Runtime,
) -> Result<Vec<Piece>, SostenutoError> {
    let selected = match step {
        SelectorStep::Leaves => flatten(pieces).into_iter().map(Piece::Leaf).collect(),
        SelectorStep::PitchedLeaves => flatten(pieces)
            .into_iter()
            .filter(|id| score.leaf(*id).kind.is_pitched())
            .map(Piece::Leaf)
            .collect(),
        SelectorStep::Group(grouping) => group(grouping, score, &flatten(pieces), runtime)?,
        SelectorStep::Item(index) => {
            let i = index.resolve(pieces.len()).ok_or_else(|| {
                SostenutoError::SelectionError(format!(
                    "item {:?} out of range for {} pieces",
                    index,
                    pieces.len()
                ))
            })?;
            vec![pieces[i].clone()]
        }
    };
    Ok(selected)
}

fn group(
    grouping: &Grouping,
    score: &Score,
    leaves: &[LeafId],
    runtime: &Runtime,
) -> Result<Vec<Piece>, SostenutoError> {
    if leaves.is_empty() {
        return Ok(Vec::new());
    }
    let pieces = match grouping {
        Grouping::All => vec![Piece::Leaves(leaves.to_vec())],
        Grouping::Leaves => leaves.iter().copied().map(Piece::Leaf).collect(),
        Grouping::Measures => {
            let mut parts: Vec<(Option<u32>, Vec<LeafId>)> = Vec::new();
            for leaf in leaves {
                let measure = measure_of(score, runtime, *leaf);
                match parts.iter_mut().find(|(m, _)| *m == measure) {
                    Some((_, part)) => part.push(*leaf),
                    None => parts.push((measure, vec![*leaf])),
                }
            }
            parts.into_iter().map(|(_, part)| Piece::Leaves(part)).collect()
        }
        Grouping::Runs => {
            let mut runs: Vec<Vec<LeafId>> = Vec::new();
            let mut current: Vec<LeafId> = Vec::new();
            for id in leaves {
                let leaf = score.leaf(*id);
                if !leaf.kind.is_pitched() {
                    if !current.is_empty() {
                        runs.push(std::mem::take(&mut current));
                    }
                    continue;
                }
                let continues = current.last().map_or(false, |previous| {
                    let previous = score.leaf(*previous);
                    previous.voice == leaf.voice && previous.stop_offset() == leaf.start_offset
                });
                if !continues && !current.is_empty() {
                    runs.push(std::mem::take(&mut current));
                }
                current.push(*id);
            }
            if !current.is_empty() {
                runs.push(current);
            }
            runs.into_iter().map(Piece::Leaves).collect()
        }
        Grouping::Partition { counts, cyclic } => partition(leaves, counts, *cyclic)?,
    };
    Ok(pieces)
}

fn partition(
    leaves: &[LeafId],
    counts: &[usize],
    cyclic: bool,
) -> Result<Vec<Piece>, SostenutoError> {
    if counts.is_empty() || counts.contains(&0) {
        return Err(SostenutoError::SelectionError(format!(
            "partition counts must be positive: {:?}",
            counts
        )));
    }
    let mut parts: Vec<Vec<LeafId>> = Vec::new();
    let mut position = 0;
    let mut i = 0;
    while position < leaves.len() {
        if !cyclic && i == counts.len() {
            break;
        }
        let count = counts[i % counts.len()];
        let end = (position + count).min(leaves.len());
        parts.push(leaves[position..end].to_vec());
        position = end;
        i += 1;
    }
    if position < leaves.len() {
        if let Some(last) = parts.last_mut() {
            last.extend_from_slice(&leaves[position..]);
        }
    }
    Ok(parts.into_iter().map(Piece::Leaves).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::TimeSignature;

    fn setup() -> (Score, Vec<LeafId>, Runtime) {
        let mut score = Score::new();
        let leaves = score.add_voice("Staff", "Voice", "c'4 d' r e' f' g' r a'").unwrap();
        score.set_time_signatures(&[TimeSignature::new(4, 4), TimeSignature::new(4, 4)], 1);
        let runtime = Runtime::for_score(&score);
        (score, leaves, runtime)
    }

    fn lengths(pieces: &[Piece]) -> Vec<usize> {
        pieces.iter().map(Piece::len).collect()
    }

    #[test]
    fn test_runs_break_at_rests() {
        let (score, leaves, runtime) = setup();
        let input = vec![Piece::Leaves(leaves)];
        let runs = Selector::runs().select(&score, &input, &runtime).unwrap();
        assert_eq!(lengths(&runs), vec![2, 3, 1]);
    }

    #[test]
    fn test_measures_and_scope() {
        let (score, leaves, runtime) = setup();
        let input = vec![Piece::Leaves(leaves.clone())];
        let measures = Selector::measures().select(&score, &input, &runtime).unwrap();
        assert_eq!(lengths(&measures), vec![4, 4]);

        let scope = Selector::Scope {
            voice: Some("Voice".to_string()),
            measures: Some((2, 2)),
        };
        let selected = scope.select(&score, &input, &runtime).unwrap();
        assert_eq!(selected, vec![Piece::Leaves(leaves[4..].to_vec())]);
        assert!(Selector::voice("Other").select(&score, &input, &runtime).unwrap().is_empty());
    }

    #[test]
    fn test_pitched_leaves_and_items() {
        let (score, leaves, runtime) = setup();
        let input = vec![Piece::Leaves(leaves.clone())];
        let pitched = Selector::pitched_leaves().select(&score, &input, &runtime).unwrap();
        assert_eq!(pitched.len(), 6);
        let last = Selector::pitched_leaves()
            .then(SelectorStep::Item(PieceIndex::FromEnd(1)))
            .unwrap()
            .select(&score, &input, &runtime)
            .unwrap();
        assert_eq!(last, vec![Piece::Leaf(leaves[7])]);
        let first = Selector::leaf(PieceIndex::FromStart(0))
            .select(&score, &input, &runtime)
            .unwrap();
        assert_eq!(first, vec![Piece::Leaf(leaves[0])]);
        assert!(Selector::leaf(PieceIndex::FromStart(8)).select(&score, &input, &runtime).is_err());
    }

    #[test]
    fn test_partition_overhang_joins_last_part() {
        let (score, leaves, runtime) = setup();
        let input = vec![Piece::Leaves(leaves)];
        let fixed = Selector::Pipeline(vec![SelectorStep::Group(Grouping::Partition {
            counts: vec![3, 2],
            cyclic: false,
        })]);
        assert_eq!(lengths(&fixed.select(&score, &input, &runtime).unwrap()), vec![3, 5]);
        let cyclic = Selector::Pipeline(vec![SelectorStep::Group(Grouping::Partition {
            counts: vec![3],
            cyclic: true,
        })]);
        assert_eq!(lengths(&cyclic.select(&score, &input, &runtime).unwrap()), vec![3, 3, 2]);
    }

    #[test]
    fn test_then_rejects_scope() {
        assert!(Selector::voice("Voice").then(SelectorStep::Leaves).is_err());
    }

    #[test]
    fn test_unknown_leaves_are_rejected() {
        let (score, mut leaves, runtime) = setup();
        leaves.push(LeafId(99));
        let input = vec![Piece::Leaves(leaves)];
        match Selector::runs().select(&score, &input, &runtime) {
            Err(SostenutoError::SelectionError(message)) => assert!(message.contains("99")),
            other => panic!("Expected SelectionError but got: {:?}", other),
        }
    }
}
