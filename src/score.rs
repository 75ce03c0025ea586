//! # Score Model
//!
//! This module defines the minimal score model the engines read and annotate.
//!
//! ## Type Hierarchy
//! ```text
//! Score
//!   ├── Vec<Leaf> (every leaf of every voice, in insertion order)
//!   │     ├── kind: LeafKind (Note | Chord | Rest | Skip)
//!   │     ├── start_offset / duration: Offset (exact rationals)
//!   │     └── voice / staff: owning context names
//!   ├── measure starts (from time signatures) + first measure number
//!   └── Vec<Wrapper> (indicator attachments)
//!         ├── leaf: LeafId
//!         ├── indicator: Indicator
//!         ├── tag: Tag (provenance words, LEFT_BROKEN / RIGHT_BROKEN)
//!         ├── context: owning context for persistent indicators
//!         └── status: Option<IndicatorStatus>
//! ```
//!
//! ## Key Concepts
//!
//! ### Contexts
//! Persistent indicators are owned by a context at one of three levels
//! ([`ContextLevel`]): the voice, the staff, or the whole score (`"Score"`).
//! The *first leaf* of a context is its earliest leaf in this segment; that
//! is where carried-forward indicators are reapplied.
//!
//! ### Pieces
//! A [`Piece`] is either a single leaf or a run of leaves. The piecewise
//! engine only asks a piece for its first leaf, last leaf and length.
//!
//! ### Leaf notation
//! Voices are filled from a small LilyPond-like notation: `c'4 d'8 r8 s2.`.
//! Omitted durations repeat the previous one.

use crate::error::SostenutoError;
use crate::indicators::Indicator;
use crate::reconcile::IndicatorStatus;
use num_rational::Rational64;
use std::collections::BTreeMap;
use std::fmt;

/// Exact score offset, in whole notes.
pub type Offset = Rational64;

/// Name of the score-level context.
pub const SCORE_CONTEXT: &str = "Score";

/// Tag word appended when a spanner continues before the segment.
pub const LEFT_BROKEN: &str = "LEFT_BROKEN";

/// Tag word appended when a spanner continues after the segment.
pub const RIGHT_BROKEN: &str = "RIGHT_BROKEN";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LeafId(pub usize);

impl fmt::Display for LeafId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WrapperId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub enum LeafKind {
    Note(String),
    Chord(Vec<String>),
    Rest,
    Skip,
}

impl LeafKind {
    pub fn is_pitched(&self) -> bool {
        matches!(self, LeafKind::Note(_) | LeafKind::Chord(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    pub id: LeafId,
    pub kind: LeafKind,
    pub start_offset: Offset,
    pub duration: Offset,
    pub voice: String,
    pub staff: String,
}

impl Leaf {
    pub fn stop_offset(&self) -> Offset {
        self.start_offset + self.duration
    }
}

/// Level of the context that owns a persistent indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextLevel {
    Voice,
    Staff,
    Score,
}

/// Time signature used to lay out measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSignature {
    pub numerator: i64,
    pub denominator: i64,
}

impl TimeSignature {
    pub fn new(numerator: i64, denominator: i64) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    pub fn duration(&self) -> Offset {
        Offset::new(self.numerator, self.denominator)
    }
}

/// One unit of a piecewise distribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Piece {
    Leaf(LeafId),
    Leaves(Vec<LeafId>),
}

impl Piece {
    pub fn first(&self) -> Option<LeafId> {
        match self {
            Piece::Leaf(leaf) => Some(*leaf),
            Piece::Leaves(leaves) => leaves.first().copied(),
        }
    }

    pub fn last(&self) -> Option<LeafId> {
        match self {
            Piece::Leaf(leaf) => Some(*leaf),
            Piece::Leaves(leaves) => leaves.last().copied(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Piece::Leaf(_) => 1,
            Piece::Leaves(leaves) => leaves.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True for `Piece::Leaf`, as opposed to a run that happens to hold one leaf.
    pub fn is_single_leaf(&self) -> bool {
        matches!(self, Piece::Leaf(_))
    }

    pub fn leaves(&self) -> Vec<LeafId> {
        match self {
            Piece::Leaf(leaf) => vec![*leaf],
            Piece::Leaves(leaves) => leaves.clone(),
        }
    }
}

/// Colon-separated tag words attached to wrappers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tag {
    words: Vec<String>,
}

impl Tag {
    pub fn new(word: &str) -> Result<Self, SostenutoError> {
        Tag::default().append(word)
    }

    /// Reject empty words and words containing the `:` separator.
    pub fn validate_word(word: &str) -> Result<(), SostenutoError> {
        if word.is_empty() {
            return Err(SostenutoError::TagError {
                tag: word.to_string(),
                message: "tags must not be empty".to_string(),
            });
        }
        if word.contains(':') {
            return Err(SostenutoError::TagError {
                tag: word.to_string(),
                message: "tags must not contain ':'".to_string(),
            });
        }
        Ok(())
    }

    pub fn append(&self, word: &str) -> Result<Tag, SostenutoError> {
        Tag::validate_word(word)?;
        let mut words = self.words.clone();
        words.push(word.to_string());
        Ok(Tag { words })
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.iter().any(|w| w == word)
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.words.join(":"))
    }
}

/// An indicator attached to a leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct Wrapper {
    pub id: WrapperId,
    pub leaf: LeafId,
    pub indicator: Indicator,
    pub tag: Tag,
    /// Owning context name, set for persistent indicators.
    pub context: Option<String>,
    pub status: Option<IndicatorStatus>,
    /// Created by reconciliation rather than by a command.
    pub synthetic: bool,
    pub deactivate: bool,
}

impl Wrapper {
    /// Provenance tag plus the status word (`REAPPLIED_CLEF`, ...).
    pub fn full_tag(&self) -> Tag {
        let mut tag = self.tag.clone();
        if let (Some(status), Some(kind)) = (self.status, self.indicator.kind()) {
            tag.words.push(status.tag_word(kind));
        }
        tag
    }

    /// Render color for persistent indicators.
    pub fn color(&self) -> Option<&'static str> {
        self.status.map(|status| status.color())
    }
}

impl fmt::Display for Wrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Wrapper(leaf={}, indicator={}, tag={})",
            self.leaf,
            self.indicator,
            self.full_tag()
        )?;
        if self.deactivate {
            f.write_str(" %@%")?;
        }
        Ok(())
    }
}

/// The score of one segment.
#[derive(Debug, Clone, Default)]
pub struct Score {
    leaves: Vec<Leaf>,
    wrappers: Vec<Wrapper>,
    measure_starts: Vec<Offset>,
    first_measure_number: u32,
    next_wrapper_id: usize,
}

impl Score {
    pub fn new() -> Self {
        Self {
            first_measure_number: 1,
            ..Self::default()
        }
    }

    /// Append a voice written in leaf notation; offsets start at zero.
    pub fn add_voice(
        &mut self,
        staff: &str,
        voice: &str,
        notation: &str,
    ) -> Result<Vec<LeafId>, SostenutoError> {
        let events = parse_leaves(notation)?;
        Ok(self.add_leaves(staff, voice, events))
    }

    pub fn add_leaves(
        &mut self,
        staff: &str,
        voice: &str,
        events: Vec<(LeafKind, Offset)>,
    ) -> Vec<LeafId> {
        let mut offset = Offset::from_integer(0);
        let mut ids = Vec::with_capacity(events.len());
        for (kind, duration) in events {
            let id = LeafId(self.leaves.len());
            self.leaves.push(Leaf {
                id,
                kind,
                start_offset: offset,
                duration,
                voice: voice.to_string(),
                staff: staff.to_string(),
            });
            offset += duration;
            ids.push(id);
        }
        ids
    }

    /// Lay out measures from time signatures.
    pub fn set_time_signatures(&mut self, signatures: &[TimeSignature], first_measure_number: u32) {
        let mut offset = Offset::from_integer(0);
        self.measure_starts.clear();
        for signature in signatures {
            self.measure_starts.push(offset);
            offset += signature.duration();
        }
        self.first_measure_number = first_measure_number;
    }

    pub fn first_measure_number(&self) -> u32 {
        self.first_measure_number
    }

    pub fn measure_count(&self) -> usize {
        self.measure_starts.len()
    }

    /// Measure start offset to measure number.
    pub fn offset_to_measure_number(&self) -> BTreeMap<Offset, u32> {
        self.measure_starts
            .iter()
            .enumerate()
            .map(|(i, offset)| (*offset, self.first_measure_number + i as u32))
            .collect()
    }

    /// Number of the measure containing `offset`.
    pub fn measure_number(&self, offset: Offset) -> Option<u32> {
        lookup_measure_number(&self.offset_to_measure_number(), offset)
    }

    /// Panics on an id from another score; see [`Score::checked_leaf`].
    pub fn leaf(&self, id: LeafId) -> &Leaf {
        &self.leaves[id.0]
    }

    pub fn checked_leaf(&self, id: LeafId) -> Result<&Leaf, SostenutoError> {
        self.leaves
            .get(id.0)
            .ok_or_else(|| SostenutoError::SelectionError(format!("unknown leaf {}", id)))
    }

    pub fn leaves(&self) -> &[Leaf] {
        &self.leaves
    }

    pub fn leaf_ids(&self) -> Vec<LeafId> {
        self.leaves.iter().map(|leaf| leaf.id).collect()
    }

    pub fn contains_leaf(&self, id: LeafId) -> bool {
        id.0 < self.leaves.len()
    }

    /// Fails on the first leaf of `pieces` that this score does not hold.
    pub fn check_pieces(&self, pieces: &[Piece]) -> Result<(), SostenutoError> {
        for piece in pieces {
            for leaf in piece.leaves() {
                self.checked_leaf(leaf)?;
            }
        }
        Ok(())
    }

    pub fn context_name(&self, leaf: LeafId, level: ContextLevel) -> String {
        let leaf = self.leaf(leaf);
        match level {
            ContextLevel::Voice => leaf.voice.clone(),
            ContextLevel::Staff => leaf.staff.clone(),
            ContextLevel::Score => SCORE_CONTEXT.to_string(),
        }
    }

    /// Distinct context names at `level`, in order of first appearance.
    pub fn contexts(&self, level: ContextLevel) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for leaf in &self.leaves {
            let name = self.context_name(leaf.id, level);
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    fn in_context(&self, leaf: &Leaf, context: &str, level: ContextLevel) -> bool {
        match level {
            ContextLevel::Voice => leaf.voice == context,
            ContextLevel::Staff => leaf.staff == context,
            ContextLevel::Score => context == SCORE_CONTEXT,
        }
    }

    /// Earliest leaf of `context` in this segment.
    pub fn first_leaf_in(&self, context: &str, level: ContextLevel) -> Option<LeafId> {
        self.leaves
            .iter()
            .filter(|leaf| self.in_context(leaf, context, level))
            .min_by(|a, b| a.start_offset.cmp(&b.start_offset).then(a.id.cmp(&b.id)))
            .map(|leaf| leaf.id)
    }

    pub fn is_first_leaf(&self, leaf: LeafId, level: ContextLevel) -> bool {
        let context = self.context_name(leaf, level);
        self.first_leaf_in(&context, level) == Some(leaf)
    }

    /// Attach an indicator and return a copy of the new wrapper.
    pub fn attach(&mut self, leaf: LeafId, indicator: Indicator, tag: Tag) -> Wrapper {
        let context = indicator
            .kind()
            .map(|kind| self.context_name(leaf, kind.level()));
        let wrapper = Wrapper {
            id: WrapperId(self.next_wrapper_id),
            leaf,
            indicator,
            tag,
            context,
            status: None,
            synthetic: false,
            deactivate: false,
        };
        self.next_wrapper_id += 1;
        self.wrappers.push(wrapper.clone());
        wrapper
    }

    pub fn detach(&mut self, id: WrapperId) -> Option<Wrapper> {
        let index = self.wrappers.iter().position(|w| w.id == id)?;
        Some(self.wrappers.remove(index))
    }

    pub fn wrappers(&self) -> &[Wrapper] {
        &self.wrappers
    }

    pub fn wrapper(&self, id: WrapperId) -> Option<&Wrapper> {
        self.wrappers.iter().find(|w| w.id == id)
    }

    pub fn wrapper_mut(&mut self, id: WrapperId) -> Option<&mut Wrapper> {
        self.wrappers.iter_mut().find(|w| w.id == id)
    }

    pub fn wrappers_on(&self, leaf: LeafId) -> Vec<&Wrapper> {
        self.wrappers.iter().filter(|w| w.leaf == leaf).collect()
    }
}

/// Greatest measure start at or before `offset`.
pub fn lookup_measure_number(table: &BTreeMap<Offset, u32>, offset: Offset) -> Option<u32> {
    table.range(..=offset).next_back().map(|(_, number)| *number)
}

/// Parse leaf notation such as `c'4 d'8. r16 s2`.
///
/// Notes start with `a`-`g` followed by accidental and octave marks; `r` is a
/// rest and `s` a skip. Durations are `1`, `2`, `4`, `8`, `16`, `32`, `64`
/// with optional dots, and default to the previous duration (initially `4`).
pub fn parse_leaves(notation: &str) -> Result<Vec<(LeafKind, Offset)>, SostenutoError> {
    let mut events = Vec::new();
    let mut previous = Offset::new(1, 4);
    for token in notation.split_whitespace() {
        let split = token
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(token.len());
        let (head, duration_text) = token.split_at(split);
        let kind = match head {
            "r" => LeafKind::Rest,
            "s" => LeafKind::Skip,
            _ if head.starts_with(|c: char| ('a'..='g').contains(&c)) => {
                LeafKind::Note(head.to_string())
            }
            _ => {
                return Err(SostenutoError::SelectionError(format!(
                    "Unrecognized leaf token: {}",
                    token
                )))
            }
        };
        if !duration_text.is_empty() {
            previous = parse_duration(duration_text).ok_or_else(|| {
                SostenutoError::SelectionError(format!("Invalid duration in leaf token: {}", token))
            })?;
        }
        events.push((kind, previous));
    }
    Ok(events)
}

fn parse_duration(text: &str) -> Option<Offset> {
    let digits = text.trim_end_matches('.');
    let dots = (text.len() - digits.len()) as u32;
    let denominator: i64 = digits.parse().ok()?;
    if !matches!(denominator, 1 | 2 | 4 | 8 | 16 | 32 | 64) {
        return None;
    }
    let base = Offset::new(1, denominator);
    // each dot adds half of the previous value
    let mut total = base;
    let mut addition = base;
    for _ in 0..dots {
        addition /= 2;
        total += addition;
    }
    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_leaves_with_default_durations() {
        let events = parse_leaves("c'4 d' r8 s2.").unwrap();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0], (LeafKind::Note("c'".to_string()), Offset::new(1, 4)));
        assert_eq!(events[1].1, Offset::new(1, 4));
        assert_eq!(events[2], (LeafKind::Rest, Offset::new(1, 8)));
        assert_eq!(events[3], (LeafKind::Skip, Offset::new(3, 4)));
    }

    #[test]
    fn test_parse_leaves_rejects_garbage() {
        assert!(parse_leaves("c'4 x4").is_err());
        assert!(parse_leaves("c'3").is_err());
    }

    #[test]
    fn test_voice_offsets() {
        let mut score = Score::new();
        let ids = score.add_voice("Staff", "Voice", "c'4 d'8 e'8 f'2").unwrap();
        assert_eq!(score.leaf(ids[2]).start_offset, Offset::new(3, 8));
        assert_eq!(score.leaf(ids[3]).stop_offset(), Offset::from_integer(1));
    }

    #[test]
    fn test_checked_leaf() {
        let mut score = Score::new();
        let ids = score.add_voice("Staff", "Voice", "c'4 d'").unwrap();
        assert_eq!(score.checked_leaf(ids[1]).unwrap().id, ids[1]);
        match score.checked_leaf(LeafId(99)) {
            Err(SostenutoError::SelectionError(message)) => assert!(message.contains("99")),
            other => panic!("Expected SelectionError but got: {:?}", other),
        }
    }

    #[test]
    fn test_measure_numbers() {
        let mut score = Score::new();
        score.set_time_signatures(&[TimeSignature::new(3, 4), TimeSignature::new(2, 4)], 5);
        assert_eq!(score.measure_number(Offset::new(0, 1)), Some(5));
        assert_eq!(score.measure_number(Offset::new(1, 2)), Some(5));
        assert_eq!(score.measure_number(Offset::new(3, 4)), Some(6));
        assert_eq!(score.measure_count(), 2);
    }

    #[test]
    fn test_first_leaf_per_context() {
        let mut score = Score::new();
        let upper = score.add_voice("Piano_Staff", "RH", "c''4 d''").unwrap();
        let lower = score.add_voice("Piano_Staff", "LH", "c2").unwrap();
        assert!(score.is_first_leaf(upper[0], ContextLevel::Voice));
        assert!(score.is_first_leaf(lower[0], ContextLevel::Voice));
        assert!(score.is_first_leaf(upper[0], ContextLevel::Staff));
        assert!(!score.is_first_leaf(lower[0], ContextLevel::Staff));
        assert!(!score.is_first_leaf(upper[1], ContextLevel::Voice));
        assert_eq!(score.contexts(ContextLevel::Voice), vec!["RH", "LH"]);
    }

    #[test]
    fn test_tag_validation() {
        assert!(Tag::new("").is_err());
        assert!(Tag::new("A:B").is_err());
        let tag = Tag::new("hairpin").unwrap().append(LEFT_BROKEN).unwrap();
        assert_eq!(tag.to_string(), "hairpin:LEFT_BROKEN");
        assert!(tag.contains(LEFT_BROKEN));
    }

    #[test]
    fn test_piece_accessors() {
        let run = Piece::Leaves(vec![LeafId(3), LeafId(4), LeafId(5)]);
        assert_eq!(run.first(), Some(LeafId(3)));
        assert_eq!(run.last(), Some(LeafId(5)));
        assert_eq!(run.len(), 3);
        assert!(Piece::Leaf(LeafId(1)).is_single_leaf());
        assert!(!Piece::Leaves(vec![LeafId(1)]).is_single_leaf());
    }
}
