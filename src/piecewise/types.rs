//! Piecewise option and index types

use crate::indicators::Tweak;

/// Position of a piece counted from either end.
///
/// `FromStart(0)` is the first piece and `FromEnd(1)` the last one, so
/// `FromEnd(2)` names the penultimate piece whatever the piece count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PieceIndex {
    FromStart(usize),
    FromEnd(usize),
}

impl PieceIndex {
    /// Absolute index in a sequence of `len` items, if it exists.
    pub fn resolve(&self, len: usize) -> Option<usize> {
        match *self {
            PieceIndex::FromStart(n) if n < len => Some(n),
            PieceIndex::FromEnd(n) if n >= 1 && n <= len => Some(len - n),
            _ => None,
        }
    }

    pub fn matches(&self, index: usize, len: usize) -> bool {
        self.resolve(len) == Some(index)
    }
}

/// Which pieces are bookended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bookend {
    Never,
    All,
    At(PieceIndex),
}

impl Default for Bookend {
    fn default() -> Self {
        Bookend::At(PieceIndex::FromEnd(1))
    }
}

impl Bookend {
    pub fn matches(&self, index: usize, len: usize) -> bool {
        match self {
            Bookend::Never => false,
            Bookend::All => true,
            Bookend::At(piece) => piece.matches(index, len),
        }
    }
}

/// A tweak applied to every piece, or only to one.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedTweak {
    pub tweak: Tweak,
    pub index: Option<PieceIndex>,
}

impl IndexedTweak {
    pub fn everywhere(tweak: Tweak) -> Self {
        Self { tweak, index: None }
    }

    pub fn at(tweak: Tweak, index: PieceIndex) -> Self {
        Self {
            tweak,
            index: Some(index),
        }
    }

    pub fn applies_to(&self, index: usize, len: usize) -> bool {
        match &self.index {
            None => true,
            Some(piece) => piece.matches(index, len),
        }
    }
}

/// Options controlling one piecewise distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct PiecewiseOptions {
    pub bookend: Bookend,
    /// The spanner continues from before this segment.
    pub left_broken: bool,
    /// The spanner continues after this segment.
    pub right_broken: bool,
    pub do_not_start_spanner_on_final_piece: bool,
    /// Emit the closing stop after the final leaf's bar line.
    pub leak_spanner_stop: bool,
    /// Drop the start of a compound specifier on a single-leaf piece.
    pub remove_length_1_spanner_start: bool,
    pub tweaks: Vec<IndexedTweak>,
    /// Provenance word, suffixed `(1)`, `(2)` or `(3)` per attachment site.
    pub provenance: String,
}

impl Default for PiecewiseOptions {
    fn default() -> Self {
        Self {
            bookend: Bookend::default(),
            left_broken: false,
            right_broken: false,
            do_not_start_spanner_on_final_piece: false,
            leak_spanner_stop: false,
            remove_length_1_spanner_start: false,
            tweaks: Vec::new(),
            provenance: "iterate_pieces".to_string(),
        }
    }
}

impl PiecewiseOptions {
    pub fn with_provenance(mut self, provenance: &str) -> Self {
        self.provenance = provenance.to_string();
        self
    }
}
