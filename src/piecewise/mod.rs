//! # Piecewise Module
//!
//! Distribute hairpins, text spanners and trills over a sequence of pieces.
//!
//! ## Purpose
//! A short list of [`Specifier`](crate::Specifier)s is walked cyclically
//! across an arbitrarily long list of pieces. Each piece receives its
//! specifier's stop, indicator and start on its first leaf; bookended pieces
//! also receive the next specifier on their last leaf, so that leaf reads as
//! both the end of one span and the start of the next.
//!
//! ## Sub-modules
//! - `types` - PiecewiseOptions, Bookend, PieceIndex, IndexedTweak
//! - `engine` - The per-piece decision sequence
//!
//! ## Entry Point
//! [`iterate_pieces()`] - Attach specifiers to pieces and return the wrappers
//!
//! ## Example
//! ```rust
//! use sostenuto::{
//!     iterate_pieces, parse_hairpin_descriptor, Piece, PiecewiseOptions, Runtime, Score,
//! };
//!
//! let mut score = Score::new();
//! let leaves = score.add_voice("Staff", "Voice", "c'4 d' e' f'").unwrap();
//! let runtime = Runtime::for_score(&score);
//! let specifiers = parse_hairpin_descriptor("p < f").unwrap();
//! let pieces = vec![Piece::Leaves(leaves.clone())];
//!
//! let wrappers =
//!     iterate_pieces(&mut score, &pieces, &specifiers, &PiecewiseOptions::default(), &runtime)
//!         .unwrap();
//!
//! // p and < on the first leaf, f bookended on the last
//! assert_eq!(wrappers.len(), 3);
//! assert_eq!(wrappers[2].leaf, leaves[3]);
//! ```
//!
//! ## State across pieces
//! - `just_backstole_right_text` - the penultimate piece already drew the
//!   final label, so the final piece starts nothing
//! - `just_bookended_leaf` - hairpins only; a leaf that received a bookend
//!   only takes start indicators afterwards
//! - `previous_had_bookend` - text spans and trills; the piece after a
//!   bookend closes nothing

mod engine;
mod types;


pub use engine::iterate_pieces;
pub use types::{Bookend, IndexedTweak, PieceIndex, PiecewiseOptions};
