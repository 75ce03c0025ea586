//! # Reconcile Module
//!
//! Classify persistent indicators against what is already in effect.
//!
//! ## Purpose
//! Persistent indicators (clefs, dynamics, instruments, margin markup,
//! metronome marks, staff lines, persistent overrides) stay in effect until
//! countermanded, across segment boundaries. Every attachment is labeled:
//!
//! | Status | Meaning | Color |
//! |---|---|---|
//! | `DEFAULT` | supplied by score-template configuration | DarkViolet |
//! | `EXPLICIT` | newly specified, differs from what was in effect | blue |
//! | `REAPPLIED` | carried from the previous segment, nothing explicit here | green4 |
//! | `REDUNDANT` | specified, but already in effect | DeepPink1 |
//!
//! ## Sub-modules
//! - `types` - IndicatorStatus and Classification
//! - `classifier` - The per-attachment classification rules
//! - `attach` - Attachment with synthetic-wrapper replacement
//! - `engine` - Segment-wide reconciliation and momento capture
//!
//! ## Entry Points
//! - [`attach_indicator()`] - Attach and classify one indicator
//! - [`reconcile()`] - Synthesize REAPPLIED/DEFAULT wrappers and classify
//!   every explicit one
//! - [`collect_momentos()`] - Capture the state handed to the next segment
//!
//! ## Example
//! ```rust
//! use sostenuto::{Clef, Indicator, IndicatorStatus, Runtime, Score, Tag};
//! use sostenuto::reconcile::attach_indicator;
//!
//! let mut score = Score::new();
//! let leaves = score.add_voice("Violin_Staff", "Violin_Voice", "c'4 d' e' f'").unwrap();
//! let runtime = Runtime::for_score(&score);
//! let treble = || Indicator::Clef(Clef::parse("treble").unwrap());
//!
//! let tag = Tag::default();
//! let first = attach_indicator(&mut score, leaves[0], treble(), tag.clone(), &runtime).unwrap();
//! let again = attach_indicator(&mut score, leaves[2], treble(), tag, &runtime).unwrap();
//!
//! assert_eq!(first.status, Some(IndicatorStatus::Explicit));
//! assert_eq!(again.status, Some(IndicatorStatus::Redundant));
//! ```

mod attach;
mod classifier;
mod engine;
mod types;


pub use attach::{attach_indicator, remove_synthetic_wrappers};
pub use classifier::Classifier;
pub use engine::{collect_momentos, reconcile, status_counts};
pub use types::{Classification, IndicatorStatus};
