//! # sostenuto
//!
//! Indicator bookkeeping for music scores composed in segments.
//!
//! A piece is built one segment at a time. Each segment attaches clefs,
//! dynamics, tempo marks, hairpins and text spanners to the leaves of an
//! in-memory [`Score`], then hands the persistent indicators still in effect
//! to the next segment as [`SegmentMetadata`].
//!
//! ## Sub-modules
//!
//! - [`score`] - Leaves, contexts, tags and indicator wrappers
//! - [`indicators`] - Indicator values and their persistence kinds
//! - [`reconcile`](mod@reconcile) - DEFAULT / EXPLICIT / REAPPLIED / REDUNDANT classification
//! - [`specifier`] - One step of a piecewise spanner
//! - [`descriptor`] - Hairpin and text-spanner descriptor parsers
//! - [`piecewise`] - Distribution of specifiers over pieces
//! - [`selector`] - Leaf and piece selection
//! - [`command`] - Commands, maps, suites and the segment [`Runtime`]
//! - [`metadata`] - Cross-segment momentos and score-template configuration
//! - [`api`] - Factories and [`build_segment`]
//!
//! ## Entry Point
//!
//! ```rust
//! use sostenuto::{build_segment, clef, Node, Runtime, Score};
//!
//! let mut score = Score::new();
//! score.add_voice("Viola_Staff", "Viola_Voice", "c'4 d' e' f'")?;
//! let runtime = Runtime::for_score(&score);
//! let metadata = build_segment(&mut score, &[Node::from(clef("alto")?)], &runtime)?;
//! assert_eq!(metadata.persistent_indicators["Viola_Staff"][0].value, "alto");
//! # Ok::<(), sostenuto::SostenutoError>(())
//! ```

pub mod api;
pub mod command;
pub mod descriptor;
pub mod error;
pub mod indicators;
pub mod metadata;
pub mod piecewise;
pub mod reconcile;
pub mod score;
pub mod selector;
pub mod specifier;

pub use api::{
    build_segment, clef, dynamic, hairpin, indicator_command, instrument, margin_markup,
    metronome_mark, persistent_override, staff_lines, text_spanner, trill_spanner,
    IndicatorCommand, PiecewiseCommand,
};
pub use command::{tag, whole_score, Command, Map, Node, Operation, Runtime, Suite};
pub use descriptor::{parse_hairpin_descriptor, parse_text_spanner_descriptor, TextSpannerOptions};
pub use error::*;
pub use indicators::*;
pub use metadata::{Config, Manifests, Momento, SegmentMetadata, TemplateDefaults};
pub use piecewise::{iterate_pieces, Bookend, IndexedTweak, PieceIndex, PiecewiseOptions};
pub use reconcile::{
    attach_indicator, collect_momentos, reconcile, status_counts, Classification, Classifier,
    IndicatorStatus,
};
pub use score::*;
pub use selector::{Grouping, Selector, SelectorStep};
pub use specifier::{SpannerFamily, Specifier};
