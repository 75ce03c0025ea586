//! # Error Types
//!
//! This module defines all error types for the sostenuto crate.
//!
//! Every failure here is a programming or data error rather than a transient
//! condition, so nothing is retried: errors propagate with `?` up to the host,
//! which aborts the segment build with the message.
//!
//! ## Error Types
//! - `ParseError` - Malformed hairpin or text-spanner descriptor
//! - `NotImplemented` - Descriptor shapes the parser deliberately rejects
//! - `SpecifierError` - A specifier slot holding the wrong kind of indicator
//! - `TagError` - Empty tag words or words containing `:`
//! - `MetadataError` - Invalid YAML configuration or segment metadata
//! - `SelectionError` - Selectors or pieces that cannot be resolved
//! - `ReappliedConflict` - More than one reapplied wrapper of one kind on a leaf
//!
//! ## Usage
//! ```rust
//! use sostenuto::{parse_hairpin_descriptor, SostenutoError};
//!
//! match parse_hairpin_descriptor("p < < f") {
//!     Ok(specifiers) => println!("{} specifiers", specifiers.len()),
//!     Err(SostenutoError::ParseError { descriptor, message }) => {
//!         eprintln!("bad descriptor {:?}: {}", descriptor, message);
//!     }
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use crate::indicators::IndicatorKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SostenutoError {
    /// Descriptor parse error.
    ///
    /// # Example
    /// ```
    /// # use sostenuto::SostenutoError;
    /// let err = SostenutoError::ParseError {
    ///     descriptor: "p < <".to_string(),
    ///     message: "consecutive start hairpin commands".to_string(),
    /// };
    /// assert_eq!(
    ///     err.to_string(),
    ///     "Parse error in descriptor \"p < <\": consecutive start hairpin commands"
    /// );
    /// ```
    #[error("Parse error in descriptor {descriptor:?}: {message}")]
    ParseError { descriptor: String, message: String },

    /// Input the parser recognizes but does not support.
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Specifier built with an indicator that is illegal in its slot.
    #[error("Invalid specifier: {0}")]
    SpecifierError(String),

    /// Tag word that is empty or contains the `:` separator.
    ///
    /// # Example
    /// ```
    /// # use sostenuto::SostenutoError;
    /// let err = SostenutoError::TagError {
    ///     tag: "A:B".to_string(),
    ///     message: "tags must not contain ':'".to_string(),
    /// };
    /// assert_eq!(err.to_string(), "Invalid tag \"A:B\": tags must not contain ':'");
    /// ```
    #[error("Invalid tag {tag:?}: {message}")]
    TagError { tag: String, message: String },

    /// Invalid configuration, manifest or segment metadata.
    #[error("Invalid metadata: {0}")]
    MetadataError(String),

    /// Selector, piece list or measure lookup that cannot be resolved.
    #[error("Selection error: {0}")]
    SelectionError(String),

    /// More than one reapplied wrapper of the same kind on the same leaf.
    ///
    /// This means the segment chaining upstream is broken. Every conflicting
    /// wrapper is listed in `wrappers`.
    #[error("Found {count} reapplied {kind} wrappers on leaf {leaf}: {wrappers}")]
    ReappliedConflict {
        leaf: usize,
        kind: IndicatorKind,
        count: usize,
        wrappers: String,
    },
}
