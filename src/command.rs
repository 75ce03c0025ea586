//! # Commands
//!
//! Command / Map / Suite combinators and the runtime they share.
//!
//! ## Type Hierarchy
//! ```text
//! Node (enum)
//!   ├── Command   one Operation, optional selector, tags, deactivate,
//!   │             measure-number tagging
//!   ├── Map       selector → every child applied to every element
//!   └── Suite     every child applied to the same input, no result
//! ```
//!
//! A [`Runtime`] is built once per segment and passed by reference down the
//! whole tree.

use crate::error::SostenutoError;
use crate::metadata::{Config, SegmentMetadata};
use crate::score::{lookup_measure_number, LeafId, Offset, Piece, Score, Tag, Wrapper};
use crate::selector::Selector;
use log::debug;
use std::collections::BTreeMap;
use std::fmt;

/// Segment context shared by every command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Runtime {
    /// Measure start offset to measure number.
    pub offset_to_measure_number: BTreeMap<Offset, u32>,
    /// Metadata exported by the previous segment.
    pub previous_metadata: Option<SegmentMetadata>,
    /// Score-template defaults and manifests.
    pub config: Config,
}

impl Runtime {
    pub fn for_score(score: &Score) -> Self {
        Self {
            offset_to_measure_number: score.offset_to_measure_number(),
            ..Self::default()
        }
    }

    pub fn with_previous_metadata(mut self, metadata: SegmentMetadata) -> Self {
        self.previous_metadata = Some(metadata);
        self
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Number of the measure containing `offset`.
    pub fn measure_number(&self, offset: Offset) -> Option<u32> {
        lookup_measure_number(&self.offset_to_measure_number, offset)
    }
}

/// The work a [`Command`] performs on its selection.
pub trait Operation: fmt::Debug {
    fn execute(
        &self,
        score: &mut Score,
        selection: &[Piece],
        runtime: &Runtime,
    ) -> Result<Vec<Wrapper>, SostenutoError>;
}

#[derive(Debug)]
pub struct Command {
    operation: Box<dyn Operation>,
    selector: Option<Selector>,
    tags: Vec<String>,
    deactivate: bool,
    tag_measure_number: bool,
}

impl Command {
    pub fn new(operation: impl Operation + 'static) -> Self {
        Self {
            operation: Box::new(operation),
            selector: None,
            tags: Vec::new(),
            deactivate: false,
            tag_measure_number: false,
        }
    }

    pub fn with_selector(mut self, selector: Selector) -> Self {
        self.selector = Some(selector);
        self
    }

    /// Mark every produced wrapper as deactivated.
    pub fn deactivated(mut self) -> Self {
        self.deactivate = true;
        self
    }

    /// Append `MEASURE_<n>` to every produced wrapper's tag.
    pub fn with_measure_number_tag(mut self) -> Self {
        self.tag_measure_number = true;
        self
    }

    pub fn selector(&self) -> Option<&Selector> {
        self.selector.as_ref()
    }

    /// Tags, sorted.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn is_deactivated(&self) -> bool {
        self.deactivate
    }

    pub fn call(
        &self,
        score: &mut Score,
        argument: &[Piece],
        runtime: &Runtime,
    ) -> Result<Vec<Wrapper>, SostenutoError> {
        score.check_pieces(argument)?;
        let selection = match &self.selector {
            Some(selector) => selector.select(score, argument, runtime)?,
            None => argument.to_vec(),
        };
        if selection.is_empty() {
            debug!("{:?}: empty selection", self.operation);
            return Ok(Vec::new());
        }
        let mut wrappers = self.operation.execute(score, &selection, runtime)?;
        for wrapper in &mut wrappers {
            for tag in &self.tags {
                wrapper.tag = wrapper.tag.append(tag)?;
            }
            if self.tag_measure_number {
                let offset = score.leaf(wrapper.leaf).start_offset;
                if let Some(number) = runtime.measure_number(offset) {
                    wrapper.tag = wrapper.tag.append(&format!("MEASURE_{}", number))?;
                }
            }
            wrapper.deactivate = self.deactivate;
            if let Some(installed) = score.wrapper_mut(wrapper.id) {
                installed.tag = wrapper.tag.clone();
                installed.deactivate = wrapper.deactivate;
            }
        }
        Ok(wrappers)
    }
}

/// Applies every child to every element its selector produces.
#[derive(Debug)]
pub struct Map {
    selector: Selector,
    children: Vec<Node>,
}

impl Map {
    pub fn new(selector: Selector, children: Vec<Node>) -> Self {
        Self { selector, children }
    }

    pub fn call(
        &self,
        score: &mut Score,
        argument: &[Piece],
        runtime: &Runtime,
    ) -> Result<Vec<Wrapper>, SostenutoError> {
        let elements = self.selector.select(score, argument, runtime)?;
        let mut wrappers = Vec::new();
        for element in elements {
            for child in &self.children {
                if let Some(result) = child.call(score, std::slice::from_ref(&element), runtime)? {
                    wrappers.extend(result);
                }
            }
        }
        Ok(wrappers)
    }
}

/// Applies every child, in order, to the same input.
#[derive(Debug)]
pub struct Suite {
    children: Vec<Node>,
}

impl Suite {
    pub fn new(children: Vec<Node>) -> Self {
        Self { children }
    }

    pub fn call(
        &self,
        score: &mut Score,
        argument: &[Piece],
        runtime: &Runtime,
    ) -> Result<(), SostenutoError> {
        for child in &self.children {
            child.call(score, argument, runtime)?;
        }
        Ok(())
    }
}

/// Anything that can appear in a command list.
#[derive(Debug)]
pub enum Node {
    Command(Command),
    Map(Map),
    Suite(Suite),
}

impl Node {
    /// Commands and maps return their wrappers; suites return `None`.
    pub fn call(
        &self,
        score: &mut Score,
        argument: &[Piece],
        runtime: &Runtime,
    ) -> Result<Option<Vec<Wrapper>>, SostenutoError> {
        match self {
            Node::Command(command) => command.call(score, argument, runtime).map(Some),
            Node::Map(map) => map.call(score, argument, runtime).map(Some),
            Node::Suite(suite) => suite.call(score, argument, runtime).map(|_| None),
        }
    }

    fn add_tags(&mut self, tags: &[String]) {
        match self {
            Node::Command(command) => {
                command.tags.extend(tags.iter().cloned());
                command.tags.sort();
                command.tags.dedup();
            }
            Node::Map(map) => map.children.iter_mut().for_each(|child| child.add_tags(tags)),
            Node::Suite(suite) => suite
                .children
                .iter_mut()
                .for_each(|child| child.add_tags(tags)),
        }
    }
}

impl From<Command> for Node {
    fn from(command: Command) -> Self {
        Node::Command(command)
    }
}

impl From<Map> for Node {
    fn from(map: Map) -> Self {
        Node::Map(map)
    }
}

impl From<Suite> for Node {
    fn from(suite: Suite) -> Self {
        Node::Suite(suite)
    }
}

/// Add `tags` to every command in `node`, recursing through maps and suites.
///
/// # Errors
/// [`SostenutoError::TagError`] for an empty tag or one containing `:`.
pub fn tag(tags: &[&str], node: impl Into<Node>) -> Result<Node, SostenutoError> {
    for word in tags {
        Tag::validate_word(word)?;
    }
    let tags: Vec<String> = tags.iter().map(|t| t.to_string()).collect();
    let mut node = node.into();
    node.add_tags(&tags);
    Ok(node)
}

/// Every leaf of `score` as a single piece, the usual top-level argument.
pub fn whole_score(score: &Score) -> Vec<Piece> {
    let leaves: Vec<LeafId> = score.leaf_ids();
    if leaves.is_empty() {
        Vec::new()
    } else {
        vec![Piece::Leaves(leaves)]
    }
}
