//! Library for inferring deterministic finite automata from labelled strings by state merging.
//!
//! The starting point is a reference automaton, usually the augmented prefix tree acceptor
//! (APTA) of a [`dataset::Dataset`], in which every state carries one of the labels accepting,
//! rejecting or unlabelled. Inference repeatedly merges states of this automaton, as long as
//! no accepting state ends up in the same block as a rejecting one, until no further merge is
//! possible. The result is a smaller automaton that is consistent with every labelled string.
//!
//! The central data structure is the [`partition::Partition`], a union-find forest over the
//! states of the reference automaton. Every root block stores a label and a transition table,
//! so the partition can be read as the quotient automaton at any time. A partition in *copy
//! mode* logs every block it touches, which makes undoing a speculative merge as cheap as
//! the merge itself. [`partition::Partition::merge_states`] merges two blocks and keeps
//! merging successors until the quotient is deterministic again.
//!
//! On top of this, the [`search`] module implements the strategies that pick merges:
//! - [`search::red_blue_search`], the greedy first-fit strategy of RPNI,
//! - [`search::exhaustive_search`], which scores all pairs of blocks in every round,
//! - [`search::windowed_search`], which restricts scoring to a growing window of blocks in
//!   breadth-first order,
//! - [`search::blue_fringe_search`], which scores the frontier of a red core.
//!
//! The scored strategies are parameterised by a [`search::ScoringFunction`]; the evidence
//! driven heuristic [`search::EvidenceScore`] prefers merges that consolidate labelled states.
//! The [`inference`] module bundles strategy and scoring into ready to use algorithms.
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// The prelude is supposed to make using this package easier. Including everything, i.e.
/// `use dfa_learning::prelude::*;` should be enough to use the package.
pub mod prelude {
    pub use super::{
        dataset::{Dataset, DatasetError, StringInstance},
        dfa::{Dfa, DfaError, State, StateLabel},
        inference::{
            blue_fringe_edsm, blue_fringe_edsm_from_dataset, exhaustive_edsm,
            exhaustive_edsm_from_dataset, rpni, rpni_from_dataset, windowed_edsm,
            windowed_edsm_from_dataset, InferenceError,
        },
        math,
        partition::{Block, Partition},
        search::{
            blue_fringe_search, exhaustive_search, red_blue_search, windowed_search,
            EvidenceScore, MergeData, ScoringFunction, SearchError, StatePairScore, WindowConfig,
        },
    };
}

/// This module contains some definitions of mathematical objects which are used throughout the crate and
/// do not really fit to the top level.
pub mod math;

/// Deterministic automata with partially defined transitions and labelled states.
pub mod dfa;

/// Labelled strings, prefix tree construction and checks of automata against a sample.
pub mod dataset;

/// The union-find partition with speculative undo, the merge closure and quotient export.
pub mod partition;

/// Strategies that choose which blocks of a [`partition::Partition`] to merge.
pub mod search;

/// Ready to use inference algorithms combining a search strategy with a scoring function.
pub mod inference;

/// Minimisation of automata, folding equivalent states through a [`partition::Partition`].
#[cfg(feature = "minimize")]
pub mod minimization;

/// Functions for generating random automata, words and datasets.
#[cfg(feature = "random")]
pub mod random;
