//! Labelled sample strings and the construction of (augmented) prefix tree acceptors from
//! them, which serve as the reference automata for state merging.

use std::ops::Deref;

use itertools::Itertools;
use thiserror::Error;
use tracing::trace;

use crate::{
    dfa::{Dfa, StateLabel},
    math::IndexSet,
    partition::Partition,
};

/// Errors that can occur when turning a [`Dataset`] into a prefix tree.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum DatasetError {
    /// There are no instances to build a prefix tree from.
    #[error("cannot build a prefix tree from an empty dataset")]
    Empty,
    /// The same string occurs with both labels.
    #[error("string {word:?} occurs both as accepting and as rejecting")]
    Inconsistent {
        /// The offending string.
        word: Vec<usize>,
    },
}

/// A string over the alphabet `0..n` together with its classification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StringInstance {
    /// The symbols of the string.
    pub value: Vec<usize>,
    /// Whether the string is in the target language.
    pub accepting: bool,
}

impl StringInstance {
    /// Creates a new instance.
    pub fn new(value: Vec<usize>, accepting: bool) -> Self {
        Self { value, accepting }
    }

    /// Number of symbols.
    pub fn len(&self) -> usize {
        self.value.len()
    }

    /// Whether this is the empty string.
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// The label this instance prescribes for the state it reaches.
    pub fn label(&self) -> StateLabel {
        if self.accepting {
            StateLabel::Accepting
        } else {
            StateLabel::Rejecting
        }
    }

    /// An instance is consistent with `dfa` if its run does not end in a state carrying the
    /// opposite label. If the run breaks off, only rejecting instances are consistent.
    pub fn consistent_with_dfa(&self, dfa: &Dfa) -> bool {
        match dfa.label_of(&self.value) {
            Some(label) => !label.conflicts_with(self.label()),
            None => !self.accepting,
        }
    }

    /// Same as [`StringInstance::consistent_with_dfa`], but evaluated on the quotient
    /// represented by `partition` without materialising it.
    pub fn consistent_with_partition(&self, partition: &Partition) -> bool {
        let mut block = partition.root_of(partition.starting_state());
        for &symbol in &self.value {
            match partition.block(block).transitions().get(symbol).copied().flatten() {
                Some(target) => block = partition.root_of(target),
                None => return !self.accepting,
            }
        }
        !partition.block(block).label().conflicts_with(self.label())
    }
}

/// A collection of labelled strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset(Vec<StringInstance>);

impl Dataset {
    /// Creates an empty dataset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an instance.
    pub fn push(&mut self, instance: StringInstance) {
        self.0.push(instance);
    }

    /// Returns the instances ordered by length, instances of equal length keep their
    /// relative order.
    pub fn sorted_by_length(&self) -> Dataset {
        self.0
            .iter()
            .sorted_by_key(|instance| instance.len())
            .cloned()
            .collect()
    }

    /// All accepting instances.
    pub fn accepting_instances(&self) -> Dataset {
        self.0.iter().filter(|i| i.accepting).cloned().collect()
    }

    /// All rejecting instances.
    pub fn rejecting_instances(&self) -> Dataset {
        self.0.iter().filter(|i| !i.accepting).cloned().collect()
    }

    /// Number of accepting instances.
    pub fn accepting_count(&self) -> usize {
        self.0.iter().filter(|i| i.accepting).count()
    }

    /// Number of rejecting instances.
    pub fn rejecting_count(&self) -> usize {
        self.len() - self.accepting_count()
    }

    /// Share of accepting instances, `0.0` for an empty dataset.
    pub fn accepting_ratio(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.accepting_count() as f64 / self.len() as f64
    }

    /// Share of rejecting instances, `0.0` for an empty dataset.
    pub fn rejecting_ratio(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.rejecting_count() as f64 / self.len() as f64
    }

    /// Number of symbols needed to spell every instance.
    pub fn alphabet_size(&self) -> usize {
        self.0
            .iter()
            .flat_map(|instance| instance.value.iter())
            .max()
            .map_or(0, |symbol| symbol + 1)
    }

    /// Builds a prefix tree acceptor from the instances, processed in order of length.
    ///
    /// If `augmented` is set, rejecting instances are inserted as well and the result is an
    /// augmented prefix tree (APTA); otherwise only accepting instances contribute. The
    /// starting state is `0` and the alphabet covers every symbol that occurs.
    pub fn prefix_tree(&self, augmented: bool) -> Result<Dfa, DatasetError> {
        if self.is_empty() {
            return Err(DatasetError::Empty);
        }
        let mut dfa = Dfa::new(self.alphabet_size().max(1));
        let start = dfa.add_state(StateLabel::Unlabelled);

        for instance in self.sorted_by_length().iter() {
            if !augmented && !instance.accepting {
                continue;
            }
            let mut state = start;
            for (position, &symbol) in instance.value.iter().enumerate() {
                state = match dfa.transition(state, symbol) {
                    Some(next) => next,
                    None => {
                        let label = if position + 1 == instance.len() {
                            instance.label()
                        } else {
                            StateLabel::Unlabelled
                        };
                        let next = dfa.add_state(label);
                        dfa.set_transition(state, symbol, next);
                        next
                    }
                };
            }

            let current = dfa.label(state).unwrap_or_default();
            if current.conflicts_with(instance.label()) {
                return Err(DatasetError::Inconsistent {
                    word: instance.value.clone(),
                });
            }
            dfa.set_label(state, instance.label());
        }

        trace!(
            "built {} with {} states from {} instances",
            if augmented { "APTA" } else { "PTA" },
            dfa.size(),
            self.len()
        );
        Ok(dfa)
    }

    /// Whether every instance is consistent with `dfa`.
    pub fn consistent_with_dfa(&self, dfa: &Dfa) -> bool {
        self.0.iter().all(|instance| instance.consistent_with_dfa(dfa))
    }

    /// Whether every instance is consistent with the quotient represented by `partition`.
    pub fn consistent_with_partition(&self, partition: &Partition) -> bool {
        self.0
            .iter()
            .all(|instance| instance.consistent_with_partition(partition))
    }

    /// Whether the accepting instances exercise every transition of `dfa` and every
    /// accepting state of `dfa` is reached by some accepting instance.
    pub fn structurally_complete(&self, dfa: &Dfa) -> bool {
        Self::covers(
            dfa,
            self.0.iter().filter(|instance| instance.accepting),
            |label| label.is_accepting(),
        )
    }

    /// Whether the instances of both labels together exercise every transition of `dfa` and
    /// every labelled state of `dfa` is reached by some instance carrying its label.
    pub fn symmetrically_structurally_complete(&self, dfa: &Dfa) -> bool {
        Self::covers(dfa, self.0.iter(), StateLabel::is_labelled)
    }

    fn covers<'a>(
        dfa: &Dfa,
        instances: impl Iterator<Item = &'a StringInstance>,
        must_be_reached: impl Fn(StateLabel) -> bool,
    ) -> bool {
        let alphabet_size = dfa.alphabet_size();
        let mut used = IndexSet::with_capacity(dfa.size() * alphabet_size);
        let mut reached = IndexSet::with_capacity(dfa.size());

        for instance in instances {
            let mut state = Some(dfa.starting_state());
            for &symbol in &instance.value {
                let Some(current) = state else {
                    break;
                };
                state = dfa.transition(current, symbol);
                if state.is_some() {
                    used.insert(current * alphabet_size + symbol);
                }
            }
            if let Some(state) = state {
                if dfa.label(state) == Some(instance.label()) {
                    reached.insert(state);
                }
            }
        }

        dfa.states().iter().enumerate().all(|(id, state)| {
            (!must_be_reached(state.label()) || reached.contains(id))
                && state
                    .transitions()
                    .iter()
                    .enumerate()
                    .all(|(symbol, target)| {
                        target.is_none() || used.contains(id * alphabet_size + symbol)
                    })
        })
    }

    /// Fraction of instances that `dfa` classifies correctly, where a word is classified
    /// as accepting iff [`Dfa::accepts`] holds. An empty dataset has accuracy `0.0`.
    pub fn accuracy(&self, dfa: &Dfa) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let correct = self
            .0
            .iter()
            .filter(|instance| dfa.accepts(&instance.value) == instance.accepting)
            .count();
        correct as f64 / self.len() as f64
    }
}

impl Deref for Dataset {
    type Target = [StringInstance];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromIterator<StringInstance> for Dataset {
    fn from_iter<T: IntoIterator<Item = StringInstance>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl FromIterator<(Vec<usize>, bool)> for Dataset {
    fn from_iter<T: IntoIterator<Item = (Vec<usize>, bool)>>(iter: T) -> Self {
        iter.into_iter()
            .map(|(value, accepting)| StringInstance::new(value, accepting))
            .collect()
    }
}

impl IntoIterator for Dataset {
    type Item = StringInstance;
    type IntoIter = std::vec::IntoIter<StringInstance>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
