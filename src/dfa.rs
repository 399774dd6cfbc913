use std::{collections::VecDeque, fmt, ops::Range};

use thiserror::Error;

use crate::math::{IndexSet, Set};

/// The label attached to a state. [`StateLabel::Unlabelled`] carries no information and is
/// absorbed by whatever label it is merged with, while accepting and rejecting are mutually
/// exclusive facts about a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum StateLabel {
    /// Words ending in this state are rejected.
    Rejecting,
    /// Words ending in this state are accepted.
    Accepting,
    /// Nothing is known about words ending in this state.
    #[default]
    Unlabelled,
}

impl StateLabel {
    /// Returns `true` if `self` is [`StateLabel::Accepting`].
    pub fn is_accepting(self) -> bool {
        self == StateLabel::Accepting
    }

    /// Returns `true` if `self` is [`StateLabel::Rejecting`].
    pub fn is_rejecting(self) -> bool {
        self == StateLabel::Rejecting
    }

    /// Returns `true` if `self` is either accepting or rejecting.
    pub fn is_labelled(self) -> bool {
        self != StateLabel::Unlabelled
    }

    /// Two labels conflict if one is accepting and the other is rejecting. Blocks with
    /// conflicting labels can never be merged.
    pub fn conflicts_with(self, other: StateLabel) -> bool {
        matches!(
            (self, other),
            (StateLabel::Accepting, StateLabel::Rejecting)
                | (StateLabel::Rejecting, StateLabel::Accepting)
        )
    }
}

impl fmt::Display for StateLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateLabel::Accepting => write!(f, "+"),
            StateLabel::Rejecting => write!(f, "-"),
            StateLabel::Unlabelled => write!(f, "?"),
        }
    }
}

/// Abstracts the ways in which an automaton can be unfit for state merging.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum DfaError {
    /// The alphabet has no symbols.
    #[error("the alphabet of an automaton must contain at least one symbol")]
    EmptyAlphabet,
    /// The automaton has no states at all.
    #[error("the automaton does not have any states")]
    NoStates,
    /// The designated starting state does not exist.
    #[error("starting state {starting} is out of range for an automaton with {size} states")]
    StartingStateOutOfRange {
        /// The offending starting state.
        starting: usize,
        /// Number of states in the automaton.
        size: usize,
    },
    /// Some transition points to a state that does not exist.
    #[error(
        "transition from state {state} on symbol {symbol} leads to {target}, \
         but the automaton only has {size} states"
    )]
    TransitionOutOfRange {
        /// Source of the transition.
        state: usize,
        /// Symbol of the transition.
        symbol: usize,
        /// The offending target.
        target: usize,
        /// Number of states in the automaton.
        size: usize,
    },
}

/// A single state of a [`Dfa`]: its label and one optional successor per symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    label: StateLabel,
    transitions: Vec<Option<usize>>,
}

impl State {
    /// The label of this state.
    pub fn label(&self) -> StateLabel {
        self.label
    }

    /// Successors indexed by symbol, `None` where no transition exists.
    pub fn transitions(&self) -> &[Option<usize>] {
        &self.transitions
    }

    /// Number of symbols for which a transition exists.
    pub fn out_degree(&self) -> usize {
        self.transitions.iter().flatten().count()
    }

    /// A state without any outgoing transitions.
    pub fn is_leaf(&self) -> bool {
        self.out_degree() == 0
    }
}

/// A deterministic finite automaton over the alphabet `0..alphabet_size`, where each state
/// carries a [`StateLabel`] and may lack transitions for some symbols.
///
/// This is both the reference automaton handed to the merge engine (usually a prefix tree
/// built from a [`crate::dataset::Dataset`]) and the resultant automaton obtained from a
/// [`crate::partition::Partition`] once a search has finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dfa {
    alphabet_size: usize,
    states: Vec<State>,
    starting_state: usize,
}

impl Dfa {
    /// Creates an automaton without states over an alphabet with `alphabet_size` symbols.
    /// The starting state defaults to `0`, which becomes valid once a state is added.
    pub fn new(alphabet_size: usize) -> Self {
        Self {
            alphabet_size,
            states: Vec::new(),
            starting_state: 0,
        }
    }

    /// Builds an automaton from a sequence of state labels and `(source, symbol, target)`
    /// triples, with state `0` as the starting state.
    ///
    /// # Panics
    /// If the source state or symbol of an edge is out of range.
    pub fn from_edges<L, E>(alphabet_size: usize, labels: L, edges: E) -> Self
    where
        L: IntoIterator<Item = StateLabel>,
        E: IntoIterator<Item = (usize, usize, usize)>,
    {
        let mut dfa = Self::new(alphabet_size);
        for label in labels {
            dfa.add_state(label);
        }
        for (source, symbol, target) in edges {
            dfa.set_transition(source, symbol, target);
        }
        dfa
    }

    /// Adds a state with the given label and returns its index.
    pub fn add_state(&mut self, label: StateLabel) -> usize {
        self.states.push(State {
            label,
            transitions: vec![None; self.alphabet_size],
        });
        self.states.len() - 1
    }

    /// Extends the alphabet by one symbol, which initially has no transitions, and
    /// returns the new symbol.
    pub fn add_symbol(&mut self) -> usize {
        for state in &mut self.states {
            state.transitions.push(None);
        }
        self.alphabet_size += 1;
        self.alphabet_size - 1
    }

    /// Sets the successor of `from` on `symbol`. The target is only checked by
    /// [`Dfa::validate`].
    ///
    /// # Panics
    /// If `from` or `symbol` are out of range.
    pub fn set_transition(&mut self, from: usize, symbol: usize, to: usize) {
        self.states[from].transitions[symbol] = Some(to);
    }

    /// Removes the transition of `from` on `symbol`, returning the previous target.
    pub fn remove_transition(&mut self, from: usize, symbol: usize) -> Option<usize> {
        self.states
            .get_mut(from)
            .and_then(|state| state.transitions.get_mut(symbol))
            .and_then(Option::take)
    }

    /// Relabels `state`.
    ///
    /// # Panics
    /// If `state` is out of range.
    pub fn set_label(&mut self, state: usize, label: StateLabel) {
        self.states[state].label = label;
    }

    /// Designates `state` as the starting state. The index is only checked by
    /// [`Dfa::validate`].
    pub fn set_starting_state(&mut self, state: usize) {
        self.starting_state = state;
    }

    /// Number of states.
    pub fn size(&self) -> usize {
        self.states.len()
    }

    /// Number of symbols in the alphabet.
    pub fn alphabet_size(&self) -> usize {
        self.alphabet_size
    }

    /// Index of the starting state.
    pub fn starting_state(&self) -> usize {
        self.starting_state
    }

    /// Returns the state with the given index, if it exists.
    pub fn state(&self, state: usize) -> Option<&State> {
        self.states.get(state)
    }

    /// All states, indexed by their id.
    pub fn states(&self) -> &[State] {
        &self.states
    }

    /// Range over all state indices.
    pub fn state_indices(&self) -> Range<usize> {
        0..self.states.len()
    }

    /// Returns the label of `state`, if it exists.
    pub fn label(&self, state: usize) -> Option<StateLabel> {
        self.states.get(state).map(State::label)
    }

    /// Returns the successor of `state` on `symbol`, if there is one.
    pub fn transition(&self, state: usize, symbol: usize) -> Option<usize> {
        self.states
            .get(state)?
            .transitions
            .get(symbol)
            .copied()
            .flatten()
    }

    /// Iterates over the indices of all states carrying `label`.
    pub fn states_with_label(&self, label: StateLabel) -> impl Iterator<Item = usize> + '_ {
        self.states
            .iter()
            .enumerate()
            .filter(move |(_, state)| state.label == label)
            .map(|(id, _)| id)
    }

    /// Number of accepting states.
    pub fn accepting_states_count(&self) -> usize {
        self.states_with_label(StateLabel::Accepting).count()
    }

    /// Number of rejecting states.
    pub fn rejecting_states_count(&self) -> usize {
        self.states_with_label(StateLabel::Rejecting).count()
    }

    /// Number of unlabelled states.
    pub fn unlabelled_states_count(&self) -> usize {
        self.states_with_label(StateLabel::Unlabelled).count()
    }

    /// Number of states that are either accepting or rejecting.
    pub fn labelled_states_count(&self) -> usize {
        self.states.iter().filter(|s| s.label.is_labelled()).count()
    }

    /// Total number of transitions.
    pub fn transitions_count(&self) -> usize {
        self.states.iter().map(State::out_degree).sum()
    }

    /// An automaton is complete if every state has a transition on every symbol.
    pub fn is_complete(&self) -> bool {
        self.states
            .iter()
            .all(|state| state.transitions.iter().all(Option::is_some))
    }

    /// Verifies that the automaton can be handed to the merge engine: the alphabet and the
    /// set of states are non-empty and all indices are in range.
    pub fn validate(&self) -> Result<(), DfaError> {
        if self.alphabet_size == 0 {
            return Err(DfaError::EmptyAlphabet);
        }
        let size = self.size();
        if size == 0 {
            return Err(DfaError::NoStates);
        }
        if self.starting_state >= size {
            return Err(DfaError::StartingStateOutOfRange {
                starting: self.starting_state,
                size,
            });
        }
        for (state, s) in self.states.iter().enumerate() {
            for (symbol, target) in s.transitions.iter().enumerate() {
                if let Some(target) = *target {
                    if target >= size {
                        return Err(DfaError::TransitionOutOfRange {
                            state,
                            symbol,
                            target,
                            size,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Returns the states reachable from the starting state in breadth-first order, where
    /// successors are explored by increasing symbol.
    pub fn reachable_states(&self) -> Vec<usize> {
        self.breadth_first()
            .into_iter()
            .map(|(state, _)| state)
            .collect()
    }

    /// Returns, for every state, the length of the shortest word leading to it from the
    /// starting state, `None` for unreachable states.
    pub fn state_depths(&self) -> Vec<Option<usize>> {
        let mut depths = vec![None; self.size()];
        for (state, depth) in self.breadth_first() {
            depths[state] = Some(depth);
        }
        depths
    }

    /// The maximum over all reachable states of the length of the shortest word leading to
    /// them.
    pub fn depth(&self) -> usize {
        self.breadth_first()
            .last()
            .map(|(_, depth)| *depth)
            .unwrap_or_default()
    }

    /// Reachable states paired with their distance from the starting state, in breadth-first
    /// order.
    fn breadth_first(&self) -> Vec<(usize, usize)> {
        if self.starting_state >= self.size() {
            return vec![];
        }
        let mut seen = IndexSet::with_capacity(self.size());
        seen.insert(self.starting_state);
        let mut order = vec![(self.starting_state, 0)];

        let mut queue = VecDeque::from([(self.starting_state, 0)]);
        while let Some((state, depth)) = queue.pop_front() {
            for &target in self.states[state].transitions.iter().flatten() {
                if target < self.size() && seen.insert(target) {
                    order.push((target, depth + 1));
                    queue.push_back((target, depth + 1));
                }
            }
        }
        order
    }

    /// Number of transitions on `symbol`.
    pub fn transitions_count_for_symbol(&self, symbol: usize) -> usize {
        self.states
            .iter()
            .filter(|state| state.transitions.get(symbol).copied().flatten().is_some())
            .count()
    }

    /// Number of states without outgoing transitions.
    pub fn leaves_count(&self) -> usize {
        self.states.iter().filter(|state| state.is_leaf()).count()
    }

    /// Number of transitions between reachable states that lead to a strictly shallower
    /// state, see [`Dfa::state_depths`]. Self loops are not counted.
    pub fn loops_count(&self) -> usize {
        let depths = self.state_depths();
        self.states
            .iter()
            .enumerate()
            .filter_map(|(state, s)| Some((depths[state]?, s)))
            .map(|(depth, s)| {
                s.transitions
                    .iter()
                    .flatten()
                    .filter(|&&target| {
                        depths
                            .get(target)
                            .copied()
                            .flatten()
                            .is_some_and(|target_depth| target_depth < depth)
                    })
                    .count()
            })
            .sum()
    }

    /// An automaton is a tree if the starting state has no incoming transitions and every
    /// other state has at most one.
    pub fn is_tree(&self) -> bool {
        let mut targeted = IndexSet::with_capacity(self.size());
        for target in self.states.iter().flat_map(|s| s.transitions.iter().flatten()) {
            if *target == self.starting_state || !targeted.insert(*target) {
                return false;
            }
        }
        true
    }

    /// Returns a copy of `self` restricted to the states reachable from the starting state.
    /// States are renumbered in breadth-first order, so the starting state becomes `0`.
    pub fn remove_unreachable_states(&self) -> Dfa {
        let order = self.reachable_states();
        let mut mapping = vec![None; self.size()];
        for (new, &old) in order.iter().enumerate() {
            mapping[old] = Some(new);
        }

        let mut trimmed = Dfa::new(self.alphabet_size);
        for &old in &order {
            trimmed.add_state(self.states[old].label);
        }
        for (new, &old) in order.iter().enumerate() {
            for (symbol, target) in self.states[old].transitions.iter().enumerate() {
                if let Some(target) = target.and_then(|t| mapping.get(t).copied().flatten()) {
                    trimmed.set_transition(new, symbol, target);
                }
            }
        }
        trimmed
    }

    /// Runs `word` from the starting state and returns the reached state, or `None` if some
    /// transition along the way is missing.
    pub fn run(&self, word: &[usize]) -> Option<usize> {
        word.iter()
            .try_fold(self.starting_state, |state, &symbol| {
                self.transition(state, symbol)
            })
            .filter(|state| *state < self.size())
    }

    /// Label of the state reached by `word`, `None` if the run is unsuccessful.
    pub fn label_of(&self, word: &[usize]) -> Option<StateLabel> {
        self.run(word).and_then(|state| self.label(state))
    }

    /// A word is accepted if its run ends in an accepting state. Unsuccessful runs and runs
    /// ending in an unlabelled state reject.
    pub fn accepts(&self, word: &[usize]) -> bool {
        self.label_of(word).is_some_and(StateLabel::is_accepting)
    }

    fn accepting(&self, state: Option<usize>) -> bool {
        state
            .and_then(|state| self.label(state))
            .is_some_and(StateLabel::is_accepting)
    }

    /// Checks whether `self` and `other` accept the same language. The two automata are
    /// explored simultaneously, a missing transition leads to an implicit rejecting sink.
    pub fn equivalent(&self, other: &Dfa) -> bool {
        if self.alphabet_size != other.alphabet_size {
            return false;
        }
        let start = (Some(self.starting_state), Some(other.starting_state));
        let mut seen: Set<(Option<usize>, Option<usize>)> = Set::default();
        seen.insert(start);
        let mut queue = VecDeque::from([start]);

        while let Some((left, right)) = queue.pop_front() {
            if self.accepting(left) != other.accepting(right) {
                return false;
            }
            for symbol in 0..self.alphabet_size {
                let next = (
                    left.and_then(|q| self.transition(q, symbol)),
                    right.and_then(|q| other.transition(q, symbol)),
                );
                if next != (None, None) && seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        true
    }
}

impl fmt::Display for Dfa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = tabled::builder::Builder::default();
        builder.push_record(
            std::iter::once("State".to_string())
                .chain((0..self.alphabet_size).map(|symbol| symbol.to_string())),
        );
        for (id, state) in self.states.iter().enumerate() {
            let initial = if id == self.starting_state { "->" } else { "" };
            let mut row = vec![format!("{initial}{id} {}", state.label)];
            row.extend(state.transitions.iter().map(|target| match target {
                Some(target) => target.to_string(),
                None => "-".to_string(),
            }));
            builder.push_record(row);
        }

        write!(
            f,
            "{}",
            builder
                .build()
                .with(tabled::settings::Style::rounded())
                .to_string()
        )
    }
}
