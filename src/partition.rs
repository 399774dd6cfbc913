//! A partition of the states of a reference [`Dfa`] into blocks, represented as a
//! union-find forest over the state indices.
//!
//! Besides the forest itself, every root block stores a label and a transition table, so the
//! partition can be read as an automaton (its quotient) at any point. Partitions can be put into
//! copy mode with [`Partition::copy`], after which every block that is touched gets logged.
//! The log makes it possible to undo a speculative merge with [`Partition::rollback_from`] or to
//! commit it to the baseline with [`Partition::copy_changes_from`], in time proportional to the
//! number of blocks touched rather than the size of the partition.

use std::fmt;

use itertools::Itertools;

use crate::dfa::{Dfa, DfaError, StateLabel};

mod merge;
mod order;
mod quotient;

/// One entry of the union-find forest. Every original state owns exactly one block; only
/// root blocks carry meaningful labels and transitions.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    parent: usize,
    size: usize,
    ring_next: usize,
    label: StateLabel,
    transitions: Vec<Option<usize>>,
    dirty: bool,
}

impl Block {
    /// Parent in the union-find forest, a block is a root if it is its own parent.
    pub fn parent(&self) -> usize {
        self.parent
    }

    /// Number of states folded into this block, only meaningful for roots.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Next state in the circular list of states folded into the same block.
    pub fn ring_next(&self) -> usize {
        self.ring_next
    }

    /// The label of the block.
    pub fn label(&self) -> StateLabel {
        self.label
    }

    /// Transition targets per symbol. These are indices of original states, which
    /// need to be resolved through [`Partition::find`] before being used as blocks.
    pub fn transitions(&self) -> &[Option<usize>] {
        &self.transitions
    }

    /// Whether the block has been logged as changed in the current speculative session.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn restore_from(&mut self, other: &Block) {
        self.parent = other.parent;
        self.size = other.size;
        self.ring_next = other.ring_next;
        self.label = other.label;
        self.transitions.clone_from(&other.transitions);
    }
}

/// Union-find over the states of a reference automaton, see the module documentation.
#[derive(Debug, Clone)]
pub struct Partition {
    blocks: Vec<Block>,
    block_count: usize,
    accepting_block_count: usize,
    rejecting_block_count: usize,
    alphabet_size: usize,
    starting_state: usize,
    copy_mode: bool,
    changed_blocks: Vec<usize>,
}

impl Partition {
    /// Creates the finest partition of `reference`, where every state forms its own block.
    /// Fails if the automaton does not pass [`Dfa::validate`].
    pub fn new(reference: &Dfa) -> Result<Self, DfaError> {
        reference.validate()?;

        let mut accepting_block_count = 0;
        let mut rejecting_block_count = 0;
        let blocks = reference
            .states()
            .iter()
            .enumerate()
            .map(|(id, state)| {
                match state.label() {
                    StateLabel::Accepting => accepting_block_count += 1,
                    StateLabel::Rejecting => rejecting_block_count += 1,
                    StateLabel::Unlabelled => {}
                }
                Block {
                    parent: id,
                    size: 1,
                    ring_next: id,
                    label: state.label(),
                    transitions: state.transitions().to_vec(),
                    dirty: false,
                }
            })
            .collect_vec();

        Ok(Self {
            block_count: blocks.len(),
            blocks,
            accepting_block_count,
            rejecting_block_count,
            alphabet_size: reference.alphabet_size(),
            starting_state: reference.starting_state(),
            copy_mode: false,
            changed_blocks: Vec::new(),
        })
    }

    /// Number of states of the underlying reference automaton.
    pub fn size(&self) -> usize {
        self.blocks.len()
    }

    /// Number of blocks, i.e. the number of roots.
    pub fn block_count(&self) -> usize {
        self.block_count
    }

    /// Number of blocks labelled as accepting.
    pub fn accepting_block_count(&self) -> usize {
        self.accepting_block_count
    }

    /// Number of blocks labelled as rejecting.
    pub fn rejecting_block_count(&self) -> usize {
        self.rejecting_block_count
    }

    /// Number of blocks that are either accepting or rejecting.
    pub fn labelled_block_count(&self) -> usize {
        self.accepting_block_count + self.rejecting_block_count
    }

    /// Number of symbols in the alphabet.
    pub fn alphabet_size(&self) -> usize {
        self.alphabet_size
    }

    /// The starting state of the reference automaton.
    pub fn starting_state(&self) -> usize {
        self.starting_state
    }

    /// Gives access to the block stored for `id`.
    ///
    /// # Panics
    /// If `id` is out of range.
    pub fn block(&self, id: usize) -> &Block {
        &self.blocks[id]
    }

    /// Whether this partition logs its changes, see [`Partition::copy`].
    pub fn is_copy(&self) -> bool {
        self.copy_mode
    }

    /// Blocks changed since the last rollback or commit. Always empty outside of copy mode.
    pub fn changed_blocks(&self) -> &[usize] {
        &self.changed_blocks
    }

    /// Records `id` in the change log before it is modified. Each block is logged at most
    /// once per speculative session.
    fn mark_changed(&mut self, id: usize) {
        if self.copy_mode && !self.blocks[id].dirty {
            self.changed_blocks.push(id);
            self.blocks[id].dirty = true;
        }
    }

    /// Returns the root of the block containing `state`, halving the path on the way.
    pub fn find(&mut self, mut state: usize) -> usize {
        loop {
            let parent = self.blocks[state].parent;
            if parent == state {
                return state;
            }
            let grandparent = self.blocks[parent].parent;
            if grandparent != parent {
                self.mark_changed(state);
                self.blocks[state].parent = grandparent;
            }
            state = grandparent;
        }
    }

    /// Same as [`Partition::find`] but leaves the forest untouched, which makes it usable
    /// on a shared partition.
    pub fn root_of(&self, mut state: usize) -> usize {
        while self.blocks[state].parent != state {
            state = self.blocks[state].parent;
        }
        state
    }

    /// Whether the two states have been folded into the same block.
    pub fn within_same_block(&mut self, state_a: usize, state_b: usize) -> bool {
        self.find(state_a) == self.find(state_b)
    }

    /// The block containing the starting state.
    pub fn starting_block(&mut self) -> usize {
        self.find(self.starting_state)
    }

    /// Joins the two distinct roots `root_a` and `root_b`. The smaller block becomes a child of
    /// the larger one (ties go to `root_a`), the parent inherits the child's label if it has
    /// none and adopts every transition it is missing. Label conflicts must have been ruled out
    /// by the caller, see [`Partition::merge_states`].
    ///
    /// # Panics
    /// If the two blocks coincide, if either of them is not a root or if their labels conflict.
    pub fn union(&mut self, root_a: usize, root_b: usize) {
        assert_ne!(root_a, root_b, "cannot join a block with itself");
        assert!(
            self.blocks[root_a].parent == root_a && self.blocks[root_b].parent == root_b,
            "only root blocks can be joined, got {root_a} and {root_b}"
        );
        assert!(
            !self.blocks[root_a]
                .label
                .conflicts_with(self.blocks[root_b].label),
            "cannot join blocks {root_a} and {root_b} with conflicting labels"
        );

        self.mark_changed(root_a);
        self.mark_changed(root_b);
        self.block_count -= 1;

        let (parent, child) = if self.blocks[root_a].size < self.blocks[root_b].size {
            (root_b, root_a)
        } else {
            (root_a, root_b)
        };

        // splice the two rings into one
        let parent_next = self.blocks[parent].ring_next;
        self.blocks[parent].ring_next = self.blocks[child].ring_next;
        self.blocks[child].ring_next = parent_next;

        self.blocks[child].parent = parent;
        self.blocks[parent].size += self.blocks[child].size;

        let child_label = self.blocks[child].label;
        match (self.blocks[parent].label, child_label) {
            (StateLabel::Unlabelled, label) if label.is_labelled() => {
                self.blocks[parent].label = label;
            }
            (StateLabel::Accepting, StateLabel::Accepting) => self.accepting_block_count -= 1,
            (StateLabel::Rejecting, StateLabel::Rejecting) => self.rejecting_block_count -= 1,
            _ => {}
        }

        let mut child_transitions = std::mem::take(&mut self.blocks[child].transitions);
        for (own, adopted) in self.blocks[parent]
            .transitions
            .iter_mut()
            .zip(child_transitions.iter_mut())
        {
            if own.is_none() {
                *own = adopted.take();
            }
        }
        self.blocks[child].transitions = child_transitions;
    }

    /// Returns every original state folded into the block that `block` belongs to, starting
    /// with `block` itself and following the ring.
    pub fn return_set(&self, block: usize) -> Vec<usize> {
        let mut members = vec![block];
        let mut current = self.blocks[block].ring_next;
        while current != block {
            members.push(current);
            current = self.blocks[current].ring_next;
        }
        members
    }

    /// Returns a copy of `self` in copy mode with an empty change log. Speculative merges on
    /// the copy can be undone with [`Partition::rollback_from`] or committed to `self` with
    /// [`Partition::copy_changes_from`].
    ///
    /// # Panics
    /// If `self` is already in copy mode.
    pub fn copy(&self) -> Partition {
        assert!(
            !self.copy_mode,
            "cannot copy a partition that is already in copy mode"
        );
        let mut copied = self.clone();
        copied.copy_mode = true;
        copied.changed_blocks = Vec::with_capacity(self.blocks.len());
        copied
    }

    /// Undoes every change logged since the last rollback or commit by restoring the touched
    /// blocks and the block counts from `baseline`.
    ///
    /// # Panics
    /// If `self` is not in copy mode.
    pub fn rollback_from(&mut self, baseline: &Partition) {
        assert!(
            self.copy_mode,
            "only a partition in copy mode can be rolled back"
        );
        self.block_count = baseline.block_count;
        self.accepting_block_count = baseline.accepting_block_count;
        self.rejecting_block_count = baseline.rejecting_block_count;

        for &id in &self.changed_blocks {
            let block = &mut self.blocks[id];
            block.restore_from(&baseline.blocks[id]);
            block.dirty = false;
        }
        self.changed_blocks.clear();
    }

    /// Commits the changes logged in `speculative` to `self` and clears the log of
    /// `speculative`, leaving both partitions identical and the copy ready for the next trial.
    ///
    /// # Panics
    /// If `speculative` is not in copy mode.
    pub fn copy_changes_from(&mut self, speculative: &mut Partition) {
        assert!(
            speculative.copy_mode,
            "changes can only be copied from a partition in copy mode"
        );
        self.block_count = speculative.block_count;
        self.accepting_block_count = speculative.accepting_block_count;
        self.rejecting_block_count = speculative.rejecting_block_count;

        for &id in &speculative.changed_blocks {
            self.blocks[id].restore_from(&speculative.blocks[id]);
            speculative.blocks[id].dirty = false;
        }
        speculative.changed_blocks.clear();
    }
}

impl TryFrom<&Dfa> for Partition {
    type Error = DfaError;

    fn try_from(reference: &Dfa) -> Result<Self, Self::Error> {
        Partition::new(reference)
    }
}

impl Dfa {
    /// Builds the finest [`Partition`] of `self`.
    pub fn to_partition(&self) -> Result<Partition, DfaError> {
        Partition::new(self)
    }
}

/// Two partitions are equal if they fold the same states into the same roots and agree on
/// rings, labels, transitions and block counts. The shape of the forest below the roots is
/// ignored, as is whether either partition is in copy mode.
impl PartialEq for Partition {
    fn eq(&self, other: &Self) -> bool {
        self.block_count == other.block_count
            && self.accepting_block_count == other.accepting_block_count
            && self.rejecting_block_count == other.rejecting_block_count
            && self.alphabet_size == other.alphabet_size
            && self.starting_state == other.starting_state
            && self.blocks.len() == other.blocks.len()
            && self.blocks.iter().zip(&other.blocks).enumerate().all(|(id, (own, theirs))| {
                self.root_of(id) == other.root_of(id)
                    && own.size == theirs.size
                    && own.ring_next == theirs.ring_next
                    && own.label == theirs.label
                    && own.transitions == theirs.transitions
            })
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = tabled::builder::Builder::default();
        builder.push_record(
            ["Block".to_string(), "Members".to_string()]
                .into_iter()
                .chain((0..self.alphabet_size).map(|symbol| symbol.to_string())),
        );
        let starting_block = self.root_of(self.starting_state);
        for (id, block) in self.blocks.iter().enumerate() {
            if block.parent != id {
                continue;
            }
            let initial = if id == starting_block { "->" } else { "" };
            let mut row = vec![
                format!("{initial}{id} {}", block.label),
                format!("{{{}}}", self.return_set(id).into_iter().sorted().join(", ")),
            ];
            row.extend(block.transitions.iter().map(|target| match target {
                Some(target) => self.root_of(*target).to_string(),
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
