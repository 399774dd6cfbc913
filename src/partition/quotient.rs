use crate::{dfa::Dfa, math::Bijection};

use super::Partition;

impl Partition {
    /// Collapses every block into a single state. States of the quotient are numbered in
    /// the order of [`Partition::root_blocks`].
    pub fn to_quotient_automaton(&mut self) -> Dfa {
        self.to_quotient_automaton_with_mapping().0
    }

    /// Like [`Partition::to_quotient_automaton`], but additionally returns which root block
    /// became which state of the quotient.
    pub fn to_quotient_automaton_with_mapping(&mut self) -> (Dfa, Bijection<usize, usize>) {
        let roots = self.root_blocks();
        let mut state_of_block = vec![usize::MAX; self.blocks.len()];
        let mut mapping = Bijection::new();
        let mut quotient = Dfa::new(self.alphabet_size);

        for &root in &roots {
            let state = quotient.add_state(self.blocks[root].label);
            state_of_block[root] = state;
            mapping.insert(root, state);
        }

        for &root in &roots {
            for symbol in 0..self.alphabet_size {
                if let Some(target) = self.blocks[root].transitions[symbol] {
                    let target = self.find(target);
                    quotient.set_transition(state_of_block[root], symbol, state_of_block[target]);
                }
            }
        }

        let start = self.starting_block();
        quotient.set_starting_state(state_of_block[start]);
        (quotient, mapping)
    }
}
