use itertools::Itertools;
use tracing::trace;

use crate::{
    dfa::{Dfa, DfaError, StateLabel},
    math::Map,
    partition::Partition,
};

impl Dfa {
    /// Computes the coarsest partition of the reachable states that respects labels and
    /// transitions, using Moore's signature refinement. A missing transition is treated as
    /// its own successor class, so states are only identified if they agree on which
    /// transitions exist. The classes are returned as sorted lists of states, ordered by
    /// their smallest member.
    pub fn equivalence_classes(&self) -> Vec<Vec<usize>> {
        let reachable = self.reachable_states();
        let mut class = vec![usize::MAX; self.size()];
        let mut labels: Map<StateLabel, usize> = Map::default();
        for &state in &reachable {
            let next = labels.len();
            class[state] = *labels.entry(self.states()[state].label()).or_insert(next);
        }
        let mut count = labels.len();

        loop {
            let mut signatures: Map<(usize, Vec<Option<usize>>), usize> = Map::default();
            let mut refined = vec![usize::MAX; self.size()];
            for &state in &reachable {
                let successors = self.states()[state]
                    .transitions()
                    .iter()
                    .map(|target| target.map(|t| class[t]))
                    .collect_vec();
                let next = signatures.len();
                refined[state] = *signatures.entry((class[state], successors)).or_insert(next);
            }
            trace!("refined {count} classes into {}", signatures.len());
            class = refined;
            if signatures.len() == count {
                break;
            }
            count = signatures.len();
        }

        reachable
            .into_iter()
            .into_group_map_by(|state| class[*state])
            .into_values()
            .map(|members| members.into_iter().sorted().collect_vec())
            .sorted_by_key(|members| members[0])
            .collect()
    }

    /// Returns the minimal automaton equivalent to the reachable part of `self`. Equivalent
    /// states are folded together in a [`Partition`] and the result is its quotient.
    pub fn minimise(&self) -> Result<Dfa, DfaError> {
        let mut partition = Partition::new(self)?;
        for members in self.equivalence_classes() {
            for pair in members.windows(2) {
                let (root_a, root_b) = (partition.find(pair[0]), partition.find(pair[1]));
                if root_a != root_b {
                    partition.union(root_a, root_b);
                }
            }
        }
        Ok(partition.to_quotient_automaton().remove_unreachable_states())
    }
}
