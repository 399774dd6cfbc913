use super::Partition;

impl Partition {
    /// Merges the blocks containing `state_a` and `state_b` and then keeps merging successor
    /// blocks until the quotient is deterministic again.
    ///
    /// Returns `false` as soon as two blocks with conflicting labels would have to be joined.
    /// A conflict between the two blocks given directly is detected before anything is
    /// touched, but a conflict further down the cascade leaves the partition with the unions
    /// performed so far. Callers are expected to run this on a partition obtained from
    /// [`Partition::copy`] and to discard a failed attempt with [`Partition::rollback_from`].
    pub fn merge_states(&mut self, state_a: usize, state_b: usize) -> bool {
        // pending pairs are popped depth first, in the order of their symbols
        let mut pending = vec![(state_a, state_b)];
        let mut successors = Vec::with_capacity(self.alphabet_size);

        while let Some((state_a, state_b)) = pending.pop() {
            let root_a = self.find(state_a);
            let root_b = self.find(state_b);
            if root_a == root_b {
                continue;
            }
            if self.blocks[root_a]
                .label
                .conflicts_with(self.blocks[root_b].label)
            {
                return false;
            }

            // successors on which both blocks have a transition need to end up in one block,
            // these have to be collected before the union moves transitions around
            successors.clear();
            for (target_a, target_b) in self.blocks[root_a]
                .transitions
                .iter()
                .zip(&self.blocks[root_b].transitions)
            {
                if let (Some(target_a), Some(target_b)) = (target_a, target_b) {
                    successors.push((*target_a, *target_b));
                }
            }

            self.union(root_a, root_b);
            pending.extend(successors.drain(..).rev());
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use crate::dfa::{tests::small_apta, Dfa, StateLabel::*};
    use crate::partition::Partition;

    /// A prefix tree in which `1` and `01` lead to states with opposite labels, while the
    /// successors of `0` and `1` line up consistently.
    fn fork() -> Dfa {
        Dfa::from_edges(
            2,
            [Unlabelled, Unlabelled, Unlabelled, Rejecting, Accepting, Rejecting, Accepting],
            [(0, 0, 1), (0, 1, 2), (1, 0, 3), (1, 1, 4), (2, 0, 5), (2, 1, 6)],
        )
    }

    #[test_log::test]
    fn merging_within_a_block_is_a_no_op() {
        let mut partition = Partition::new(&small_apta()).unwrap();
        assert!(partition.merge_states(3, 3));
        assert_eq!(partition.block_count(), 5);

        assert!(partition.merge_states(1, 3));
        let counts = (
            partition.block_count(),
            partition.accepting_block_count(),
            partition.rejecting_block_count(),
        );
        assert!(partition.merge_states(3, 1));
        assert!(partition.merge_states(1, 1));
        assert_eq!(
            counts,
            (
                partition.block_count(),
                partition.accepting_block_count(),
                partition.rejecting_block_count(),
            )
        );
    }

    #[test_log::test]
    fn direct_conflict_leaves_partition_untouched() {
        let baseline = Partition::new(&small_apta()).unwrap();
        let mut trial = baseline.copy();
        assert!(!trial.merge_states(1, 2));
        assert!(trial.changed_blocks().is_empty());
        assert_eq!(trial, baseline);
    }

    #[test_log::test]
    fn cascading_conflict_is_undone_by_rollback() {
        let mut apta = small_apta();
        // 0 -0-> 1 and 1 -0-> 3 are fine, but 2 -0-> 5 with 5 accepting clashes with 3
        let five = apta.add_state(Accepting);
        apta.set_transition(2, 0, five);
        let baseline = Partition::new(&apta).unwrap();
        let mut trial = baseline.copy();

        assert!(!trial.merge_states(0, 2));
        assert!(!trial.changed_blocks().is_empty());
        trial.rollback_from(&baseline);
        assert_eq!(trial, baseline);
        assert_eq!(trial.block_count(), 6);
    }

    #[test_log::test]
    fn merge_cascades_to_keep_determinism() {
        let mut partition = Partition::new(&fork()).unwrap();
        assert!(partition.merge_states(1, 2));
        assert!(partition.within_same_block(3, 5));
        assert!(partition.within_same_block(4, 6));
        assert_eq!(partition.block_count(), 4);
        assert_eq!(partition.accepting_block_count(), 1);
        assert_eq!(partition.rejecting_block_count(), 1);
    }

    /// A single-symbol chain `0 -> 1 -> ... -> length - 1` whose last state is accepting.
    fn chain(length: usize) -> Dfa {
        let mut labels = vec![Unlabelled; length];
        labels[length - 1] = Accepting;
        Dfa::from_edges(1, labels, (1..length).map(|state| (state - 1, 0, state)))
    }

    #[test]
    fn long_cascade_collapses_a_chain() {
        let length = 50_000;
        let mut partition = Partition::new(&chain(length)).unwrap();
        assert!(partition.merge_states(0, 1));
        assert_eq!(partition.block_count(), 1);
        assert_eq!(partition.accepting_block_count(), 1);
        assert_eq!(partition.block(partition.root_of(0)).size(), length);
    }

    #[test]
    fn long_cascade_conflict_is_undone_by_rollback() {
        let mut dfa = chain(20_000);
        dfa.set_label(10_000, Rejecting);
        let baseline = Partition::new(&dfa).unwrap();
        let mut trial = baseline.copy();
        assert!(!trial.merge_states(0, 1));
        trial.rollback_from(&baseline);
        assert_eq!(trial, baseline);
    }

    #[test_log::test]
    fn successful_merge_on_small_apta() {
        let mut partition = Partition::new(&small_apta()).unwrap();
        assert!(partition.merge_states(0, 1));
        assert!(partition.within_same_block(0, 3));
        assert_eq!(partition.block_count(), 3);
        assert_eq!(partition.block(partition.root_of(0)).label(), Rejecting);
        assert_eq!(partition.labelled_block_count(), 3);
    }
}
