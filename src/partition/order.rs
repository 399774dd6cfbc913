use crate::math::IndexSet;

use super::Partition;

impl Partition {
    /// Returns every root block in increasing index order.
    pub fn root_blocks(&self) -> Vec<usize> {
        let mut roots = Vec::with_capacity(self.block_count);
        for (id, block) in self.blocks.iter().enumerate() {
            if block.parent == id {
                roots.push(id);
                if roots.len() == self.block_count {
                    break;
                }
            }
        }
        roots
    }

    /// Returns the root blocks reachable from the starting block in breadth-first order,
    /// exploring successors by increasing symbol. The result does not depend on anything
    /// but the current partition, which makes it the canonical visiting order for searches.
    pub fn ordered_blocks(&mut self) -> Vec<usize> {
        self.breadth_first()
            .into_iter()
            .map(|(block, _)| block)
            .collect()
    }

    /// Returns, for every state index, the length of the shortest path from the starting
    /// block to the root block stored at that index. Entries of non-root and unreachable
    /// blocks are `None`.
    pub fn depth_of_blocks(&mut self) -> Vec<Option<usize>> {
        let mut depths = vec![None; self.blocks.len()];
        for (block, depth) in self.breadth_first() {
            depths[block] = Some(depth);
        }
        depths
    }

    /// Returns, for every state index, the position of its root block in
    /// [`Partition::ordered_blocks`]. Entries of non-root and unreachable blocks are `None`.
    pub fn order_of_blocks(&mut self) -> Vec<Option<usize>> {
        let mut order = vec![None; self.blocks.len()];
        for (position, (block, _)) in self.breadth_first().into_iter().enumerate() {
            order[block] = Some(position);
        }
        order
    }

    /// Length of the longest shortest path from the starting block to any reachable block.
    pub fn depth(&mut self) -> usize {
        self.breadth_first()
            .last()
            .map(|(_, depth)| *depth)
            .unwrap_or_default()
    }

    /// Reachable root blocks paired with their distance from the starting block, in
    /// breadth-first order.
    fn breadth_first(&mut self) -> Vec<(usize, usize)> {
        let start = self.starting_block();
        let mut visited = IndexSet::with_capacity(self.blocks.len());
        visited.insert(start);
        let mut order = Vec::with_capacity(self.block_count);
        order.push((start, 0));

        let mut next = 0;
        while let Some(&(block, depth)) = order.get(next) {
            next += 1;
            for symbol in 0..self.alphabet_size {
                let Some(target) = self.blocks[block].transitions[symbol] else {
                    continue;
                };
                let target = self.find(target);
                if visited.insert(target) {
                    order.push((target, depth + 1));
                }
            }
        }
        order
    }

    /// Returns the successor block of `block` on `symbol`, if there is one.
    pub fn successor(&mut self, block: usize, symbol: usize) -> Option<usize> {
        let root = self.find(block);
        let target = self.blocks[root].transitions[symbol]?;
        Some(self.find(target))
    }
}

#[cfg(test)]
mod tests {
    use crate::dfa::tests::small_apta;
    use crate::partition::Partition;

    #[test]
    fn roots_in_index_order() {
        let mut partition = Partition::new(&small_apta()).unwrap();
        assert_eq!(partition.root_blocks(), vec![0, 1, 2, 3, 4]);
        assert!(partition.merge_states(2, 4));
        assert_eq!(partition.root_blocks(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn breadth_first_order_resolves_targets() {
        let mut partition = Partition::new(&small_apta()).unwrap();
        assert_eq!(partition.ordered_blocks(), vec![0, 1, 2, 3, 4]);

        assert!(partition.merge_states(0, 1));
        assert_eq!(partition.ordered_blocks(), vec![0, 2, 4]);
        assert_eq!(partition.successor(3, 0), Some(0));
        assert_eq!(partition.successor(4, 0), None);
    }

    #[test]
    fn depth_and_order_follow_the_quotient() {
        let mut partition = Partition::new(&small_apta()).unwrap();
        assert_eq!(
            partition.depth_of_blocks(),
            vec![Some(0), Some(1), Some(1), Some(2), Some(2)]
        );
        assert_eq!(
            partition.order_of_blocks(),
            vec![Some(0), Some(1), Some(2), Some(3), Some(4)]
        );
        assert_eq!(partition.depth(), 2);

        assert!(partition.merge_states(0, 1));
        assert_eq!(
            partition.depth_of_blocks(),
            vec![Some(0), None, Some(1), None, Some(2)]
        );
        assert_eq!(
            partition.order_of_blocks(),
            vec![Some(0), None, Some(1), None, Some(2)]
        );
        assert_eq!(partition.depth(), 2);

        assert!(partition.merge_states(2, 4));
        assert_eq!(partition.depth(), 1);
    }

    #[test]
    fn unreachable_roots_are_skipped() {
        let mut dfa = small_apta();
        dfa.add_state(crate::dfa::StateLabel::Accepting);
        let mut partition = Partition::new(&dfa).unwrap();
        assert_eq!(partition.root_blocks().len(), 6);
        assert_eq!(partition.ordered_blocks(), vec![0, 1, 2, 3, 4]);
    }
}
