use tracing::{debug, trace};

use crate::{math::IndexSet, partition::Partition};

use super::{MergeData, MergeSession, StatePairScore, NO_SCORE};

/// Resolves every red state to its current block, dropping duplicates while keeping the
/// order in which blocks first became red, and returns the blue frontier: the successor
/// blocks of red blocks that are not red themselves, collected by red order first and
/// symbol second.
pub fn red_blue_sets(partition: &mut Partition, red: &mut Vec<usize>) -> Vec<usize> {
    let mut is_red = IndexSet::with_capacity(partition.size());
    red.retain_mut(|state| {
        *state = partition.find(*state);
        is_red.insert(*state)
    });

    let mut blue = Vec::new();
    let mut is_blue = IndexSet::with_capacity(partition.size());
    for &state in red.iter() {
        for symbol in 0..partition.alphabet_size() {
            if let Some(target) = partition.successor(state, symbol) {
                if !is_red.contains(target) && is_blue.insert(target) {
                    blue.push(target);
                }
            }
        }
    }
    blue
}

/// Greedy search in the red-blue framework, as used by RPNI. The first blue block is merged
/// into the first red block it can be merged with; if there is none, it becomes red itself.
/// Terminates once every successor of a red block is red.
///
/// # Panics
/// If `partition` is in copy mode.
pub fn red_blue_search(partition: Partition) -> (Partition, MergeData) {
    let mut session = MergeSession::new(partition);
    let mut red = vec![session.working.starting_block()];
    let mut blue = red_blue_sets(&mut session.working, &mut red);

    while let Some(&candidate) = blue.first() {
        trace!("{} red and {} blue blocks", red.len(), blue.len());
        let mut merged = false;
        for &red_state in &red {
            if session.attempt(red_state, candidate) {
                session.commit(StatePairScore::new(red_state, candidate, NO_SCORE));
                merged = true;
                break;
            }
            session.rollback();
        }

        if !merged {
            debug!("promoting {candidate} to red");
            red.push(candidate);
        }
        blue = red_blue_sets(&mut session.working, &mut red);
    }

    session.finish("red-blue search")
}
