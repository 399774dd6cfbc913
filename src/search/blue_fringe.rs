use tracing::{debug, trace};

use crate::{math::IndexSet, partition::Partition};

use super::{MergeData, MergeSession, ScoringFunction, StatePairScore};

/// Resolves `red` to the current blocks and returns the red blocks together with their blue
/// frontier, both in breadth-first order from the starting block.
pub fn ordered_red_blue(partition: &mut Partition, red: &[usize]) -> (Vec<usize>, Vec<usize>) {
    let mut is_red = IndexSet::with_capacity(partition.size());
    for &state in red {
        is_red.insert(partition.find(state));
    }

    let mut is_blue = IndexSet::with_capacity(partition.size());
    let red_blocks: Vec<usize> = is_red.iter().collect();
    for block in red_blocks {
        for symbol in 0..partition.alphabet_size() {
            if let Some(target) = partition.successor(block, symbol) {
                if !is_red.contains(target) {
                    is_blue.insert(target);
                }
            }
        }
    }

    let mut ordered_red = Vec::with_capacity(is_red.len());
    let mut ordered_blue = Vec::with_capacity(is_blue.len());
    for block in partition.ordered_blocks() {
        if is_red.contains(block) {
            ordered_red.push(block);
        } else if is_blue.contains(block) {
            ordered_blue.push(block);
        }
    }
    (ordered_red, ordered_blue)
}

/// Evidence driven search in the red-blue framework. Every blue block is scored against
/// every red block. The first blue block that cannot be merged with any red block is
/// promoted to red, otherwise the best scoring pair of the sweep is committed. Terminates
/// once the blue frontier is empty.
///
/// # Panics
/// If `partition` is in copy mode.
pub fn blue_fringe_search(
    partition: Partition,
    scoring: &impl ScoringFunction,
) -> (Partition, MergeData) {
    let mut session = MergeSession::new(partition);
    let start = session.working.starting_block();
    let (mut red, mut blue) = ordered_red_blue(&mut session.working, &[start]);

    while !blue.is_empty() {
        trace!("{} red and {} blue blocks", red.len(), blue.len());
        let mut best = StatePairScore::none();
        let mut promoted = None;

        for &blue_state in &blue {
            let mut merged = false;
            for &red_state in &red {
                if session.attempt(blue_state, red_state) {
                    let score = session.score(scoring, blue_state, red_state);
                    best.improve(blue_state, red_state, score);
                    merged = true;
                }
                session.rollback();
            }
            if !merged {
                promoted = Some(blue_state);
                break;
            }
        }

        match promoted {
            Some(blue_state) => {
                debug!("promoting {blue_state} to red");
                red.push(blue_state);
            }
            None if best.is_valid() => session.replay(best),
            None => break,
        }
        (red, blue) = ordered_red_blue(&mut session.working, &red);
    }

    session.finish("blue-fringe search")
}
