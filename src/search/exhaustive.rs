use tracing::trace;

use crate::partition::Partition;

use super::{MergeData, MergeSession, ScoringFunction, StatePairScore};

/// Scores the merge of every pair of blocks and commits the best one, round after round,
/// until no pair can be merged anymore. Among pairs with the same score, the first one in
/// [`Partition::root_blocks`] order wins.
///
/// # Panics
/// If `partition` is in copy mode.
pub fn exhaustive_search(
    partition: Partition,
    scoring: &impl ScoringFunction,
) -> (Partition, MergeData) {
    let mut session = MergeSession::new(partition);

    loop {
        let blocks = session.working.root_blocks();
        trace!("scanning {} blocks", blocks.len());

        let mut best = StatePairScore::none();
        for (i, &state_a) in blocks.iter().enumerate() {
            for &state_b in &blocks[i + 1..] {
                if session.attempt(state_a, state_b) {
                    let score = session.score(scoring, state_a, state_b);
                    best.improve(state_a, state_b, score);
                }
                session.rollback();
            }
        }

        if !best.is_valid() {
            break;
        }
        session.replay(best);
    }

    session.finish("exhaustive search")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dfa::tests::small_apta,
        search::{
            tests::{assert_two_state_result, ends_in_one_apta},
            EvidenceScore,
        },
    };

    #[test_log::test]
    fn converges_on_small_apta() {
        let apta = small_apta();
        let (mut result, data) =
            exhaustive_search(Partition::new(&apta).unwrap(), &EvidenceScore::new(&apta));
        assert_two_state_result(&mut result);
        assert!(data.valid_merges <= data.attempted_merges);
        assert_eq!(
            data.merges,
            vec![StatePairScore::new(0, 1, 1.0), StatePairScore::new(2, 4, 2.0)]
        );
        // 10 pairs in the first round, 3 in the second and 1 in the last
        assert_eq!(data.attempted_merges, 14);
    }

    #[test_log::test]
    fn terminates_with_no_valid_merge_left() {
        let apta = ends_in_one_apta();
        let (result, data) =
            exhaustive_search(Partition::new(&apta).unwrap(), &EvidenceScore::new(&apta));

        let blocks = result.root_blocks();
        let mut trial = result.copy();
        for (i, &a) in blocks.iter().enumerate() {
            for &b in &blocks[i + 1..] {
                assert!(!trial.merge_states(a, b));
                trial.rollback_from(&result);
            }
        }
        assert!(data.merges_count() > 0);
        assert!(data.merges_count() <= apta.size() - blocks.len());
    }

    #[test_log::test]
    fn labelled_evidence_never_grows() {
        let apta = ends_in_one_apta();
        let mut labelled = vec![apta.labelled_states_count()];
        let scoring = |_: usize, _: usize, _: &Partition, after: &Partition| {
            after.block_count() as f64
        };
        let (_, data) = exhaustive_search(Partition::new(&apta).unwrap(), &scoring);

        let mut partition = Partition::new(&apta).unwrap();
        for pair in &data.merges {
            assert!(partition.merge_states(pair.state_a, pair.state_b));
            labelled.push(partition.labelled_block_count());
        }
        assert!(labelled.windows(2).all(|w| w[1] <= w[0]));
    }
}
