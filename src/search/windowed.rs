use tracing::trace;

use crate::{math::IndexSet, partition::Partition};

use super::{MergeData, MergeSession, ScoringFunction, SearchError, StatePairScore, WindowConfig};

/// Maps every block of `window` to its current root and drops repetitions, keeping the
/// position at which a root first occurs.
pub fn update_window(window: &[usize], partition: &mut Partition) -> Vec<usize> {
    let mut seen = IndexSet::with_capacity(partition.size());
    window
        .iter()
        .filter_map(|&block| {
            let root = partition.find(block);
            seen.insert(root).then_some(root)
        })
        .collect()
}

/// Like [`super::exhaustive_search`], but each round only pairs up the first
/// `config.window_size` blocks in breadth-first order. If the window holds no valid merge,
/// it is grown by `config.grow_factor` and only the pairs involving newly exposed blocks are
/// scanned, until a merge is found or the window spans every block.
///
/// Fails with a [`SearchError`] before touching the partition if `config` is invalid.
///
/// # Panics
/// If `partition` is in copy mode.
pub fn windowed_search(
    partition: Partition,
    config: WindowConfig,
    scoring: &impl ScoringFunction,
) -> Result<(Partition, MergeData), SearchError> {
    config.validate()?;

    let mut session = MergeSession::new(partition);
    let mut window = session.working.ordered_blocks();

    loop {
        let mut best = StatePairScore::none();
        let mut previous_size = 0;
        let mut size = config.window_size.min(window.len());

        loop {
            trace!("scanning window of {size} out of {} blocks", window.len());
            for i in 0..size {
                for j in (i + 1).max(previous_size)..size {
                    if session.attempt(window[i], window[j]) {
                        let score = session.score(scoring, window[i], window[j]);
                        best.improve(window[i], window[j], score);
                    }
                    session.rollback();
                }
            }

            if best.is_valid() || size >= window.len() {
                break;
            }
            previous_size = size;
            size = config.grow(size, window.len());
        }

        if !best.is_valid() {
            break;
        }
        session.replay(best);
        window = update_window(&window, &mut session.working);
    }

    Ok(session.finish("windowed search"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dfa::tests::small_apta,
        search::{
            exhaustive_search,
            tests::{assert_two_state_result, ends_in_one_apta, ends_in_one_sample},
            EvidenceScore,
        },
    };

    #[test_log::test]
    fn window_follows_roots() {
        let mut partition = Partition::new(&small_apta()).unwrap();
        let window = partition.ordered_blocks();
        assert!(partition.merge_states(0, 1));
        assert_eq!(update_window(&window, &mut partition), vec![0, 2, 4]);
    }

    #[test_log::test]
    fn invalid_configuration_fails_fast() {
        let apta = small_apta();
        let scoring = EvidenceScore::new(&apta);
        assert_eq!(
            windowed_search(
                Partition::new(&apta).unwrap(),
                WindowConfig::new(0, 2.0),
                &scoring
            )
            .unwrap_err(),
            SearchError::InvalidWindowSize(0)
        );
        assert_eq!(
            windowed_search(
                Partition::new(&apta).unwrap(),
                WindowConfig::new(3, 0.5),
                &scoring
            )
            .unwrap_err(),
            SearchError::InvalidGrowFactor(0.5)
        );
    }

    #[test_log::test]
    fn growing_window_on_small_apta() {
        let apta = small_apta();
        let (mut result, data) = windowed_search(
            Partition::new(&apta).unwrap(),
            WindowConfig::new(2, 2.0),
            &EvidenceScore::new(&apta),
        )
        .unwrap();
        assert_two_state_result(&mut result);
        assert_eq!(
            data.merges,
            vec![StatePairScore::new(0, 1, 1.0), StatePairScore::new(2, 4, 2.0)]
        );
        assert_eq!(data.attempted_merges, 5);
        assert_eq!(data.valid_merges, 2);
    }

    #[test_log::test]
    fn full_window_is_as_consistent_as_exhaustive_search() {
        let sample = ends_in_one_sample();
        let apta = ends_in_one_apta();
        let scoring = EvidenceScore::new(&apta);
        let (mut windowed, _) = windowed_search(
            Partition::new(&apta).unwrap(),
            WindowConfig::default(),
            &scoring,
        )
        .unwrap();
        let (mut exhaustive, _) = exhaustive_search(Partition::new(&apta).unwrap(), &scoring);

        assert!(sample.consistent_with_partition(&windowed));
        assert!(sample.consistent_with_partition(&exhaustive));
        assert!(sample.consistent_with_dfa(&windowed.to_quotient_automaton()));
        assert_eq!(sample.accuracy(&exhaustive.to_quotient_automaton()), 1.0);
    }

    #[test_log::test]
    fn labelled_evidence_shrinks_monotonically() {
        let sample = ends_in_one_sample();
        let apta = ends_in_one_apta();
        let (result, data) = windowed_search(
            Partition::new(&apta).unwrap(),
            WindowConfig::new(2, 1.5),
            &EvidenceScore::new(&apta),
        )
        .unwrap();
        assert!(sample.consistent_with_partition(&result));

        let mut partition = Partition::new(&apta).unwrap();
        let mut labelled = partition.labelled_block_count();
        for pair in &data.merges {
            assert!(pair.score >= 0.0);
            assert!(partition.merge_states(pair.state_a, pair.state_b));
            assert!(partition.labelled_block_count() <= labelled);
            labelled = partition.labelled_block_count();
        }
        assert_eq!(partition, result);
    }

    #[test_log::test]
    fn terminates_with_no_valid_merge_left() {
        let apta = ends_in_one_apta();
        let (mut result, data) = windowed_search(
            Partition::new(&apta).unwrap(),
            WindowConfig::new(1, 1.5),
            &EvidenceScore::new(&apta),
        )
        .unwrap();
        assert!(data.valid_merges <= data.attempted_merges);

        let blocks = result.ordered_blocks();
        let mut trial = result.copy();
        for (i, &a) in blocks.iter().enumerate() {
            for &b in &blocks[i + 1..] {
                assert!(!trial.merge_states(a, b));
                trial.rollback_from(&result);
            }
        }
    }
}
