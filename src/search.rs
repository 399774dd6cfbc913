//! Search strategies that drive [`Partition::merge_states`] through the lattice of
//! partitions until no valid merge remains.
//!
//! Every strategy works on a *working* partition, which only ever contains accepted merges,
//! and a *trial* partition obtained from [`Partition::copy`]. Candidate merges are performed
//! on the trial and are either undone with [`Partition::rollback_from`] or committed with
//! [`Partition::copy_changes_from`].

use std::{
    fmt,
    time::{Duration, Instant},
};

use owo_colors::OwoColorize;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    dfa::{Dfa, DfaError},
    partition::Partition,
};

mod blue_fringe;
mod exhaustive;
mod red_blue;
mod windowed;

pub use blue_fringe::{blue_fringe_search, ordered_red_blue};
pub use exhaustive::exhaustive_search;
pub use red_blue::{red_blue_search, red_blue_sets};
pub use windowed::{update_window, windowed_search};

/// Score used for a pair before any valid merge has been found.
pub const NO_SCORE: f64 = -1.0;

/// Fails fast on parameters that make a search meaningless.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    /// The window must contain at least one block.
    #[error("window size must be at least 1, got {0}")]
    InvalidWindowSize(usize),
    /// The window would never grow.
    #[error("grow factor must be greater than 1, got {0}")]
    InvalidGrowFactor(f64),
    /// The automaton cannot be turned into a partition.
    #[error("invalid automaton: {0}")]
    InvalidAutomaton(#[from] DfaError),
}

/// A pair of states together with the score of merging them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatePairScore {
    /// The first state of the pair.
    pub state_a: usize,
    /// The second state of the pair.
    pub state_b: usize,
    /// The score of the merge, [`NO_SCORE`] if no merge has been found.
    pub score: f64,
}

impl StatePairScore {
    /// Creates a new scored pair.
    pub fn new(state_a: usize, state_b: usize, score: f64) -> Self {
        Self {
            state_a,
            state_b,
            score,
        }
    }

    /// The placeholder for "no valid merge found yet".
    pub fn none() -> Self {
        Self::new(usize::MAX, usize::MAX, NO_SCORE)
    }

    /// Whether this pair stands for an actual valid merge.
    pub fn is_valid(&self) -> bool {
        self.score >= 0.0
    }

    /// Replaces `self` with the given pair if its score is strictly higher, so the first
    /// pair found among equally good ones is kept.
    pub fn improve(&mut self, state_a: usize, state_b: usize, score: f64) {
        if score > self.score {
            *self = Self::new(state_a, state_b, score);
        }
    }
}

impl fmt::Display for StatePairScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}) scoring {}", self.state_a, self.state_b, self.score)
    }
}

/// Statistics recorded by a search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeData {
    /// Accepted merges in the order in which they were committed.
    pub merges: Vec<StatePairScore>,
    /// Number of merges that were attempted on the trial partition.
    pub attempted_merges: usize,
    /// Number of attempted merges that turned out to be valid.
    pub valid_merges: usize,
    /// Wall clock time spent in the search.
    pub duration: Duration,
}

impl MergeData {
    /// Number of accepted merges.
    pub fn merges_count(&self) -> usize {
        self.merges.len()
    }

    /// Attempted merges per second of search time, `0.0` if no time was measured.
    pub fn attempted_merges_per_second(&self) -> f64 {
        let seconds = self.duration.as_secs_f64();
        if seconds == 0.0 {
            return 0.0;
        }
        self.attempted_merges as f64 / seconds
    }
}

/// Rates the merge of `state_a` and `state_b`, given the partition before the merge and the
/// trial partition after it. Valid merges must be rated with a non-negative score, higher
/// scores are preferred.
pub trait ScoringFunction {
    /// Computes the score.
    fn score(&self, state_a: usize, state_b: usize, before: &Partition, after: &Partition)
        -> f64;
}

impl<F> ScoringFunction for F
where
    F: Fn(usize, usize, &Partition, &Partition) -> f64,
{
    fn score(&self, state_a: usize, state_b: usize, before: &Partition, after: &Partition) -> f64 {
        (self)(state_a, state_b, before, after)
    }
}

/// Evidence driven scoring: the more labelled states end up sharing a block, the better.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvidenceScore {
    labelled_states: usize,
}

impl EvidenceScore {
    /// Scores merges relative to the labelled states of `reference`.
    pub fn new(reference: &Dfa) -> Self {
        Self {
            labelled_states: reference.labelled_states_count(),
        }
    }

    /// Scores merges relative to the labelled blocks of `partition`, which for a freshly
    /// created partition are exactly the labelled states of its reference.
    pub fn for_partition(partition: &Partition) -> Self {
        Self {
            labelled_states: partition.labelled_block_count(),
        }
    }
}

impl ScoringFunction for EvidenceScore {
    fn score(&self, _: usize, _: usize, _: &Partition, after: &Partition) -> f64 {
        self.labelled_states.saturating_sub(after.labelled_block_count()) as f64
    }
}

/// Parameters of [`windowed_search`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowConfig {
    /// Number of blocks, in breadth-first order, considered at the start of every round.
    pub window_size: usize,
    /// Factor by which the window grows when it contains no valid merge.
    pub grow_factor: f64,
}

impl WindowConfig {
    /// Creates a new configuration, which is checked by [`WindowConfig::validate`].
    pub fn new(window_size: usize, grow_factor: f64) -> Self {
        Self {
            window_size,
            grow_factor,
        }
    }

    /// Rejects window sizes below one and grow factors that are not greater than one.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.window_size < 1 {
            return Err(SearchError::InvalidWindowSize(self.window_size));
        }
        if self.grow_factor.is_nan() || self.grow_factor <= 1.0 {
            return Err(SearchError::InvalidGrowFactor(self.grow_factor));
        }
        Ok(())
    }

    /// The window size following `current`, which exposes at least one more block and
    /// never exceeds `limit`.
    pub fn grow(&self, current: usize, limit: usize) -> usize {
        let scaled = (current as f64 * self.grow_factor).round() as usize;
        scaled.max(current + 1).min(limit)
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self::new(64, 2.0)
    }
}

/// Bookkeeping shared by all strategies: the working partition, the trial partition and
/// the statistics.
struct MergeSession {
    working: Partition,
    trial: Partition,
    data: MergeData,
    start: Instant,
}

impl MergeSession {
    /// # Panics
    /// If `partition` is in copy mode.
    fn new(partition: Partition) -> Self {
        let trial = partition.copy();
        Self {
            working: partition,
            trial,
            data: MergeData::default(),
            start: Instant::now(),
        }
    }

    /// Attempts the merge on the trial partition. The caller has to follow up with either
    /// [`MergeSession::rollback`] or [`MergeSession::commit`].
    fn attempt(&mut self, state_a: usize, state_b: usize) -> bool {
        self.data.attempted_merges += 1;
        let valid = self.trial.merge_states(state_a, state_b);
        if valid {
            self.data.valid_merges += 1;
        }
        valid
    }

    fn score(&self, scoring: &impl ScoringFunction, state_a: usize, state_b: usize) -> f64 {
        scoring.score(state_a, state_b, &self.working, &self.trial)
    }

    fn rollback(&mut self) {
        self.trial.rollback_from(&self.working);
    }

    /// Commits whatever is currently merged on the trial partition.
    fn commit(&mut self, pair: StatePairScore) {
        self.working.copy_changes_from(&mut self.trial);
        debug!(
            "{} {pair}, {} blocks left",
            "committed".green(),
            self.working.block_count()
        );
        self.data.merges.push(pair);
    }

    /// Redoes the merge of `pair` on the clean trial partition and commits it.
    fn replay(&mut self, pair: StatePairScore) {
        let valid = self.trial.merge_states(pair.state_a, pair.state_b);
        debug_assert!(valid, "replaying a merge that was valid before cannot fail");
        self.commit(pair);
    }

    fn finish(mut self, strategy: &str) -> (Partition, MergeData) {
        self.data.duration = self.start.elapsed();
        info!(
            "{} finished with {} blocks after {} merges ({} attempted, {} valid) in {:?}",
            strategy.bold(),
            self.working.block_count(),
            self.data.merges_count(),
            self.data.attempted_merges,
            self.data.valid_merges,
            self.data.duration
        );
        (self.working, self.data)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        dataset::Dataset,
        dfa::{tests::small_apta, StateLabel::*},
    };

    /// Sample over two symbols labelled by "ends in 1".
    pub fn ends_in_one_sample() -> Dataset {
        Dataset::from_iter([
            (vec![], false),
            (vec![0], false),
            (vec![1], true),
            (vec![0, 0], false),
            (vec![0, 1], true),
            (vec![1, 0], false),
            (vec![1, 1], true),
            (vec![0, 1, 0], false),
            (vec![1, 0, 1], true),
            (vec![1, 1, 0], false),
        ])
    }

    /// The augmented prefix tree of [`ends_in_one_sample`].
    pub fn ends_in_one_apta() -> Dfa {
        ends_in_one_sample().prefix_tree(true).unwrap()
    }

    /// Checks the shape every strategy converges to on [`small_apta`].
    pub fn assert_two_state_result(partition: &mut Partition) {
        let quotient = partition.to_quotient_automaton();
        assert_eq!(quotient.size(), 2);
        let start = quotient.starting_state();
        assert_eq!(quotient.label(start), Some(Rejecting));
        assert_eq!(quotient.transition(start, 0), Some(start));
        let accepting = quotient.transition(start, 1).unwrap();
        assert_eq!(quotient.label(accepting), Some(Accepting));
        assert_eq!(quotient.transition(accepting, 1), Some(accepting));
        assert_eq!(quotient.transition(accepting, 0), None);
    }

    #[test]
    fn window_config_validation() {
        assert_eq!(WindowConfig::default().validate(), Ok(()));
        assert_eq!(
            WindowConfig::new(0, 2.0).validate(),
            Err(SearchError::InvalidWindowSize(0))
        );
        assert_eq!(
            WindowConfig::new(4, 1.0).validate(),
            Err(SearchError::InvalidGrowFactor(1.0))
        );
        assert!(WindowConfig::new(4, f64::NAN).validate().is_err());
    }

    #[test]
    fn window_growth() {
        let config = WindowConfig::new(2, 2.0);
        assert_eq!(config.grow(2, 100), 4);
        assert_eq!(config.grow(4, 5), 5);
        let slow = WindowConfig::new(2, 1.01);
        assert_eq!(slow.grow(2, 100), 3);
    }

    #[test]
    fn best_pair_keeps_first_of_equals() {
        let mut best = StatePairScore::none();
        assert!(!best.is_valid());
        best.improve(0, 1, 0.0);
        assert!(best.is_valid());
        best.improve(2, 3, 0.0);
        assert_eq!((best.state_a, best.state_b), (0, 1));
        best.improve(2, 3, 2.0);
        assert_eq!(best, StatePairScore::new(2, 3, 2.0));
    }

    #[test]
    fn evidence_score() {
        let apta = small_apta();
        let scoring = EvidenceScore::new(&apta);
        let before = Partition::new(&apta).unwrap();
        assert_eq!(scoring, EvidenceScore::for_partition(&before));

        let mut after = before.copy();
        assert!(after.merge_states(0, 1));
        assert_eq!(scoring.score(0, 1, &before, &after), 1.0);
        after.rollback_from(&before);
        assert!(after.merge_states(2, 4));
        assert_eq!(scoring.score(2, 4, &before, &after), 1.0);

        let closure = |_: usize, _: usize, _: &Partition, after: &Partition| {
            after.block_count() as f64
        };
        assert_eq!(closure.score(2, 4, &before, &after), 4.0);
    }

    #[test]
    fn merge_data_statistics() {
        let data = MergeData {
            merges: vec![StatePairScore::new(0, 1, 1.0)],
            attempted_merges: 10,
            valid_merges: 4,
            duration: Duration::from_millis(500),
        };
        assert_eq!(data.merges_count(), 1);
        assert_eq!(data.attempted_merges_per_second(), 20.0);
        assert_eq!(MergeData::default().attempted_merges_per_second(), 0.0);
    }
}
