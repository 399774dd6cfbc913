//! Ready to use inference algorithms that turn a reference automaton or a labelled sample
//! into a consistent automaton.

use thiserror::Error;
use tracing::info;

use crate::{
    dataset::{Dataset, DatasetError},
    dfa::Dfa,
    partition::Partition,
    search::{
        blue_fringe_search, exhaustive_search, red_blue_search, windowed_search, EvidenceScore,
        MergeData, SearchError, WindowConfig,
    },
};

/// Errors raised by the inference entry points working on a [`Dataset`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InferenceError {
    /// The sample does not yield a prefix tree.
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    /// The search could not be started.
    #[error(transparent)]
    Search(#[from] SearchError),
}

fn prepare(reference: &Dfa) -> Result<Partition, SearchError> {
    Ok(Partition::new(reference)?)
}

fn finish(algorithm: &str, mut partition: Partition, data: MergeData) -> (Dfa, MergeData) {
    let dfa = partition.to_quotient_automaton();
    info!(
        "{algorithm} inferred an automaton with {} states",
        dfa.size()
    );
    (dfa, data)
}

/// Regular positive and negative inference, i.e. [`red_blue_search`] on `reference`.
pub fn rpni(reference: &Dfa) -> Result<(Dfa, MergeData), SearchError> {
    let (partition, data) = red_blue_search(prepare(reference)?);
    Ok(finish("RPNI", partition, data))
}

/// Evidence driven state merging scanning all pairs of blocks, see [`exhaustive_search`].
pub fn exhaustive_edsm(reference: &Dfa) -> Result<(Dfa, MergeData), SearchError> {
    let scoring = EvidenceScore::new(reference);
    let (partition, data) = exhaustive_search(prepare(reference)?, &scoring);
    Ok(finish("exhaustive EDSM", partition, data))
}

/// Evidence driven state merging within a growing window, see [`windowed_search`].
pub fn windowed_edsm(
    reference: &Dfa,
    config: WindowConfig,
) -> Result<(Dfa, MergeData), SearchError> {
    config.validate()?;
    let scoring = EvidenceScore::new(reference);
    let (partition, data) = windowed_search(prepare(reference)?, config, &scoring)?;
    Ok(finish("windowed EDSM", partition, data))
}

/// Evidence driven state merging in the red-blue framework, see [`blue_fringe_search`].
pub fn blue_fringe_edsm(reference: &Dfa) -> Result<(Dfa, MergeData), SearchError> {
    let scoring = EvidenceScore::new(reference);
    let (partition, data) = blue_fringe_search(prepare(reference)?, &scoring);
    Ok(finish("blue-fringe EDSM", partition, data))
}

/// Runs [`rpni`] on the augmented prefix tree of `dataset`.
pub fn rpni_from_dataset(dataset: &Dataset) -> Result<(Dfa, MergeData), InferenceError> {
    Ok(rpni(&dataset.prefix_tree(true)?)?)
}

/// Runs [`exhaustive_edsm`] on the augmented prefix tree of `dataset`.
pub fn exhaustive_edsm_from_dataset(
    dataset: &Dataset,
) -> Result<(Dfa, MergeData), InferenceError> {
    Ok(exhaustive_edsm(&dataset.prefix_tree(true)?)?)
}

/// Runs [`windowed_edsm`] on the augmented prefix tree of `dataset`.
pub fn windowed_edsm_from_dataset(
    dataset: &Dataset,
    config: WindowConfig,
) -> Result<(Dfa, MergeData), InferenceError> {
    config.validate()?;
    Ok(windowed_edsm(&dataset.prefix_tree(true)?, config)?)
}

/// Runs [`blue_fringe_edsm`] on the augmented prefix tree of `dataset`.
pub fn blue_fringe_edsm_from_dataset(
    dataset: &Dataset,
) -> Result<(Dfa, MergeData), InferenceError> {
    Ok(blue_fringe_edsm(&dataset.prefix_tree(true)?)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dfa::DfaError, search::tests::ends_in_one_sample};

    #[test_log::test]
    fn all_algorithms_are_consistent() {
        let sample = ends_in_one_sample();
        let results = [
            rpni_from_dataset(&sample).unwrap(),
            exhaustive_edsm_from_dataset(&sample).unwrap(),
            windowed_edsm_from_dataset(&sample, WindowConfig::new(2, 2.0)).unwrap(),
            blue_fringe_edsm_from_dataset(&sample).unwrap(),
        ];
        for (dfa, data) in results {
            assert!(sample.consistent_with_dfa(&dfa));
            assert_eq!(sample.accuracy(&dfa), 1.0);
            assert!(data.valid_merges <= data.attempted_merges);
            assert!(dfa.size() < sample.prefix_tree(true).unwrap().size());
        }
    }

    #[test_log::test]
    fn errors_are_reported() {
        assert_eq!(
            rpni(&Dfa::new(2)).unwrap_err(),
            SearchError::InvalidAutomaton(DfaError::NoStates)
        );
        assert_eq!(
            blue_fringe_edsm_from_dataset(&Dataset::new()).unwrap_err(),
            InferenceError::Dataset(DatasetError::Empty)
        );
        assert_eq!(
            windowed_edsm_from_dataset(&ends_in_one_sample(), WindowConfig::new(4, 1.0))
                .unwrap_err(),
            InferenceError::Search(SearchError::InvalidGrowFactor(1.0))
        );
    }
}
