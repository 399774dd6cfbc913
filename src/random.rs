use tracing::debug;

use crate::{
    dataset::{Dataset, StringInstance},
    dfa::{Dfa, StateLabel},
    math::Set,
};

/// Generate a random complete [`Dfa`] with `size` states over `symbols` symbols. Every state
/// is accepting or rejecting with equal probability and every transition target is drawn
/// uniformly. States that are not reachable from the starting state `0` are removed, so the
/// result may be smaller than `size`.
///
/// # Panics
/// If `symbols` or `size` is zero.
pub fn generate_random_dfa(symbols: usize, size: usize) -> Dfa {
    assert!(symbols > 0 && size > 0, "cannot draw an empty automaton");
    let mut dfa = Dfa::new(symbols);
    for _ in 0..size {
        dfa.add_state(if fastrand::bool() {
            StateLabel::Accepting
        } else {
            StateLabel::Rejecting
        });
    }
    for state in 0..size {
        for symbol in 0..symbols {
            dfa.set_transition(state, symbol, fastrand::usize(..size));
        }
    }

    let trimmed = dfa.remove_unreachable_states();
    debug!(
        "drew automaton with {} of {size} states reachable",
        trimmed.size()
    );
    trimmed
}

/// Generate a random word over `0..symbols`, its length is drawn uniformly from
/// `min_len..=max_len`.
pub fn generate_random_word(symbols: usize, min_len: usize, max_len: usize) -> Vec<usize> {
    let length = fastrand::usize(min_len..=max_len);
    (0..length).map(|_| fastrand::usize(..symbols)).collect()
}

/// Number of distinct words over `symbols` symbols with a length in `min_len..=max_len`,
/// saturating at `usize::MAX`.
fn word_count(symbols: usize, min_len: usize, max_len: usize) -> usize {
    (min_len..=max_len)
        .map(|length| {
            u32::try_from(length)
                .ok()
                .and_then(|length| symbols.checked_pow(length))
                .unwrap_or(usize::MAX)
        })
        .fold(0, usize::saturating_add)
}

/// Generate a [`Dataset`] of `count` distinct words of length `min_len..=max_len`, each
/// labelled by whether `dfa` accepts it.
///
/// # Panics
/// If there are fewer than `count` distinct words of the requested lengths.
pub fn generate_random_dataset(
    dfa: &Dfa,
    count: usize,
    min_len: usize,
    max_len: usize,
) -> Dataset {
    let symbols = dfa.alphabet_size();
    assert!(
        word_count(symbols, min_len, max_len) >= count,
        "not enough distinct words of length {min_len} to {max_len} over {symbols} symbols"
    );

    let mut seen = Set::default();
    let mut dataset = Dataset::new();
    while dataset.len() < count {
        let word = generate_random_word(symbols, min_len, max_len);
        if seen.insert(word.clone()) {
            let accepting = dfa.accepts(&word);
            dataset.push(StringInstance::new(word, accepting));
        }
    }
    dataset
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn random_dfa_is_complete_and_trimmed() {
        fastrand::seed(7);
        for _ in 0..20 {
            let dfa = generate_random_dfa(3, 10);
            assert!(dfa.size() <= 10);
            assert!(dfa.is_complete());
            assert_eq!(dfa.reachable_states().len(), dfa.size());
            assert_eq!(dfa.unlabelled_states_count(), 0);
        }
    }

    #[test]
    fn words_respect_bounds() {
        for _ in 0..50 {
            let word = generate_random_word(2, 1, 4);
            assert!((1..=4).contains(&word.len()));
            assert!(word.iter().all(|&symbol| symbol < 2));
        }
        assert_eq!(word_count(2, 0, 3), 15);
        assert_eq!(word_count(usize::MAX, 2, 3), usize::MAX);
    }

    #[test_log::test]
    fn datasets_are_labelled_by_the_automaton() {
        let dfa = generate_random_dfa(2, 8);
        let dataset = generate_random_dataset(&dfa, 14, 1, 3);
        assert_eq!(dataset.len(), 14);
        assert_eq!(dataset.accuracy(&dfa), 1.0);
        assert!(dataset.consistent_with_dfa(&dfa));
        assert!(dataset.prefix_tree(true).is_ok());
    }

    #[test]
    #[should_panic(expected = "not enough distinct words")]
    fn impossible_datasets_are_refused() {
        let dfa = generate_random_dfa(1, 2);
        generate_random_dataset(&dfa, 5, 0, 2);
    }
}
