/// Type alias for sets, we use this to hide which type of `HashSet` we are actually using.
/// Never iterate one of these where the order could influence a search outcome.
pub type Set<S> = fxhash::FxHashSet<S>;
/// Type alias for maps, we use this to hide which type of `HashMap` we are actually using.
pub type Map<K, V> = fxhash::FxHashMap<K, V>;

/// Represents a bijective mapping between `L` and `R`, that is a mapping which associates
/// each `L` with precisely one `R` and vice versa. Used to relate partition blocks to the
/// states of a quotient automaton.
pub type Bijection<L, R> = bimap::BiBTreeMap<L, R>;

/// A dense set of indices, used to mark visited blocks during breadth-first traversals.
pub type IndexSet = bit_set::BitSet;
