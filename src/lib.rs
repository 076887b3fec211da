//! Exact computation of the simulation preorder and simulation equivalence
//! on labelled transition systems.
//!
//! This crate implements the partition-refinement algorithm by
//! R. Gentilini, C. Piazza and A. Policriti
//! ("From Bisimulation to Simulation: Coarsest Partition Problems", 2003)
//! in the corrected form given by R. van Glabbeek and B. Ploeger
//! ("Correcting a Space-Efficient Simulation Algorithm", 2008).
//! It computes, for a labelled transition system with `n` states and `m` transitions,
//! the coarsest partition of the states into simulation equivalence classes together with
//! the simulation preorder between those classes in `O(m·n)` time.
//!
//! ### Equivalences
//!
//! * Simulation ([`SimPartitioner`])
//! * Ready Simulation ([`ReadySimPartitioner`]), where related states must additionally
//!   offer exactly the same set of actions.
//!
//! # Usage
//!
//! Most of this crate's functionality can be accessed through the
//! [`TransitionSystem`] struct and the functions in [`equivalence`].
//!
//! ### Querying the preorder on one system
//!
//! ```
//! use simequiv::{TransitionSystem, SimPartitioner};
//!
//! let (a, b, c) = (0, 1, 2);
//! let mut lts = TransitionSystem::from(vec![
//!     (0, 1, a), (1, 2, b), (1, 3, c),
//!     (4, 5, a), (5, 7, b), (4, 6, a), (6, 8, c),
//! ]);
//!
//! let mut partitioner = SimPartitioner::new(&mut lts);
//! partitioner.run();
//!
//! // 4 is simulated by 0, but not the other way around
//! assert!(partitioner.in_preorder(4, 0));
//! assert!(!partitioner.in_preorder(0, 4));
//! assert!(!partitioner.same_class(0, 4));
//! // Deadlocked states are all equivalent
//! assert!(partitioner.same_class(2, 8));
//! ```
//!
//! ### Comparing two systems
//!
//! Two systems are compared by merging them into one and relating their initial states.
//! See [`equivalence::compare()`] and [`equivalence::compare_preorder()`].
//!
//! ```
//! use simequiv::TransitionSystem;
//! use simequiv::equivalence::{compare, compare_preorder, Equivalence, Preorder};
//!
//! let (a, b) = (0, 1);
//! let left = TransitionSystem::from(vec![(0, 1, a), (1, 2, b), (0, 3, a)]);
//! let right = TransitionSystem::from(vec![(0, 1, a), (1, 2, b)]);
//!
//! assert!(compare(&left, &right, Equivalence::Simulation).unwrap());
//! assert!(!compare(&left, &right, Equivalence::ReadySimulation).unwrap());
//! assert!(compare_preorder(&right, &left, Preorder::ReadySimulation).unwrap());
//! ```
//!
//! ### Reducing a system
//!
//! [`equivalence::reduce()`] replaces a system by its quotient modulo simulation
//! equivalence.
//!
//! # Serde
//!
//! When compiled with the feature flag `serde` (disabled by default),
//! [`TransitionSystem`] and [`Transition`] implement serde's `Serialize` and
//! `Deserialize` traits.

pub mod equivalence;
pub mod ready_simulation;
pub mod simulation;
pub mod triple_set;
mod error;

// Re-exports
pub use error::*;
pub use ready_simulation::ReadySimPartitioner;
pub use simulation::{SeedPartition, SimPartitioner};

use std::borrow::Cow;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead};
use std::iter;
use std::path::Path;
use std::result;

use rustc_hash::FxHashMap;

/// A labelled transition `from -label-> to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transition {
    /// Source state
    pub from: u32,
    /// Transition label, an index into the label names of the system
    pub label: u32,
    /// Target state
    pub to: u32,
}

impl Transition {
    pub fn new(from: u32, label: u32, to: u32) -> Self {
        Transition { from, label, to }
    }
}

/// Orders in which the transitions of a [`TransitionSystem`] can be sorted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOrder {
    /// By source state, then label, then target state.
    SourceLabelTarget,
    /// By label, then target state, then source state.
    /// This is the order required by [`TransitionSystem::predecessor_index()`].
    LabelTargetSource,
}

impl TransitionOrder {
    fn key(self, t: &Transition) -> (u32, u32, u32) {
        match self {
            TransitionOrder::SourceLabelTarget => (t.from, t.label, t.to),
            TransitionOrder::LabelTargetSource => (t.label, t.to, t.from),
        }
    }
}

/// Labelled Transition System (LTS)
///
/// States are numbered `0 .. n_states()`, labels `0 .. n_labels()`.
/// A system always has at least one state, its initial state.
///
/// # Creation
///
/// A transition system can be constructed by listing all edges as 3-tuples `(u32, u32, u32)`,
/// which include start and end state as well as the edge label.
/// The list does not need to be sorted. The initial state is `0`.
/// For example:
///
/// ```
/// use simequiv::TransitionSystem;
///
/// // Define label names
/// let (a, b, c) = (0, 1, 2);
/// let lts = TransitionSystem::from(vec![
///     (0, 1, a),
///     (1, 2, b),
///     (1, 3, c),
/// ]);
/// assert_eq!(lts.n_states(), 4);
/// assert_eq!(lts.n_labels(), 3);
/// ```
///
/// An LTS can also be read from a CSV file.
/// See [`from_csv_file()`](TransitionSystem::from_csv_file) for details.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransitionSystem {
    n_states: u32,
    n_labels: u32,
    initial_state: u32,
    transitions: Vec<Transition>,
    label_names: Vec<String>,
}

/// `(from, to, label)`
type Edge = (u32, u32, u32);

impl TransitionSystem {
    /// Create a transition system from its parts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransitionSystem`] if `n_states` is zero,
    /// if the initial state is out of range,
    /// or if any transition refers to a state or label out of range.
    pub fn new(
        n_states: u32,
        n_labels: u32,
        initial_state: u32,
        transitions: Vec<Transition>,
    ) -> Result<Self> {
        if n_states == 0 {
            return Err(Error::InvalidTransitionSystem("a system needs at least one state".into()));
        }
        if initial_state >= n_states {
            return Err(Error::InvalidTransitionSystem(
                format!("initial state {initial_state} is out of range")));
        }
        if let Some(t) = transitions.iter()
            .find(|t| t.from >= n_states || t.to >= n_states || t.label >= n_labels)
        {
            return Err(Error::InvalidTransitionSystem(
                format!("transition {} -{}-> {} is out of range", t.from, t.label, t.to)));
        }
        Ok(TransitionSystem {
            n_states,
            n_labels,
            initial_state,
            transitions,
            label_names: Vec::new(),
        })
    }

    /// Attach names to labels. `names[l]` is the name of label `l`.
    /// Labels without a name are displayed by their number.
    pub fn with_label_names(mut self, names: Vec<String>) -> Self {
        self.label_names = names;
        self
    }

    /// The number of states in this transition system.
    #[inline]
    pub fn n_states(&self) -> u32 {
        self.n_states
    }

    /// The number of distinct labels.
    #[inline]
    pub fn n_labels(&self) -> u32 {
        self.n_labels
    }

    #[inline]
    pub fn n_transitions(&self) -> usize {
        self.transitions.len()
    }

    #[inline]
    pub fn initial_state(&self) -> u32 {
        self.initial_state
    }

    /// # Panics
    ///
    /// Panics if `state` is outside the range of states of this LTS.
    pub fn set_initial_state(&mut self, state: u32) {
        assert!(state < self.n_states, "Initial state {state} out of range");
        self.initial_state = state;
    }

    #[inline]
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Human readable name of a label, used for logging.
    pub fn label_name(&self, label: u32) -> Cow<'_, str> {
        match self.label_names.get(label as usize) {
            Some(name) => Cow::Borrowed(name),
            None => Cow::Owned(label.to_string()),
        }
    }

    #[inline]
    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    /// Sort the transition list.
    pub fn sort_transitions(&mut self, order: TransitionOrder) {
        self.transitions.sort_unstable_by_key(|t| order.key(t));
    }

    /// Returns `true` if the transition list is sorted according to `order`.
    pub fn is_sorted_by(&self, order: TransitionOrder) -> bool {
        self.transitions.windows(2)
            .all(|w| order.key(&w[0]) <= order.key(&w[1]))
    }

    /// Build a table that lists, for every label `l` and target state `t`,
    /// all states `s` with a transition `s -l-> t`.
    ///
    /// # Panics
    ///
    /// Panics if the transitions are not sorted by
    /// [`TransitionOrder::LabelTargetSource`].
    pub fn predecessor_index(&self) -> PredecessorIndex {
        assert!(self.is_sorted_by(TransitionOrder::LabelTargetSource),
            "Transitions must be sorted by label and target first");
        let n_states = self.n_states as usize;
        let n_rows = self.n_labels as usize * n_states;
        let mut counts = vec![0u32; n_rows];
        for t in &self.transitions {
            counts[t.label as usize * n_states + t.to as usize] += 1;
        }
        let offsets = iter::once(0).chain(
            counts.iter()
            .scan(0, |state, count| {
                *state += count;
                Some(*state)
            }))
            .collect();
        let sources = self.transitions.iter()
            .map(|t| t.from)
            .collect();
        PredecessorIndex {
            n_states,
            offsets,
            sources,
        }
    }

    /// For every state, the sorted list of labels it has an outgoing transition for.
    pub fn ready_sets(&self) -> Vec<Vec<u32>> {
        let mut ready = vec![Vec::new(); self.n_states as usize];
        for t in &self.transitions {
            ready[t.from as usize].push(t.label);
        }
        for labels in &mut ready {
            labels.sort_unstable();
            labels.dedup();
        }
        ready
    }

    /// Append all states and transitions of `other` to this system.
    ///
    /// States of `other` are renumbered by adding the number of states of `self`,
    /// which is returned. The initial state of `self` is kept.
    ///
    /// If both systems carry label names, labels of `other` are matched to those of `self`
    /// by name, and names unknown to `self` are added as new labels.
    /// Otherwise labels are identified by their index in both systems.
    pub fn merge(&mut self, other: &TransitionSystem) -> u32 {
        let offset = self.n_states;
        let label_map: Vec<u32> = if self.label_names.is_empty() || other.label_names.is_empty() {
            self.n_labels = self.n_labels.max(other.n_labels);
            if other.label_names.len() > self.label_names.len() {
                let missing = other.label_names[self.label_names.len()..].to_vec();
                self.label_names.extend(missing);
            }
            (0..other.n_labels).collect()
        } else {
            self.merge_label_names(other)
        };
        self.transitions.reserve(other.transitions.len());
        self.transitions.extend(other.transitions.iter()
            .map(|t| Transition::new(t.from + offset, label_map[t.label as usize], t.to + offset)));
        self.n_states += other.n_states;
        offset
    }

    // Returns the label of `self` for every label of `other`
    fn merge_label_names(&mut self, other: &TransitionSystem) -> Vec<u32> {
        // Name every label of self, so that new labels can be appended behind them
        for l in self.label_names.len() as u32 .. self.n_labels {
            self.label_names.push(l.to_string());
        }
        let mut labels: FxHashMap<String, u32> = FxHashMap::default();
        for (l, name) in self.label_names.iter().enumerate() {
            labels.entry(name.clone()).or_insert(l as u32);
        }
        let label_map = (0..other.n_labels)
            .map(|l| {
                let name = other.label_name(l);
                match labels.get(name.as_ref()) {
                    Some(&n) => n,
                    None => {
                        let n = self.label_names.len() as u32;
                        labels.insert(name.to_string(), n);
                        self.label_names.push(name.into_owned());
                        n
                    }
                }
            })
            .collect();
        self.n_labels = self.n_labels.max(self.label_names.len() as u32);
        label_map
    }

    /// Remove all states that are not reachable from the initial state.
    ///
    /// The remaining states are renumbered in breadth-first order, so the initial state
    /// becomes state `0`. Returns the mapping from old to new state numbers.
    pub fn prune_unreachable(&mut self) -> Vec<Option<u32>> {
        self.sort_transitions(TransitionOrder::SourceLabelTarget);
        let n_states = self.n_states as usize;
        let mut row_offsets = vec![0usize; n_states + 1];
        for t in &self.transitions {
            row_offsets[t.from as usize + 1] += 1;
        }
        for i in 0..n_states {
            row_offsets[i + 1] += row_offsets[i];
        }

        let mut mapping = vec![None; n_states];
        let mut count = 0;
        let mut queue = VecDeque::from([self.initial_state]);
        mapping[self.initial_state as usize] = Some(0);
        count += 1;
        while let Some(s) = queue.pop_front() {
            let s = s as usize;
            for t in &self.transitions[row_offsets[s]..row_offsets[s + 1]] {
                if mapping[t.to as usize].is_none() {
                    mapping[t.to as usize] = Some(count);
                    count += 1;
                    queue.push_back(t.to);
                }
            }
        }

        self.transitions.retain(|t| mapping[t.from as usize].is_some());
        for t in &mut self.transitions {
            // Targets of reachable sources are reachable
            t.from = mapping[t.from as usize].unwrap_or_default();
            t.to = mapping[t.to as usize].unwrap_or_default();
        }
        self.n_states = count;
        self.initial_state = 0;
        mapping
    }

    /// Build a labelled transition system from a CSV file.
    ///
    /// Each line should represent an edge of the graph,
    /// containing the three elements start state, end state and label.
    /// For example the line
    ///
    /// ```text
    /// 4,10,"enter"
    /// ````
    ///
    /// encodes a transition from state `4` to state `10` using the action `enter`.
    /// Quotes around the label name are optional.
    /// Label names are replaced by unique integers and kept for display.
    /// The label `i` always receives number `0` and is conventionally the silent action.
    /// The initial state is `0`.
    ///
    /// # Errors
    ///
    /// A [`CSVError`] is returned if a line does not contain 3 fields,
    /// if any of the first two fields can not be parsed as an unsigned integer,
    /// or if there were problems reading the file.
    pub fn from_csv_file<P: AsRef<Path>>(path: P) -> result::Result<Self, CSVError> {
        let file = File::open(path)?;
        let lines = io::BufReader::new(file).lines();
        Self::from_csv_lines(lines)
    }

    /// Build a transition system from an iterator of CSV lines.
    /// The format is described at [`from_csv_file()`](TransitionSystem::from_csv_file).
    pub fn from_csv_lines(lines: impl Iterator<Item=io::Result<String>>
    ) -> result::Result<Self, CSVError> {
        let mut transitions = vec![];
        let mut n_states = 1;
        let mut labels: FxHashMap<String, u32> = FxHashMap::default();
        let mut label_names = vec!["i".to_string()];
        labels.insert("i".to_string(), 0);
        for l in lines {
            let l = l?;
            if l.trim().is_empty() {
                continue;
            }
            // Disassemble line
            let mut parts = l.splitn(3, ',');
            let from: u32 = parts.next().ok_or(CSVError::MissingField)?.trim().parse()?;
            let to: u32 = parts.next().ok_or(CSVError::MissingField)?.trim().parse()?;
            let mut label = parts.next().ok_or(CSVError::MissingField)?.trim();

            // Strip quotation marks
            if label.starts_with('"') && label.ends_with('"') && label.len() >= 2 {
                label = &label[1 .. label.len() - 1];
            }

            // Find the integer for the label
            let label_n = match labels.get(label) {
                Some(&n) => n,
                None => {
                    let n = label_names.len() as u32;
                    labels.insert(label.to_string(), n);
                    label_names.push(label.to_string());
                    n
                }
            };

            // Grow the state space to accommodate all mentioned states
            n_states = n_states.max(from.max(to) + 1);
            transitions.push(Transition::new(from, label_n, to));
        }
        Ok(TransitionSystem {
            n_states,
            n_labels: label_names.len() as u32,
            initial_state: 0,
            transitions,
            label_names,
        })
    }
}

impl Default for TransitionSystem {
    /// A single state without transitions.
    fn default() -> Self {
        TransitionSystem {
            n_states: 1,
            n_labels: 0,
            initial_state: 0,
            transitions: Vec::new(),
            label_names: Vec::new(),
        }
    }
}

impl From<Vec<Edge>> for TransitionSystem {
    fn from(edges: Vec<Edge>) -> Self {
        edges.into_iter().collect()
    }
}

impl FromIterator<Edge> for TransitionSystem {
    fn from_iter<I: IntoIterator<Item=Edge>>(iter: I) -> Self {
        let mut lts = TransitionSystem::default();
        for (from, to, label) in iter {
            lts.n_states = lts.n_states.max(from.max(to) + 1);
            lts.n_labels = lts.n_labels.max(label + 1);
            lts.transitions.push(Transition::new(from, label, to));
        }
        lts
    }
}


/// Compressed table of incoming transitions, grouped by label and target state.
///
/// Created by [`TransitionSystem::predecessor_index()`].
#[derive(Debug, Clone)]
pub struct PredecessorIndex {
    n_states: usize,
    // offsets[label * n_states + target] is where the sources of that row start
    offsets: Vec<u32>,
    sources: Vec<u32>,
}

impl PredecessorIndex {
    /// All states `s` with `s -label-> target`, in ascending order.
    #[inline]
    pub fn predecessors(&self, label: usize, target: usize) -> &[u32] {
        let row = label * self.n_states + target;
        &self.sources[self.offsets[row] as usize .. self.offsets[row + 1] as usize]
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn example() -> TransitionSystem {
        TransitionSystem::from(vec![
            (0, 1, 0),
            (0, 2, 1),
            (2, 1, 1),
            (1, 1, 0),
            (3, 1, 0),
            (2, 0, 0),
        ])
    }

    #[test]
    fn test_from_edges() {
        let lts = example();
        assert_eq!(lts.n_states(), 4);
        assert_eq!(lts.n_labels(), 2);
        assert_eq!(lts.n_transitions(), 6);
        assert_eq!(lts.initial_state(), 0);
        assert_eq!(lts.label_name(1), "1");

        let empty = TransitionSystem::from(vec![]);
        assert_eq!(empty.n_states(), 1);
        assert_eq!(empty.n_labels(), 0);
    }

    #[test]
    fn test_new_validates() {
        assert!(TransitionSystem::new(2, 1, 0, vec![Transition::new(0, 0, 1)]).is_ok());
        assert!(matches!(TransitionSystem::new(0, 1, 0, vec![]),
            Err(Error::InvalidTransitionSystem(_))));
        assert!(matches!(TransitionSystem::new(2, 1, 2, vec![]),
            Err(Error::InvalidTransitionSystem(_))));
        assert!(matches!(TransitionSystem::new(2, 1, 0, vec![Transition::new(0, 1, 1)]),
            Err(Error::InvalidTransitionSystem(_))));
        assert!(matches!(TransitionSystem::new(2, 1, 0, vec![Transition::new(0, 0, 2)]),
            Err(Error::InvalidTransitionSystem(_))));
    }

    #[test]
    fn test_predecessor_index() {
        let mut lts = example();
        lts.sort_transitions(TransitionOrder::LabelTargetSource);
        let index = lts.predecessor_index();
        for label in 0..lts.n_labels() {
            for target in 0..lts.n_states() {
                let mut naive: Vec<u32> = lts.transitions().iter()
                    .filter(|t| t.label == label && t.to == target)
                    .map(|t| t.from)
                    .collect();
                naive.sort();
                assert_eq!(index.predecessors(label as usize, target as usize), naive.as_slice(),
                    "Predecessors for label {label}, target {target}");
            }
        }
        assert_eq!(index.predecessors(0, 1), &[0, 1, 3]);
    }

    #[test]
    #[should_panic]
    fn test_predecessor_index_unsorted() {
        let mut lts = example();
        lts.sort_transitions(TransitionOrder::SourceLabelTarget);
        lts.predecessor_index();
    }

    #[test]
    fn test_ready_sets() {
        let lts = example();
        assert_eq!(lts.ready_sets(), vec![vec![0, 1], vec![0], vec![0, 1], vec![0]]);
    }

    #[test]
    fn test_merge() {
        let mut lts = example();
        let other = TransitionSystem::from(vec![(0, 1, 2), (1, 0, 0)]);
        let offset = lts.merge(&other);
        assert_eq!(offset, 4);
        assert_eq!(lts.n_states(), 6);
        assert_eq!(lts.n_labels(), 3);
        assert_eq!(lts.n_transitions(), 8);
        assert!(lts.transitions().contains(&Transition::new(4, 2, 5)));
        assert!(lts.transitions().contains(&Transition::new(5, 0, 4)));
        assert_eq!(lts.initial_state(), 0);
    }

    #[test]
    fn test_merge_by_label_name() {
        let csv = |input: &str| TransitionSystem::from_csv_lines(
            input.lines().map(|l| Ok(l.to_string()))).unwrap();
        let mut lts = csv("0,1,a\n1,2,b");
        let other = csv("0,1,c\n1,0,a\n1,1,i");
        assert_eq!(other.label_names(), &["i", "c", "a"]);
        let offset = lts.merge(&other);
        assert_eq!(offset, 3);
        assert_eq!(lts.label_names(), &["i", "a", "b", "c"]);
        assert_eq!(lts.n_labels(), 4);
        assert!(lts.transitions().contains(&Transition::new(3, 3, 4)));
        assert!(lts.transitions().contains(&Transition::new(4, 1, 3)));
        assert!(lts.transitions().contains(&Transition::new(4, 0, 4)));

        // Unnamed labels of the first system keep their number as name
        let mut lts = TransitionSystem::from(vec![(0, 1, 0), (1, 0, 1)])
            .with_label_names(vec!["a".into()]);
        lts.merge(&csv("0,1,1\n0,1,a"));
        assert_eq!(lts.label_names(), &["a", "1", "i"]);
        assert!(lts.transitions().contains(&Transition::new(2, 1, 3)));
        assert!(lts.transitions().contains(&Transition::new(2, 0, 3)));
    }

    #[test]
    fn test_prune_unreachable() {
        let mut lts = TransitionSystem::from(vec![
            (0, 2, 0),
            (1, 0, 0),
            (2, 4, 1),
            (3, 3, 0),
        ]);
        lts.set_initial_state(2);
        let mapping = lts.prune_unreachable();
        assert_eq!(mapping, vec![None, None, Some(0), None, Some(1)]);
        assert_eq!(lts.n_states(), 2);
        assert_eq!(lts.initial_state(), 0);
        assert_eq!(lts.transitions(), &[Transition::new(0, 1, 1)]);
    }

    #[test]
    fn test_csv() {
        let input = "0,1,\"a\"\n1,2,i\n\n2,0,a\n0,3,b";
        let lts = TransitionSystem::from_csv_lines(
            input.lines().map(|l| Ok(l.to_string()))).unwrap();
        assert_eq!(lts.n_states(), 4);
        assert_eq!(lts.n_labels(), 3);
        assert_eq!(lts.label_name(0), "i");
        assert_eq!(lts.label_name(1), "a");
        assert_eq!(lts.label_name(2), "b");
        assert_eq!(lts.transitions()[0], Transition::new(0, 1, 1));
        assert_eq!(lts.transitions()[1], Transition::new(1, 0, 2));

        let broken = TransitionSystem::from_csv_lines(iter::once(Ok("0,1".to_string())));
        assert!(matches!(broken, Err(CSVError::MissingField)));
        let broken = TransitionSystem::from_csv_lines(iter::once(Ok("x,1,a".to_string())));
        assert!(matches!(broken, Err(CSVError::ParseError(_))));
    }
}
