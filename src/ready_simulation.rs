//! Ready simulation: simulation restricted to states with identical sets of enabled actions.
//!
//! A state `s` is ready simulated by `t` if `t` simulates `s`,
//! both offer exactly the same labels,
//! and this holds again for all pairs of successors related on the way.
//! This is computed by the ordinary partition refinement,
//! started from states grouped by their ready sets instead of a single block.

use std::ops::{Deref, DerefMut};

use log::debug;
use ndarray::Array2;
use rustc_hash::FxHashMap;

use crate::TransitionSystem;
use crate::simulation::{SeedPartition, SimPartitioner};


/// Partition the states of `lts` by their ready sets.
///
/// Blocks are numbered in the order in which their first state appears.
/// Only identical blocks are related, so states with different ready sets
/// never end up in the preorder.
pub fn ready_set_seed(lts: &TransitionSystem) -> SeedPartition {
    let ready = lts.ready_sets();
    let mut block_ids: FxHashMap<Box<[u32]>, usize> = FxHashMap::default();
    let mut block_of = Vec::with_capacity(ready.len());
    for labels in ready {
        let next = block_ids.len();
        let block = *block_ids.entry(labels.into_boxed_slice()).or_insert(next);
        block_of.push(block);
    }
    let n_blocks = block_ids.len();
    debug!("{n_blocks} distinct ready sets");
    SeedPartition::new(block_of, Array2::from_shape_fn((n_blocks, n_blocks), |(a, b)| a == b))
}

/// Computes ready simulation equivalence classes and the ready simulation preorder.
///
/// All queries of [`SimPartitioner`] are available through `Deref`,
/// they then refer to ready simulation.
///
/// # Example
///
/// ```
/// use simequiv::{TransitionSystem, ReadySimPartitioner};
///
/// let (a, b) = (0, 1);
/// let mut lts = TransitionSystem::from(vec![
///     (0, 1, a), (1, 2, b), (0, 3, a),
///     (4, 5, a), (5, 6, b),
/// ]);
/// let mut partitioner = ReadySimPartitioner::new(&mut lts);
/// partitioner.run();
///
/// // 0 can move to the deadlock 3, which 4 cannot match
/// assert!(!partitioner.in_preorder(0, 4));
/// assert!(partitioner.in_preorder(4, 0));
/// ```
pub struct ReadySimPartitioner<'a> {
    inner: SimPartitioner<'a>,
}

impl<'a> ReadySimPartitioner<'a> {
    /// Create a partitioner for `lts`.
    ///
    /// The transitions of `lts` are sorted by label and target state.
    pub fn new(lts: &'a mut TransitionSystem) -> Self {
        let seed = ready_set_seed(lts);
        ReadySimPartitioner {
            inner: SimPartitioner::with_seed(lts, seed),
        }
    }

    /// Compute the ready simulation equivalence classes and the ready simulation preorder.
    pub fn run(&mut self) {
        self.inner.run();
    }

    /// Unwrap the underlying partitioner.
    pub fn into_inner(self) -> SimPartitioner<'a> {
        self.inner
    }
}

impl<'a> Deref for ReadySimPartitioner<'a> {
    type Target = SimPartitioner<'a>;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<'a> DerefMut for ReadySimPartitioner<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}
