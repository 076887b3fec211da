//! The partition-refinement algorithm for the simulation preorder.
//!
//! The algorithm maintains a *partition-relation pair*: a partition of the states into
//! blocks (Pi) and a preorder on these blocks (Q).
//! Each round first refines the previous partition (Sigma, with relation P) until every
//! block is stable, then restricts the induced relation Q on the new blocks to pairs
//! that can still simulate each other.
//! Blocks only ever get split and Q only ever loses pairs,
//! so the algorithm terminates with the coarsest stable pair,
//! which is the simulation equivalence together with the simulation preorder.

mod blocks;
mod incidence;
mod relation;

#[cfg(test)]
mod tests;

use std::fmt::Write;
use std::mem;

use disjoint_sets::UnionFind;
use log::Level::Trace;
use log::{debug, trace, log_enabled};
use ndarray::Array2;

use crate::equivalence::EquivalenceRelation;
use crate::triple_set::TripleSet;
use crate::{PredecessorIndex, Result, Transition, TransitionOrder, TransitionSystem};
use blocks::Blocks;
use incidence::Incidence;
use relation::BlockRelation;


/// Initial partition and relation that the refinement starts from.
///
/// The computed preorder is the largest simulation contained in the relation
/// induced on states by the seed.
#[derive(Debug, Clone)]
pub struct SeedPartition {
    block_of: Vec<usize>,
    relation: Array2<bool>,
}

impl SeedPartition {
    /// All `n_states` states in one block, related to itself.
    pub fn universal(n_states: usize) -> Self {
        SeedPartition {
            block_of: vec![0; n_states],
            relation: Array2::from_elem((1, 1), true),
        }
    }

    /// Create a seed from a block assignment and a relation on blocks.
    ///
    /// # Panics
    ///
    /// Panics if `relation` is not square, if any block is empty or out of range,
    /// or if `relation` is not reflexive.
    pub fn new(block_of: Vec<usize>, relation: Array2<bool>) -> Self {
        assert!(relation.is_square(), "Seed relation must be square");
        let n_blocks = relation.nrows();
        let mut used = vec![false; n_blocks];
        for &b in &block_of {
            assert!(b < n_blocks, "Block {b} out of range of the seed relation");
            used[b] = true;
        }
        assert!(used.iter().all(|&u| u), "Every seed block must contain a state");
        assert!(relation.diag().iter().all(|&r| r), "Seed relation must be reflexive");
        SeedPartition { block_of, relation }
    }

    #[inline]
    pub fn n_blocks(&self) -> usize {
        self.relation.nrows()
    }

    #[inline]
    pub fn block_of(&self, state: usize) -> usize {
        self.block_of[state]
    }
}

/// Size of the partition and relation after one round of the algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundStats {
    /// Number of blocks.
    pub blocks: usize,
    /// Number of state pairs `(s, t)` such that `s` is still assumed to be simulated by `t`.
    pub related_states: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    // The partition of the previous round, relation P
    Sigma,
    // The current partition, relation Q
    Pi,
}

/// Computes simulation equivalence classes and the simulation preorder of an LTS.
///
/// # Example
///
/// ```
/// use simequiv::{TransitionSystem, SimPartitioner};
///
/// let (a, b, c) = (0, 1, 2);
/// let mut lts = TransitionSystem::from(vec![
///     (0, 1, a), (0, 2, a), (1, 3, b), (2, 3, c),
///     (4, 5, a), (5, 6, b), (5, 6, c),
/// ]);
/// let mut partitioner = SimPartitioner::new(&mut lts);
/// partitioner.run();
///
/// assert!(partitioner.in_preorder(0, 4));
/// assert!(!partitioner.in_preorder(4, 0));
/// assert_eq!(partitioner.class_of(3), partitioner.class_of(6));
/// ```
pub struct SimPartitioner<'a> {
    lts: &'a TransitionSystem,
    index: PredecessorIndex,
    n_labels: usize,
    // Number of blocks of the previous partition
    n_sigma: usize,
    blocks: Blocks,
    parent: Vec<usize>,
    children: Vec<Vec<usize>>,
    // stable[α][γ] for Pi block α and Sigma block γ, for the current label in refine()
    stable: Vec<Vec<bool>>,
    incidence: Incidence,
    matches: TripleSet,
    p: BlockRelation,
    q: BlockRelation,

    // Scratch space
    touched_blocks: Vec<usize>,
    contents: Vec<usize>,
    worklist: Vec<(usize, usize)>,

    rounds: Vec<RoundStats>,
    converged: bool,
}

impl<'a> SimPartitioner<'a> {
    /// Create a partitioner for `lts`, starting from a single block.
    ///
    /// The transitions of `lts` are sorted by label and target state.
    pub fn new(lts: &'a mut TransitionSystem) -> Self {
        let seed = SeedPartition::universal(lts.n_states() as usize);
        Self::with_seed(lts, seed)
    }

    /// Create a partitioner for `lts` that starts refining from `seed`.
    ///
    /// The transitions of `lts` are sorted by label and target state.
    ///
    /// # Panics
    ///
    /// Panics if `seed` does not assign a block to exactly every state of `lts`.
    pub fn with_seed(lts: &'a mut TransitionSystem, seed: SeedPartition) -> Self {
        assert_eq!(seed.block_of.len(), lts.n_states() as usize,
            "Seed partition does not match the number of states");
        lts.sort_transitions(TransitionOrder::LabelTargetSource);
        let lts: &'a TransitionSystem = lts;
        let n_sigma = seed.n_blocks();
        SimPartitioner {
            lts,
            index: lts.predecessor_index(),
            n_labels: lts.n_labels() as usize,
            n_sigma,
            blocks: Blocks::new(seed.block_of, n_sigma),
            parent: (0..n_sigma).collect(),
            children: (0..n_sigma).map(|b| vec![b]).collect(),
            stable: Vec::new(),
            incidence: Incidence::default(),
            matches: TripleSet::new(),
            p: BlockRelation::from_matrix(seed.relation),
            q: BlockRelation::default(),
            touched_blocks: Vec::new(),
            contents: Vec::new(),
            worklist: Vec::new(),
            rounds: Vec::new(),
            converged: false,
        }
    }

    /// Compute the simulation equivalence classes and the simulation preorder.
    ///
    /// Calling this again after it has finished does nothing.
    pub fn run(&mut self) {
        if self.converged {
            return;
        }
        debug!("Initialisation; number of blocks: {}", self.n_sigma);
        self.refine();
        self.update();
        self.record_round();

        let mut iteration = 0;
        loop {
            self.n_sigma = self.blocks.len();
            // P receives the relation computed by the last update().
            // Q is recomputed by update() before it is read again.
            mem::swap(&mut self.p, &mut self.q);
            debug!("Iteration {iteration}; number of blocks: {}", self.n_sigma);

            let change = self.refine();
            if change {
                self.update();
            } else {
                // Q must hold the relation of this round, which is still in P
                mem::swap(&mut self.p, &mut self.q);
            }
            self.record_round();
            iteration += 1;
            if !change {
                break;
            }
        }

        debug_assert!(self.q.is_reflexive());
        if log_enabled!(Trace) {
            trace!("Final partition:\n{}", self.fmt_pi_q());
        }
        debug!("Finished after {} rounds; number of classes: {}", self.rounds.len(), self.blocks.len());
        self.converged = true;
    }

    // Refine Pi until it is stable with respect to Sigma and P.
    // Returns true if any block was split.
    fn refine(&mut self) -> bool {
        debug_assert_eq!(self.n_sigma, self.blocks.len());
        let n_pi = self.blocks.len();
        self.children = (0..n_pi).map(|b| vec![b]).collect();
        self.parent = (0..n_pi).collect();

        if log_enabled!(Trace) {
            trace!("Refine\n{}", self.fmt_sigma_p());
        }

        let order = self.reverse_topological_sort();
        trace!("Reverse topological sort is: {order:?}");

        let mut change = false;
        for l in 0..self.n_labels {
            trace!("Label = \"{}\"", self.lts.label_name(l as u32));
            self.stable = vec![vec![false; self.n_sigma]; self.blocks.len()];

            for &gamma in &order {
                self.touched_blocks.clear();
                self.touch_predecessors_of_children(gamma, l);

                // Every α with α -l->∃ γ
                let touched = mem::take(&mut self.touched_blocks);
                for &alpha in &touched {
                    let stable = (0..self.n_sigma)
                        .any(|delta| self.stable[alpha][delta] && self.p.contains(gamma, delta));
                    self.stable[alpha][gamma] = stable;
                    if !stable {
                        // If α -l->∀ γ, then α cannot be split
                        if self.blocks.has_untouched(alpha) {
                            change = true;
                            let new = self.blocks.split_off_untouched(alpha);
                            let parent = self.parent[alpha];
                            self.children[parent].push(new);
                            self.parent.push(parent);
                            let row = self.stable[alpha].clone();
                            self.stable.push(row);
                            trace!("Split block {alpha}, new block {new}");
                        }
                        self.stable[alpha][gamma] = true;
                    }
                    self.blocks.untouch(alpha);
                }
                self.touched_blocks = touched;
            }
        }
        change
    }

    // Depth-first post-order of the Sigma blocks along P,
    // so every block comes after all blocks it is related to.
    fn reverse_topological_sort(&self) -> Vec<usize> {
        let n = self.n_sigma;
        let mut visited = vec![false; n];
        let mut order = Vec::with_capacity(n);
        // (block, next candidate successor)
        let mut stack: Vec<(usize, usize)> = Vec::new();
        for root in 0..n {
            if visited[root] {
                continue;
            }
            visited[root] = true;
            stack.push((root, 0));
            while let Some(top) = stack.last_mut() {
                let u = top.0;
                let succ = (top.1..n).find(|&v| !visited[v] && self.p.contains(u, v));
                match succ {
                    Some(v) => {
                        top.1 = v + 1;
                        visited[v] = true;
                        stack.push((v, 0));
                    },
                    None => {
                        order.push(u);
                        stack.pop();
                    },
                }
            }
        }
        order
    }

    // Touch all states with an l-transition into Pi block γ.
    // Blocks touched for the first time are appended to touched_blocks.
    fn touch_predecessors(&mut self, gamma: usize, l: usize) {
        self.blocks.collect_members(gamma, &mut self.contents);
        for &c in &self.contents {
            for &a in self.index.predecessors(l, c) {
                if let Some(alpha) = self.blocks.touch(a as usize) {
                    self.touched_blocks.push(alpha);
                }
            }
        }
    }

    // Touch all states with an l-transition into Sigma block γ.
    fn touch_predecessors_of_children(&mut self, gamma: usize, l: usize) {
        for i in 0..self.children[gamma].len() {
            let delta = self.children[gamma][i];
            self.touch_predecessors(delta, l);
        }
    }

    // Derive Q from P and remove all pairs that are not compatible with the transitions.
    fn update(&mut self) {
        trace!("Update");
        self.q = self.p.induced(&self.parent);

        self.compute_incidence(Level::Sigma);
        if log_enabled!(Trace) {
            trace!("Filter(false)\n{}\nSimulation relation: {}", self.fmt_incidence(), self.q);
        }
        self.filter(Level::Sigma, false);

        self.compute_incidence(Level::Pi);
        if log_enabled!(Trace) {
            trace!("Filter(true)\n{}\nSimulation relation: {}", self.fmt_incidence(), self.q);
        }
        self.filter(Level::Pi, true);
    }

    // Compute the ∃ and ∀ relations from Pi blocks to the blocks of `level`.
    fn compute_incidence(&mut self, level: Level) {
        let n_targets = match level {
            Level::Sigma => self.n_sigma,
            Level::Pi => self.blocks.len(),
        };
        self.incidence.reset(self.n_labels);
        for l in 0..self.n_labels {
            self.incidence.start_label(l, n_targets);
            for gamma in 0..n_targets {
                self.touched_blocks.clear();
                match level {
                    Level::Sigma => self.touch_predecessors_of_children(gamma, l),
                    Level::Pi => self.touch_predecessors(gamma, l),
                }
                for &alpha in &self.touched_blocks {
                    let all = !self.blocks.has_untouched(alpha);
                    self.incidence.record(alpha, l, gamma, all);
                    self.blocks.untouch(alpha);
                }
                self.incidence.finish_target(l);
            }
        }
    }

    // Remove every (α, β) from Q where α -l->∀ γ, but β cannot match this with an
    // l-transition into a block related to γ.
    // The blocks γ, δ belong to `level` and are related by P (Sigma) or Q (Pi).
    fn filter(&mut self, level: Level, commit: bool) {
        let (size, relation) = match level {
            Level::Sigma => (self.n_sigma, &self.p),
            Level::Pi => (self.blocks.len(), &self.q),
        };

        // match(l, β, γ) iff there is a δ with β -l->∃ δ and γ R δ
        self.matches.clear();
        for l in 0..self.n_labels {
            for delta in 0..size {
                for beta in self.incidence.exists_into(l, delta) {
                    for gamma in 0..size {
                        if relation.contains(gamma, delta) {
                            self.matches.insert([l, beta, gamma]);
                        }
                    }
                }
            }
        }

        let n_pi = self.blocks.len();
        for l in 0..self.n_labels {
            for gamma in 0..size {
                for alpha in self.incidence.forall_into(l, gamma) {
                    for beta in 0..n_pi {
                        if self.q.contains(alpha, beta) && !self.matches.contains([l, beta, gamma]) {
                            self.q.remove(alpha, beta);
                            if commit {
                                cleanup(&self.incidence, &mut self.q, &mut self.matches,
                                    &mut self.worklist, alpha, beta);
                            }
                        }
                    }
                }
            }
        }
        trace!("Match: {:?}", self.matches);
    }

    fn record_round(&mut self) {
        let related_states = self.q.pairs()
            .map(|(a, b)| self.blocks.size(a) * self.blocks.size(b))
            .sum::<usize>();
        self.rounds.push(RoundStats {
            blocks: self.blocks.len(),
            related_states,
        });
    }

    fn assert_converged(&self) {
        assert!(self.converged, "Simulation preorder has not been computed, call run() first");
    }

    /// Gives the number of simulation equivalence classes of the LTS.
    ///
    /// # Panics
    ///
    /// Panics if [`run()`](SimPartitioner::run) has not been called.
    pub fn num_classes(&self) -> usize {
        self.assert_converged();
        self.blocks.len()
    }

    /// The number of the equivalence class of `state`, in `0 .. num_classes()`.
    ///
    /// # Panics
    ///
    /// Panics if [`run()`](SimPartitioner::run) has not been called,
    /// or if `state` is outside the range of states of the LTS.
    pub fn class_of(&self, state: u32) -> usize {
        self.assert_converged();
        self.blocks.block_of(state as usize)
    }

    /// Returns `true` if state `s` is simulated by state `t`.
    ///
    /// # Panics
    ///
    /// Panics if [`run()`](SimPartitioner::run) has not been called,
    /// or if `s` or `t` are outside the range of states of the LTS.
    pub fn in_preorder(&self, s: u32, t: u32) -> bool {
        self.assert_converged();
        self.q.contains(self.blocks.block_of(s as usize), self.blocks.block_of(t as usize))
    }

    /// Returns `true` if `s` and `t` are simulation equivalent.
    ///
    /// This is the same as `self.in_preorder(s, t) && self.in_preorder(t, s)`.
    ///
    /// # Panics
    ///
    /// Panics if [`run()`](SimPartitioner::run) has not been called,
    /// or if `s` or `t` are outside the range of states of the LTS.
    pub fn same_class(&self, s: u32, t: u32) -> bool {
        self.class_of(s) == self.class_of(t)
    }

    /// Returns `true` if all states of class `a` are simulated by the states of class `b`.
    pub fn class_in_preorder(&self, a: usize, b: usize) -> bool {
        self.assert_converged();
        self.q.contains(a, b)
    }

    /// All pairs of classes `(a, b)` where `a` is simulated by `b`.
    pub fn relation_pairs(&self) -> impl Iterator<Item=(usize, usize)> + '_ {
        self.assert_converged();
        self.q.pairs()
    }

    /// All states in equivalence class `class`, in ascending order.
    pub fn class_members(&self, class: usize) -> Vec<u32> {
        self.assert_converged();
        let mut members: Vec<u32> = self.blocks.members(class)
            .map(|s| s as u32)
            .collect();
        members.sort_unstable();
        members
    }

    /// Simulation equivalence as an [`EquivalenceRelation`] over states.
    pub fn equivalence_relation(&self) -> EquivalenceRelation {
        self.assert_converged();
        let n_states = self.lts.n_states() as usize;
        let mut union = UnionFind::new(n_states);
        let mut representative: Vec<Option<usize>> = vec![None; self.blocks.len()];
        for s in 0..n_states {
            let class = self.blocks.block_of(s);
            match representative[class] {
                Some(r) => { union.union(r, s); },
                None => representative[class] = Some(s),
            }
        }
        union.into()
    }

    /// Statistics for every completed round, the first entry being the initial round.
    pub fn rounds(&self) -> &[RoundStats] {
        &self.rounds
    }

    /// Gives the transition relation on the computed equivalence classes of the LTS.
    ///
    /// Labels are those of the original LTS,
    /// states are equivalence class numbers in `0 .. num_classes()`.
    /// A transition `α -l-> β` is included if every state of `α` has an `l`-transition
    /// into `β`, and no state of `α` has an `l`-transition into a class that strictly
    /// simulates `β`. Transitions into such dominated classes are redundant
    /// modulo simulation equivalence.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Allocation`](crate::Error::Allocation) if the transition list
    /// cannot be allocated.
    ///
    /// # Panics
    ///
    /// Panics if [`run()`](SimPartitioner::run) has not been called.
    pub fn quotient_transitions(&self) -> Result<Vec<Transition>> {
        self.assert_converged();
        let n_pi = self.blocks.len();
        let mut transitions = Vec::new();
        // Every quotient transition is a ∀ triple, so this never reallocates
        transitions.try_reserve(self.incidence.n_forall())?;

        let mut dominated = vec![false; n_pi];
        for beta in 0..n_pi {
            for l in 0..self.n_labels {
                dominated.fill(false);
                for gamma in 0..n_pi {
                    if gamma != beta && self.q.contains(beta, gamma) {
                        for alpha in self.incidence.exists_into(l, gamma) {
                            dominated[alpha] = true;
                        }
                    }
                }
                for alpha in self.incidence.forall_into(l, beta) {
                    if !dominated[alpha] {
                        transitions.push(Transition::new(alpha as u32, l as u32, beta as u32));
                    }
                }
            }
        }
        Ok(transitions)
    }

    fn fmt_sigma_p(&self) -> String {
        let mut out = String::new();
        for (b, children) in self.children.iter().enumerate().take(self.n_sigma) {
            let _ = write!(out, "block {b}: {{");
            for &child in children {
                out.push_str(&self.blocks.fmt_block(child));
            }
            out.push_str("}\n");
        }
        let _ = write!(out, "Simulation relation: {}", self.p);
        out
    }

    fn fmt_pi_q(&self) -> String {
        let mut out = String::new();
        for b in 0..self.blocks.len() {
            let _ = writeln!(out, "block {b}: {{{}}}", self.blocks.fmt_block(b));
        }
        let _ = write!(out, "Simulation relation: {}", self.q);
        out
    }

    fn fmt_incidence(&self) -> String {
        self.incidence.display(|l| self.lts.label_name(l as u32).into_owned()).to_string()
    }
}

// Having just removed (α, β) from Q, remove every match(l, β', α) that lost its last
// witness δ with β' -l->∃ δ and α Q δ, and with it every (α', β') with α' -l->∀ α.
// Removed pairs are processed until nothing changes anymore.
fn cleanup(
    incidence: &Incidence,
    q: &mut BlockRelation,
    matches: &mut TripleSet,
    worklist: &mut Vec<(usize, usize)>,
    alpha: usize,
    beta: usize,
) {
    let n_pi = q.size();
    worklist.push((alpha, beta));
    while let Some((alpha, beta)) = worklist.pop() {
        for l in 0..incidence.n_labels() {
            for beta1 in incidence.exists_into(l, beta) {
                let supported = (0..n_pi)
                    .any(|delta| q.contains(alpha, delta) && incidence.exists(beta1, l, delta));
                if !supported {
                    matches.remove([l, beta1, alpha]);
                    for alpha1 in incidence.forall_into(l, alpha) {
                        if q.remove(alpha1, beta1) {
                            worklist.push((alpha1, beta1));
                        }
                    }
                }
            }
        }
    }
}
