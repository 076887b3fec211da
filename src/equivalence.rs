//! Selecting equivalences and preorders, and applying them to whole transition systems.
//!
//! This module contains the entry points for comparing two systems
//! ([`compare()`], [`compare_preorder()`]) and for minimizing a system modulo an
//! equivalence ([`reduce()`]).
//! The [`Equivalence`] and [`Preorder`] selectors name every relation a caller may ask
//! for, but only simulation and ready simulation are decided by this crate.
//!
//! It also contains [`EquivalenceRelation`] for inspecting the computed classes.

use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use disjoint_sets::UnionFind;
use log::debug;
use rustc_hash::FxHashMap;

use crate::{Error, ReadySimPartitioner, Result, SimPartitioner, Transition, TransitionSystem};


/// Behavioural equivalences that can be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Equivalence {
    /// The identity, reducing with it does nothing.
    None,
    Bisimulation,
    BranchingBisimulation,
    Trace,
    WeakTrace,
    Simulation,
    ReadySimulation,
}

impl Equivalence {
    /// All selectors, in declaration order.
    pub const ALL: [Equivalence; 7] = [
        Equivalence::None,
        Equivalence::Bisimulation,
        Equivalence::BranchingBisimulation,
        Equivalence::Trace,
        Equivalence::WeakTrace,
        Equivalence::Simulation,
        Equivalence::ReadySimulation,
    ];

    /// Short name, as accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            Equivalence::None => "none",
            Equivalence::Bisimulation => "bisim",
            Equivalence::BranchingBisimulation => "branching-bisim",
            Equivalence::Trace => "trace",
            Equivalence::WeakTrace => "weak-trace",
            Equivalence::Simulation => "sim",
            Equivalence::ReadySimulation => "ready-sim",
        }
    }
}

impl fmt::Display for Equivalence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Equivalence {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        Equivalence::ALL.into_iter()
            .find(|eq| eq.name() == s)
            .ok_or_else(|| Error::UnknownEquivalence(s.to_string()))
    }
}

/// Behavioural preorders that can be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Preorder {
    Simulation,
    ReadySimulation,
    Trace,
    WeakTrace,
}

impl Preorder {
    pub const ALL: [Preorder; 4] = [
        Preorder::Simulation,
        Preorder::ReadySimulation,
        Preorder::Trace,
        Preorder::WeakTrace,
    ];

    /// Short name, as accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            Preorder::Simulation => "sim",
            Preorder::ReadySimulation => "ready-sim",
            Preorder::Trace => "trace",
            Preorder::WeakTrace => "weak-trace",
        }
    }
}

impl fmt::Display for Preorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preorder {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        Preorder::ALL.into_iter()
            .find(|pre| pre.name() == s)
            .ok_or_else(|| Error::UnknownPreorder(s.to_string()))
    }
}


/// Replace `lts` by its quotient modulo `equivalence`.
///
/// States of the result are the equivalence classes reachable from the class of the
/// initial state, which becomes state `0`. Label names are kept.
/// See [`SimPartitioner::quotient_transitions()`] for which transitions are kept.
///
/// # Errors
///
/// Returns [`Error::UnsupportedEquivalence`] for anything but
/// [`Equivalence::None`], [`Equivalence::Simulation`] and
/// [`Equivalence::ReadySimulation`], leaving `lts` unchanged.
pub fn reduce(lts: &mut TransitionSystem, equivalence: Equivalence) -> Result<()> {
    let n_before = lts.n_states();
    let initial = lts.initial_state();
    let (n_classes, initial_class, transitions) = match equivalence {
        Equivalence::None => return Ok(()),
        Equivalence::Simulation => {
            let mut partitioner = SimPartitioner::new(lts);
            partitioner.run();
            quotient(&partitioner, initial)?
        },
        Equivalence::ReadySimulation => {
            let mut partitioner = ReadySimPartitioner::new(lts);
            partitioner.run();
            quotient(&partitioner, initial)?
        },
        _ => return Err(Error::UnsupportedEquivalence(equivalence)),
    };

    let label_names = lts.label_names().to_vec();
    *lts = TransitionSystem::new(n_classes, lts.n_labels(), initial_class, transitions)?
        .with_label_names(label_names);
    lts.prune_unreachable();
    debug!("Reduced modulo {equivalence} from {n_before} to {} states", lts.n_states());
    Ok(())
}

fn quotient(partitioner: &SimPartitioner, initial: u32) -> Result<(u32, u32, Vec<Transition>)> {
    Ok((
        partitioner.num_classes() as u32,
        partitioner.class_of(initial) as u32,
        partitioner.quotient_transitions()?,
    ))
}

/// Decide whether the initial states of `lts1` and `lts2` are equivalent.
///
/// Both systems are merged into one, see [`TransitionSystem::merge()`] for how labels
/// are matched.
///
/// # Errors
///
/// Returns [`Error::UnsupportedEquivalence`] for anything but
/// [`Equivalence::Simulation`] and [`Equivalence::ReadySimulation`].
pub fn compare(
    lts1: &TransitionSystem,
    lts2: &TransitionSystem,
    equivalence: Equivalence,
) -> Result<bool> {
    check_equivalence(equivalence)?;
    let mut merged = lts1.clone();
    destructive_compare(&mut merged, lts2, equivalence)
}

/// Like [`compare()`], but merges `lts2` into `lts1` instead of a copy.
///
/// On success `lts1` contains the states of both systems, with its transitions reordered.
/// On error it is left unchanged.
pub fn destructive_compare(
    lts1: &mut TransitionSystem,
    lts2: &TransitionSystem,
    equivalence: Equivalence,
) -> Result<bool> {
    check_equivalence(equivalence)?;
    let s = lts1.initial_state();
    let t = lts1.merge(lts2) + lts2.initial_state();
    let equivalent = match equivalence {
        Equivalence::ReadySimulation => {
            let mut partitioner = ReadySimPartitioner::new(lts1);
            partitioner.run();
            partitioner.same_class(s, t)
        },
        _ => {
            let mut partitioner = SimPartitioner::new(lts1);
            partitioner.run();
            partitioner.same_class(s, t)
        },
    };
    debug!("Initial states are {}equivalent modulo {equivalence}",
        if equivalent { "" } else { "not " });
    Ok(equivalent)
}

fn check_equivalence(equivalence: Equivalence) -> Result<()> {
    match equivalence {
        Equivalence::Simulation | Equivalence::ReadySimulation => Ok(()),
        _ => Err(Error::UnsupportedEquivalence(equivalence)),
    }
}

/// Decide whether the initial state of `lts1` is below the initial state of `lts2`
/// in the given preorder.
///
/// # Errors
///
/// Returns [`Error::UnsupportedPreorder`] for anything but
/// [`Preorder::Simulation`] and [`Preorder::ReadySimulation`].
pub fn compare_preorder(
    lts1: &TransitionSystem,
    lts2: &TransitionSystem,
    preorder: Preorder,
) -> Result<bool> {
    check_preorder(preorder)?;
    let mut merged = lts1.clone();
    destructive_compare_preorder(&mut merged, lts2, preorder)
}

/// Like [`compare_preorder()`], but merges `lts2` into `lts1` instead of a copy.
///
/// On success `lts1` contains the states of both systems, with its transitions reordered.
/// On error it is left unchanged.
pub fn destructive_compare_preorder(
    lts1: &mut TransitionSystem,
    lts2: &TransitionSystem,
    preorder: Preorder,
) -> Result<bool> {
    check_preorder(preorder)?;
    let s = lts1.initial_state();
    let t = lts1.merge(lts2) + lts2.initial_state();
    let related = match preorder {
        Preorder::ReadySimulation => {
            let mut partitioner = ReadySimPartitioner::new(lts1);
            partitioner.run();
            partitioner.in_preorder(s, t)
        },
        _ => {
            let mut partitioner = SimPartitioner::new(lts1);
            partitioner.run();
            partitioner.in_preorder(s, t)
        },
    };
    debug!("Initial state of the first system is {}below the second modulo {preorder}",
        if related { "" } else { "not " });
    Ok(related)
}

fn check_preorder(preorder: Preorder) -> Result<()> {
    match preorder {
        Preorder::Simulation | Preorder::ReadySimulation => Ok(()),
        _ => Err(Error::UnsupportedPreorder(preorder)),
    }
}


/// Equivalence relation over states.
///
/// Created by [`SimPartitioner::equivalence_relation()`].
#[derive(Debug, Clone)]
pub struct EquivalenceRelation {
    /// The underlying union-find data structure.
    pub union: UnionFind,
}

impl EquivalenceRelation {
    /// Returns all elements, grouped by their equivalence class.
    ///
    /// Classes are ordered by their smallest element.
    pub fn get_classes(&self) -> Vec<Vec<usize>> {
        let mut class_idx = FxHashMap::default();
        let mut classes = Vec::new();
        for i in 0..self.len() {
            let class = self.find(i);
            let idx = class_idx.entry(class)
                .or_insert_with(|| {
                    classes.push(Vec::new());
                    classes.len() - 1
                });
            classes[*idx].push(i);
        }
        classes
    }

    /// The number of equivalence classes.
    pub fn count_classes(&self) -> u32 {
        let mut class_counted = vec![false; self.len()];
        let mut count = 0;
        for i in 0..self.len() {
            let class = self.find(i);
            if !class_counted[class] {
                count += 1;
                class_counted[class] = true;
            }
        }
        count
    }

    /// Returns an iterator over the equivalence class containing `state`.
    pub fn class_of(&self, state: usize) -> impl Iterator<Item=usize> + '_ {
        let class = self.find(state);
        (0..self.len())
            .filter(move |i| self.find(*i) == class)
    }
}

// Allows UnionFind methods to be called on EquivalenceRelation structs
impl Deref for EquivalenceRelation {
    type Target = UnionFind;
    fn deref(&self) -> &Self::Target {
        &self.union
    }
}

impl From<UnionFind> for EquivalenceRelation {
    fn from(union: UnionFind) -> Self {
        EquivalenceRelation { union }
    }
}
