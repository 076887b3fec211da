use std::fmt::{self, Write};

use crate::triple_set::TripleSet;

/// The relations `α -l->∃ γ` ("some state of α has an `l`-transition into γ")
/// and `α -l->∀ γ` ("every state of α has an `l`-transition into γ").
///
/// Both are filled label by label and target by target.
/// The set positions recorded after every target
/// allow enumerating all sources of a given label and target block.
#[derive(Debug, Clone, Default)]
pub(crate) struct Incidence {
    exists: TripleSet,
    forall: TripleSet,
    // pre_exists[l][γ] .. pre_exists[l][γ + 1] are the slots of all (α, l, γ) in exists
    pre_exists: Vec<Vec<usize>>,
    pre_forall: Vec<Vec<usize>>,
}

impl Incidence {
    /// Forget everything and prepare for `n_labels` labels.
    pub(crate) fn reset(&mut self, n_labels: usize) {
        self.exists.clear();
        self.forall.clear();
        self.pre_exists = vec![Vec::new(); n_labels];
        self.pre_forall = vec![Vec::new(); n_labels];
    }

    #[inline]
    pub(crate) fn n_labels(&self) -> usize {
        self.pre_exists.len()
    }

    /// Begin recording label `l`, must be called in ascending label order.
    pub(crate) fn start_label(&mut self, l: usize, n_targets: usize) {
        self.pre_exists[l].reserve(n_targets + 1);
        self.pre_forall[l].reserve(n_targets + 1);
        self.pre_exists[l].push(self.exists.position());
        self.pre_forall[l].push(self.forall.position());
    }

    /// Record that `source` reaches `target` with label `l`,
    /// with every state of `source` if `all` is set.
    pub(crate) fn record(&mut self, source: usize, l: usize, target: usize, all: bool) {
        self.exists.insert([source, l, target]);
        if all {
            self.forall.insert([source, l, target]);
        }
    }

    /// Close the current target of label `l`. Targets must be closed in ascending order.
    pub(crate) fn finish_target(&mut self, l: usize) {
        self.pre_exists[l].push(self.exists.position());
        self.pre_forall[l].push(self.forall.position());
    }

    /// All α with `α -l->∃ target`.
    pub(crate) fn exists_into(&self, l: usize, target: usize) -> impl Iterator<Item=usize> + '_ {
        self.exists.range(self.pre_exists[l][target], self.pre_exists[l][target + 1])
            .map(|[source, _, _]| source)
    }

    /// All α with `α -l->∀ target`.
    pub(crate) fn forall_into(&self, l: usize, target: usize) -> impl Iterator<Item=usize> + '_ {
        self.forall.range(self.pre_forall[l][target], self.pre_forall[l][target + 1])
            .map(|[source, _, _]| source)
    }

    #[inline]
    pub(crate) fn exists(&self, source: usize, l: usize, target: usize) -> bool {
        self.exists.contains([source, l, target])
    }

    /// Number of recorded `∀` triples, an upper bound for the size of the quotient.
    #[inline]
    pub(crate) fn n_forall(&self) -> usize {
        self.forall.len()
    }

    /// Print both relations, with label names supplied by `label`.
    pub(crate) fn display<'a, F>(&'a self, label: F) -> impl fmt::Display + 'a
    where
        F: Fn(usize) -> String + 'a,
    {
        DisplayIncidence { incidence: self, label }
    }
}

struct DisplayIncidence<'a, F> {
    incidence: &'a Incidence,
    label: F,
}

impl<'a, F: Fn(usize) -> String> fmt::Display for DisplayIncidence<'a, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fmt_set = |set: &TripleSet| {
            let mut out = String::from("{");
            for [source, l, target] in set {
                let _ = write!(out, "({source},{},{target}),", (self.label)(l));
            }
            out.push('}');
            out
        };
        write!(f, "Exists: {}\nForall: {}",
            fmt_set(&self.incidence.exists), fmt_set(&self.incidence.forall))
    }
}
