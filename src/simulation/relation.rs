use std::fmt::{self, Write};

use ndarray::Array2;

/// Dense binary relation between blocks of a partition.
///
/// `contains(a, b)` means that the states of block `a` are (still) assumed to be
/// simulated by the states of block `b`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BlockRelation {
    matrix: Array2<bool>,
}

impl BlockRelation {
    /// The identity relation on `n` blocks.
    pub(crate) fn identity(n: usize) -> Self {
        BlockRelation {
            matrix: Array2::from_shape_fn((n, n), |(a, b)| a == b),
        }
    }

    pub(crate) fn from_matrix(matrix: Array2<bool>) -> Self {
        assert!(matrix.is_square(), "Block relation must be a square matrix");
        BlockRelation { matrix }
    }

    /// Number of blocks the relation is defined on.
    #[inline]
    pub(crate) fn size(&self) -> usize {
        self.matrix.nrows()
    }

    #[inline]
    pub(crate) fn contains(&self, a: usize, b: usize) -> bool {
        self.matrix[[a, b]]
    }

    /// Remove the pair `(a, b)`. Returns `true` if it was present.
    #[inline]
    pub(crate) fn remove(&mut self, a: usize, b: usize) -> bool {
        let entry = &mut self.matrix[[a, b]];
        let was = *entry;
        *entry = false;
        was
    }

    /// The relation on a finer partition induced by this relation on the coarser one.
    ///
    /// `parent[a]` is the block of this relation that block `a` of the finer partition
    /// descended from.
    pub(crate) fn induced(&self, parent: &[usize]) -> Self {
        let n = parent.len();
        BlockRelation {
            matrix: Array2::from_shape_fn((n, n), |(a, b)| self.matrix[[parent[a], parent[b]]]),
        }
    }

    /// All related pairs in row-major order.
    pub(crate) fn pairs(&self) -> impl Iterator<Item=(usize, usize)> + '_ {
        self.matrix.indexed_iter()
            .filter(|(_, &related)| related)
            .map(|(pair, _)| pair)
    }

    pub(crate) fn is_reflexive(&self) -> bool {
        self.matrix.diag().iter().all(|&related| related)
    }
}

impl Default for BlockRelation {
    fn default() -> Self {
        BlockRelation::identity(0)
    }
}

impl fmt::Display for BlockRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::from("{");
        for (a, b) in self.pairs() {
            let _ = write!(out, "({a},{b}),");
        }
        out.push('}');
        f.write_str(&out)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_induced() {
        let mut rel = BlockRelation::identity(2);
        assert!(rel.is_reflexive());
        assert!(!rel.contains(0, 1));
        rel = BlockRelation::from_matrix(ndarray::arr2(&[[true, true], [false, true]]));
        let fine = rel.induced(&[0, 1, 0]);
        assert_eq!(fine.size(), 3);
        assert_eq!(fine.pairs().collect::<Vec<_>>(),
            vec![(0, 0), (0, 1), (0, 2), (1, 1), (2, 0), (2, 1), (2, 2)]);
    }

    #[test]
    fn test_remove() {
        let mut rel = BlockRelation::identity(3);
        assert!(rel.remove(1, 1));
        assert!(!rel.remove(1, 1));
        assert!(!rel.remove(0, 2));
        assert!(!rel.is_reflexive());
        assert_eq!(rel.to_string(), "{(0,0),(2,2),}");
    }
}
