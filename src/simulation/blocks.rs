//! Block membership of states, stored as intrusive doubly linked lists.
//!
//! Every block owns two lists of states, the untouched and the touched ones.
//! Moving a single state from the untouched to the touched list of its block,
//! splitting off the untouched part into a new block,
//! and merging both lists back together are all cheap index manipulations.

use std::fmt::Write;

#[derive(Debug, Clone, Copy, Default)]
struct StateBucket {
    next: Option<usize>,
    prev: Option<usize>,
}

#[derive(Debug, Clone)]
pub(crate) struct Blocks {
    buckets: Vec<StateBucket>,
    state_touched: Vec<bool>,
    block_of: Vec<usize>,
    // Heads of the untouched and touched lists of each block
    untouched: Vec<Option<usize>>,
    touched: Vec<Option<usize>>,
    block_touched: Vec<bool>,
    sizes: Vec<usize>,
}

impl Blocks {
    /// Distribute states over blocks.
    /// `block_of[s]` is the block of state `s`, every block in `0 .. n_blocks` must be non-empty.
    pub(crate) fn new(block_of: Vec<usize>, n_blocks: usize) -> Self {
        let n_states = block_of.len();
        let mut blocks = Blocks {
            buckets: vec![StateBucket::default(); n_states],
            state_touched: vec![false; n_states],
            block_of,
            untouched: vec![None; n_blocks],
            touched: vec![None; n_blocks],
            block_touched: vec![false; n_blocks],
            sizes: vec![0; n_blocks],
        };
        // Prepend in reverse, so each list is in ascending state order
        for s in (0..n_states).rev() {
            let b = blocks.block_of[s];
            assert!(b < n_blocks, "State {s} assigned to non-existing block {b}");
            blocks.push_front_untouched(s, b);
            blocks.sizes[b] += 1;
        }
        assert!(blocks.sizes.iter().all(|&size| size > 0), "Every initial block must be non-empty");
        blocks
    }

    /// Number of blocks.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.untouched.len()
    }

    #[inline]
    pub(crate) fn block_of(&self, state: usize) -> usize {
        self.block_of[state]
    }

    /// Number of states in block `b`.
    #[inline]
    pub(crate) fn size(&self, b: usize) -> usize {
        self.sizes[b]
    }

    #[inline]
    pub(crate) fn has_untouched(&self, b: usize) -> bool {
        self.untouched[b].is_some()
    }

    fn push_front_untouched(&mut self, s: usize, b: usize) {
        let head = self.untouched[b];
        self.buckets[s] = StateBucket { next: head, prev: None };
        if let Some(h) = head {
            self.buckets[h].prev = Some(s);
        }
        self.untouched[b] = Some(s);
    }

    /// Move state `s` to the touched list of its block.
    ///
    /// Returns the block of `s` if this is the first state touched in that block.
    /// Touching an already touched state does nothing.
    pub(crate) fn touch(&mut self, s: usize) -> Option<usize> {
        if self.state_touched[s] {
            return None;
        }
        self.state_touched[s] = true;
        let b = self.block_of[s];
        let StateBucket { next, prev } = self.buckets[s];
        match prev {
            Some(p) => self.buckets[p].next = next,
            None => self.untouched[b] = next,
        }
        if let Some(n) = next {
            self.buckets[n].prev = prev;
        }
        let head = self.touched[b];
        self.buckets[s] = StateBucket { next: head, prev: None };
        if let Some(h) = head {
            self.buckets[h].prev = Some(s);
        }
        self.touched[b] = Some(s);

        if self.block_touched[b] {
            None
        } else {
            self.block_touched[b] = true;
            Some(b)
        }
    }

    /// Move all touched states of block `b` back to its untouched list.
    ///
    /// # Panics
    ///
    /// Panics if `b` has no touched states.
    pub(crate) fn untouch(&mut self, b: usize) {
        let head = self.touched[b]
            .unwrap_or_else(|| panic!("Untouching block {b} without touched states"));
        // Walk to the end of the touched list, clearing the flags on the way
        let mut last = head;
        self.state_touched[last] = false;
        while let Some(n) = self.buckets[last].next {
            last = n;
            self.state_touched[last] = false;
        }
        // Prepend the touched list to the untouched list
        let untouched_head = self.untouched[b];
        self.buckets[last].next = untouched_head;
        if let Some(u) = untouched_head {
            self.buckets[u].prev = Some(last);
        }
        self.untouched[b] = Some(head);
        self.touched[b] = None;
        self.block_touched[b] = false;
    }

    /// Move the untouched states of block `b` into a new block, whose index is returned.
    ///
    /// # Panics
    ///
    /// Panics if `b` has no untouched states.
    pub(crate) fn split_off_untouched(&mut self, b: usize) -> usize {
        let head = self.untouched[b].take()
            .unwrap_or_else(|| panic!("Splitting block {b} without untouched states"));
        let new = self.len();
        let mut moved = 0;
        let mut cursor = Some(head);
        while let Some(s) = cursor {
            self.block_of[s] = new;
            moved += 1;
            cursor = self.buckets[s].next;
        }
        self.untouched.push(Some(head));
        self.touched.push(None);
        self.block_touched.push(false);
        self.sizes[b] -= moved;
        self.sizes.push(moved);
        new
    }

    fn list(&self, head: Option<usize>) -> impl Iterator<Item=usize> + '_ {
        let mut cursor = head;
        std::iter::from_fn(move || {
            let s = cursor?;
            cursor = self.buckets[s].next;
            Some(s)
        })
    }

    /// All states of block `b`, untouched ones first.
    pub(crate) fn members(&self, b: usize) -> impl Iterator<Item=usize> + '_ {
        self.list(self.untouched[b]).chain(self.list(self.touched[b]))
    }

    /// Replace the contents of `buf` by the states of block `b`.
    pub(crate) fn collect_members(&self, b: usize, buf: &mut Vec<usize>) {
        buf.clear();
        buf.extend(self.members(b));
    }

    pub(crate) fn fmt_block(&self, b: usize) -> String {
        let mut out = String::new();
        for s in self.members(b) {
            let _ = write!(out, "{s},");
        }
        out
    }
}
