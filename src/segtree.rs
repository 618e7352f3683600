//! Lazy range-add / range-max segment tree over virtual time.
//!
//! Backs the online-Belady occupancy function: cell `t` holds the number of
//! bytes retained in the cache during virtual-time slot `t`. Admitting an
//! object adds its size over `[t_prev, t_now]`; the admission test is a
//! range-max over the same interval.
//!
//! The tree covers `[0, capacity)` with a power-of-two leaf count and grows
//! on demand: an `update` whose right bound falls past the capacity doubles
//! it (repeatedly) by grafting the existing root as the left child of a new
//! root, so every existing cell keeps its value. Queries never grow; cells
//! at or past the capacity read as zero.
//!
//! Each internal node carries a `lazy` delta pending for its whole subtree.
//! Pushdown applies the delta to the node and forwards it to both children
//! before any descent, so `tree[node] + lazy[node]` is always the true
//! range-max of the node's interval.

/// Range-add / range-max segment tree with lazy propagation.
///
/// ```
/// use mrc_rs::LazySegmentTree;
///
/// let mut tree = LazySegmentTree::new();
/// tree.update(0, 4, 3);
/// tree.update(2, 6, 5);
/// tree.update(3, 3, 1);
/// assert_eq!(tree.query(0, 6), 9);
/// assert_eq!(tree.query(5, 6), 5);
/// ```
#[derive(Debug, Clone)]
pub struct LazySegmentTree {
    tree: Vec<i64>,
    lazy: Vec<i64>,
    /// leaf count, always a power of two
    capacity: usize,
}

impl Default for LazySegmentTree {
    fn default() -> Self {
        Self::new()
    }
}

impl LazySegmentTree {
    /// Tree covering `[0, 1)`, all zeros.
    pub fn new() -> Self {
        Self {
            tree: vec![0; 2],
            lazy: vec![0; 2],
            capacity: 1,
        }
    }

    /// Current leaf count.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Add `val` to every cell in the inclusive range `[l, r]`, growing the
    /// tree first if `r` falls past the capacity.
    pub fn update(&mut self, l: usize, r: usize, val: i64) {
        if l > r {
            return;
        }
        while r >= self.capacity {
            self.grow();
        }
        self.update_range(1, 0, self.capacity - 1, l, r, val);
    }

    /// Maximum over the inclusive range `[l, r]`. Cells past the capacity
    /// read as zero; the tree never grows on a query.
    pub fn query(&mut self, l: usize, r: usize) -> i64 {
        if l > r || l >= self.capacity {
            return 0;
        }
        let clipped = r.min(self.capacity - 1);
        let m = self.query_range(1, 0, self.capacity - 1, l, clipped);
        if r >= self.capacity {
            m.max(0)
        } else {
            m
        }
    }

    /// Double the capacity, preserving every cell: the old root becomes the
    /// left child of the new root. Node `i` at depth `d` lives at index
    /// `[2^d, 2^(d+1))`, so the graft shifts it to `i + 2^d`.
    fn grow(&mut self) {
        let old_cap = self.capacity;
        let new_cap = old_cap * 2;
        let mut tree = vec![0i64; new_cap * 2];
        let mut lazy = vec![0i64; new_cap * 2];
        let mut level = 1usize;
        while level <= old_cap {
            for i in level..level * 2 {
                tree[i + level] = self.tree[i];
                lazy[i + level] = self.lazy[i];
            }
            level *= 2;
        }
        // right half is all zeros; the new root's max folds both in
        tree[1] = (tree[2] + lazy[2]).max(0);
        self.tree = tree;
        self.lazy = lazy;
        self.capacity = new_cap;
    }

    #[inline]
    fn push_down(&mut self, node: usize, leaf: bool) {
        let pending = self.lazy[node];
        if pending != 0 {
            self.tree[node] += pending;
            if !leaf {
                self.lazy[2 * node] += pending;
                self.lazy[2 * node + 1] += pending;
            }
            self.lazy[node] = 0;
        }
    }

    fn update_range(&mut self, node: usize, start: usize, end: usize, l: usize, r: usize, val: i64) {
        self.push_down(node, start == end);
        if start > r || end < l {
            return;
        }
        if start >= l && end <= r {
            self.tree[node] += val;
            if start != end {
                self.lazy[2 * node] += val;
                self.lazy[2 * node + 1] += val;
            }
            return;
        }
        let mid = (start + end) / 2;
        self.update_range(2 * node, start, mid, l, r, val);
        self.update_range(2 * node + 1, mid + 1, end, l, r, val);
        self.tree[node] = (self.tree[2 * node] + self.lazy[2 * node])
            .max(self.tree[2 * node + 1] + self.lazy[2 * node + 1]);
    }

    fn query_range(&mut self, node: usize, start: usize, end: usize, l: usize, r: usize) -> i64 {
        if start > r || end < l {
            return 0;
        }
        self.push_down(node, start == end);
        if start >= l && end <= r {
            return self.tree[node];
        }
        let mid = (start + end) / 2;
        let p1 = self.query_range(2 * node, start, mid, l, r);
        let p2 = self.query_range(2 * node + 1, mid + 1, end, l, r);
        p1.max(p2)
    }
}
