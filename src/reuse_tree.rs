//! Weighted order-statistic tree for byte-weighted stack distances.
//!
//! A self-adjusting binary search tree keyed by virtual time, storing one
//! weight (object size) per entry and maintaining subtree weight sums. The
//! single non-standard query, [`distance`], returns the total weight of all
//! entries with key at or above a given vtime in one descent; when the key
//! is the previous access time of an object, that value is exactly the
//! byte-weighted LRU stack distance of the current access.
//!
//! Nodes live in an index arena with a free list; `u32::MAX` is the nil
//! sentinel. Splaying keeps amortized `O(log n)` bounds and favors the
//! temporal locality of trace reuse patterns: hot objects sit near the root.
//!
//! Keys are unique by construction (one entry per currently sampled object,
//! keyed by its last access vtime).
//!
//! [`distance`]: ReuseTree::distance

const NIL: u32 = u32::MAX;

#[derive(Debug, Clone, Copy)]
struct Node {
    key: u64,
    weight: u64,
    /// weight + sum of both child subtrees
    sum: u64,
    left: u32,
    right: u32,
    parent: u32,
}

/// Ordered map `vtime -> weight` with `O(log n)` weighted suffix sums.
///
/// ```
/// use mrc_rs::ReuseTree;
///
/// let mut tree = ReuseTree::new();
/// tree.insert(1, 100);
/// tree.insert(2, 50);
/// tree.insert(3, 25);
/// assert_eq!(tree.distance(2), 75); // weights of keys >= 2
/// assert_eq!(tree.total_weight(), 175);
/// tree.erase(2);
/// assert_eq!(tree.distance(2), 25);
/// ```
#[derive(Debug, Clone)]
pub struct ReuseTree {
    nodes: Vec<Node>,
    free: Vec<u32>,
    root: u32,
    len: usize,
}

impl Default for ReuseTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ReuseTree {
    /// Empty tree.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            root: NIL,
            len: 0,
        }
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when no entries are present.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Sum of all stored weights.
    #[inline]
    pub fn total_weight(&self) -> u64 {
        self.sum_of(self.root)
    }

    /// Remove every entry, keeping the arena allocation.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.root = NIL;
        self.len = 0;
    }

    /// True if `key` is present.
    pub fn contains(&self, key: u64) -> bool {
        self.find(key) != NIL
    }

    /// Sum of weights of entries with key `>= key`.
    ///
    /// Pure descent, no restructuring; every `distance` in the profilers is
    /// followed by an `erase`/`insert` pair on the same locality, which
    /// splays and restores the amortized bounds.
    pub fn distance(&self, key: u64) -> u64 {
        let mut x = self.root;
        let mut acc = 0u64;
        while x != NIL {
            let n = &self.nodes[x as usize];
            if key > n.key {
                x = n.right;
            } else {
                acc += n.weight + self.sum_of(n.right);
                if key == n.key {
                    break;
                }
                x = n.left;
            }
        }
        acc
    }

    /// Insert `(key, weight)`; an existing key has its weight overwritten.
    pub fn insert(&mut self, key: u64, weight: u64) {
        if self.root == NIL {
            let n = self.alloc(key, weight);
            self.root = n;
            self.len = 1;
            return;
        }
        let mut p = self.root;
        loop {
            let pk = self.nodes[p as usize].key;
            if key == pk {
                self.nodes[p as usize].weight = weight;
                self.maintain(p);
                self.splay(p);
                return;
            }
            let next = if key < pk {
                self.nodes[p as usize].left
            } else {
                self.nodes[p as usize].right
            };
            if next == NIL {
                break;
            }
            p = next;
        }
        let n = self.alloc(key, weight);
        self.nodes[n as usize].parent = p;
        if key < self.nodes[p as usize].key {
            self.nodes[p as usize].left = n;
        } else {
            self.nodes[p as usize].right = n;
        }
        self.len += 1;
        self.splay(n);
    }

    /// Remove `key`; returns whether it was present.
    pub fn erase(&mut self, key: u64) -> bool {
        let x = self.find(key);
        if x == NIL {
            return false;
        }
        self.splay(x);
        let l = self.nodes[x as usize].left;
        let r = self.nodes[x as usize].right;
        if l != NIL {
            self.nodes[l as usize].parent = NIL;
        }
        if r != NIL {
            self.nodes[r as usize].parent = NIL;
        }
        self.free.push(x);
        self.len -= 1;
        if l == NIL {
            self.root = r;
            return true;
        }
        // splay the maximum of the left subtree to its root; it has no right
        // child, so the right subtree attaches directly
        let mut m = l;
        while self.nodes[m as usize].right != NIL {
            m = self.nodes[m as usize].right;
        }
        self.splay(m);
        self.nodes[m as usize].right = r;
        if r != NIL {
            self.nodes[r as usize].parent = m;
        }
        self.maintain(m);
        true
    }

    #[inline]
    fn sum_of(&self, x: u32) -> u64 {
        if x == NIL {
            0
        } else {
            self.nodes[x as usize].sum
        }
    }

    fn alloc(&mut self, key: u64, weight: u64) -> u32 {
        let node = Node {
            key,
            weight,
            sum: weight,
            left: NIL,
            right: NIL,
            parent: NIL,
        };
        if let Some(i) = self.free.pop() {
            self.nodes[i as usize] = node;
            i
        } else {
            self.nodes.push(node);
            (self.nodes.len() - 1) as u32
        }
    }

    fn find(&self, key: u64) -> u32 {
        let mut x = self.root;
        while x != NIL {
            let n = &self.nodes[x as usize];
            if key < n.key {
                x = n.left;
            } else if key > n.key {
                x = n.right;
            } else {
                return x;
            }
        }
        NIL
    }

    fn maintain(&mut self, x: u32) {
        let (l, r) = {
            let n = &self.nodes[x as usize];
            (n.left, n.right)
        };
        let sum = self.nodes[x as usize].weight + self.sum_of(l) + self.sum_of(r);
        self.nodes[x as usize].sum = sum;
    }

    /// Rotate `x` above its parent. Caller guarantees `x` has a parent.
    fn rotate(&mut self, x: u32) {
        let p = self.nodes[x as usize].parent;
        let g = self.nodes[p as usize].parent;
        if self.nodes[p as usize].left == x {
            let b = self.nodes[x as usize].right;
            self.nodes[p as usize].left = b;
            if b != NIL {
                self.nodes[b as usize].parent = p;
            }
            self.nodes[x as usize].right = p;
        } else {
            let b = self.nodes[x as usize].left;
            self.nodes[p as usize].right = b;
            if b != NIL {
                self.nodes[b as usize].parent = p;
            }
            self.nodes[x as usize].left = p;
        }
        self.nodes[p as usize].parent = x;
        self.nodes[x as usize].parent = g;
        if g != NIL {
            if self.nodes[g as usize].left == p {
                self.nodes[g as usize].left = x;
            } else {
                self.nodes[g as usize].right = x;
            }
        }
        self.maintain(p);
        self.maintain(x);
    }

    fn splay(&mut self, x: u32) {
        loop {
            let p = self.nodes[x as usize].parent;
            if p == NIL {
                break;
            }
            let g = self.nodes[p as usize].parent;
            if g == NIL {
                // zig
                self.rotate(x);
            } else {
                let x_left = self.nodes[p as usize].left == x;
                let p_left = self.nodes[g as usize].left == p;
                if x_left == p_left {
                    // zig-zig
                    self.rotate(p);
                    self.rotate(x);
                } else {
                    // zig-zag
                    self.rotate(x);
                    self.rotate(x);
                }
            }
        }
        self.root = x;
    }
}
