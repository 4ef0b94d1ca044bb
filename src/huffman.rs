//! Adaptive Huffman tree used by the Gentee installer decompressor
//!
//! The installer's coder keeps three of these trees (codes, match offsets,
//! match lengths) and mutates them as symbols are decoded. The update
//! procedure reproduces the original decoder exactly, including its
//! non-standard normalization: when the root frequency reaches the ceiling,
//! *every* node is halved with an arithmetic shift, which lets internal sums
//! drift from their children and can drive counts negative. Decode parity
//! with real packages depends on keeping that behavior, so it is kept.

use crate::common::MAX_FREQ;

/// One node in the tree arena.
#[derive(Debug, Clone, Copy)]
struct TreeNode {
    /// Alphabet symbol for leaves; own arena index for internal nodes.
    symbol: u16,
    /// Signed on purpose: the halving/rebalance arithmetic can go negative.
    freq: i32,
    /// Arena index of the parent; `None` for the root.
    parent: Option<u16>,
    /// Arena indices of both children; `None` for leaves.
    children: Option<[u16; 2]>,
}

/// Fixed-capacity adaptive Huffman tree over `leaf_count` symbols.
///
/// Leaves occupy arena indices `[0, leaf_count)` with `symbol == index`;
/// the `leaf_count - 1` internal nodes follow, the root last. Frequencies
/// are seeded with the biased ramp `i + 1` rather than uniformly; that bias
/// is part of the format.
#[derive(Debug, Clone)]
pub struct AdaptiveTree {
    nodes: Vec<TreeNode>,
    leaf_count: usize,
    max_freq: i32,
}

impl AdaptiveTree {
    /// Create a tree over `leaf_count` symbols (at least 2) in its initial
    /// state.
    pub fn new(leaf_count: usize) -> Self {
        let mut tree = AdaptiveTree {
            nodes: Vec::with_capacity(leaf_count * 2),
            leaf_count,
            max_freq: MAX_FREQ,
        };
        tree.reset();
        tree
    }

    /// Rebuild the initial tree: leaf `i` seeded with `freq = i + 1`, then a
    /// greedy bottom-up merge of the two lowest-frequency parentless nodes
    /// until a single root remains.
    pub fn reset(&mut self) {
        self.nodes.clear();
        for i in 0..self.leaf_count {
            self.nodes.push(TreeNode {
                symbol: i as u16,
                freq: i as i32 + 1,
                parent: None,
                children: None,
            });
        }
        self.max_freq = MAX_FREQ;
        self.build_tree();
    }

    fn build_tree(&mut self) {
        for _ in 1..self.leaf_count {
            // Scan parentless nodes in arena order. First-found wins ties
            // for the lowest; the runner-up slot only takes strictly
            // smaller candidates once occupied.
            let mut lowest: Option<u16> = None;
            let mut second: Option<u16> = None;
            for idx in 0..self.nodes.len() as u16 {
                if self.nodes[usize::from(idx)].parent.is_some() {
                    continue;
                }
                let freq = self.nodes[usize::from(idx)].freq;
                if lowest.map_or(true, |lo| freq < self.nodes[usize::from(lo)].freq) {
                    second = lowest;
                    lowest = Some(idx);
                } else if second.map_or(true, |s| freq < self.nodes[usize::from(s)].freq) {
                    second = Some(idx);
                }
            }
            let (Some(lo), Some(next)) = (lowest, second) else {
                break;
            };
            let merged = self.nodes.len() as u16;
            let freq = self.nodes[usize::from(lo)].freq + self.nodes[usize::from(next)].freq;
            self.nodes.push(TreeNode {
                symbol: merged,
                freq,
                parent: None,
                children: Some([lo, next]),
            });
            self.nodes[usize::from(lo)].parent = Some(merged);
            self.nodes[usize::from(next)].parent = Some(merged);
        }
    }

    /// Arena index of the root node.
    pub fn root(&self) -> u16 {
        (self.nodes.len() - 1) as u16
    }

    /// Children of `node`, or `None` for a leaf.
    pub fn children(&self, node: u16) -> Option<[u16; 2]> {
        self.nodes[usize::from(node)].children
    }

    /// Parent of `node`, or `None` for the root.
    pub fn parent(&self, node: u16) -> Option<u16> {
        self.nodes[usize::from(node)].parent
    }

    /// Alphabet symbol stored at `node`.
    pub fn symbol(&self, node: u16) -> u16 {
        self.nodes[usize::from(node)].symbol
    }

    /// Current frequency of `node`. May be negative.
    pub fn freq(&self, node: u16) -> i32 {
        self.nodes[usize::from(node)].freq
    }

    /// Number of leaf symbols.
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Record one occurrence of `symbol`, walking leaf to root.
    ///
    /// At each step the node may first be rotated against its uncle when the
    /// uncle's frequency is no larger; the node's frequency is then bumped
    /// and the walk continues at its (possibly new) parent. Once the root
    /// frequency reaches the ceiling, every node is halved in place.
    pub fn increment_freq(&mut self, symbol: u16) {
        let mut entry = symbol;
        loop {
            if let Some(parent) = self.nodes[usize::from(entry)].parent {
                if let Some(grandparent) = self.nodes[usize::from(parent)].parent {
                    let uncle = self.other_child(grandparent, parent);
                    if self.nodes[usize::from(uncle)].freq <= self.nodes[usize::from(entry)].freq
                    {
                        self.rebalance(entry, uncle);
                    }
                }
            }
            self.nodes[usize::from(entry)].freq += 1;
            match self.nodes[usize::from(entry)].parent {
                Some(parent) => entry = parent,
                None => break,
            }
        }
        if self.max_freq <= self.nodes[usize::from(self.root())].freq {
            // Arithmetic shift over all nodes, internal ones included. The
            // asymmetric rounding this causes is required for decode parity.
            for node in &mut self.nodes {
                node.freq >>= 1;
            }
        }
    }

    /// Two-pass uncle swap. The second pass runs only when the first pass's
    /// uncle had children and its busier child outweighs the entry's
    /// sibling; the frequency adjustment in that case is signed and carried
    /// verbatim from the original coder.
    fn rebalance(&mut self, mut entry: u16, mut uncle: u16) {
        for pass in 0..2 {
            let Some(parent) = self.nodes[usize::from(entry)].parent else {
                break;
            };
            let Some(grandparent) = self.nodes[usize::from(parent)].parent else {
                break;
            };
            let sibling = self.other_child(parent, entry);
            // Busier child of the uncle; ties prefer the second child.
            let uncle_child = self.nodes[usize::from(uncle)].children.map(|[a, b]| {
                if self.nodes[usize::from(a)].freq <= self.nodes[usize::from(b)].freq {
                    b
                } else {
                    a
                }
            });

            self.replace_child(parent, entry, uncle);
            self.replace_child(grandparent, uncle, entry);
            self.nodes[usize::from(uncle)].parent = Some(parent);
            self.nodes[usize::from(entry)].parent = Some(grandparent);

            match uncle_child {
                Some(child)
                    if pass == 0
                        && self.nodes[usize::from(child)].freq
                            > self.nodes[usize::from(sibling)].freq =>
                {
                    let delta = self.nodes[usize::from(sibling)].freq
                        - self.nodes[usize::from(child)].freq;
                    self.nodes[usize::from(uncle)].freq += delta;
                    entry = child;
                    uncle = sibling;
                }
                _ => break,
            }
        }
    }

    fn other_child(&self, parent: u16, child: u16) -> u16 {
        match self.nodes[usize::from(parent)].children {
            Some([a, b]) if a == child => b,
            Some([a, _]) => a,
            None => child,
        }
    }

    fn replace_child(&mut self, parent: u16, from: u16, to: u16) {
        if let Some(children) = self.nodes[usize::from(parent)].children.as_mut() {
            if children[0] == from {
                children[0] = to;
            } else {
                children[1] = to;
            }
        }
    }
}
