// octree.rs
//
// Copyright (c) 2026  Douglas Lau
//
//! Octree color quantization.
//!
//! Each level of the tree splits on one bit of every RGB channel, so leaves
//! at depth 8 hold exact colors.  Leaves are merged into their parents,
//! deepest level first, until the palette is small enough.
use crate::quantize::{channels, opaque, ColorQuantization};
use pix::rgb::{SRgb8, SRgba8};
use pix::Raster;
use std::cmp::Reverse;

/// Depth of leaf nodes (bits per channel)
const MAX_DEPTH: usize = 8;

/// Node identifier (index into arena)
type NodeId = usize;

/// Root node identifier
const ROOT: NodeId = 0;

/// Octree node
#[derive(Clone, Debug, Default)]
struct Node {
    /// Sum of red channel of all colors
    red: u64,
    /// Sum of green channel
    green: u64,
    /// Sum of blue channel
    blue: u64,
    /// Number of colors referencing the node (leaves only)
    refs: u64,
    /// Depth in tree
    depth: usize,
    /// Child nodes
    children: [Option<NodeId>; 8],
    /// Palette index (leaves only)
    index: Option<u8>,
}

impl Node {
    /// Create a new node
    fn new(depth: usize) -> Self {
        Node {
            depth,
            ..Default::default()
        }
    }

    /// Check if the node is a leaf
    fn is_leaf(&self) -> bool {
        self.refs > 0
    }

    /// Get the average color
    fn color(&self) -> SRgb8 {
        let refs = self.refs.max(1);
        SRgb8::new(
            (self.red / refs) as u8,
            (self.green / refs) as u8,
            (self.blue / refs) as u8,
        )
    }
}

/// Get the child index of a color at a depth
fn child_index(rgb: [u8; 3], depth: usize) -> usize {
    let shift = 7 - depth;
    let [r, g, b] = rgb.map(|c| usize::from((c >> shift) & 1));
    (r << 2) | (g << 1) | b
}

/// Octree color quantizer
#[derive(Clone, Debug)]
pub struct Octree {
    /// Node arena (root first)
    nodes: Vec<Node>,
    /// Palette colors
    palette: Vec<SRgb8>,
}

impl Octree {
    /// Build an octree palette of up to `color_count` colors from a raster
    pub fn from_raster(raster: &Raster<SRgba8>, color_count: usize) -> Self {
        Self::build(raster.pixels().iter().map(|p| opaque(*p)), color_count)
    }

    /// Build an octree palette of up to `color_count` colors
    pub fn from_colors(colors: &[SRgb8], color_count: usize) -> Self {
        Self::build(colors.iter().copied(), color_count)
    }

    /// Build an octree
    fn build<I>(colors: I, color_count: usize) -> Self
    where
        I: Iterator<Item = SRgb8>,
    {
        let color_count = color_count.clamp(1, 256);
        let mut tree = Octree {
            nodes: vec![Node::new(0)],
            palette: Vec::new(),
        };
        for clr in colors {
            tree.insert(channels(clr));
        }
        let leaves = tree.nodes.iter().filter(|n| n.is_leaf()).count();
        debug!("octree: {} nodes, {} leaves", tree.nodes.len(), leaves);
        tree.reduce(leaves, color_count);
        tree.fill_palette();
        debug!("octree: {} palette colors", tree.palette.len());
        tree
    }

    /// Insert one color
    fn insert(&mut self, rgb: [u8; 3]) {
        let mut id = ROOT;
        for depth in 0..MAX_DEPTH {
            let i = child_index(rgb, depth);
            id = match self.nodes[id].children[i] {
                Some(child) => child,
                None => {
                    let child = self.nodes.len();
                    self.nodes.push(Node::new(depth + 1));
                    self.nodes[id].children[i] = Some(child);
                    child
                }
            };
        }
        let leaf = &mut self.nodes[id];
        leaf.red += u64::from(rgb[0]);
        leaf.green += u64::from(rgb[1]);
        leaf.blue += u64::from(rgb[2]);
        leaf.refs += 1;
    }

    /// Get the sum of refs of all children of a node
    fn child_ref_sum(&self, id: NodeId) -> u64 {
        self.nodes[id]
            .children
            .iter()
            .flatten()
            .map(|c| self.nodes[*c].refs)
            .sum()
    }

    /// Reduce the tree until no more than `color_count` leaves remain
    fn reduce(&mut self, mut leaves: usize, color_count: usize) {
        let mut buckets: Vec<Vec<NodeId>> = vec![Vec::new(); MAX_DEPTH];
        for (id, node) in self.nodes.iter().enumerate() {
            if !node.is_leaf() && node.depth < MAX_DEPTH {
                buckets[node.depth].push(id);
            }
        }
        // Ref sums only settle once every deeper level is reduced, so a
        // bucket is sorted when it becomes the deepest non-empty one.
        let mut sorted = None;
        while leaves > color_count {
            let depth = match (0..MAX_DEPTH)
                .rev()
                .find(|d| !buckets[*d].is_empty())
            {
                Some(depth) => depth,
                None => break,
            };
            if sorted != Some(depth) {
                let mut bucket = std::mem::take(&mut buckets[depth]);
                bucket
                    .sort_by_key(|id| Reverse((self.child_ref_sum(*id), *id)));
                buckets[depth] = bucket;
                sorted = Some(depth);
            }
            if let Some(id) = buckets[depth].pop() {
                let reduced = self.merge_children(id);
                leaves = leaves + 1 - reduced;
            }
        }
    }

    /// Merge all children of a node into it, returning the number merged
    fn merge_children(&mut self, id: NodeId) -> usize {
        let children = std::mem::take(&mut self.nodes[id].children);
        let mut reduced = 0;
        for child in children.iter().flatten() {
            let (red, green, blue, refs) = {
                let c = &self.nodes[*child];
                (c.red, c.green, c.blue, c.refs)
            };
            let node = &mut self.nodes[id];
            node.red += red;
            node.green += green;
            node.blue += blue;
            node.refs += refs;
            reduced += 1;
        }
        reduced
    }

    /// Assign palette indices to leaves in pre-order
    fn fill_palette(&mut self) {
        let mut stack = vec![ROOT];
        while let Some(id) = stack.pop() {
            if self.nodes[id].is_leaf() {
                let index = self.palette.len() as u8;
                self.nodes[id].index = Some(index);
                let clr = self.nodes[id].color();
                self.palette.push(clr);
            } else {
                stack.extend(self.nodes[id].children.iter().rev().flatten());
            }
        }
    }

    /// Find the first palette index at or below a node, in pre-order
    fn nearest_index(&self, id: NodeId) -> Option<u8> {
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            if node.index.is_some() {
                return node.index;
            }
            stack.extend(node.children.iter().rev().flatten());
        }
        None
    }
}

impl ColorQuantization for Octree {
    fn color_table(&self) -> &[SRgb8] {
        &self.palette
    }

    fn quantize(&self, clr: SRgb8) -> u8 {
        let rgb = channels(clr);
        let mut id = ROOT;
        loop {
            let node = &self.nodes[id];
            if let Some(index) = node.index {
                return index;
            }
            if node.depth >= MAX_DEPTH {
                break;
            }
            match node.children[child_index(rgb, node.depth)] {
                Some(child) => id = child,
                None => break,
            }
        }
        self.nearest_index(id).unwrap_or_else(|| {
            warn!("octree: no palette index for {:?}", clr);
            0
        })
    }
}
