//! # Octree (3D)
//!
//! Hierarchical axis-aligned box index over a static point set or a
//! triangle set. It answers two queries:
//!
//! - **point query**: the indices stored in the leaf that contains a point,
//!   found by walking a single root-to-leaf path;
//! - **radius query**: every index stored in a leaf whose box touches a
//!   sphere, de-duplicated.
//!
//! ## Layout
//!
//! Nodes live in an arena (`nodes`) and refer to each other by index. A leaf
//! owns a contiguous range of the shared `indices` buffer; an internal node
//! owns exactly 8 children whose boxes split the parent at its centre.
//!
//! Octant codes use one bit per axis, set when the coordinate is *below*
//! the centre:
//!
//! - bit 0 (value 1): `x < center.x`
//! - bit 1 (value 2): `y < center.y`
//! - bit 2 (value 4): `z < center.z`
//!
//! ## Triangle sets
//!
//! A triangle is stored in the octant of each of its vertices and in every
//! further octant one of its edges passes through. Crossings are found by
//! intersecting the edge with the twelve axis-aligned rectangles that the
//! three centre planes cut out of the node's box. The triangle list of each
//! octant is de-duplicated before recursing.

use tracing::error;

use crate::simulation::states::NVec3;

/// Padding added around the bounding box of a triangle set
const TRIANGLE_BOX_PADDING: f64 = 0.01;

/// Build settings of an [`Octree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OctreeSettings {
    pub lod: usize, // max number of items in a leaf
    pub max_depth: usize, // leaves are forced at this depth
}

impl Default for OctreeSettings {
    fn default() -> Self {
        Self {
            lod: 8,
            max_depth: 16,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Leaf { start: usize, len: usize }, // range into Octree::indices
    Internal { children: [usize; 8] }, // indices into Octree::nodes
}

#[derive(Debug, Clone, PartialEq)]
pub struct OctreeNode {
    pub min: NVec3,
    pub max: NVec3,
    pub center: NVec3,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Octree {
    nodes: Vec<OctreeNode>,
    indices: Vec<usize>,
    root: usize,
    settings: OctreeSettings,
}

/// Input of the triangle build, shared by every recursion level
struct TriangleSet<'a> {
    vertices: &'a [NVec3],
    triangles: &'a [[usize; 3]],
    tris_per_vertex: Vec<Vec<usize>>,
}

impl Octree {
    /// Octree over a point set; every point index ends up in exactly one leaf
    pub fn from_points(points: &[NVec3], settings: OctreeSettings) -> Self {
        let (min, max) = bounding_box(points.iter());
        let mut tree = Self::empty(settings);
        let all: Vec<usize> = (0..points.len()).collect();
        tree.root = tree.build_points(min, max, all, points, 0);
        tree
    }

    /// Octree over a triangle set. Leaves store triangle numbers
    /// (positions in `triangles`). Triangles referring to missing vertices
    /// are ignored.
    pub fn from_triangles(vertices: &[NVec3], triangles: &[[usize; 3]], settings: OctreeSettings) -> Self {
        let mut tris_per_vertex = vec![Vec::new(); vertices.len()];
        let mut used = vec![false; vertices.len()];
        let mut tri_ids = Vec::with_capacity(triangles.len());

        for (t, tri) in triangles.iter().enumerate() {
            if tri.iter().any(|&v| v >= vertices.len()) {
                continue;
            }
            tri_ids.push(t);
            for &v in tri {
                tris_per_vertex[v].push(t);
                used[v] = true;
            }
        }

        let vert_ids: Vec<usize> = (0..vertices.len()).filter(|&v| used[v]).collect();
        let (mut min, mut max) = bounding_box(vert_ids.iter().map(|&v| &vertices[v]));
        min -= NVec3::repeat(TRIANGLE_BOX_PADDING);
        max += NVec3::repeat(TRIANGLE_BOX_PADDING);

        let set = TriangleSet {
            vertices,
            triangles,
            tris_per_vertex,
        };

        let mut tree = Self::empty(settings);
        tree.root = tree.build_triangles(min, max, vert_ids, tri_ids, &set, 0);
        tree
    }

    fn empty(settings: OctreeSettings) -> Self {
        Self {
            nodes: Vec::new(),
            indices: Vec::new(),
            root: 0,
            settings,
        }
    }

    // queries ==============================================================================

    /// Indices stored in the leaf containing `p`; empty when `p` is outside
    /// that leaf's box
    pub fn point_query(&self, p: &NVec3) -> &[usize] {
        let mut node_idx = self.root;
        loop {
            let node = &self.nodes[node_idx];
            match node.kind {
                NodeKind::Internal { children } => {
                    node_idx = children[octant_of(p, &node.center)];
                }
                NodeKind::Leaf { start, len } => {
                    if inside_box(p, &node.min, &node.max) {
                        return &self.indices[start..start + len];
                    }
                    return &[];
                }
            }
        }
    }

    /// Every index stored in a leaf whose box intersects the sphere `(c, r)`,
    /// sorted and de-duplicated. Never misses an item within distance `r`.
    pub fn radius_query(&self, c: &NVec3, r: f64) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        let r2 = r * r;

        while let Some(node_idx) = stack.pop() {
            let node = &self.nodes[node_idx];
            if !box_intersects_sphere(&node.min, &node.max, c, r2) {
                continue;
            }
            match node.kind {
                NodeKind::Internal { children } => stack.extend_from_slice(&children),
                NodeKind::Leaf { start, len } => out.extend_from_slice(&self.indices[start..start + len]),
            }
        }

        out.sort_unstable();
        out.dedup();
        out
    }

    /// Boxes of all leaves, as `(min, max)`
    pub fn leaf_boxes(&self) -> Vec<(NVec3, NVec3)> {
        self.nodes
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::Leaf { .. }))
            .map(|n| (n.min, n.max))
            .collect()
    }

    pub fn nodes(&self) -> &[OctreeNode] {
        &self.nodes
    }

    pub fn root(&self) -> usize {
        self.root
    }

    pub fn settings(&self) -> OctreeSettings {
        self.settings
    }

    /// Indices owned by `node`, empty for internal nodes
    pub fn leaf_indices(&self, node: usize) -> &[usize] {
        match self.nodes[node].kind {
            NodeKind::Leaf { start, len } => &self.indices[start..start + len],
            NodeKind::Internal { .. } => &[],
        }
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::Leaf { .. }))
            .count()
    }

    /// Length of the longest root-to-leaf path (a lone root leaf has depth 0)
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self.root, 0)];
        while let Some((node_idx, d)) = stack.pop() {
            match self.nodes[node_idx].kind {
                NodeKind::Internal { children } => {
                    stack.extend(children.iter().map(|&c| (c, d + 1)));
                }
                NodeKind::Leaf { .. } => deepest = deepest.max(d),
            }
        }
        deepest
    }

    // construction =========================================================================

    /// Push a node and return its index; the node starts as an empty leaf
    fn push_node(&mut self, min: NVec3, max: NVec3) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(OctreeNode {
            min,
            max,
            center: (min + max) * 0.5,
            kind: NodeKind::Leaf { start: self.indices.len(), len: 0 },
        });
        idx
    }

    /// Turn `node_idx` into a leaf owning `items`. If the index buffer cannot
    /// grow, the failure is logged and the leaf stays empty.
    fn make_leaf(&mut self, node_idx: usize, items: &[usize]) {
        if let Err(e) = self.indices.try_reserve(items.len()) {
            error!(node = node_idx, items = items.len(), "octree leaf allocation failed: {}", e);
            self.nodes[node_idx].kind = NodeKind::Leaf { start: self.indices.len(), len: 0 };
            return;
        }
        let start = self.indices.len();
        self.indices.extend_from_slice(items);
        self.nodes[node_idx].kind = NodeKind::Leaf { start, len: items.len() };
    }

    fn build_points(&mut self, min: NVec3, max: NVec3, items: Vec<usize>, points: &[NVec3], depth: usize) -> usize {
        let node_idx = self.push_node(min, max);

        if items.len() <= self.settings.lod || depth >= self.settings.max_depth {
            self.make_leaf(node_idx, &items);
            return node_idx;
        }

        let center = self.nodes[node_idx].center;
        let mut buckets: [Vec<usize>; 8] = Default::default();
        for i in items {
            buckets[octant_of(&points[i], &center)].push(i);
        }

        let mut children = [0usize; 8];
        for (s, bucket) in buckets.into_iter().enumerate() {
            let (cmin, cmax) = child_bbox(&min, &max, s);
            children[s] = self.build_points(cmin, cmax, bucket, points, depth + 1);
        }
        self.nodes[node_idx].kind = NodeKind::Internal { children };
        node_idx
    }

    fn build_triangles(
        &mut self,
        min: NVec3,
        max: NVec3,
        vert_ids: Vec<usize>,
        tri_ids: Vec<usize>,
        set: &TriangleSet,
        depth: usize,
    ) -> usize {
        let node_idx = self.push_node(min, max);

        if vert_ids.len() <= self.settings.lod || depth >= self.settings.max_depth {
            self.make_leaf(node_idx, &tri_ids);
            return node_idx;
        }

        let center = self.nodes[node_idx].center;
        let mut vert_space: [Vec<usize>; 8] = Default::default();
        let mut tris_space: [Vec<usize>; 8] = Default::default();

        // each vertex, with all its triangles, goes to its own octant
        for &v in &vert_ids {
            let s = octant_of(&set.vertices[v], &center);
            vert_space[s].push(v);
            tris_space[s].extend_from_slice(&set.tris_per_vertex[v]);
        }

        // octants crossed by the edges of the triangles
        for &t in &tri_ids {
            let [a, b, c] = set.triangles[t];
            let mut crossed = [false; 8];
            for (p, q) in [(a, b), (b, c), (c, a)] {
                mark_crossed_octants(&set.vertices[p], &set.vertices[q], &min, &max, &center, &mut crossed);
            }
            for (s, hit) in crossed.iter().enumerate() {
                if *hit {
                    tris_space[s].push(t);
                }
            }
        }

        for tris in tris_space.iter_mut() {
            tris.sort_unstable();
            tris.dedup();
        }

        let mut children = [0usize; 8];
        for (s, (verts, tris)) in vert_space.into_iter().zip(tris_space).enumerate() {
            let (cmin, cmax) = child_bbox(&min, &max, s);
            children[s] = self.build_triangles(cmin, cmax, verts, tris, set, depth + 1);
        }
        self.nodes[node_idx].kind = NodeKind::Internal { children };
        node_idx
    }
}

// helpers ===========================================================================

/// Axis-aligned bounding box of a set of points; a zero box when empty
fn bounding_box<'a>(points: impl Iterator<Item = &'a NVec3>) -> (NVec3, NVec3) {
    let mut min = NVec3::repeat(f64::INFINITY);
    let mut max = NVec3::repeat(f64::NEG_INFINITY);
    let mut any = false;

    for p in points {
        min = min.inf(p);
        max = max.sup(p);
        any = true;
    }

    if !any {
        return (NVec3::zeros(), NVec3::zeros());
    }
    (min, max)
}

/// 3-bit octant code of `p` relative to `center` (bit set when below)
pub fn octant_of(p: &NVec3, center: &NVec3) -> usize {
    let mut idx = 0;

    if p.x < center.x { idx |= 1; } // bit 0
    if p.y < center.y { idx |= 2; } // bit 1
    if p.z < center.z { idx |= 4; } // bit 2

    idx
}

/// Box of child octant `child_idx`: the lower half on an axis whose bit is
/// set, the upper half otherwise
pub fn child_bbox(parent_min: &NVec3, parent_max: &NVec3, child_idx: usize) -> (NVec3, NVec3) {
    let center = (parent_min + parent_max) * 0.5;

    let mut min = center;
    let mut max = center;

    for axis in 0..3 {
        if child_idx & (1 << axis) != 0 {
            min[axis] = parent_min[axis];
        } else {
            max[axis] = parent_max[axis];
        }
    }

    (min, max)
}

fn inside_box(p: &NVec3, min: &NVec3, max: &NVec3) -> bool {
    (0..3).all(|k| min[k] <= p[k] && p[k] <= max[k])
}

/// Conservative box/sphere overlap test on squared distances
fn box_intersects_sphere(min: &NVec3, max: &NVec3, c: &NVec3, r2: f64) -> bool {
    if inside_box(c, min, max) {
        return true;
    }
    // closest point of the box, axis by axis: below, inside or above
    let mut d2 = 0.0;
    for k in 0..3 {
        let v = if c[k] < min[k] {
            min[k]
        } else if c[k] > max[k] {
            max[k]
        } else {
            c[k]
        };
        d2 += (c[k] - v) * (c[k] - v);
    }
    d2 <= r2
}

/// Flag every octant the segment `p -> q` enters inside the box `[min, max]`.
///
/// Each centre plane `axis = center[axis]` is cut by the other two centre
/// planes into four rectangles of the box. When the segment passes through
/// one of them, the two octants sharing that rectangle are flagged.
/// Endpoints inside the box flag their own octant.
fn mark_crossed_octants(p: &NVec3, q: &NVec3, min: &NVec3, max: &NVec3, center: &NVec3, crossed: &mut [bool; 8]) {
    for end in [p, q] {
        if inside_box(end, min, max) {
            crossed[octant_of(end, center)] = true;
        }
    }

    for axis in 0..3 {
        let dp = p[axis] - center[axis];
        let dq = q[axis] - center[axis];
        if dp * dq > 0.0 || dp == dq {
            continue; // same side, or lying in the plane
        }
        let t = dp / (dp - dq);
        let i = p + (q - p) * t;
        if !inside_box(&i, min, max) {
            continue;
        }
        let code = octant_of(&i, center) & !(1 << axis);
        crossed[code] = true;
        crossed[code | (1 << axis)] = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_boxes_match_octant_codes() {
        let min = NVec3::new(-1.0, -2.0, -3.0);
        let max = NVec3::new(1.0, 2.0, 3.0);
        let center = (min + max) * 0.5;
        for s in 0..8 {
            let (cmin, cmax) = child_bbox(&min, &max, s);
            let mid = (cmin + cmax) * 0.5;
            assert_eq!(octant_of(&mid, &center), s, "child {} box {:?}..{:?}", s, cmin, cmax);
        }
    }

    #[test]
    fn sphere_touching_box_corner() {
        let min = NVec3::zeros();
        let max = NVec3::repeat(1.0);
        let c = NVec3::repeat(2.0);
        let d2 = 3.0; // squared distance to the corner (1,1,1)
        assert!(box_intersects_sphere(&min, &max, &c, d2 + 1e-9));
        assert!(!box_intersects_sphere(&min, &max, &c, d2 - 1e-3));
    }

    #[test]
    fn edge_crossing_flags_middle_octant() {
        // edge from the (-,-,+) octant to the (+,+,+) octant, cutting
        // through (-,+,+) on the way
        let min = NVec3::repeat(-1.0);
        let max = NVec3::repeat(1.0);
        let center = NVec3::zeros();
        let p = NVec3::new(-0.9, -0.1, 0.5);
        let q = NVec3::new(0.1, 0.9, 0.5);
        let mut crossed = [false; 8];
        mark_crossed_octants(&p, &q, &min, &max, &center, &mut crossed);

        assert!(crossed[octant_of(&p, &center)]);
        assert!(crossed[octant_of(&q, &center)]);
        assert!(crossed[octant_of(&NVec3::new(-0.05, 0.05, 0.5), &center)]);
        assert_eq!(crossed.iter().filter(|c| **c).count(), 3);
    }
}
