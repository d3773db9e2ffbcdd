// cmodel.rs — World collision model: BSP point queries, PVS and box tracing

use crc::{Crc, CRC_32_ISO_HDLC};
use rayon::prelude::*;

use crate::common::{com_dprintf, com_error};
use crate::pmove::PmoveCallbacks;
use crate::q_shared::{
    box_on_plane_side, dot_product, vector_compare, CPlane, Trace, Vec3, ERR_FATAL,
    MASK_PLAYERSOLID,
};
use crate::qfiles::{DBrush, DLeaf, DNode, DPlane, DVisData, MapLumps};

// ============================================================
// Constants
// ============================================================

/// Cluster id of leaves outside the playable volume. Sees everything.
pub const CLUSTER_OUTSIDE: i32 = -1;

const DIST_EPSILON: f32 = 0.03125;

const PARALLEL_LUMP_THRESHOLD: usize = 64;

const CRC_CALC: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

// ============================================================
// Runtime structures
// ============================================================

/// Child of a BSP node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildRef {
    Node(usize),
    Leaf(usize),
}

impl ChildRef {
    /// Decode the on-disk form, where leaves are stored as `-1 - leafnum`.
    pub fn from_raw(raw: i32) -> Self {
        if raw < 0 {
            ChildRef::Leaf((-1 - raw) as usize)
        } else {
            ChildRef::Node(raw as usize)
        }
    }
}

#[derive(Debug, Clone)]
pub struct CNode {
    pub plane_idx: usize,
    /// [front, back]
    pub children: [ChildRef; 2],
    pub mins: Vec3,
    pub maxs: Vec3,
}

#[derive(Debug, Clone, Default)]
pub struct CLeaf {
    pub cluster: i32,
    /// Union of the contents of every brush in the leaf.
    pub contents: i32,
    pub mins: Vec3,
    pub maxs: Vec3,
    pub first_leaf_face: usize,
    pub num_leaf_faces: usize,
    pub first_leaf_brush: usize,
    pub num_leaf_brushes: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct CBrushSide {
    pub plane_idx: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CBrush {
    pub contents: i32,
    pub first_side: usize,
    pub num_sides: usize,
}

#[derive(Debug, Clone, Default)]
pub struct VisData {
    pub num_clusters: usize,
    pub bytes_per_row: usize,
    pub bits: Vec<u8>,
}

// ============================================================
// Per-trace scratch state
// ============================================================

struct TraceWork {
    start: Vec3,
    end: Vec3,
    mins: Vec3,
    maxs: Vec3,
    extents: Vec3,
    ispoint: bool,
    contents: i32,
    /// One bit per brush already clipped by this trace.
    checked: Vec<u64>,
    trace: Trace,
}

impl TraceWork {
    fn new(start: &Vec3, end: &Vec3, mins: &Vec3, maxs: &Vec3, contents: i32, num_brushes: usize) -> Self {
        let ispoint = mins.iter().chain(maxs.iter()).all(|&v| v == 0.0);
        let mut extents = [0.0f32; 3];
        if !ispoint {
            for i in 0..3 {
                extents[i] = (-mins[i]).max(maxs[i]);
            }
        }
        Self {
            start: *start,
            end: *end,
            mins: *mins,
            maxs: *maxs,
            extents,
            ispoint,
            contents,
            checked: vec![0u64; num_brushes.div_ceil(64)],
            trace: Trace::default(),
        }
    }

    /// Returns true if the brush was already checked by this trace.
    fn mark_checked(&mut self, brush: usize) -> bool {
        let word = &mut self.checked[brush / 64];
        let bit = 1u64 << (brush % 64);
        let already = *word & bit != 0;
        *word |= bit;
        already
    }
}

// ============================================================
// Load-time validation helpers
// ============================================================

fn checked_index(raw: i32, len: usize, what: &str) -> usize {
    if raw < 0 || raw as usize >= len {
        com_error(ERR_FATAL, &format!("{} index {} out of range (0..{})", what, raw, len));
    }
    raw as usize
}

fn checked_range(first: i32, count: i32, len: usize, what: &str) -> (usize, usize) {
    if first < 0 || count < 0 || first as usize + count as usize > len {
        com_error(
            ERR_FATAL,
            &format!("{} range {}+{} out of range (0..{})", what, first, count, len),
        );
    }
    (first as usize, count as usize)
}

fn checked_child(raw: i32, num_nodes: usize, num_leaves: usize) -> ChildRef {
    let child = ChildRef::from_raw(raw);
    match child {
        ChildRef::Node(n) if n >= num_nodes => {
            com_error(ERR_FATAL, &format!("node child {} out of range (0..{})", n, num_nodes));
        }
        ChildRef::Leaf(l) if l >= num_leaves => {
            com_error(ERR_FATAL, &format!("leaf child {} out of range (0..{})", l, num_leaves));
        }
        _ => {}
    }
    child
}

fn int_bounds(mins: &[i32; 3], maxs: &[i32; 3]) -> (Vec3, Vec3) {
    (mins.map(|v| v as f32), maxs.map(|v| v as f32))
}

// ============================================================
// BspWorld
// ============================================================

/// The static world: BSP tree, brushes and PVS. Read-only once built, so a
/// single `Arc<BspWorld>` can serve traces from any number of threads.
#[derive(Debug)]
pub struct BspWorld {
    pub planes: Vec<CPlane>,
    pub nodes: Vec<CNode>,
    pub leaves: Vec<CLeaf>,
    pub leaf_faces: Vec<usize>,
    pub leaf_brushes: Vec<usize>,
    pub brushes: Vec<CBrush>,
    pub brush_sides: Vec<CBrushSide>,
    pub vis: Option<VisData>,
    pub num_clusters: usize,
    pub entity_string: String,
    checksum: u32,
}

impl BspWorld {
    /// Build the world from loader lumps. Any index that points outside its
    /// target array is fatal; after this every lookup is trusted.
    pub fn new(lumps: &MapLumps) -> Self {
        if lumps.leaves.is_empty() {
            com_error(ERR_FATAL, "Map with no leafs");
        }

        let planes = Self::load_planes(&lumps.planes);
        let nodes = Self::load_nodes(&lumps.nodes, planes.len(), lumps.leaves.len());

        let brush_sides = lumps
            .brush_sides
            .iter()
            .map(|s| CBrushSide {
                plane_idx: checked_index(s.planenum, planes.len(), "brush side plane"),
            })
            .collect::<Vec<_>>();
        let brushes = Self::load_brushes(lumps, &lumps.brushes, brush_sides.len());

        let leaf_brushes = lumps
            .leaf_brushes
            .iter()
            .map(|&b| checked_index(b, brushes.len(), "leaf brush"))
            .collect::<Vec<_>>();
        let leaf_faces = lumps
            .leaf_faces
            .iter()
            .map(|&f| checked_index(f, lumps.faces.len(), "leaf face"))
            .collect::<Vec<_>>();

        let leaves = Self::load_leafs(&lumps.leaves, &leaf_faces, &leaf_brushes, &brushes);

        let leaf_clusters = leaves
            .iter()
            .map(|l| if l.cluster >= 0 { (l.cluster + 1) as usize } else { 0 })
            .max()
            .unwrap_or(0);

        let vis = lumps.visibility.as_ref().map(Self::load_visibility);
        let num_clusters = match &vis {
            Some(v) => {
                if leaf_clusters > v.num_clusters {
                    com_dprintf(&format!(
                        "vis data covers {} clusters but leafs use {}\n",
                        v.num_clusters, leaf_clusters
                    ));
                }
                v.num_clusters.max(leaf_clusters)
            }
            None => leaf_clusters,
        };

        let world = Self {
            checksum: Self::world_checksum(&lumps.planes, lumps.visibility.as_ref()),
            planes,
            nodes,
            leaves,
            leaf_faces,
            leaf_brushes,
            brushes,
            brush_sides,
            vis,
            num_clusters,
            entity_string: lumps.entities.clone(),
        };
        world.check_tree();

        com_dprintf(&format!(
            "world: {} planes, {} nodes, {} leafs, {} brushes, {} clusters\n",
            world.planes.len(),
            world.nodes.len(),
            world.leaves.len(),
            world.brushes.len(),
            world.num_clusters
        ));
        world
    }

    // ============================================================
    // Lump conversion
    // ============================================================

    fn load_planes(dplanes: &[DPlane]) -> Vec<CPlane> {
        let convert = |p: &DPlane| CPlane::new(p.normal, p.dist);
        if dplanes.len() >= PARALLEL_LUMP_THRESHOLD {
            dplanes.par_iter().map(convert).collect()
        } else {
            dplanes.iter().map(convert).collect()
        }
    }

    fn load_nodes(dnodes: &[DNode], num_planes: usize, num_leaves: usize) -> Vec<CNode> {
        let num_nodes = dnodes.len();
        let convert = |n: &DNode| {
            let (mins, maxs) = int_bounds(&n.mins, &n.maxs);
            CNode {
                plane_idx: checked_index(n.planenum, num_planes, "node plane"),
                children: [
                    checked_child(n.children[0], num_nodes, num_leaves),
                    checked_child(n.children[1], num_nodes, num_leaves),
                ],
                mins,
                maxs,
            }
        };
        if num_nodes >= PARALLEL_LUMP_THRESHOLD {
            dnodes.par_iter().map(convert).collect()
        } else {
            dnodes.iter().map(convert).collect()
        }
    }

    fn load_brushes(lumps: &MapLumps, dbrushes: &[DBrush], total_sides: usize) -> Vec<CBrush> {
        let num_shaders = lumps.shaders.len();
        let convert = |b: &DBrush| {
            let (first_side, num_sides) =
                checked_range(b.first_side, b.num_sides, total_sides, "brush sides");
            let shader = checked_index(b.shader, num_shaders, "brush shader");
            CBrush {
                contents: lumps.shaders[shader].contents,
                first_side,
                num_sides,
            }
        };
        if dbrushes.len() >= PARALLEL_LUMP_THRESHOLD {
            dbrushes.par_iter().map(convert).collect()
        } else {
            dbrushes.iter().map(convert).collect()
        }
    }

    fn load_leafs(
        dleafs: &[DLeaf],
        leaf_faces: &[usize],
        leaf_brushes: &[usize],
        brushes: &[CBrush],
    ) -> Vec<CLeaf> {
        let convert = |l: &DLeaf| {
            let (first_leaf_face, num_leaf_faces) =
                checked_range(l.first_leaf_face, l.num_leaf_faces, leaf_faces.len(), "leaf faces");
            let (first_leaf_brush, num_leaf_brushes) = checked_range(
                l.first_leaf_brush,
                l.num_leaf_brushes,
                leaf_brushes.len(),
                "leaf brushes",
            );
            let contents = leaf_brushes[first_leaf_brush..first_leaf_brush + num_leaf_brushes]
                .iter()
                .fold(0, |acc, &b| acc | brushes[b].contents);
            let (mins, maxs) = int_bounds(&l.mins, &l.maxs);
            CLeaf {
                cluster: l.cluster,
                contents,
                mins,
                maxs,
                first_leaf_face,
                num_leaf_faces,
                first_leaf_brush,
                num_leaf_brushes,
            }
        };
        if dleafs.len() >= PARALLEL_LUMP_THRESHOLD {
            dleafs.par_iter().map(convert).collect()
        } else {
            dleafs.iter().map(convert).collect()
        }
    }

    fn load_visibility(dvis: &DVisData) -> VisData {
        if dvis.num_clusters < 0 || dvis.bytes_per_row < 0 {
            com_error(ERR_FATAL, "negative vis dimensions");
        }
        let num_clusters = dvis.num_clusters as usize;
        let bytes_per_row = dvis.bytes_per_row as usize;
        if bytes_per_row * 8 < num_clusters {
            com_error(
                ERR_FATAL,
                &format!("vis rows of {} bytes cannot hold {} clusters", bytes_per_row, num_clusters),
            );
        }
        if dvis.bits.len() < num_clusters * bytes_per_row {
            com_error(
                ERR_FATAL,
                &format!(
                    "vis data is {} bytes, {} clusters need {}",
                    dvis.bits.len(),
                    num_clusters,
                    num_clusters * bytes_per_row
                ),
            );
        }
        VisData {
            num_clusters,
            bytes_per_row,
            bits: dvis.bits.clone(),
        }
    }

    fn world_checksum(planes: &[DPlane], vis: Option<&DVisData>) -> u32 {
        let mut digest = CRC_CALC.digest();
        for p in planes {
            for v in p.normal {
                digest.update(&v.to_le_bytes());
            }
            digest.update(&p.dist.to_le_bytes());
        }
        if let Some(vis) = vis {
            digest.update(&vis.bits);
        }
        digest.finalize()
    }

    /// No node may be reached from the root along two paths. Nodes the root
    /// never reaches are left alone.
    fn check_tree(&self) {
        if self.nodes.is_empty() {
            return;
        }
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![0usize];
        while let Some(n) = stack.pop() {
            if seen[n] {
                com_error(ERR_FATAL, &format!("node {} reached twice, BSP is not a tree", n));
            }
            seen[n] = true;
            for child in self.nodes[n].children {
                if let ChildRef::Node(c) = child {
                    stack.push(c);
                }
            }
        }
    }

    // ============================================================
    // Accessors
    // ============================================================

    pub fn root(&self) -> ChildRef {
        if self.nodes.is_empty() {
            ChildRef::Leaf(0)
        } else {
            ChildRef::Node(0)
        }
    }

    pub fn checksum(&self) -> u32 {
        self.checksum
    }

    pub fn leaf_cluster(&self, leafnum: usize) -> i32 {
        self.leaves[leafnum].cluster
    }

    /// Face indices referenced by a leaf.
    pub fn leaf_face_list(&self, leafnum: usize) -> &[usize] {
        let leaf = &self.leaves[leafnum];
        &self.leaf_faces[leaf.first_leaf_face..leaf.first_leaf_face + leaf.num_leaf_faces]
    }

    fn leaf_brush_list(&self, leafnum: usize) -> &[usize] {
        let leaf = &self.leaves[leafnum];
        &self.leaf_brushes[leaf.first_leaf_brush..leaf.first_leaf_brush + leaf.num_leaf_brushes]
    }

    fn brush_side_list(&self, brush: &CBrush) -> &[CBrushSide] {
        &self.brush_sides[brush.first_side..brush.first_side + brush.num_sides]
    }

    // ============================================================
    // Point / leaf queries
    // ============================================================

    /// Walk from the root to the leaf containing `p`. Points exactly on a
    /// plane go to the front child.
    pub fn point_leafnum(&self, p: &Vec3) -> usize {
        let mut num = self.root();
        loop {
            match num {
                ChildRef::Leaf(leaf) => return leaf,
                ChildRef::Node(n) => {
                    let node = &self.nodes[n];
                    let d = self.planes[node.plane_idx].distance_to(p);
                    num = if d < 0.0 { node.children[1] } else { node.children[0] };
                }
            }
        }
    }

    /// Contents of every brush that contains `p`.
    pub fn point_contents(&self, p: &Vec3) -> i32 {
        let leafnum = self.point_leafnum(p);
        let mut contents = 0;
        for &b in self.leaf_brush_list(leafnum) {
            let brush = &self.brushes[b];
            let inside = self
                .brush_side_list(brush)
                .iter()
                .all(|side| self.planes[side.plane_idx].distance_to(p) <= 0.0);
            if inside {
                contents |= brush.contents;
            }
        }
        contents
    }

    // ============================================================
    // Box leaf enumeration
    // ============================================================

    fn box_leafnums_r(&self, mut num: ChildRef, mins: &Vec3, maxs: &Vec3, list: &mut Vec<usize>) {
        loop {
            let n = match num {
                ChildRef::Leaf(leaf) => {
                    list.push(leaf);
                    return;
                }
                ChildRef::Node(n) => n,
            };

            let node = &self.nodes[n];
            match box_on_plane_side(mins, maxs, &self.planes[node.plane_idx]) {
                1 => num = node.children[0],
                2 => num = node.children[1],
                _ => {
                    // go down both, front first
                    self.box_leafnums_r(node.children[0], mins, maxs, list);
                    num = node.children[1];
                }
            }
        }
    }

    /// Every leaf the box touches, front side first.
    pub fn box_leafnums(&self, mins: &Vec3, maxs: &Vec3) -> Vec<usize> {
        let mut list = Vec::new();
        self.box_leafnums_r(self.root(), mins, maxs, &mut list);
        list
    }

    // ============================================================
    // PVS
    // ============================================================

    /// PVS row for a cluster, or `None` if the cluster has no row.
    pub fn cluster_pvs(&self, cluster: i32) -> Option<&[u8]> {
        let vis = self.vis.as_ref()?;
        if cluster < 0 || cluster as usize >= vis.num_clusters {
            return None;
        }
        let start = cluster as usize * vis.bytes_per_row;
        Some(&vis.bits[start..start + vis.bytes_per_row])
    }

    /// Whether `test_cluster` may be seen from `view_cluster`. Rows are not
    /// symmetric; only the view cluster's row is consulted. Anything without
    /// a valid row or bit is treated as visible.
    pub fn cluster_visible(&self, view_cluster: i32, test_cluster: i32) -> bool {
        let Some(row) = self.cluster_pvs(view_cluster) else {
            return true;
        };
        if test_cluster < 0 || test_cluster as usize >= self.num_clusters.min(row.len() * 8) {
            return true;
        }
        let test = test_cluster as usize;
        row[test >> 3] & (1 << (test & 7)) != 0
    }

    // ============================================================
    // Box tracing
    // ============================================================
    // Brush tests run sequentially: the best fraction so far prunes the
    // rest of the walk and ties go to the first brush reached.
    // ============================================================

    fn clip_box_to_brush(&self, tw: &mut TraceWork, brush_idx: usize) {
        let brush = &self.brushes[brush_idx];
        if brush.num_sides == 0 {
            return;
        }

        let mut enterfrac: f32 = -1.0;
        let mut leavefrac: f32 = 1.0;
        let mut clipplane_idx: Option<usize> = None;

        let mut getout = false;
        let mut startout = false;

        for side in self.brush_side_list(brush) {
            let plane = &self.planes[side.plane_idx];

            // push the plane out by the box corner nearest to it
            let dist = if tw.ispoint {
                plane.dist
            } else {
                let mut ofs = [0.0f32; 3];
                for j in 0..3 {
                    ofs[j] = if plane.normal[j] < 0.0 { tw.maxs[j] } else { tw.mins[j] };
                }
                plane.dist - dot_product(&ofs, &plane.normal)
            };

            let d1 = dot_product(&tw.start, &plane.normal) - dist;
            let d2 = dot_product(&tw.end, &plane.normal) - dist;

            // never gets behind this side, so never inside the brush
            if d1 > 0.0 && (d2 >= DIST_EPSILON * 0.5 || d2 >= d1) {
                return;
            }

            if d2 > 0.0 {
                getout = true;
            }
            // within DIST_EPSILON of the surface is resting contact, not inside
            if d1 > -DIST_EPSILON {
                startout = true;
            }

            if d1 > d2 && d1 > -DIST_EPSILON {
                // entering
                let f = (d1 - DIST_EPSILON) / (d1 - d2);
                if f > enterfrac {
                    enterfrac = f;
                    clipplane_idx = Some(side.plane_idx);
                }
            } else if d2 > 0.0 && d2 > d1 {
                // leaving
                let f = (d1 + DIST_EPSILON) / (d1 - d2);
                if f < leavefrac {
                    leavefrac = f;
                }
            }
        }

        if !startout {
            tw.trace.startsolid = true;
            tw.trace.fraction = 0.0;
            if !getout {
                tw.trace.allsolid = true;
            }
            tw.trace.contents = brush.contents;
            return;
        }

        if enterfrac < leavefrac && enterfrac > -1.0 && enterfrac < tw.trace.fraction {
            tw.trace.fraction = enterfrac.max(0.0);
            if let Some(cp_idx) = clipplane_idx {
                tw.trace.plane = self.planes[cp_idx];
            }
            tw.trace.contents = brush.contents;
        }
    }

    fn test_box_in_brush(&self, tw: &mut TraceWork, brush_idx: usize) {
        let brush = &self.brushes[brush_idx];
        if brush.num_sides == 0 {
            return;
        }

        for side in self.brush_side_list(brush) {
            let plane = &self.planes[side.plane_idx];
            let mut ofs = [0.0f32; 3];
            for j in 0..3 {
                ofs[j] = if plane.normal[j] < 0.0 { tw.maxs[j] } else { tw.mins[j] };
            }
            let dist = plane.dist - dot_product(&ofs, &plane.normal);
            let d1 = dot_product(&tw.start, &plane.normal) - dist;

            if d1 > -DIST_EPSILON {
                return;
            }
        }

        tw.trace.startsolid = true;
        tw.trace.allsolid = true;
        tw.trace.fraction = 0.0;
        tw.trace.contents = brush.contents;
    }

    fn trace_to_leaf(&self, tw: &mut TraceWork, leafnum: usize) {
        if self.leaves[leafnum].contents & tw.contents == 0 {
            return;
        }
        for &brushnum in self.leaf_brush_list(leafnum) {
            if tw.mark_checked(brushnum) {
                continue;
            }
            if self.brushes[brushnum].contents & tw.contents == 0 {
                continue;
            }
            self.clip_box_to_brush(tw, brushnum);
            if tw.trace.fraction == 0.0 {
                return;
            }
        }
    }

    fn test_in_leaf(&self, tw: &mut TraceWork, leafnum: usize) {
        if self.leaves[leafnum].contents & tw.contents == 0 {
            return;
        }
        for &brushnum in self.leaf_brush_list(leafnum) {
            if tw.mark_checked(brushnum) {
                continue;
            }
            if self.brushes[brushnum].contents & tw.contents == 0 {
                continue;
            }
            self.test_box_in_brush(tw, brushnum);
            if tw.trace.allsolid {
                return;
            }
        }
    }

    fn recursive_hull_check(
        &self,
        tw: &mut TraceWork,
        num: ChildRef,
        p1f: f32,
        p2f: f32,
        p1: &Vec3,
        p2: &Vec3,
    ) {
        if tw.trace.fraction <= p1f {
            return; // already hit something nearer
        }

        let n = match num {
            ChildRef::Leaf(leafnum) => {
                self.trace_to_leaf(tw, leafnum);
                return;
            }
            ChildRef::Node(n) => n,
        };

        let node = &self.nodes[n];
        let plane = &self.planes[node.plane_idx];

        let (t1, t2, offset);
        if (plane.plane_type as usize) < 3 {
            let pt = plane.plane_type as usize;
            t1 = p1[pt] - plane.dist;
            t2 = p2[pt] - plane.dist;
            offset = tw.extents[pt];
        } else {
            t1 = dot_product(&plane.normal, p1) - plane.dist;
            t2 = dot_product(&plane.normal, p2) - plane.dist;
            offset = if tw.ispoint {
                0.0
            } else {
                (tw.extents[0] * plane.normal[0]).abs()
                    + (tw.extents[1] * plane.normal[1]).abs()
                    + (tw.extents[2] * plane.normal[2]).abs()
            };
        }

        // see which sides we need to consider
        if t1 >= offset && t2 >= offset {
            self.recursive_hull_check(tw, node.children[0], p1f, p2f, p1, p2);
            return;
        }
        if t1 < -offset && t2 < -offset {
            self.recursive_hull_check(tw, node.children[1], p1f, p2f, p1, p2);
            return;
        }

        // put the crosspoint DIST_EPSILON pixels on the near side
        let (side, frac, frac2);
        if t1 < t2 {
            let idist = 1.0 / (t1 - t2);
            side = 1usize;
            frac = ((t1 - offset + DIST_EPSILON) * idist).clamp(0.0, 1.0);
            frac2 = ((t1 + offset + DIST_EPSILON) * idist).clamp(0.0, 1.0);
        } else if t1 > t2 {
            let idist = 1.0 / (t1 - t2);
            side = 0usize;
            frac = ((t1 + offset + DIST_EPSILON) * idist).clamp(0.0, 1.0);
            frac2 = ((t1 - offset - DIST_EPSILON) * idist).clamp(0.0, 1.0);
        } else {
            side = 0;
            frac = 1.0;
            frac2 = 0.0;
        }

        // move up to the node
        let midf = p1f + (p2f - p1f) * frac;
        let mid: Vec3 = [
            p1[0] + frac * (p2[0] - p1[0]),
            p1[1] + frac * (p2[1] - p1[1]),
            p1[2] + frac * (p2[2] - p1[2]),
        ];
        self.recursive_hull_check(tw, node.children[side], p1f, midf, p1, &mid);

        // go past the node
        let midf2 = p1f + (p2f - p1f) * frac2;
        let mid2: Vec3 = [
            p1[0] + frac2 * (p2[0] - p1[0]),
            p1[1] + frac2 * (p2[1] - p1[1]),
            p1[2] + frac2 * (p2[2] - p1[2]),
        ];
        self.recursive_hull_check(tw, node.children[side ^ 1], midf2, p2f, &mid2, p2);
    }

    /// Sweep the box `mins..maxs` from `start` to `end` against every brush
    /// whose contents intersect `brushmask`.
    ///
    /// - No hit: `fraction == 1.0`, `endpos == end`.
    /// - Starting inside a brush: `startsolid`, `fraction == 0.0`,
    ///   `endpos == start`; `allsolid` too if the end is also inside.
    /// - `start == end` is a position test that never reports a plane.
    pub fn box_trace(&self, start: &Vec3, end: &Vec3, mins: &Vec3, maxs: &Vec3, brushmask: i32) -> Trace {
        let mut tw = TraceWork::new(start, end, mins, maxs, brushmask, self.brushes.len());

        // position test special case
        if vector_compare(start, end) {
            let c1 = [
                start[0] + mins[0] - 1.0,
                start[1] + mins[1] - 1.0,
                start[2] + mins[2] - 1.0,
            ];
            let c2 = [
                start[0] + maxs[0] + 1.0,
                start[1] + maxs[1] + 1.0,
                start[2] + maxs[2] + 1.0,
            ];
            for leafnum in self.box_leafnums(&c1, &c2) {
                self.test_in_leaf(&mut tw, leafnum);
                if tw.trace.allsolid {
                    break;
                }
            }
            tw.trace.endpos = *start;
            return tw.trace;
        }

        self.recursive_hull_check(&mut tw, self.root(), 0.0, 1.0, start, end);

        if tw.trace.fraction == 1.0 {
            tw.trace.endpos = *end;
        } else {
            for i in 0..3 {
                tw.trace.endpos[i] = start[i] + tw.trace.fraction * (end[i] - start[i]);
            }
        }
        tw.trace
    }
}

impl PmoveCallbacks for BspWorld {
    fn trace(&self, start: &Vec3, mins: &Vec3, maxs: &Vec3, end: &Vec3) -> Trace {
        self.box_trace(start, end, mins, maxs, MASK_PLAYERSOLID)
    }

    fn pointcontents(&self, point: &Vec3) -> i32 {
        self.point_contents(point)
    }
}

// ============================================================
// Tests
// ============================================================
