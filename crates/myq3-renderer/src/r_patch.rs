// r_patch.rs — Bezier patch tessellation

use bytemuck::{Pod, Zeroable};

use myq3_common::q_shared::{add_point_to_bounds, clear_bounds, vector_normalize, Vec3};
use myq3_common::qfiles::{DFace, DVertex};

pub const DEFAULT_TESSELLATION: u32 = 10;

/// Vertex layout shared by tessellated patches and uploaded as-is.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PatchVertex {
    pub position: [f32; 3],
    pub tex_coord: [f32; 2],
    pub lm_coord: [f32; 2],
    pub normal: [f32; 3],
    pub color: [f32; 4],
}

impl From<&DVertex> for PatchVertex {
    fn from(v: &DVertex) -> Self {
        Self {
            position: v.position,
            tex_coord: v.tex_coord,
            lm_coord: v.lm_coord,
            normal: v.normal,
            color: v.color.map(|c| c as f32 / 255.0),
        }
    }
}

/// One 3x3 control window and its tessellated surface.
#[derive(Clone, Debug)]
pub struct QuadraticPatch {
    pub control: [PatchVertex; 9],
    pub vertices: Vec<PatchVertex>,
    pub indices: Vec<u32>,
}

/// A patch face: its control grid split into quadratic sub-patches, ordered
/// `y * num_x + x`.
#[derive(Clone, Debug)]
pub struct Patch {
    pub face: usize,
    pub width: usize,
    pub height: usize,
    pub shader: i32,
    pub lm_index: i32,
    pub mins: Vec3,
    pub maxs: Vec3,
    pub quadratic: Vec<QuadraticPatch>,
}

impl Patch {
    pub fn num_vertices(&self) -> usize {
        self.quadratic.iter().map(|q| q.vertices.len()).sum()
    }

    pub fn num_indices(&self) -> usize {
        self.quadratic.iter().map(|q| q.indices.len()).sum()
    }
}

/// Row-major position of a control point in a `width` wide grid.
#[inline]
pub fn control_point_index(width: usize, row: usize, col: usize) -> usize {
    row * width + col
}

#[inline]
fn bernstein(t: f32) -> [f32; 3] {
    let it = 1.0 - t;
    [it * it, 2.0 * t * it, t * t]
}

fn blend(control: &[PatchVertex; 9], bu: &[f32; 3], bv: &[f32; 3]) -> PatchVertex {
    let mut out = PatchVertex::default();
    for r in 0..3 {
        for c in 0..3 {
            let w = bv[r] * bu[c];
            let cp = &control[r * 3 + c];
            for k in 0..3 {
                out.position[k] += cp.position[k] * w;
                out.normal[k] += cp.normal[k] * w;
            }
            for k in 0..2 {
                out.tex_coord[k] += cp.tex_coord[k] * w;
                out.lm_coord[k] += cp.lm_coord[k] * w;
            }
            for k in 0..4 {
                out.color[k] += cp.color[k] * w;
            }
        }
    }
    vector_normalize(&mut out.normal);
    out
}

/// Evaluate a quadratic Bezier patch on a `(level+1)²` grid and triangulate
/// it. Control points are row-major with rows along v and columns along u.
/// Triangles wind counter-clockwise in (u, v). A level of 0 is treated as 1.
pub fn tessellate(control: &[PatchVertex; 9], level: u32) -> (Vec<PatchVertex>, Vec<u32>) {
    let level = level.max(1) as usize;
    let l1 = level + 1;

    let mut vertices = Vec::with_capacity(l1 * l1);
    for i in 0..=level {
        let bv = bernstein(i as f32 / level as f32);
        for j in 0..=level {
            let bu = bernstein(j as f32 / level as f32);
            vertices.push(blend(control, &bu, &bv));
        }
    }

    let mut indices = Vec::with_capacity(level * level * 6);
    for i in 0..level {
        for j in 0..level {
            let v0 = (i * l1 + j) as u32;
            let v1 = v0 + 1;
            let v2 = v0 + l1 as u32;
            let v3 = v2 + 1;
            indices.extend_from_slice(&[v0, v1, v3, v0, v3, v2]);
        }
    }

    (vertices, indices)
}

/// Build and tessellate the patch for one map face. Grids must be at least
/// 3x3 with odd dimensions and lie inside the vertex lump.
pub fn create_patch(face_idx: usize, face: &DFace, vertices: &[DVertex], level: u32) -> Result<Patch, String> {
    let [w, h] = face.size;
    if w < 3 || h < 3 || w % 2 == 0 || h % 2 == 0 {
        return Err(format!("bad patch size {}x{}", w, h));
    }
    let (width, height) = (w as usize, h as usize);

    if face.first_vertex < 0 || face.num_vertices < 0 || ((face.num_vertices as usize) < width * height) {
        return Err(format!(
            "patch grid {}x{} does not fit {} vertices",
            width, height, face.num_vertices
        ));
    }
    let first = face.first_vertex as usize;
    if first + width * height > vertices.len() {
        return Err(format!(
            "patch vertices {}..{} out of range (0..{})",
            first,
            first + width * height,
            vertices.len()
        ));
    }
    let grid = &vertices[first..first + width * height];

    let mut mins = [0.0f32; 3];
    let mut maxs = [0.0f32; 3];
    clear_bounds(&mut mins, &mut maxs);
    for v in grid {
        add_point_to_bounds(&v.position, &mut mins, &mut maxs);
    }

    let num_x = (width - 1) / 2;
    let num_y = (height - 1) / 2;
    let mut quadratic = Vec::with_capacity(num_x * num_y);
    for y in 0..num_y {
        for x in 0..num_x {
            let mut control = [PatchVertex::default(); 9];
            for r in 0..3 {
                for c in 0..3 {
                    control[r * 3 + c] = PatchVertex::from(&grid[control_point_index(width, 2 * y + r, 2 * x + c)]);
                }
            }
            let (vertices, indices) = tessellate(&control, level);
            quadratic.push(QuadraticPatch {
                control,
                vertices,
                indices,
            });
        }
    }

    Ok(Patch {
        face: face_idx,
        width,
        height,
        shader: face.shader,
        lm_index: face.lm_index,
        mins,
        maxs,
        quadratic,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use myq3_common::q_shared::{cross_product, dot_product, vector_subtract};
    use myq3_common::qfiles::MST_PATCH;

    /// Grid whose position is (col, row, f(col, row)) and whose texture
    /// coordinate is the (u, v) of the control point.
    fn grid(width: usize, height: usize, z: impl Fn(f32, f32) -> f32) -> Vec<DVertex> {
        let mut out = Vec::new();
        for row in 0..height {
            for col in 0..width {
                let (x, y) = (col as f32 * 8.0, row as f32 * 8.0);
                out.push(DVertex {
                    position: [x, y, z(x, y)],
                    tex_coord: [col as f32 / 2.0, row as f32 / 2.0],
                    normal: [0.0, 0.0, 1.0],
                    color: [255, 128, 0, 255],
                    ..DVertex::default()
                });
            }
        }
        out
    }

    fn control_from(verts: &[DVertex]) -> [PatchVertex; 9] {
        let mut control = [PatchVertex::default(); 9];
        for (dst, src) in control.iter_mut().zip(verts) {
            *dst = PatchVertex::from(src);
        }
        control
    }

    fn patch_face(width: i32, height: i32) -> DFace {
        DFace {
            face_type: MST_PATCH,
            first_vertex: 0,
            num_vertices: width * height,
            size: [width, height],
            ..DFace::default()
        }
    }

    #[test]
    fn test_control_point_index() {
        assert_eq!(control_point_index(3, 0, 0), 0);
        assert_eq!(control_point_index(3, 2, 2), 8);
        assert_eq!(control_point_index(5, 1, 4), 9);
        assert_eq!(control_point_index(5, 2, 2), 12);
    }

    #[test]
    fn test_output_counts() {
        let control = control_from(&grid(3, 3, |_, _| 0.0));
        for level in 1..=12u32 {
            let (verts, indices) = tessellate(&control, level);
            let l = level as usize;
            assert_eq!(verts.len(), (l + 1) * (l + 1), "vertex count at level {}", level);
            assert_eq!(indices.len(), l * l * 6, "index count at level {}", level);
            assert!(indices.iter().all(|&i| (i as usize) < verts.len()));
        }
    }

    #[test]
    fn test_level_zero_is_level_one() {
        let control = control_from(&grid(3, 3, |_, _| 0.0));
        assert_eq!(tessellate(&control, 0), tessellate(&control, 1));
    }

    #[test]
    fn test_deterministic_bytes() {
        let control = control_from(&grid(3, 3, |x, y| (x * 0.37).sin() * 10.0 + y * 0.5));
        let (va, ia) = tessellate(&control, DEFAULT_TESSELLATION);
        let (vb, ib) = tessellate(&control, DEFAULT_TESSELLATION);
        let bytes_a: &[u8] = bytemuck::cast_slice(&va);
        let bytes_b: &[u8] = bytemuck::cast_slice(&vb);
        assert_eq!(bytes_a, bytes_b);
        assert_eq!(bytemuck::cast_slice::<u32, u8>(&ia), bytemuck::cast_slice::<u32, u8>(&ib));
    }

    #[test]
    fn test_corners_hit_control_points() {
        let control = control_from(&grid(3, 3, |x, y| x * y * 0.1));
        let level = 7usize;
        let (verts, _) = tessellate(&control, level as u32);
        let l1 = level + 1;
        assert_eq!(verts[0].position, control[0].position);
        assert_eq!(verts[level].position, control[2].position);
        assert_eq!(verts[level * l1].position, control[6].position);
        assert_eq!(verts[l1 * l1 - 1].position, control[8].position);
    }

    #[test]
    fn test_flat_grid_stays_on_plane() {
        let control = control_from(&grid(3, 3, |_, _| 0.0));
        for level in [1u32, 3, 10] {
            let (verts, _) = tessellate(&control, level);
            assert!(verts.iter().all(|v| v.position[2] == 0.0), "level {}", level);
            assert!(verts.iter().all(|v| (v.normal[2] - 1.0).abs() < 1e-6 && v.normal[0] == 0.0));
        }
    }

    #[test]
    fn test_tilted_grid_stays_on_plane() {
        // z = 0.5x - 0.25y + 3
        let control = control_from(&grid(3, 3, |x, y| 0.5 * x - 0.25 * y + 3.0));
        for level in [2u32, 5, 10] {
            let (verts, _) = tessellate(&control, level);
            for v in &verts {
                let p = v.position;
                let expected = 0.5 * p[0] - 0.25 * p[1] + 3.0;
                assert!((p[2] - expected).abs() < 1e-4, "{:?} off the plane at level {}", p, level);
            }
        }
    }

    #[test]
    fn test_counter_clockwise_in_uv() {
        let control = control_from(&grid(3, 3, |x, _| x * 0.2));
        let (verts, indices) = tessellate(&control, 4);
        for tri in indices.chunks(3) {
            let a = verts[tri[0] as usize].tex_coord;
            let b = verts[tri[1] as usize].tex_coord;
            let c = verts[tri[2] as usize].tex_coord;
            let area = (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0]);
            assert!(area > 0.0, "triangle {:?} is not counter-clockwise", tri);
        }
    }

    #[test]
    fn test_flat_grid_faces_up() {
        // positions map u -> +x and v -> +y, so counter-clockwise faces +z
        let control = control_from(&grid(3, 3, |_, _| 0.0));
        let (verts, indices) = tessellate(&control, 2);
        let tri = &indices[0..3];
        let a = verts[tri[0] as usize].position;
        let b = verts[tri[1] as usize].position;
        let c = verts[tri[2] as usize].position;
        let n = cross_product(&vector_subtract(&b, &a), &vector_subtract(&c, &a));
        assert!(dot_product(&n, &[0.0, 0.0, 1.0]) > 0.0);
    }

    #[test]
    fn test_color_interpolated_in_unit_range() {
        let control = control_from(&grid(3, 3, |_, _| 0.0));
        let (verts, _) = tessellate(&control, 3);
        for v in &verts {
            assert!((v.color[0] - 1.0).abs() < 1e-6);
            assert!((v.color[1] - 128.0 / 255.0).abs() < 1e-6);
            assert_eq!(v.color[2], 0.0);
        }
    }

    #[test]
    fn test_create_patch_splits_grid() {
        let verts = grid(5, 3, |_, _| 0.0);
        let patch = create_patch(4, &patch_face(5, 3), &verts, 2).unwrap();
        assert_eq!(patch.face, 4);
        assert_eq!(patch.quadratic.len(), 2);
        // second window starts two columns in
        assert_eq!(patch.quadratic[1].control[0].position, verts[2].position);
        assert_eq!(patch.quadratic[1].control[8].position, verts[control_point_index(5, 2, 4)].position);
        assert_eq!(patch.num_vertices(), 2 * 9);
        assert_eq!(patch.num_indices(), 2 * 24);
        assert_eq!(patch.mins, [0.0, 0.0, 0.0]);
        assert_eq!(patch.maxs, [32.0, 16.0, 0.0]);
    }

    #[test]
    fn test_create_patch_order_is_row_major() {
        let verts = grid(5, 5, |_, _| 0.0);
        let patch = create_patch(0, &patch_face(5, 5), &verts, 1).unwrap();
        assert_eq!(patch.quadratic.len(), 4);
        // sub-patch (x=1, y=0) is index 1, (x=0, y=1) is index 2
        assert_eq!(patch.quadratic[1].control[0].position, verts[control_point_index(5, 0, 2)].position);
        assert_eq!(patch.quadratic[2].control[0].position, verts[control_point_index(5, 2, 0)].position);
    }

    #[test]
    fn test_create_patch_rejects_bad_grids() {
        let verts = grid(5, 5, |_, _| 0.0);
        assert!(create_patch(0, &patch_face(4, 3), &verts, 2).is_err(), "even width");
        assert!(create_patch(0, &patch_face(3, 2), &verts, 2).is_err(), "even height");
        assert!(create_patch(0, &patch_face(1, 3), &verts, 2).is_err(), "too narrow");

        let mut face = patch_face(3, 3);
        face.first_vertex = 20;
        assert!(create_patch(0, &face, &verts, 2).is_err(), "past the vertex lump");

        let mut face = patch_face(3, 3);
        face.num_vertices = 4;
        assert!(create_patch(0, &face, &verts, 2).is_err(), "grid larger than the face");
    }
}
