// qfiles.rs — Map lump structures handed over by the map loader
//
// The binary container is parsed elsewhere; these are the already-typed
// lump arrays the world and renderer are built from. Indices are kept in
// their on-disk signed form and validated once when the world is built.

use crate::q_shared::Vec3;

// ============================================================
// Face types
// ============================================================

pub const MST_BAD: i32 = 0;
pub const MST_PLANAR: i32 = 1;
pub const MST_PATCH: i32 = 2;
pub const MST_TRIANGLE_SOUP: i32 = 3;
pub const MST_FLARE: i32 = 4;

/// Drawable face kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaceType {
    Planar,
    Patch,
    Mesh,
    Billboard,
}

impl FaceType {
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            MST_PLANAR => Some(FaceType::Planar),
            MST_PATCH => Some(FaceType::Patch),
            MST_TRIANGLE_SOUP => Some(FaceType::Mesh),
            MST_FLARE => Some(FaceType::Billboard),
            _ => None,
        }
    }
}

// ============================================================
// Lumps
// ============================================================

#[derive(Debug, Clone, Default)]
pub struct DShader {
    pub name: String,
    pub surface_flags: i32,
    pub contents: i32,
}

#[derive(Debug, Clone, Copy, Default)]
#[repr(C)]
pub struct DPlane {
    pub normal: Vec3,
    pub dist: f32,
}

/// Negative children are `-1 - leafnum`.
#[derive(Debug, Clone, Copy, Default)]
#[repr(C)]
pub struct DNode {
    pub planenum: i32,
    pub children: [i32; 2],
    pub mins: [i32; 3],
    pub maxs: [i32; 3],
}

#[derive(Debug, Clone, Copy, Default)]
#[repr(C)]
pub struct DLeaf {
    pub cluster: i32,
    pub area: i32,
    pub mins: [i32; 3],
    pub maxs: [i32; 3],
    pub first_leaf_face: i32,
    pub num_leaf_faces: i32,
    pub first_leaf_brush: i32,
    pub num_leaf_brushes: i32,
}

#[derive(Debug, Clone, Copy, Default)]
#[repr(C)]
pub struct DBrush {
    pub first_side: i32,
    pub num_sides: i32,
    pub shader: i32,
}

#[derive(Debug, Clone, Copy, Default)]
#[repr(C)]
pub struct DBrushSide {
    pub planenum: i32,
    pub shader: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[repr(C)]
pub struct DVertex {
    pub position: Vec3,
    pub tex_coord: [f32; 2],
    pub lm_coord: [f32; 2],
    pub normal: Vec3,
    pub color: [u8; 4],
}

/// For patches `size` is the control grid width and height and the
/// vertex range holds the grid row by row. For planar and mesh faces the
/// index range holds offsets relative to `first_vertex`.
#[derive(Debug, Clone, Copy, Default)]
#[repr(C)]
pub struct DFace {
    pub shader: i32,
    pub fog: i32,
    pub face_type: i32,
    pub first_vertex: i32,
    pub num_vertices: i32,
    pub first_index: i32,
    pub num_indices: i32,
    pub lm_index: i32,
    pub size: [i32; 2],
}

/// Uncompressed PVS: one row of `bytes_per_row` bytes per cluster,
/// bit `b` of row `a` set when cluster `b` is potentially visible from `a`.
#[derive(Debug, Clone, Default)]
pub struct DVisData {
    pub num_clusters: i32,
    pub bytes_per_row: i32,
    pub bits: Vec<u8>,
}

/// Everything the loader produces for one map.
#[derive(Debug, Clone, Default)]
pub struct MapLumps {
    pub entities: String,
    pub shaders: Vec<DShader>,
    pub planes: Vec<DPlane>,
    pub nodes: Vec<DNode>,
    pub leaves: Vec<DLeaf>,
    pub leaf_faces: Vec<i32>,
    pub leaf_brushes: Vec<i32>,
    pub brushes: Vec<DBrush>,
    pub brush_sides: Vec<DBrushSide>,
    pub vertices: Vec<DVertex>,
    pub indices: Vec<i32>,
    pub faces: Vec<DFace>,
    pub visibility: Option<DVisData>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_face_type_from_raw() {
        assert_eq!(FaceType::from_raw(MST_PLANAR), Some(FaceType::Planar));
        assert_eq!(FaceType::from_raw(MST_PATCH), Some(FaceType::Patch));
        assert_eq!(FaceType::from_raw(MST_TRIANGLE_SOUP), Some(FaceType::Mesh));
        assert_eq!(FaceType::from_raw(MST_FLARE), Some(FaceType::Billboard));
        assert_eq!(FaceType::from_raw(MST_BAD), None);
        assert_eq!(FaceType::from_raw(17), None);
    }
}
