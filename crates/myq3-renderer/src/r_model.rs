// r_model.rs — World model: render face table and tessellated patches

use std::sync::Arc;

use rayon::prelude::*;

use myq3_common::cmodel::BspWorld;
use myq3_common::common::{com_dprintf, com_error, com_printf};
use myq3_common::cvar::{cvar_get, cvar_get_latched_vars, cvar_variable_value, CVAR_ARCHIVE, CVAR_LATCH};
use myq3_common::q_shared::{add_point_to_bounds, clear_bounds, Vec3, ERR_DROP};
use myq3_common::qfiles::{DFace, DVertex, FaceType, MapLumps};

use crate::r_patch::{create_patch, Patch, DEFAULT_TESSELLATION};

const PARALLEL_PATCH_THRESHOLD: usize = 64;

/// Drawable view of one map face. `index` points into the patch table for
/// patches and into the face array for everything else.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderFace {
    pub kind: FaceType,
    pub index: usize,
    /// World-space bounds; `None` for faces without geometry, which are never culled.
    pub bounds: Option<(Vec3, Vec3)>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MapStats {
    pub total_vertices: usize,
    pub total_faces: usize,
    pub total_patches: usize,
    pub rejected_patches: usize,
    pub rejected_faces: usize,
    pub patch_vertices: usize,
    pub patch_indices: usize,
}

/// Renderer side of a loaded map. Shares the collision world for its tree
/// and PVS.
pub struct RWorldModel {
    pub world: Arc<BspWorld>,
    pub faces: Vec<DFace>,
    pub vertices: Vec<DVertex>,
    pub indices: Vec<i32>,
    pub render_faces: Vec<Option<RenderFace>>,
    pub patches: Vec<Patch>,
    pub tessellation: u32,
    pub stats: MapStats,
}

/// Bounds of a planar, mesh or billboard face.
fn face_bounds(face: &DFace, vertices: &[DVertex]) -> Result<Option<(Vec3, Vec3)>, String> {
    if face.first_vertex < 0
        || face.num_vertices < 0
        || face.first_vertex as usize + face.num_vertices as usize > vertices.len()
    {
        return Err(format!(
            "vertices {}+{} out of range (0..{})",
            face.first_vertex,
            face.num_vertices,
            vertices.len()
        ));
    }
    if face.num_vertices == 0 {
        return Ok(None);
    }

    let first = face.first_vertex as usize;
    let mut mins = [0.0f32; 3];
    let mut maxs = [0.0f32; 3];
    clear_bounds(&mut mins, &mut maxs);
    for v in &vertices[first..first + face.num_vertices as usize] {
        add_point_to_bounds(&v.position, &mut mins, &mut maxs);
    }
    Ok(Some((mins, maxs)))
}

impl RWorldModel {
    pub fn new(lumps: &MapLumps, world: Arc<BspWorld>, tessellation: u32) -> Self {
        let level = tessellation.max(1);

        if let Some(&bad) = world.leaf_faces.iter().find(|&&f| f >= lumps.faces.len()) {
            com_error(
                ERR_DROP,
                &format!("world references face {} but the map has {}", bad, lumps.faces.len()),
            );
        }

        // tessellate every patch face up front, keeping face order
        let patch_faces = lumps
            .faces
            .iter()
            .enumerate()
            .filter(|(_, f)| FaceType::from_raw(f.face_type) == Some(FaceType::Patch))
            .collect::<Vec<_>>();
        let build = |&(i, face): &(usize, &DFace)| create_patch(i, face, &lumps.vertices, level);
        let built: Vec<Result<Patch, String>> = if patch_faces.len() >= PARALLEL_PATCH_THRESHOLD {
            patch_faces.par_iter().map(build).collect()
        } else {
            patch_faces.iter().map(build).collect()
        };
        let mut built = built.into_iter();

        let mut stats = MapStats {
            total_vertices: lumps.vertices.len(),
            total_faces: lumps.faces.len(),
            ..MapStats::default()
        };
        let mut patches = Vec::new();
        let mut render_faces = Vec::with_capacity(lumps.faces.len());

        for (i, face) in lumps.faces.iter().enumerate() {
            let render_face = match FaceType::from_raw(face.face_type) {
                Some(FaceType::Patch) => match built.next() {
                    Some(Ok(patch)) => {
                        stats.patch_vertices += patch.num_vertices();
                        stats.patch_indices += patch.num_indices();
                        let rf = RenderFace {
                            kind: FaceType::Patch,
                            index: patches.len(),
                            bounds: Some((patch.mins, patch.maxs)),
                        };
                        patches.push(patch);
                        Some(rf)
                    }
                    Some(Err(e)) => {
                        com_printf(&format!("WARNING: skipping patch face {}: {}\n", i, e));
                        stats.rejected_patches += 1;
                        None
                    }
                    None => None,
                },
                Some(kind) => match face_bounds(face, &lumps.vertices) {
                    Ok(bounds) => Some(RenderFace {
                        kind,
                        index: i,
                        bounds,
                    }),
                    Err(e) => {
                        com_printf(&format!("WARNING: skipping face {}: {}\n", i, e));
                        stats.rejected_faces += 1;
                        None
                    }
                },
                None => {
                    com_dprintf(&format!("face {}: unknown type {}\n", i, face.face_type));
                    stats.rejected_faces += 1;
                    None
                }
            };
            render_faces.push(render_face);
        }
        stats.total_patches = patches.len();

        com_dprintf(&format!(
            "world model: {} faces, {} patches ({} rejected), {} patch vertices\n",
            stats.total_faces, stats.total_patches, stats.rejected_patches, stats.patch_vertices
        ));

        Self {
            world,
            faces: lumps.faces.clone(),
            vertices: lumps.vertices.clone(),
            indices: lumps.indices.clone(),
            render_faces,
            patches,
            tessellation: level,
            stats,
        }
    }
}

/// Register the renderer cvars.
pub fn r_register() {
    cvar_get("r_subdivisions", &DEFAULT_TESSELLATION.to_string(), CVAR_ARCHIVE | CVAR_LATCH);
    cvar_get("r_novis", "0", 0);
    cvar_get("r_nocull", "0", 0);
}

/// Build the world model at the current `r_subdivisions` level, applying any
/// latched change first.
pub fn r_load_world(lumps: &MapLumps, world: Arc<BspWorld>) -> RWorldModel {
    r_register();
    cvar_get_latched_vars();
    let level = cvar_variable_value("r_subdivisions").max(1.0) as u32;
    RWorldModel::new(lumps, world, level)
}
