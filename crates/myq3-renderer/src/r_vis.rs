// r_vis.rs — Per-frame visible face set: PVS walk and frustum culling

use myq3_common::cvar::cvar_variable_value;
use myq3_common::q_shared::{
    angle_vectors, box_on_plane_side, dot_product, rotate_point_around_vector, signbits_for_plane,
    CPlane, Vec3, PLANE_ANYZ,
};
use myq3_common::qfiles::FaceType;

use crate::r_model::RWorldModel;

// ============================================================
// Frustum
// ============================================================

/// Four side planes of a view frustum, normals pointing inward.
#[derive(Debug, Clone, Copy)]
pub struct Frustum {
    pub planes: [CPlane; 4],
}

impl Frustum {
    pub fn from_view(origin: &Vec3, angles: &Vec3, fov_x: f32, fov_y: f32) -> Self {
        let mut vpn = [0.0f32; 3];
        let mut vright = [0.0f32; 3];
        let mut vup = [0.0f32; 3];
        angle_vectors(angles, Some(&mut vpn), Some(&mut vright), Some(&mut vup));

        let mut planes = [CPlane::default(); 4];
        // rotate VPN right by FOV_X/2 degrees
        rotate_point_around_vector(&mut planes[0].normal, &vup, &vpn, -(90.0 - fov_x / 2.0));
        // rotate VPN left by FOV_X/2 degrees
        rotate_point_around_vector(&mut planes[1].normal, &vup, &vpn, 90.0 - fov_x / 2.0);
        // rotate VPN up by FOV_Y/2 degrees
        rotate_point_around_vector(&mut planes[2].normal, &vright, &vpn, 90.0 - fov_y / 2.0);
        // rotate VPN down by FOV_Y/2 degrees
        rotate_point_around_vector(&mut planes[3].normal, &vright, &vpn, -(90.0 - fov_y / 2.0));

        for plane in &mut planes {
            plane.plane_type = PLANE_ANYZ;
            plane.dist = dot_product(origin, &plane.normal);
            plane.signbits = signbits_for_plane(plane);
        }
        Self { planes }
    }

    /// True if the box is completely outside the frustum.
    pub fn cull_box(&self, mins: &Vec3, maxs: &Vec3) -> bool {
        self.planes
            .iter()
            .any(|plane| box_on_plane_side(mins, maxs, plane) == 2)
    }
}

// ============================================================
// Visible set
// ============================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisOptions {
    /// Ignore the PVS and treat every leaf as visible.
    pub novis: bool,
    /// Skip frustum culling.
    pub nocull: bool,
}

impl VisOptions {
    pub fn from_cvars() -> Self {
        Self {
            novis: cvar_variable_value("r_novis") != 0.0,
            nocull: cvar_variable_value("r_nocull") != 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisStats {
    pub view_leaf: usize,
    pub view_cluster: i32,
    pub visible_leaves: usize,
    pub visible_faces: usize,
    pub visible_patches: usize,
    pub culled_faces: usize,
}

/// Per-frame visible face list. Faces are marked with the frame number
/// instead of clearing a flag array every frame.
pub struct VisibleSetCalculator {
    face_visframe: Vec<u32>,
    framecount: u32,
    visible: Vec<usize>,
    pub options: VisOptions,
    pub stats: VisStats,
}

impl VisibleSetCalculator {
    pub fn new(model: &RWorldModel) -> Self {
        Self {
            face_visframe: vec![0; model.render_faces.len()],
            framecount: 0,
            visible: Vec::new(),
            options: VisOptions::default(),
            stats: VisStats::default(),
        }
    }

    /// Faces potentially visible from `camera`, in first-discovered order.
    /// Faces whose bounds lie outside `frustum` are dropped.
    pub fn compute(&mut self, model: &RWorldModel, camera: &Vec3, frustum: Option<&Frustum>) -> &[usize] {
        let world = &model.world;

        if self.face_visframe.len() != model.render_faces.len() {
            self.face_visframe = vec![0; model.render_faces.len()];
            self.framecount = 0;
        }
        self.framecount = self.framecount.wrapping_add(1);
        if self.framecount == 0 {
            self.face_visframe.fill(0);
            self.framecount = 1;
        }

        self.visible.clear();
        let view_leaf = world.point_leafnum(camera);
        let mut stats = VisStats {
            view_leaf,
            view_cluster: world.leaf_cluster(view_leaf),
            ..VisStats::default()
        };
        let frustum = if self.options.nocull { None } else { frustum };

        for leafnum in 0..world.leaves.len() {
            if !self.options.novis && !world.cluster_visible(stats.view_cluster, world.leaf_cluster(leafnum)) {
                continue;
            }
            stats.visible_leaves += 1;

            for &face in world.leaf_face_list(leafnum) {
                match self.face_visframe.get_mut(face) {
                    Some(mark) if *mark != self.framecount => *mark = self.framecount,
                    _ => continue,
                }
                let Some(rf) = &model.render_faces[face] else {
                    continue;
                };
                if let (Some(frustum), Some((mins, maxs))) = (frustum, &rf.bounds) {
                    if frustum.cull_box(mins, maxs) {
                        stats.culled_faces += 1;
                        continue;
                    }
                }
                if rf.kind == FaceType::Patch {
                    stats.visible_patches += 1;
                }
                self.visible.push(face);
            }
        }

        stats.visible_faces = self.visible.len();
        self.stats = stats;
        &self.visible
    }
}
