// q_shared.rs — Shared types, constants and math used by every module

pub type Vec3 = [f32; 3];

// angle indexes
pub const PITCH: usize = 0; // up / down
pub const YAW: usize = 1; // left / right
pub const ROLL: usize = 2; // fall over

pub const MAX_TOKEN_CHARS: usize = 1024;

// com_error codes
pub const ERR_FATAL: i32 = 0;
pub const ERR_DROP: i32 = 1;

// ============================================================
// Contents flags
// Brushes take their contents from the shader they reference.
// ============================================================

pub const CONTENTS_SOLID: i32 = 1;
pub const CONTENTS_LAVA: i32 = 8;
pub const CONTENTS_SLIME: i32 = 16;
pub const CONTENTS_WATER: i32 = 32;

pub const CONTENTS_PLAYERCLIP: i32 = 0x10000;
pub const CONTENTS_BODY: i32 = 0x2000000;

pub const MASK_ALL: i32 = -1;
pub const MASK_SOLID: i32 = CONTENTS_SOLID;
pub const MASK_PLAYERSOLID: i32 = CONTENTS_SOLID | CONTENTS_PLAYERCLIP | CONTENTS_BODY;
pub const MASK_WATER: i32 = CONTENTS_WATER | CONTENTS_LAVA | CONTENTS_SLIME;

// ============================================================
// Plane
// ============================================================

// plane_type values; 0-2 are axial planes with a positive unit normal
pub const PLANE_X: u8 = 0;
pub const PLANE_Y: u8 = 1;
pub const PLANE_Z: u8 = 2;
pub const PLANE_ANYX: u8 = 3;
pub const PLANE_ANYY: u8 = 4;
pub const PLANE_ANYZ: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct CPlane {
    pub normal: Vec3,
    pub dist: f32,
    pub plane_type: u8,
    pub signbits: u8,
    pub pad: [u8; 2],
}

impl Default for CPlane {
    fn default() -> Self {
        Self {
            normal: [0.0; 3],
            dist: 0.0,
            plane_type: 0,
            signbits: 0,
            pad: [0; 2],
        }
    }
}

impl CPlane {
    /// Build a plane with its cached type and signbits filled in.
    pub fn new(normal: Vec3, dist: f32) -> Self {
        let mut plane = Self {
            normal,
            dist,
            ..Self::default()
        };
        plane.plane_type = plane_type_for_normal(&normal);
        plane.signbits = signbits_for_plane(&plane);
        plane
    }

    /// Signed distance from the plane. Axial planes skip the dot product.
    #[inline]
    pub fn distance_to(&self, p: &Vec3) -> f32 {
        if (self.plane_type as usize) < 3 {
            p[self.plane_type as usize] - self.dist
        } else {
            dot_product(&self.normal, p) - self.dist
        }
    }
}

pub fn plane_type_for_normal(normal: &Vec3) -> u8 {
    if normal[0] == 1.0 {
        return PLANE_X;
    }
    if normal[1] == 1.0 {
        return PLANE_Y;
    }
    if normal[2] == 1.0 {
        return PLANE_Z;
    }

    let ax = normal[0].abs();
    let ay = normal[1].abs();
    let az = normal[2].abs();

    if ax >= ay && ax >= az {
        PLANE_ANYX
    } else if ay >= ax && ay >= az {
        PLANE_ANYY
    } else {
        PLANE_ANYZ
    }
}

pub fn signbits_for_plane(out: &CPlane) -> u8 {
    let mut bits = 0u8;
    for j in 0..3 {
        if out.normal[j] < 0.0 {
            bits |= 1 << j;
        }
    }
    bits
}

// ============================================================
// Trace
// ============================================================

/// Result of a swept box query against the world.
#[derive(Debug, Clone)]
pub struct Trace {
    /// The whole segment was inside a solid.
    pub allsolid: bool,
    /// The start point was inside a solid.
    pub startsolid: bool,
    /// 1.0 = no hit.
    pub fraction: f32,
    pub endpos: Vec3,
    /// Surface that was hit; normal is zero when nothing was hit.
    pub plane: CPlane,
    /// Contents of the brush that was hit.
    pub contents: i32,
}

impl Default for Trace {
    fn default() -> Self {
        Self {
            allsolid: false,
            startsolid: false,
            fraction: 1.0,
            endpos: [0.0; 3],
            plane: CPlane::default(),
            contents: 0,
        }
    }
}

// ============================================================
// Player movement flags
// ============================================================

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct PmFlags: u8 {
        const ON_GROUND = 0x01;
        const DUCKED    = 0x02;
        const JUMP_HELD = 0x04;
    }
}

// ============================================================
// MATHLIB: vector operations
// ============================================================

#[inline]
pub fn dot_product(a: &Vec3, b: &Vec3) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
pub fn vector_subtract(a: &Vec3, b: &Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

/// veca + scale * vecb
pub fn vector_ma(veca: &Vec3, scale: f32, vecb: &Vec3) -> Vec3 {
    [
        veca[0] + scale * vecb[0],
        veca[1] + scale * vecb[1],
        veca[2] + scale * vecb[2],
    ]
}

pub fn vector_scale(v: &Vec3, scale: f32) -> Vec3 {
    [v[0] * scale, v[1] * scale, v[2] * scale]
}

pub fn vector_compare(v1: &Vec3, v2: &Vec3) -> bool {
    v1[0] == v2[0] && v1[1] == v2[1] && v1[2] == v2[2]
}

pub fn vector_length(v: &Vec3) -> f32 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

/// Normalize in place, returns original length.
pub fn vector_normalize(v: &mut Vec3) -> f32 {
    let length = vector_length(v);
    if length != 0.0 {
        let ilength = 1.0 / length;
        v[0] *= ilength;
        v[1] *= ilength;
        v[2] *= ilength;
    }
    length
}

pub fn cross_product(v1: &Vec3, v2: &Vec3) -> Vec3 {
    [
        v1[1] * v2[2] - v1[2] * v2[1],
        v1[2] * v2[0] - v1[0] * v2[2],
        v1[0] * v2[1] - v1[1] * v2[0],
    ]
}

pub fn clear_bounds(mins: &mut Vec3, maxs: &mut Vec3) {
    *mins = [f32::MAX; 3];
    *maxs = [-f32::MAX; 3];
}

pub fn add_point_to_bounds(v: &Vec3, mins: &mut Vec3, maxs: &mut Vec3) {
    for i in 0..3 {
        if v[i] < mins[i] {
            mins[i] = v[i];
        }
        if v[i] > maxs[i] {
            maxs[i] = v[i];
        }
    }
}

// ============================================================
// Matrix operations
// ============================================================

pub fn r_concat_rotations(in1: &[[f32; 3]; 3], in2: &[[f32; 3]; 3], out: &mut [[f32; 3]; 3]) {
    for i in 0..3 {
        for j in 0..3 {
            out[i][j] = in1[i][0] * in2[0][j] + in1[i][1] * in2[1][j] + in1[i][2] * in2[2][j];
        }
    }
}

// ============================================================
// Angle functions
// ============================================================

pub fn angle_vectors(
    angles: &Vec3,
    forward: Option<&mut Vec3>,
    right: Option<&mut Vec3>,
    up: Option<&mut Vec3>,
) {
    let angle_yaw = angles[YAW].to_radians();
    let sy = angle_yaw.sin();
    let cy = angle_yaw.cos();

    let angle_pitch = angles[PITCH].to_radians();
    let sp = angle_pitch.sin();
    let cp = angle_pitch.cos();

    let angle_roll = angles[ROLL].to_radians();
    let sr = angle_roll.sin();
    let cr = angle_roll.cos();

    if let Some(fwd) = forward {
        fwd[0] = cp * cy;
        fwd[1] = cp * sy;
        fwd[2] = -sp;
    }
    if let Some(r) = right {
        r[0] = -sr * sp * cy + -cr * -sy;
        r[1] = -sr * sp * sy + -cr * cy;
        r[2] = -sr * cp;
    }
    if let Some(u) = up {
        u[0] = cr * sp * cy + -sr * -sy;
        u[1] = cr * sp * sy + -sr * cy;
        u[2] = cr * cp;
    }
}

/// Returns 1 (front), 2 (back), or 3 (crossing) for a box vs. plane test.
pub fn box_on_plane_side(emins: &Vec3, emaxs: &Vec3, p: &CPlane) -> i32 {
    // fast axial cases
    if (p.plane_type as usize) < 3 {
        let t = p.plane_type as usize;
        if p.dist <= emins[t] {
            return 1;
        }
        if p.dist >= emaxs[t] {
            return 2;
        }
        return 3;
    }

    // general case: pick the corners nearest and farthest along the normal
    let mut dist1 = 0.0f32;
    let mut dist2 = 0.0f32;
    for i in 0..3 {
        if p.signbits & (1 << i) != 0 {
            dist1 += p.normal[i] * emins[i];
            dist2 += p.normal[i] * emaxs[i];
        } else {
            dist1 += p.normal[i] * emaxs[i];
            dist2 += p.normal[i] * emins[i];
        }
    }

    let mut sides = 0;
    if dist1 >= p.dist {
        sides = 1;
    }
    if dist2 < p.dist {
        sides |= 2;
    }
    sides
}

pub fn project_point_on_plane(dst: &mut Vec3, p: &Vec3, normal: &Vec3) {
    let inv_denom = 1.0 / dot_product(normal, normal);
    let d = dot_product(normal, p) * inv_denom;
    let n = [
        normal[0] * inv_denom,
        normal[1] * inv_denom,
        normal[2] * inv_denom,
    ];
    dst[0] = p[0] - d * n[0];
    dst[1] = p[1] - d * n[1];
    dst[2] = p[2] - d * n[2];
}

/// Find a vector perpendicular to `src` (assumed normalized).
pub fn perpendicular_vector(dst: &mut Vec3, src: &Vec3) {
    let mut min_elem: f32 = 1.0;
    let mut pos = 0;
    for i in 0..3 {
        if src[i].abs() < min_elem {
            pos = i;
            min_elem = src[i].abs();
        }
    }
    let mut tempvec = [0.0f32; 3];
    tempvec[pos] = 1.0;

    project_point_on_plane(dst, &tempvec, src);
    vector_normalize(dst);
}

pub fn rotate_point_around_vector(dst: &mut Vec3, dir: &Vec3, point: &Vec3, degrees: f32) {
    let vf = *dir;
    let mut vr = [0.0f32; 3];
    perpendicular_vector(&mut vr, dir);
    let vup = cross_product(&vr, &vf);

    let mut m = [[0.0f32; 3]; 3];
    for i in 0..3 {
        m[i][0] = vr[i];
        m[i][1] = vup[i];
        m[i][2] = vf[i];
    }

    // orthonormal, so the inverse is the transpose
    let mut im = [[0.0f32; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            im[i][j] = m[j][i];
        }
    }

    let rad = degrees.to_radians();
    let mut zrot = [[0.0f32; 3]; 3];
    zrot[2][2] = 1.0;
    zrot[0][0] = rad.cos();
    zrot[0][1] = rad.sin();
    zrot[1][0] = -rad.sin();
    zrot[1][1] = rad.cos();

    let mut tmpmat = [[0.0f32; 3]; 3];
    r_concat_rotations(&m, &zrot, &mut tmpmat);
    let mut rot = [[0.0f32; 3]; 3];
    r_concat_rotations(&tmpmat, &im, &mut rot);

    for i in 0..3 {
        dst[i] = rot[i][0] * point[0] + rot[i][1] * point[1] + rot[i][2] * point[2];
    }
}

// ============================================================
// Parsing
// ============================================================

/// Parse one whitespace-delimited token from `data`, handling // comments
/// and "quoted strings". Returns `(token, remaining)` or `(token, None)`
/// if end of data.
pub fn com_parse(data: &str) -> (String, Option<&str>) {
    let mut chars = data.as_bytes();
    let mut token = String::new();

    // skip whitespace
    loop {
        while !chars.is_empty() && chars[0] <= b' ' {
            if chars[0] == 0 {
                return (String::new(), None);
            }
            chars = &chars[1..];
        }
        if chars.is_empty() {
            return (String::new(), None);
        }

        // skip // comments
        if chars.len() >= 2 && chars[0] == b'/' && chars[1] == b'/' {
            while !chars.is_empty() && chars[0] != b'\n' {
                chars = &chars[1..];
            }
            continue;
        }
        break;
    }

    if chars[0] == b'"' {
        chars = &chars[1..];
        let len = chars.iter().position(|&c| c == b'"').unwrap_or(chars.len());
        let offset = data.len() - chars.len();
        token.extend(data[offset..offset + len].chars().take(MAX_TOKEN_CHARS));
        chars = &chars[len..];
        if !chars.is_empty() {
            chars = &chars[1..]; // skip closing quote
        }
    } else {
        let len = chars.iter().position(|&c| c <= b' ').unwrap_or(chars.len());
        if len < MAX_TOKEN_CHARS {
            let offset = data.len() - chars.len();
            token.push_str(&data[offset..offset + len]);
        }
        chars = &chars[len..];
    }

    let offset = data.len() - chars.len();
    let remaining = if chars.is_empty() {
        None
    } else {
        Some(&data[offset..])
    };
    (token, remaining)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_type_axial_only_for_positive_normals() {
        assert_eq!(plane_type_for_normal(&[1.0, 0.0, 0.0]), PLANE_X);
        assert_eq!(plane_type_for_normal(&[0.0, 0.0, 1.0]), PLANE_Z);
        // negative axial normals must take the general path
        assert_eq!(plane_type_for_normal(&[-1.0, 0.0, 0.0]), PLANE_ANYX);
        assert_eq!(plane_type_for_normal(&[0.0, 0.6, 0.8]), PLANE_ANYZ);
    }

    #[test]
    fn test_plane_distance_axial_and_general_agree() {
        let axial = CPlane::new([0.0, 0.0, 1.0], 4.0);
        let general = CPlane::new([0.0, 0.0, 1.0 - f32::EPSILON], 4.0);
        let p = [3.0, -2.0, 10.0];
        assert_eq!(axial.plane_type, PLANE_Z);
        assert_ne!(general.plane_type, PLANE_Z);
        assert!((axial.distance_to(&p) - general.distance_to(&p)).abs() < 1e-3);
    }

    #[test]
    fn test_signbits() {
        let p = CPlane::new([-0.6, 0.0, -0.8], 0.0);
        assert_eq!(p.signbits, 0b101);
    }

    #[test]
    fn test_box_on_plane_side_axial() {
        let plane = CPlane::new([0.0, 0.0, 1.0], 0.0);
        assert_eq!(box_on_plane_side(&[-1.0, -1.0, 1.0], &[1.0, 1.0, 2.0], &plane), 1);
        assert_eq!(box_on_plane_side(&[-1.0, -1.0, -3.0], &[1.0, 1.0, -1.0], &plane), 2);
        assert_eq!(box_on_plane_side(&[-1.0, -1.0, -1.0], &[1.0, 1.0, 1.0], &plane), 3);
    }

    #[test]
    fn test_box_on_plane_side_general() {
        let n = 1.0 / 2.0f32.sqrt();
        let plane = CPlane::new([-n, 0.0, n], 0.0);
        // box well above the diagonal plane z = x
        assert_eq!(box_on_plane_side(&[-4.0, -1.0, 5.0], &[-2.0, 1.0, 6.0], &plane), 1);
        // box well below it
        assert_eq!(box_on_plane_side(&[2.0, -1.0, -6.0], &[4.0, 1.0, -5.0], &plane), 2);
        // straddling
        assert_eq!(box_on_plane_side(&[-1.0, -1.0, -1.0], &[1.0, 1.0, 1.0], &plane), 3);
    }

    #[test]
    fn test_angle_vectors_yaw_90() {
        let mut fwd = [0.0; 3];
        let mut right = [0.0; 3];
        angle_vectors(&[0.0, 90.0, 0.0], Some(&mut fwd), Some(&mut right), None);
        assert!(fwd[0].abs() < 1e-6 && (fwd[1] - 1.0).abs() < 1e-6, "fwd={:?}", fwd);
        assert!((right[0] - 1.0).abs() < 1e-6 && right[1].abs() < 1e-6, "right={:?}", right);
    }

    #[test]
    fn test_rotate_point_around_vector_quarter_turn() {
        let mut dst = [0.0; 3];
        rotate_point_around_vector(&mut dst, &[0.0, 0.0, 1.0], &[1.0, 0.0, 0.0], 90.0);
        assert!(dst[0].abs() < 1e-5, "dst={:?}", dst);
        assert!((dst[1] - 1.0).abs() < 1e-5, "dst={:?}", dst);
        assert!(dst[2].abs() < 1e-5, "dst={:?}", dst);
    }

    #[test]
    fn test_vector_normalize_returns_length() {
        let mut v = [3.0, 4.0, 0.0];
        assert_eq!(vector_normalize(&mut v), 5.0);
        assert!((vector_length(&v) - 1.0).abs() < 1e-6);
        let mut zero = [0.0; 3];
        assert_eq!(vector_normalize(&mut zero), 0.0);
        assert_eq!(zero, [0.0; 3]);
    }

    #[test]
    fn test_com_parse_tokens() {
        let (tok, rest) = com_parse("  { \"classname\" \"worldspawn\" }");
        assert_eq!(tok, "{");
        let (tok, rest) = com_parse(rest.unwrap());
        assert_eq!(tok, "classname");
        let (tok, rest) = com_parse(rest.unwrap());
        assert_eq!(tok, "worldspawn");
        let (tok, rest) = com_parse(rest.unwrap());
        assert_eq!(tok, "}");
        assert!(rest.is_none());
    }

    #[test]
    fn test_com_parse_skips_comments_and_keeps_empty_quotes() {
        let (tok, rest) = com_parse("// comment\n\"\" next");
        assert_eq!(tok, "");
        assert!(rest.is_some());
        let (tok, _) = com_parse(rest.unwrap());
        assert_eq!(tok, "next");
    }

    #[test]
    fn test_com_parse_end_of_data() {
        let (tok, rest) = com_parse("   ");
        assert!(tok.is_empty());
        assert!(rest.is_none());
    }
}
